use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::state::ExecutionResult;
use crate::config::AnalysisConfig;
use crate::error::WorkflowError;
use crate::LayoutAnalysis;

/// A knowledge value and the state that owns it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeEntry {
    pub value: Value,
    pub written_by: String,
}

/// State shared across one workflow run.
///
/// Append-only: a state may add new keys, and rewrite keys it wrote itself
/// on an earlier visit, but never touch another state's entries.
#[derive(Debug, Clone)]
pub struct WorkflowContext {
    original_input: Arc<LayoutAnalysis>,
    config: AnalysisConfig,
    workflow_results: BTreeMap<String, ExecutionResult>,
    accumulated_knowledge: BTreeMap<String, KnowledgeEntry>,
    trace: Vec<String>,
}

/// What a finished run hands back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowResults {
    pub results: BTreeMap<String, ExecutionResult>,
    pub knowledge: BTreeMap<String, Value>,
    /// State names in execution order.
    pub trace: Vec<String>,
}

impl WorkflowContext {
    pub fn new(original_input: Arc<LayoutAnalysis>, config: AnalysisConfig) -> Self {
        Self {
            original_input,
            config,
            workflow_results: BTreeMap::new(),
            accumulated_knowledge: BTreeMap::new(),
            trace: Vec::new(),
        }
    }

    pub fn input(&self) -> &LayoutAnalysis {
        &self.original_input
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn result(&self, state: &str) -> Option<&ExecutionResult> {
        self.workflow_results.get(state)
    }

    pub fn knowledge(&self, key: &str) -> Option<&Value> {
        self.accumulated_knowledge.get(key).map(|entry| &entry.value)
    }

    pub fn knowledge_entry(&self, key: &str) -> Option<&KnowledgeEntry> {
        self.accumulated_knowledge.get(key)
    }

    pub fn trace(&self) -> &[String] {
        &self.trace
    }

    /// Merge one execution into the context. Nothing is written if any
    /// knowledge key belongs to a different state.
    pub(crate) fn record(&mut self, state: &str, result: ExecutionResult) -> Result<(), WorkflowError> {
        for key in result.knowledge.keys() {
            if let Some(entry) = self.accumulated_knowledge.get(key) {
                if entry.written_by != state {
                    return Err(WorkflowError::KnowledgeConflict {
                        state: state.to_string(),
                        key: key.clone(),
                        owner: entry.written_by.clone(),
                    });
                }
            }
        }

        for (key, value) in &result.knowledge {
            self.accumulated_knowledge.insert(
                key.clone(),
                KnowledgeEntry {
                    value: value.clone(),
                    written_by: state.to_string(),
                },
            );
        }
        self.workflow_results.insert(state.to_string(), result);
        self.trace.push(state.to_string());
        Ok(())
    }

    pub fn into_results(self) -> WorkflowResults {
        WorkflowResults {
            results: self.workflow_results,
            knowledge: self
                .accumulated_knowledge
                .into_iter()
                .map(|(key, entry)| (key, entry.value))
                .collect(),
            trace: self.trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> WorkflowContext {
        WorkflowContext::new(Arc::new(LayoutAnalysis::default()), AnalysisConfig::default())
    }

    #[test]
    fn test_record_merges_knowledge() {
        let mut ctx = context();
        let result = ExecutionResult::success(json!({"ok": true})).with_knowledge("pattern", json!("1.1"));
        ctx.record("headings", result).unwrap();

        assert_eq!(ctx.knowledge("pattern"), Some(&json!("1.1")));
        assert_eq!(ctx.knowledge_entry("pattern").unwrap().written_by, "headings");
        assert!(ctx.result("headings").unwrap().success);
        assert_eq!(ctx.trace(), ["headings".to_string()]);
    }

    #[test]
    fn test_owner_may_rewrite_its_own_key() {
        let mut ctx = context();
        ctx.record("a", ExecutionResult::success(json!(1)).with_knowledge("k", json!(1)))
            .unwrap();
        ctx.record("a", ExecutionResult::success(json!(2)).with_knowledge("k", json!(2)))
            .unwrap();
        assert_eq!(ctx.knowledge("k"), Some(&json!(2)));
        assert_eq!(ctx.trace().len(), 2);
    }

    #[test]
    fn test_conflicting_write_leaves_context_untouched() {
        let mut ctx = context();
        ctx.record("a", ExecutionResult::success(json!(1)).with_knowledge("k", json!(1)))
            .unwrap();

        let intruder = ExecutionResult::success(json!(2))
            .with_knowledge("fresh", json!(true))
            .with_knowledge("k", json!(2));
        let err = ctx.record("b", intruder).unwrap_err();

        assert!(matches!(
            err,
            WorkflowError::KnowledgeConflict { ref state, ref key, ref owner }
                if state == "b" && key == "k" && owner == "a"
        ));
        assert_eq!(ctx.knowledge("k"), Some(&json!(1)));
        assert!(ctx.knowledge("fresh").is_none());
        assert!(ctx.result("b").is_none());
    }

    #[test]
    fn test_into_results_flattens_knowledge() {
        let mut ctx = context();
        ctx.record("a", ExecutionResult::success(json!(1)).with_knowledge("k", json!("v")))
            .unwrap();
        let results = ctx.into_results();
        assert_eq!(results.knowledge["k"], json!("v"));
        assert_eq!(results.trace, vec!["a".to_string()]);
    }
}
