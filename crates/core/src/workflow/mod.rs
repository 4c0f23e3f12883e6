//! Sequential state machine that drives the analysis passes.
//!
//! A run starts at a named state and follows the successor each state picks
//! until one returns `None`. Transitions are checked against the current
//! state's declaration, self-loops are rejected, and the total number of
//! executions is capped at [`MAX_TOTAL_STATES`].

mod context;
mod orchestrator;
mod registry;
mod state;

pub use context::{KnowledgeEntry, WorkflowContext, WorkflowResults};
pub use orchestrator::{WorkflowOrchestrator, MAX_TOTAL_STATES};
pub use registry::StateRegistry;
pub use state::{validate_declaration, AnalysisState, ExecutionResult, StateTransition};

#[cfg(test)]
pub(crate) mod testing {
    use serde_json::json;

    use super::*;
    use crate::error::StateError;

    /// A state whose behaviour is fixed at construction.
    #[derive(Debug, Clone)]
    pub struct ScriptedState {
        pub name: &'static str,
        transitions: &'static [StateTransition],
        next: Option<&'static str>,
        writes: Vec<&'static str>,
        requires: &'static [&'static str],
        fail: bool,
        soft_fail: bool,
    }

    pub fn scripted(
        name: &'static str,
        transitions: &'static [StateTransition],
        next: Option<&'static str>,
    ) -> ScriptedState {
        ScriptedState {
            name,
            transitions,
            next,
            writes: Vec::new(),
            requires: &[],
            fail: false,
            soft_fail: false,
        }
    }

    impl ScriptedState {
        pub fn writes(mut self, key: &'static str) -> Self {
            self.writes.push(key);
            self
        }

        pub fn requires(mut self, keys: &'static [&'static str]) -> Self {
            self.requires = keys;
            self
        }

        pub fn failing(mut self) -> Self {
            self.fail = true;
            self
        }

        pub fn soft_failing(mut self) -> Self {
            self.soft_fail = true;
            self
        }
    }

    impl AnalysisState for ScriptedState {
        fn name(&self) -> &'static str {
            self.name
        }

        fn transitions(&self) -> &'static [StateTransition] {
            self.transitions
        }

        fn required_inputs(&self) -> &'static [&'static str] {
            self.requires
        }

        fn execute(&self, _context: &WorkflowContext) -> Result<ExecutionResult, StateError> {
            if self.fail {
                return Err("scripted failure".into());
            }
            let mut result = if self.soft_fail {
                ExecutionResult::failure(json!({"state": self.name}))
            } else {
                ExecutionResult::success(json!({"state": self.name}))
            };
            for key in &self.writes {
                result = result.with_knowledge(key, json!(self.name));
            }
            Ok(result)
        }

        fn determine_next_state(
            &self,
            _result: &ExecutionResult,
            _context: &WorkflowContext,
        ) -> Option<&'static str> {
            self.next
        }
    }
}
