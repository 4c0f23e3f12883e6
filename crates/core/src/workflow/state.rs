use serde::Serialize;
use serde_json::{Map, Value};

use super::context::WorkflowContext;
use crate::error::{StateError, WorkflowError};

/// A legal edge out of a state. Descriptive only; the orchestrator checks the
/// target name and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub target: &'static str,
    pub condition: &'static str,
    pub description: &'static str,
}

impl StateTransition {
    pub const fn new(target: &'static str, condition: &'static str, description: &'static str) -> Self {
        Self {
            target,
            condition,
            description,
        }
    }
}

/// Everything a state hands back to the orchestrator after one execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    /// `false` marks a soft failure the state chose to encode rather than
    /// raise; the workflow continues through `determine_next_state`.
    pub success: bool,
    pub results: Value,
    pub metadata: Map<String, Value>,
    /// Entries merged into the context's accumulated knowledge.
    pub knowledge: Map<String, Value>,
}

impl ExecutionResult {
    pub fn success(results: Value) -> Self {
        Self {
            success: true,
            results,
            metadata: Map::new(),
            knowledge: Map::new(),
        }
    }

    pub fn failure(results: Value) -> Self {
        Self {
            success: false,
            ..Self::success(results)
        }
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn with_knowledge(mut self, key: &str, value: Value) -> Self {
        self.knowledge.insert(key.to_string(), value);
        self
    }
}

/// One unit of work in the analysis workflow.
///
/// States never mutate the context directly: they read it through a shared
/// borrow and return their additions, which the orchestrator merges.
pub trait AnalysisState: Send {
    fn name(&self) -> &'static str;

    /// Every state this one may hand over to. The only source of truth for
    /// legal transitions.
    fn transitions(&self) -> &'static [StateTransition];

    /// Knowledge keys that earlier states must have written.
    fn required_inputs(&self) -> &'static [&'static str] {
        &[]
    }

    fn validate_input(&self, context: &WorkflowContext) -> Result<(), WorkflowError> {
        match self
            .required_inputs()
            .iter()
            .find(|key| context.knowledge(key).is_none())
        {
            Some(key) => Err(WorkflowError::MissingInput {
                state: self.name().to_string(),
                key: key.to_string(),
                iteration: context.trace().len() + 1,
            }),
            None => Ok(()),
        }
    }

    fn execute(&self, context: &WorkflowContext) -> Result<ExecutionResult, StateError>;

    /// Pick the next state from this execution's result. `None` ends the run.
    fn determine_next_state(
        &self,
        result: &ExecutionResult,
        context: &WorkflowContext,
    ) -> Option<&'static str>;
}

/// Reject declarations that can never be legal, i.e. self-transitions.
pub fn validate_declaration(state: &dyn AnalysisState) -> Result<(), WorkflowError> {
    if state.transitions().iter().any(|t| t.target == state.name()) {
        return Err(WorkflowError::SelfTransitionDeclared {
            state: state.name().to_string(),
        });
    }
    Ok(())
}
