use std::sync::Arc;

use super::context::{WorkflowContext, WorkflowResults};
use super::registry::StateRegistry;
use super::state::AnalysisState;
use crate::config::AnalysisConfig;
use crate::error::WorkflowError;
use crate::LayoutAnalysis;

/// Upper bound on state executions per run. Reaching it means the workflow
/// graph has a cycle that never exits.
pub const MAX_TOTAL_STATES: usize = 50;

/// Runs states one at a time, merging each result into the context and
/// validating every transition before following it.
#[derive(Debug)]
pub struct WorkflowOrchestrator {
    registry: StateRegistry,
    config: AnalysisConfig,
}

impl WorkflowOrchestrator {
    pub fn new(registry: StateRegistry, config: AnalysisConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &StateRegistry {
        &self.registry
    }

    /// Run from `initial_state` until a state returns no successor.
    pub fn run_workflow(
        &self,
        input: Arc<LayoutAnalysis>,
        initial_state: &str,
    ) -> Result<WorkflowResults, WorkflowError> {
        self.run(input, initial_state).map(WorkflowContext::into_results)
    }

    /// Like [`run_workflow`](Self::run_workflow), returning the whole context.
    pub fn run(
        &self,
        input: Arc<LayoutAnalysis>,
        initial_state: &str,
    ) -> Result<WorkflowContext, WorkflowError> {
        let mut context = WorkflowContext::new(input, self.config.clone());
        let mut current = Some(initial_state.to_string());
        let mut iteration = 0;

        while let Some(name) = current.take() {
            if iteration >= MAX_TOTAL_STATES {
                return Err(WorkflowError::IterationCapExceeded {
                    limit: MAX_TOTAL_STATES,
                    next: name,
                    trace: context.trace().to_vec(),
                });
            }
            iteration += 1;

            let state = self
                .registry
                .create(&name)
                .ok_or_else(|| WorkflowError::UnknownState {
                    name: name.clone(),
                    iteration,
                })?;

            log::debug!("workflow iteration {}: running `{}`", iteration, name);
            state
                .validate_input(&context)
                .map_err(|err| match err {
                    WorkflowError::MissingInput { state: owner, key, .. } => {
                        WorkflowError::MissingInput {
                            state: owner,
                            key,
                            iteration,
                        }
                    }
                    other => other,
                })?;

            let result = state
                .execute(&context)
                .map_err(|source| WorkflowError::StateFailed {
                    state: name.clone(),
                    iteration,
                    source,
                })?;
            if !result.success {
                log::warn!("state `{}` reported a soft failure", name);
            }

            context.record(&name, result.clone())?;
            let next = state.determine_next_state(&result, &context);
            self.validate_transition(state.as_ref(), next, iteration)?;

            current = next.map(str::to_string);
        }

        log::debug!(
            "workflow finished after {} states: {}",
            iteration,
            context.trace().join(" -> ")
        );
        Ok(context)
    }

    /// Check `state -> next` against the registry and the state's own
    /// declaration. `None` always passes.
    pub fn validate_transition(
        &self,
        state: &dyn AnalysisState,
        next: Option<&str>,
        iteration: usize,
    ) -> Result<(), WorkflowError> {
        let Some(next) = next else {
            return Ok(());
        };

        if next == state.name() {
            return Err(WorkflowError::SelfTransition {
                state: state.name().to_string(),
                iteration,
            });
        }
        if !self.registry.contains(next) {
            return Err(WorkflowError::UnknownState {
                name: next.to_string(),
                iteration,
            });
        }
        if !state.transitions().iter().any(|t| t.target == next) {
            return Err(WorkflowError::UndeclaredTransition {
                from: state.name().to_string(),
                to: next.to_string(),
                iteration,
            });
        }
        Ok(())
    }
}
