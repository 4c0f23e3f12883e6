use std::collections::BTreeMap;

use super::state::{validate_declaration, AnalysisState};
use crate::error::WorkflowError;

type StateConstructor = Box<dyn Fn() -> Box<dyn AnalysisState> + Send + Sync>;

/// Explicit name -> constructor map of every state a workflow may visit.
#[derive(Default)]
pub struct StateRegistry {
    constructors: BTreeMap<String, StateConstructor>,
}

impl StateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a state under `name`.
    ///
    /// The constructor is called once up front to check that the instance
    /// reports the same name and declares no self-transition.
    pub fn register<F>(&mut self, name: &str, constructor: F) -> Result<(), WorkflowError>
    where
        F: Fn() -> Box<dyn AnalysisState> + Send + Sync + 'static,
    {
        if self.constructors.contains_key(name) {
            return Err(WorkflowError::DuplicateState {
                name: name.to_string(),
            });
        }

        let probe = constructor();
        if probe.name() != name {
            return Err(WorkflowError::NameMismatch {
                registered: name.to_string(),
                reported: probe.name().to_string(),
            });
        }
        validate_declaration(probe.as_ref())?;

        log::debug!(
            "registered state `{}` with {} transitions",
            name,
            probe.transitions().len()
        );
        self.constructors.insert(name.to_string(), Box::new(constructor));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// A fresh instance of the state registered under `name`.
    pub fn create(&self, name: &str) -> Option<Box<dyn AnalysisState>> {
        self.constructors.get(name).map(|constructor| constructor())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl std::fmt::Debug for StateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.constructors.keys()).finish()
    }
}
