use thiserror::Error;

/// The extractor's output does not match the line/page record contract.
#[derive(Debug, Error)]
pub enum DataContractError {
    #[error("Malformed document: {0}")]
    Malformed(String),
    #[error("Page {page}: field `{field}` {reason}")]
    InvalidPage {
        page: usize,
        field: &'static str,
        reason: String,
    },
    #[error("Page {page}, line {line}: field `{field}` {reason}")]
    InvalidField {
        page: usize,
        line: usize,
        field: &'static str,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// The language-model collaborator failed or answered with the wrong shape.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Transport(String),
    #[error("LLM response is not usable: {0}")]
    InvalidResponse(String),
}

/// Error raised from inside a state's `execute`.
pub type StateError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Fatal workflow failures. Every variant is terminal for the run.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Unknown state `{name}` at iteration {iteration}")]
    UnknownState { name: String, iteration: usize },
    #[error("State `{from}` may not transition to `{to}` (iteration {iteration}): transition is not declared")]
    UndeclaredTransition {
        from: String,
        to: String,
        iteration: usize,
    },
    #[error("State `{state}` attempted a self-transition at iteration {iteration}")]
    SelfTransition { state: String, iteration: usize },
    #[error("State `{state}` declares a transition to itself")]
    SelfTransitionDeclared { state: String },
    #[error("State `{name}` is already registered")]
    DuplicateState { name: String },
    #[error("State registered as `{registered}` reports its name as `{reported}`")]
    NameMismatch { registered: String, reported: String },
    #[error("Workflow exceeded {limit} state executions; next state would have been `{next}` (trace: {})", .trace.join(" -> "))]
    IterationCapExceeded {
        limit: usize,
        next: String,
        trace: Vec<String>,
    },
    #[error("State `{state}` requires `{key}` in accumulated knowledge (iteration {iteration})")]
    MissingInput {
        state: String,
        key: String,
        iteration: usize,
    },
    #[error("State `{state}` tried to overwrite `{key}`, which belongs to `{owner}`")]
    KnowledgeConflict {
        state: String,
        key: String,
        owner: String,
    },
    #[error("State `{state}` failed at iteration {iteration}: {source}")]
    StateFailed {
        state: String,
        iteration: usize,
        #[source]
        source: StateError,
    },
}
