#[derive(thiserror::Error, Debug, serde::Deserialize, serde::Serialize)]
pub enum Error {
    #[error("Cannot read {path}: {reason}")]
    Input { path: String, reason: String },

    #[error("{0} contains no pages")]
    EmptyDocument(String),
}
