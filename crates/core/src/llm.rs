//! Boundary to the language-model collaborator.
//!
//! States only ever see the blocking [`LlmClient`] trait; the shell decides
//! which provider sits behind it. Responses are treated as opaque JSON and
//! checked for shape only.

use serde_json::Value;

use crate::error::LlmError;

/// One request to the model: what the analysis is after, how to answer, and
/// the serialized slice of the document to look at.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    pub objective: String,
    pub instruction: String,
    pub payload: Value,
}

impl LlmRequest {
    pub fn new(objective: impl Into<String>, instruction: impl Into<String>, payload: Value) -> Self {
        Self {
            objective: objective.into(),
            instruction: instruction.into(),
            payload,
        }
    }
}

/// Blocking completion interface used by analysis states.
pub trait LlmClient: Send + Sync {
    /// Send `request` and return the model's answer parsed as JSON.
    fn complete(&self, request: &LlmRequest) -> Result<Value, LlmError>;
}

/// Render a request as a single prompt string.
pub fn build_prompt(request: &LlmRequest) -> String {
    let payload = serde_json::to_string_pretty(&request.payload).unwrap_or_else(|_| request.payload.to_string());
    [
        format!("# Objective\n{}", request.objective),
        format!("# Document\n```json\n{}\n```", payload),
        format!(
            "# Instruction\n{}\n\nAnswer with a single JSON object and nothing else.",
            request.instruction
        ),
    ]
    .join("\n\n")
}

/// Pull the JSON object out of a model response.
///
/// Models wrap answers in code fences or add a sentence before and after;
/// everything outside the outermost `{ ... }` is dropped.
pub fn extract_json(response: &str) -> Result<Value, LlmError> {
    let mut text = response.trim();

    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    let text = text.trim();

    let start = text
        .find('{')
        .ok_or_else(|| LlmError::InvalidResponse("no JSON object in response".to_string()))?;
    let end = text
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| LlmError::InvalidResponse("unterminated JSON object".to_string()))?;

    serde_json::from_str(&text[start..=end]).map_err(|e| LlmError::InvalidResponse(e.to_string()))
}

/// Check that `value` is an object carrying every field in `fields`.
pub fn require_fields(value: &Value, fields: &[&str]) -> Result<(), LlmError> {
    let object = value
        .as_object()
        .ok_or_else(|| LlmError::InvalidResponse("expected a JSON object".to_string()))?;

    match fields.iter().find(|field| !object.contains_key(**field)) {
        Some(missing) => Err(LlmError::InvalidResponse(format!(
            "missing field `{}`",
            missing
        ))),
        None => Ok(()),
    }
}
