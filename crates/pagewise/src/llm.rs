use pagewise_core::llm::{build_prompt, extract_json, LlmClient, LlmRequest};
use pagewise_core::LlmError;
use rig::client::{CompletionClient, Nothing};
use rig::completion::Prompt;
use rig::providers::ollama;
use serde_json::Value;

use crate::prelude::*;

const SYSTEM_PREAMBLE: &str = "\
You analyze the layout of documents extracted from PDF files.
You receive blocks of text with their page, position, font and size.

Rules:
- Answer with exactly one JSON object matching the shape the instruction asks for.
- No markdown fences. No explanations. No commentary.
- Use null for values you cannot determine.
- Positions are in PDF points, measured from the top of the page.";

/// [`LlmClient`] backed by an Ollama model through `rig`.
///
/// Analysis states call it from a blocking worker thread; each request is
/// driven to completion on the runtime captured at construction.
pub struct OllamaClient {
    client: ollama::Client,
    model: String,
    handle: tokio::runtime::Handle,
}

impl OllamaClient {
    pub fn new(ollama_url: &str, model: &str, handle: tokio::runtime::Handle) -> Result<Self> {
        let client = ollama::Client::builder()
            .api_key(Nothing)
            .base_url(ollama_url)
            .build()
            .map_err(|e| eyre!("Failed to create Ollama client: {}", e))?;

        Ok(Self {
            client,
            model: model.to_string(),
            handle,
        })
    }
}

impl LlmClient for OllamaClient {
    fn complete(&self, request: &LlmRequest) -> std::result::Result<Value, LlmError> {
        let prompt = build_prompt(request);
        log::debug!(
            "{}: sending {} chars to {}",
            request.objective,
            prompt.len(),
            self.model
        );

        let agent = self
            .client
            .agent(&self.model)
            .preamble(SYSTEM_PREAMBLE)
            .build();
        let response = self
            .handle
            .block_on(async { agent.prompt(&prompt).await })
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        extract_json(&response)
    }
}
