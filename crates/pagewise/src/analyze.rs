use std::path::PathBuf;
use std::sync::Arc;

use pagewise_core::analysis::{default_registry, HEADER_FOOTER};
use pagewise_core::workflow::{WorkflowOrchestrator, WorkflowResults};

use crate::input::prepare;
use crate::llm::OllamaClient;
use crate::prelude::{eprintln, *};

#[derive(Debug, Clone, clap::Args)]
pub struct AnalyzeOptions {
    /// Extracted lines (JSON)
    pub path: PathBuf,

    /// State the workflow starts in
    #[clap(long, default_value = HEADER_FOOTER)]
    pub initial_state: String,

    /// Ollama base URL
    #[clap(long, env = "OLLAMA_URL", default_value = "http://localhost:11434")]
    pub ollama_url: String,

    /// Model used by the analysis passes
    #[clap(long, env = "PAGEWISE_MODEL", default_value = "llama3.1")]
    pub model: String,
}

pub async fn run(options: AnalyzeOptions, global: crate::Global) -> Result<()> {
    let (layout, config) = prepare(&options.path, &global).await?;

    if global.verbose {
        eprintln!("Ollama URL: {}", options.ollama_url);
        eprintln!("Model: {}", options.model);
        eprintln!("Initial state: {}", options.initial_state);
    }

    let client = OllamaClient::new(
        &options.ollama_url,
        &options.model,
        tokio::runtime::Handle::current(),
    )?;

    // States block on the model, so the whole run lives on a blocking worker.
    let results = tokio::task::spawn_blocking(move || -> Result<WorkflowResults> {
        let registry = default_registry(Arc::new(client))?;
        let orchestrator = WorkflowOrchestrator::new(registry, config);
        let results = orchestrator
            .run_workflow(Arc::new(layout), &options.initial_state)
            .wrap_err("Analysis workflow failed")?;
        Ok(results)
    })
    .await??;

    if global.verbose {
        eprintln!("Visited: {}", results.trace.join(" -> "));
    }

    print_json(&results)
}
