use std::path::Path;

use pagewise_core::{analyze_layout, AnalysisConfig, Document, LayoutAnalysis};

use crate::prelude::{eprintln, *};

/// Read and validate the extractor's JSON output.
pub async fn load_document(path: &Path) -> Result<Document> {
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::Input {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    let document = Document::from_json(&json)
        .wrap_err_with(|| f!("{} does not contain valid line data", path.display()))?;

    if document.pages.is_empty() {
        return Err(Error::EmptyDocument(path.display().to_string()).into());
    }

    Ok(document)
}

/// The `--config` file if one was given, defaults otherwise.
pub fn load_config(global: &crate::Global) -> Result<AnalysisConfig> {
    match &global.config {
        Some(path) => AnalysisConfig::load(path)
            .wrap_err_with(|| f!("Failed to load config from {}", path.display())),
        None => Ok(AnalysisConfig::default()),
    }
}

/// Load a document and run the geometric stages on a blocking worker.
pub async fn prepare(path: &Path, global: &crate::Global) -> Result<(LayoutAnalysis, AnalysisConfig)> {
    let config = load_config(global)?;
    let document = load_document(path).await?;

    if global.verbose {
        eprintln!(
            "Loaded {} pages ({} lines) from {}",
            document.pages.len(),
            document.line_count(),
            path.display()
        );
    }

    let layout = tokio::task::spawn_blocking({
        let config = config.clone();
        move || analyze_layout(&document, &config)
    })
    .await?;

    if global.verbose {
        eprintln!(
            "Derived {} spacing rules and {} blocks",
            layout.rules.len(),
            layout.block_count()
        );
    }

    Ok((layout, config))
}
