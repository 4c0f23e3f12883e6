//! Concrete analysis passes run by the workflow orchestrator.
//!
//! Each pass samples a handful of pages, packages the relevant blocks for the
//! language model and turns the answer into knowledge for later passes:
//!
//! ```text
//! header_footer -> section_headings -> toc
//!                        |              ^
//!                        v              |
//!               section_headings_retry -+
//! ```

mod header_footer;
mod headings;
mod toc;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

pub use header_footer::HeaderFooterState;
pub use headings::SectionHeadingState;
pub use toc::{find_contents_pages, parse_toc_lines, TocEntry, TocState};

use crate::config::WorkflowConfig;
use crate::error::{LlmError, WorkflowError};
use crate::llm::{require_fields, LlmClient, LlmRequest};
use crate::types::{Block, PageBlocks};
use crate::workflow::StateRegistry;

pub const HEADER_FOOTER: &str = "header_footer";
pub const SECTION_HEADINGS: &str = "section_headings";
pub const SECTION_HEADINGS_RETRY: &str = "section_headings_retry";
pub const TOC: &str = "toc";

/// Knowledge keys shared between passes.
pub const HEADER_BOUNDARY: &str = "header_boundary";
pub const FOOTER_BOUNDARY: &str = "footer_boundary";
pub const HEADING_FONTS: &str = "heading_fonts";
pub const NUMBERING_PATTERN: &str = "numbering_pattern";
pub const TOC_ENTRIES: &str = "toc_entries";

/// Every analysis pass, wired to `client`.
pub fn default_registry(client: Arc<dyn LlmClient>) -> Result<StateRegistry, WorkflowError> {
    let mut registry = StateRegistry::new();

    let c = client.clone();
    registry.register(HEADER_FOOTER, move || Box::new(HeaderFooterState::new(c.clone())))?;

    let c = client.clone();
    registry.register(SECTION_HEADINGS, move || {
        Box::new(SectionHeadingState::primary(c.clone()))
    })?;

    let c = client.clone();
    registry.register(SECTION_HEADINGS_RETRY, move || {
        Box::new(SectionHeadingState::retry(c.clone()))
    })?;

    registry.register(TOC, move || Box::new(TocState::new(client.clone())))?;

    Ok(registry)
}

/// Indices of pages spread evenly over `page_count`, always including the
/// first and last page. At most `n` pages are taken, except that a single
/// requested sample still yields both ends.
pub fn sample_pages(page_count: usize, n: usize) -> Vec<usize> {
    if page_count == 0 || n == 0 {
        return Vec::new();
    }
    let n = n.max(2);
    if page_count <= n {
        return (0..page_count).collect();
    }

    let last = (page_count - 1) as f64;
    let steps = (n - 1) as f64;
    let mut indices: Vec<usize> = (0..n)
        .map(|i| (i as f64 * last / steps).round() as usize)
        .collect();
    indices.dedup();
    indices
}

/// The sampled subset of `pages`.
pub(crate) fn sampled<'a>(pages: &'a [PageBlocks], config: &WorkflowConfig) -> Vec<&'a PageBlocks> {
    sample_pages(pages.len(), config.sample_pages)
        .into_iter()
        .map(|i| &pages[i])
        .collect()
}

/// What the model sees of a block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockSummary {
    pub page: usize,
    pub text: String,
    pub font: String,
    pub size: f32,
    pub top: f32,
    pub bottom: f32,
    pub gap_before: Option<f32>,
}

impl BlockSummary {
    pub fn new(block: &Block, max_chars: usize) -> Self {
        Self {
            page: block.page,
            text: truncate_chars(&block.text, max_chars),
            font: block.predominant_font.clone(),
            size: block.predominant_size,
            top: block.bbox.top,
            bottom: block.bbox.bottom,
            gap_before: block.gap_before,
        }
    }
}

pub(crate) fn summarize<'a>(
    blocks: impl IntoIterator<Item = &'a Block>,
    config: &WorkflowConfig,
) -> Vec<BlockSummary> {
    blocks
        .into_iter()
        .take(config.max_blocks_per_page)
        .map(|block| BlockSummary::new(block, config.max_block_chars))
        .collect()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Send `request` and check the answer carries `fields`.
pub(crate) fn ask(client: &dyn LlmClient, request: &LlmRequest, fields: &[&str]) -> Result<Value, LlmError> {
    log::debug!("asking the model: {}", request.objective);
    let response = client.complete(request)?;
    require_fields(&response, fields)?;
    Ok(response)
}
