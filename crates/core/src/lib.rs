//! Core library for pagewise
//!
//! This crate implements the **Functional Core** of pagewise: it turns lines
//! already extracted from a PDF into logical blocks, finds running headers
//! and footers, and drives the multi-pass analysis workflow. It never reads
//! files or talks to the network; the `pagewise` binary does that.
//!
//! # Pipeline
//!
//! ```text
//! Document --collect_gaps--> GapSamples --derive_rules--> SpacingRules
//!     |                                                       |
//!     +------------------------form_blocks--------------------+--> PageBlocks
//!                                                                   |
//!                                   detect_boundaries <-------------+
//!                                          |
//!                                   LayoutAnalysis --WorkflowOrchestrator--> WorkflowResults
//! ```
//!
//! Spacing rules are derived from the whole document before any page is
//! split into blocks; block formation itself runs page-parallel.
//!
//! # Module Organization
//!
//! - [`types`]: line, page and block records plus input validation
//! - [`spacing`]: gap collection, per-context rule derivation, classification
//! - [`blocks`]: merging classified lines into blocks
//! - [`header_footer`]: zone and contextual boundary detection
//! - [`workflow`]: the state machine engine
//! - [`analysis`]: concrete analysis passes and page sampling
//! - [`llm`]: the blocking language-model boundary
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use pagewise_core::{analyze_layout, AnalysisConfig, Document};
//!
//! let document = Document::from_json(&json)?;
//! let layout = analyze_layout(&document, &AnalysisConfig::default());
//! for page in &layout.pages {
//!     println!("page {}: {} blocks", page.number, page.blocks.len());
//! }
//! ```

pub mod analysis;
pub mod blocks;
pub mod config;
pub mod error;
pub mod header_footer;
pub mod llm;
pub mod spacing;
pub mod stats;
pub mod types;
pub mod workflow;

use serde::Serialize;

pub use config::AnalysisConfig;
pub use error::{ConfigError, DataContractError, LlmError, WorkflowError};
pub use header_footer::HeaderFooterReport;
pub use spacing::SpacingRules;
pub use types::{Block, Document, Line, Page, PageBlocks};

/// Everything the geometric stages know about a document. This is the
/// immutable input handed to the analysis workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayoutAnalysis {
    pub rules: SpacingRules,
    pub pages: Vec<PageBlocks>,
    pub boundaries: HeaderFooterReport,
}

impl LayoutAnalysis {
    pub fn block_count(&self) -> usize {
        self.pages.iter().map(|p| p.blocks.len()).sum()
    }
}

/// Derive spacing rules, form blocks and detect boundaries.
pub fn analyze_layout(document: &Document, config: &AnalysisConfig) -> LayoutAnalysis {
    let samples = spacing::collect_gaps(&document.pages, config.spacing.gap_epsilon);
    let rules = spacing::derive_rules(&samples, &config.spacing);
    let pages = blocks::form_blocks(&document.pages, &rules);
    let boundaries = header_footer::detect_boundaries(&pages, &rules, &config.zones);

    log::debug!(
        "layout: {} pages, {} lines, {} spacing rules, {} blocks",
        document.pages.len(),
        document.line_count(),
        rules.len(),
        pages.iter().map(|p| p.blocks.len()).sum::<usize>()
    );

    LayoutAnalysis {
        rules,
        pages,
        boundaries,
    }
}
