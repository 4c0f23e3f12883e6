//! Contextual spacing analysis.
//!
//! # Pipeline
//!
//! ```text
//! Page[]  ->  GapSamples  ->  SpacingRules  ->  GapType
//!             collect_gaps    derive_rules      classify_gap
//! ```
//!
//! Thresholds are never absolute: each font-size context derives its own
//! bands from the gaps actually observed between lines of that size.

pub mod classify;
pub mod collect;
pub mod rules;

pub use classify::{classify_gap, classify_gap_detailed, GapClassification, GapType, RuleSource};
pub use collect::{collect_gaps, collect_page_gaps, GapSamples};
pub use rules::{derive_rules, SpacingRule, SpacingRules};
