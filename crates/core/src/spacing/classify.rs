use serde::{Deserialize, Serialize};

use super::rules::{SpacingRule, SpacingRules};
use crate::types::ContextSize;

/// Category of a vertical gap, ordered from tightest to widest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GapType {
    Line,
    Para,
    Section,
}

/// Which rule a classification was made with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSource {
    /// The gap's own context had a rule.
    Exact,
    /// The context was unseen; the dominant context's rule was used instead.
    Fallback(ContextSize),
    /// No rules at all; the gap defaulted to [`GapType::Line`].
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapClassification {
    pub gap_type: GapType,
    pub source: RuleSource,
}

impl GapClassification {
    pub fn is_fallback(&self) -> bool {
        !matches!(self.source, RuleSource::Exact)
    }
}

/// Classify `gap` within `context`.
///
/// Negative gaps are clamped to zero. Band upper bounds are inclusive, so a
/// gap exactly on a boundary falls into the lower category.
pub fn classify_gap(gap: f32, context: ContextSize, rules: &SpacingRules) -> GapType {
    classify_gap_detailed(gap, context, rules).gap_type
}

/// Like [`classify_gap`], also reporting which rule was applied.
pub fn classify_gap_detailed(
    gap: f32,
    context: ContextSize,
    rules: &SpacingRules,
) -> GapClassification {
    if let Some(rule) = rules.get(context) {
        return GapClassification {
            gap_type: classify_with_rule(gap, rule),
            source: RuleSource::Exact,
        };
    }

    match rules.dominant() {
        Some(rule) => {
            log::debug!(
                "no spacing rule for {}, falling back to {}",
                context,
                rule.context
            );
            GapClassification {
                gap_type: classify_with_rule(gap, rule),
                source: RuleSource::Fallback(rule.context),
            }
        }
        None => GapClassification {
            gap_type: GapType::Line,
            source: RuleSource::Default,
        },
    }
}

/// Classify `gap` against a single rule.
pub fn classify_with_rule(gap: f32, rule: &SpacingRule) -> GapType {
    // f32::max discards NaN, so a NaN gap also lands on zero.
    let gap = gap.max(0.0);
    let (line_hi, para_hi) = rule.thresholds();

    if gap <= line_hi {
        GapType::Line
    } else if gap <= para_hi {
        GapType::Para
    } else {
        GapType::Section
    }
}
