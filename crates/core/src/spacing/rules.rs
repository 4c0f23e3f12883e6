use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use super::collect::GapSamples;
use crate::config::SpacingConfig;
use crate::stats;
use crate::types::ContextSize;

/// Gap samples are bucketed to hundredths of a point before taking the mode.
const GAP_BUCKETS_PER_POINT: f32 = 100.0;

/// Spacing thresholds derived for one font-size context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpacingRule {
    pub context: ContextSize,
    pub most_common_gap: f32,
    /// `(mode * (1 - t), mode * (1 + t))`.
    pub line_spacing_range: (f32, f32),
    /// `context * m`.
    pub para_spacing_max: f32,
    pub sample_count: usize,
    /// Fewer samples than `min_samples` backed this rule.
    pub low_confidence: bool,
}

impl SpacingRule {
    pub fn new(
        context: ContextSize,
        most_common_gap: f32,
        sample_count: usize,
        config: &SpacingConfig,
    ) -> Self {
        let t = config.line_tolerance;
        SpacingRule {
            context,
            most_common_gap,
            line_spacing_range: (most_common_gap * (1.0 - t), most_common_gap * (1.0 + t)),
            para_spacing_max: context.as_points() * config.para_multiplier,
            sample_count,
            low_confidence: sample_count < config.min_samples,
        }
    }

    /// The line band reaches into (or past) the paragraph band, so the
    /// classification bands are only meaningful after reordering.
    pub fn bands_overlap(&self) -> bool {
        self.line_spacing_range.1 >= self.para_spacing_max
    }

    /// Upper bounds of the LINE and PARA bands, in ascending order.
    pub fn thresholds(&self) -> (f32, f32) {
        let line_hi = self.line_spacing_range.1;
        if self.bands_overlap() {
            (self.para_spacing_max, line_hi)
        } else {
            (line_hi, self.para_spacing_max)
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.low_confidence || self.bands_overlap()
    }
}

/// All spacing rules of a document, keyed by context size.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpacingRules {
    rules: BTreeMap<ContextSize, SpacingRule>,
}

impl SpacingRules {
    pub fn get(&self, context: ContextSize) -> Option<&SpacingRule> {
        self.rules.get(&context)
    }

    pub fn contains(&self, context: ContextSize) -> bool {
        self.rules.contains_key(&context)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpacingRule> {
        self.rules.values()
    }

    /// The rule backed by the most samples; ties go to the smallest context.
    /// Approximates "the document's body font size".
    pub fn dominant(&self) -> Option<&SpacingRule> {
        let mut best: Option<&SpacingRule> = None;
        for rule in self.rules.values() {
            if best.map_or(true, |b| rule.sample_count > b.sample_count) {
                best = Some(rule);
            }
        }
        best
    }
}

impl FromIterator<SpacingRule> for SpacingRules {
    fn from_iter<I: IntoIterator<Item = SpacingRule>>(iter: I) -> Self {
        SpacingRules {
            rules: iter.into_iter().map(|r| (r.context, r)).collect(),
        }
    }
}

impl Serialize for SpacingRules {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.rules.values())
    }
}

/// Derive one [`SpacingRule`] per context from the collected gaps.
pub fn derive_rules(samples: &GapSamples, config: &SpacingConfig) -> SpacingRules {
    samples
        .iter()
        .filter_map(|(&context, gaps)| {
            let mode = stats::mode(gaps, GAP_BUCKETS_PER_POINT)?;
            let rule = SpacingRule::new(context, mode, gaps.len(), config);

            if rule.bands_overlap() {
                log::warn!(
                    "spacing rule for {} is degraded: line band ends at {:.2} but paragraph band ends at {:.2}",
                    context,
                    rule.line_spacing_range.1,
                    rule.para_spacing_max
                );
            } else if rule.low_confidence {
                log::debug!(
                    "spacing rule for {} backed by only {} samples",
                    context,
                    rule.sample_count
                );
            }

            Some(rule)
        })
        .collect()
}
