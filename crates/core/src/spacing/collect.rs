use std::collections::BTreeMap;

use crate::types::{ContextSize, Line, Page};

/// Observed inter-line gaps, grouped by the font-size context they occur in.
pub type GapSamples = BTreeMap<ContextSize, Vec<f32>>;

/// Collect intra-context gaps across every page of a document.
///
/// Gaps never span a page break.
pub fn collect_gaps(pages: &[Page], epsilon: f32) -> GapSamples {
    let mut samples = GapSamples::new();
    for page in pages {
        collect_page_gaps(&page.lines, epsilon, &mut samples);
    }
    samples
}

/// Add the gaps of one page's lines to `samples`.
///
/// Only pairs of consecutive non-blank lines with the same context size
/// contribute; size transitions belong to block-boundary logic, not to the
/// spacing statistics of either size. Gaps at or below `epsilon` (including
/// negative extraction noise) are dropped.
pub fn collect_page_gaps(lines: &[Line], epsilon: f32, samples: &mut GapSamples) {
    for pair in lines.windows(2) {
        let (prev, line) = (&pair[0], &pair[1]);
        if prev.is_blank() || line.is_blank() {
            continue;
        }

        let context = line.context_size();
        if prev.context_size() != context {
            continue;
        }

        let gap = line.gap_before;
        if gap > epsilon {
            samples.entry(context).or_default().push(gap);
        }
    }
}
