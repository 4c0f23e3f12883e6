//! Header and footer boundary detection.
//!
//! Two independent strategies propose a boundary per page:
//!
//! - **zone**: blocks lying entirely inside the configured top/bottom zone;
//! - **contextual**: SECTION-sized gaps inside the top/bottom quarter.
//!
//! Each strategy is then aggregated across pages on its own and both results
//! are reported side by side; callers pick or compare.

use serde::{Deserialize, Serialize};

use crate::config::ZoneConfig;
use crate::spacing::{classify_gap, GapType, SpacingRules};
use crate::stats;
use crate::types::PageBlocks;

/// Boundary y-values are voted on in half-point buckets.
const BOUNDARY_BUCKETS_PER_POINT: f32 = 2.0;

/// An aggregated boundary and how many pages agree on it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    /// y-coordinate: bottom of the header, or top of the footer.
    pub y: f32,
    /// `supporting_pages / voting_pages`.
    pub confidence: f32,
    pub supporting_pages: usize,
    /// Pages that proposed any candidate. Pages without one abstain.
    pub voting_pages: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundaryPair {
    pub header: Option<Boundary>,
    pub footer: Option<Boundary>,
}

impl BoundaryPair {
    pub fn is_empty(&self) -> bool {
        self.header.is_none() && self.footer.is_none()
    }
}

/// Per-strategy results for a whole document.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeaderFooterReport {
    pub zone: BoundaryPair,
    pub contextual: BoundaryPair,
    pub pages: usize,
}

impl HeaderFooterReport {
    /// Neither strategy found anything.
    pub fn is_empty(&self) -> bool {
        self.zone.is_empty() && self.contextual.is_empty()
    }
}

/// Candidate boundaries proposed by a single page.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PageCandidates {
    pub page: usize,
    pub zone_header: Option<f32>,
    pub zone_footer: Option<f32>,
    pub contextual_header: Option<f32>,
    pub contextual_footer: Option<f32>,
}

/// Run both strategies on every page and aggregate.
pub fn detect_boundaries(
    pages: &[PageBlocks],
    rules: &SpacingRules,
    zones: &ZoneConfig,
) -> HeaderFooterReport {
    let candidates: Vec<PageCandidates> = pages
        .iter()
        .map(|page| page_candidates(page, rules, zones))
        .collect();

    let report = HeaderFooterReport {
        zone: BoundaryPair {
            header: aggregate(candidates.iter().map(|c| c.zone_header)),
            footer: aggregate(candidates.iter().map(|c| c.zone_footer)),
        },
        contextual: BoundaryPair {
            header: aggregate(candidates.iter().map(|c| c.contextual_header)),
            footer: aggregate(candidates.iter().map(|c| c.contextual_footer)),
        },
        pages: pages.len(),
    };

    log::debug!(
        "header/footer detection over {} pages: zone={:?} contextual={:?}",
        pages.len(),
        report.zone,
        report.contextual
    );

    report
}

/// Candidate boundaries of one page.
pub fn page_candidates(page: &PageBlocks, rules: &SpacingRules, zones: &ZoneConfig) -> PageCandidates {
    let header_limit = zones.header_height_pts();
    let footer_limit = page.height - zones.footer_height_pts();

    // Lowest bottom edge among blocks entirely inside the header zone.
    let zone_header = page
        .blocks
        .iter()
        .filter(|b| b.bbox.top >= 0.0 && b.bbox.bottom <= header_limit)
        .map(|b| b.bbox.bottom)
        .reduce(f32::max);

    // Highest top edge among blocks entirely inside the footer zone.
    let zone_footer = page
        .blocks
        .iter()
        .filter(|b| b.bbox.top >= footer_limit && b.bbox.bottom <= page.height)
        .map(|b| b.bbox.top)
        .reduce(f32::min);

    let quarter = page.height / 4.0;
    let mut contextual_header = None;
    let mut contextual_footer = None;

    for pair in page.blocks.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        let gap = next.gap_before.unwrap_or(0.0);
        if classify_gap(gap, next.context_size(), rules) != GapType::Section {
            continue;
        }

        // The first wide gap near the top separates the header from the body;
        // the last one near the bottom separates the body from the footer.
        if prev.bbox.bottom <= quarter && contextual_header.is_none() {
            contextual_header = Some(prev.bbox.bottom);
        }
        if next.bbox.top >= page.height - quarter {
            contextual_footer = Some(next.bbox.top);
        }
    }

    PageCandidates {
        page: page.number,
        zone_header,
        zone_footer,
        contextual_header,
        contextual_footer,
    }
}

/// Modal candidate across pages, with the fraction of voting pages that
/// support it.
fn aggregate(candidates: impl Iterator<Item = Option<f32>>) -> Option<Boundary> {
    let votes: Vec<f32> = candidates.flatten().collect();
    let (y, supporting_pages) = stats::mode_with_count(&votes, BOUNDARY_BUCKETS_PER_POINT)?;
    Some(Boundary {
        y,
        confidence: supporting_pages as f32 / votes.len() as f32,
        supporting_pages,
        voting_pages: votes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpacingConfig;
    use crate::spacing::SpacingRule;
    use crate::types::{BBox, Block, ContextSize};

    fn make_block(text: &str, top: f32, bottom: f32, size: f32) -> Block {
        Block {
            page: 1,
            lines: Vec::new(),
            text: text.to_string(),
            predominant_size: size,
            predominant_font: "Body".to_string(),
            size_coverage: 1.0,
            font_coverage: 1.0,
            bbox: BBox::new(72.0, top, 540.0, bottom),
            gap_before: None,
            gap_after: None,
        }
    }

    fn make_page(number: usize, mut blocks: Vec<Block>) -> PageBlocks {
        for i in 1..blocks.len() {
            let gap = (blocks[i].bbox.top - blocks[i - 1].bbox.bottom).max(0.0);
            blocks[i - 1].gap_after = Some(gap);
            blocks[i].gap_before = Some(gap);
        }
        for b in &mut blocks {
            b.page = number;
        }
        PageBlocks {
            number,
            width: 612.0,
            height: 792.0,
            blocks,
        }
    }

    /// 10pt body with 2pt line spacing: LINE <= 2.4 < PARA <= 11 < SECTION.
    fn body_rules() -> SpacingRules {
        vec![SpacingRule::new(
            ContextSize::from_points(10.0),
            2.0,
            20,
            &SpacingConfig::default(),
        )]
        .into_iter()
        .collect()
    }

    fn page_with_running_header(number: usize, header_bottom: f32) -> PageBlocks {
        make_page(
            number,
            vec![
                make_block("Running title", 40.0, header_bottom, 10.0),
                make_block("Body text", 120.0, 400.0, 10.0),
                make_block("Body text", 406.0, 700.0, 10.0),
                make_block("Page 1", 750.0, 760.0, 10.0),
            ],
        )
    }

    #[test]
    fn test_zone_candidates() {
        let page = page_with_running_header(1, 50.0);
        let c = page_candidates(&page, &body_rules(), &ZoneConfig::default());
        assert_eq!(c.zone_header, Some(50.0));
        assert_eq!(c.zone_footer, Some(750.0));
    }

    #[test]
    fn test_contextual_candidates() {
        let page = page_with_running_header(1, 50.0);
        let c = page_candidates(&page, &body_rules(), &ZoneConfig::default());
        // 70pt gap under the header, 50pt gap above the folio.
        assert_eq!(c.contextual_header, Some(50.0));
        assert_eq!(c.contextual_footer, Some(750.0));
    }

    #[test]
    fn test_block_straddling_zone_is_not_candidate() {
        let page = make_page(
            1,
            vec![
                make_block("Tall block", 40.0, 200.0, 10.0),
                make_block("Body", 202.0, 500.0, 10.0),
            ],
        );
        let c = page_candidates(&page, &body_rules(), &ZoneConfig::default());
        assert_eq!(c.zone_header, None);
        assert_eq!(c.zone_footer, None);
        assert_eq!(c.contextual_header, None);
    }

    #[test]
    fn test_aggregate_mode_and_confidence() {
        let pages = vec![
            page_with_running_header(1, 50.0),
            page_with_running_header(2, 50.0),
            page_with_running_header(3, 50.2),
            page_with_running_header(4, 62.0),
        ];
        let report = detect_boundaries(&pages, &body_rules(), &ZoneConfig::default());

        let header = report.zone.header.unwrap();
        assert_eq!(header.y, 50.0);
        assert_eq!(header.supporting_pages, 3);
        assert_eq!(header.voting_pages, 4);
        assert!((header.confidence - 0.75).abs() < 1e-6);
        assert!(!report.is_empty());
        assert_eq!(report.pages, 4);
    }

    #[test]
    fn test_pages_without_candidates_abstain() {
        let bare = make_page(3, vec![make_block("Body", 120.0, 600.0, 10.0)]);
        let pages = vec![
            page_with_running_header(1, 50.0),
            page_with_running_header(2, 50.0),
            bare,
        ];
        let report = detect_boundaries(&pages, &body_rules(), &ZoneConfig::default());

        let header = report.zone.header.unwrap();
        assert_eq!(header.voting_pages, 2);
        assert_eq!(header.confidence, 1.0);
    }

    #[test]
    fn test_no_candidates_reports_nothing() {
        let pages = vec![make_page(1, vec![make_block("Body", 120.0, 600.0, 10.0)])];
        let report = detect_boundaries(&pages, &body_rules(), &ZoneConfig::default());
        assert!(report.is_empty());
        assert!(detect_boundaries(&[], &body_rules(), &ZoneConfig::default()).is_empty());
    }
}
