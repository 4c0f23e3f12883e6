use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use pagewise_core::analysis::{default_registry, HEADER_FOOTER, SECTION_HEADINGS};
use pagewise_core::llm::{LlmClient, LlmRequest};
use pagewise_core::types::BBox;
use pagewise_core::workflow::WorkflowOrchestrator;
use pagewise_core::{analyze_layout, AnalysisConfig, Document, LlmError, Line, Page};
use serde_json::{json, Value};

const BODY: f32 = 10.0;
const HEADING: f32 = 14.0;

fn make_line(text: &str, top: f32, size: f32, font: &str, gap_before: f32) -> Line {
    Line {
        text: text.to_string(),
        bbox: BBox::new(72.0, top, 540.0, top + size),
        text_segments: Vec::new(),
        predominant_size: size,
        predominant_font: font.to_string(),
        predominant_size_coverage: 1.0,
        gap_before,
        gap_after: 0.0,
    }
}

/// A paragraph, a heading 24pt below it, and a second paragraph 12pt below
/// the heading. Body lines are 10pt, `leading` apart. Everything sits well
/// inside the page, away from any header or footer zone.
fn make_page(number: usize, leading: f32) -> Page {
    let mut lines = Vec::new();
    let mut top = 200.0;

    for i in 0..6 {
        let gap = if i == 0 { 0.0 } else { leading };
        lines.push(make_line(&format!("First paragraph line {i}"), top, BODY, "Times", gap));
        top += BODY + leading;
    }
    top += 24.0 - leading;

    lines.push(make_line(&format!("{number} Section"), top, HEADING, "Times-Bold", 24.0));
    top += HEADING + 12.0;

    for i in 0..8 {
        let gap = if i == 0 { 12.0 } else { leading };
        lines.push(make_line(&format!("Second paragraph line {i}"), top, BODY, "Times", gap));
        top += BODY + leading;
    }

    Page {
        number,
        width: 612.0,
        height: 792.0,
        lines,
    }
}

fn document_with_leading(leading: f32) -> Document {
    let pages: Vec<Page> = (1..=3).map(|n| make_page(n, leading)).collect();
    let json = serde_json::to_string(&Document { pages }).unwrap();
    Document::from_json(&json).unwrap()
}

fn document() -> Document {
    document_with_leading(2.0)
}

#[test]
fn test_three_page_document_layout() {
    let layout = analyze_layout(&document(), &AnalysisConfig::default());

    assert_eq!(layout.pages.len(), 3);
    for page in &layout.pages {
        let headings: Vec<_> = page
            .blocks
            .iter()
            .filter(|b| b.predominant_size == HEADING)
            .collect();
        assert_eq!(headings.len(), 1, "page {}", page.number);
        assert!(headings[0].bbox.height() < 20.0);
        assert_eq!(headings[0].line_count(), 1);

        let body = page
            .blocks
            .iter()
            .filter(|b| b.predominant_size == BODY)
            .count();
        assert!(body >= 1, "page {} has no body block", page.number);
    }

    let rule = layout.rules.iter().find(|r| r.context.as_points() == BODY).unwrap();
    assert_eq!(rule.most_common_gap, 2.0);
    assert!(!rule.is_degraded());

    assert!(layout.boundaries.is_empty());
}

#[test]
fn test_uniform_leading_overlapping_bands() {
    // 12pt between every body line: the 10pt rule has mode 12, a line band
    // ending at 14.4 and a paragraph band ending at 11.0.
    let layout = analyze_layout(&document_with_leading(12.0), &AnalysisConfig::default());

    let rule = layout.rules.iter().find(|r| r.context.as_points() == BODY).unwrap();
    assert_eq!(rule.most_common_gap, 12.0);
    assert!(rule.bands_overlap());
    assert!(rule.is_degraded());
    assert_eq!(rule.thresholds(), (rule.para_spacing_max, rule.line_spacing_range.1));

    assert_eq!(layout.pages.len(), 3);
    for page in &layout.pages {
        let headings: Vec<_> = page
            .blocks
            .iter()
            .filter(|b| b.predominant_size == HEADING)
            .collect();
        assert_eq!(headings.len(), 1, "page {}", page.number);
        assert!(headings[0].bbox.height() < 20.0);

        // 12pt gaps classify as PARA, so every body line stands alone.
        let body: Vec<_> = page
            .blocks
            .iter()
            .filter(|b| b.predominant_size == BODY)
            .collect();
        assert_eq!(body.len(), 14, "page {}", page.number);
        assert!(body.iter().all(|b| b.line_count() == 1));
    }

    assert!(layout.boundaries.is_empty());
}

/// Replays canned answers in order.
struct Replay(Mutex<VecDeque<Value>>);

impl LlmClient for Replay {
    fn complete(&self, _request: &LlmRequest) -> Result<Value, LlmError> {
        self.0
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LlmError::Transport("no answer left".to_string()))
    }
}

#[test]
fn test_workflow_over_layout() {
    let layout = Arc::new(analyze_layout(&document(), &AnalysisConfig::default()));
    let client = Arc::new(Replay(Mutex::new(VecDeque::from(vec![
        json!({"header_y": null, "footer_y": null}),
        json!({
            "headings": [{"text": "1 Section", "level": 1, "page": 1}],
            "numbering_pattern": "N Title"
        }),
    ]))));

    let registry = default_registry(client).unwrap();
    let orchestrator = WorkflowOrchestrator::new(registry, AnalysisConfig::default());
    let results = orchestrator.run_workflow(layout, HEADER_FOOTER).unwrap();

    assert_eq!(results.trace, vec![HEADER_FOOTER.to_string(), SECTION_HEADINGS.to_string()]);
    assert_eq!(results.knowledge["numbering_pattern"], json!("N Title"));
    assert_eq!(
        results.knowledge["heading_fonts"],
        json!([{"level": 1, "font": "Times-Bold", "size": 14.0}])
    );
    assert_eq!(results.knowledge["header_boundary"], Value::Null);
}
