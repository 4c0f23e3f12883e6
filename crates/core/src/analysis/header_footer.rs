use std::sync::Arc;

use serde_json::{json, Value};

use super::{ask, sampled, summarize, FOOTER_BOUNDARY, HEADER_BOUNDARY, SECTION_HEADINGS};
use crate::error::StateError;
use crate::header_footer::{Boundary, HeaderFooterReport};
use crate::llm::{LlmClient, LlmRequest};
use crate::workflow::{AnalysisState, ExecutionResult, StateTransition, WorkflowContext};

/// Blocks taken from each end of a sampled page.
const EDGE_BLOCKS: usize = 3;

const TRANSITIONS: &[StateTransition] = &[StateTransition::new(
    SECTION_HEADINGS,
    "always",
    "look for section headings inside the confirmed body area",
)];

const INSTRUCTION: &str = "The blocks below come from the top and bottom of sampled pages, \
together with boundaries proposed by two geometric detectors. Decide where running headers \
end and running footers begin. Reply with {\"header_y\": number or null, \"footer_y\": number \
or null}, using the page's y-coordinates (0 at the top).";

/// Confirms the running header/footer boundaries with the model, falling
/// back to the geometric detectors when the model is unavailable.
pub struct HeaderFooterState {
    client: Arc<dyn LlmClient>,
}

impl HeaderFooterState {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    fn request(&self, context: &WorkflowContext) -> LlmRequest {
        let input = context.input();
        let config = &context.config().workflow;

        let pages: Vec<Value> = sampled(&input.pages, config)
            .into_iter()
            .map(|page| {
                let count = page.blocks.len();
                let bottom_start = count.saturating_sub(EDGE_BLOCKS).max(EDGE_BLOCKS.min(count));
                json!({
                    "page": page.number,
                    "height": page.height,
                    "top_blocks": summarize(page.blocks.iter().take(EDGE_BLOCKS), config),
                    "bottom_blocks": summarize(&page.blocks[bottom_start..], config),
                })
            })
            .collect();

        LlmRequest::new(
            "locate running headers and footers",
            INSTRUCTION,
            json!({
                "pages": pages,
                "detectors": input.boundaries,
            }),
        )
    }
}

impl AnalysisState for HeaderFooterState {
    fn name(&self) -> &'static str {
        super::HEADER_FOOTER
    }

    fn transitions(&self) -> &'static [StateTransition] {
        TRANSITIONS
    }

    fn execute(&self, context: &WorkflowContext) -> Result<ExecutionResult, StateError> {
        let report = &context.input().boundaries;
        let (detected_header, detected_footer) = detector_choice(report);

        if context.input().pages.is_empty() {
            return Ok(boundaries_result(
                ExecutionResult::success(json!({"source": "detector", "pages": 0})),
                detected_header,
                detected_footer,
            ));
        }

        let request = self.request(context);
        match ask(self.client.as_ref(), &request, &["header_y", "footer_y"]) {
            Ok(response) => {
                let header = response["header_y"].as_f64().map(|y| y as f32);
                let footer = response["footer_y"].as_f64().map(|y| y as f32);
                Ok(boundaries_result(
                    ExecutionResult::success(json!({"source": "llm", "response": response})),
                    header,
                    footer,
                ))
            }
            Err(err) => {
                log::warn!("header/footer confirmation failed, using detector result: {}", err);
                Ok(boundaries_result(
                    ExecutionResult::failure(json!({"source": "detector", "error": err.to_string()})),
                    detected_header,
                    detected_footer,
                ))
            }
        }
    }

    fn determine_next_state(
        &self,
        _result: &ExecutionResult,
        _context: &WorkflowContext,
    ) -> Option<&'static str> {
        Some(SECTION_HEADINGS)
    }
}

fn boundaries_result(result: ExecutionResult, header: Option<f32>, footer: Option<f32>) -> ExecutionResult {
    result
        .with_knowledge(HEADER_BOUNDARY, json!(header))
        .with_knowledge(FOOTER_BOUNDARY, json!(footer))
}

/// Per side, the more confident of the two detectors; zone wins ties.
pub(crate) fn detector_choice(report: &HeaderFooterReport) -> (Option<f32>, Option<f32>) {
    (
        more_confident(report.zone.header, report.contextual.header),
        more_confident(report.zone.footer, report.contextual.footer),
    )
}

fn more_confident(zone: Option<Boundary>, contextual: Option<Boundary>) -> Option<f32> {
    match (zone, contextual) {
        (Some(z), Some(c)) if c.confidence > z.confidence => Some(c.y),
        (Some(z), _) => Some(z.y),
        (None, c) => c.map(|c| c.y),
    }
}
