use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};

use super::toc::find_contents_pages;
use super::{
    ask, sampled, summarize, FOOTER_BOUNDARY, HEADER_BOUNDARY, HEADING_FONTS, NUMBERING_PATTERN,
    SECTION_HEADINGS, SECTION_HEADINGS_RETRY, TOC,
};
use crate::error::StateError;
use crate::llm::{LlmClient, LlmRequest};
use crate::types::Block;
use crate::workflow::{AnalysisState, ExecutionResult, StateTransition, WorkflowContext};

const REQUIRED: &[&str] = &[HEADER_BOUNDARY, FOOTER_BOUNDARY];

const PRIMARY_TRANSITIONS: &[StateTransition] = &[
    StateTransition::new(
        SECTION_HEADINGS_RETRY,
        "the model answer was unusable",
        "ask again once under a separate state",
    ),
    StateTransition::new(
        TOC,
        "headings found and a contents page exists",
        "parse the table of contents",
    ),
];

const RETRY_TRANSITIONS: &[StateTransition] = &[StateTransition::new(
    TOC,
    "a contents page exists",
    "parse the table of contents",
)];

const INSTRUCTION: &str = "The blocks below are body text from sampled pages, with their font \
and size. Identify which blocks are section headings and infer the section numbering scheme. \
Reply with {\"headings\": [{\"text\": string, \"level\": integer, \"page\": integer}], \
\"numbering_pattern\": string or null}.";

/// Font signature shared by the headings of one level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadingFont {
    pub level: u64,
    pub font: String,
    pub size: f32,
}

/// Finds section headings among body blocks. Registered twice: once as the
/// primary pass and once as its retry, so a failed first attempt is an
/// explicit edge in the workflow graph rather than a self-loop.
pub struct SectionHeadingState {
    name: &'static str,
    transitions: &'static [StateTransition],
    client: Arc<dyn LlmClient>,
}

impl SectionHeadingState {
    pub fn primary(client: Arc<dyn LlmClient>) -> Self {
        Self {
            name: SECTION_HEADINGS,
            transitions: PRIMARY_TRANSITIONS,
            client,
        }
    }

    pub fn retry(client: Arc<dyn LlmClient>) -> Self {
        Self {
            name: SECTION_HEADINGS_RETRY,
            transitions: RETRY_TRANSITIONS,
            client,
        }
    }

    fn is_retry(&self) -> bool {
        self.name == SECTION_HEADINGS_RETRY
    }
}

impl AnalysisState for SectionHeadingState {
    fn name(&self) -> &'static str {
        self.name
    }

    fn transitions(&self) -> &'static [StateTransition] {
        self.transitions
    }

    fn required_inputs(&self) -> &'static [&'static str] {
        REQUIRED
    }

    fn execute(&self, context: &WorkflowContext) -> Result<ExecutionResult, StateError> {
        let header = context.knowledge(HEADER_BOUNDARY).and_then(Value::as_f64);
        let footer = context.knowledge(FOOTER_BOUNDARY).and_then(Value::as_f64);
        let config = &context.config().workflow;

        let pages: Vec<Value> = sampled(&context.input().pages, config)
            .into_iter()
            .map(|page| {
                let body = page
                    .blocks
                    .iter()
                    .filter(|b| in_body(b, header, footer));
                json!({"page": page.number, "blocks": summarize(body, config)})
            })
            .collect();

        let request = LlmRequest::new("identify section headings", INSTRUCTION, json!({ "pages": pages }));
        let response = match ask(self.client.as_ref(), &request, &["headings", NUMBERING_PATTERN]) {
            Ok(response) if response["headings"].is_array() => response,
            Ok(_) => return Ok(soft_failure("`headings` is not a list".to_string())),
            Err(err) => return Ok(soft_failure(err.to_string())),
        };

        let fonts = heading_fonts(&response["headings"], &context.input().pages);
        log::debug!(
            "{}: {} headings, {} font signatures",
            self.name,
            response["headings"].as_array().map_or(0, Vec::len),
            fonts.len()
        );

        let attempt = if self.is_retry() { 2 } else { 1 };
        Ok(ExecutionResult::success(json!({
            "headings": response["headings"],
            "attempt": attempt,
        }))
        .with_knowledge(HEADING_FONTS, json!(fonts))
        .with_knowledge(NUMBERING_PATTERN, response[NUMBERING_PATTERN].clone()))
    }

    fn determine_next_state(
        &self,
        result: &ExecutionResult,
        context: &WorkflowContext,
    ) -> Option<&'static str> {
        if !result.success && !self.is_retry() {
            return Some(SECTION_HEADINGS_RETRY);
        }
        if find_contents_pages(&context.input().pages).is_empty() {
            None
        } else {
            Some(TOC)
        }
    }
}

fn soft_failure(error: String) -> ExecutionResult {
    log::warn!("section heading detection failed: {}", error);
    ExecutionResult::failure(json!({ "error": error }))
}

fn in_body(block: &Block, header: Option<f64>, footer: Option<f64>) -> bool {
    let top = f64::from(block.bbox.top);
    let bottom = f64::from(block.bbox.bottom);
    header.map_or(true, |h| top > h) && footer.map_or(true, |f| bottom < f)
}

/// Font signatures of the blocks whose text the model named as headings,
/// one per `(level, font, size)`.
fn heading_fonts(headings: &Value, pages: &[crate::types::PageBlocks]) -> Vec<HeadingFont> {
    let mut fonts: BTreeMap<(u64, String, u32), HeadingFont> = BTreeMap::new();

    for heading in headings.as_array().into_iter().flatten() {
        let Some(text) = heading["text"].as_str().map(str::trim) else {
            continue;
        };
        if text.is_empty() {
            continue;
        }
        let level = heading["level"].as_u64().unwrap_or(1);
        let page = heading["page"].as_u64();

        let block = pages
            .iter()
            .filter(|p| page.map_or(true, |n| p.number as u64 == n))
            .flat_map(|p| p.blocks.iter())
            .find(|b| b.text.trim().starts_with(text));

        if let Some(block) = block {
            let key = (level, block.predominant_font.clone(), (block.predominant_size * 2.0).round() as u32);
            fonts.entry(key).or_insert_with(|| HeadingFont {
                level,
                font: block.predominant_font.clone(),
                size: block.predominant_size,
            });
        }
    }

    fonts.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testing::{analysis, make_block, make_line, make_page, ScriptedClient};
    use crate::config::AnalysisConfig;
    use crate::error::LlmError;

    fn pages(with_contents: bool) -> Vec<crate::types::PageBlocks> {
        let mut pages = Vec::new();
        if with_contents {
            pages.push(make_page(
                1,
                vec![make_block(
                    1,
                    vec![
                        make_line("Introduction ........ 3", 100.0, 10.0),
                        make_line("Methods ........ 7", 114.0, 10.0),
                        make_line("Results ........ 12", 128.0, 10.0),
                    ],
                    "Body",
                )],
            ));
        }
        let n = pages.len() + 1;
        pages.push(make_page(
            n,
            vec![
                make_block(n, vec![make_line("Running title", 40.0, 9.0)], "Body"),
                make_block(n, vec![make_line("1 Introduction", 120.0, 14.0)], "Bold"),
                make_block(n, vec![make_line("Body text here.", 150.0, 10.0)], "Body"),
            ],
        ));
        pages
    }

    fn context(with_contents: bool) -> WorkflowContext {
        let mut ctx = WorkflowContext::new(Arc::new(analysis(pages(with_contents))), AnalysisConfig::default());
        ctx.record(
            super::super::HEADER_FOOTER,
            ExecutionResult::success(json!({}))
                .with_knowledge(HEADER_BOUNDARY, json!(60.0))
                .with_knowledge(FOOTER_BOUNDARY, Value::Null),
        )
        .unwrap();
        ctx
    }

    fn answer() -> Value {
        json!({
            "headings": [{"text": "1 Introduction", "level": 1, "page": 2}],
            "numbering_pattern": "N"
        })
    }

    #[test]
    fn test_headings_produce_font_signatures() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(answer())]));
        let state = SectionHeadingState::primary(client.clone());
        let ctx = context(true);

        let result = state.execute(&ctx).unwrap();
        assert!(result.success);
        assert_eq!(
            result.knowledge[HEADING_FONTS],
            json!([{"level": 1, "font": "Bold", "size": 14.0}])
        );
        assert_eq!(result.knowledge[NUMBERING_PATTERN], json!("N"));
        assert_eq!(state.determine_next_state(&result, &ctx), Some(TOC));

        // The running title sits above the header boundary and is not sent.
        let request = &client.requests.lock().unwrap()[0];
        let sent = request.payload.to_string();
        assert!(!sent.contains("Running title"));
        assert!(sent.contains("1 Introduction"));
    }

    #[test]
    fn test_no_contents_page_ends_workflow() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(answer())]));
        let state = SectionHeadingState::primary(client);
        let ctx = context(false);
        let result = state.execute(&ctx).unwrap();
        assert_eq!(state.determine_next_state(&result, &ctx), None);
    }

    #[test]
    fn test_failure_routes_to_retry_once() {
        let ctx = context(false);
        let failing = || Arc::new(ScriptedClient::new(vec![Err(LlmError::Transport("timeout".to_string()))]));

        let primary = SectionHeadingState::primary(failing());
        let result = primary.execute(&ctx).unwrap();
        assert!(!result.success);
        assert!(result.knowledge.is_empty());
        assert_eq!(
            primary.determine_next_state(&result, &ctx),
            Some(SECTION_HEADINGS_RETRY)
        );

        let retry = SectionHeadingState::retry(failing());
        let result = retry.execute(&ctx).unwrap();
        assert_eq!(retry.determine_next_state(&result, &ctx), None);
    }

    #[test]
    fn test_headings_must_be_a_list() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(
            json!({"headings": "none", "numbering_pattern": null}),
        )]));
        let result = SectionHeadingState::primary(client).execute(&context(false)).unwrap();
        assert!(!result.success);
    }

    #[test]
    fn test_missing_boundaries_fail_validation() {
        let ctx = WorkflowContext::new(Arc::new(analysis(pages(false))), AnalysisConfig::default());
        let state = SectionHeadingState::primary(Arc::new(ScriptedClient::default()));
        assert!(state.validate_input(&ctx).is_err());
        assert!(state.validate_input(&context(false)).is_ok());
    }
}
