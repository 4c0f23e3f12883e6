use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{ask, TOC, TOC_ENTRIES};
use crate::error::StateError;
use crate::llm::{LlmClient, LlmRequest};
use crate::types::PageBlocks;
use crate::workflow::{AnalysisState, ExecutionResult, StateTransition, WorkflowContext};

/// A page needs this many leader lines to count as a contents page.
const MIN_CONTENTS_LINES: usize = 3;

const INSTRUCTION: &str = "The lines below come from the document's table of contents, along \
with entries a pattern matcher already extracted. Correct and complete the entries. Reply with \
{\"entries\": [{\"title\": string, \"page\": integer, \"level\": integer}]}.";

/// One line of a table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub title: String,
    pub page: u32,
    #[serde(default = "top_level")]
    pub level: u32,
}

fn top_level() -> u32 {
    1
}

/// "Title .... 12", "Title … 12" or "Title      12".
fn leader_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<title>\S.*?)\s*(?:\.{2,}|…+|\s{3,})\s*(?P<page>\d{1,4})$").unwrap()
    })
}

/// Leading "2.3.1" style section number.
fn numbering_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+(?:\.\d+)*)\.?\s").unwrap())
}

/// Page numbers of pages that look like a table of contents.
pub fn find_contents_pages(pages: &[PageBlocks]) -> Vec<usize> {
    pages
        .iter()
        .filter(|page| {
            let hits = page
                .blocks
                .iter()
                .flat_map(|b| b.text.lines())
                .filter(|line| leader_regex().is_match(line.trim()))
                .count();
            hits >= MIN_CONTENTS_LINES
        })
        .map(|page| page.number)
        .collect()
}

/// Entries recognisable from the text alone. The level is the depth of the
/// leading section number, or 1 when there is none.
pub fn parse_toc_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<TocEntry> {
    lines
        .into_iter()
        .filter_map(|line| {
            let caps = leader_regex().captures(line.trim())?;
            let title = caps["title"].trim().to_string();
            let page = caps["page"].parse().ok()?;
            let level = numbering_regex()
                .captures(&title)
                .map_or(1, |n| n[1].split('.').count() as u32);
            Some(TocEntry { title, page, level })
        })
        .collect()
}

/// Parses the table of contents, preferring the model's reading and keeping
/// the pattern matcher's entries when the model is unavailable.
pub struct TocState {
    client: Arc<dyn LlmClient>,
}

impl TocState {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }
}

impl AnalysisState for TocState {
    fn name(&self) -> &'static str {
        TOC
    }

    fn transitions(&self) -> &'static [StateTransition] {
        &[]
    }

    fn execute(&self, context: &WorkflowContext) -> Result<ExecutionResult, StateError> {
        let pages = &context.input().pages;
        let contents = find_contents_pages(pages);

        let lines: Vec<(usize, &str)> = pages
            .iter()
            .filter(|p| contents.contains(&p.number))
            .flat_map(|p| p.blocks.iter().flat_map(move |b| b.text.lines().map(move |l| (p.number, l))))
            .collect();
        let local = parse_toc_lines(lines.iter().map(|(_, l)| *l));

        if contents.is_empty() {
            return Ok(ExecutionResult::success(json!({ "pages": [] }))
                .with_knowledge(TOC_ENTRIES, json!([])));
        }

        let request = LlmRequest::new(
            "parse the table of contents",
            INSTRUCTION,
            json!({
                "lines": lines.iter().map(|(page, text)| json!({"page": page, "text": text})).collect::<Vec<_>>(),
                "candidates": local,
            }),
        );

        let parsed = ask(self.client.as_ref(), &request, &["entries"]).and_then(|response| {
            serde_json::from_value::<Vec<TocEntry>>(response["entries"].clone())
                .map_err(|e| crate::error::LlmError::InvalidResponse(e.to_string()))
        });

        let result = match parsed {
            Ok(entries) => {
                log::debug!("table of contents: {} entries", entries.len());
                ExecutionResult::success(json!({ "pages": contents, "source": "llm" }))
                    .with_knowledge(TOC_ENTRIES, json!(entries))
            }
            Err(err) => {
                log::warn!("table of contents parsing failed, keeping {} local entries: {}", local.len(), err);
                ExecutionResult::failure(json!({
                    "pages": contents,
                    "source": "pattern",
                    "error": err.to_string(),
                }))
                .with_knowledge(TOC_ENTRIES, json!(local))
            }
        };
        Ok(result.with_metadata("contents_lines", Value::from(lines.len())))
    }

    fn determine_next_state(
        &self,
        _result: &ExecutionResult,
        _context: &WorkflowContext,
    ) -> Option<&'static str> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testing::{analysis, make_block, make_line, make_page, ScriptedClient};
    use crate::config::AnalysisConfig;
    use crate::error::LlmError;

    fn contents_page() -> PageBlocks {
        make_page(
            2,
            vec![
                make_block(2, vec![make_line("Contents", 80.0, 14.0)], "Bold"),
                make_block(
                    2,
                    vec![
                        make_line("1 Introduction ........ 3", 110.0, 10.0),
                        make_line("1.1 Scope ........ 4", 124.0, 10.0),
                        make_line("2 Methods … 7", 138.0, 10.0),
                        make_line("Index        120", 152.0, 10.0),
                    ],
                    "Body",
                ),
            ],
        )
    }

    fn body_page() -> PageBlocks {
        make_page(
            3,
            vec![make_block(3, vec![make_line("Plain prose with a number 12", 100.0, 10.0)], "Body")],
        )
    }

    fn context() -> WorkflowContext {
        WorkflowContext::new(
            Arc::new(analysis(vec![contents_page(), body_page()])),
            AnalysisConfig::default(),
        )
    }

    #[test]
    fn test_find_contents_pages() {
        assert_eq!(find_contents_pages(&[contents_page(), body_page()]), vec![2]);
        assert!(find_contents_pages(&[body_page()]).is_empty());
    }

    #[test]
    fn test_parse_toc_lines() {
        let entries = parse_toc_lines([
            "1 Introduction ........ 3",
            "1.1 Scope ........ 4",
            "2 Methods … 7",
            "Index        120",
            "Plain prose with a number 12",
        ]);
        assert_eq!(
            entries,
            vec![
                TocEntry { title: "1 Introduction".to_string(), page: 3, level: 1 },
                TocEntry { title: "1.1 Scope".to_string(), page: 4, level: 2 },
                TocEntry { title: "2 Methods".to_string(), page: 7, level: 1 },
                TocEntry { title: "Index".to_string(), page: 120, level: 1 },
            ]
        );
    }

    #[test]
    fn test_llm_entries_win() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(json!({
            "entries": [{"title": "Introduction", "page": 3, "level": 1}]
        }))]));
        let state = TocState::new(client.clone());
        let result = state.execute(&context()).unwrap();

        assert!(result.success);
        assert_eq!(
            result.knowledge[TOC_ENTRIES],
            json!([{"title": "Introduction", "page": 3, "level": 1}])
        );
        assert_eq!(state.determine_next_state(&result, &context()), None);
        assert_eq!(client.request_count(), 1);
    }

    #[test]
    fn test_llm_failure_keeps_pattern_entries() {
        let client = Arc::new(ScriptedClient::new(vec![Err(LlmError::Transport("down".to_string()))]));
        let result = TocState::new(client).execute(&context()).unwrap();

        assert!(!result.success);
        assert_eq!(result.knowledge[TOC_ENTRIES].as_array().unwrap().len(), 4);
        assert_eq!(result.results["source"], json!("pattern"));
    }

    #[test]
    fn test_bad_entry_shape_is_soft_failure() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(json!({"entries": [{"title": 3}]}))]));
        let result = TocState::new(client).execute(&context()).unwrap();
        assert!(!result.success);
    }

    #[test]
    fn test_no_contents_skips_model() {
        let client = Arc::new(ScriptedClient::default());
        let ctx = WorkflowContext::new(Arc::new(analysis(vec![body_page()])), AnalysisConfig::default());
        let result = TocState::new(client.clone()).execute(&ctx).unwrap();
        assert!(result.success);
        assert_eq!(result.knowledge[TOC_ENTRIES], json!([]));
        assert_eq!(client.request_count(), 0);
    }
}
