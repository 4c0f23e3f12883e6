//! Block formation: merge consecutive lines into logical blocks.
//!
//! Rules must be derived from the *whole* document before any page is
//! processed; after that every page is independent, so pages are formed in
//! parallel.

use rayon::prelude::*;

use crate::spacing::{classify_gap, GapType, SpacingRules};
use crate::types::{predominant, BBox, Block, ContextSize, Line, Page, PageBlocks};

/// Form blocks for every page of a document.
pub fn form_blocks(pages: &[Page], rules: &SpacingRules) -> Vec<PageBlocks> {
    pages
        .par_iter()
        .map(|page| form_page_blocks(page, rules))
        .collect()
}

/// Form the blocks of one page.
///
/// A line continues the open block iff the block exists, shares the line's
/// context size, that size has a rule, and the line's clamped `gap_before`
/// classifies as [`GapType::Line`]. A font change alone never breaks a block.
pub fn form_page_blocks(page: &Page, rules: &SpacingRules) -> PageBlocks {
    let mut blocks: Vec<Block> = Vec::new();
    let mut current: Option<BlockBuilder> = None;

    for line in page.lines.iter().filter(|l| !l.is_blank()) {
        if let Some(builder) = current.as_mut() {
            if continues_block(builder, line, rules) {
                builder.push(line);
                continue;
            }
        }

        if let Some(builder) = current.take() {
            blocks.push(builder.finish());
        }
        current = Some(BlockBuilder::start(page.number, line));
    }

    if let Some(builder) = current {
        blocks.push(builder.finish());
    }

    link_block_gaps(&mut blocks);

    PageBlocks {
        number: page.number,
        width: page.width,
        height: page.height,
        blocks,
    }
}

fn continues_block(builder: &BlockBuilder, line: &Line, rules: &SpacingRules) -> bool {
    let context = line.context_size();
    builder.context == context
        && rules.contains(context)
        && classify_gap(line.clamped_gap_before(), context, rules) == GapType::Line
}

/// Set each block's `gap_before`/`gap_after` from the finalized bboxes.
fn link_block_gaps(blocks: &mut [Block]) {
    for i in 1..blocks.len() {
        let gap = (blocks[i].bbox.top - blocks[i - 1].bbox.bottom).max(0.0);
        blocks[i - 1].gap_after = Some(gap);
        blocks[i].gap_before = Some(gap);
    }
}

/// Accumulates lines for the block being formed.
struct BlockBuilder {
    page: usize,
    context: ContextSize,
    lines: Vec<Line>,
    bbox: BBox,
}

impl BlockBuilder {
    fn start(page: usize, line: &Line) -> Self {
        BlockBuilder {
            page,
            context: line.context_size(),
            lines: vec![line.clone()],
            bbox: line.bbox,
        }
    }

    fn push(&mut self, line: &Line) {
        self.bbox.expand(&line.bbox);
        self.lines.push(line.clone());
    }

    fn finish(self) -> Block {
        let text = self
            .lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let (size, size_coverage) = predominant(size_weights(&self.lines))
            .map(|(ctx, share)| (ctx.as_points(), share))
            .unwrap_or((self.context.as_points(), 1.0));
        let (font, font_coverage) =
            predominant(font_weights(&self.lines)).unwrap_or_else(|| (String::new(), 1.0));

        Block {
            page: self.page,
            lines: self.lines,
            text,
            predominant_size: size,
            predominant_font: font,
            size_coverage,
            font_coverage,
            bbox: self.bbox,
            gap_before: None,
            gap_after: None,
        }
    }
}

/// Character counts per size bucket, from segments when the extractor
/// provided them and from the line attributes otherwise.
fn size_weights(lines: &[Line]) -> Vec<(ContextSize, usize)> {
    lines
        .iter()
        .flat_map(|line| {
            if line.text_segments.is_empty() {
                vec![(line.context_size(), char_count(&line.text))]
            } else {
                line.text_segments
                    .iter()
                    .map(|s| (ContextSize::from_points(s.size), char_count(&s.text)))
                    .collect()
            }
        })
        .collect()
}

fn font_weights(lines: &[Line]) -> Vec<(String, usize)> {
    lines
        .iter()
        .flat_map(|line| {
            if line.text_segments.is_empty() {
                vec![(line.predominant_font.clone(), char_count(&line.text))]
            } else {
                line.text_segments
                    .iter()
                    .map(|s| (s.font.clone(), char_count(&s.text)))
                    .collect()
            }
        })
        .collect()
}

fn char_count(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}
