//! Line, block and page records shared by every stage of the pipeline.
//!
//! Lines arrive from the extraction collaborator as JSON and are read-only
//! for the rest of the crate. [`Document::from_json`] is the single entry
//! point that turns raw input into validated records.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DataContractError;

/// PDF user-space units per inch.
pub const POINTS_PER_INCH: f32 = 72.0;

/// Width of one context-size bucket in points.
const CONTEXT_BUCKET: f32 = 0.5;

/// US Letter, the extractor's default page box.
const DEFAULT_PAGE_WIDTH: f32 = 612.0;
const DEFAULT_PAGE_HEIGHT: f32 = 792.0;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Axis-aligned box in page coordinates (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f32,
    pub top: f32,
    pub x1: f32,
    pub bottom: f32,
}

impl BBox {
    pub fn new(x0: f32, top: f32, x1: f32, bottom: f32) -> Self {
        BBox {
            x0,
            top,
            x1,
            bottom,
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Smallest box covering both `self` and `other`.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            top: self.top.min(other.top),
            x1: self.x1.max(other.x1),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Grow `self` in place to cover `other`.
    pub fn expand(&mut self, other: &BBox) {
        *self = self.union(other);
    }

    fn is_finite(&self) -> bool {
        self.x0.is_finite() && self.top.is_finite() && self.x1.is_finite() && self.bottom.is_finite()
    }
}

// ---------------------------------------------------------------------------
// Context size
// ---------------------------------------------------------------------------

/// A font size rounded to the nearest half point, used as the key for
/// grouping spacing statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContextSize(u32);

impl ContextSize {
    pub fn from_points(size: f32) -> Self {
        let half_points = (size.max(0.0) / CONTEXT_BUCKET).round();
        ContextSize(half_points as u32)
    }

    pub fn as_points(&self) -> f32 {
        self.0 as f32 * CONTEXT_BUCKET
    }
}

impl fmt::Display for ContextSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}pt", self.as_points())
    }
}

impl Serialize for ContextSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f32(self.as_points())
    }
}

impl<'de> Deserialize<'de> for ContextSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f32::deserialize(deserializer).map(ContextSize::from_points)
    }
}

// ---------------------------------------------------------------------------
// Lines
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontStyle {
    #[default]
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

/// A run of text sharing one font, size and style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSegment {
    pub text: String,
    pub font: String,
    pub size: f32,
    #[serde(default)]
    pub style: FontStyle,
    pub bbox: BBox,
}

/// An extracted line of text with its layout attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub text: String,
    pub bbox: BBox,
    #[serde(default)]
    pub text_segments: Vec<TextSegment>,
    pub predominant_size: f32,
    pub predominant_font: String,
    #[serde(default = "full_coverage")]
    pub predominant_size_coverage: f32,
    /// Vertical distance to the previous line. Extraction noise can make it
    /// negative; use [`Line::clamped_gap_before`] before classifying.
    pub gap_before: f32,
    pub gap_after: f32,
}

fn full_coverage() -> f32 {
    1.0
}

impl Line {
    pub fn context_size(&self) -> ContextSize {
        ContextSize::from_points(self.predominant_size)
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn clamped_gap_before(&self) -> f32 {
        self.gap_before.max(0.0)
    }
}

// ---------------------------------------------------------------------------
// Pages and documents
// ---------------------------------------------------------------------------

/// One page of extracted lines, in reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub number: usize,
    #[serde(default = "default_page_width")]
    pub width: f32,
    #[serde(default = "default_page_height")]
    pub height: f32,
    pub lines: Vec<Line>,
}

fn default_page_width() -> f32 {
    DEFAULT_PAGE_WIDTH
}

fn default_page_height() -> f32 {
    DEFAULT_PAGE_HEIGHT
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    pub pages: Vec<Page>,
}

impl Document {
    /// Parse and validate the extractor's JSON output.
    pub fn from_json(json: &str) -> Result<Self, DataContractError> {
        let document: Document =
            serde_json::from_str(json).map_err(|e| DataContractError::Malformed(e.to_string()))?;
        document.validate()?;
        Ok(document)
    }

    /// Check the shape of every page and line record.
    pub fn validate(&self) -> Result<(), DataContractError> {
        for page in &self.pages {
            validate_page(page)?;
        }
        Ok(())
    }

    pub fn line_count(&self) -> usize {
        self.pages.iter().map(|p| p.lines.len()).sum()
    }
}

fn validate_page(page: &Page) -> Result<(), DataContractError> {
    let page_err = |field: &'static str, reason: &str| DataContractError::InvalidPage {
        page: page.number,
        field,
        reason: reason.to_string(),
    };

    if !(page.height.is_finite() && page.height > 0.0) {
        return Err(page_err("height", "must be a positive number"));
    }
    if !(page.width.is_finite() && page.width > 0.0) {
        return Err(page_err("width", "must be a positive number"));
    }

    for (index, line) in page.lines.iter().enumerate() {
        validate_line(page.number, index, line)?;
    }
    Ok(())
}

fn validate_line(page: usize, line_index: usize, line: &Line) -> Result<(), DataContractError> {
    let field_err = |field: &'static str, reason: &str| DataContractError::InvalidField {
        page,
        line: line_index,
        field,
        reason: reason.to_string(),
    };

    if !line.bbox.is_finite() {
        return Err(field_err("bbox", "contains a non-finite coordinate"));
    }
    if line.bbox.x0 > line.bbox.x1 || line.bbox.top > line.bbox.bottom {
        return Err(field_err("bbox", "is inverted"));
    }
    if !line.predominant_size.is_finite() || line.predominant_size < 0.0 {
        return Err(field_err("predominant_size", "must be a non-negative number"));
    }
    if !line.is_blank() && line.predominant_size == 0.0 {
        return Err(field_err("predominant_size", "is zero on a non-empty line"));
    }
    if !(0.0..=1.0).contains(&line.predominant_size_coverage) {
        return Err(field_err("predominant_size_coverage", "must lie in [0, 1]"));
    }
    if !line.gap_before.is_finite() {
        return Err(field_err("gap_before", "must be finite"));
    }
    if !line.gap_after.is_finite() {
        return Err(field_err("gap_after", "must be finite"));
    }
    for segment in &line.text_segments {
        if !segment.size.is_finite() || segment.size < 0.0 {
            return Err(field_err("text_segments.size", "must be a non-negative number"));
        }
        if !segment.bbox.is_finite() {
            return Err(field_err("text_segments.bbox", "contains a non-finite coordinate"));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

/// A maximal run of consecutive lines judged to form one logical unit.
///
/// Built once by [`crate::blocks::form_blocks`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub page: usize,
    pub lines: Vec<Line>,
    pub text: String,
    pub predominant_size: f32,
    pub predominant_font: String,
    pub size_coverage: f32,
    pub font_coverage: f32,
    pub bbox: BBox,
    /// `None` for the first block on a page.
    pub gap_before: Option<f32>,
    /// `None` for the last block on a page.
    pub gap_after: Option<f32>,
}

impl Block {
    pub fn context_size(&self) -> ContextSize {
        ContextSize::from_points(self.predominant_size)
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

/// Blocks of a single page plus the page geometry they were formed on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageBlocks {
    pub number: usize,
    pub width: f32,
    pub height: f32,
    pub blocks: Vec<Block>,
}

/// Count characters per key and return the key covering the most text along
/// with its share. Ties go to the smallest key.
pub(crate) fn predominant<K: Ord + Clone>(weights: impl IntoIterator<Item = (K, usize)>) -> Option<(K, f32)> {
    let mut counts: BTreeMap<K, usize> = BTreeMap::new();
    let mut total = 0usize;
    for (key, weight) in weights {
        *counts.entry(key).or_insert(0) += weight;
        total += weight;
    }

    let mut best: Option<(K, usize)> = None;
    for (key, count) in counts {
        if best.as_ref().map_or(true, |(_, c)| count > *c) {
            best = Some((key, count));
        }
    }

    best.map(|(key, count)| {
        let share = if total == 0 {
            1.0
        } else {
            count as f32 / total as f32
        };
        (key, share)
    })
}
