//! Structure inference engine.
//!
//! Consumes body spans (header/footer already excluded) and produces typed
//! raw blocks: headings, paragraphs, list items, and best-effort table
//! regions. Two explicit passes: a document-wide font statistics pass, then
//! per-page classification — cross-page aggregation (the font histogram)
//! must complete before any page can be classified.
//!
//! Classification never fails: ambiguous input degrades to the more generic
//! class and records a warning, because under-structuring is preferred to
//! corrupting content.

mod tables;

pub use tables::{DetectedTable, TableFinder, TableFinderConfig};

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::ConversionConfig;
use crate::error::Warning;
use crate::model::{ListMarker, PageSpans, Span};

/// Document-wide font statistics for heading detection.
#[derive(Debug, Clone, Default)]
pub struct FontStatistics {
    /// Body text size (the most frequent size).
    pub body_size: f32,
    /// Sizes strictly larger than body, sorted descending.
    pub heading_sizes: Vec<f32>,
    /// Observed sizes at 0.1 pt precision → frequency.
    size_histogram: HashMap<i32, usize>,
}

impl FontStatistics {
    /// Record one size observation.
    pub fn add_size(&mut self, size: f32) {
        let key = (size * 10.0).round() as i32;
        *self.size_histogram.entry(key).or_insert(0) += 1;
    }

    /// Compute body size and the heading-size ranking.
    pub fn analyze(&mut self) {
        if self.size_histogram.is_empty() {
            self.body_size = 12.0;
            return;
        }

        let (body_key, _) = self
            .size_histogram
            .iter()
            .max_by_key(|(_, count)| *count)
            .unwrap();
        self.body_size = *body_key as f32 / 10.0;

        let mut larger: Vec<f32> = self
            .size_histogram
            .keys()
            .map(|k| *k as f32 / 10.0)
            .filter(|size| *size > self.body_size + 0.3)
            .collect();
        larger.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        self.heading_sizes = larger;
    }

    /// Heading level for a font size: 1 for the largest ranked size, down to
    /// 6; 0 for body text. Sizes at or below body size are never headings.
    pub fn heading_level(&self, font_size: f32) -> u8 {
        if font_size <= self.body_size + 0.3 {
            return 0;
        }
        for (i, &size) in self.heading_sizes.iter().enumerate() {
            if font_size >= size - 0.5 {
                return (i + 1).min(6) as u8;
            }
        }
        0
    }
}

/// A text line: spans sharing one baseline, in x order.
#[derive(Debug, Clone)]
pub struct Line {
    /// Member spans sorted by x.
    pub spans: Vec<Span>,
    /// Leftmost x.
    pub x: f32,
    /// Baseline y.
    pub baseline: f32,
    /// Dominant font size, weighted by text length.
    pub font_size: f32,
    /// Source page.
    pub page: u32,
    /// Assigned heading level (0 = body).
    pub heading_level: u8,
}

impl Line {
    /// Build a line from spans on one baseline.
    pub fn from_spans(mut spans: Vec<Span>) -> Self {
        spans.sort_by(|a, b| a.x0.partial_cmp(&b.x0).unwrap_or(std::cmp::Ordering::Equal));

        let total_chars: usize = spans.iter().map(|s| s.text.len()).sum();
        let weighted: f32 = spans
            .iter()
            .map(|s| s.font_size * s.text.len() as f32)
            .sum();
        let font_size = if total_chars > 0 {
            weighted / total_chars as f32
        } else {
            spans.first().map(|s| s.font_size).unwrap_or(12.0)
        };

        let x = spans.first().map(|s| s.x0).unwrap_or(0.0);
        let baseline = spans.first().map(|s| s.baseline).unwrap_or(0.0);
        let page = spans.first().map(|s| s.page).unwrap_or(1);

        Self {
            spans,
            x,
            baseline,
            font_size,
            page,
            heading_level: 0,
        }
    }

    /// Plain text of the line, space-joined.
    pub fn text(&self) -> String {
        self.spans
            .iter()
            .map(|s| s.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Whether the line is predominantly bold.
    pub fn is_bold(&self) -> bool {
        let bold: usize = self
            .spans
            .iter()
            .filter(|s| s.is_bold)
            .map(|s| s.text.len())
            .sum();
        let total: usize = self.spans.iter().map(|s| s.text.len()).sum();
        total > 0 && bold * 2 > total
    }
}

/// Classified kind of a raw text block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    /// Heading with level 1..=6.
    Heading(u8),
    /// Ordinary paragraph.
    Paragraph,
    /// List item with its marker.
    ListItem(ListMarker),
}

/// A classified run of lines, before paragraph reconstruction.
#[derive(Debug, Clone)]
pub struct RawBlock {
    /// Block kind.
    pub kind: BlockKind,
    /// Member lines in reading order.
    pub lines: Vec<Line>,
    /// Source page.
    pub page: u32,
    /// Top y of the block.
    pub y: f32,
}

/// One inferred unit in reading order.
#[derive(Debug, Clone)]
pub enum InferredBlock {
    /// A text block for the reconstructor.
    Text(RawBlock),
    /// A detected table region.
    Table(DetectedTable),
}

/// The inference engine.
pub struct StructureEngine<'a> {
    config: &'a ConversionConfig,
    stats: FontStatistics,
}

impl<'a> StructureEngine<'a> {
    /// Create an engine over one run's config.
    pub fn new(config: &'a ConversionConfig) -> Self {
        Self {
            config,
            stats: FontStatistics::default(),
        }
    }

    /// Font statistics computed by [`Self::infer`].
    pub fn stats(&self) -> &FontStatistics {
        &self.stats
    }

    /// Run both passes over the body pages.
    pub fn infer(&mut self, pages: &[PageSpans]) -> (Vec<InferredBlock>, Vec<Warning>) {
        // Pass 1: document-wide statistics.
        for page in pages {
            for span in &page.spans {
                self.stats.add_size(span.font_size);
            }
        }
        self.stats.analyze();
        log::debug!(
            "font stats: body={}pt, {} heading sizes",
            self.stats.body_size,
            self.stats.heading_sizes.len()
        );

        // Pass 2: per-page classification.
        let mut blocks = Vec::new();
        let mut warnings = Vec::new();
        for page in pages {
            self.infer_page(page, &mut blocks, &mut warnings);
        }

        (blocks, warnings)
    }

    fn infer_page(
        &self,
        page: &PageSpans,
        out: &mut Vec<InferredBlock>,
        warnings: &mut Vec<Warning>,
    ) {
        if page.is_empty() {
            return;
        }

        let (tables, rest, table_warnings) = TableFinder::new().detect(page.spans.clone());
        warnings.extend(table_warnings);

        let columns = if self.config.preserve_layout {
            detect_columns(&rest)
        } else {
            vec![]
        };

        // (column index, -y) sort key keeps column reading order while
        // interleaving full-width tables at their vertical position.
        let mut items: Vec<(usize, f32, InferredBlock)> = Vec::new();

        if columns.len() > 1 {
            for (idx, (left, right)) in columns.iter().enumerate() {
                let col_spans: Vec<Span> = rest
                    .iter()
                    .filter(|s| {
                        let center = s.x0 + s.width() / 2.0;
                        center >= *left && center < *right
                    })
                    .cloned()
                    .collect();
                for block in self.segment(col_spans, warnings) {
                    items.push((idx, -block.y, InferredBlock::Text(block)));
                }
            }
        } else {
            for block in self.segment(rest, warnings) {
                items.push((0, -block.y, InferredBlock::Text(block)));
            }
        }

        for table in tables {
            items.push((0, -table.y, InferredBlock::Table(table)));
        }

        items.sort_by(|a, b| {
            a.0.cmp(&b.0).then(
                a.1.partial_cmp(&b.1)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
        });
        out.extend(items.into_iter().map(|(_, _, block)| block));
    }

    /// Group one column's spans into lines, then lines into blocks.
    fn segment(&self, spans: Vec<Span>, warnings: &mut Vec<Warning>) -> Vec<RawBlock> {
        let mut lines = group_into_lines(spans, self.config.profile().line_tolerance);
        if lines.is_empty() {
            return vec![];
        }

        for line in &mut lines {
            line.heading_level = self.stats.heading_level(line.font_size);
        }

        let avg_spacing = average_spacing(&lines);
        let profile = self.config.profile();
        let gap_threshold = avg_spacing * profile.gap_factor;

        let mut blocks: Vec<RawBlock> = Vec::new();
        let mut current: Vec<Line> = Vec::new();
        let mut current_kind = BlockKind::Paragraph;

        let flush = |blocks: &mut Vec<RawBlock>,
                     lines: &mut Vec<Line>,
                     kind: &BlockKind,
                     warnings: &mut Vec<Warning>| {
            if lines.is_empty() {
                return;
            }
            let mut kind = kind.clone();
            // A "heading" spanning many lines is body text in a large font.
            if matches!(kind, BlockKind::Heading(_)) && lines.len() > 3 {
                warnings.push(Warning::Classification {
                    page: lines[0].page,
                    detail: format!(
                        "{}-line heading candidate degraded to paragraph",
                        lines.len()
                    ),
                });
                kind = BlockKind::Paragraph;
            }
            let first = &lines[0];
            blocks.push(RawBlock {
                page: first.page,
                y: first.baseline + first.font_size * 0.8,
                kind,
                lines: std::mem::take(lines),
            });
        };

        for mut line in lines {
            let marker = take_list_marker(&mut line);

            let break_before = match current.last() {
                None => false,
                Some(prev) => {
                    let gap = (prev.baseline - line.baseline).abs();
                    let kind_change = match (&current_kind, &marker, line.heading_level) {
                        // New marker always opens a new item.
                        (_, Some(_), _) => true,
                        // Level transitions split heading blocks.
                        (BlockKind::Heading(level), None, hl) => hl != *level,
                        (_, None, hl) if hl > 0 => true,
                        // Marker-less continuation of a list item must keep
                        // the item's indentation.
                        (BlockKind::ListItem(_), None, _) => {
                            line.x < prev.x - profile.indent_tolerance
                                || gap > gap_threshold
                        }
                        _ => false,
                    };

                    kind_change
                        || !self.config.merge_paragraphs
                        || gap > gap_threshold
                        || (prev.font_size - line.font_size).abs() > 1.0
                        || (prev.x - line.x).abs() > profile.indent_tolerance
                }
            };

            if break_before {
                flush(&mut blocks, &mut current, &current_kind, warnings);
            }

            if current.is_empty() {
                current_kind = if let Some(marker) = marker {
                    BlockKind::ListItem(marker)
                } else if line.heading_level > 0 {
                    BlockKind::Heading(line.heading_level)
                } else {
                    BlockKind::Paragraph
                };
            }
            current.push(line);
        }
        flush(&mut blocks, &mut current, &current_kind, warnings);

        blocks
    }
}

/// Group spans into baseline lines. `tolerance` is a fraction of font size.
pub fn group_into_lines(spans: Vec<Span>, tolerance: f32) -> Vec<Line> {
    if spans.is_empty() {
        return vec![];
    }

    let mut spans = spans;
    spans.sort_by(|a, b| {
        let y_cmp = b
            .baseline
            .partial_cmp(&a.baseline)
            .unwrap_or(std::cmp::Ordering::Equal);
        if y_cmp == std::cmp::Ordering::Equal {
            a.x0.partial_cmp(&b.x0).unwrap_or(std::cmp::Ordering::Equal)
        } else {
            y_cmp
        }
    });

    let mut lines = Vec::new();
    let mut current: Vec<Span> = Vec::new();
    let mut current_y: Option<f32> = None;

    for span in spans {
        let y_tolerance = span.font_size * tolerance;
        match current_y {
            Some(y) if (span.baseline - y).abs() <= y_tolerance => current.push(span),
            _ => {
                if !current.is_empty() {
                    lines.push(Line::from_spans(std::mem::take(&mut current)));
                }
                current_y = Some(span.baseline);
                current.push(span);
            }
        }
    }
    if !current.is_empty() {
        lines.push(Line::from_spans(current));
    }

    lines
}

/// Average absolute baseline spacing between consecutive lines.
fn average_spacing(lines: &[Line]) -> f32 {
    let spacings: Vec<f32> = lines
        .windows(2)
        .map(|w| (w[0].baseline - w[1].baseline).abs())
        .filter(|s| *s > 0.1)
        .collect();

    if spacings.is_empty() {
        return 12.0;
    }
    spacings.iter().sum::<f32>() / spacings.len() as f32
}

fn bullet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*([•▪◦‣·\-\*])\s+").expect("bullet pattern"))
}

fn numbered_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(?:(\d{1,3})|([a-z]))[.)]\s+").expect("number pattern"))
}

/// Detect and strip a list marker from the start of a line.
fn take_list_marker(line: &mut Line) -> Option<ListMarker> {
    let first = line.spans.first_mut()?;

    if let Some(end) = bullet_re().find(&first.text).map(|m| m.end()) {
        first.text.replace_range(..end, "");
        return Some(ListMarker::Bullet);
    }

    let (end, ordinal) = {
        let caps = numbered_re().captures(&first.text)?;
        let ordinal = if let Some(digits) = caps.get(1) {
            digits.as_str().parse().unwrap_or(1)
        } else {
            let letter = caps.get(2)?.as_str().chars().next()?;
            (letter as u32).saturating_sub('a' as u32) + 1
        };
        (caps.get(0)?.end(), ordinal)
    };
    first.text.replace_range(..end, "");
    Some(ListMarker::Numbered { ordinal })
}

/// Detect a two-column layout from the vertical occupancy histogram.
///
/// Returns column x ranges left to right, or an empty vec for single-column
/// pages. Looks for the widest empty vertical slice gap near the page
/// center; both resulting columns must be reasonably wide and populated.
pub fn detect_columns(spans: &[Span]) -> Vec<(f32, f32)> {
    if spans.len() < 8 {
        return vec![];
    }

    let min_x = spans
        .iter()
        .map(|s| s.x0)
        .fold(f32::INFINITY, f32::min);
    let max_x = spans
        .iter()
        .map(|s| s.x1)
        .fold(f32::NEG_INFINITY, f32::max);
    let width = max_x - min_x;
    if width < 250.0 {
        return vec![];
    }

    let slice_width = 3.0;
    let num_slices = (width / slice_width) as usize + 1;
    let mut occupancy = vec![0usize; num_slices];

    for span in spans {
        let start = ((span.x0 - min_x) / slice_width) as usize;
        let end = ((span.x1 - min_x) / slice_width) as usize;
        for slot in occupancy
            .iter_mut()
            .take(end.min(num_slices - 1) + 1)
            .skip(start)
        {
            *slot += 1;
        }
    }

    // Widest empty run inside the middle 70% of the page.
    let search_start = num_slices * 15 / 100;
    let search_end = num_slices * 85 / 100;
    let mut best = (0usize, 0usize);
    let mut run_start = 0;
    let mut run_len = 0;

    for i in search_start..search_end {
        if occupancy[i] == 0 {
            if run_len == 0 {
                run_start = i;
            }
            run_len += 1;
            if run_len > best.1 {
                best = (run_start, run_len);
            }
        } else {
            run_len = 0;
        }
    }

    let gap_width = best.1 as f32 * slice_width;
    if gap_width < 12.0 {
        return vec![];
    }

    let gutter = min_x + (best.0 as f32 + best.1 as f32 / 2.0) * slice_width;
    if gutter - min_x < 80.0 || max_x - gutter < 80.0 {
        return vec![];
    }

    let left_count = spans
        .iter()
        .filter(|s| s.x0 + s.width() / 2.0 < gutter)
        .count();
    let right_count = spans.len() - left_count;
    let min_count = (spans.len() / 10).max(2);
    if left_count < min_count || right_count < min_count {
        return vec![];
    }

    vec![
        (min_x - 10.0, gutter),
        (gutter, max_x + 10.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Quality;

    fn span(text: &str, x: f32, y: f32, size: f32) -> Span {
        let mut s = Span::new(text.to_string(), 1, x, y, size, "Helvetica".to_string());
        s.x1 = s.x0 + text.chars().count() as f32 * size * 0.5;
        s
    }

    fn page_with(spans: Vec<Span>) -> PageSpans {
        let mut page = PageSpans::new(1, 595.0, 842.0);
        page.spans = spans;
        page
    }

    #[test]
    fn test_font_statistics() {
        let mut stats = FontStatistics::default();
        for _ in 0..100 {
            stats.add_size(11.0);
        }
        for _ in 0..5 {
            stats.add_size(18.0);
        }
        for _ in 0..3 {
            stats.add_size(24.0);
        }
        stats.analyze();

        assert!((stats.body_size - 11.0).abs() < 0.1);
        assert_eq!(stats.heading_level(11.0), 0);
        assert_eq!(stats.heading_level(24.0), 1);
        assert_eq!(stats.heading_level(18.0), 2);
    }

    #[test]
    fn test_heading_levels_monotonic_with_size() {
        let mut stats = FontStatistics::default();
        for _ in 0..50 {
            stats.add_size(10.0);
        }
        for size in [14.0, 18.0, 22.0, 28.0] {
            stats.add_size(size);
        }
        stats.analyze();

        let levels: Vec<u8> = [28.0, 22.0, 18.0, 14.0]
            .iter()
            .map(|s| stats.heading_level(*s))
            .collect();
        assert_eq!(levels, vec![1, 2, 3, 4]);
        // Body and smaller are never headings.
        assert_eq!(stats.heading_level(10.0), 0);
        assert_eq!(stats.heading_level(8.0), 0);
    }

    #[test]
    fn test_heading_then_paragraph() {
        let config = ConversionConfig::default();
        let mut engine = StructureEngine::new(&config);
        let pages = vec![page_with(vec![
            span("Introduction", 72.0, 760.0, 18.0),
            span("Body line one continues", 72.0, 738.0, 11.0),
            span("body line two of the text.", 72.0, 724.0, 11.0),
            // Body-size ballast so 11pt wins the histogram.
            span("more body", 72.0, 710.0, 11.0),
            span("and more body", 72.0, 696.0, 11.0),
        ])];

        let (blocks, _) = engine.infer(&pages);
        let texts: Vec<(bool, String)> = blocks
            .iter()
            .filter_map(|b| match b {
                InferredBlock::Text(raw) => Some((
                    matches!(raw.kind, BlockKind::Heading(_)),
                    raw.lines.iter().map(|l| l.text()).collect::<Vec<_>>().join(" "),
                )),
                _ => None,
            })
            .collect();

        assert!(texts[0].0, "first block should be a heading: {:?}", texts);
        assert_eq!(texts[0].1, "Introduction");
        assert!(!texts[1].0);
    }

    #[test]
    fn test_fast_merges_more_than_high() {
        // Lines 16pt apart with ~11pt average spacing elsewhere: fast
        // (factor 2.0 over avg) merges them, high (1.2) splits.
        let make_pages = || {
            vec![page_with(vec![
                span("alpha", 72.0, 700.0, 11.0),
                span("beta", 72.0, 688.0, 11.0),
                span("gamma", 72.0, 671.0, 11.0),
                span("delta", 72.0, 659.0, 11.0),
            ])]
        };

        let fast_config = ConversionConfig::new().with_quality(Quality::Fast);
        let mut fast = StructureEngine::new(&fast_config);
        let (fast_blocks, _) = fast.infer(&make_pages());

        let high_config = ConversionConfig::new().with_quality(Quality::High);
        let mut high = StructureEngine::new(&high_config);
        let (high_blocks, _) = high.infer(&make_pages());

        assert!(
            fast_blocks.len() < high_blocks.len(),
            "fast produced {} blocks, high produced {}",
            fast_blocks.len(),
            high_blocks.len()
        );
    }

    #[test]
    fn test_merge_paragraphs_disabled() {
        let config = ConversionConfig::new().with_merge_paragraphs(false);
        let mut engine = StructureEngine::new(&config);
        let pages = vec![page_with(vec![
            span("line one", 72.0, 700.0, 11.0),
            span("line two", 72.0, 688.0, 11.0),
            span("line three", 72.0, 676.0, 11.0),
        ])];

        let (blocks, _) = engine.infer(&pages);
        assert_eq!(blocks.len(), 3);
    }

    #[test]
    fn test_list_item_detection() {
        let config = ConversionConfig::default();
        let mut engine = StructureEngine::new(&config);
        let pages = vec![page_with(vec![
            span("Some introduction text here", 72.0, 700.0, 11.0),
            span("• first bullet point", 80.0, 686.0, 11.0),
            span("• second bullet point", 80.0, 672.0, 11.0),
            span("1. first numbered entry", 80.0, 658.0, 11.0),
        ])];

        let (blocks, _) = engine.infer(&pages);
        let kinds: Vec<&BlockKind> = blocks
            .iter()
            .filter_map(|b| match b {
                InferredBlock::Text(raw) => Some(&raw.kind),
                _ => None,
            })
            .collect();

        assert_eq!(kinds[0], &BlockKind::Paragraph);
        assert_eq!(kinds[1], &BlockKind::ListItem(ListMarker::Bullet));
        assert_eq!(kinds[2], &BlockKind::ListItem(ListMarker::Bullet));
        assert_eq!(
            kinds[3],
            &BlockKind::ListItem(ListMarker::Numbered { ordinal: 1 })
        );

        // Marker text must not leak into the line content.
        if let InferredBlock::Text(raw) = &blocks[1] {
            assert_eq!(raw.lines[0].text(), "first bullet point");
        } else {
            panic!("expected a text block");
        }
    }

    #[test]
    fn test_marker_stripped_from_text() {
        let mut line = Line::from_spans(vec![span("• bullet content", 80.0, 686.0, 11.0)]);
        let marker = take_list_marker(&mut line);
        assert_eq!(marker, Some(ListMarker::Bullet));
        assert_eq!(line.text(), "bullet content");

        let mut line = Line::from_spans(vec![span("2) second entry", 80.0, 672.0, 11.0)]);
        let marker = take_list_marker(&mut line);
        assert_eq!(marker, Some(ListMarker::Numbered { ordinal: 2 }));
        assert_eq!(line.text(), "second entry");
    }

    #[test]
    fn test_detect_columns_two_column_page() {
        let mut spans = Vec::new();
        for i in 0..12 {
            let y = 700.0 - i as f32 * 14.0;
            spans.push(span("left column text line", 50.0, y, 10.0));
            spans.push(span("right column text line", 320.0, y, 10.0));
        }
        let columns = detect_columns(&spans);
        assert_eq!(columns.len(), 2);
        assert!(columns[0].1 > 150.0 && columns[0].1 < 320.0);
    }

    #[test]
    fn test_detect_columns_single_column_page() {
        let spans: Vec<Span> = (0..10)
            .map(|i| {
                span(
                    "a single full width line of body text on the page",
                    72.0,
                    700.0 - i as f32 * 14.0,
                    11.0,
                )
            })
            .collect();
        assert!(detect_columns(&spans).is_empty());
    }
}
