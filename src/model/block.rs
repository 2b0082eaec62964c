//! Logical blocks — the reconstructed flow-document units.

use serde::{Deserialize, Serialize};

use super::image::ExtractedImage;

/// A run of text with uniform formatting inside a block.
///
/// Run boundaries occur exactly where the style changes, never mid-style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// The text content
    pub text: String,

    /// Bold formatting
    pub bold: bool,

    /// Italic formatting
    pub italic: bool,
}

impl Run {
    /// Create a plain run.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: false,
        }
    }

    /// Create a bold run.
    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
            italic: false,
        }
    }

    /// Create an italic run.
    pub fn italic(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: true,
        }
    }

    /// Whether two runs can be merged into one.
    pub fn same_style(&self, other: &Run) -> bool {
        self.bold == other.bold && self.italic == other.italic
    }
}

/// List marker kind detected at the start of a list item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ListMarker {
    /// Bullet glyph (•, -, *, ...)
    Bullet,
    /// Numbered marker with its ordinal (`1.`, `a)`, ...)
    Numbered {
        /// Position in the list, 1-based.
        ordinal: u32,
    },
}

/// A best-effort table region: rows of plain-text cells assigned by
/// column-gap boundaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableRegion {
    /// Cell text, row-major.
    pub rows: Vec<Vec<String>>,

    /// Column boundary X positions used for cell assignment.
    pub columns: Vec<f32>,

    /// Always true: table detection is approximate, and writers may treat a
    /// misdetected table as acceptable degraded paragraphs.
    pub best_effort: bool,
}

impl TableRegion {
    /// Create a region from rows.
    pub fn new(rows: Vec<Vec<String>>, columns: Vec<f32>) -> Self {
        Self {
            rows,
            columns,
            best_effort: true,
        }
    }

    /// Number of columns (widest row).
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|r| r.len()).max().unwrap_or(0)
    }

    /// Tab-joined plain text, one line per row.
    pub fn plain_text(&self) -> String {
        self.rows
            .iter()
            .map(|r| r.join("\t"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A classified structural unit in reading order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogicalBlock {
    /// A heading with level 1..=6.
    Heading {
        /// Heading level, 1 is largest.
        level: u8,
        /// Formatting runs.
        runs: Vec<Run>,
        /// Source page (1-indexed).
        page: u32,
        /// Top Y of the block on its source page.
        y: f32,
    },

    /// A body paragraph.
    Paragraph {
        /// Formatting runs.
        runs: Vec<Run>,
        /// Source page (1-indexed).
        page: u32,
        /// Top Y of the block on its source page.
        y: f32,
    },

    /// A list item.
    ListItem {
        /// Detected marker.
        marker: ListMarker,
        /// Formatting runs (marker text excluded).
        runs: Vec<Run>,
        /// Source page (1-indexed).
        page: u32,
        /// Top Y of the block on its source page.
        y: f32,
    },

    /// A best-effort table region.
    Table {
        /// The detected region.
        region: TableRegion,
        /// Source page (1-indexed).
        page: u32,
        /// Top Y of the block on its source page.
        y: f32,
    },

    /// An extracted image at its anchor position.
    Image {
        /// The processed image payload.
        image: ExtractedImage,
    },

    /// Recurring header text, emitted once per target-document section.
    HeaderText {
        /// Representative text.
        text: String,
    },

    /// Recurring footer text, emitted once per target-document section.
    FooterText {
        /// Representative text.
        text: String,
    },
}

impl LogicalBlock {
    /// Source page of the block, where applicable.
    pub fn page(&self) -> Option<u32> {
        match self {
            LogicalBlock::Heading { page, .. }
            | LogicalBlock::Paragraph { page, .. }
            | LogicalBlock::ListItem { page, .. }
            | LogicalBlock::Table { page, .. } => Some(*page),
            LogicalBlock::Image { image } => Some(image.anchor.page),
            _ => None,
        }
    }

    /// Formatting runs of a text-bearing block.
    pub fn runs(&self) -> Option<&[Run]> {
        match self {
            LogicalBlock::Heading { runs, .. }
            | LogicalBlock::Paragraph { runs, .. }
            | LogicalBlock::ListItem { runs, .. } => Some(runs),
            _ => None,
        }
    }

    /// Concatenated plain text of the block.
    pub fn plain_text(&self) -> String {
        match self {
            LogicalBlock::Heading { runs, .. }
            | LogicalBlock::Paragraph { runs, .. }
            | LogicalBlock::ListItem { runs, .. } => {
                runs.iter().map(|r| r.text.as_str()).collect()
            }
            LogicalBlock::Table { region, .. } => region.plain_text(),
            LogicalBlock::HeaderText { text } | LogicalBlock::FooterText { text } => text.clone(),
            LogicalBlock::Image { .. } => String::new(),
        }
    }

    /// Whether this is a heading block.
    pub fn is_heading(&self) -> bool {
        matches!(self, LogicalBlock::Heading { .. })
    }

    /// Heading level, if this is a heading.
    pub fn heading_level(&self) -> Option<u8> {
        match self {
            LogicalBlock::Heading { level, .. } => Some(*level),
            _ => None,
        }
    }
}

/// Merge adjacent runs that share a style, dropping empty ones.
pub fn coalesce_runs(runs: Vec<Run>) -> Vec<Run> {
    let mut merged: Vec<Run> = Vec::with_capacity(runs.len());
    for run in runs {
        if run.text.is_empty() {
            continue;
        }
        match merged.last_mut() {
            Some(last) if last.same_style(&run) => last.text.push_str(&run.text),
            _ => merged.push(run),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_constructors() {
        assert!(Run::bold("x").bold);
        assert!(Run::italic("x").italic);
        assert!(!Run::new("x").bold);
    }

    #[test]
    fn test_coalesce_runs() {
        let runs = vec![
            Run::new("Hello "),
            Run::new("world"),
            Run::bold("!"),
            Run::new(""),
            Run::bold("!"),
        ];
        let merged = coalesce_runs(runs);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, "Hello world");
        assert_eq!(merged[1].text, "!!");
        assert!(merged[1].bold);
    }

    #[test]
    fn test_block_plain_text() {
        let block = LogicalBlock::Paragraph {
            runs: vec![Run::new("Hello "), Run::bold("world")],
            page: 1,
            y: 700.0,
        };
        assert_eq!(block.plain_text(), "Hello world");
        assert_eq!(block.page(), Some(1));
        assert!(!block.is_heading());
    }

    #[test]
    fn test_table_region() {
        let region = TableRegion::new(
            vec![
                vec!["Name".into(), "Age".into()],
                vec!["Alice".into(), "30".into()],
            ],
            vec![72.0, 300.0],
        );
        assert!(region.best_effort);
        assert_eq!(region.column_count(), 2);
        assert_eq!(region.plain_text(), "Name\tAge\nAlice\t30");
    }
}
