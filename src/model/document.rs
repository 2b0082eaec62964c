//! Flow document and metadata types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::block::LogicalBlock;

/// The reconstructed flow document: classified blocks in reading order plus
/// source metadata.
///
/// Produced by the pipeline, consumed read-only by target writers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowDocument {
    /// Blocks in reading order. `HeaderText`/`FooterText` appear at most
    /// once each, ahead of the body blocks.
    pub blocks: Vec<LogicalBlock>,

    /// Source document metadata.
    pub metadata: Metadata,
}

impl FlowDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// The converted header text, if any.
    pub fn header_text(&self) -> Option<&str> {
        self.blocks.iter().find_map(|b| match b {
            LogicalBlock::HeaderText { text } => Some(text.as_str()),
            _ => None,
        })
    }

    /// The converted footer text, if any.
    pub fn footer_text(&self) -> Option<&str> {
        self.blocks.iter().find_map(|b| match b {
            LogicalBlock::FooterText { text } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Body blocks (everything except header/footer text).
    pub fn body_blocks(&self) -> impl Iterator<Item = &LogicalBlock> {
        self.blocks.iter().filter(|b| {
            !matches!(
                b,
                LogicalBlock::HeaderText { .. } | LogicalBlock::FooterText { .. }
            )
        })
    }

    /// Concatenated plain text of the body, blocks separated by blank lines.
    pub fn plain_text(&self) -> String {
        self.body_blocks()
            .map(|b| b.plain_text())
            .filter(|t| !t.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Number of distinct source pages referenced by body blocks.
    pub fn page_count(&self) -> usize {
        let mut pages: Vec<u32> = self.body_blocks().filter_map(|b| b.page()).collect();
        pages.sort_unstable();
        pages.dedup();
        pages.len()
    }
}

/// Source document metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// Document title
    pub title: Option<String>,

    /// Document author
    pub author: Option<String>,

    /// Document subject
    pub subject: Option<String>,

    /// Creator application
    pub creator: Option<String>,

    /// Producer
    pub producer: Option<String>,

    /// Creation date
    pub created: Option<DateTime<Utc>>,

    /// Last modification date
    pub modified: Option<DateTime<Utc>>,

    /// Total pages in the source document
    pub page_count: u32,

    /// Whether the source was encrypted
    pub encrypted: bool,
}

/// Parse a PDF date string (D:YYYYMMDDHHmmSS...).
pub fn parse_pdf_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.strip_prefix("D:")?;

    if s.len() < 4 {
        return None;
    }

    let year: i32 = s.get(0..4)?.parse().ok()?;
    let month: u32 = s.get(4..6).and_then(|m| m.parse().ok()).unwrap_or(1);
    let day: u32 = s.get(6..8).and_then(|d| d.parse().ok()).unwrap_or(1);
    let hour: u32 = s.get(8..10).and_then(|h| h.parse().ok()).unwrap_or(0);
    let minute: u32 = s.get(10..12).and_then(|m| m.parse().ok()).unwrap_or(0);
    let second: u32 = s.get(12..14).and_then(|x| x.parse().ok()).unwrap_or(0);

    chrono::NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc))
}
