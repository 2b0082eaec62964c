//! Markdown reading (heading subset).
//!
//! Recognizes `#`, `##`, and `###` heading prefixes; everything else is
//! carried as paragraph text line by line, the way the page-oriented writer
//! expects to receive it.

use std::path::Path;

use crate::error::Result;
use crate::model::{FlowDocument, LogicalBlock, Run};

/// Read a Markdown file into a flow document.
pub fn read_markdown_file<P: AsRef<Path>>(path: P) -> Result<FlowDocument> {
    let content = std::fs::read_to_string(path)?;
    Ok(read_markdown(&content))
}

/// Parse Markdown text into a flow document.
pub fn read_markdown(content: &str) -> FlowDocument {
    let mut doc = FlowDocument::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let (level, text) = if let Some(rest) = line.strip_prefix("### ") {
            (Some(3), rest)
        } else if let Some(rest) = line.strip_prefix("## ") {
            (Some(2), rest)
        } else if let Some(rest) = line.strip_prefix("# ") {
            (Some(1), rest)
        } else {
            (None, line)
        };

        let runs = vec![Run::new(text.trim())];
        let block = match level {
            Some(level) => LogicalBlock::Heading {
                level,
                runs,
                page: 1,
                y: 0.0,
            },
            None => LogicalBlock::Paragraph {
                runs,
                page: 1,
                y: 0.0,
            },
        };
        doc.blocks.push(block);
    }

    doc
}
