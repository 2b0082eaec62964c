//! Plain-text reading.

use std::path::Path;

use crate::error::Result;
use crate::model::{FlowDocument, LogicalBlock, Run};

/// Read a plain-text file into a flow document, one paragraph per source
/// line. Blank lines carry no content and are dropped.
pub fn read_text_file<P: AsRef<Path>>(path: P) -> Result<FlowDocument> {
    let content = std::fs::read_to_string(path)?;
    Ok(read_text(&content))
}

/// Parse plain text into a flow document.
pub fn read_text(content: &str) -> FlowDocument {
    let mut doc = FlowDocument::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        doc.blocks.push(LogicalBlock::Paragraph {
            runs: vec![Run::new(line.trim_end())],
            page: 1,
            y: 0.0,
        });
    }

    doc
}
