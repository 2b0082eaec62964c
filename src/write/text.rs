//! Plain-text writing.

use crate::model::{FlowDocument, LogicalBlock};

/// Render a flow document as plain text.
///
/// Blocks are separated by blank lines; converted header text leads the
/// output and footer text closes it. Image payloads have no text form and
/// are skipped.
pub fn render_text(doc: &FlowDocument) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(header) = doc.header_text() {
        parts.push(header.to_string());
    }

    for block in doc.body_blocks() {
        match block {
            LogicalBlock::Heading { .. } | LogicalBlock::Paragraph { .. } => {
                let text = block.plain_text();
                if !text.trim().is_empty() {
                    parts.push(text);
                }
            }
            LogicalBlock::ListItem { .. } => {
                parts.push(format!("- {}", block.plain_text()));
            }
            LogicalBlock::Table { region, .. } => {
                parts.push(region.plain_text());
            }
            LogicalBlock::Image { .. } => {}
            _ => {}
        }
    }

    if let Some(footer) = doc.footer_text() {
        parts.push(footer.to_string());
    }

    let mut output = parts.join("\n\n");
    output.push('\n');
    output
}
