//! Markdown writing.

use crate::model::{FlowDocument, ListMarker, LogicalBlock, Run, TableRegion};

/// Render a flow document as Markdown.
pub fn render_markdown(doc: &FlowDocument) -> String {
    let mut output = String::new();

    if let Some(header) = doc.header_text() {
        output.push_str(&format!("> {}\n\n", header));
    }

    for block in doc.body_blocks() {
        match block {
            LogicalBlock::Heading { level, runs, .. } => {
                // The heading prefix carries the emphasis; run styling
                // inside it would double up.
                output.push_str(&"#".repeat(*level as usize));
                output.push(' ');
                for run in runs {
                    output.push_str(&escape_markdown(&run.text));
                }
                output.push_str("\n\n");
            }
            LogicalBlock::Paragraph { runs, .. } => {
                if runs.iter().all(|r| r.text.trim().is_empty()) {
                    continue;
                }
                render_runs(&mut output, runs);
                output.push_str("\n\n");
            }
            LogicalBlock::ListItem { marker, runs, .. } => {
                match marker {
                    ListMarker::Bullet => output.push_str("- "),
                    ListMarker::Numbered { ordinal } => {
                        output.push_str(&format!("{}. ", ordinal))
                    }
                }
                render_runs(&mut output, runs);
                output.push('\n');
            }
            LogicalBlock::Table { region, .. } => {
                render_table(&mut output, region);
            }
            // Markdown output is the text subset; embedded payloads are
            // carried only by the container formats.
            LogicalBlock::Image { .. } => {}
            _ => {}
        }
    }

    if let Some(footer) = doc.footer_text() {
        output.push_str(&format!("> {}\n", footer));
    }

    let mut output = output.trim_end().to_string();
    output.push('\n');
    output
}

fn render_runs(output: &mut String, runs: &[Run]) {
    for run in runs {
        let text = escape_markdown(&run.text);
        let styled = if run.bold && run.italic {
            format!("***{}***", text)
        } else if run.bold {
            format!("**{}**", text)
        } else if run.italic {
            format!("*{}*", text)
        } else {
            text
        };
        output.push_str(&styled);
    }
}

fn render_table(output: &mut String, region: &TableRegion) {
    let cols = region.column_count();
    if cols == 0 {
        return;
    }

    for (i, row) in region.rows.iter().enumerate() {
        output.push('|');
        for c in 0..cols {
            let cell = row.get(c).map(|s| s.as_str()).unwrap_or("");
            output.push_str(&format!(" {} |", escape_markdown(cell)));
        }
        output.push('\n');

        if i == 0 {
            output.push('|');
            for _ in 0..cols {
                output.push_str(" --- |");
            }
            output.push('\n');
        }
    }

    output.push('\n');
}

/// Escape characters that would be read as Markdown syntax. Escaping is
/// minimal to keep the extracted text readable.
fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '`' | '*' | '_' | '[' | ']' | '|' => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }
    result
}
