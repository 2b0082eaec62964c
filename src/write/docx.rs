//! DOCX writing via docx-rs.
//!
//! Maps logical blocks onto native Word structures: heading paragraph
//! styles, run-level bold/italic, list numbering, tables, inline images,
//! and a section header/footer applied once per document.

use std::io::Cursor;

use docx_rs::{
    AbstractNumbering, BreakType, Docx, Footer, Header, IndentLevel, Level, LevelJc, LevelText,
    NumberFormat, Numbering, NumberingId, Paragraph, Pic, Run as DocxRun, RunProperty, Start,
    Style, StyleType, Table, TableCell, TableRow,
};

use crate::error::{Error, Result};
use crate::model::{FlowDocument, ListMarker, LogicalBlock, Run};

/// Pixels to English Metric Units.
const EMU_PER_PX: u32 = 9525;

/// Heading font sizes in half-points, level 1 first.
const HEADING_SIZES: [usize; 6] = [36, 28, 24, 22, 22, 22];

/// Numbering ids registered on every document.
const BULLET_NUM_ID: usize = 1;
const DECIMAL_NUM_ID: usize = 2;

/// Render a flow document as a DOCX package.
pub fn render_docx(doc: &FlowDocument) -> Result<Vec<u8>> {
    let mut docx = Docx::new();

    docx = add_heading_styles(docx);
    docx = add_numberings(docx);

    if let Some(text) = doc.header_text() {
        docx = docx.header(Header::new().add_paragraph(
            Paragraph::new().add_run(DocxRun::new().add_text(text)),
        ));
    }
    if let Some(text) = doc.footer_text() {
        docx = docx.footer(Footer::new().add_paragraph(
            Paragraph::new().add_run(DocxRun::new().add_text(text)),
        ));
    }

    for block in doc.body_blocks() {
        docx = add_block(docx, block);
    }

    let mut buf = Vec::new();
    docx.build()
        .pack(Cursor::new(&mut buf))
        .map_err(|e| Error::Write(format!("DOCX packaging failed: {}", e)))?;

    Ok(buf)
}

/// Register Heading1..Heading6 paragraph styles.
fn add_heading_styles(mut docx: Docx) -> Docx {
    for (i, size) in HEADING_SIZES.iter().enumerate() {
        let level = i + 1;
        let mut style = Style::new(format!("Heading{}", level), StyleType::Paragraph)
            .name(format!("Heading {}", level));
        style.run_property = RunProperty::new().size(*size).bold();
        docx = docx.add_style(style);
    }
    docx
}

/// Register the bullet and decimal numbering definitions.
fn add_numberings(docx: Docx) -> Docx {
    docx.add_abstract_numbering(
        AbstractNumbering::new(BULLET_NUM_ID).add_level(Level::new(
            0,
            Start::new(1),
            NumberFormat::new("bullet"),
            LevelText::new("•"),
            LevelJc::new("left"),
        )),
    )
    .add_numbering(Numbering::new(BULLET_NUM_ID, BULLET_NUM_ID))
    .add_abstract_numbering(
        AbstractNumbering::new(DECIMAL_NUM_ID).add_level(Level::new(
            0,
            Start::new(1),
            NumberFormat::new("decimal"),
            LevelText::new("%1."),
            LevelJc::new("left"),
        )),
    )
    .add_numbering(Numbering::new(DECIMAL_NUM_ID, DECIMAL_NUM_ID))
}

fn add_block(docx: Docx, block: &LogicalBlock) -> Docx {
    match block {
        LogicalBlock::Heading { level, runs, .. } => {
            let clamped = (*level).clamp(1, 6);
            let mut para = Paragraph::new().style(&format!("Heading{}", clamped));
            para = add_runs(para, runs);
            docx.add_paragraph(para)
        }
        LogicalBlock::Paragraph { runs, .. } => {
            docx.add_paragraph(add_runs(Paragraph::new(), runs))
        }
        LogicalBlock::ListItem { marker, runs, .. } => {
            let num_id = match marker {
                ListMarker::Bullet => BULLET_NUM_ID,
                ListMarker::Numbered { .. } => DECIMAL_NUM_ID,
            };
            let para = Paragraph::new()
                .numbering(NumberingId::new(num_id), IndentLevel::new(0));
            docx.add_paragraph(add_runs(para, runs))
        }
        LogicalBlock::Table { region, .. } => {
            let cols = region.column_count();
            let rows: Vec<TableRow> = region
                .rows
                .iter()
                .map(|cells| {
                    let mut row_cells: Vec<TableCell> = cells
                        .iter()
                        .map(|text| {
                            TableCell::new().add_paragraph(
                                Paragraph::new().add_run(DocxRun::new().add_text(text)),
                            )
                        })
                        .collect();
                    // Degraded rows keep the grid rectangular.
                    while row_cells.len() < cols {
                        row_cells.push(TableCell::new().add_paragraph(Paragraph::new()));
                    }
                    TableRow::new(row_cells)
                })
                .collect();
            docx.add_table(Table::new(rows))
        }
        LogicalBlock::Image { image } => {
            let (w, h) = image.size;
            let pic = Pic::new(&image.data).size(w * EMU_PER_PX, h * EMU_PER_PX);
            docx.add_paragraph(Paragraph::new().add_run(DocxRun::new().add_image(pic)))
        }
        // Header/footer blocks are attached once at document level.
        LogicalBlock::HeaderText { .. } | LogicalBlock::FooterText { .. } => docx,
    }
}

/// Convert model runs to docx runs, turning literal line breaks into
/// text-wrapping breaks.
fn add_runs(mut para: Paragraph, runs: &[Run]) -> Paragraph {
    for run in runs {
        let mut docx_run = DocxRun::new();
        for (i, part) in run.text.split('\n').enumerate() {
            if i > 0 {
                docx_run = docx_run.add_break(BreakType::TextWrapping);
            }
            if !part.is_empty() {
                docx_run = docx_run.add_text(part);
            }
        }
        if run.bold {
            docx_run = docx_run.bold();
        }
        if run.italic {
            docx_run = docx_run.italic();
        }
        para = para.add_run(docx_run);
    }
    para
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Run;

    fn sample_doc() -> FlowDocument {
        let mut doc = FlowDocument::new();
        doc.blocks.push(LogicalBlock::HeaderText {
            text: "ACME Report".into(),
        });
        doc.blocks.push(LogicalBlock::Heading {
            level: 1,
            runs: vec![Run::new("Title")],
            page: 1,
            y: 760.0,
        });
        doc.blocks.push(LogicalBlock::Paragraph {
            runs: vec![Run::new("plain "), Run::bold("bold")],
            page: 1,
            y: 700.0,
        });
        doc.blocks.push(LogicalBlock::ListItem {
            marker: ListMarker::Bullet,
            runs: vec![Run::new("item")],
            page: 1,
            y: 650.0,
        });
        doc
    }

    #[test]
    fn test_render_docx_is_zip_package() {
        let bytes = render_docx(&sample_doc()).unwrap();
        // DOCX is a ZIP container.
        assert!(bytes.starts_with(b"PK"));
        assert!(bytes.len() > 500);
    }

    #[test]
    fn test_round_trip_through_reader() {
        let bytes = render_docx(&sample_doc()).unwrap();
        let parsed = crate::read::read_docx_bytes(&bytes).unwrap();

        assert_eq!(parsed.blocks.len(), 3);
        assert_eq!(parsed.blocks[0].heading_level(), Some(1));
        assert_eq!(parsed.blocks[0].plain_text(), "Title");
        assert_eq!(parsed.blocks[1].plain_text(), "plain bold");

        let runs = parsed.blocks[1].runs().unwrap();
        assert!(runs.iter().any(|r| r.bold && r.text == "bold"));
        assert!(matches!(parsed.blocks[2], LogicalBlock::ListItem { .. }));
    }
}
