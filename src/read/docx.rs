//! DOCX package reading.
//!
//! Manual ZIP + XML parsing of `word/document.xml`. The ecosystem's docx-rs
//! crate is writer-only, so the reader walks the OOXML event stream
//! directly: paragraphs (`w:p`), runs (`w:r`) with bold/italic properties,
//! text (`w:t`), heading styles (`w:pStyle`), numbering (`w:numPr`), and
//! tables (`w:tbl`/`w:tr`/`w:tc`).

use std::io::{Cursor, Read};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::model::{FlowDocument, ListMarker, LogicalBlock, Run, TableRegion};

/// Read a DOCX file into a flow document.
pub fn read_docx_file<P: AsRef<Path>>(path: P) -> Result<FlowDocument> {
    let data = std::fs::read(path)?;
    read_docx_bytes(&data)
}

/// Read a DOCX package from bytes.
pub fn read_docx_bytes(data: &[u8]) -> Result<FlowDocument> {
    let mut archive = ZipArchive::new(Cursor::new(data))
        .map_err(|e| Error::Extraction(format!("not a DOCX package: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| Error::Extraction(format!("word/document.xml missing: {}", e)))?
        .read_to_string(&mut xml)
        .map_err(|e| Error::Extraction(e.to_string()))?;

    parse_document_xml(&xml)
}

/// Per-paragraph parser state.
#[derive(Default)]
struct ParaState {
    runs: Vec<Run>,
    heading_level: Option<u8>,
    is_list: bool,
    run_text: String,
    run_bold: bool,
    run_italic: bool,
}

impl ParaState {
    fn flush_run(&mut self) {
        if !self.run_text.is_empty() {
            self.runs.push(Run {
                text: std::mem::take(&mut self.run_text),
                bold: self.run_bold,
                italic: self.run_italic,
            });
        }
        self.run_bold = false;
        self.run_italic = false;
    }

    fn plain_text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// Walk the document XML and build the block sequence.
fn parse_document_xml(xml: &str) -> Result<FlowDocument> {
    let mut reader = Reader::from_str(xml);
    let mut doc = FlowDocument::new();

    let mut para = ParaState::default();
    let mut in_rpr = false;
    let mut in_ppr = false;
    let mut in_text = false;

    // Table state; cell paragraphs collapse to cell text.
    let mut in_table = false;
    let mut table_rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:p" => para = ParaState::default(),
                b"w:r" => {
                    para.flush_run();
                }
                b"w:rPr" => in_rpr = true,
                b"w:pPr" => in_ppr = true,
                b"w:t" => in_text = true,
                b"w:tbl" => {
                    in_table = true;
                    table_rows.clear();
                }
                b"w:tr" => row.clear(),
                b"w:tc" => cell.clear(),
                other => handle_property(other, &e, in_rpr, in_ppr, &mut para),
            },
            Ok(Event::Empty(e)) => {
                handle_property(e.name().as_ref(), &e, in_rpr, in_ppr, &mut para)
            }
            Ok(Event::Text(t)) => {
                if in_text {
                    para.run_text.push_str(&t.unescape().unwrap_or_default());
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:rPr" => in_rpr = false,
                b"w:pPr" => in_ppr = false,
                b"w:r" => para.flush_run(),
                b"w:p" => {
                    para.flush_run();
                    if in_table {
                        let text = para.plain_text();
                        if !text.trim().is_empty() {
                            cell.push(text);
                        }
                    } else if let Some(block) = finish_paragraph(&mut para) {
                        doc.blocks.push(block);
                    }
                }
                b"w:tc" => row.push(cell.join(" ")),
                b"w:tr" => {
                    if !row.is_empty() {
                        table_rows.push(std::mem::take(&mut row));
                    }
                }
                b"w:tbl" => {
                    in_table = false;
                    if !table_rows.is_empty() {
                        doc.blocks.push(LogicalBlock::Table {
                            region: TableRegion::new(std::mem::take(&mut table_rows), vec![]),
                            page: 1,
                            y: 0.0,
                        });
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Extraction(format!("document.xml: {}", e))),
            _ => {}
        }
    }

    Ok(doc)
}

/// Apply a run or paragraph property element.
fn handle_property(name: &[u8], e: &BytesStart, in_rpr: bool, in_ppr: bool, para: &mut ParaState) {
    match name {
        b"w:b" if in_rpr => para.run_bold = !val_off(e),
        b"w:i" if in_rpr => para.run_italic = !val_off(e),
        b"w:pStyle" if in_ppr => {
            if let Some(style) = attr_val(e) {
                para.heading_level = heading_level_from_style(&style);
            }
        }
        b"w:numPr" if in_ppr => para.is_list = true,
        _ => {}
    }
}

/// Close a body paragraph into a block, dropping empty ones.
fn finish_paragraph(para: &mut ParaState) -> Option<LogicalBlock> {
    let state = std::mem::take(para);
    if state.plain_text().trim().is_empty() {
        return None;
    }

    let block = if let Some(level) = state.heading_level {
        LogicalBlock::Heading {
            level,
            runs: state.runs,
            page: 1,
            y: 0.0,
        }
    } else if state.is_list {
        LogicalBlock::ListItem {
            marker: ListMarker::Bullet,
            runs: state.runs,
            page: 1,
            y: 0.0,
        }
    } else {
        LogicalBlock::Paragraph {
            runs: state.runs,
            page: 1,
            y: 0.0,
        }
    };
    Some(block)
}

/// Map a paragraph style id to a heading level.
fn heading_level_from_style(style: &str) -> Option<u8> {
    if style.eq_ignore_ascii_case("Title") {
        return Some(1);
    }
    let digits = style.strip_prefix("Heading").or_else(|| style.strip_prefix("heading"))?;
    let level: u8 = digits.trim().parse().ok()?;
    (1..=6).contains(&level).then_some(level)
}

/// The w:val attribute of an element.
fn attr_val(e: &BytesStart) -> Option<String> {
    e.attributes().find_map(|a| {
        a.ok()
            .filter(|a| a.key.as_ref() == b"w:val")
            .map(|a| String::from_utf8_lossy(&a.value).into_owned())
    })
}

/// Whether w:val explicitly turns a toggle property off.
fn val_off(e: &BytesStart) -> bool {
    matches!(attr_val(e).as_deref(), Some("0") | Some("false"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:body>{}</w:body></w:document>"#,
            body
        )
    }

    #[test]
    fn test_parse_paragraphs_and_headings() {
        let xml = wrap(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr>
               <w:r><w:t>Title Text</w:t></w:r></w:p>
               <w:p><w:r><w:t>Body text.</w:t></w:r></w:p>"#,
        );
        let doc = parse_document_xml(&xml).unwrap();

        assert_eq!(doc.blocks.len(), 2);
        assert_eq!(doc.blocks[0].heading_level(), Some(1));
        assert_eq!(doc.blocks[0].plain_text(), "Title Text");
        assert_eq!(doc.blocks[1].plain_text(), "Body text.");
    }

    #[test]
    fn test_parse_bold_italic_runs() {
        let xml = wrap(
            r#"<w:p>
               <w:r><w:t>plain </w:t></w:r>
               <w:r><w:rPr><w:b/></w:rPr><w:t>bold</w:t></w:r>
               <w:r><w:rPr><w:i/></w:rPr><w:t>italic</w:t></w:r>
               </w:p>"#,
        );
        let doc = parse_document_xml(&xml).unwrap();

        let runs = doc.blocks[0].runs().unwrap();
        assert_eq!(runs.len(), 3);
        assert!(!runs[0].bold);
        assert!(runs[1].bold);
        assert!(runs[2].italic);
    }

    #[test]
    fn test_bold_toggle_off() {
        let xml = wrap(
            r#"<w:p><w:r><w:rPr><w:b w:val="false"/></w:rPr><w:t>not bold</w:t></w:r></w:p>"#,
        );
        let doc = parse_document_xml(&xml).unwrap();
        assert!(!doc.blocks[0].runs().unwrap()[0].bold);
    }

    #[test]
    fn test_parse_table() {
        let xml = wrap(
            r#"<w:tbl>
               <w:tr><w:tc><w:p><w:r><w:t>A</w:t></w:r></w:p></w:tc>
                     <w:tc><w:p><w:r><w:t>B</w:t></w:r></w:p></w:tc></w:tr>
               <w:tr><w:tc><w:p><w:r><w:t>1</w:t></w:r></w:p></w:tc>
                     <w:tc><w:p><w:r><w:t>2</w:t></w:r></w:p></w:tc></w:tr>
               </w:tbl>"#,
        );
        let doc = parse_document_xml(&xml).unwrap();

        assert_eq!(doc.blocks.len(), 1);
        match &doc.blocks[0] {
            LogicalBlock::Table { region, .. } => {
                assert_eq!(region.rows, vec![vec!["A", "B"], vec!["1", "2"]]);
            }
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn test_list_paragraph() {
        let xml = wrap(
            r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="1"/></w:numPr></w:pPr>
               <w:r><w:t>item one</w:t></w:r></w:p>"#,
        );
        let doc = parse_document_xml(&xml).unwrap();
        assert!(matches!(doc.blocks[0], LogicalBlock::ListItem { .. }));
    }

    #[test]
    fn test_heading_level_from_style() {
        assert_eq!(heading_level_from_style("Heading1"), Some(1));
        assert_eq!(heading_level_from_style("Heading3"), Some(3));
        assert_eq!(heading_level_from_style("Title"), Some(1));
        assert_eq!(heading_level_from_style("Heading9"), None);
        assert_eq!(heading_level_from_style("Normal"), None);
    }

    #[test]
    fn test_not_a_docx() {
        let result = read_docx_bytes(b"definitely not a zip");
        assert!(matches!(result, Err(Error::Extraction(_))));
    }
}
