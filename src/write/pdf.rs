//! PDF writing via lopdf document authoring.
//!
//! Paginates a flat block sequence onto fixed-size pages: greedy word wrap
//! against the text width, a new page whenever the next line no longer
//! fits. Headings scale the font size by level. Text-only output — the
//! reverse path carries no raster payloads.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document as LopdfDocument, Object, Stream};

use crate::error::{Error, Result};
use crate::model::{FlowDocument, ListMarker, LogicalBlock, Run};

/// Heading sizes by level, 1 first; body text is 11 pt.
const HEADING_SIZES: [f32; 6] = [18.0, 14.0, 12.0, 11.0, 11.0, 11.0];
const BODY_SIZE: f32 = 11.0;
const TABLE_SIZE: f32 = 10.0;

/// A4 page geometry with one-inch margins.
pub struct PdfWriter {
    page_width: f32,
    page_height: f32,
    margin: f32,
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self {
            page_width: 595.0,
            page_height: 842.0,
            margin: 72.0,
        }
    }
}

/// One laid-out line before pagination.
struct PlacedLine {
    text: String,
    font: &'static str,
    size: f32,
    gap_after: f32,
}

impl PdfWriter {
    /// Create a writer with the default A4 geometry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Render a flow document into PDF bytes. Returns the bytes and the
    /// number of pages produced.
    pub fn render(&self, doc: &FlowDocument) -> Result<(Vec<u8>, u32)> {
        let lines = self.layout(doc);
        self.paginate(lines)
    }

    /// Flatten blocks into wrapped lines with font assignments.
    fn layout(&self, doc: &FlowDocument) -> Vec<PlacedLine> {
        let text_width = self.page_width - 2.0 * self.margin;
        let mut lines = Vec::new();

        for block in doc.body_blocks() {
            match block {
                LogicalBlock::Heading { level, runs, .. } => {
                    let size = HEADING_SIZES[(*level as usize - 1).min(5)];
                    self.push_wrapped(&mut lines, &runs_text(runs), "F2", size, text_width);
                    bump_gap(&mut lines, size * 0.45 + 5.0);
                }
                LogicalBlock::Paragraph { runs, .. } => {
                    let font = dominant_font(runs);
                    self.push_wrapped(&mut lines, &runs_text(runs), font, BODY_SIZE, text_width);
                    // Noticeably wider than the intra-paragraph leading, so
                    // the boundary survives a round trip through extraction.
                    bump_gap(&mut lines, BODY_SIZE * 0.9);
                }
                LogicalBlock::ListItem { marker, runs, .. } => {
                    let prefix = match marker {
                        ListMarker::Bullet => "\u{2022} ".to_string(),
                        ListMarker::Numbered { ordinal } => format!("{}. ", ordinal),
                    };
                    let text = format!("{}{}", prefix, runs_text(runs));
                    self.push_wrapped(&mut lines, &text, "F1", BODY_SIZE, text_width);
                }
                LogicalBlock::Table { region, .. } => {
                    for row in &region.rows {
                        let text = row.join(" | ");
                        self.push_wrapped(&mut lines, &text, "F1", TABLE_SIZE, text_width);
                    }
                    bump_gap(&mut lines, TABLE_SIZE * 0.45);
                }
                LogicalBlock::Image { image } => {
                    log::debug!(
                        "skipping image at page {} in text-only PDF output",
                        image.anchor.page
                    );
                }
                _ => {}
            }
        }

        lines
    }

    /// Wrap a text into placed lines, honoring embedded line breaks.
    fn push_wrapped(
        &self,
        lines: &mut Vec<PlacedLine>,
        text: &str,
        font: &'static str,
        size: f32,
        max_width: f32,
    ) {
        for source_line in text.split('\n') {
            for wrapped in wrap_text(source_line, max_width, size) {
                lines.push(PlacedLine {
                    text: wrapped,
                    font,
                    size,
                    gap_after: 0.0,
                });
            }
        }
    }

    /// Place lines onto pages and serialize the document.
    fn paginate(&self, lines: Vec<PlacedLine>) -> Result<(Vec<u8>, u32)> {
        let mut pdf = LopdfDocument::with_version("1.5");
        let pages_id = pdf.new_object_id();

        let regular = pdf.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let bold = pdf.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
        });
        let oblique = pdf.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Oblique",
        });
        let resources_id = pdf.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => regular,
                "F2" => bold,
                "F3" => oblique,
            },
        });

        let bottom = self.margin;
        let mut kids: Vec<Object> = Vec::new();
        let mut ops: Vec<Operation> = Vec::new();
        let mut cursor = self.page_height - self.margin;

        for line in lines {
            let line_height = line.size * 1.5;

            if cursor - line_height < bottom && !ops.is_empty() {
                let page_id =
                    self.flush_page(&mut pdf, pages_id, resources_id, std::mem::take(&mut ops))?;
                kids.push(page_id.into());
                cursor = self.page_height - self.margin;
            }

            cursor -= line_height;
            if !line.text.is_empty() {
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new(
                    "Tf",
                    vec![line.font.into(), line.size.into()],
                ));
                ops.push(Operation::new(
                    "Td",
                    vec![self.margin.into(), cursor.into()],
                ));
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::string_literal(line.text.as_str())],
                ));
                ops.push(Operation::new("ET", vec![]));
            }
            cursor -= line.gap_after;
        }

        if !ops.is_empty() || kids.is_empty() {
            let page_id = self.flush_page(&mut pdf, pages_id, resources_id, ops)?;
            kids.push(page_id.into());
        }

        let page_count = kids.len() as u32;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                self.page_width.into(),
                self.page_height.into(),
            ],
        };
        pdf.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = pdf.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        pdf.trailer.set("Root", catalog_id);
        pdf.compress();

        let mut buf = Vec::new();
        pdf.save_to(&mut buf)
            .map_err(|e| Error::Write(format!("PDF serialization failed: {}", e)))?;

        Ok((buf, page_count))
    }

    /// Serialize one page's operations into a page object.
    fn flush_page(
        &self,
        pdf: &mut LopdfDocument,
        pages_id: lopdf::ObjectId,
        resources_id: lopdf::ObjectId,
        ops: Vec<Operation>,
    ) -> Result<lopdf::ObjectId> {
        let content = Content { operations: ops };
        let encoded = content
            .encode()
            .map_err(|e| Error::Write(format!("content stream encoding failed: {}", e)))?;
        let content_id = pdf.add_object(Stream::new(dictionary! {}, encoded));
        Ok(pdf.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                self.page_width.into(),
                self.page_height.into(),
            ],
        }))
    }
}

/// Concatenated text of a run sequence.
fn runs_text(runs: &[Run]) -> String {
    runs.iter().map(|r| r.text.as_str()).collect()
}

/// Font key for a paragraph from its dominant run style.
fn dominant_font(runs: &[Run]) -> &'static str {
    let total: usize = runs.iter().map(|r| r.text.len()).sum();
    if total == 0 {
        return "F1";
    }
    let bold: usize = runs.iter().filter(|r| r.bold).map(|r| r.text.len()).sum();
    let italic: usize = runs
        .iter()
        .filter(|r| r.italic)
        .map(|r| r.text.len())
        .sum();

    if bold * 2 > total {
        "F2"
    } else if italic * 2 > total {
        "F3"
    } else {
        "F1"
    }
}

/// Increase the trailing gap of the last line.
fn bump_gap(lines: &mut [PlacedLine], gap: f32) {
    if let Some(last) = lines.last_mut() {
        last.gap_after += gap;
    }
}

/// Greedy word wrap against an approximate character width of half the
/// font size.
fn wrap_text(text: &str, max_width: f32, font_size: f32) -> Vec<String> {
    let chars_per_line = ((max_width / (font_size * 0.5)) as usize).max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current_len > 0 && current_len + word_len + 1 > chars_per_line {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }
    if !current.is_empty() {
        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
