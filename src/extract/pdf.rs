//! Geometry and typography extraction from PDF pages.
//!
//! Walks each page's content stream with a text matrix, decoding strings
//! through the page fonts' encodings, and produces ordered [`Span`]s with
//! position and style metadata. Image XObjects referenced by `Do` operators
//! are harvested with their placement so the image extractor can anchor
//! them later.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use lopdf::{Document as LopdfDocument, Object, ObjectId};
use rayon::prelude::*;

use crate::config::ConversionConfig;
use crate::error::{Error, Result};
use crate::model::{parse_pdf_date, Metadata, PageSpans, Span};

/// An undecoded raster image found on a page.
#[derive(Debug, Clone)]
pub struct RawImage {
    /// Source page (1-indexed).
    pub page: u32,
    /// Encoded payload as stored in the PDF.
    pub data: Vec<u8>,
    /// MIME type derived from the stream filter.
    pub mime_type: String,
    /// Pixel width from the XObject dictionary.
    pub width: u32,
    /// Pixel height from the XObject dictionary.
    pub height: u32,
    /// Top Y of the placed image in page coordinates.
    pub y: f32,
}

/// Extractor output for one document.
#[derive(Debug, Clone)]
pub struct ExtractedPages {
    /// In-range pages with spans in reading order.
    pub pages: Vec<PageSpans>,
    /// Raw images from in-range pages.
    pub images: Vec<RawImage>,
    /// Document metadata.
    pub metadata: Metadata,
}

/// PDF span extractor backed by lopdf.
pub struct PdfExtractor {
    doc: LopdfDocument,
}

impl PdfExtractor {
    /// Open a PDF file. Fails with [`Error::Encrypted`] for encrypted input.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let doc = LopdfDocument::load(path).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::from(e),
        })?;
        Self::from_document(doc)
    }

    /// Open a PDF from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::from(e),
        })?;
        Self::from_document(doc)
    }

    fn from_document(doc: LopdfDocument) -> Result<Self> {
        if doc.is_encrypted() {
            return Err(Error::Encrypted);
        }
        Ok(Self { doc })
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// Validate a 1-based inclusive range against the document.
    ///
    /// `None` resolves to the full document. Fatal on `start == 0`,
    /// `start > end`, or `end > page_count` — no partial output.
    pub fn resolve_range(&self, range: Option<(u32, u32)>) -> Result<(u32, u32)> {
        let count = self.page_count();
        match range {
            None => Ok((1, count)),
            Some((start, end)) => {
                if start == 0 {
                    return Err(Error::InvalidPageRange("start page must be >= 1".into()));
                }
                if start > end {
                    return Err(Error::InvalidPageRange(format!(
                        "start page {} is after end page {}",
                        start, end
                    )));
                }
                if end > count {
                    return Err(Error::PageOutOfRange(end, count));
                }
                Ok((start, end))
            }
        }
    }

    /// Extract spans, images, and metadata for the configured page range.
    pub fn extract(&self, config: &ConversionConfig) -> Result<ExtractedPages> {
        let (start, end) = self.resolve_range(config.page_range)?;
        let page_ids = self.doc.get_pages();
        let metadata = self.extract_metadata();

        let in_range: Vec<(u32, ObjectId)> = page_ids
            .iter()
            .filter(|(num, _)| **num >= start && **num <= end)
            .map(|(num, id)| (*num, *id))
            .collect();

        let results: Vec<Result<(PageSpans, Vec<RawImage>)>> = if config.parallel {
            in_range
                .par_iter()
                .map(|(num, id)| self.extract_page(*num, *id, config.extract_images))
                .collect()
        } else {
            in_range
                .iter()
                .map(|(num, id)| self.extract_page(*num, *id, config.extract_images))
                .collect()
        };

        // Re-join in page order before any cross-page aggregation.
        let mut pages = Vec::with_capacity(results.len());
        let mut images = Vec::new();
        for result in results {
            let (page, page_images) = result?;
            images.extend(page_images);
            pages.push(page);
        }

        log::debug!(
            "extracted {} pages, {} images ({}..={})",
            pages.len(),
            images.len(),
            start,
            end
        );

        Ok(ExtractedPages {
            pages,
            images,
            metadata,
        })
    }

    /// Extract one page: spans in reading order plus placed images.
    fn extract_page(
        &self,
        page_num: u32,
        page_id: ObjectId,
        with_images: bool,
    ) -> Result<(PageSpans, Vec<RawImage>)> {
        let (width, height) = self.page_dimensions(page_id);
        let mut page = PageSpans::new(page_num, width, height);

        let lopdf_fonts = self
            .doc
            .get_page_fonts(page_id)
            .map_err(|e| Error::Extraction(format!("page {}: {}", page_num, e)))?;

        let mut fonts = HashMap::new();
        for (name, font) in &lopdf_fonts {
            let base_font = font
                .get(b"BaseFont")
                .ok()
                .and_then(|o| o.as_name().ok())
                .map(|n| String::from_utf8_lossy(n).to_string())
                .unwrap_or_else(|| "Unknown".to_string());
            fonts.insert(name.clone(), base_font);
        }

        let xobjects = if with_images {
            self.page_image_xobjects(page_id)
        } else {
            HashMap::new()
        };

        let content = self.page_content(page_id, page_num)?;
        let (mut spans, images) =
            self.walk_content(&content, page_num, &fonts, &lopdf_fonts, &xobjects)?;

        merge_adjacent_spans(&mut spans);
        sort_reading_order(&mut spans);
        page.spans = spans;

        Ok((page, images))
    }

    /// Page dimensions from the MediaBox, defaulting to Letter.
    fn page_dimensions(&self, page_id: ObjectId) -> (f32, f32) {
        if let Ok(page_dict) = self.doc.get_dictionary(page_id) {
            if let Ok(media_box) = page_dict.get(b"MediaBox") {
                if let Ok(array) = media_box.as_array() {
                    if array.len() >= 4 {
                        let width = array[2].as_float().unwrap_or(612.0);
                        let height = array[3].as_float().unwrap_or(792.0);
                        return (width, height);
                    }
                }
            }
        }
        (612.0, 792.0)
    }

    /// Decompressed page content stream.
    fn page_content(&self, page_id: ObjectId, page_num: u32) -> Result<Vec<u8>> {
        let page_dict = self
            .doc
            .get_dictionary(page_id)
            .map_err(|e| Error::Extraction(format!("page {}: {}", page_num, e)))?;

        let contents = match page_dict.get(b"Contents") {
            Ok(c) => c,
            // A page with no content stream is empty, not an error.
            Err(_) => return Ok(Vec::new()),
        };

        match contents {
            Object::Reference(r) => {
                if let Ok(Object::Stream(s)) = self.doc.get_object(*r) {
                    return s
                        .decompressed_content()
                        .map_err(|e| Error::Extraction(format!("page {}: {}", page_num, e)));
                }
                Err(Error::Extraction(format!(
                    "page {}: invalid content stream",
                    page_num
                )))
            }
            Object::Array(arr) => {
                let mut content = Vec::new();
                for obj in arr {
                    if let Object::Reference(r) = obj {
                        if let Ok(Object::Stream(s)) = self.doc.get_object(*r) {
                            if let Ok(data) = s.decompressed_content() {
                                content.extend_from_slice(&data);
                                content.push(b' ');
                            }
                        }
                    }
                }
                Ok(content)
            }
            _ => Err(Error::Extraction(format!(
                "page {}: invalid content stream",
                page_num
            ))),
        }
    }

    /// Walk a content stream, producing spans and placed images.
    fn walk_content(
        &self,
        content: &[u8],
        page_num: u32,
        fonts: &HashMap<Vec<u8>, String>,
        lopdf_fonts: &BTreeMap<Vec<u8>, &lopdf::Dictionary>,
        xobjects: &HashMap<Vec<u8>, ImageXObject>,
    ) -> Result<(Vec<Span>, Vec<RawImage>)> {
        let content = lopdf::content::Content::decode(content)
            .map_err(|e| Error::Extraction(format!("page {}: {}", page_num, e)))?;

        let mut spans = Vec::new();
        let mut images = Vec::new();
        let mut current_font = String::new();
        let mut current_font_name: Vec<u8> = Vec::new();
        let mut current_font_size: f32 = 12.0;
        let mut current_color = (0u8, 0u8, 0u8);
        let mut text_matrix = TextMatrix::default();
        let mut ctm = Ctm::default();
        let mut ctm_stack: Vec<Ctm> = Vec::new();
        let mut in_text_block = false;

        for op in content.operations {
            match op.operator.as_str() {
                "BT" => {
                    in_text_block = true;
                    text_matrix = TextMatrix::default();
                }
                "ET" => {
                    in_text_block = false;
                }
                "q" => ctm_stack.push(ctm),
                "Q" => {
                    if let Some(prev) = ctm_stack.pop() {
                        ctm = prev;
                    }
                }
                "cm" => {
                    if op.operands.len() >= 6 {
                        ctm = ctm.concat(
                            get_number(&op.operands[0]).unwrap_or(1.0),
                            get_number(&op.operands[3]).unwrap_or(1.0),
                            get_number(&op.operands[4]).unwrap_or(0.0),
                            get_number(&op.operands[5]).unwrap_or(0.0),
                        );
                    }
                }
                "Tf" => {
                    if op.operands.len() >= 2 {
                        if let Object::Name(font_name) = &op.operands[0] {
                            current_font_name = font_name.clone();
                            current_font = fonts
                                .get(font_name.as_slice())
                                .cloned()
                                .unwrap_or_else(|| {
                                    String::from_utf8_lossy(font_name.as_slice()).to_string()
                                });
                        }
                        current_font_size = get_number(&op.operands[1]).unwrap_or(12.0);
                    }
                }
                "Td" | "TD" => {
                    if op.operands.len() >= 2 {
                        let tx = get_number(&op.operands[0]).unwrap_or(0.0);
                        let ty = get_number(&op.operands[1]).unwrap_or(0.0);
                        text_matrix.translate(tx, ty);
                    }
                }
                "Tm" => {
                    if op.operands.len() >= 6 {
                        text_matrix.set(
                            get_number(&op.operands[0]).unwrap_or(1.0),
                            get_number(&op.operands[1]).unwrap_or(0.0),
                            get_number(&op.operands[2]).unwrap_or(0.0),
                            get_number(&op.operands[3]).unwrap_or(1.0),
                            get_number(&op.operands[4]).unwrap_or(0.0),
                            get_number(&op.operands[5]).unwrap_or(0.0),
                        );
                    }
                }
                "T*" => {
                    text_matrix.next_line();
                }
                "rg" => {
                    if op.operands.len() >= 3 {
                        current_color = (
                            component(&op.operands[0]),
                            component(&op.operands[1]),
                            component(&op.operands[2]),
                        );
                    }
                }
                "g" => {
                    if let Some(first) = op.operands.first() {
                        let gray = component(first);
                        current_color = (gray, gray, gray);
                    }
                }
                "Tj" | "TJ" => {
                    if in_text_block {
                        let encoding = lopdf_fonts
                            .get(&current_font_name)
                            .and_then(|f| f.get_font_encoding(&self.doc).ok());

                        let text = if op.operator == "TJ" {
                            decode_tj_array(&op.operands, encoding.as_ref(), &self.doc)
                        } else if let Some(Object::String(bytes, _)) = op.operands.first() {
                            decode_string(bytes, encoding.as_ref(), &self.doc)
                        } else {
                            String::new()
                        };

                        if !text.trim().is_empty() {
                            let (x, y) = text_matrix.position();
                            let size = current_font_size * text_matrix.scale();
                            spans.push(make_span(
                                text,
                                page_num,
                                x,
                                y,
                                size,
                                current_font.clone(),
                                current_color,
                            ));
                        }
                    }
                }
                "'" | "\"" => {
                    text_matrix.next_line();
                    if in_text_block {
                        let text_idx = if op.operator == "\"" { 2 } else { 0 };
                        if let Some(Object::String(bytes, _)) = op.operands.get(text_idx) {
                            let encoding = lopdf_fonts
                                .get(&current_font_name)
                                .and_then(|f| f.get_font_encoding(&self.doc).ok());
                            let text = decode_string(bytes, encoding.as_ref(), &self.doc);

                            if !text.trim().is_empty() {
                                let (x, y) = text_matrix.position();
                                let size = current_font_size * text_matrix.scale();
                                spans.push(make_span(
                                    text,
                                    page_num,
                                    x,
                                    y,
                                    size,
                                    current_font.clone(),
                                    current_color,
                                ));
                            }
                        }
                    }
                }
                "Do" => {
                    if let Some(Object::Name(name)) = op.operands.first() {
                        if let Some(xobj) = xobjects.get(name.as_slice()) {
                            // Image space is a unit square scaled by the CTM;
                            // f is the bottom edge, f + d the top.
                            images.push(RawImage {
                                page: page_num,
                                data: xobj.data.clone(),
                                mime_type: xobj.mime_type.clone(),
                                width: xobj.width,
                                height: xobj.height,
                                y: ctm.f + ctm.d.max(0.0),
                            });
                        }
                    }
                }
                _ => {}
            }
        }

        Ok((spans, images))
    }

    /// Image XObjects of a page, keyed by resource name.
    fn page_image_xobjects(&self, page_id: ObjectId) -> HashMap<Vec<u8>, ImageXObject> {
        let mut result = HashMap::new();

        let Ok(page_dict) = self.doc.get_dictionary(page_id) else {
            return result;
        };
        let Ok(res) = page_dict.get(b"Resources") else {
            return result;
        };
        let res_dict = match res {
            Object::Reference(r) => self.doc.get_dictionary(*r).ok(),
            Object::Dictionary(d) => Some(d),
            _ => None,
        };
        let Some(res_dict) = res_dict else {
            return result;
        };
        let Ok(xobjects) = res_dict.get(b"XObject") else {
            return result;
        };
        let xobj_dict = match xobjects {
            Object::Reference(r) => self.doc.get_dictionary(*r).ok(),
            Object::Dictionary(d) => Some(d),
            _ => None,
        };
        let Some(xobj_dict) = xobj_dict else {
            return result;
        };

        for (name, obj) in xobj_dict.iter() {
            if let Ok(obj_ref) = obj.as_reference() {
                if let Some(image) = self.read_image_xobject(obj_ref) {
                    result.insert(name.clone(), image);
                }
            }
        }

        result
    }

    /// Read one XObject stream if it is an image.
    fn read_image_xobject(&self, obj_ref: ObjectId) -> Option<ImageXObject> {
        let Ok(Object::Stream(stream)) = self.doc.get_object(obj_ref) else {
            return None;
        };
        let dict = &stream.dict;

        match dict.get(b"Subtype").ok()?.as_name_str() {
            Ok("Image") => {}
            _ => return None,
        }

        let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
        let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;

        let filter = dict
            .get(b"Filter")
            .ok()
            .and_then(|f| f.as_name_str().ok())
            .unwrap_or("");

        let (mime_type, data) = match filter {
            "DCTDecode" => ("image/jpeg".to_string(), stream.content.clone()),
            "JPXDecode" => ("image/jp2".to_string(), stream.content.clone()),
            _ => {
                let decoded = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                ("application/octet-stream".to_string(), decoded)
            }
        };

        Some(ImageXObject {
            data,
            mime_type,
            width,
            height,
        })
    }

    /// Document metadata from the Info dictionary.
    fn extract_metadata(&self) -> Metadata {
        let mut metadata = Metadata {
            page_count: self.page_count(),
            encrypted: self.doc.is_encrypted(),
            ..Default::default()
        };

        if let Ok(info) = self.doc.trailer.get(b"Info") {
            if let Ok(info_ref) = info.as_reference() {
                if let Ok(info_dict) = self.doc.get_dictionary(info_ref) {
                    metadata.title = dict_string(info_dict, b"Title");
                    metadata.author = dict_string(info_dict, b"Author");
                    metadata.subject = dict_string(info_dict, b"Subject");
                    metadata.creator = dict_string(info_dict, b"Creator");
                    metadata.producer = dict_string(info_dict, b"Producer");

                    if let Some(date) = dict_string(info_dict, b"CreationDate") {
                        metadata.created = parse_pdf_date(&date);
                    }
                    if let Some(date) = dict_string(info_dict, b"ModDate") {
                        metadata.modified = parse_pdf_date(&date);
                    }
                }
            }
        }

        metadata
    }
}

/// An image XObject before placement.
#[derive(Debug, Clone)]
struct ImageXObject {
    data: Vec<u8>,
    mime_type: String,
    width: u32,
    height: u32,
}

/// Current transformation matrix, tracked only as far as axis-aligned image
/// placement needs (scale + translation).
#[derive(Debug, Clone, Copy)]
struct Ctm {
    a: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Default for Ctm {
    fn default() -> Self {
        Self {
            a: 1.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }
}

impl Ctm {
    fn concat(self, a: f32, d: f32, e: f32, f: f32) -> Ctm {
        Ctm {
            a: self.a * a,
            d: self.d * d,
            e: self.a * e + self.e,
            f: self.d * f + self.f,
        }
    }
}

/// Text matrix for tracking position in a content stream.
#[derive(Debug, Clone)]
struct TextMatrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Default for TextMatrix {
    fn default() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }
}

impl TextMatrix {
    #[allow(clippy::many_single_char_names)]
    fn set(&mut self, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) {
        self.a = a;
        self.b = b;
        self.c = c;
        self.d = d;
        self.e = e;
        self.f = f;
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        self.e += tx * self.a + ty * self.c;
        self.f += tx * self.b + ty * self.d;
    }

    fn next_line(&mut self) {
        // Default leading; TL handling is not needed for span grouping.
        self.f -= 12.0 * self.d;
    }

    fn position(&self) -> (f32, f32) {
        (self.e, self.f)
    }

    fn scale(&self) -> f32 {
        (self.a * self.a + self.c * self.c).sqrt()
    }
}

/// Build a span with an estimated width from its character count.
fn make_span(
    text: String,
    page: u32,
    x: f32,
    y: f32,
    font_size: f32,
    font_name: String,
    color: (u8, u8, u8),
) -> Span {
    let mut span = Span::new(text, page, x, y, font_size, font_name);
    let chars = span.text.chars().count() as f32;
    span.x1 = span.x0 + chars * span.font_size * 0.5;
    span.color = color;
    span
}

/// Decode a TJ array: strings interleaved with kerning adjustments.
/// Adjustments beyond ~200/1000 em indicate word spaces.
fn decode_tj_array(
    operands: &[Object],
    encoding: Option<&lopdf::Encoding>,
    doc: &LopdfDocument,
) -> String {
    let Some(Object::Array(arr)) = operands.first() else {
        return String::new();
    };

    let space_threshold = 200.0;
    let mut combined = String::new();

    for item in arr {
        match item {
            Object::String(bytes, _) => {
                combined.push_str(&decode_string(bytes, encoding, doc));
            }
            Object::Integer(n) => {
                if -(*n as f32) > space_threshold && needs_space(&combined) {
                    combined.push(' ');
                }
            }
            Object::Real(n) => {
                if -n > space_threshold && needs_space(&combined) {
                    combined.push(' ');
                }
            }
            _ => {}
        }
    }

    combined
}

fn needs_space(s: &str) -> bool {
    !s.is_empty() && !s.ends_with(' ') && !s.ends_with('\u{00A0}')
}

/// Decode a PDF string through the font encoding, with a simple fallback.
fn decode_string(
    bytes: &[u8],
    encoding: Option<&lopdf::Encoding>,
    _doc: &LopdfDocument,
) -> String {
    if let Some(enc) = encoding {
        if let Ok(decoded) = LopdfDocument::decode_text(enc, bytes) {
            return decoded;
        }
    }
    decode_text_simple(bytes)
}

/// Simple text decoding fallback when no encoding is available.
fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks(2)
            .filter_map(|c| {
                if c.len() == 2 {
                    Some(u16::from_be_bytes([c[0], c[1]]))
                } else {
                    None
                }
            })
            .collect();
        return String::from_utf16(&utf16).unwrap_or_default();
    }

    if let Ok(s) = String::from_utf8(bytes.to_vec()) {
        return s;
    }

    // Latin-1 fallback
    bytes.iter().map(|&b| b as char).collect()
}

/// Merge consecutive glyph-level fragments sharing one baseline and style.
fn merge_adjacent_spans(spans: &mut Vec<Span>) {
    if spans.len() < 2 {
        return;
    }

    let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans.drain(..) {
        match merged.last_mut() {
            Some(last)
                if last.same_style(&span)
                    && (last.baseline - span.baseline).abs() < 0.5
                    && span.x0 >= last.x0
                    && (span.x0 - last.x1) < span.font_size * 0.15 =>
            {
                last.text.push_str(&span.text);
                last.x1 = last.x1.max(span.x1);
            }
            _ => merged.push(span),
        }
    }
    *spans = merged;
}

/// Sort spans into reading order: top-to-bottom (descending PDF y), then
/// left-to-right. The sort is stable, so overlapping boxes keep extraction
/// order.
fn sort_reading_order(spans: &mut [Span]) {
    spans.sort_by(|a, b| {
        let ay = (a.baseline * 2.0).round();
        let by = (b.baseline * 2.0).round();
        by.partial_cmp(&ay)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                a.x0.partial_cmp(&b.x0)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });
}

/// Helper to extract a number from a PDF object.
fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Color component 0..=1 to a byte.
fn component(obj: &Object) -> u8 {
    (get_number(obj).unwrap_or(0.0).clamp(0.0, 1.0) * 255.0) as u8
}

/// String value from a PDF dictionary.
fn dict_string(dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key).ok().and_then(|obj| match obj {
        Object::String(bytes, _) => Some(decode_text_simple(bytes)),
        Object::Name(bytes) => String::from_utf8(bytes.clone()).ok(),
        _ => None,
    })
}
