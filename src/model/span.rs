//! Positioned text spans and page-level containers.

use serde::{Deserialize, Serialize};

/// A contiguous run of text sharing font, size, and style, with its position
/// on a page.
///
/// Spans are immutable once extracted; the extractor normalizes any missing
/// fields at construction so downstream stages never branch on absent data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    /// The text content
    pub text: String,

    /// Page number (1-indexed)
    pub page: u32,

    /// Left edge
    pub x0: f32,

    /// Bottom edge (PDF coordinates are bottom-up)
    pub y0: f32,

    /// Right edge
    pub x1: f32,

    /// Top edge
    pub y1: f32,

    /// Baseline Y coordinate
    pub baseline: f32,

    /// Font name (e.g., "Helvetica-Bold")
    pub font_name: String,

    /// Font size in points
    pub font_size: f32,

    /// Whether the font appears to be bold
    pub is_bold: bool,

    /// Whether the font appears to be italic
    pub is_italic: bool,

    /// Text color as RGB
    pub color: (u8, u8, u8),
}

impl Span {
    /// Create a span, inferring style flags from the font name and
    /// normalizing missing fields.
    pub fn new(text: String, page: u32, x: f32, y: f32, font_size: f32, font_name: String) -> Self {
        let font_name = if font_name.is_empty() {
            "Unknown".to_string()
        } else {
            font_name
        };
        let font_size = if font_size > 0.0 { font_size } else { 12.0 };

        let lower = font_name.to_lowercase();
        let is_bold =
            lower.contains("bold") || lower.contains("black") || lower.contains("heavy");
        let is_italic = lower.contains("italic") || lower.contains("oblique");

        // Approximate extents from the baseline until the extractor fills in
        // a measured width.
        Self {
            text,
            page,
            x0: x,
            y0: y - font_size * 0.2,
            x1: x,
            y1: y + font_size * 0.8,
            baseline: y,
            font_name,
            font_size,
            is_bold,
            is_italic,
            color: (0, 0, 0),
        }
    }

    /// Width of the span.
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    /// Vertical center, used for margin-band membership.
    pub fn y_center(&self) -> f32 {
        (self.y0 + self.y1) / 2.0
    }

    /// Whether this span shares font, size, and style with another.
    pub fn same_style(&self, other: &Span) -> bool {
        self.font_name == other.font_name
            && (self.font_size - other.font_size).abs() < 0.1
            && self.is_bold == other.is_bold
            && self.is_italic == other.is_italic
    }
}

/// The spans of a single page plus its dimensions.
///
/// Owned by the extractor's output; read-only downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSpans {
    /// Page number (1-indexed)
    pub number: u32,

    /// Page width in points
    pub width: f32,

    /// Page height in points
    pub height: f32,

    /// Spans in reading order
    pub spans: Vec<Span>,
}

impl PageSpans {
    /// Create an empty page.
    pub fn new(number: u32, width: f32, height: f32) -> Self {
        Self {
            number,
            width,
            height,
            spans: Vec::new(),
        }
    }

    /// Check if the page has no text.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

/// Which edge of the page a margin band covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandSide {
    /// Top of the page.
    Top,
    /// Bottom of the page.
    Bottom,
}

/// A page-relative vertical region scanned for recurring header/footer
/// content. The same fraction applies uniformly to all pages of a document.
#[derive(Debug, Clone)]
pub struct MarginBand {
    /// Which edge this band covers.
    pub side: BandSide,

    /// Band height as a fraction of page height.
    pub fraction: f32,
}

impl MarginBand {
    /// Create a band.
    pub fn new(side: BandSide, fraction: f32) -> Self {
        Self {
            side,
            fraction: fraction.clamp(0.0, 1.0),
        }
    }

    /// Whether a span on a page of the given height falls inside the band.
    ///
    /// Membership is by vertical center. PDF coordinates grow upward, so the
    /// top band is the region near `page_height`.
    pub fn contains(&self, span: &Span, page_height: f32) -> bool {
        let center = span.y_center();
        match self.side {
            BandSide::Top => center > page_height * (1.0 - self.fraction),
            BandSide::Bottom => center < page_height * self.fraction,
        }
    }
}
