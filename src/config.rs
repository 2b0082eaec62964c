//! Conversion configuration.
//!
//! A [`ConversionConfig`] is built once per run from resolved CLI or caller
//! input and never mutated afterwards. Quality-dependent heuristics live in
//! a [`QualityProfile`] lookup table so new profiles are additive rather
//! than scattered conditionals.

use serde::{Deserialize, Serialize};

/// How header or footer band content is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderFooterMode {
    /// Band spans remain in the body stream, unclassified.
    Keep,
    /// Classified header/footer spans are dropped entirely.
    Remove,
    /// Classified spans are removed from the body and re-emitted once as
    /// target-document header/footer blocks.
    #[default]
    Convert,
}

/// Transcription quality preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Generous thresholds, merges aggressively.
    Fast,
    /// Middle ground.
    #[default]
    Balanced,
    /// Tight thresholds, merges conservatively.
    High,
}

/// Heuristic thresholds for one quality preset.
///
/// `gap_factor` multiplies the average line spacing: a vertical gap above
/// `avg_spacing * gap_factor` starts a new paragraph. A larger factor
/// therefore merges more lines into fewer blocks.
#[derive(Debug, Clone, Copy)]
pub struct QualityProfile {
    /// Preset name, for logs and warnings.
    pub name: &'static str,
    /// Paragraph-break multiplier over average line spacing.
    pub gap_factor: f32,
    /// Left-indent shift (points) tolerated within one paragraph.
    pub indent_tolerance: f32,
    /// Baseline grouping tolerance as a fraction of font size.
    pub line_tolerance: f32,
    /// Whether image resizing uses the slower high-quality filter.
    pub fine_resample: bool,
}

const PROFILES: [QualityProfile; 3] = [
    QualityProfile {
        name: "fast",
        gap_factor: 2.0,
        indent_tolerance: 30.0,
        line_tolerance: 0.4,
        fine_resample: false,
    },
    QualityProfile {
        name: "balanced",
        gap_factor: 1.5,
        indent_tolerance: 20.0,
        line_tolerance: 0.3,
        fine_resample: false,
    },
    QualityProfile {
        name: "high",
        gap_factor: 1.2,
        indent_tolerance: 12.0,
        line_tolerance: 0.25,
        fine_resample: true,
    },
];

impl Quality {
    /// Look up the threshold profile for this preset.
    pub fn profile(&self) -> &'static QualityProfile {
        match self {
            Quality::Fast => &PROFILES[0],
            Quality::Balanced => &PROFILES[1],
            Quality::High => &PROFILES[2],
        }
    }
}

/// Immutable configuration snapshot for one conversion run.
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    /// Header band policy.
    pub header_mode: HeaderFooterMode,
    /// Footer band policy.
    pub footer_mode: HeaderFooterMode,
    /// Header band height as a fraction of page height (0..=1).
    pub header_margin: f32,
    /// Footer band height as a fraction of page height (0..=1).
    pub footer_margin: f32,
    /// Transcription quality preset.
    pub quality: Quality,
    /// Keep bold/italic run formatting.
    pub preserve_formatting: bool,
    /// Detect multi-column layout and read column-major.
    pub preserve_layout: bool,
    /// Merge fragmented source lines into paragraphs.
    pub merge_paragraphs: bool,
    /// Keep end-of-line hyphenation as literal text.
    pub keep_hyphenation: bool,
    /// Extract raster images.
    pub extract_images: bool,
    /// JPEG re-encode quality (1..=100).
    pub image_quality: u8,
    /// Maximum image width in pixels (images are never upscaled).
    pub max_image_width: u32,
    /// Page range, 1-based inclusive. `None` converts all pages.
    pub page_range: Option<(u32, u32)>,
    /// Extract page spans in parallel across pages.
    pub parallel: bool,
}

impl ConversionConfig {
    /// Create a config with the default option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the header policy.
    pub fn with_header_mode(mut self, mode: HeaderFooterMode) -> Self {
        self.header_mode = mode;
        self
    }

    /// Set the footer policy.
    pub fn with_footer_mode(mut self, mode: HeaderFooterMode) -> Self {
        self.footer_mode = mode;
        self
    }

    /// Set the header band fraction, clamped to 0..=1.
    pub fn with_header_margin(mut self, margin: f32) -> Self {
        self.header_margin = margin.clamp(0.0, 1.0);
        self
    }

    /// Set the footer band fraction, clamped to 0..=1.
    pub fn with_footer_margin(mut self, margin: f32) -> Self {
        self.footer_margin = margin.clamp(0.0, 1.0);
        self
    }

    /// Set the quality preset.
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Enable or disable bold/italic preservation.
    pub fn with_formatting(mut self, preserve: bool) -> Self {
        self.preserve_formatting = preserve;
        self
    }

    /// Enable or disable column-layout handling.
    pub fn with_layout(mut self, preserve: bool) -> Self {
        self.preserve_layout = preserve;
        self
    }

    /// Enable or disable paragraph merging.
    pub fn with_merge_paragraphs(mut self, merge: bool) -> Self {
        self.merge_paragraphs = merge;
        self
    }

    /// Keep end-of-line hyphens instead of joining the word halves.
    pub fn with_hyphenation(mut self, keep: bool) -> Self {
        self.keep_hyphenation = keep;
        self
    }

    /// Enable or disable image extraction.
    pub fn with_images(mut self, extract: bool) -> Self {
        self.extract_images = extract;
        self
    }

    /// Set the JPEG quality, clamped to 1..=100.
    pub fn with_image_quality(mut self, quality: u8) -> Self {
        self.image_quality = quality.clamp(1, 100);
        self
    }

    /// Set the maximum image width in pixels.
    pub fn with_max_image_width(mut self, width: u32) -> Self {
        self.max_image_width = width;
        self
    }

    /// Set an inclusive 1-based page range.
    pub fn with_page_range(mut self, start: u32, end: u32) -> Self {
        self.page_range = Some((start, end));
        self
    }

    /// Disable parallel page extraction.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Shortcut for the active quality profile.
    pub fn profile(&self) -> &'static QualityProfile {
        self.quality.profile()
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            header_mode: HeaderFooterMode::Convert,
            footer_mode: HeaderFooterMode::Convert,
            header_margin: 0.10,
            footer_margin: 0.10,
            quality: Quality::Balanced,
            preserve_formatting: true,
            preserve_layout: true,
            merge_paragraphs: true,
            keep_hyphenation: false,
            extract_images: true,
            image_quality: 95,
            max_image_width: 800,
            page_range: None,
            parallel: true,
        }
    }
}
