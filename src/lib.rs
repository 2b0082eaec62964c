//! # refold
//!
//! Structure-preserving document conversion between page-oriented PDF and
//! flow-oriented DOCX, plain text, and Markdown.
//!
//! The hard part of the conversion is not file I/O: it is reconstructing a
//! flow document model from an unstructured, position-based page model.
//! Given only bounding boxes, font runs, and glyph spans, the pipeline
//! infers document structure — heading levels, paragraph boundaries,
//! recurring header/footer regions, list items, table-like regions — and
//! re-expresses it under a different structural model.
//!
//! ## Quick Start
//!
//! ```no_run
//! use refold::{convert_file, ConversionConfig};
//!
//! fn main() -> refold::Result<()> {
//!     let result = convert_file("report.pdf", None, ConversionConfig::default())?;
//!     println!("wrote {}", result.written_path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! Extraction → header/footer classification → structure inference →
//! paragraph reconstruction + image extraction → target writer. Data flows
//! strictly downward; only the orchestrator sees the whole pipeline.
//!
//! ## Features
//!
//! - **Format pairs**: PDF → DOCX/TXT/MD, and DOCX/TXT/MD → PDF
//! - **Header/footer handling**: keep, remove, or convert recurring margin
//!   content to native section headers/footers
//! - **Quality profiles**: fast/balanced/high presets for the merging
//!   heuristics
//! - **Image extraction**: resized and re-encoded under configurable limits
//! - **Parallel extraction**: pages fan out across threads via Rayon

pub mod classify;
pub mod config;
pub mod convert;
pub mod detect;
pub mod error;
pub mod extract;
pub mod images;
pub mod infer;
pub mod model;
pub mod read;
pub mod reconstruct;
pub mod write;

// Re-export commonly used types
pub use config::{ConversionConfig, HeaderFooterMode, Quality, QualityProfile};
pub use convert::{convert_file, Conversion, ConversionResult, ProgressSink, Stage};
pub use detect::FileFormat;
pub use error::{Error, Result, Warning};
pub use model::{
    ExtractedImage, FlowDocument, ListMarker, LogicalBlock, Metadata, PageSpans, Run, Span,
    TableRegion,
};

use std::path::Path;
use std::sync::Arc;

/// Builder for conversion runs.
///
/// # Example
///
/// ```no_run
/// use refold::{Quality, Refold};
///
/// let result = Refold::new()
///     .quality(Quality::High)
///     .remove_headers()
///     .page_range(1, 10)
///     .convert("report.pdf", None)?;
/// # Ok::<(), refold::Error>(())
/// ```
pub struct Refold {
    config: ConversionConfig,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl Refold {
    /// Create a builder with default options.
    pub fn new() -> Self {
        Self {
            config: ConversionConfig::default(),
            progress: None,
        }
    }

    /// Set the quality preset.
    pub fn quality(mut self, quality: Quality) -> Self {
        self.config = self.config.with_quality(quality);
        self
    }

    /// Drop classified headers instead of converting them.
    pub fn remove_headers(mut self) -> Self {
        self.config = self.config.with_header_mode(HeaderFooterMode::Remove);
        self
    }

    /// Drop classified footers instead of converting them.
    pub fn remove_footers(mut self) -> Self {
        self.config = self.config.with_footer_mode(HeaderFooterMode::Remove);
        self
    }

    /// Restrict the conversion to an inclusive 1-based page range.
    pub fn page_range(mut self, start: u32, end: u32) -> Self {
        self.config = self.config.with_page_range(start, end);
        self
    }

    /// Disable image extraction.
    pub fn without_images(mut self) -> Self {
        self.config = self.config.with_images(false);
        self
    }

    /// Replace the whole config.
    pub fn with_config(mut self, config: ConversionConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach a progress sink.
    pub fn progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Run the conversion.
    pub fn convert<P: AsRef<Path>>(
        self,
        source: P,
        output: Option<&Path>,
    ) -> Result<ConversionResult> {
        let mut conversion = Conversion::new(self.config);
        if let Some(sink) = self.progress {
            conversion = conversion.with_progress(sink);
        }
        conversion.convert(source.as_ref(), output)
    }
}

impl Default for Refold {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_composition() {
        let refold = Refold::new()
            .quality(Quality::High)
            .remove_headers()
            .page_range(2, 5)
            .without_images();

        assert_eq!(refold.config.quality, Quality::High);
        assert_eq!(refold.config.header_mode, HeaderFooterMode::Remove);
        assert_eq!(refold.config.page_range, Some((2, 5)));
        assert!(!refold.config.extract_images);
        // Footers keep the default mode.
        assert_eq!(refold.config.footer_mode, HeaderFooterMode::Convert);
    }

    #[test]
    fn test_convert_missing_file_fails() {
        let result = Refold::new().convert("does-not-exist.pdf", None);
        assert!(result.is_err());
    }
}
