//! Data model for the conversion pipeline.
//!
//! Two layers: the page model ([`Span`], [`PageSpans`], [`MarginBand`])
//! produced by extraction, and the flow model ([`LogicalBlock`],
//! [`FlowDocument`]) produced by structure inference and consumed by the
//! target writers.

mod block;
mod document;
mod image;
mod span;

pub use block::{coalesce_runs, ListMarker, LogicalBlock, Run, TableRegion};
pub use document::{parse_pdf_date, FlowDocument, Metadata};
pub use image::{detect_mime_type, ExtractedImage, ImageAnchor};
pub use span::{BandSide, MarginBand, PageSpans, Span};
