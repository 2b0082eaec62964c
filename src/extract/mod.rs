//! Source-document extraction.

mod pdf;

pub use pdf::{ExtractedPages, PdfExtractor, RawImage};
