//! Error types for the refold library.

use std::io;
use thiserror::Error;

/// Result type alias for refold operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors that abort a conversion run.
///
/// Non-fatal conditions (a misclassified region, a single undecodable image)
/// are not errors; they are collected as [`Warning`]s on the successful
/// result and the run continues.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input file is not a recognized document format.
    #[error("Unknown file format: {0}")]
    UnknownFormat(String),

    /// The PDF document is encrypted and cannot be read.
    #[error("Document is encrypted")]
    Encrypted,

    /// Error reading the source document structure.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// A requested page is outside the document.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// The page range itself is malformed.
    #[error("Invalid page range: {0}")]
    InvalidPageRange(String),

    /// The requested source/target pair is not supported.
    #[error("Unsupported conversion: {0} -> {1}")]
    UnsupportedConversion(String, String),

    /// The output could not be serialized or written.
    #[error("Write error: {0}")]
    Write(String),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::Extraction(err.to_string()),
        }
    }
}

/// Non-fatal conditions recorded during a run.
///
/// Warnings are returned alongside the successful result; they never abort
/// the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A region could not be classified confidently and was degraded to a
    /// more generic block type.
    Classification {
        /// Page the region came from (1-indexed).
        page: u32,
        /// What was degraded and why.
        detail: String,
    },

    /// An embedded image could not be decoded and was dropped.
    ImageDecode {
        /// Page the image came from (1-indexed).
        page: u32,
        /// Decoder message.
        detail: String,
    },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::Classification { page, detail } => {
                write!(f, "page {}: {}", page, detail)
            }
            Warning::ImageDecode { page, detail } => {
                write!(f, "page {}: image dropped: {}", page, detail)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Encrypted;
        assert_eq!(err.to_string(), "Document is encrypted");

        let err = Error::PageOutOfRange(10, 5);
        assert_eq!(
            err.to_string(),
            "Page 10 is out of range (document has 5 pages)"
        );

        let err = Error::UnsupportedConversion("pdf".into(), "pdf".into());
        assert_eq!(err.to_string(), "Unsupported conversion: pdf -> pdf");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_warning_display() {
        let warn = Warning::ImageDecode {
            page: 3,
            detail: "truncated JPEG".into(),
        };
        assert_eq!(warn.to_string(), "page 3: image dropped: truncated JPEG");
    }
}
