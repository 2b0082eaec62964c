//! Input format detection and validation.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// A recognized source or target format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// PDF page-model document
    Pdf,
    /// DOCX (Office Open XML) package
    Docx,
    /// Plain text
    Text,
    /// Markdown (heading subset)
    Markdown,
}

impl FileFormat {
    /// Canonical file extension, lowercase, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Pdf => "pdf",
            FileFormat::Docx => "docx",
            FileFormat::Text => "txt",
            FileFormat::Markdown => "md",
        }
    }

    /// Resolve a format from an extension string.
    pub fn from_extension(ext: &str) -> Option<FileFormat> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(FileFormat::Pdf),
            "docx" => Some(FileFormat::Docx),
            "txt" | "text" => Some(FileFormat::Text),
            "md" | "markdown" => Some(FileFormat::Markdown),
            _ => None,
        }
    }
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
/// ZIP local-file header, shared by DOCX packages.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Detect the format of a source file from its extension and, for binary
/// formats, its magic bytes.
///
/// Text and Markdown are extension-only (there is nothing to sniff); PDF and
/// DOCX must also carry the expected magic so a mislabeled file fails early
/// instead of deep inside the extractor.
pub fn detect_format<P: AsRef<Path>>(path: P) -> Result<FileFormat> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| Error::UnknownFormat(path.display().to_string()))?;

    let format = FileFormat::from_extension(ext)
        .ok_or_else(|| Error::UnknownFormat(format!(".{}", ext)))?;

    match format {
        FileFormat::Pdf | FileFormat::Docx => {
            let file = File::open(path)?;
            let mut reader = BufReader::new(file);
            let mut header = [0u8; 8];
            let n = reader.read(&mut header)?;
            detect_binary_format(&header[..n], format)
        }
        FileFormat::Text | FileFormat::Markdown => Ok(format),
    }
}

/// Validate binary magic bytes against the extension-derived format.
pub fn detect_binary_format(data: &[u8], expected: FileFormat) -> Result<FileFormat> {
    let ok = match expected {
        FileFormat::Pdf => data.starts_with(PDF_MAGIC),
        FileFormat::Docx => data.starts_with(ZIP_MAGIC),
        _ => true,
    };

    if ok {
        Ok(expected)
    } else {
        Err(Error::UnknownFormat(format!(
            "file does not look like {}",
            expected
        )))
    }
}

/// Check whether bytes start a valid PDF.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    data.starts_with(PDF_MAGIC)
}
