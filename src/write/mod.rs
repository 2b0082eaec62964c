//! Target writers, one per output format.
//!
//! Writers serialize into memory first; the file is only touched once the
//! full output exists, so a failed run never leaves a partial artifact.

mod docx;
mod markdown;
mod pdf;
mod text;

pub use docx::render_docx;
pub use markdown::render_markdown;
pub use pdf::PdfWriter;
pub use text::render_text;

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Write fully-serialized output bytes to the target path, creating parent
/// directories. Fails with [`Error::Write`] when the path is not writable.
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Write(format!("{}: {}", parent.display(), e)))?;
        }
    }
    fs::write(path, bytes).map_err(|e| Error::Write(format!("{}: {}", path.display(), e)))
}
