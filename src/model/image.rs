//! Extracted image payloads and their anchors.

use serde::{Deserialize, Serialize};

/// Where an image attaches to the block sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageAnchor {
    /// Source page (1-indexed).
    pub page: u32,

    /// Approximate top Y of the image on its page.
    pub y: f32,
}

/// A processed raster image ready for the target writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedImage {
    /// Encoded payload (JPEG after re-encoding).
    #[serde(skip_serializing)]
    pub data: Vec<u8>,

    /// MIME type of `data`.
    pub mime_type: String,

    /// Original pixel dimensions.
    pub original_size: (u32, u32),

    /// Dimensions after resizing.
    pub size: (u32, u32),

    /// JPEG quality used for re-encoding.
    pub quality: u8,

    /// Position used to interleave the image into the block sequence.
    pub anchor: ImageAnchor,
}

impl ExtractedImage {
    /// Width in pixels after processing.
    pub fn width(&self) -> u32 {
        self.size.0
    }

    /// Height in pixels after processing.
    pub fn height(&self) -> u32 {
        self.size.1
    }

    /// Payload size in bytes.
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}

/// Detect a MIME type from magic bytes.
pub fn detect_mime_type(data: &[u8]) -> Option<&'static str> {
    if data.len() < 8 {
        return None;
    }

    // JPEG: FF D8 FF
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }

    // PNG: 89 50 4E 47 0D 0A 1A 0A
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }

    // GIF87a / GIF89a
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return Some("image/gif");
    }

    // TIFF, both byte orders
    if data.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || data.starts_with(&[0x4D, 0x4D, 0x00, 0x2A]) {
        return Some("image/tiff");
    }

    // BMP
    if data.starts_with(b"BM") {
        return Some("image/bmp");
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_mime_type() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46];
        assert_eq!(detect_mime_type(&jpeg), Some("image/jpeg"));

        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(detect_mime_type(&png), Some("image/png"));

        assert_eq!(detect_mime_type(&[0u8; 8]), None);
        assert_eq!(detect_mime_type(b"xx"), None);
    }

    #[test]
    fn test_extracted_image_accessors() {
        let img = ExtractedImage {
            data: vec![1, 2, 3],
            mime_type: "image/jpeg".into(),
            original_size: (1600, 1200),
            size: (800, 600),
            quality: 95,
            anchor: ImageAnchor { page: 2, y: 500.0 },
        };
        assert_eq!(img.width(), 800);
        assert_eq!(img.height(), 600);
        assert_eq!(img.byte_len(), 3);
    }
}
