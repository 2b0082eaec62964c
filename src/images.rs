//! Image extraction and processing.
//!
//! Decodes raster images harvested from in-range pages, resizes them under
//! the configured width limit (never upscaling), re-encodes as JPEG at the
//! configured quality, and anchors each to the nearest preceding logical
//! block. A single undecodable image is dropped with a warning; the run
//! continues.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;

use crate::config::ConversionConfig;
use crate::error::Warning;
use crate::extract::RawImage;
use crate::model::{ExtractedImage, ImageAnchor, LogicalBlock};

/// Processes raw page images into writer-ready payloads.
pub struct ImageExtractor<'a> {
    config: &'a ConversionConfig,
}

impl<'a> ImageExtractor<'a> {
    /// Create an extractor over one run's config.
    pub fn new(config: &'a ConversionConfig) -> Self {
        Self { config }
    }

    /// Decode, resize, and re-encode the raw images.
    pub fn process(&self, raw: Vec<RawImage>) -> (Vec<ExtractedImage>, Vec<Warning>) {
        if !self.config.extract_images {
            return (vec![], vec![]);
        }

        let mut images = Vec::new();
        let mut warnings = Vec::new();

        for item in raw {
            match self.process_one(&item) {
                Ok(image) => images.push(image),
                Err(detail) => {
                    log::warn!("page {}: dropping image: {}", item.page, detail);
                    warnings.push(Warning::ImageDecode {
                        page: item.page,
                        detail,
                    });
                }
            }
        }

        (images, warnings)
    }

    fn process_one(&self, raw: &RawImage) -> std::result::Result<ExtractedImage, String> {
        let decoded = image::load_from_memory(&raw.data).map_err(|e| e.to_string())?;

        let (orig_w, orig_h) = (decoded.width(), decoded.height());
        let max_width = self.config.max_image_width;

        let resized = if max_width > 0 && orig_w > max_width {
            let filter = if self.config.profile().fine_resample {
                FilterType::Lanczos3
            } else {
                FilterType::Triangle
            };
            let new_h = ((orig_h as u64 * max_width as u64) / orig_w as u64).max(1) as u32;
            decoded.resize_exact(max_width, new_h, filter)
        } else {
            decoded
        };

        let (w, h) = (resized.width(), resized.height());

        // JPEG has no alpha channel; flatten before encoding.
        let rgb = resized.to_rgb8();
        let mut data = Vec::new();
        let mut cursor = Cursor::new(&mut data);
        let mut encoder =
            JpegEncoder::new_with_quality(&mut cursor, self.config.image_quality);
        encoder.encode_image(&rgb).map_err(|e| e.to_string())?;
        drop(cursor);

        Ok(ExtractedImage {
            data,
            mime_type: "image/jpeg".to_string(),
            original_size: (orig_w, orig_h),
            size: (w, h),
            quality: self.config.image_quality,
            anchor: ImageAnchor {
                page: raw.page,
                y: raw.y,
            },
        })
    }
}

/// Splice images into the block sequence at their anchors.
///
/// Each image lands after the last block that precedes it in reading order:
/// an earlier page, or the same page at or above the image's top edge.
pub fn anchor_images(blocks: &mut Vec<LogicalBlock>, images: Vec<ExtractedImage>) {
    for image in images {
        let anchor = image.anchor;
        let mut insert_at = 0;

        for (i, block) in blocks.iter().enumerate() {
            let Some(page) = block.page() else {
                // Header/footer blocks sit ahead of the body.
                insert_at = i + 1;
                continue;
            };
            let above = match block {
                LogicalBlock::Heading { y, .. }
                | LogicalBlock::Paragraph { y, .. }
                | LogicalBlock::ListItem { y, .. }
                | LogicalBlock::Table { y, .. } => *y >= anchor.y,
                LogicalBlock::Image { image: other } => other.anchor.y >= anchor.y,
                _ => true,
            };
            if page < anchor.page || (page == anchor.page && above) {
                insert_at = i + 1;
            }
        }

        blocks.insert(insert_at, LogicalBlock::Image { image });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Run;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn raw(data: Vec<u8>, page: u32, y: f32) -> RawImage {
        RawImage {
            page,
            data,
            mime_type: "image/png".into(),
            width: 0,
            height: 0,
            y,
        }
    }

    #[test]
    fn test_resize_preserves_aspect_ratio() {
        let config = ConversionConfig::new().with_max_image_width(800);
        let extractor = ImageExtractor::new(&config);

        let (images, warnings) = extractor.process(vec![raw(png_bytes(1600, 1200), 1, 500.0)]);

        assert!(warnings.is_empty());
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].size, (800, 600));
        assert_eq!(images[0].original_size, (1600, 1200));
        assert_eq!(images[0].mime_type, "image/jpeg");
    }

    #[test]
    fn test_never_upscales() {
        let config = ConversionConfig::new().with_max_image_width(800);
        let extractor = ImageExtractor::new(&config);

        let (images, _) = extractor.process(vec![raw(png_bytes(400, 300), 1, 500.0)]);
        assert_eq!(images[0].size, (400, 300));
    }

    #[test]
    fn test_decode_failure_is_nonfatal() {
        let config = ConversionConfig::default();
        let extractor = ImageExtractor::new(&config);

        let (images, warnings) = extractor.process(vec![
            raw(vec![0xDE, 0xAD, 0xBE, 0xEF], 2, 100.0),
            raw(png_bytes(100, 100), 3, 200.0),
        ]);

        assert_eq!(images.len(), 1);
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            warnings[0],
            Warning::ImageDecode { page: 2, .. }
        ));
    }

    #[test]
    fn test_extraction_disabled() {
        let config = ConversionConfig::new().with_images(false);
        let extractor = ImageExtractor::new(&config);

        let (images, warnings) = extractor.process(vec![raw(png_bytes(100, 100), 1, 0.0)]);
        assert!(images.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_anchor_after_preceding_block() {
        let para = |text: &str, page: u32, y: f32| LogicalBlock::Paragraph {
            runs: vec![Run::new(text)],
            page,
            y,
        };
        let mut blocks = vec![
            para("first", 1, 700.0),
            para("second", 1, 400.0),
            para("third", 2, 700.0),
        ];

        let image = ExtractedImage {
            data: vec![],
            mime_type: "image/jpeg".into(),
            original_size: (10, 10),
            size: (10, 10),
            quality: 95,
            anchor: ImageAnchor { page: 1, y: 550.0 },
        };
        anchor_images(&mut blocks, vec![image]);

        assert_eq!(blocks.len(), 4);
        assert!(matches!(blocks[1], LogicalBlock::Image { .. }));
        assert_eq!(blocks[0].plain_text(), "first");
        assert_eq!(blocks[2].plain_text(), "second");
    }
}
