//! Conversion orchestration.
//!
//! The orchestrator is the only component with knowledge of the full
//! pipeline: extraction → header/footer classification → structure
//! inference → paragraph reconstruction + image extraction → writing. It
//! owns the config and the document handle for the run's duration and
//! releases both on every exit path.

mod progress;

pub use progress::{NullSink, ProgressSink, Stage};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::classify::HeaderFooterClassifier;
use crate::config::{ConversionConfig, HeaderFooterMode};
use crate::detect::{detect_format, FileFormat};
use crate::error::{Error, Result, Warning};
use crate::extract::PdfExtractor;
use crate::images::{anchor_images, ImageExtractor};
use crate::infer::{InferredBlock, StructureEngine};
use crate::model::{FlowDocument, LogicalBlock};
use crate::read;
use crate::reconstruct::ParagraphAssembler;
use crate::write;

/// Outcome of a completed conversion run.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    /// Where the output was written.
    pub written_path: PathBuf,
    /// Pages processed (source pages for PDF input, produced pages for PDF
    /// output).
    pub pages_converted: u32,
    /// Pages on which header content was classified.
    pub headers_detected: u32,
    /// Pages on which footer content was classified.
    pub footers_detected: u32,
    /// Images extracted and embedded.
    pub images_extracted: u32,
    /// Non-fatal conditions recorded during the run.
    pub warnings: Vec<Warning>,
}

/// A configured conversion runner.
pub struct Conversion {
    config: ConversionConfig,
    progress: Arc<dyn ProgressSink>,
}

impl Conversion {
    /// Create a runner over an immutable config snapshot.
    pub fn new(config: ConversionConfig) -> Self {
        Self {
            config,
            progress: Arc::new(NullSink),
        }
    }

    /// Attach a progress sink.
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    /// Convert `source`, inferring the target format from the source format
    /// (PDF → DOCX, everything else → PDF) or from the output extension.
    pub fn convert(&self, source: &Path, output: Option<&Path>) -> Result<ConversionResult> {
        let source_format = detect_format(source)?;
        let target = output
            .and_then(|p| p.extension())
            .and_then(|e| e.to_str())
            .and_then(FileFormat::from_extension)
            .unwrap_or(match source_format {
                FileFormat::Pdf => FileFormat::Docx,
                _ => FileFormat::Pdf,
            });
        self.convert_to(source, target, output)
    }

    /// Convert `source` into `target` format.
    ///
    /// `output` may be a file path, a directory (output lands there under
    /// the source stem), or `None` (output lands next to the source).
    pub fn convert_to(
        &self,
        source: &Path,
        target: FileFormat,
        output: Option<&Path>,
    ) -> Result<ConversionResult> {
        let source_format = detect_format(source)?;
        check_pair(source_format, target)?;

        let written_path = build_output_path(source, output, target);
        log::info!(
            "converting {} ({}) -> {} ({})",
            source.display(),
            source_format,
            written_path.display(),
            target
        );

        match source_format {
            FileFormat::Pdf => self.convert_from_pdf(source, target, written_path),
            _ => self.convert_to_pdf(source, source_format, written_path),
        }
    }

    /// Forward path: PDF → DOCX/TXT/MD.
    fn convert_from_pdf(
        &self,
        source: &Path,
        target: FileFormat,
        written_path: PathBuf,
    ) -> Result<ConversionResult> {
        let mut warnings = Vec::new();

        self.progress.on_stage(Stage::Extract);
        let extractor = PdfExtractor::open(source)?;
        let extracted = extractor.extract(&self.config)?;
        let pages_converted = extracted.pages.len() as u32;
        self.progress.on_pages_extracted(pages_converted);

        self.progress.on_stage(Stage::Classify);
        let mut pages = extracted.pages;
        let summary = HeaderFooterClassifier::new(&self.config).classify(&mut pages);

        self.progress.on_stage(Stage::Infer);
        let mut engine = StructureEngine::new(&self.config);
        let (inferred, infer_warnings) = engine.infer(&pages);
        warnings.extend(infer_warnings);
        self.progress.on_blocks_classified(inferred.len() as u32);

        self.progress.on_stage(Stage::Reconstruct);
        let assembler = ParagraphAssembler::new(&self.config);
        let mut blocks: Vec<LogicalBlock> = Vec::with_capacity(inferred.len() + 2);
        if self.config.header_mode == HeaderFooterMode::Convert {
            if let Some(text) = summary.header_text.clone() {
                blocks.push(LogicalBlock::HeaderText { text });
            }
        }
        if self.config.footer_mode == HeaderFooterMode::Convert {
            if let Some(text) = summary.footer_text.clone() {
                blocks.push(LogicalBlock::FooterText { text });
            }
        }
        for item in inferred {
            match item {
                InferredBlock::Text(raw) => blocks.push(assembler.assemble(raw)),
                InferredBlock::Table(table) => blocks.push(LogicalBlock::Table {
                    region: table.region,
                    page: table.page,
                    y: table.y,
                }),
            }
        }

        self.progress.on_stage(Stage::Images);
        let (images, image_warnings) = ImageExtractor::new(&self.config).process(extracted.images);
        warnings.extend(image_warnings);
        let images_extracted = images.len() as u32;
        anchor_images(&mut blocks, images);
        self.progress.on_images_extracted(images_extracted);

        let doc = FlowDocument {
            blocks,
            metadata: extracted.metadata,
        };

        self.progress.on_stage(Stage::Write);
        let bytes = match target {
            FileFormat::Docx => write::render_docx(&doc)?,
            FileFormat::Text => write::render_text(&doc).into_bytes(),
            FileFormat::Markdown => write::render_markdown(&doc).into_bytes(),
            FileFormat::Pdf => unreachable!("pdf -> pdf rejected by check_pair"),
        };
        write::write_output(&written_path, &bytes)?;

        Ok(ConversionResult {
            written_path,
            pages_converted,
            headers_detected: summary.headers_detected,
            footers_detected: summary.footers_detected,
            images_extracted,
            warnings,
        })
    }

    /// Reverse path: DOCX/TXT/MD → PDF.
    fn convert_to_pdf(
        &self,
        source: &Path,
        source_format: FileFormat,
        written_path: PathBuf,
    ) -> Result<ConversionResult> {
        self.progress.on_stage(Stage::Extract);
        let doc = match source_format {
            FileFormat::Docx => read::read_docx_file(source)?,
            FileFormat::Text => read::read_text_file(source)?,
            FileFormat::Markdown => read::read_markdown_file(source)?,
            FileFormat::Pdf => unreachable!("pdf source routed to convert_from_pdf"),
        };
        self.progress
            .on_blocks_classified(doc.blocks.len() as u32);

        self.progress.on_stage(Stage::Write);
        let (bytes, pages_converted) = write::PdfWriter::new().render(&doc)?;
        write::write_output(&written_path, &bytes)?;

        Ok(ConversionResult {
            written_path,
            pages_converted,
            headers_detected: 0,
            footers_detected: 0,
            images_extracted: 0,
            warnings: Vec::new(),
        })
    }
}

/// Supported source/target pairs.
fn check_pair(source: FileFormat, target: FileFormat) -> Result<()> {
    let ok = match source {
        FileFormat::Pdf => matches!(
            target,
            FileFormat::Docx | FileFormat::Text | FileFormat::Markdown
        ),
        FileFormat::Docx | FileFormat::Text | FileFormat::Markdown => {
            target == FileFormat::Pdf
        }
    };

    if ok {
        Ok(())
    } else {
        Err(Error::UnsupportedConversion(
            source.to_string(),
            target.to_string(),
        ))
    }
}

/// Resolve the output path: explicit file, directory + source stem, or the
/// source's own directory.
fn build_output_path(source: &Path, output: Option<&Path>, target: FileFormat) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let file_name = format!("{}.{}", stem, target.extension());

    match output {
        None => source.with_file_name(file_name),
        Some(path) if path.is_dir() => path.join(file_name),
        Some(path) => path.to_path_buf(),
    }
}

/// Convert a file with the given config. Convenience wrapper over
/// [`Conversion`].
pub fn convert_file(
    source: impl AsRef<Path>,
    output: Option<&Path>,
    config: ConversionConfig,
) -> Result<ConversionResult> {
    Conversion::new(config).convert(source.as_ref(), output)
}
