//! refold CLI - structure-preserving document conversion.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use refold::{
    Conversion, ConversionConfig, ConversionResult, FileFormat, HeaderFooterMode, ProgressSink,
    Quality, Stage,
};

#[derive(Parser)]
#[command(name = "refold")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Convert documents between PDF and DOCX, text, and Markdown", long_about = None)]
struct Cli {
    /// Input file (PDF, DOCX, TXT, MD)
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Target format; inferred from the input when omitted
    #[arg(short = 't', long = "to", value_enum)]
    target: Option<TargetFormat>,

    /// Output file or directory; defaults to the input's directory
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// First page to convert (1-based)
    #[arg(long, requires = "end_page")]
    start_page: Option<u32>,

    /// Last page to convert (1-based, inclusive)
    #[arg(long, requires = "start_page")]
    end_page: Option<u32>,

    /// Show stage-by-stage progress and a summary
    #[arg(short, long)]
    verbose: bool,

    /// Print the conversion summary as JSON
    #[arg(long)]
    json: bool,

    /// How to treat recurring headers
    #[arg(long, value_enum, default_value = "convert")]
    header_mode: BandMode,

    /// How to treat recurring footers
    #[arg(long, value_enum, default_value = "convert")]
    footer_mode: BandMode,

    /// Header band as a fraction of page height
    #[arg(long, default_value_t = 0.10)]
    header_margin: f32,

    /// Footer band as a fraction of page height
    #[arg(long, default_value_t = 0.10)]
    footer_margin: f32,

    /// Transcription quality preset
    #[arg(short, long, value_enum, default_value = "balanced")]
    quality: QualityLevel,

    /// Disable bold/italic preservation
    #[arg(long)]
    no_formatting: bool,

    /// Disable column-layout handling
    #[arg(long)]
    no_layout: bool,

    /// Disable merging of fragmented paragraphs
    #[arg(long)]
    no_merge_paragraphs: bool,

    /// Keep end-of-line hyphenation
    #[arg(long)]
    keep_hyphenation: bool,

    /// Do not extract images
    #[arg(long)]
    no_images: bool,

    /// JPEG quality for extracted images (1-100)
    #[arg(long, default_value_t = 95)]
    image_quality: u8,

    /// Maximum image width in pixels
    #[arg(long, default_value_t = 800)]
    max_image_width: u32,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum TargetFormat {
    Docx,
    Pdf,
    Txt,
    Md,
}

impl From<TargetFormat> for FileFormat {
    fn from(target: TargetFormat) -> Self {
        match target {
            TargetFormat::Docx => FileFormat::Docx,
            TargetFormat::Pdf => FileFormat::Pdf,
            TargetFormat::Txt => FileFormat::Text,
            TargetFormat::Md => FileFormat::Markdown,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum BandMode {
    /// Leave band content in the body
    Keep,
    /// Drop classified header/footer content
    Remove,
    /// Re-emit as native section headers/footers
    Convert,
}

impl From<BandMode> for HeaderFooterMode {
    fn from(mode: BandMode) -> Self {
        match mode {
            BandMode::Keep => HeaderFooterMode::Keep,
            BandMode::Remove => HeaderFooterMode::Remove,
            BandMode::Convert => HeaderFooterMode::Convert,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum QualityLevel {
    Fast,
    Balanced,
    High,
}

impl From<QualityLevel> for Quality {
    fn from(level: QualityLevel) -> Self {
        match level {
            QualityLevel::Fast => Quality::Fast,
            QualityLevel::Balanced => Quality::Balanced,
            QualityLevel::High => Quality::High,
        }
    }
}

/// Forwards pipeline events to a terminal spinner.
struct TermSink {
    bar: ProgressBar,
}

impl TermSink {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for TermSink {
    fn on_stage(&self, stage: Stage) {
        self.bar.set_message(format!("stage: {}", stage));
    }

    fn on_pages_extracted(&self, count: u32) {
        self.bar.set_message(format!("{} pages extracted", count));
    }

    fn on_blocks_classified(&self, count: u32) {
        self.bar.set_message(format!("{} blocks classified", count));
    }

    fn on_images_extracted(&self, count: u32) {
        self.bar.set_message(format!("{} images extracted", count));
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let config = build_config(&cli);
    let mut conversion = Conversion::new(config);

    let sink = if cli.verbose {
        let sink = Arc::new(TermSink::new());
        conversion = conversion.with_progress(sink.clone());
        Some(sink)
    } else {
        None
    };

    let result = match cli.target {
        Some(target) => conversion.convert_to(&cli.input, target.into(), cli.output.as_deref()),
        None => conversion.convert(&cli.input, cli.output.as_deref()),
    };

    if let Some(sink) = &sink {
        sink.finish();
    }

    match result {
        Ok(result) => {
            report(&cli, &result);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

fn build_config(cli: &Cli) -> ConversionConfig {
    let mut config = ConversionConfig::new()
        .with_header_mode(cli.header_mode.into())
        .with_footer_mode(cli.footer_mode.into())
        .with_header_margin(cli.header_margin)
        .with_footer_margin(cli.footer_margin)
        .with_quality(cli.quality.into())
        .with_formatting(!cli.no_formatting)
        .with_layout(!cli.no_layout)
        .with_merge_paragraphs(!cli.no_merge_paragraphs)
        .with_hyphenation(cli.keep_hyphenation)
        .with_images(!cli.no_images)
        .with_image_quality(cli.image_quality)
        .with_max_image_width(cli.max_image_width);

    if let (Some(start), Some(end)) = (cli.start_page, cli.end_page) {
        config = config.with_page_range(start, end);
    }

    config
}

fn report(cli: &Cli, result: &ConversionResult) {
    if cli.json {
        let summary = serde_json::json!({
            "written_path": result.written_path,
            "pages_converted": result.pages_converted,
            "headers_detected": result.headers_detected,
            "footers_detected": result.footers_detected,
            "images_extracted": result.images_extracted,
            "warnings": result.warnings.iter().map(|w| w.to_string()).collect::<Vec<_>>(),
        });
        println!("{}", summary);
        return;
    }

    if !cli.verbose {
        println!(
            "{} {}",
            "wrote".green().bold(),
            result.written_path.display()
        );
        return;
    }

    println!("{}", "=== Conversion summary ===".bold());
    println!("output:            {}", result.written_path.display());
    println!("pages converted:   {}", result.pages_converted);
    if result.headers_detected > 0 {
        println!("headers detected:  {}", result.headers_detected);
    }
    if result.footers_detected > 0 {
        println!("footers detected:  {}", result.footers_detected);
    }
    if result.images_extracted > 0 {
        println!("images extracted:  {}", result.images_extracted);
    }
    if !result.warnings.is_empty() {
        println!(
            "{} {}",
            "warnings:".yellow().bold(),
            result.warnings.len()
        );
        for warning in result.warnings.iter().take(5) {
            println!("  - {}", warning);
        }
    }
}
