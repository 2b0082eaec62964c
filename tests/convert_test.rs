//! Tests for format routing, the reverse (to-PDF) path, and error surfaces.

use std::fs;

use refold::{
    Conversion, ConversionConfig, Error, FileFormat, FlowDocument, LogicalBlock, Run,
};

fn sample_flow() -> FlowDocument {
    let mut doc = FlowDocument::new();
    doc.blocks.push(LogicalBlock::Heading {
        level: 1,
        runs: vec![Run::new("Quarterly Report")],
        page: 1,
        y: 0.0,
    });
    doc.blocks.push(LogicalBlock::Paragraph {
        runs: vec![Run::new("Revenue was "), Run::bold("up")],
        page: 1,
        y: 0.0,
    });
    doc
}

#[test]
fn test_txt_to_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("notes.txt");
    fs::write(&source, "line one\nline two\nline three\n").unwrap();

    let result = Conversion::new(ConversionConfig::default())
        .convert(&source, None)
        .unwrap();

    assert_eq!(result.written_path, dir.path().join("notes.pdf"));
    assert!(result.pages_converted >= 1);

    let bytes = fs::read(&result.written_path).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
}

#[test]
fn test_docx_to_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("report.docx");
    fs::write(&source, refold::write::render_docx(&sample_flow()).unwrap()).unwrap();

    let result = Conversion::new(ConversionConfig::default())
        .convert(&source, None)
        .unwrap();

    assert_eq!(result.written_path, dir.path().join("report.pdf"));
    let bytes = fs::read(&result.written_path).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
}

#[test]
fn test_markdown_to_pdf_output_into_directory() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("doc.md");
    fs::write(&source, "# Title\nBody text line.\n").unwrap();

    let out_dir = dir.path().join("out");
    fs::create_dir(&out_dir).unwrap();

    let result = Conversion::new(ConversionConfig::default())
        .convert(&source, Some(&out_dir))
        .unwrap();

    assert_eq!(result.written_path, out_dir.join("doc.pdf"));
    assert!(result.written_path.exists());
}

#[test]
fn test_unsupported_pair_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("report.docx");
    fs::write(&source, refold::write::render_docx(&sample_flow()).unwrap()).unwrap();

    let result = Conversion::new(ConversionConfig::default()).convert_to(
        &source,
        FileFormat::Text,
        None,
    );

    assert!(matches!(result, Err(Error::UnsupportedConversion(_, _))));
}

#[test]
fn test_unknown_extension_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("file.xyz");
    fs::write(&source, "whatever").unwrap();

    let result = Conversion::new(ConversionConfig::default()).convert(&source, None);
    assert!(matches!(result, Err(Error::UnknownFormat(_))));
}

#[test]
fn test_mislabeled_binary_rejected() {
    let dir = tempfile::tempdir().unwrap();
    // Claims to be a PDF, is not.
    let source = dir.path().join("fake.pdf");
    fs::write(&source, "just some text").unwrap();

    let result = Conversion::new(ConversionConfig::default()).convert(&source, None);
    assert!(matches!(result, Err(Error::UnknownFormat(_))));
}

#[test]
fn test_unwritable_output_is_write_error() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("notes.txt");
    fs::write(&source, "content line\n").unwrap();

    // A path nested under a regular file cannot be created.
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "x").unwrap();
    let output = blocker.join("nested").join("out.pdf");

    let result =
        Conversion::new(ConversionConfig::default()).convert(&source, Some(&output));
    assert!(matches!(result, Err(Error::Write(_))));
}

#[test]
fn test_docx_round_trip_preserves_structure() {
    let dir = tempfile::tempdir().unwrap();

    let mut doc = FlowDocument::new();
    doc.blocks.push(LogicalBlock::Heading {
        level: 1,
        runs: vec![Run::new("Quarterly Report")],
        page: 1,
        y: 0.0,
    });
    for i in 0..3 {
        doc.blocks.push(LogicalBlock::Paragraph {
            runs: vec![Run::new(format!(
                "Paragraph number {} carries enough words that the page writer wraps it \
                 over more than one physical line before the following block starts.",
                i
            ))],
            page: 1,
            y: 0.0,
        });
    }

    let source = dir.path().join("report.docx");
    fs::write(&source, refold::write::render_docx(&doc).unwrap()).unwrap();

    // DOCX → PDF.
    let pdf = dir.path().join("report.pdf");
    Conversion::new(ConversionConfig::default())
        .convert(&source, Some(&pdf))
        .unwrap();

    // PDF → DOCX again.
    let back = dir.path().join("back.docx");
    let config = ConversionConfig::new()
        .with_quality(refold::Quality::High)
        .with_images(false);
    Conversion::new(config).convert(&pdf, Some(&back)).unwrap();

    let reparsed = refold::read::read_docx_file(&back).unwrap();
    let heading_levels: Vec<u8> = reparsed
        .blocks
        .iter()
        .filter_map(|b| b.heading_level())
        .collect();
    assert_eq!(heading_levels, vec![1]);

    let paragraphs = reparsed
        .blocks
        .iter()
        .filter(|b| b.heading_level().is_none())
        .count();
    assert!(
        (2..=4).contains(&paragraphs),
        "expected ~3 paragraphs after round trip, got {}",
        paragraphs
    );
    assert!(reparsed.plain_text().contains("Paragraph number 1"));
}

#[test]
fn test_docx_output_opens_as_package() {
    let dir = tempfile::tempdir().unwrap();

    // Produce a DOCX through the full forward path from a generated PDF.
    let md = dir.path().join("gen.md");
    fs::write(&md, "# Heading\nSome body text for conversion.\n").unwrap();
    let pdf = dir.path().join("gen.pdf");
    Conversion::new(ConversionConfig::default())
        .convert(&md, Some(&pdf))
        .unwrap();

    let docx = dir.path().join("gen.docx");
    let result = Conversion::new(ConversionConfig::default())
        .convert(&pdf, Some(&docx))
        .unwrap();
    assert_eq!(result.written_path, docx);

    // The package must be readable by the DOCX reader, with text intact.
    let parsed = refold::read::read_docx_file(&docx).unwrap();
    let all_text = parsed.plain_text();
    assert!(all_text.contains("Heading"), "got: {}", all_text);
    assert!(all_text.contains("body text"), "got: {}", all_text);
}
