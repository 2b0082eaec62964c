//! Paragraph reconstruction.
//!
//! Turns classified raw blocks (lines of spans) into logical blocks with
//! formatting runs. Run boundaries occur exactly where bold/italic state
//! changes, never mid-style. Line joining resolves end-of-line hyphenation
//! according to the config.

use crate::config::ConversionConfig;
use crate::infer::{BlockKind, Line, RawBlock};
use crate::model::{coalesce_runs, LogicalBlock, Run};

/// Assembles logical blocks from raw inference output.
pub struct ParagraphAssembler<'a> {
    config: &'a ConversionConfig,
}

impl<'a> ParagraphAssembler<'a> {
    /// Create an assembler over one run's config.
    pub fn new(config: &'a ConversionConfig) -> Self {
        Self { config }
    }

    /// Assemble one raw block into a logical block.
    pub fn assemble(&self, block: RawBlock) -> LogicalBlock {
        let runs = self.merge_lines(&block.lines);
        match block.kind {
            BlockKind::Heading(level) => LogicalBlock::Heading {
                level,
                runs,
                page: block.page,
                y: block.y,
            },
            BlockKind::Paragraph => LogicalBlock::Paragraph {
                runs,
                page: block.page,
                y: block.y,
            },
            BlockKind::ListItem(marker) => LogicalBlock::ListItem {
                marker,
                runs,
                page: block.page,
                y: block.y,
            },
        }
    }

    /// Merge a block's lines into a single run sequence.
    fn merge_lines(&self, lines: &[Line]) -> Vec<Run> {
        let mut runs: Vec<Run> = Vec::new();

        for line in lines {
            let line_runs = self.line_runs(line);
            if line_runs.is_empty() {
                continue;
            }

            if runs.is_empty() {
                runs.extend(line_runs);
                continue;
            }

            let joiner = self.line_joiner(&mut runs);
            if let Some(sep) = joiner {
                if let Some(last) = runs.last_mut() {
                    last.text.push_str(sep);
                }
            }
            runs.extend(line_runs);
        }

        coalesce_runs(runs)
    }

    /// Decide how the next line attaches to the accumulated text, resolving
    /// a trailing hyphen in place. Returns the separator to append, if any.
    fn line_joiner(&self, runs: &mut Vec<Run>) -> Option<&'static str> {
        let last = runs.last_mut()?;

        if last.text.ends_with('-') {
            if self.config.keep_hyphenation {
                // Hyphen and line break survive as literal text.
                return Some("\n");
            }
            // Drop the hyphen and join the word halves directly.
            last.text.pop();
            return None;
        }

        Some(" ")
    }

    /// Runs for one line, with inter-span spacing attached to the
    /// preceding run.
    fn line_runs(&self, line: &Line) -> Vec<Run> {
        let mut runs: Vec<Run> = Vec::new();

        for span in &line.spans {
            let text = span.text.trim();
            if text.is_empty() {
                continue;
            }

            if let Some(last) = runs.last_mut() {
                last.text.push(' ');
            }

            let (bold, italic) = if self.config.preserve_formatting {
                (span.is_bold, span.is_italic)
            } else {
                (false, false)
            };

            runs.push(Run {
                text: text.to_string(),
                bold,
                italic,
            });
        }

        coalesce_runs(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infer::BlockKind;
    use crate::model::Span;

    fn line_of(parts: &[(&str, &str)], y: f32) -> Line {
        let mut x = 72.0;
        let spans: Vec<Span> = parts
            .iter()
            .map(|(text, font)| {
                let mut s = Span::new(text.to_string(), 1, x, y, 11.0, font.to_string());
                s.x1 = s.x0 + text.chars().count() as f32 * 5.5;
                x = s.x1 + 2.0;
                s
            })
            .collect();
        Line::from_spans(spans)
    }

    fn block_of(lines: Vec<Line>) -> RawBlock {
        RawBlock {
            kind: BlockKind::Paragraph,
            page: 1,
            y: lines.first().map(|l| l.baseline).unwrap_or(0.0),
            lines,
        }
    }

    #[test]
    fn test_hyphen_removed_by_default() {
        let config = ConversionConfig::default();
        let assembler = ParagraphAssembler::new(&config);
        let block = block_of(vec![
            line_of(&[("exam-", "Helvetica")], 700.0),
            line_of(&[("ple text", "Helvetica")], 686.0),
        ]);

        let result = assembler.assemble(block);
        let runs = result.runs().unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "example text");
    }

    #[test]
    fn test_hyphen_preserved_when_configured() {
        let config = ConversionConfig::new().with_hyphenation(true);
        let assembler = ParagraphAssembler::new(&config);
        let block = block_of(vec![
            line_of(&[("exam-", "Helvetica")], 700.0),
            line_of(&[("ple text", "Helvetica")], 686.0),
        ]);

        let result = assembler.assemble(block);
        assert_eq!(result.plain_text(), "exam-\nple text");
    }

    #[test]
    fn test_plain_lines_join_with_space() {
        let config = ConversionConfig::default();
        let assembler = ParagraphAssembler::new(&config);
        let block = block_of(vec![
            line_of(&[("first line", "Helvetica")], 700.0),
            line_of(&[("second line", "Helvetica")], 686.0),
        ]);

        assert_eq!(assembler.assemble(block).plain_text(), "first line second line");
    }

    #[test]
    fn test_run_boundaries_at_style_changes() {
        let config = ConversionConfig::default();
        let assembler = ParagraphAssembler::new(&config);
        let block = block_of(vec![line_of(
            &[
                ("normal text", "Helvetica"),
                ("bold part", "Helvetica-Bold"),
                ("more normal", "Helvetica"),
            ],
            700.0,
        )]);

        let result = assembler.assemble(block);
        let runs = result.runs().unwrap();
        assert_eq!(runs.len(), 3);
        assert!(!runs[0].bold);
        assert!(runs[1].bold);
        assert_eq!(runs[1].text, "bold part");
        assert!(!runs[2].bold);
    }

    #[test]
    fn test_formatting_disabled_collapses_runs() {
        let config = ConversionConfig::new().with_formatting(false);
        let assembler = ParagraphAssembler::new(&config);
        let block = block_of(vec![line_of(
            &[("normal", "Helvetica"), ("bold", "Helvetica-Bold")],
            700.0,
        )]);

        let result = assembler.assemble(block);
        let runs = result.runs().unwrap();
        assert_eq!(runs.len(), 1);
        assert!(!runs[0].bold);
        assert_eq!(runs[0].text, "normal bold");
    }

    #[test]
    fn test_heading_kind_preserved() {
        let config = ConversionConfig::default();
        let assembler = ParagraphAssembler::new(&config);
        let block = RawBlock {
            kind: BlockKind::Heading(2),
            page: 3,
            y: 700.0,
            lines: vec![line_of(&[("Section Title", "Helvetica-Bold")], 700.0)],
        };

        let result = assembler.assemble(block);
        assert_eq!(result.heading_level(), Some(2));
        assert_eq!(result.page(), Some(3));
    }
}
