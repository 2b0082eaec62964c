//! Header and footer classification.
//!
//! Scans the document-wide top and bottom margin bands for recurring text
//! and page-number patterns. Band content that does not recur (a one-off
//! footnote) is left in the body stream.

use std::collections::HashMap;

use regex::Regex;
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

use crate::config::{ConversionConfig, HeaderFooterMode};
use crate::model::{BandSide, MarginBand, PageSpans, Span};

/// What the classifier found and removed.
#[derive(Debug, Clone, Default)]
pub struct BandSummary {
    /// Representative header text for `convert` mode.
    pub header_text: Option<String>,
    /// Representative footer text for `convert` mode.
    pub footer_text: Option<String>,
    /// Pages on which header content was classified.
    pub headers_detected: u32,
    /// Pages on which footer content was classified.
    pub footers_detected: u32,
}

/// Classification of a single band span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpanVerdict {
    Body,
    Recurring,
    PageNumber,
}

/// Document-wide header/footer classifier.
pub struct HeaderFooterClassifier<'a> {
    config: &'a ConversionConfig,
}

impl<'a> HeaderFooterClassifier<'a> {
    /// Create a classifier over one run's config.
    pub fn new(config: &'a ConversionConfig) -> Self {
        Self { config }
    }

    /// Classify both bands and apply the configured policy, removing
    /// classified spans from the pages in place.
    pub fn classify(&self, pages: &mut [PageSpans]) -> BandSummary {
        let mut summary = BandSummary::default();

        let (text, count) = self.classify_band(
            pages,
            MarginBand::new(BandSide::Top, self.config.header_margin),
            self.config.header_mode,
        );
        summary.header_text = text;
        summary.headers_detected = count;

        let (text, count) = self.classify_band(
            pages,
            MarginBand::new(BandSide::Bottom, self.config.footer_margin),
            self.config.footer_mode,
        );
        summary.footer_text = text;
        summary.footers_detected = count;

        summary
    }

    /// Classify one band. Returns the representative text (for `convert`)
    /// and the number of pages with classified content.
    fn classify_band(
        &self,
        pages: &mut [PageSpans],
        band: MarginBand,
        mode: HeaderFooterMode,
    ) -> (Option<String>, u32) {
        if mode == HeaderFooterMode::Keep || pages.is_empty() {
            return (None, 0);
        }

        let page_total = pages.len();

        // First pass: count, per normalized text, the distinct pages it
        // appears on inside the band.
        let mut page_hits: HashMap<String, Vec<u32>> = HashMap::new();
        for page in pages.iter() {
            for span in page.spans.iter().filter(|s| band.contains(s, page.height)) {
                let key = normalize_recurring(&span.text);
                if key.is_empty() {
                    continue;
                }
                let hits = page_hits.entry(key).or_default();
                if hits.last() != Some(&page.number) {
                    hits.push(page.number);
                }
            }
        }

        let recurs = |text: &str| -> bool {
            page_hits
                .get(&normalize_recurring(text))
                .map(|hits| hits.len() >= 2 && hits.len() * 2 > page_total)
                .unwrap_or(false)
        };

        // Second pass: apply verdicts and strip classified spans.
        let mut raw_counts: HashMap<String, usize> = HashMap::new();
        let mut pages_hit = 0u32;

        for page in pages.iter_mut() {
            let height = page.height;
            let mut hit = false;

            page.spans.retain(|span| {
                if !band.contains(span, height) {
                    return true;
                }
                let verdict = classify_span(span, &recurs);
                match verdict {
                    SpanVerdict::Body => true,
                    SpanVerdict::PageNumber => {
                        hit = true;
                        false
                    }
                    SpanVerdict::Recurring => {
                        hit = true;
                        let raw = collapse_whitespace(&span.text);
                        *raw_counts.entry(raw).or_insert(0) += 1;
                        false
                    }
                }
            });

            if hit {
                pages_hit += 1;
            }
        }

        let representative = if mode == HeaderFooterMode::Convert {
            raw_counts
                .into_iter()
                .max_by_key(|(_, count)| *count)
                .map(|(text, _)| text)
        } else {
            None
        };

        if pages_hit > 0 {
            log::debug!(
                "{:?} band: {} pages classified",
                band.side,
                pages_hit
            );
        }

        (representative, pages_hit)
    }
}

/// Classify a single band span. Page-number classification wins over
/// recurring text: it is the more specific predicate.
fn classify_span(span: &Span, recurs: &dyn Fn(&str) -> bool) -> SpanVerdict {
    if is_page_number(&span.text) {
        return SpanVerdict::PageNumber;
    }
    if recurs(&span.text) {
        return SpanVerdict::Recurring;
    }
    SpanVerdict::Body
}

fn page_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?ix)^\s*(?:
                [-–—]*\s*\d{1,4}\s*[-–—]*          # 3, - 3 -
                | [ivxlcdm]{1,8}                    # iv, xii
                | [A-Za-z]                          # A, b
                | page\s+(?:\d{1,4}|[ivxlcdm]{1,8})(?:\s+of\s+\d{1,4})?
            )\s*$",
        )
        .expect("page number pattern")
    })
}

/// Whether a text token looks like a page number: arabic digits, roman
/// numerals, letter sequences, or literal "Page X [of Y]".
pub fn is_page_number(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty() && page_number_re().is_match(trimmed)
}

fn num_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+|\b[ivx]{1,4}\b").expect("num token pattern"))
}

/// Normalize band text for recurrence comparison: NFKC fold, replace
/// page-number-like tokens with a placeholder, collapse whitespace.
pub fn normalize_recurring(text: &str) -> String {
    let folded: String = text.nfkc().collect();
    let replaced = num_token_re().replace_all(&folded, "{NUM}");
    collapse_whitespace(&replaced)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
