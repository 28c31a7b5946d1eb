//! Ported from the teacher's one-line `html_to_markdown_rs::convert` call in
//! `r007-edgarkit/examples/investment-adviser/src/main.rs` (the only
//! HTML->Markdown crate usage anywhere in the retrieval pack), wrapped here
//! the way the teacher wraps an external conversion step in
//! `xbrl_parser.rs`'s `XbrlParser` struct: pre-processing (SGML-wrapper
//! stripping, page segmentation) before the library call, post-processing
//! (provenance header, quality signal) after it.

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// Outcome of converting one filing's primary document.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionReport {
    /// The provenance-header-prefixed Markdown, pages joined by `"\n\n"`.
    pub markdown: String,
    /// The ordered page list the Markdown was assembled from.
    pub pages: Vec<String>,
    pub word_count: u64,
    /// `word_count / 50_000`, clamped to `[0, 100]`, per spec.md section 4.3.
    pub quality_score: f64,
}

fn sgml_type_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?is)<TYPE>\s*10-K").unwrap())
}

fn sgml_text_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?is)<TEXT>(.*?)</TEXT>").unwrap())
}

/// SEC EDGAR sometimes wraps the primary document in SGML header blocks
/// (`<TYPE>10-K ... <TEXT>...</TEXT>`). When present, strips to the inner
/// `<TEXT>` content; otherwise returns the input unchanged.
fn strip_sgml_wrapper(raw: &str) -> &str {
    if !sgml_type_pattern().is_match(raw) {
        return raw;
    }
    match sgml_text_pattern().captures(raw) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(raw),
        None => raw,
    }
}

fn page_break_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?is)<hr[^>]*>|\x0c").unwrap())
}

/// Splits the stripped HTML into an ordered page list on explicit
/// page-break markers (`<hr>` rules or form-feed characters), falling back
/// to the whole document as a single page when no marker is present.
fn split_into_pages(html: &str) -> Vec<String> {
    let pages: Vec<String> = page_break_pattern()
        .split(html)
        .map(|s| s.to_string())
        .filter(|s| !s.trim().is_empty())
        .collect();
    if pages.is_empty() {
        vec![html.to_string()]
    } else {
        pages
    }
}

/// Converts one filing's primary HTML document to Markdown, preserving
/// tables in pipe-markdown form, and prepends the two-line provenance
/// header spec.md section 4.3 specifies.
pub fn convert_filing_document(raw_html: &str, ticker: &str, accession: &str) -> ConversionReport {
    let stripped = strip_sgml_wrapper(raw_html);
    let pages = split_into_pages(stripped);

    let converted_pages: Vec<String> = pages
        .iter()
        .map(|page| html_to_markdown_rs::convert(page, None).unwrap_or_else(|| page.clone()))
        .collect();

    let body = converted_pages.join("\n\n");
    let header = format!("<!-- DOCUMENT: {ticker} 10-K -->\n<!-- ACCESSION: {accession} -->");
    let markdown = format!("{header}\n\n{body}");

    let word_count = body.split_whitespace().count() as u64;
    let quality_score = (word_count as f64 / 50_000.0).clamp(0.0, 100.0);
    debug!(
        accession,
        ticker, word_count, quality_score, "converted filing document to markdown"
    );

    ConversionReport {
        markdown,
        pages: converted_pages,
        word_count,
        quality_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_sgml_wrapper_to_inner_text() {
        let raw = "<SEC-DOCUMENT>\n<TYPE>10-K\n<SEQUENCE>1\n<TEXT>\n<html><body><p>Hello</p></body></html>\n</TEXT>\n</SEC-DOCUMENT>";
        let stripped = strip_sgml_wrapper(raw);
        assert!(stripped.contains("<p>Hello</p>"));
        assert!(!stripped.contains("<SEC-DOCUMENT>"));
    }

    #[test]
    fn passes_through_plain_html_unchanged() {
        let raw = "<html><body><p>No wrapper here</p></body></html>";
        assert_eq!(strip_sgml_wrapper(raw), raw);
    }

    #[test]
    fn splits_on_horizontal_rule_page_breaks() {
        let html = "<p>Page one</p><hr><p>Page two</p>";
        let pages = split_into_pages(html);
        assert_eq!(pages.len(), 2);
    }

    #[test]
    fn prepends_provenance_header_and_computes_quality_score() {
        let report = convert_filing_document(
            "<p>Hello world</p>",
            "AAPL",
            "0000320193-24-000001",
        );
        assert!(report.markdown.starts_with("<!-- DOCUMENT: AAPL 10-K -->"));
        assert!(report.markdown.contains("<!-- ACCESSION: 0000320193-24-000001 -->"));
        assert!(report.quality_score >= 0.0 && report.quality_score <= 100.0);
    }

    #[test]
    fn quality_score_is_clamped_at_one_hundred() {
        let huge_body = "word ".repeat(200_000);
        let report = convert_filing_document(&huge_body, "AAPL", "0000320193-24-000001");
        assert_eq!(report.quality_score, 100.0);
    }
}
