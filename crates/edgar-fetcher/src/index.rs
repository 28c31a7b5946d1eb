//! Filing-index resolver (C2).
//!
//! Ported from the teacher's `build_xbrl_url`/`build_submissions_url` in
//! `utils.rs` (plain free functions deriving EDGAR archive URLs from a
//! CIK/accession pair), generalized to also build the index-JSON URL and to
//! filter the returned document list down to the XBRL-relevant subset
//! spec.md section 4.2 names.

use edgar_core::ids::{AccessionNumber, Cik};

const EXCLUDED_SUBSTRINGS: [&str; 2] = ["_htm.xml", "FilingSummary.xml"];

/// The EDGAR filing-index JSON URL for `(cik, accession)`.
pub fn index_json_url(cik: &Cik, accession: &AccessionNumber) -> String {
    format!(
        "https://www.sec.gov/Archives/edgar/data/{}/{}/index.json",
        cik.unpadded(),
        accession.undashed()
    )
}

/// The URL of one member document of a filing.
pub fn document_url(cik: &Cik, accession: &AccessionNumber, filename: &str) -> String {
    format!(
        "https://www.sec.gov/Archives/edgar/data/{}/{}/{}",
        cik.unpadded(),
        accession.undashed(),
        filename
    )
}

/// From a filing's member-document filename list, keeps only the
/// XBRL-relevant files: names ending in `.xml` or `.xsd` that do not match
/// an excluded substring (linkbase summary files, `FilingSummary.xml`).
/// Order is preserved from the input list.
pub fn select_xbrl_files(filenames: &[String]) -> Vec<String> {
    filenames
        .iter()
        .filter(|name| {
            let lower = name.to_lowercase();
            let has_relevant_ext = lower.ends_with(".xml") || lower.ends_with(".xsd");
            let excluded = EXCLUDED_SUBSTRINGS
                .iter()
                .any(|substr| name.contains(substr));
            has_relevant_ext && !excluded
        })
        .cloned()
        .collect()
}

/// Selects the primary HTML document among a filing's member files: the
/// largest `.htm` file whose name does not start with `ex` (exhibits are
/// excluded), per spec.md section 4.3.
pub fn select_primary_html_document(files: &[(String, u64)]) -> Option<String> {
    files
        .iter()
        .filter(|(name, _)| {
            let lower = name.to_lowercase();
            lower.ends_with(".htm") && !lower.starts_with("ex")
        })
        .max_by_key(|(_, size)| *size)
        .map(|(name, _)| name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_json_url_uses_unpadded_cik_and_undashed_accession() {
        let cik = Cik::parse("320193").unwrap();
        let accession = AccessionNumber::parse("0000320193-24-000001").unwrap();
        assert_eq!(
            index_json_url(&cik, &accession),
            "https://www.sec.gov/Archives/edgar/data/320193/000032019324000001/index.json"
        );
    }

    #[test]
    fn select_xbrl_files_excludes_summaries_and_htm_companions() {
        let files = vec![
            "aapl-20230930.xml".to_string(),
            "aapl-20230930.xsd".to_string(),
            "aapl-20230930_htm.xml".to_string(),
            "FilingSummary.xml".to_string(),
            "R1.htm".to_string(),
        ];
        let selected = select_xbrl_files(&files);
        assert_eq!(
            selected,
            vec!["aapl-20230930.xml".to_string(), "aapl-20230930.xsd".to_string()]
        );
    }

    #[test]
    fn select_primary_html_document_picks_largest_non_exhibit() {
        let files = vec![
            ("aapl-20230930.htm".to_string(), 500_000),
            ("ex-10.htm".to_string(), 900_000),
            ("ex10-1.htm".to_string(), 1_000_000),
        ];
        assert_eq!(
            select_primary_html_document(&files),
            Some("aapl-20230930.htm".to_string())
        );
    }
}
