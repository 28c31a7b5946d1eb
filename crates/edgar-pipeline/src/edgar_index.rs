//! Parses the EDGAR filing-index JSON body into a member-document list.
//!
//! `edgar-fetcher::index` only builds the index-JSON URL and filters an
//! already-parsed filename list (C2's documented scope); nothing in the
//! retrieval pack's ported code deserializes the response body itself. This
//! follows the teacher's `CompanySubmissionsResponse` pattern in
//! `econ-graph-sec-crawler::crawler` (a typed `Deserialize` struct handed to
//! `response.json::<T>()`), generalized to EDGAR's `directory.item` shape.

use edgar_core::error::{EdgarError, EdgarResult};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct IndexResponse {
    directory: IndexDirectory,
}

#[derive(Debug, Deserialize)]
struct IndexDirectory {
    item: Vec<IndexItem>,
}

#[derive(Debug, Deserialize)]
struct IndexItem {
    name: String,
    /// EDGAR serializes this as a decimal string, not a JSON number.
    #[serde(default)]
    size: Option<String>,
}

/// One filing's member document: name and byte size (0 when EDGAR omits it,
/// which happens for a handful of legacy filings).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDocument {
    pub name: String,
    pub size: u64,
}

/// Parses an `index.json` response body into its member-document list, in
/// the order EDGAR returned them.
pub fn parse_index_json(body: &[u8]) -> EdgarResult<Vec<IndexDocument>> {
    let parsed: IndexResponse = serde_json::from_slice(body).map_err(EdgarError::Json)?;
    Ok(parsed
        .directory
        .item
        .into_iter()
        .map(|item| {
            let size = item.size.and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);
            IndexDocument { name: item.name, size }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_directory_items_into_name_size_pairs() {
        let body = br#"{
            "directory": {
                "item": [
                    {"name": "aapl-20230930.htm", "type": "10-K", "size": "512000", "last-modified": "2023-11-03"},
                    {"name": "aapl-20230930.xml", "type": "EX-101.INS", "size": "780000"},
                    {"name": "FilingSummary.xml", "type": "", "size": "9000"}
                ],
                "name": "/Archives/edgar/data/320193/000032019323000106",
                "parent-dir": "/Archives/edgar/data/320193"
            }
        }"#;
        let docs = parse_index_json(body).unwrap();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].name, "aapl-20230930.htm");
        assert_eq!(docs[0].size, 512_000);
    }

    #[test]
    fn missing_size_defaults_to_zero() {
        let body = br#"{"directory":{"item":[{"name":"R1.htm","type":"EX-101.SCH"}],"name":"x","parent-dir":"y"}}"#;
        let docs = parse_index_json(body).unwrap();
        assert_eq!(docs[0].size, 0);
    }

    #[test]
    fn rejects_malformed_body() {
        assert!(parse_index_json(b"not json").is_err());
    }
}
