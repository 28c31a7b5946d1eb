//! Regex tables for Tier 2 of the segmenter, ported pattern-for-pattern from
//! the original `SectionExtractor.STANDARD_PATTERNS` /
//! `NONSTANDARD_PATTERNS` / `ALL_ITEM_PATTERNS`. Items 3-6 did not carry a
//! dedicated pattern in the original (they are short boilerplate items the
//! original system did not chunk), so they get the same bare `ITEM N[.\s]`
//! pattern the original already uses for items like `ITEM 2` and `ITEM 12`,
//! keeping the table total across `ITEM 1`..`ITEM 16`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Canonical item tags in document order, `ITEM 1` through `ITEM 16`.
pub const ITEM_ORDER: &[&str] = &[
    "ITEM 1", "ITEM 1A", "ITEM 1B", "ITEM 1C", "ITEM 2", "ITEM 3", "ITEM 4", "ITEM 5", "ITEM 6",
    "ITEM 7", "ITEM 7A", "ITEM 8", "ITEM 9", "ITEM 9A", "ITEM 9B", "ITEM 9C", "ITEM 10",
    "ITEM 11", "ITEM 12", "ITEM 13", "ITEM 14", "ITEM 15", "ITEM 16",
];

/// Part III items that are routinely "incorporated by reference" to the
/// annual proxy statement rather than written out in the 10-K body.
pub const PEOPLE_ITEMS: &[&str] = &["ITEM 10", "ITEM 11", "ITEM 12", "ITEM 13"];

fn generic_item_pattern(number: &str) -> Regex {
    Regex::new(&format!(r"(?im)^\s*ITEM\s+{number}[\.\s]")).unwrap()
}

pub static STANDARD_PATTERNS: Lazy<HashMap<&'static str, Vec<Regex>>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, Vec<Regex>> = HashMap::new();
    m.insert(
        "ITEM 1",
        vec![
            Regex::new(r"(?im)^\s*ITEM\s+1[\.\s]+Business").unwrap(),
            Regex::new(r"(?im)^\s*ITEM\s+1[\.\s]*$").unwrap(),
        ],
    );
    m.insert(
        "ITEM 1A",
        vec![
            Regex::new(r"(?im)^\s*ITEM\s+1A[\.\s]+Risk\s+Factors").unwrap(),
            Regex::new(r"(?im)^\s*ITEM\s+1A[\.\s]*$").unwrap(),
        ],
    );
    m.insert("ITEM 1B", vec![generic_item_pattern("1B")]);
    m.insert("ITEM 1C", vec![generic_item_pattern("1C")]);
    m.insert("ITEM 2", vec![generic_item_pattern("2")]);
    m.insert("ITEM 3", vec![generic_item_pattern("3")]);
    m.insert("ITEM 4", vec![generic_item_pattern("4")]);
    m.insert("ITEM 5", vec![generic_item_pattern("5")]);
    m.insert("ITEM 6", vec![generic_item_pattern("6")]);
    m.insert(
        "ITEM 7",
        vec![
            Regex::new(r"(?im)^\s*ITEM\s+7[\.\s]+Management").unwrap(),
            Regex::new(r"(?im)^\s*ITEM\s+7[\.\s]*$").unwrap(),
        ],
    );
    m.insert("ITEM 7A", vec![generic_item_pattern("7A")]);
    m.insert("ITEM 8", vec![generic_item_pattern("8")]);
    m.insert(
        "ITEM 9",
        vec![
            Regex::new(r"(?im)^\s*ITEM\s+9[\.\s]+Changes").unwrap(),
            Regex::new(r"(?im)^\s*ITEM\s+9[\.\s]*$").unwrap(),
        ],
    );
    m.insert("ITEM 9A", vec![generic_item_pattern("9A")]);
    m.insert("ITEM 9B", vec![generic_item_pattern("9B")]);
    m.insert("ITEM 9C", vec![generic_item_pattern("9C")]);
    m.insert(
        "ITEM 10",
        vec![
            Regex::new(r"(?im)^\s*ITEM\s+10[\.\s]+Directors").unwrap(),
            Regex::new(r"(?im)^\s*ITEM\s+10[\.\s]*$").unwrap(),
        ],
    );
    m.insert(
        "ITEM 11",
        vec![
            Regex::new(r"(?im)^\s*ITEM\s+11[\.\s]+Executive\s+Compensation").unwrap(),
            Regex::new(r"(?im)^\s*ITEM\s+11[\.\s]*").unwrap(),
        ],
    );
    m.insert("ITEM 12", vec![generic_item_pattern("12")]);
    m.insert("ITEM 13", vec![generic_item_pattern("13")]);
    m.insert("ITEM 14", vec![generic_item_pattern("14")]);
    m.insert("ITEM 15", vec![generic_item_pattern("15")]);
    m.insert("ITEM 16", vec![generic_item_pattern("16")]);
    m
});

pub static NONSTANDARD_PATTERNS: Lazy<HashMap<&'static str, Vec<Regex>>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, Vec<Regex>> = HashMap::new();
    m.insert(
        "ITEM 1",
        vec![
            Regex::new(r"(?im)^\s*#+\s*Overview\s*$").unwrap(),
            Regex::new(r"(?im)^\s*#+\s*Our\s+Business\s*$").unwrap(),
        ],
    );
    m.insert(
        "ITEM 1A",
        vec![Regex::new(r"(?im)^\s*#+\s*Risk\s+Factors\s*$").unwrap()],
    );
    m.insert(
        "ITEM 7",
        vec![Regex::new(r"(?im)^\s*#+\s*Management.*Discussion\s+and\s+Analysis").unwrap()],
    );
    m.insert(
        "ITEM 10",
        vec![
            Regex::new(r"(?im)^\s*#+\s*Information\s+About.*Executive\s+Officers").unwrap(),
            Regex::new(r"(?im)^\s*#+\s*Executive\s+Officers").unwrap(),
            Regex::new(r"(?im)^\s*#+\s*Directors.*Executive\s+Officers").unwrap(),
        ],
    );
    m.insert(
        "ITEM 11",
        vec![Regex::new(r"(?im)^\s*#+\s*Executive\s+Compensation\s*$").unwrap()],
    );
    m
});

pub static ALL_ITEM_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?im)^\s*ITEM\s+\d+[A-C]?[\.\s]").unwrap(),
        Regex::new(r"(?im)^\s*#+\s*(?:Overview|Risk Factors|Management|Executive|Information About)")
            .unwrap(),
    ]
});

/// Finds the nearest match of any item/heading pattern at or after
/// `start_byte`, returning its start offset. `None` means no further
/// boundary exists (caller should take the rest of the document).
pub fn find_next_section_boundary(markdown: &str, start_byte: usize) -> Option<usize> {
    ALL_ITEM_PATTERNS
        .iter()
        .filter_map(|pattern| pattern.find_at(markdown, start_byte).map(|m| m.start()))
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_patterns_cover_every_item_in_order() {
        for item in ITEM_ORDER {
            assert!(
                STANDARD_PATTERNS.contains_key(item),
                "missing standard pattern for {item}"
            );
        }
    }

    #[test]
    fn boundary_finder_picks_the_nearest_match() {
        let markdown = "ITEM 1. Business\nsome text\nITEM 1A. Risk Factors\nmore text";
        let boundary = find_next_section_boundary(markdown, 17).unwrap();
        assert!(markdown[boundary..].starts_with("ITEM 1A"));
    }
}
