//! Splits section markdown into table and paragraph blocks, per spec.md
//! section 4.10's block-splitting step. Grounded in the original
//! `SemanticChunker`'s table/list/number regex heuristics (`chunker.py`),
//! though the block model here is flat rather than the original's
//! three-level hierarchy.

use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub text: String,
    pub is_table: bool,
}

static TABLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<table.*?</table>").unwrap());
static BLANK_LINE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Splits markdown into an ordered block list: `<table>` regions are
/// atomic blocks, material between them is split on blank-line paragraph
/// separators.
pub fn split_into_blocks(markdown: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut cursor = 0;

    for table_match in TABLE_PATTERN.find_iter(markdown) {
        if table_match.start() > cursor {
            let between = &markdown[cursor..table_match.start()];
            blocks.extend(split_paragraphs(between));
        }
        blocks.push(Block {
            text: table_match.as_str().trim().to_string(),
            is_table: true,
        });
        cursor = table_match.end();
    }

    if cursor < markdown.len() {
        blocks.extend(split_paragraphs(&markdown[cursor..]));
    }

    blocks
}

fn split_paragraphs(text: &str) -> Vec<Block> {
    BLANK_LINE_PATTERN
        .split(text)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| Block {
            text: s.to_string(),
            is_table: false,
        })
        .collect()
}

/// `floor(word_count * tokens_per_word)`, per spec.md section 4.10.
pub fn estimate_tokens(text: &str, tokens_per_word: f64) -> i64 {
    let word_count = text.split_whitespace().count();
    (word_count as f64 * tokens_per_word).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_paragraphs_and_keeps_tables_atomic() {
        let markdown = "First paragraph.\n\n<table><tr><td>1</td></tr></table>\n\nSecond paragraph.";
        let blocks = split_into_blocks(markdown);
        assert_eq!(blocks.len(), 3);
        assert!(!blocks[0].is_table);
        assert!(blocks[1].is_table);
        assert!(!blocks[2].is_table);
    }

    #[test]
    fn table_spanning_multiple_lines_is_one_block() {
        let markdown = "<table>\n<tr><td>a</td></tr>\n<tr><td>b</td></tr>\n</table>";
        let blocks = split_into_blocks(markdown);
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].is_table);
    }

    #[test]
    fn token_estimate_uses_word_count_times_factor() {
        let tokens = estimate_tokens("one two three four", 1.33);
        assert_eq!(tokens, 5);
    }
}
