//! Greedy merge-with-overlap chunk assembly, per spec.md section 4.10.

use crate::block::{estimate_tokens, split_into_blocks, Block};
use chrono::NaiveDate;
use edgar_core::config::ChunkerConfig;
use edgar_core::models::Chunk;
use tracing::debug;

/// Partitions one section's markdown into token-bounded, table-safe,
/// context-prefixed chunks.
pub fn chunk_section(
    config: &ChunkerConfig,
    accession_number: &str,
    item: &str,
    ticker: &str,
    filing_date: NaiveDate,
    section_markdown: &str,
) -> Vec<Chunk> {
    let blocks = split_into_blocks(section_markdown);
    let groups = greedy_merge(config, &blocks);
    debug!(
        accession_number,
        item,
        block_count = blocks.len(),
        chunk_count = groups.len(),
        "chunked section"
    );

    let item_key = item.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_uppercase();
    let context_prefix = format!(
        "Company: {ticker} | Filing: 10-K {} | Section: {item}",
        filing_date.format("%Y-%m-%d")
    );

    groups
        .into_iter()
        .enumerate()
        .map(|(index, group)| {
            let text = group
                .iter()
                .map(|b| b.text.as_str())
                .collect::<Vec<_>>()
                .join("\n\n");
            let token_count = estimate_tokens(&text, config.tokens_per_word);
            let contains_table = group.iter().any(|b| b.is_table);

            Chunk {
                chunk_id: Chunk::make_chunk_id(accession_number, &item_key, index as u32),
                accession_number: accession_number.to_string(),
                section_type: item.to_string(),
                chunk_index: index as i32,
                context_prefix: context_prefix.clone(),
                text,
                token_count,
                contains_table,
            }
        })
        .collect()
}

fn group_tokens(group: &[Block], tokens_per_word: f64) -> i64 {
    group.iter().map(|b| estimate_tokens(&b.text, tokens_per_word)).sum()
}

/// Greedy merge with carry-over overlap, per spec.md section 4.10 step 2.
fn greedy_merge(config: &ChunkerConfig, blocks: &[Block]) -> Vec<Vec<Block>> {
    let mut chunks: Vec<Vec<Block>> = Vec::new();
    let mut accumulator: Vec<Block> = Vec::new();

    for block in blocks {
        if block.is_table {
            let table_tokens = estimate_tokens(&block.text, config.tokens_per_word);
            if table_tokens > config.max_tokens as i64 {
                if !accumulator.is_empty() {
                    chunks.push(std::mem::take(&mut accumulator));
                }
                chunks.push(vec![block.clone()]);
                continue;
            }
        }

        let candidate_tokens = group_tokens(&accumulator, config.tokens_per_word)
            + estimate_tokens(&block.text, config.tokens_per_word);

        if candidate_tokens > config.max_tokens as i64 && !accumulator.is_empty() {
            let emitted = std::mem::take(&mut accumulator);
            accumulator = carry_over_overlap(&emitted, config);
            chunks.push(emitted);
        }

        accumulator.push(block.clone());
    }

    if !accumulator.is_empty() {
        let has_table = accumulator.iter().any(|b| b.is_table);
        let tokens = group_tokens(&accumulator, config.tokens_per_word);
        if has_table || tokens >= config.min_tokens as i64 {
            chunks.push(accumulator);
        }
    }

    chunks
}

/// Trailing non-table paragraphs from the just-emitted chunk whose combined
/// token estimate stays within the overlap budget, iterating from the end
/// and stopping at a table block or the budget.
fn carry_over_overlap(emitted: &[Block], config: &ChunkerConfig) -> Vec<Block> {
    let mut overlap = Vec::new();
    let mut overlap_tokens = 0i64;

    for block in emitted.iter().rev() {
        if block.is_table {
            break;
        }
        let tokens = estimate_tokens(&block.text, config.tokens_per_word);
        if overlap_tokens + tokens > config.overlap_tokens as i64 {
            break;
        }
        overlap_tokens += tokens;
        overlap.insert(0, block.clone());
    }

    overlap
}
