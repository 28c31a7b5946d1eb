//! Concept-to-metric normalization, ported from the original
//! `ConceptMapper.normalize_filing`: priority-ordered mapping rules grouped
//! by metric, each tried in order until one yields a value.

use bigdecimal::BigDecimal;
use chrono::Datelike;
use edgar_core::models::{ConceptMapping, Fact, NormalizedMetric};
use edgar_core::EdgarResult;
use edgar_store::Store;
use std::collections::HashMap;

pub struct ConceptMapper {
    mappings_by_metric: HashMap<String, Vec<ConceptMapping>>,
}

impl ConceptMapper {
    /// Loads every concept mapping from the store, grouped by metric and
    /// sorted by ascending priority (priority 1 tried first).
    pub fn load(store: &Store) -> EdgarResult<Self> {
        let mut by_metric: HashMap<String, Vec<ConceptMapping>> = HashMap::new();
        for mapping in store.all_concept_mappings()? {
            by_metric
                .entry(mapping.metric_id.clone())
                .or_default()
                .push(mapping);
        }
        for rules in by_metric.values_mut() {
            rules.sort_by_key(|r| r.priority);
        }
        Ok(ConceptMapper {
            mappings_by_metric: by_metric,
        })
    }

    pub fn reload(&mut self, store: &Store) -> EdgarResult<()> {
        *self = Self::load(store)?;
        Ok(())
    }

    /// Normalizes one filing's facts into standardized metrics and writes
    /// each result back to the store through the monotone-by-confidence
    /// upsert. Returns the metrics that were written.
    pub fn normalize_filing(
        &self,
        store: &Store,
        accession_number: &str,
        ticker: &str,
        company_industry: Option<&str>,
    ) -> EdgarResult<Vec<NormalizedMetric>> {
        let facts = store.facts_for_filing(accession_number)?;
        if facts.is_empty() {
            tracing::warn!(accession_number, "no facts found for filing, skipping normalization");
            return Ok(Vec::new());
        }

        let fiscal_year = match extract_fiscal_year(&facts) {
            Some(year) => year,
            None => {
                tracing::warn!(accession_number, "could not determine fiscal year");
                return Ok(Vec::new());
            }
        };

        let facts_by_concept = build_facts_lookup(&facts);
        let mut normalized = Vec::new();

        for (metric_id, rules) in &self.mappings_by_metric {
            let applicable = rules.iter().filter(|r| {
                r.applies_to_industry.is_none()
                    || r.applies_to_industry.as_deref() == company_industry
            });

            for rule in applicable {
                if let Some(value) = find_value(&facts_by_concept, &rule.concept_name) {
                    let metric = NormalizedMetric {
                        ticker: ticker.to_string(),
                        fiscal_year,
                        fiscal_quarter: None,
                        metric_id: metric_id.clone(),
                        value,
                        source_concept: rule.concept_name.clone(),
                        source_accession: accession_number.to_string(),
                        confidence_score: rule.confidence_score,
                        created_at: None,
                    };
                    store.upsert_normalized_metric(&metric)?;
                    normalized.push(metric);
                    break;
                }
            }
        }

        tracing::info!(accession_number, count = normalized.len(), "normalized metrics");
        Ok(normalized)
    }
}

fn build_facts_lookup(facts: &[Fact]) -> HashMap<&str, Vec<&Fact>> {
    let mut lookup: HashMap<&str, Vec<&Fact>> = HashMap::new();
    for fact in facts {
        lookup.entry(fact.concept_name.as_str()).or_default().push(fact);
    }
    lookup
}

/// Prefers consolidated facts (no dimensional slice), falling back to all
/// facts under the concept if none are consolidated; keeps numeric facts
/// only and takes the one with the latest `period_end`.
fn find_value(facts_by_concept: &HashMap<&str, Vec<&Fact>>, concept_name: &str) -> Option<BigDecimal> {
    let facts = facts_by_concept.get(concept_name)?;

    let consolidated: Vec<&&Fact> = facts.iter().filter(|f| f.is_consolidated()).collect();
    let pool: Vec<&&Fact> = if consolidated.is_empty() {
        facts.iter().collect()
    } else {
        consolidated
    };

    let mut numeric: Vec<&&Fact> = pool.into_iter().filter(|f| f.value.is_some()).collect();
    numeric.sort_by(|a, b| b.period_end.cmp(&a.period_end));

    numeric.first().and_then(|f| f.value.clone())
}

fn extract_fiscal_year(facts: &[Fact]) -> Option<i32> {
    facts.iter().filter_map(|f| f.period_end).max().map(|d| d.year())
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgar_core::models::PeriodType;
    use edgar_store::Store;
    use std::str::FromStr;

    fn sample_fact(concept: &str, value: i64, period_end: &str, dimensions: Option<Vec<(String, String)>>) -> Fact {
        Fact {
            accession_number: "0000320193-24-000001".to_string(),
            concept_name: concept.to_string(),
            value: Some(BigDecimal::from(value)),
            value_text: None,
            unit: Some("USD".to_string()),
            decimals: Some(-6),
            period_type: PeriodType::Duration,
            period_start: None,
            period_end: Some(chrono::NaiveDate::from_str(period_end).unwrap()),
            dimensions,
            is_custom: false,
            is_negated: false,
            parent_concept: None,
            depth: None,
            label: None,
        }
    }

    #[test]
    fn prefers_consolidated_over_segmented_facts() {
        let facts = vec![
            sample_fact(
                "us-gaap:Revenues",
                100,
                "2024-12-31",
                Some(vec![("SegmentAxis".into(), "SegmentA".into())]),
            ),
            sample_fact("us-gaap:Revenues", 500, "2024-12-31", None),
        ];
        let lookup = build_facts_lookup(&facts);
        let value = find_value(&lookup, "us-gaap:Revenues").unwrap();
        assert_eq!(value, BigDecimal::from(500));
    }

    #[test]
    fn falls_back_to_any_fact_when_none_consolidated() {
        let facts = vec![sample_fact(
            "us-gaap:Revenues",
            100,
            "2024-12-31",
            Some(vec![("SegmentAxis".into(), "SegmentA".into())]),
        )];
        let lookup = build_facts_lookup(&facts);
        let value = find_value(&lookup, "us-gaap:Revenues").unwrap();
        assert_eq!(value, BigDecimal::from(100));
    }

    #[test]
    fn picks_the_latest_period_end() {
        let facts = vec![
            sample_fact("us-gaap:Assets", 100, "2023-12-31", None),
            sample_fact("us-gaap:Assets", 200, "2024-12-31", None),
        ];
        let lookup = build_facts_lookup(&facts);
        let value = find_value(&lookup, "us-gaap:Assets").unwrap();
        assert_eq!(value, BigDecimal::from(200));
    }

    #[test]
    fn normalize_filing_applies_priority_fallback_and_writes_to_store() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_concept_mapping(&ConceptMapping {
                metric_id: "total_assets".to_string(),
                concept_name: "us-gaap:AssetsPreferred".to_string(),
                priority: 1,
                confidence_score: 0.95,
                applies_to_industry: None,
            })
            .unwrap();
        store
            .insert_concept_mapping(&ConceptMapping {
                metric_id: "total_assets".to_string(),
                concept_name: "us-gaap:Assets".to_string(),
                priority: 2,
                confidence_score: 0.8,
                applies_to_industry: None,
            })
            .unwrap();

        store
            .upsert_company("0000320193", "Acme Corp", Some("ACME"), None, None)
            .unwrap();
        store
            .upsert_filing(&edgar_core::models::Filing {
                accession_number: "0000320193-24-000001".to_string(),
                cik: "0000320193".to_string(),
                form_type: "10-K".to_string(),
                filing_date: chrono::NaiveDate::from_str("2025-01-15").unwrap(),
                period_of_report: Some(chrono::NaiveDate::from_str("2024-12-31").unwrap()),
                acceptance_datetime: None,
                has_xbrl: true,
                local_storage_path: None,
                download_status: "complete".to_string(),
                xbrl_processed: false,
                sections_processed: false,
                full_markdown: None,
                word_count: None,
                updated_at: None,
            })
            .unwrap();
        store
            .insert_fact_if_absent(&sample_fact("us-gaap:Assets", 900, "2024-12-31", None))
            .unwrap();

        let mapper = ConceptMapper::load(&store).unwrap();
        let normalized = mapper
            .normalize_filing(&store, "0000320193-24-000001", "ACME", None)
            .unwrap();

        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].source_concept, "us-gaap:Assets");
        assert_eq!(normalized[0].value, BigDecimal::from(900));

        let stored = store
            .normalized_metric("ACME", 2024, None, "total_assets")
            .unwrap();
        assert!(stored.is_some());
    }
}
