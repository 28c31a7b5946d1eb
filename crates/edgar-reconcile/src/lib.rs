//! Duplicate detection and reconciliation engine.
//!
//! Ported from the original `ReconciliationEngine` in
//! `validation/reconciliation.py`: a battery of read-only consistency checks
//! run in sequence, each surfaced issue recorded to the processing log under
//! `ProcessingStage::Reconcile`. `reconcile_filing_counts` (the original's
//! "each company should have ~10 years of 10-Ks" check) has no counterpart
//! here — it encodes an assumption about company coverage this pipeline does
//! not make. `remove_duplicates` is new: the original only reported
//! duplicate groups, this also repairs them.

use bigdecimal::BigDecimal;
use edgar_core::config::ReconcilerConfig;
use edgar_core::error::{EdgarError, EdgarResult};
use edgar_core::models::{Fact, ProcessingLogEntry, ProcessingStage, Severity};
use edgar_store::Store;

/// A single finding from a reconciliation check.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationIssue {
    pub accession_number: Option<String>,
    pub issue_type: String,
    pub severity: Severity,
    pub description: String,
    pub affected_records: i64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReconciliationSummary {
    pub issues: Vec<ReconciliationIssue>,
}

impl ReconciliationSummary {
    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

/// Concepts checked for unexpected negatives, matched by suffix against the
/// fully-qualified concept name (e.g. `us-gaap:Assets`).
const NEGATIVE_SANITY_CONCEPTS: [&str; 3] = [":Assets", ":Revenues", "SharesOutstanding"];
const REQUIRED_SECTIONS: [&str; 3] = ["ITEM 1", "ITEM 1A", "ITEM 7"];

pub struct ReconciliationEngine<'a> {
    store: &'a Store,
    config: ReconcilerConfig,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(store: &'a Store, config: ReconcilerConfig) -> Self {
        ReconciliationEngine { store, config }
    }

    /// Runs every check, appends each surfaced issue to the processing log,
    /// and returns the aggregate summary. A single check's failure does not
    /// stop the rest, mirroring the original's per-check try/except.
    pub fn run_all_checks(&self) -> EdgarResult<ReconciliationSummary> {
        tracing::info!("starting data reconciliation");
        let mut issues = Vec::new();

        issues.extend(self.reconcile_facts_to_filings()?);
        issues.extend(self.reconcile_normalized_to_raw()?);
        issues.extend(self.check_duplicates()?);
        issues.extend(self.check_data_completeness()?);
        issues.extend(self.check_referential_integrity()?);
        issues.extend(self.check_balance_sheet_coherence()?);
        issues.extend(self.check_value_sign_sanity()?);
        issues.extend(self.check_section_completeness()?);

        for issue in &issues {
            self.store.append_processing_log(&ProcessingLogEntry {
                accession_number: issue.accession_number.clone().unwrap_or_default(),
                stage: ProcessingStage::Reconcile,
                severity: issue.severity,
                issue_type: issue.issue_type.clone(),
                description: issue.description.clone(),
                affected_records: issue.affected_records,
                created_at: None,
            })?;
        }

        tracing::info!(count = issues.len(), "reconciliation complete");
        Ok(ReconciliationSummary { issues })
    }

    fn aggregate(
        &self,
        issue_type: &str,
        severity: Severity,
        description: String,
        affected_records: i64,
    ) -> ReconciliationIssue {
        ReconciliationIssue {
            accession_number: None,
            issue_type: issue_type.to_string(),
            severity,
            description,
            affected_records,
        }
    }

    /// Processed filings (`xbrl_processed = 1`) with zero facts.
    fn reconcile_facts_to_filings(&self) -> EdgarResult<Vec<ReconciliationIssue>> {
        let count: i64 = self
            .store
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM (
                    SELECT f.accession_number
                    FROM filings f
                    LEFT JOIN facts fa ON f.accession_number = fa.accession_number
                    WHERE f.xbrl_processed = 1
                    GROUP BY f.accession_number
                    HAVING COUNT(fa.id) = 0
                 )",
                [],
                |row| row.get(0),
            )
            .map_err(EdgarError::Sqlite)?;

        if count == 0 {
            return Ok(Vec::new());
        }
        Ok(vec![self.aggregate(
            "orphaned_filings",
            Severity::Error,
            format!("found {count} processed filings with no facts"),
            count,
        )])
    }

    /// Normalized metrics whose `(source_accession, source_concept)` no
    /// longer resolves to a fact.
    fn reconcile_normalized_to_raw(&self) -> EdgarResult<Vec<ReconciliationIssue>> {
        let count: i64 = self
            .store
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM normalized_financials n
                 WHERE NOT EXISTS (
                    SELECT 1 FROM facts fa
                    WHERE fa.accession_number = n.source_accession
                      AND fa.concept_name = n.source_concept
                 )",
                [],
                |row| row.get(0),
            )
            .map_err(EdgarError::Sqlite)?;

        if count == 0 {
            return Ok(Vec::new());
        }
        Ok(vec![self.aggregate(
            "missing_source_facts",
            Severity::Error,
            format!("found {count} normalized metrics with missing source facts"),
            count,
        )])
    }

    /// Duplicate groups in `facts` and `normalized_financials`. Under this
    /// schema's `UNIQUE` constraints these should always be zero; the check
    /// exists as a drift detector against hand-edited or externally-loaded
    /// rows that bypassed `Store`.
    fn check_duplicates(&self) -> EdgarResult<Vec<ReconciliationIssue>> {
        let mut issues = Vec::new();

        let fact_dupes: i64 = self
            .store
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM (
                    SELECT accession_number, concept_name, period_end, dimensions
                    FROM facts
                    GROUP BY accession_number, concept_name, period_end, dimensions
                    HAVING COUNT(*) > 1
                 )",
                [],
                |row| row.get(0),
            )
            .map_err(EdgarError::Sqlite)?;
        if fact_dupes > 0 {
            issues.push(self.aggregate(
                "duplicate_facts",
                Severity::Warning,
                format!("found {fact_dupes} duplicate fact groups"),
                fact_dupes,
            ));
        }

        let norm_dupes: i64 = self
            .store
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM (
                    SELECT ticker, fiscal_year, fiscal_quarter, metric_id
                    FROM normalized_financials
                    GROUP BY ticker, fiscal_year, fiscal_quarter, metric_id
                    HAVING COUNT(*) > 1
                 )",
                [],
                |row| row.get(0),
            )
            .map_err(EdgarError::Sqlite)?;
        if norm_dupes > 0 {
            issues.push(self.aggregate(
                "duplicate_normalized_metrics",
                Severity::Critical,
                format!("found {norm_dupes} duplicate normalized metric groups"),
                norm_dupes,
            ));
        }

        Ok(issues)
    }

    fn check_data_completeness(&self) -> EdgarResult<Vec<ReconciliationIssue>> {
        let mut issues = Vec::new();

        let missing_storage: i64 = self
            .store
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM filings
                 WHERE local_storage_path IS NULL OR local_storage_path = ''",
                [],
                |row| row.get(0),
            )
            .map_err(EdgarError::Sqlite)?;
        if missing_storage > 0 {
            issues.push(self.aggregate(
                "missing_local_storage_path",
                Severity::Warning,
                format!("found {missing_storage} filings without a stored document"),
                missing_storage,
            ));
        }

        let null_values: i64 = self
            .store
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM facts WHERE value IS NULL AND value_text IS NULL",
                [],
                |row| row.get(0),
            )
            .map_err(EdgarError::Sqlite)?;
        if null_values > 0 {
            issues.push(self.aggregate(
                "null_fact_values",
                Severity::Info,
                format!("found {null_values} facts with null values"),
                null_values,
            ));
        }

        Ok(issues)
    }

    fn check_referential_integrity(&self) -> EdgarResult<Vec<ReconciliationIssue>> {
        let mut issues = Vec::new();

        let orphaned_facts: i64 = self
            .store
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM facts f
                 LEFT JOIN filings fi ON f.accession_number = fi.accession_number
                 WHERE fi.accession_number IS NULL",
                [],
                |row| row.get(0),
            )
            .map_err(EdgarError::Sqlite)?;
        if orphaned_facts > 0 {
            issues.push(self.aggregate(
                "orphaned_facts",
                Severity::Error,
                format!("found {orphaned_facts} facts referencing non-existent filings"),
                orphaned_facts,
            ));
        }

        let orphaned_filings: i64 = self
            .store
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM filings f
                 LEFT JOIN companies c ON f.cik = c.cik
                 WHERE c.cik IS NULL",
                [],
                |row| row.get(0),
            )
            .map_err(EdgarError::Sqlite)?;
        if orphaned_filings > 0 {
            issues.push(self.aggregate(
                "orphaned_filings_no_company",
                Severity::Critical,
                format!("found {orphaned_filings} filings referencing non-existent companies"),
                orphaned_filings,
            ));
        }

        Ok(issues)
    }

    /// `Assets ~= Liabilities + StockholdersEquity`, per filing. A filing
    /// reporting `LiabilitiesAndStockholdersEquity` equal to `Assets` is not
    /// an imbalance even if the two summed components don't line up exactly
    /// (the summed concepts may simply not have been tagged).
    fn check_balance_sheet_coherence(&self) -> EdgarResult<Vec<ReconciliationIssue>> {
        let mut issues = Vec::new();
        for accession in self.processed_accessions()? {
            let facts = self.store.facts_for_filing(&accession)?;
            let assets = latest_consolidated_value(&facts, ":Assets");
            let liabilities_and_equity = latest_consolidated_value(&facts, ":LiabilitiesAndStockholdersEquity");

            let assets = match assets {
                Some(v) => v,
                None => continue,
            };

            if let Some(combined) = liabilities_and_equity {
                if combined == assets {
                    continue;
                }
            }

            let liabilities = latest_consolidated_value(&facts, ":Liabilities");
            let equity = latest_consolidated_value(&facts, ":StockholdersEquity");
            let (liabilities, equity) = match (liabilities, equity) {
                (Some(l), Some(e)) => (l, e),
                _ => continue,
            };

            if assets == BigDecimal::from(0) {
                continue;
            }
            let diff = (&assets - (&liabilities + &equity)).abs();
            let pct = (&diff / &assets) * BigDecimal::from(100);
            let pct_f64: f64 = pct.to_string().parse().unwrap_or(0.0);

            if pct_f64 <= self.config.tolerance_percent {
                continue;
            }
            let severity = if pct_f64 < 5.0 {
                Severity::Warning
            } else {
                Severity::Error
            };
            issues.push(ReconciliationIssue {
                accession_number: Some(accession.clone()),
                issue_type: "balance_sheet_imbalance".to_string(),
                severity,
                description: format!(
                    "accession {accession}: assets vs liabilities+equity mismatch of {pct_f64:.2}%"
                ),
                affected_records: 1,
            });
        }
        Ok(issues)
    }

    /// Unexpected negative values on assets, revenues, and shares-outstanding
    /// concepts that were not explicitly flagged `is_negated`.
    fn check_value_sign_sanity(&self) -> EdgarResult<Vec<ReconciliationIssue>> {
        let mut issues = Vec::new();
        for accession in self.processed_accessions()? {
            let facts = self.store.facts_for_filing(&accession)?;
            let offenders = facts
                .iter()
                .filter(|f| !f.is_negated)
                .filter(|f| NEGATIVE_SANITY_CONCEPTS.iter().any(|c| f.concept_name.contains(c)))
                .filter(|f| matches!(&f.value, Some(v) if *v < BigDecimal::from(0)))
                .count() as i64;

            if offenders > 0 {
                issues.push(ReconciliationIssue {
                    accession_number: Some(accession.clone()),
                    issue_type: "unexpected_negative_value".to_string(),
                    severity: Severity::Warning,
                    description: format!(
                        "accession {accession}: {offenders} unexpected negative values on asset/revenue/shares concepts"
                    ),
                    affected_records: offenders,
                });
            }
        }
        Ok(issues)
    }

    /// Item 1, 1A, and 7 must be present for every segmented filing.
    fn check_section_completeness(&self) -> EdgarResult<Vec<ReconciliationIssue>> {
        let mut issues = Vec::new();
        for accession in self.sections_processed_accessions()? {
            let sections = self.store.sections_for_filing(&accession)?;
            let missing: Vec<&str> = REQUIRED_SECTIONS
                .iter()
                .copied()
                .filter(|item| !sections.iter().any(|s| s.section_type == *item))
                .collect();

            if !missing.is_empty() {
                issues.push(ReconciliationIssue {
                    accession_number: Some(accession.clone()),
                    issue_type: "missing_required_sections".to_string(),
                    severity: Severity::Warning,
                    description: format!(
                        "accession {accession}: missing required sections {}",
                        missing.join(", ")
                    ),
                    affected_records: missing.len() as i64,
                });
            }
        }
        Ok(issues)
    }

    fn processed_accessions(&self) -> EdgarResult<Vec<String>> {
        let mut stmt = self
            .store
            .connection()
            .prepare("SELECT accession_number FROM filings WHERE xbrl_processed = 1")
            .map_err(EdgarError::Sqlite)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(EdgarError::Sqlite)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(EdgarError::Sqlite)?);
        }
        Ok(out)
    }

    fn sections_processed_accessions(&self) -> EdgarResult<Vec<String>> {
        let mut stmt = self
            .store
            .connection()
            .prepare("SELECT accession_number FROM filings WHERE sections_processed = 1")
            .map_err(EdgarError::Sqlite)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(EdgarError::Sqlite)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(EdgarError::Sqlite)?);
        }
        Ok(out)
    }
}

/// Prefers a consolidated fact (no dimensional slice) ending in `suffix`,
/// taking the one with the latest `period_end` among numeric facts.
fn latest_consolidated_value(facts: &[Fact], suffix: &str) -> Option<BigDecimal> {
    let mut matching: Vec<&Fact> = facts
        .iter()
        .filter(|f| f.concept_name.ends_with(suffix) && f.is_consolidated() && f.value.is_some())
        .collect();
    matching.sort_by(|a, b| b.period_end.cmp(&a.period_end));
    matching.first().and_then(|f| f.value.clone())
}

#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateRemovalPlan {
    pub ticker: String,
    pub fiscal_year: i32,
    pub fiscal_quarter: Option<i32>,
    pub metric_id: String,
    pub keeper_id: i64,
    pub removed_ids: Vec<i64>,
}

/// Repairs duplicate groups in `normalized_financials`: for each group keyed
/// by the uniqueness tuple, the keeper is the row with the highest
/// confidence score, tied-break by the most recent `created_at`. In
/// `dry_run` mode the plan is computed and returned without deleting
/// anything; otherwise every removal happens inside one transaction.
pub fn remove_duplicates(store: &mut Store, dry_run: bool) -> EdgarResult<Vec<DuplicateRemovalPlan>> {
    let groups: Vec<(String, i32, Option<i32>, String)> = {
        let mut stmt = store
            .connection()
            .prepare(
                "SELECT ticker, fiscal_year, fiscal_quarter, metric_id
                 FROM normalized_financials
                 GROUP BY ticker, fiscal_year, fiscal_quarter, metric_id
                 HAVING COUNT(*) > 1",
            )
            .map_err(EdgarError::Sqlite)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })
            .map_err(EdgarError::Sqlite)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(EdgarError::Sqlite)?);
        }
        out
    };

    let mut plans = Vec::new();
    for (ticker, fiscal_year, fiscal_quarter, metric_id) in groups {
        let mut stmt = store
            .connection()
            .prepare(
                "SELECT id FROM normalized_financials
                 WHERE ticker = ?1 AND fiscal_year = ?2 AND fiscal_quarter IS ?3 AND metric_id = ?4
                 ORDER BY confidence_score DESC, created_at DESC",
            )
            .map_err(EdgarError::Sqlite)?;
        let ids: Vec<i64> = stmt
            .query_map(
                rusqlite::params![ticker, fiscal_year, fiscal_quarter, metric_id],
                |row| row.get(0),
            )
            .map_err(EdgarError::Sqlite)?
            .collect::<Result<_, _>>()
            .map_err(EdgarError::Sqlite)?;

        if let Some((&keeper_id, removed_ids)) = ids.split_first() {
            if !removed_ids.is_empty() {
                plans.push(DuplicateRemovalPlan {
                    ticker,
                    fiscal_year,
                    fiscal_quarter,
                    metric_id,
                    keeper_id,
                    removed_ids: removed_ids.to_vec(),
                });
            }
        }
    }

    if dry_run || plans.is_empty() {
        return Ok(plans);
    }

    let tx = store.connection_mut().transaction().map_err(EdgarError::Sqlite)?;
    for plan in &plans {
        for removed_id in &plan.removed_ids {
            tx.execute(
                "DELETE FROM normalized_financials WHERE id = ?1",
                rusqlite::params![removed_id],
            )
            .map_err(EdgarError::Sqlite)?;
        }
    }
    tx.commit().map_err(EdgarError::Sqlite)?;

    Ok(plans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use edgar_core::models::{Filing, PeriodType};

    fn setup() -> Store {
        Store::open_in_memory().unwrap()
    }

    fn sample_filing(accession: &str, xbrl_processed: bool) -> Filing {
        Filing {
            accession_number: accession.to_string(),
            cik: "0000320193".to_string(),
            form_type: "10-K".to_string(),
            filing_date: NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
            period_of_report: Some(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()),
            acceptance_datetime: None,
            has_xbrl: true,
            local_storage_path: Some("/data/filings/x".to_string()),
            download_status: "completed".to_string(),
            xbrl_processed,
            sections_processed: false,
            full_markdown: None,
            word_count: None,
            updated_at: None,
        }
    }

    fn sample_fact(concept: &str, value: i64) -> Fact {
        Fact {
            accession_number: "0000320193-24-000001".to_string(),
            concept_name: concept.to_string(),
            value: Some(BigDecimal::from(value)),
            value_text: None,
            unit: Some("USD".to_string()),
            decimals: Some(-6),
            period_type: PeriodType::Instant,
            period_start: None,
            period_end: Some(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()),
            dimensions: None,
            is_custom: false,
            is_negated: false,
            parent_concept: None,
            depth: None,
            label: None,
        }
    }

    #[test]
    fn flags_processed_filing_with_no_facts() {
        let store = setup();
        store.upsert_company("0000320193", "Apple Inc.", Some("AAPL"), None, None).unwrap();
        store.upsert_filing(&sample_filing("0000320193-24-000001", true)).unwrap();

        let engine = ReconciliationEngine::new(&store, ReconcilerConfig::default());
        let summary = engine.run_all_checks().unwrap();
        assert!(summary.issues.iter().any(|i| i.issue_type == "orphaned_filings"));
    }

    #[test]
    fn balance_sheet_within_tolerance_is_silent() {
        let store = setup();
        store.upsert_company("0000320193", "Apple Inc.", Some("AAPL"), None, None).unwrap();
        store.upsert_filing(&sample_filing("0000320193-24-000001", true)).unwrap();
        store.insert_fact_if_absent(&sample_fact("us-gaap:Assets", 1_000_000)).unwrap();
        store.insert_fact_if_absent(&sample_fact("us-gaap:Liabilities", 600_000)).unwrap();
        store.insert_fact_if_absent(&sample_fact("us-gaap:StockholdersEquity", 400_000)).unwrap();

        let engine = ReconciliationEngine::new(&store, ReconcilerConfig::default());
        let summary = engine.run_all_checks().unwrap();
        assert!(!summary.issues.iter().any(|i| i.issue_type == "balance_sheet_imbalance"));
    }

    #[test]
    fn balance_sheet_mismatch_above_tolerance_is_flagged() {
        let store = setup();
        store.upsert_company("0000320193", "Apple Inc.", Some("AAPL"), None, None).unwrap();
        store.upsert_filing(&sample_filing("0000320193-24-000001", true)).unwrap();
        store.insert_fact_if_absent(&sample_fact("us-gaap:Assets", 1_000_000)).unwrap();
        store.insert_fact_if_absent(&sample_fact("us-gaap:Liabilities", 500_000)).unwrap();
        store.insert_fact_if_absent(&sample_fact("us-gaap:StockholdersEquity", 400_000)).unwrap();

        let engine = ReconciliationEngine::new(&store, ReconcilerConfig::default());
        let summary = engine.run_all_checks().unwrap();
        let found = summary.issues.iter().find(|i| i.issue_type == "balance_sheet_imbalance").unwrap();
        assert_eq!(found.severity, Severity::Error);
    }

    #[test]
    fn balance_sheet_mismatch_at_exactly_five_percent_is_error() {
        let store = setup();
        store.upsert_company("0000320193", "Apple Inc.", Some("AAPL"), None, None).unwrap();
        store.upsert_filing(&sample_filing("0000320193-24-000001", true)).unwrap();
        store.insert_fact_if_absent(&sample_fact("us-gaap:Assets", 1_000_000)).unwrap();
        store.insert_fact_if_absent(&sample_fact("us-gaap:Liabilities", 600_000)).unwrap();
        store.insert_fact_if_absent(&sample_fact("us-gaap:StockholdersEquity", 350_000)).unwrap();

        let engine = ReconciliationEngine::new(&store, ReconcilerConfig::default());
        let summary = engine.run_all_checks().unwrap();
        let found = summary.issues.iter().find(|i| i.issue_type == "balance_sheet_imbalance").unwrap();
        assert_eq!(found.severity, Severity::Error);
    }

    #[test]
    fn negative_revenue_without_negated_flag_is_flagged() {
        let store = setup();
        store.upsert_company("0000320193", "Apple Inc.", Some("AAPL"), None, None).unwrap();
        store.upsert_filing(&sample_filing("0000320193-24-000001", true)).unwrap();
        let mut fact = sample_fact("us-gaap:Revenues", -500);
        fact.is_negated = false;
        store.insert_fact_if_absent(&fact).unwrap();

        let engine = ReconciliationEngine::new(&store, ReconcilerConfig::default());
        let summary = engine.run_all_checks().unwrap();
        assert!(summary.issues.iter().any(|i| i.issue_type == "unexpected_negative_value"));
    }

    #[test]
    fn remove_duplicates_keeps_highest_confidence_row() {
        let mut store = setup();
        store
            .connection()
            .execute(
                "INSERT INTO normalized_financials (ticker, fiscal_year, fiscal_quarter, metric_id, value, source_concept, source_accession, confidence_score)
                 VALUES ('AAPL', 2023, NULL, 'revenue', '100', 'us-gaap:Revenues', 'a', 0.5)",
                [],
            )
            .unwrap();
        store
            .connection()
            .execute(
                "INSERT INTO normalized_financials (ticker, fiscal_year, fiscal_quarter, metric_id, value, source_concept, source_accession, confidence_score)
                 VALUES ('AAPL', 2023, NULL, 'revenue', '101', 'us-gaap:Revenues', 'b', 0.9)",
                [],
            )
            .unwrap();

        let dry_plans = remove_duplicates(&mut store, true).unwrap();
        assert_eq!(dry_plans.len(), 1);
        assert_eq!(dry_plans[0].removed_ids.len(), 1);

        let remaining: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM normalized_financials", [], |r| r.get(0))
            .unwrap();
        assert_eq!(remaining, 2, "dry run must not mutate");

        let plans = remove_duplicates(&mut store, false).unwrap();
        assert_eq!(plans.len(), 1);

        let kept: f64 = store
            .connection()
            .query_row(
                "SELECT confidence_score FROM normalized_financials WHERE ticker = 'AAPL'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(kept, 0.9);
    }
}
