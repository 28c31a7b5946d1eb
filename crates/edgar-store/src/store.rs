//! The canonical store: a thin wrapper around a `rusqlite::Connection`
//! exposing the atomic query patterns the core pipeline needs (insert-if-
//! absent facts, company/filing upserts, the monotone-by-confidence
//! normalized-metric upsert, and the latest-filing-per-period read).
//!
//! Grounded on the teacher's `XbrlStorage` in `storage.rs` (one struct per
//! store concern, constructors that take a config/path, methods named
//! `store_*`/`get_*`/`retrieve_*`), generalized from diesel-async/Postgres
//! to a synchronous `rusqlite` connection against a local file, per
//! SPEC_FULL.md section 9's storage-backend decision.

use crate::schema;
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use edgar_core::error::{EdgarError, EdgarResult};
use edgar_core::models::{
    ConceptMapping, Fact, Filing, NormalizedMetric, PeriodType, ProcessingLogEntry, Section,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::debug;
use std::str::FromStr;

pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens (creating if absent) the database file at `path`, bootstraps
    /// the schema, and enables WAL journaling. Each worker should hold its
    /// own `Store` instance against the same file; SQLite connections are
    /// not shared across threads.
    pub fn open(path: impl AsRef<Path>) -> EdgarResult<Self> {
        let conn = Connection::open(path).map_err(EdgarError::Sqlite)?;
        schema::bootstrap(&conn).map_err(EdgarError::Sqlite)?;
        schema::enable_wal(&conn).map_err(EdgarError::Sqlite)?;
        Ok(Store { conn })
    }

    pub fn open_in_memory() -> EdgarResult<Self> {
        let conn = Connection::open_in_memory().map_err(EdgarError::Sqlite)?;
        schema::bootstrap(&conn).map_err(EdgarError::Sqlite)?;
        Ok(Store { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Upserts a company by CIK; existing rows are refined, never dropped.
    pub fn upsert_company(
        &self,
        cik: &str,
        company_name: &str,
        ticker: Option<&str>,
        industry_code: Option<&str>,
        fiscal_year_end: Option<&str>,
    ) -> EdgarResult<()> {
        self.conn
            .execute(
                "INSERT INTO companies (cik, company_name, ticker, industry_code, fiscal_year_end)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(cik) DO UPDATE SET
                    company_name = excluded.company_name,
                    ticker = COALESCE(excluded.ticker, companies.ticker),
                    industry_code = COALESCE(excluded.industry_code, companies.industry_code),
                    fiscal_year_end = COALESCE(excluded.fiscal_year_end, companies.fiscal_year_end)",
                params![cik, company_name, ticker, industry_code, fiscal_year_end],
            )
            .map_err(EdgarError::Sqlite)?;
        Ok(())
    }

    /// Upserts a filing by accession number.
    pub fn upsert_filing(&self, filing: &Filing) -> EdgarResult<()> {
        filing.validate().map_err(EdgarError::validation)?;
        self.conn
            .execute(
                "INSERT INTO filings (
                    accession_number, cik, form_type, filing_date, period_of_report,
                    acceptance_datetime, has_xbrl, local_storage_path, download_status,
                    xbrl_processed, sections_processed, full_markdown, word_count, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, datetime('now'))
                 ON CONFLICT(accession_number) DO UPDATE SET
                    form_type = excluded.form_type,
                    filing_date = excluded.filing_date,
                    period_of_report = excluded.period_of_report,
                    acceptance_datetime = excluded.acceptance_datetime,
                    has_xbrl = excluded.has_xbrl,
                    local_storage_path = excluded.local_storage_path,
                    download_status = excluded.download_status,
                    xbrl_processed = excluded.xbrl_processed,
                    sections_processed = excluded.sections_processed,
                    full_markdown = excluded.full_markdown,
                    word_count = excluded.word_count,
                    updated_at = datetime('now')",
                params![
                    filing.accession_number,
                    filing.cik,
                    filing.form_type,
                    filing.filing_date.to_string(),
                    filing.period_of_report.map(|d| d.to_string()),
                    filing.acceptance_datetime.map(|d| d.to_string()),
                    filing.has_xbrl as i64,
                    filing.local_storage_path,
                    filing.download_status,
                    filing.xbrl_processed as i64,
                    filing.sections_processed as i64,
                    filing.full_markdown,
                    filing.word_count,
                ],
            )
            .map_err(EdgarError::Sqlite)?;
        Ok(())
    }

    /// Inserts a fact keyed by the fact uniqueness tuple. Returns `true` if
    /// a new row was inserted, `false` if the tuple already existed
    /// (re-insertion is a no-op, per the uniqueness invariant).
    pub fn insert_fact_if_absent(&self, fact: &Fact) -> EdgarResult<bool> {
        fact.validate().map_err(EdgarError::validation)?;
        let dims = fact.canonical_dimensions();
        let changed = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO facts (
                    accession_number, concept_name, value, value_text, unit, decimals,
                    period_type, period_start, period_end, dimensions,
                    is_custom, is_negated, parent_concept, depth, label
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    fact.accession_number,
                    fact.concept_name,
                    fact.value.as_ref().map(|v| v.to_string()),
                    fact.value_text,
                    fact.unit,
                    fact.decimals,
                    fact.period_type.as_str(),
                    fact.period_start.map(|d| d.to_string()),
                    fact.period_end.map(|d| d.to_string()),
                    dims,
                    fact.is_custom as i64,
                    fact.is_negated as i64,
                    fact.parent_concept,
                    fact.depth,
                    fact.label,
                ],
            )
            .map_err(EdgarError::Sqlite)?;
        Ok(changed > 0)
    }

    pub fn facts_for_filing(&self, accession_number: &str) -> EdgarResult<Vec<Fact>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT accession_number, concept_name, value, value_text, unit, decimals,
                        period_type, period_start, period_end, dimensions,
                        is_custom, is_negated, parent_concept, depth, label
                 FROM facts WHERE accession_number = ?1",
            )
            .map_err(EdgarError::Sqlite)?;
        let rows = stmt
            .query_map(params![accession_number], row_to_fact)
            .map_err(EdgarError::Sqlite)?;
        let mut facts = Vec::new();
        for row in rows {
            facts.push(row.map_err(EdgarError::Sqlite)?);
        }
        Ok(facts)
    }

    pub fn insert_section(&self, section: &Section) -> EdgarResult<()> {
        self.conn
            .execute(
                "INSERT INTO sections (accession_number, section_type, section_title, content_markdown, word_count)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(accession_number, section_type) DO UPDATE SET
                    section_title = excluded.section_title,
                    content_markdown = excluded.content_markdown,
                    word_count = excluded.word_count",
                params![
                    section.accession_number,
                    section.section_type,
                    section.section_title,
                    section.content_markdown,
                    section.word_count,
                ],
            )
            .map_err(EdgarError::Sqlite)?;
        Ok(())
    }

    pub fn sections_for_filing(&self, accession_number: &str) -> EdgarResult<Vec<Section>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT accession_number, section_type, section_title, content_markdown, word_count
                 FROM sections WHERE accession_number = ?1",
            )
            .map_err(EdgarError::Sqlite)?;
        let rows = stmt
            .query_map(params![accession_number], |row| {
                Ok(Section {
                    accession_number: row.get(0)?,
                    section_type: row.get(1)?,
                    section_title: row.get(2)?,
                    content_markdown: row.get(3)?,
                    word_count: row.get(4)?,
                })
            })
            .map_err(EdgarError::Sqlite)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(EdgarError::Sqlite)?);
        }
        Ok(out)
    }

    /// Loads all concept mapping rules, grouped by metric elsewhere by the
    /// caller (`edgar-normalize`); this just returns the flat row set.
    pub fn all_concept_mappings(&self) -> EdgarResult<Vec<ConceptMapping>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT metric_id, concept_name, priority, confidence_score, applies_to_industry
                 FROM concept_mappings ORDER BY metric_id, priority ASC",
            )
            .map_err(EdgarError::Sqlite)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ConceptMapping {
                    metric_id: row.get(0)?,
                    concept_name: row.get(1)?,
                    priority: row.get(2)?,
                    confidence_score: row.get(3)?,
                    applies_to_industry: row.get(4)?,
                })
            })
            .map_err(EdgarError::Sqlite)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(EdgarError::Sqlite)?);
        }
        Ok(out)
    }

    pub fn insert_concept_mapping(&self, mapping: &ConceptMapping) -> EdgarResult<()> {
        self.conn
            .execute(
                "INSERT INTO concept_mappings (metric_id, concept_name, priority, confidence_score, applies_to_industry)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(metric_id, concept_name) DO UPDATE SET
                    priority = excluded.priority,
                    confidence_score = excluded.confidence_score,
                    applies_to_industry = excluded.applies_to_industry",
                params![
                    mapping.metric_id,
                    mapping.concept_name,
                    mapping.priority,
                    mapping.confidence_score,
                    mapping.applies_to_industry,
                ],
            )
            .map_err(EdgarError::Sqlite)?;
        Ok(())
    }

    /// Monotone-by-confidence upsert (spec section 4.9): if an existing row
    /// has confidence >= the new value's confidence, it is left untouched.
    pub fn upsert_normalized_metric(&self, metric: &NormalizedMetric) -> EdgarResult<()> {
        let existing: Option<f64> = self
            .conn
            .query_row(
                "SELECT confidence_score FROM normalized_financials
                 WHERE ticker = ?1 AND fiscal_year = ?2
                   AND fiscal_quarter IS ?3 AND metric_id = ?4",
                params![
                    metric.ticker,
                    metric.fiscal_year,
                    metric.fiscal_quarter,
                    metric.metric_id
                ],
                |row| row.get(0),
            )
            .optional()
            .map_err(EdgarError::Sqlite)?;

        if let Some(existing_confidence) = existing {
            if metric.confidence_score < existing_confidence {
                debug!(
                    ticker = metric.ticker,
                    metric_id = metric.metric_id,
                    existing_confidence,
                    candidate_confidence = metric.confidence_score,
                    "keeping existing normalized metric, candidate confidence is lower"
                );
                return Ok(());
            }
            self.conn
                .execute(
                    "UPDATE normalized_financials SET
                        value = ?1, source_concept = ?2, source_accession = ?3,
                        confidence_score = ?4, created_at = datetime('now')
                     WHERE ticker = ?5 AND fiscal_year = ?6 AND fiscal_quarter IS ?7 AND metric_id = ?8",
                    params![
                        metric.value.to_string(),
                        metric.source_concept,
                        metric.source_accession,
                        metric.confidence_score,
                        metric.ticker,
                        metric.fiscal_year,
                        metric.fiscal_quarter,
                        metric.metric_id,
                    ],
                )
                .map_err(EdgarError::Sqlite)?;
        } else {
            self.conn
                .execute(
                    "INSERT INTO normalized_financials (
                        ticker, fiscal_year, fiscal_quarter, metric_id, value,
                        source_concept, source_accession, confidence_score
                     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        metric.ticker,
                        metric.fiscal_year,
                        metric.fiscal_quarter,
                        metric.metric_id,
                        metric.value.to_string(),
                        metric.source_concept,
                        metric.source_accession,
                        metric.confidence_score,
                    ],
                )
                .map_err(EdgarError::Sqlite)?;
        }
        Ok(())
    }

    pub fn normalized_metric(
        &self,
        ticker: &str,
        fiscal_year: i32,
        fiscal_quarter: Option<i32>,
        metric_id: &str,
    ) -> EdgarResult<Option<NormalizedMetric>> {
        self.conn
            .query_row(
                "SELECT ticker, fiscal_year, fiscal_quarter, metric_id, value,
                        source_concept, source_accession, confidence_score, created_at
                 FROM normalized_financials
                 WHERE ticker = ?1 AND fiscal_year = ?2 AND fiscal_quarter IS ?3 AND metric_id = ?4",
                params![ticker, fiscal_year, fiscal_quarter, metric_id],
                row_to_normalized_metric,
            )
            .optional()
            .map_err(EdgarError::Sqlite)
    }

    pub fn append_processing_log(&self, entry: &ProcessingLogEntry) -> EdgarResult<()> {
        self.conn
            .execute(
                "INSERT INTO processing_log (accession_number, stage, severity, issue_type, description, affected_records)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    entry.accession_number,
                    entry.stage.as_str(),
                    entry.severity.as_str(),
                    entry.issue_type,
                    entry.description,
                    entry.affected_records,
                ],
            )
            .map_err(EdgarError::Sqlite)?;
        Ok(())
    }

    pub fn insert_chunk(&self, chunk: &edgar_core::models::Chunk) -> EdgarResult<()> {
        self.conn
            .execute(
                "INSERT INTO chunks (chunk_id, accession_number, section_type, chunk_index,
                                     context_prefix, chunk_text, token_count, contains_table)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(chunk_id) DO UPDATE SET
                    context_prefix = excluded.context_prefix,
                    chunk_text = excluded.chunk_text,
                    token_count = excluded.token_count,
                    contains_table = excluded.contains_table",
                params![
                    chunk.chunk_id,
                    chunk.accession_number,
                    chunk.section_type,
                    chunk.chunk_index,
                    chunk.context_prefix,
                    chunk.text,
                    chunk.token_count,
                    chunk.contains_table as i64,
                ],
            )
            .map_err(EdgarError::Sqlite)?;
        Ok(())
    }

    pub fn chunks_for_filing(&self, accession_number: &str) -> EdgarResult<Vec<edgar_core::models::Chunk>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT chunk_id, accession_number, section_type, chunk_index,
                        context_prefix, chunk_text, token_count, contains_table
                 FROM chunks WHERE accession_number = ?1 ORDER BY chunk_index ASC",
            )
            .map_err(EdgarError::Sqlite)?;
        let rows = stmt
            .query_map(params![accession_number], |row| {
                Ok(edgar_core::models::Chunk {
                    chunk_id: row.get(0)?,
                    accession_number: row.get(1)?,
                    section_type: row.get(2)?,
                    chunk_index: row.get(3)?,
                    context_prefix: row.get(4)?,
                    text: row.get(5)?,
                    token_count: row.get(6)?,
                    contains_table: row.get::<_, i64>(7)? != 0,
                })
            })
            .map_err(EdgarError::Sqlite)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(EdgarError::Sqlite)?);
        }
        Ok(out)
    }
}

fn row_to_fact(row: &rusqlite::Row) -> rusqlite::Result<Fact> {
    let value: Option<String> = row.get(2)?;
    let period_type: String = row.get(6)?;
    let period_start: Option<String> = row.get(7)?;
    let period_end: Option<String> = row.get(8)?;
    let dims: Option<String> = row.get(9)?;

    Ok(Fact {
        accession_number: row.get(0)?,
        concept_name: row.get(1)?,
        value: value.and_then(|v| BigDecimal::from_str(&v).ok()),
        value_text: row.get(3)?,
        unit: row.get(4)?,
        decimals: row.get(5)?,
        period_type: PeriodType::parse(&period_type).unwrap_or(PeriodType::Instant),
        period_start: period_start.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        period_end: period_end.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        dimensions: dims.filter(|d| !d.is_empty()).map(|d| {
            d.split('&')
                .filter_map(|kv| kv.split_once('='))
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        }),
        is_custom: row.get::<_, i64>(10)? != 0,
        is_negated: row.get::<_, i64>(11)? != 0,
        parent_concept: row.get(12)?,
        depth: row.get(13)?,
        label: row.get(14)?,
    })
}

fn row_to_normalized_metric(row: &rusqlite::Row) -> rusqlite::Result<NormalizedMetric> {
    let value: String = row.get(4)?;
    let created_at: Option<String> = row.get(8)?;
    Ok(NormalizedMetric {
        ticker: row.get(0)?,
        fiscal_year: row.get(1)?,
        fiscal_quarter: row.get(2)?,
        metric_id: row.get(3)?,
        value: BigDecimal::from_str(&value).unwrap_or_default(),
        source_concept: row.get(5)?,
        source_accession: row.get(6)?,
        confidence_score: row.get(7)?,
        created_at: created_at.and_then(|d| NaiveDateTime::parse_from_str(&d, "%Y-%m-%d %H:%M:%S").ok()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgar_core::models::DownloadStatus;

    fn sample_filing(accession: &str) -> Filing {
        Filing {
            accession_number: accession.to_string(),
            cik: "0000320193".to_string(),
            form_type: "10-K".to_string(),
            filing_date: NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
            period_of_report: Some(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()),
            acceptance_datetime: None,
            has_xbrl: true,
            local_storage_path: None,
            download_status: DownloadStatus::Completed.as_str().to_string(),
            xbrl_processed: false,
            sections_processed: false,
            full_markdown: None,
            word_count: None,
            updated_at: None,
        }
    }

    #[test]
    fn fact_insert_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        store
            .upsert_company("0000320193", "Apple Inc.", Some("AAPL"), None, None)
            .unwrap();
        store.upsert_filing(&sample_filing("0000320193-24-000001")).unwrap();

        let fact = Fact {
            accession_number: "0000320193-24-000001".into(),
            concept_name: "us-gaap:Assets".into(),
            value: Some(BigDecimal::from_str("1000000").unwrap()),
            value_text: None,
            unit: Some("USD".into()),
            decimals: Some(0),
            period_type: PeriodType::Instant,
            period_start: None,
            period_end: Some(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()),
            dimensions: None,
            is_custom: false,
            is_negated: false,
            parent_concept: None,
            depth: None,
            label: None,
        };

        assert!(store.insert_fact_if_absent(&fact).unwrap());
        assert!(!store.insert_fact_if_absent(&fact).unwrap());
        assert_eq!(store.facts_for_filing("0000320193-24-000001").unwrap().len(), 1);
    }

    #[test]
    fn normalized_metric_upsert_is_monotone_by_confidence() {
        let store = Store::open_in_memory().unwrap();

        let base = NormalizedMetric {
            ticker: "AAPL".into(),
            fiscal_year: 2023,
            fiscal_quarter: None,
            metric_id: "revenue".into(),
            value: BigDecimal::from_str("100").unwrap(),
            source_concept: "us-gaap:SalesRevenueNet".into(),
            source_accession: "0000320193-24-000001".into(),
            confidence_score: 0.90,
            created_at: None,
        };
        store.upsert_normalized_metric(&base).unwrap();

        let mut lower = base.clone();
        lower.value = BigDecimal::from_str("999").unwrap();
        lower.confidence_score = 0.80;
        store.upsert_normalized_metric(&lower).unwrap();

        let row = store
            .normalized_metric("AAPL", 2023, None, "revenue")
            .unwrap()
            .unwrap();
        assert_eq!(row.value, BigDecimal::from_str("100").unwrap());
        assert_eq!(row.confidence_score, 0.90);

        let mut higher = base.clone();
        higher.value = BigDecimal::from_str("101").unwrap();
        higher.confidence_score = 0.95;
        store.upsert_normalized_metric(&higher).unwrap();

        let row = store
            .normalized_metric("AAPL", 2023, None, "revenue")
            .unwrap()
            .unwrap();
        assert_eq!(row.value, BigDecimal::from_str("101").unwrap());
        assert_eq!(row.confidence_score, 0.95);
    }

    #[test]
    fn latest_filing_per_period_prefers_amendment() {
        let store = Store::open_in_memory().unwrap();
        store
            .upsert_company("0000320193", "Apple Inc.", Some("AAPL"), None, None)
            .unwrap();

        let mut original = sample_filing("0000320193-24-000001");
        original.filing_date = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        store.upsert_filing(&original).unwrap();

        let mut amendment = sample_filing("0000320193-24-000050");
        amendment.form_type = "10-K/A".into();
        amendment.filing_date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        store.upsert_filing(&amendment).unwrap();

        let winner: String = store
            .connection()
            .query_row(
                "SELECT accession_number FROM latest_filing_per_period WHERE cik = ?1",
                params!["0000320193"],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(winner, "0000320193-24-000050");
    }
}
