//! Idempotent DDL bootstrap for the canonical store.
//!
//! Ported from the table set implied by the data model (companies, filings,
//! facts, sections, standardized metrics, concept mappings, normalized
//! financials, chunks, processing log) onto `rusqlite`, the way the
//! teacher's `econ-graph-core::database::run_migrations` bootstraps its
//! Postgres schema — except here the DDL is inline `CREATE TABLE IF NOT
//! EXISTS` rather than an embedded migrations directory, since SQLite has
//! no separate migration-runner crate in the retrieval pack and the full
//! schema is small enough to express directly.

use rusqlite::Connection;

/// Executes the full idempotent schema bootstrap. Safe to call on every
/// startup even when tables, indexes, and views already exist.
pub fn bootstrap(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS companies (
            cik               TEXT PRIMARY KEY,
            company_name      TEXT NOT NULL,
            ticker            TEXT,
            industry_code     TEXT,
            fiscal_year_end   TEXT
        );

        CREATE TABLE IF NOT EXISTS filings (
            accession_number    TEXT PRIMARY KEY,
            cik                 TEXT NOT NULL REFERENCES companies(cik),
            form_type           TEXT NOT NULL,
            filing_date         TEXT NOT NULL,
            period_of_report    TEXT,
            acceptance_datetime TEXT,
            has_xbrl            INTEGER NOT NULL DEFAULT 0,
            local_storage_path  TEXT,
            download_status     TEXT NOT NULL DEFAULT 'pending',
            xbrl_processed      INTEGER NOT NULL DEFAULT 0,
            sections_processed  INTEGER NOT NULL DEFAULT 0,
            full_markdown       TEXT,
            word_count          INTEGER,
            updated_at          TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_filings_cik ON filings(cik);

        CREATE TABLE IF NOT EXISTS facts (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            accession_number    TEXT NOT NULL REFERENCES filings(accession_number),
            concept_name        TEXT NOT NULL,
            value               TEXT,
            value_text          TEXT,
            unit                TEXT,
            decimals            INTEGER,
            period_type         TEXT NOT NULL,
            period_start        TEXT,
            period_end          TEXT,
            dimensions          TEXT,
            is_custom           INTEGER NOT NULL DEFAULT 0,
            is_negated          INTEGER NOT NULL DEFAULT 0,
            parent_concept      TEXT,
            depth               INTEGER,
            label               TEXT,
            UNIQUE(accession_number, concept_name, period_end, dimensions)
        );
        CREATE INDEX IF NOT EXISTS idx_facts_accession ON facts(accession_number);
        CREATE INDEX IF NOT EXISTS idx_facts_concept ON facts(concept_name);

        CREATE TABLE IF NOT EXISTS sections (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            accession_number    TEXT NOT NULL REFERENCES filings(accession_number),
            section_type        TEXT NOT NULL,
            section_title       TEXT,
            content_markdown    TEXT NOT NULL,
            word_count          INTEGER NOT NULL DEFAULT 0,
            UNIQUE(accession_number, section_type)
        );
        CREATE INDEX IF NOT EXISTS idx_sections_accession ON sections(accession_number);

        CREATE TABLE IF NOT EXISTS standardized_metrics (
            metric_id      TEXT PRIMARY KEY,
            display_label  TEXT NOT NULL,
            category       TEXT NOT NULL,
            data_type      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS concept_mappings (
            id                    INTEGER PRIMARY KEY AUTOINCREMENT,
            metric_id             TEXT NOT NULL REFERENCES standardized_metrics(metric_id),
            concept_name          TEXT NOT NULL,
            priority              INTEGER NOT NULL,
            confidence_score      REAL NOT NULL DEFAULT 1.0,
            applies_to_industry   TEXT,
            UNIQUE(metric_id, concept_name)
        );

        CREATE TABLE IF NOT EXISTS normalized_financials (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            ticker            TEXT NOT NULL,
            fiscal_year       INTEGER NOT NULL,
            fiscal_quarter    INTEGER,
            metric_id         TEXT NOT NULL,
            value             TEXT NOT NULL,
            source_concept    TEXT NOT NULL,
            source_accession  TEXT NOT NULL,
            confidence_score  REAL NOT NULL,
            created_at        TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(ticker, fiscal_year, fiscal_quarter, metric_id)
        );

        CREATE TABLE IF NOT EXISTS chunks (
            chunk_id          TEXT PRIMARY KEY,
            accession_number  TEXT NOT NULL REFERENCES filings(accession_number),
            section_type      TEXT NOT NULL,
            chunk_index       INTEGER NOT NULL,
            context_prefix    TEXT NOT NULL,
            chunk_text        TEXT NOT NULL,
            token_count       INTEGER NOT NULL,
            contains_table    INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_chunks_accession ON chunks(accession_number);

        CREATE TABLE IF NOT EXISTS processing_log (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            accession_number    TEXT NOT NULL,
            stage               TEXT NOT NULL,
            severity            TEXT NOT NULL,
            issue_type          TEXT NOT NULL,
            description         TEXT NOT NULL,
            affected_records    INTEGER NOT NULL DEFAULT 0,
            created_at          TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_processing_log_accession ON processing_log(accession_number);

        CREATE VIEW IF NOT EXISTS latest_filing_per_period AS
        SELECT accession_number, cik, form_type, filing_date, period_of_report,
               acceptance_datetime, has_xbrl, local_storage_path, download_status,
               xbrl_processed, sections_processed, word_count
        FROM (
            SELECT f.*,
                ROW_NUMBER() OVER (
                    PARTITION BY f.cik, f.period_of_report
                    ORDER BY
                        CASE WHEN f.form_type LIKE '%/A' THEN 1 ELSE 0 END DESC,
                        f.filing_date DESC
                ) AS rn
            FROM filings f
            WHERE f.period_of_report IS NOT NULL
        )
        WHERE rn = 1;
        "#,
    )
}

/// Enables write-ahead-log journaling per `database.wal_enabled`. Ahead-of-
/// write journaling is required by spec section 6; WAL is SQLite's mode for it.
pub fn enable_wal(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    Ok(())
}
