//! Promotes one accession's staged rows into the canonical tables inside a
//! single transaction, with a pre-commit validation hook chain.
//!
//! Ported from `merge_coordinator.py`'s `MergeCoordinator`: a registry of
//! validation hooks runs before every merge, the merge itself is a
//! DELETE-then-INSERT-from-staging inside one transaction so the canonical
//! tables never see a filing half replaced, and `run_pre_commit_checks`
//! exposes the same hook chain without ever writing.

use crate::staging::StagingManager;
use edgar_core::error::{EdgarError, EdgarResult};
use rusqlite::Connection;

pub type ValidationHook = Box<dyn Fn(&Connection, &str, &str) -> EdgarResult<()>>;

#[derive(Debug, Clone, PartialEq)]
pub struct MergeResult {
    pub accession_number: String,
    pub run_id: String,
    pub rows_merged: Vec<(String, i64)>,
}

pub struct MergeCoordinator {
    hooks: Vec<ValidationHook>,
}

impl Default for MergeCoordinator {
    fn default() -> Self {
        let mut coordinator = MergeCoordinator { hooks: Vec::new() };
        coordinator.register_default_hooks();
        coordinator
    }
}

impl MergeCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_validation_hook(&mut self, hook: ValidationHook) {
        self.hooks.push(hook);
    }

    fn register_default_hooks(&mut self) {
        self.register_validation_hook(Box::new(content_not_empty_hook));
        self.register_validation_hook(Box::new(no_duplicate_section_types_hook));
    }

    /// Runs every registered hook against the staged rows for `accession_number`
    /// without writing anything, for callers that want to surface validation
    /// failures ahead of an actual merge attempt.
    pub fn run_pre_commit_checks(
        &self,
        conn: &Connection,
        run_id: &str,
        accession_number: &str,
    ) -> EdgarResult<()> {
        for hook in &self.hooks {
            hook(conn, run_id, accession_number)?;
        }
        Ok(())
    }

    /// Replaces one accession's canonical rows with its staged rows inside a
    /// single transaction. On any failure the transaction rolls back and the
    /// canonical tables are left exactly as they were.
    pub fn merge_filing(
        &self,
        conn: &mut Connection,
        run_id: &str,
        accession_number: &str,
    ) -> EdgarResult<MergeResult> {
        self.run_pre_commit_checks(conn, run_id, accession_number)?;

        let tx = conn.transaction().map_err(EdgarError::Sqlite)?;
        let mut rows_merged = Vec::new();

        let merge_one = |table: &str, key_column: &str| -> EdgarResult<i64> {
            let staging_name = format!("{table}_staging_{run_id}");
            tx.execute(
                &format!("DELETE FROM {table} WHERE {key_column} = ?1"),
                [accession_number],
            )
            .map_err(EdgarError::Sqlite)?;
            let inserted = tx
                .execute(
                    &format!(
                        "INSERT INTO {table} SELECT * FROM {staging_name} WHERE {key_column} = ?1"
                    ),
                    [accession_number],
                )
                .map_err(EdgarError::Sqlite)?;
            Ok(inserted as i64)
        };

        rows_merged.push(("sections".to_string(), merge_one("sections", "accession_number")?));
        rows_merged.push(("facts".to_string(), merge_one("facts", "accession_number")?));
        rows_merged.push(("chunks".to_string(), merge_one("chunks", "accession_number")?));

        let updated = tx
            .execute(
                "UPDATE filings SET sections_processed = 1, xbrl_processed = 1, updated_at = datetime('now')
                 WHERE accession_number = ?1",
                [accession_number],
            )
            .map_err(EdgarError::Sqlite)?;
        if updated == 0 {
            return Err(EdgarError::MergePreflight(format!(
                "no filing row exists for accession {accession_number}"
            )));
        }

        tx.commit().map_err(EdgarError::Sqlite)?;

        Ok(MergeResult {
            accession_number: accession_number.to_string(),
            run_id: run_id.to_string(),
            rows_merged,
        })
    }

    /// Merges every distinct accession present in the run's staged sections
    /// table, in arbitrary order; a single accession's failure does not stop
    /// the rest (its error is returned alongside the successes).
    pub fn merge_all_from_run(
        &self,
        conn: &mut Connection,
        run_id: &str,
    ) -> EdgarResult<(Vec<MergeResult>, Vec<(String, EdgarError)>)> {
        let staging_name = format!("sections_staging_{run_id}");
        let accessions: Vec<String> = {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT DISTINCT accession_number FROM {staging_name}"
                ))
                .map_err(EdgarError::Sqlite)?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(EdgarError::Sqlite)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row.map_err(EdgarError::Sqlite)?);
            }
            out
        };

        let mut successes = Vec::new();
        let mut failures = Vec::new();
        for accession in accessions {
            match self.merge_filing(conn, run_id, &accession) {
                Ok(result) => successes.push(result),
                Err(err) => failures.push((accession, err)),
            }
        }
        Ok((successes, failures))
    }

    pub fn cleanup_staging_after_merge(&self, conn: &Connection, run_id: &str) -> EdgarResult<()> {
        StagingManager::new(conn).drop_staging_tables(run_id)
    }
}

fn content_not_empty_hook(conn: &Connection, run_id: &str, accession_number: &str) -> EdgarResult<()> {
    let staging_name = format!("sections_staging_{run_id}");
    let min_len: i64 = conn
        .query_row(
            &format!(
                "SELECT COALESCE(MIN(LENGTH(content_markdown)), 100) FROM {staging_name} WHERE accession_number = ?1"
            ),
            [accession_number],
            |row| row.get(0),
        )
        .map_err(EdgarError::Sqlite)?;
    if min_len < 100 {
        return Err(EdgarError::MergePreflight(format!(
            "accession {accession_number} has a staged section shorter than 100 characters"
        )));
    }
    Ok(())
}

fn no_duplicate_section_types_hook(
    conn: &Connection,
    run_id: &str,
    accession_number: &str,
) -> EdgarResult<()> {
    let staging_name = format!("sections_staging_{run_id}");
    let duplicate_count: i64 = conn
        .query_row(
            &format!(
                "SELECT COUNT(*) FROM (
                    SELECT section_type FROM {staging_name}
                    WHERE accession_number = ?1
                    GROUP BY section_type HAVING COUNT(*) > 1
                 )"
            ),
            [accession_number],
            |row| row.get(0),
        )
        .map_err(EdgarError::Sqlite)?;
    if duplicate_count > 0 {
        return Err(EdgarError::MergePreflight(format!(
            "accession {accession_number} has duplicate staged section types"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;
    use crate::staging::StagingManager;

    fn setup_with_filing(accession: &str) -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        schema::bootstrap(&conn).unwrap();
        conn.execute(
            "INSERT INTO companies (cik, company_name) VALUES ('0000320193', 'Apple Inc.')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO filings (accession_number, cik, form_type, filing_date) VALUES (?1, '0000320193', '10-K', '2024-02-10')",
            [accession],
        )
        .unwrap();
        conn
    }

    #[test]
    fn merge_promotes_staged_sections_into_canonical_table() {
        let mut conn = setup_with_filing("0000320193-24-000001");
        let run_id = StagingManager::generate_run_id("20260101_000000");
        StagingManager::new(&conn).create_staging_tables(&run_id).unwrap();

        let long_text = "x".repeat(150);
        conn.execute(
            &format!(
                "INSERT INTO sections_staging_{run_id} (accession_number, section_type, section_title, content_markdown, word_count)
                 VALUES ('0000320193-24-000001', 'item_1', 'Business', ?1, 20)"
            ),
            [&long_text],
        )
        .unwrap();

        let coordinator = MergeCoordinator::new();
        let result = coordinator
            .merge_filing(&mut conn, &run_id, "0000320193-24-000001")
            .unwrap();
        assert_eq!(result.accession_number, "0000320193-24-000001");

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM sections WHERE accession_number = ?1", ["0000320193-24-000001"], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);

        let processed: i64 = conn
            .query_row(
                "SELECT sections_processed FROM filings WHERE accession_number = ?1",
                ["0000320193-24-000001"],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(processed, 1);
    }

    #[test]
    fn merge_rolls_back_when_section_is_too_short() {
        let mut conn = setup_with_filing("0000320193-24-000002");
        let run_id = StagingManager::generate_run_id("20260101_000001");
        StagingManager::new(&conn).create_staging_tables(&run_id).unwrap();

        conn.execute(
            &format!(
                "INSERT INTO sections_staging_{run_id} (accession_number, section_type, section_title, content_markdown, word_count)
                 VALUES ('0000320193-24-000002', 'item_1', 'Business', 'too short', 2)"
            ),
            [],
        )
        .unwrap();

        let coordinator = MergeCoordinator::new();
        let err = coordinator
            .merge_filing(&mut conn, &run_id, "0000320193-24-000002")
            .unwrap_err();
        assert!(matches!(err, EdgarError::MergePreflight(_)));

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM sections WHERE accession_number = ?1", ["0000320193-24-000002"], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
