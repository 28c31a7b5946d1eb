//! Staging-table lifecycle for a single ingest run.
//!
//! Ported from `staging_manager.py`'s `StagingManager`: every ingest run
//! gets its own timestamp-suffixed shadow table per staged entity, so
//! concurrent runs never collide and a half-finished run never pollutes
//! the canonical tables until `edgar_store::merge` commits it.

use edgar_core::error::{EdgarError, EdgarResult};
use rusqlite::Connection;

/// Entities that get a staging table per run. Chunks are staged alongside
/// sections and facts so a merge can be fully atomic per accession.
/// `normalized_financials` is deliberately absent: C9 (`edgar-normalize`)
/// writes it directly to production through the monotone-by-confidence
/// upsert (spec.md section 4.9), never through staging/merge — routing it
/// through the per-accession DELETE+INSERT here would violate its
/// `(ticker, fiscal_year, fiscal_quarter, metric_id)` uniqueness constraint
/// whenever two different accessions normalize to the same key.
pub const STAGING_TABLES: [&str; 3] = ["sections", "facts", "chunks"];

pub struct StagingManager<'a> {
    conn: &'a Connection,
}

impl<'a> StagingManager<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        StagingManager { conn }
    }

    /// Builds a run id from a caller-supplied timestamp string (the caller
    /// owns wall-clock access; this module never calls `Utc::now()` itself
    /// so staging can be driven deterministically in tests).
    pub fn generate_run_id(timestamp: &str) -> String {
        let sanitized: String = timestamp
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!("run_{sanitized}")
    }

    pub fn staging_table_name(&self, table: &str, run_id: &str) -> EdgarResult<String> {
        if !STAGING_TABLES.contains(&table) {
            return Err(EdgarError::storage(format!(
                "{table} is not a staged entity"
            )));
        }
        Ok(format!("{table}_staging_{run_id}"))
    }

    pub fn create_staging_tables(&self, run_id: &str) -> EdgarResult<()> {
        for table in STAGING_TABLES {
            let staging_name = self.staging_table_name(table, run_id)?;
            let sql = format!(
                "CREATE TABLE IF NOT EXISTS {staging_name} AS SELECT * FROM {table} WHERE 0"
            );
            self.conn.execute_batch(&sql).map_err(EdgarError::Sqlite)?;
        }
        Ok(())
    }

    pub fn drop_staging_tables(&self, run_id: &str) -> EdgarResult<()> {
        for table in STAGING_TABLES {
            let staging_name = self.staging_table_name(table, run_id)?;
            let sql = format!("DROP TABLE IF EXISTS {staging_name}");
            self.conn.execute_batch(&sql).map_err(EdgarError::Sqlite)?;
        }
        Ok(())
    }

    pub fn staging_stats(&self, run_id: &str) -> EdgarResult<Vec<(String, i64)>> {
        let mut stats = Vec::new();
        for table in STAGING_TABLES {
            let staging_name = self.staging_table_name(table, run_id)?;
            let exists: bool = self
                .conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [&staging_name],
                    |_| Ok(true),
                )
                .unwrap_or(false);
            if !exists {
                continue;
            }
            let count: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {staging_name}"), [], |row| {
                    row.get(0)
                })
                .map_err(EdgarError::Sqlite)?;
            stats.push((table.to_string(), count));
        }
        Ok(stats)
    }

    /// Scans `sqlite_master` for staging tables whose run id suffix is not
    /// `current_run_id`, mirroring the teacher's information-schema scan
    /// for orphaned staging tables left by a crashed prior run.
    pub fn list_active_staging_runs(&self) -> EdgarResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name LIKE '%\\_staging\\_%' ESCAPE '\\'",
            )
            .map_err(EdgarError::Sqlite)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(EdgarError::Sqlite)?;

        let mut run_ids = std::collections::BTreeSet::new();
        for row in rows {
            let name = row.map_err(EdgarError::Sqlite)?;
            if let Some(idx) = name.find("_staging_") {
                run_ids.insert(name[idx + "_staging_".len()..].to_string());
            }
        }
        Ok(run_ids.into_iter().collect())
    }

    pub fn cleanup_orphaned_staging(&self, keep_run_id: &str) -> EdgarResult<u32> {
        let mut dropped = 0;
        for run_id in self.list_active_staging_runs()? {
            if run_id != keep_run_id {
                self.drop_staging_tables(&run_id)?;
                dropped += 1;
            }
        }
        Ok(dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    #[test]
    fn staging_tables_are_created_and_dropped() {
        let conn = Connection::open_in_memory().unwrap();
        schema::bootstrap(&conn).unwrap();
        let mgr = StagingManager::new(&conn);
        let run_id = StagingManager::generate_run_id("20260101_120000");

        mgr.create_staging_tables(&run_id).unwrap();
        let stats = mgr.staging_stats(&run_id).unwrap();
        assert_eq!(stats.len(), STAGING_TABLES.len());
        assert!(stats.iter().all(|(_, count)| *count == 0));

        mgr.drop_staging_tables(&run_id).unwrap();
        assert!(mgr.staging_stats(&run_id).unwrap().is_empty());
    }

    #[test]
    fn cleanup_orphaned_staging_keeps_current_run() {
        let conn = Connection::open_in_memory().unwrap();
        schema::bootstrap(&conn).unwrap();
        let mgr = StagingManager::new(&conn);

        let stale = StagingManager::generate_run_id("20260101_000000");
        let current = StagingManager::generate_run_id("20260102_000000");
        mgr.create_staging_tables(&stale).unwrap();
        mgr.create_staging_tables(&current).unwrap();

        let dropped = mgr.cleanup_orphaned_staging(&current).unwrap();
        assert_eq!(dropped, 1);
        assert!(mgr.staging_stats(&stale).unwrap().is_empty());
        assert!(!mgr.staging_stats(&current).unwrap().is_empty());
    }

    #[test]
    fn rejects_unknown_staged_entity() {
        let conn = Connection::open_in_memory().unwrap();
        schema::bootstrap(&conn).unwrap();
        let mgr = StagingManager::new(&conn);
        assert!(mgr.staging_table_name("companies", "run_x").is_err());
    }
}
