use super::models::FileRecord;
use super::sqlite::Database;
use rusqlite::{params, params_from_iter, OptionalExtension, Result, Row};
use std::collections::HashMap;
use tracing::debug;

const FILE_RECORD_COLUMNS: &str =
    "fingerprint, path, file_name, file_size, modified_at, seen_flag";

fn row_to_record(row: &Row) -> Result<FileRecord> {
    Ok(FileRecord {
        fingerprint: row.get(0)?,
        path: row.get(1)?,
        file_name: row.get(2)?,
        file_size: row.get(3)?,
        modified_at: row.get(4)?,
        seen_flag: row.get(5)?,
    })
}

impl Database {
    // ── File records ─────────────────────────────────────────────

    /// Insert or update the record for a fingerprint. Any row holding the
    /// same path under a different fingerprint is removed in the same
    /// transaction, so a changed file replaces its old record instead of
    /// leaving it behind. Last write wins on fingerprint collision.
    pub fn upsert_file(&self, record: &FileRecord) -> Result<()> {
        let tx = self.connection().unchecked_transaction()?;
        tx.execute(
            "DELETE FROM file_record WHERE path = ?1 AND fingerprint != ?2",
            params![record.path, record.fingerprint],
        )?;
        tx.execute(
            "INSERT INTO file_record (fingerprint, path, file_name, file_size, modified_at, seen_flag) \
             VALUES (?1, ?2, ?3, ?4, ?5, 1) \
             ON CONFLICT(fingerprint) DO UPDATE SET \
                 path = excluded.path, \
                 file_name = excluded.file_name, \
                 file_size = excluded.file_size, \
                 modified_at = excluded.modified_at, \
                 seen_flag = 1",
            params![
                record.fingerprint,
                record.path,
                record.file_name,
                record.file_size,
                record.modified_at,
            ],
        )?;
        tx.commit()
    }

    /// Clear the liveness flag on every record in one bulk update. Each
    /// record must re-earn its flag during the pass that follows.
    pub fn mark_all_stale(&self) -> Result<usize> {
        self.connection().execute("UPDATE file_record SET seen_flag = 0", [])
    }

    /// Confirm that the file at `path` still exists on disk.
    pub fn mark_file_seen(&self, path: &str) -> Result<usize> {
        self.connection()
            .execute("UPDATE file_record SET seen_flag = 1 WHERE path = ?1", params![path])
    }

    /// Delete every record whose liveness flag was never re-set, returning
    /// the number of rows removed.
    pub fn delete_stale(&self) -> Result<usize> {
        let deleted = self
            .connection()
            .execute("DELETE FROM file_record WHERE seen_flag = 0", [])?;
        if deleted > 0 {
            debug!("Removed {} stale records", deleted);
        }
        Ok(deleted)
    }

    /// Bulk fetch of existing records for a batch of candidate paths: one
    /// query, keyed by path for the per-file change check.
    pub fn fetch_records_by_paths(&self, paths: &[String]) -> Result<HashMap<String, FileRecord>> {
        if paths.is_empty() {
            return Ok(HashMap::new());
        }
        let placeholders = vec!["?"; paths.len()].join(",");
        let sql = format!(
            "SELECT {FILE_RECORD_COLUMNS} FROM file_record WHERE path IN ({placeholders})"
        );
        let mut stmt = self.connection().prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(paths.iter()), row_to_record)?
            .collect::<Result<Vec<_>>>()?;
        Ok(records
            .into_iter()
            .map(|record| (record.path.clone(), record))
            .collect())
    }

    pub fn get_by_fingerprint(&self, fingerprint: &str) -> Result<Option<FileRecord>> {
        self.connection()
            .query_row(
                &format!("SELECT {FILE_RECORD_COLUMNS} FROM file_record WHERE fingerprint = ?1"),
                params![fingerprint],
                row_to_record,
            )
            .optional()
    }

    pub fn get_by_path(&self, path: &str) -> Result<Option<FileRecord>> {
        self.connection()
            .query_row(
                &format!("SELECT {FILE_RECORD_COLUMNS} FROM file_record WHERE path = ?1"),
                params![path],
                row_to_record,
            )
            .optional()
    }

    pub fn delete_by_path(&self, path: &str) -> Result<usize> {
        self.connection()
            .execute("DELETE FROM file_record WHERE path = ?1", params![path])
    }

    pub fn count_files(&self) -> Result<i64> {
        self.connection()
            .query_row("SELECT COUNT(*) FROM file_record", [], |row| row.get(0))
    }

    /// Paged listing, newest first, with optional substring search over
    /// filename and path. Returns the page and the total matching count.
    pub fn list_files(
        &self,
        search: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<FileRecord>, i64)> {
        match search.filter(|s| !s.is_empty()) {
            Some(term) => {
                let like = format!("%{}%", term);
                let total: i64 = self.connection().query_row(
                    "SELECT COUNT(*) FROM file_record WHERE file_name LIKE ?1 OR path LIKE ?1",
                    params![like],
                    |row| row.get(0),
                )?;
                let mut stmt = self.connection().prepare(&format!(
                    "SELECT {FILE_RECORD_COLUMNS} FROM file_record \
                     WHERE file_name LIKE ?1 OR path LIKE ?1 \
                     ORDER BY modified_at DESC LIMIT ?2 OFFSET ?3"
                ))?;
                let records = stmt
                    .query_map(params![like, limit, offset], row_to_record)?
                    .collect::<Result<Vec<_>>>()?;
                Ok((records, total))
            }
            None => {
                let total = self.count_files()?;
                let mut stmt = self.connection().prepare(&format!(
                    "SELECT {FILE_RECORD_COLUMNS} FROM file_record \
                     ORDER BY modified_at DESC LIMIT ?1 OFFSET ?2"
                ))?;
                let records = stmt
                    .query_map(params![limit, offset], row_to_record)?
                    .collect::<Result<Vec<_>>>()?;
                Ok((records, total))
            }
        }
    }

    // ── Monitored directories ────────────────────────────────────

    /// Register a root. Idempotent: returns false when it was already there.
    pub fn add_monitored_directory(&self, path: &str) -> Result<bool> {
        let inserted = self.connection().execute(
            "INSERT OR IGNORE INTO monitored_directory (path) VALUES (?1)",
            params![path],
        )?;
        Ok(inserted > 0)
    }

    /// Drop a root and every record under it, in one transaction. The match
    /// is component-wise (`/data` does not capture `/data2`). Idempotent;
    /// returns the number of file records removed.
    pub fn remove_monitored_directory(&self, path: &str) -> Result<usize> {
        let tx = self.connection().unchecked_transaction()?;
        tx.execute(
            "DELETE FROM monitored_directory WHERE path = ?1",
            params![path],
        )?;
        let removed = tx.execute(
            "DELETE FROM file_record WHERE path = ?1 OR path LIKE ?1 || '/%'",
            params![path],
        )?;
        tx.commit()?;
        Ok(removed)
    }

    pub fn list_monitored_directories(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .connection()
            .prepare("SELECT path FROM monitored_directory ORDER BY path")?;
        let paths = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>>>()?;
        Ok(paths)
    }

    // ── Ignore patterns ──────────────────────────────────────────

    pub fn ignore_patterns(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .connection()
            .prepare("SELECT pattern FROM ignore_pattern ORDER BY id")?;
        let patterns = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>>>()?;
        Ok(patterns)
    }

    /// Replace the whole pattern set in one transaction. Blank entries are
    /// dropped, duplicates collapse.
    pub fn set_ignore_patterns(&self, patterns: &[String]) -> Result<()> {
        let tx = self.connection().unchecked_transaction()?;
        tx.execute("DELETE FROM ignore_pattern", [])?;
        {
            let mut stmt =
                tx.prepare_cached("INSERT OR IGNORE INTO ignore_pattern (pattern) VALUES (?1)")?;
            for pattern in patterns {
                let pattern = pattern.trim();
                if !pattern.is_empty() {
                    stmt.execute(params![pattern])?;
                }
            }
        }
        tx.commit()
    }
}
