// runs.rs - Analysis run registry

use std::fmt;
use std::str::FromStr;
use rusqlite::{params, OptionalExtension};
use crate::error::{StoreError, StoreResult};
use super::Store;

/// Lifecycle status recorded on a run row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Started,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Started => "started",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "started" => Ok(RunStatus::Started),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            _ => Err(format!("Unknown run status: {}", s)),
        }
    }
}

/// Which per-run metadata table a value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataKind {
    Class,
    Label,
}

impl MetadataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataKind::Class => "class",
            MetadataKind::Label => "label",
        }
    }

    /// Table and value column
    fn table(&self) -> (&'static str, &'static str) {
        match self {
            MetadataKind::Class => ("classes", "class"),
            MetadataKind::Label => ("labels", "label"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub id: i64,
    pub method: String,
    pub cmdline: String,
    pub timestamp: String,
    pub status: RunStatus,
    pub name: String,
}

/// Run metadata and genome membership
#[derive(Debug, Clone)]
pub struct RunRegistry {
    store: Store,
}

impl RunRegistry {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Record a new run with status "started"
    pub fn create_run(
        &self,
        method: &str,
        cmdline: &str,
        timestamp: &str,
        name: &str,
    ) -> StoreResult<i64> {
        let conn = self.store.conn()?;
        conn.execute(
            "INSERT INTO runs (method, cmdline, date, status, name) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![method, cmdline, timestamp, RunStatus::Started.as_str(), name],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn add_item_to_run(&self, run_id: i64, item_id: i64) -> StoreResult<()> {
        let conn = self.store.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO runs_genomes (run_id, genome_id) VALUES (?1, ?2)",
            params![run_id, item_id],
        )?;
        Ok(())
    }

    /// Member genome ids, in ascending id order
    pub fn item_ids(&self, run_id: i64) -> StoreResult<Vec<i64>> {
        let conn = self.store.conn()?;
        let mut stmt = conn.prepare(
            "SELECT genome_id FROM runs_genomes WHERE run_id = ?1 ORDER BY genome_id",
        )?;
        let ids = stmt
            .query_map(params![run_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    pub fn get(&self, run_id: i64) -> StoreResult<Run> {
        let conn = self.store.conn()?;
        let row = conn
            .query_row(
                "SELECT run_id, method, cmdline, date, status, name FROM runs WHERE run_id = ?1",
                params![run_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Option<String>>(5)?,
                    ))
                },
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("run {}", run_id)))?;

        let (id, method, cmdline, timestamp, status, name) = row;
        let status = status
            .parse::<RunStatus>()
            .map_err(|e: String| StoreError::NotFound(format!("run {} status: {}", run_id, e)))?;
        Ok(Run {
            id,
            method,
            cmdline: cmdline.unwrap_or_default(),
            timestamp,
            status,
            name: name.unwrap_or_default(),
        })
    }

    pub fn set_status(&self, run_id: i64, status: RunStatus) -> StoreResult<()> {
        let conn = self.store.conn()?;
        let changed = conn.execute(
            "UPDATE runs SET status = ?1 WHERE run_id = ?2",
            params![status.as_str(), run_id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("run {}", run_id)));
        }
        Ok(())
    }

    /// Set a genome's class or label within a run; a later value replaces an earlier one
    pub fn set_metadata(
        &self,
        kind: MetadataKind,
        run_id: i64,
        item_id: i64,
        value: &str,
    ) -> StoreResult<()> {
        let (table, column) = kind.table();
        let conn = self.store.conn()?;
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {} (genome_id, run_id, {}) VALUES (?1, ?2, ?3)",
                table, column
            ),
            params![item_id, run_id, value],
        )
        .map_err(|e| {
            StoreError::from_reference(e, format!("genome {} or run {}", item_id, run_id))
        })?;
        Ok(())
    }

    /// `(genome_id, value)` pairs for a run, in ascending genome id order
    pub fn metadata(&self, kind: MetadataKind, run_id: i64) -> StoreResult<Vec<(i64, String)>> {
        let (table, column) = kind.table();
        let conn = self.store.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT genome_id, {} FROM {} WHERE run_id = ?1 ORDER BY genome_id",
            column, table
        ))?;
        let rows = stmt
            .query_map(params![run_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<(i64, String)>, _>>()?;
        Ok(rows)
    }
}
