// comparisons.rs - Immutable memoization table of pairwise results

use rusqlite::{params, OptionalExtension, Row};
use crate::error::{StoreError, StoreResult};
use super::Store;

/// Unique identity of a stored comparison (memoization key)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComparisonKey {
    pub item_a: i64,
    pub item_b: i64,
    pub program: String,
    pub version: String,
    pub params: String,
}

impl ComparisonKey {
    pub fn new(item_a: i64, item_b: i64, program: &str, version: &str, params: &str) -> Self {
        Self {
            item_a,
            item_b,
            program: program.to_string(),
            version: version.to_string(),
            params: params.to_string(),
        }
    }
}

/// One directional comparison result; `coverage_a` is relative to `key.item_a`
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub key: ComparisonKey,
    pub aligned_length: u64,
    pub sim_errors: u64,
    pub identity: f64,
    pub coverage_a: f64,
    pub coverage_b: f64,
}

impl Comparison {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            key: ComparisonKey {
                item_a: row.get(0)?,
                item_b: row.get(1)?,
                program: row.get(2)?,
                version: row.get(3)?,
                params: row.get(4)?,
            },
            aligned_length: row.get::<_, i64>(5)? as u64,
            sim_errors: row.get::<_, i64>(6)? as u64,
            identity: row.get(7)?,
            coverage_a: row.get(8)?,
            coverage_b: row.get(9)?,
        })
    }
}

const SELECT_COLUMNS: &str = "c.query_id, c.subject_id, c.program, c.version, c.params, \
     c.aln_length, c.sim_errs, c.identity, c.cov_query, c.cov_subject";

/// Content-addressed comparison results plus their run links
#[derive(Debug, Clone)]
pub struct ComparisonStore {
    store: Store,
}

impl ComparisonStore {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Memoized result for `key`, if one was ever committed
    pub fn lookup(&self, key: &ComparisonKey) -> StoreResult<Option<Comparison>> {
        let conn = self.store.conn()?;
        let sql = format!(
            "SELECT {} FROM comparisons c WHERE c.query_id = ?1 AND c.subject_id = ?2 \
             AND c.program = ?3 AND c.version = ?4 AND c.params = ?5",
            SELECT_COLUMNS
        );
        let found = conn
            .query_row(
                &sql,
                params![key.item_a, key.item_b, key.program, key.version, key.params],
                Comparison::from_row,
            )
            .optional()?;
        Ok(found)
    }

    /// Insert a new result; `StoreError::Conflict` if the key already exists
    pub fn insert(&self, comparison: &Comparison) -> StoreResult<i64> {
        let key = &comparison.key;
        let conn = self.store.conn()?;
        let result = conn.execute(
            "INSERT INTO comparisons (query_id, subject_id, aln_length, sim_errs, identity, \
             cov_query, cov_subject, program, version, params) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                key.item_a,
                key.item_b,
                comparison.aligned_length as i64,
                comparison.sim_errors as i64,
                comparison.identity,
                comparison.coverage_a,
                comparison.coverage_b,
                key.program,
                key.version,
                key.params,
            ],
        );
        match result {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(e) => Err(StoreError::from_insert(
                e,
                format!("comparison {} vs {}", key.item_a, key.item_b),
            )),
        }
    }

    /// Associate a stored comparison with a run; repeated links are ignored
    pub fn link_to_run(&self, run_id: i64, key: &ComparisonKey) -> StoreResult<()> {
        let conn = self.store.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO runs_comparisons \
             (run_id, query_id, subject_id, program, version, params) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![run_id, key.item_a, key.item_b, key.program, key.version, key.params],
        )
        .map_err(|e| {
            StoreError::from_reference(
                e,
                format!("comparison {} vs {} for run {}", key.item_a, key.item_b, run_id),
            )
        })?;
        Ok(())
    }

    /// All comparisons linked to a run, ordered by item ids
    pub fn comparisons_for_run(&self, run_id: i64) -> StoreResult<Vec<Comparison>> {
        let conn = self.store.conn()?;
        let sql = format!(
            "SELECT {} FROM comparisons c JOIN runs_comparisons r \
             ON c.query_id = r.query_id AND c.subject_id = r.subject_id \
             AND c.program = r.program AND c.version = r.version AND c.params = r.params \
             WHERE r.run_id = ?1 ORDER BY c.query_id, c.subject_id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![run_id], Comparison::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count(&self) -> StoreResult<usize> {
        let conn = self.store.conn()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM comparisons", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}
