// mod.rs - Persistent store handle and component modules

pub mod comparisons;
pub mod items;
pub mod runs;
pub mod schema;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use rusqlite::Connection;
use crate::error::{StoreError, StoreResult};

// Re-export main types for convenience
pub use comparisons::{Comparison, ComparisonKey, ComparisonStore};
pub use items::{Item, ItemCatalog};
pub use runs::{MetadataKind, Run, RunRegistry, RunStatus};

/// Cloneable handle to the SQLite database shared by every store component.
///
/// All mutations go through the single connection behind the mutex, so each
/// statement is atomic with respect to the other components and threads.
#[derive(Debug, Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open an existing database (the schema is created if missing)
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::initialize(conn)
    }

    /// Create a fresh database file, refusing to overwrite unless `force` is set
    pub fn create(path: &Path, force: bool) -> StoreResult<Self> {
        if path.exists() {
            if !force {
                return Err(StoreError::AlreadyExists(path.to_path_buf()));
            }
            std::fs::remove_file(path)?;
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                println!("📁 Creating database directory {}", parent.display());
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::open(path)
    }

    /// In-memory database, used by tests
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(conn)
    }

    fn initialize(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        if let Err(e) = conn.execute_batch("PRAGMA journal_mode = WAL;") {
            eprintln!("⚠️  Could not enable WAL journal, using the default: {}", e);
        }
        conn.execute_batch(schema::SCHEMA_SQL)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}
