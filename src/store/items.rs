// items.rs - Genome item catalog

use std::path::{Path, PathBuf};
use rusqlite::{params, OptionalExtension};
use crate::error::{StoreError, StoreResult};
use super::Store;

/// A registered input genome
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: i64,
    pub hash: String,
    pub path: PathBuf,
    pub description: String,
    pub length: u64,
}

/// Registry of input genomes keyed by (content hash, location)
#[derive(Debug, Clone)]
pub struct ItemCatalog {
    store: Store,
}

impl ItemCatalog {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Register a genome, returning the existing id if (hash, path) is already known
    pub fn register(
        &self,
        hash: &str,
        path: &Path,
        length: u64,
        description: &str,
    ) -> StoreResult<i64> {
        let location = path.to_string_lossy();
        let inserted = {
            let conn = self.store.conn()?;
            let result = conn
                .execute(
                    "INSERT INTO genomes (hash, path, description, length) VALUES (?1, ?2, ?3, ?4)",
                    params![hash, location, description, length as i64],
                )
                .map(|_| conn.last_insert_rowid());
            result
        };

        match inserted {
            Ok(id) => Ok(id),
            Err(e) => match StoreError::from_insert(e, format!("genome {} at {}", hash, location)) {
                StoreError::Conflict(_) => {
                    println!("⚠️  Genome already in database with this hash and path, reusing existing row");
                    self.find(hash, path)?.ok_or_else(|| {
                        StoreError::NotFound(format!("genome {} at {}", hash, location))
                    })
                }
                other => Err(other),
            },
        }
    }

    /// Look up a genome id by (hash, path)
    pub fn find(&self, hash: &str, path: &Path) -> StoreResult<Option<i64>> {
        let conn = self.store.conn()?;
        let id = conn
            .query_row(
                "SELECT genome_id FROM genomes WHERE hash = ?1 AND path = ?2",
                params![hash, path.to_string_lossy()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    pub fn get(&self, id: i64) -> StoreResult<Item> {
        let conn = self.store.conn()?;
        conn.query_row(
            "SELECT genome_id, hash, path, description, length FROM genomes WHERE genome_id = ?1",
            params![id],
            |row| {
                Ok(Item {
                    id: row.get(0)?,
                    hash: row.get(1)?,
                    path: PathBuf::from(row.get::<_, String>(2)?),
                    description: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    length: row.get::<_, i64>(4)? as u64,
                })
            },
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound(format!("genome {}", id)))
    }

    pub fn path_of(&self, id: i64) -> StoreResult<PathBuf> {
        Ok(self.get(id)?.path)
    }

    pub fn length_of(&self, id: i64) -> StoreResult<u64> {
        let conn = self.store.conn()?;
        let length: Option<i64> = conn
            .query_row(
                "SELECT length FROM genomes WHERE genome_id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        length
            .map(|l| l as u64)
            .ok_or_else(|| StoreError::NotFound(format!("genome {}", id)))
    }

    pub fn count(&self) -> StoreResult<usize> {
        let conn = self.store.conn()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM genomes", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        let catalog = ItemCatalog::new(Store::in_memory().unwrap());
        let path = Path::new("/data/genomes/a.fna");

        let first = catalog.register("abc123", path, 5000, "genome A").unwrap();
        let second = catalog.register("abc123", path, 5000, "genome A").unwrap();

        assert_eq!(first, second);
        assert_eq!(catalog.count().unwrap(), 1);
    }

    #[test]
    fn test_same_hash_different_location_is_new_item() {
        let catalog = ItemCatalog::new(Store::in_memory().unwrap());
        let a = catalog.register("abc123", Path::new("/x/a.fna"), 10, "a").unwrap();
        let b = catalog.register("abc123", Path::new("/y/a.fna"), 10, "a").unwrap();
        assert_ne!(a, b);
        assert_eq!(catalog.count().unwrap(), 2);
    }

    #[test]
    fn test_accessors() {
        let catalog = ItemCatalog::new(Store::in_memory().unwrap());
        let id = catalog.register("h", Path::new("/g/b.fna"), 4242, "genome B").unwrap();

        assert_eq!(catalog.path_of(id).unwrap(), PathBuf::from("/g/b.fna"));
        assert_eq!(catalog.length_of(id).unwrap(), 4242);
        assert_eq!(catalog.get(id).unwrap().description, "genome B");
        assert!(matches!(catalog.length_of(id + 100), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_concurrent_registration_yields_single_row() {
        let catalog = ItemCatalog::new(Store::in_memory().unwrap());
        let ids: Vec<i64> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let catalog = catalog.clone();
                    s.spawn(move || catalog.register("same", Path::new("/g/c.fna"), 1, "c").unwrap())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(catalog.count().unwrap(), 1);
    }
}
