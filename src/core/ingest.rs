// ingest.rs - Turn finished alignment artifacts into stored comparisons

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use crate::core::nucmer::parse_delta;
use crate::error::{ComputationError, StoreError};
use crate::jobs::ComparisonUnit;
use crate::store::{Comparison, ComparisonKey, ComparisonStore, ItemCatalog};

/// What happened to one unit during ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// This call inserted the row
    Committed,
    /// Another writer inserted the same key first; its row was linked instead
    Existing,
}

/// Per-batch ingestion totals
#[derive(Debug, Default)]
pub struct IngestReport {
    pub committed: usize,
    pub existing: usize,
    pub failures: Vec<(ComparisonKey, ComputationError)>,
}

impl IngestReport {
    pub fn succeeded(&self) -> usize {
        self.committed + self.existing
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Derive identity and coverages from an alignment summary.
///
/// Zero aligned length is degenerate; a zero item length yields zero coverage.
pub fn derive_metrics(
    key: &ComparisonKey,
    aligned_length: u64,
    sim_errors: u64,
    length_a: u64,
    length_b: u64,
) -> Result<Comparison, ComputationError> {
    if aligned_length == 0 {
        return Err(ComputationError::DegenerateAlignment {
            item_a: key.item_a,
            item_b: key.item_b,
        });
    }
    let coverage = |length: u64| {
        if length == 0 {
            0.0
        } else {
            aligned_length as f64 / length as f64
        }
    };
    Ok(Comparison {
        key: key.clone(),
        aligned_length,
        sim_errors,
        identity: 1.0 - sim_errors as f64 / aligned_length as f64,
        coverage_a: coverage(length_a),
        coverage_b: coverage(length_b),
    })
}

/// Parses unit artifacts and commits the derived comparisons, first writer wins
#[derive(Debug, Clone)]
pub struct ResultIngester {
    catalog: ItemCatalog,
    comparisons: ComparisonStore,
}

impl ResultIngester {
    pub fn new(catalog: ItemCatalog, comparisons: ComparisonStore) -> Self {
        Self { catalog, comparisons }
    }

    /// Ingest one unit and link its comparison to `run_id`
    pub fn ingest_unit(&self, run_id: i64, unit: &ComparisonUnit) -> Result<IngestOutcome, ComputationError> {
        let (aligned_length, sim_errors) = parse_delta(&unit.artifact)?;
        let length_a = self.catalog.length_of(unit.key.item_a)?;
        let length_b = self.catalog.length_of(unit.key.item_b)?;
        let comparison = derive_metrics(&unit.key, aligned_length, sim_errors, length_a, length_b)?;

        let outcome = match self.comparisons.insert(&comparison) {
            Ok(_) => IngestOutcome::Committed,
            Err(e) if e.is_conflict() => {
                // Lost the race; the stored row is authoritative
                if self.comparisons.lookup(&unit.key)?.is_none() {
                    return Err(StoreError::NotFound(format!(
                        "comparison {} vs {} after insert conflict",
                        unit.key.item_a, unit.key.item_b
                    ))
                    .into());
                }
                IngestOutcome::Existing
            }
            Err(e) => return Err(e.into()),
        };
        self.comparisons.link_to_run(run_id, &unit.key)?;
        Ok(outcome)
    }

    /// Ingest every unit in parallel.
    ///
    /// Units whose jobs did not complete are reported as failures without
    /// touching their artifacts. A failing unit never stops the others.
    pub fn ingest_all(&self, run_id: i64, units: &[ComparisonUnit]) -> IngestReport {
        let pb = ProgressBar::new(units.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {per_sec} ETA: {eta}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let results: Vec<(ComparisonKey, Result<IngestOutcome, ComputationError>)> = units
            .par_iter()
            .map(|unit| {
                let result = if unit.state.is_complete() {
                    self.ingest_unit(run_id, unit)
                } else {
                    Err(ComputationError::Incomplete {
                        artifact: unit.artifact.clone(),
                        state: unit.state.to_string(),
                    })
                };
                pb.inc(1);
                (unit.key.clone(), result)
            })
            .collect();
        pb.finish_and_clear();

        let mut report = IngestReport::default();
        for (key, result) in results {
            match result {
                Ok(IngestOutcome::Committed) => report.committed += 1,
                Ok(IngestOutcome::Existing) => report.existing += 1,
                Err(e) => report.failures.push((key, e)),
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::nucmer::NucmerTool;
    use crate::jobs::JobState;
    use crate::store::{Item, Store};
    use std::path::Path;

    struct Fixture {
        catalog: ItemCatalog,
        comparisons: ComparisonStore,
        run_id: i64,
        tool: NucmerTool,
    }

    fn fixture() -> Fixture {
        let store = Store::in_memory().unwrap();
        let catalog = ItemCatalog::new(store.clone());
        let comparisons = ComparisonStore::new(store.clone());
        let run_id = crate::store::RunRegistry::new(store.clone())
            .create_run("ANIm", "test", "2026-01-01 00:00:00", "t")
            .unwrap();
        Fixture {
            catalog,
            comparisons,
            run_id,
            tool: NucmerTool::new("nucmer", "delta-filter", false, false, "3.1"),
        }
    }

    fn register(f: &Fixture, name: &str, length: u64) -> Item {
        let path = Path::new("/g").join(format!("{}.fna", name));
        let id = f.catalog.register(name, &path, length, name).unwrap();
        f.catalog.get(id).unwrap()
    }

    /// Plan a unit and write a filter artifact with one alignment of `aligned` bases
    fn unit_with_artifact(f: &Fixture, dir: &Path, idx: usize, a: &Item, b: &Item, aligned: u64, errors: u64) -> ComparisonUnit {
        std::fs::create_dir_all(f.tool.output_dir(dir)).unwrap();
        let mut unit = f.tool.plan_unit("ANIm", idx, dir, a, b);
        let body = if aligned == 0 {
            "NUCMER\n".to_string()
        } else {
            format!("NUCMER\n>c1 c2 100 100\n1 {} 1 {} {} {} 0\n0\n", aligned + 1, aligned + 1, errors, errors)
        };
        std::fs::write(&unit.artifact, body).unwrap();
        unit.state = JobState::Done;
        unit
    }

    #[test]
    fn test_derive_metrics() {
        let key = ComparisonKey::new(1, 2, "nucmer", "3.1", "mum");
        let c = derive_metrics(&key, 1000, 20, 2000, 0).unwrap();
        assert!((c.identity - 0.98).abs() < 1e-12);
        assert!((c.coverage_a - 0.5).abs() < 1e-12);
        assert_eq!(c.coverage_b, 0.0);

        assert!(matches!(
            derive_metrics(&key, 0, 0, 10, 10),
            Err(ComputationError::DegenerateAlignment { item_a: 1, item_b: 2 })
        ));
    }

    #[test]
    fn test_degenerate_pair_fails_alone() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let (x, y, z) = (register(&f, "x", 1000), register(&f, "y", 1000), register(&f, "z", 1000));
        let units = vec![
            unit_with_artifact(&f, dir.path(), 0, &x, &y, 0, 0),
            unit_with_artifact(&f, dir.path(), 1, &x, &z, 900, 9),
            unit_with_artifact(&f, dir.path(), 2, &y, &z, 800, 8),
        ];

        let report = ResultIngester::new(f.catalog.clone(), f.comparisons.clone()).ingest_all(f.run_id, &units);
        assert_eq!(report.committed, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, units[0].key);
        assert!(matches!(report.failures[0].1, ComputationError::DegenerateAlignment { .. }));
        assert_eq!(f.comparisons.comparisons_for_run(f.run_id).unwrap().len(), 2);
    }

    #[test]
    fn test_concurrent_ingestion_keeps_one_row_per_key() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let (a, b, c) = (register(&f, "a", 1000), register(&f, "b", 1000), register(&f, "c", 1000));
        let ab = unit_with_artifact(&f, dir.path(), 0, &a, &b, 980, 20);
        let ac = unit_with_artifact(&f, dir.path(), 1, &a, &c, 970, 30);

        // Each pair is ingested by several writers at once
        let units: Vec<ComparisonUnit> = (0..6)
            .map(|i| if i % 2 == 0 { ab.clone() } else { ac.clone() })
            .collect();
        let ingester = ResultIngester::new(f.catalog.clone(), f.comparisons.clone());
        let report = ingester.ingest_all(f.run_id, &units);

        assert!(report.is_clean());
        assert_eq!(report.committed, 2);
        assert_eq!(report.existing, 4);
        assert_eq!(f.comparisons.count().unwrap(), 2);
        assert_eq!(f.comparisons.comparisons_for_run(f.run_id).unwrap().len(), 2);
    }

    #[test]
    fn test_incomplete_units_are_not_parsed() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let (a, b) = (register(&f, "a", 1000), register(&f, "b", 1000));
        let mut unit = unit_with_artifact(&f, dir.path(), 0, &a, &b, 500, 5);
        unit.state = JobState::Skipped;

        let report = ResultIngester::new(f.catalog.clone(), f.comparisons.clone()).ingest_all(f.run_id, &[unit]);
        assert_eq!(report.succeeded(), 0);
        assert!(matches!(report.failures[0].1, ComputationError::Incomplete { .. }));
        assert_eq!(f.comparisons.count().unwrap(), 0);
    }
}
