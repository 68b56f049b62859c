// orchestrator.rs - One ANIm invocation from genome registration to stored results

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;
use chrono::Local;
use crate::core::ingest::{IngestReport, ResultIngester};
use crate::core::nucmer::{NucmerTool, ALIGN_DIR};
use crate::core::recovery::RecoveryReconciler;
use crate::data::{read_metadata, GenomeInfo};
use crate::error::OrchestratorError;
use crate::jobs::{ComparisonUnit, JobGraph, JobState};
use crate::scheduler::Scheduler;
use crate::store::{ComparisonStore, ItemCatalog, MetadataKind, RunRegistry, RunStatus, Store};

/// Per-invocation settings
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub method: String,
    /// Run name; `<method>_<timestamp>` when absent
    pub name: Option<String>,
    pub cmdline: String,
    pub outdir: PathBuf,
    pub recovery: bool,
    pub job_prefix: String,
    /// `<hash>\t<stem>\t<class>` file applied to this run's genomes
    pub classes: Option<PathBuf>,
    /// `<hash>\t<stem>\t<label>` file applied to this run's genomes
    pub labels: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            method: "ANIm".to_string(),
            name: None,
            cmdline: String::new(),
            outdir: PathBuf::from("anim_output"),
            recovery: false,
            job_prefix: "ANIm".to_string(),
            classes: None,
            labels: None,
        }
    }
}

/// Outcome of one invocation
#[derive(Debug)]
pub struct RunSummary {
    pub run_id: i64,
    pub name: String,
    pub genomes: usize,
    pub pairs: usize,
    /// Pairs answered from the store without planning any job
    pub memoized: usize,
    /// Pairs whose artifact was already on disk
    pub recovered: usize,
    pub jobs_submitted: usize,
    pub job_failures: usize,
    pub ingest: IngestReport,
    pub status: RunStatus,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

/// Drives registration, planning, recovery, execution and ingestion for a run.
///
/// Every store component is built from the same explicit `Store` handle.
#[derive(Debug)]
pub struct Orchestrator {
    catalog: ItemCatalog,
    runs: RunRegistry,
    comparisons: ComparisonStore,
    tool: NucmerTool,
    scheduler: Scheduler,
    config: AnalysisConfig,
}

impl Orchestrator {
    pub fn new(store: &Store, tool: NucmerTool, scheduler: Scheduler, config: AnalysisConfig) -> Self {
        Self {
            catalog: ItemCatalog::new(store.clone()),
            runs: RunRegistry::new(store.clone()),
            comparisons: ComparisonStore::new(store.clone()),
            tool,
            scheduler,
            config,
        }
    }

    pub fn align_dir(&self) -> PathBuf {
        self.config.outdir.join(ALIGN_DIR)
    }

    /// Compare every unordered pair of `genomes` and record the run.
    ///
    /// Job and per-pair failures mark the run failed but never discard
    /// comparisons that did succeed. Fewer than two genomes still records a
    /// run, with zero pairs.
    pub fn run(&self, genomes: &[GenomeInfo]) -> Result<RunSummary, OrchestratorError> {
        let output_dir = self.tool.output_dir(&self.align_dir());
        std::fs::create_dir_all(&output_dir).map_err(|source| OrchestratorError::OutputDir {
            path: output_dir.clone(),
            source,
        })?;

        let now = Local::now();
        let name = self.config.name.clone().unwrap_or_else(|| {
            format!("{}_{}", self.config.method, now.format("%Y-%m-%d_%H-%M-%S"))
        });
        let run_id = self.runs.create_run(
            &self.config.method,
            &self.config.cmdline,
            &now.format("%Y-%m-%d %H:%M:%S").to_string(),
            &name,
        )?;
        println!("🚀 Started run {} ({})", run_id, name);

        match self.execute_run(run_id, &name, genomes) {
            Ok(summary) => {
                self.runs.set_status(run_id, summary.status)?;
                Ok(summary)
            }
            Err(e) => {
                // The original error is returned either way
                if let Err(status_err) = self.runs.set_status(run_id, RunStatus::Failed) {
                    eprintln!("⚠️  Could not mark run {} as failed: {}", run_id, status_err);
                }
                Err(e)
            }
        }
    }

    fn execute_run(&self, run_id: i64, name: &str, genomes: &[GenomeInfo]) -> Result<RunSummary, OrchestratorError> {
        let start = Instant::now();

        let mut by_hash: HashMap<&str, Vec<i64>> = HashMap::new();
        for genome in genomes {
            let id = self
                .catalog
                .register(&genome.hash, &genome.path, genome.length, &genome.description)?;
            self.runs.add_item_to_run(run_id, id)?;
            by_hash.entry(genome.hash.as_str()).or_default().push(id);
        }
        let item_ids = self.runs.item_ids(run_id)?;
        println!("🧬 Registered {} genomes", item_ids.len());

        if let Some(path) = &self.config.classes {
            self.apply_metadata(run_id, MetadataKind::Class, path, &by_hash)?;
        }
        if let Some(path) = &self.config.labels {
            self.apply_metadata(run_id, MetadataKind::Label, path, &by_hash)?;
        }

        // Lower id is always the query; the reverse direction is never stored
        let pairs: Vec<(i64, i64)> = item_ids
            .iter()
            .enumerate()
            .flat_map(|(i, a)| item_ids[i + 1..].iter().map(move |b| (*a, *b)))
            .collect();

        let mut memoized = 0;
        let mut planned = Vec::new();
        let align_dir = self.align_dir();
        for (a, b) in &pairs {
            let key = self.tool.key(*a, *b);
            if self.comparisons.lookup(&key)?.is_some() {
                self.comparisons.link_to_run(run_id, &key)?;
                memoized += 1;
                continue;
            }
            let item_a = self.catalog.get(*a)?;
            let item_b = self.catalog.get(*b)?;
            planned.push(self.tool.plan_unit(
                &self.config.job_prefix,
                planned.len(),
                &align_dir,
                &item_a,
                &item_b,
            ));
        }
        println!(
            "📊 {} pairs: {} already in database, {} to compute",
            pairs.len(),
            memoized,
            planned.len()
        );

        let reconciliation = RecoveryReconciler::new(self.config.recovery).reconcile(planned);
        let recovered = reconciliation.satisfied_count();
        if self.config.recovery {
            println!("♻️  Recovery: {} existing outputs reused", recovered);
        }

        let mut graph = JobGraph::from_units(reconciliation.to_run())?;
        let jobs_submitted = graph.len();
        let job_failures = if graph.is_empty() {
            0
        } else {
            println!(
                "⚡ Running {} jobs on {}",
                jobs_submitted,
                self.scheduler.description()
            );
            self.scheduler.execute(&mut graph)?
        };
        if job_failures > 0 {
            eprintln!("⚠️  {} jobs failed or were skipped", job_failures);
        }

        let units: Vec<ComparisonUnit> = reconciliation
            .units
            .into_iter()
            .map(|mut unit| {
                if unit.state == JobState::Pending {
                    unit.state = producing_job_state(&graph, &unit);
                }
                unit
            })
            .collect();

        let ingester = ResultIngester::new(self.catalog.clone(), self.comparisons.clone());
        let ingest = ingester.ingest_all(run_id, &units);
        for (key, error) in &ingest.failures {
            eprintln!("❌ Comparison {} vs {} failed: {}", key.item_a, key.item_b, error);
        }

        let status = if job_failures == 0 && ingest.is_clean() {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
        println!(
            "✅ Stored {} new comparisons ({} written concurrently elsewhere) in {:.2}s",
            ingest.committed,
            ingest.existing,
            start.elapsed().as_secs_f64()
        );

        Ok(RunSummary {
            run_id,
            name: name.to_string(),
            genomes: item_ids.len(),
            pairs: pairs.len(),
            memoized,
            recovered,
            jobs_submitted,
            job_failures,
            ingest,
            status,
        })
    }

    /// Attach class or label values to the run's genomes, matched by hash
    fn apply_metadata(
        &self,
        run_id: i64,
        kind: MetadataKind,
        path: &std::path::Path,
        by_hash: &HashMap<&str, Vec<i64>>,
    ) -> Result<(), OrchestratorError> {
        let entries = read_metadata(path).map_err(OrchestratorError::Input)?;
        let mut applied = 0;
        for entry in &entries {
            match by_hash.get(entry.hash.as_str()) {
                Some(ids) => {
                    for id in ids {
                        self.runs.set_metadata(kind, run_id, *id, &entry.value)?;
                        applied += 1;
                    }
                }
                None => eprintln!(
                    "⚠️  {}: no genome in this run has hash {} ({})",
                    path.display(),
                    entry.hash,
                    entry.stem
                ),
            }
        }
        println!("🏷️  Applied {} {} values from {}", applied, kind.as_str(), path.display());
        Ok(())
    }
}

/// State of the job that writes the unit's ingested artifact
fn producing_job_state(graph: &JobGraph, unit: &ComparisonUnit) -> JobState {
    let producer = if unit.artifact == unit.align.artifact {
        &unit.align
    } else {
        &unit.filter
    };
    graph
        .index_of(&producer.id)
        .map(|idx| graph.state(idx))
        .unwrap_or(JobState::Skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{Job, Stage};
    use crate::scheduler::{ArrayBatch, ClusterScheduler, JobExecutor, QueueSubmitter, WorkerPoolScheduler};
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    /// Writes synthetic delta files instead of running NUCmer.
    ///
    /// Alignments are keyed by output stem (`1_a_vs_2_b`) as (aligned length, errors);
    /// align jobs for stems in `failing` exit with an error.
    #[derive(Debug, Default)]
    struct FakeNucmer {
        alignments: HashMap<String, (u64, u64)>,
        failing: Vec<String>,
        executed: Mutex<Vec<String>>,
    }

    impl FakeNucmer {
        fn with(alignments: &[(&str, u64, u64)]) -> Self {
            Self {
                alignments: alignments
                    .iter()
                    .map(|(stem, aln, errs)| (stem.to_string(), (*aln, *errs)))
                    .collect(),
                ..Default::default()
            }
        }

        fn executed(&self) -> usize {
            self.executed.lock().unwrap().len()
        }
    }

    fn stem_of(path: &Path) -> String {
        path.file_stem().unwrap().to_string_lossy().to_string()
    }

    impl JobExecutor for FakeNucmer {
        fn execute(&self, job: &Job) -> Result<(), String> {
            self.executed.lock().unwrap().push(job.id.clone());
            let stem = stem_of(&job.artifact);
            match job.stage {
                Stage::Align => {
                    if self.failing.contains(&stem) {
                        return Err("nucmer exited with status 1".to_string());
                    }
                    let (aln, errs) = self.alignments.get(&stem).copied().unwrap_or((0, 0));
                    let body = if aln == 0 {
                        "NUCMER\n".to_string()
                    } else {
                        format!("NUCMER\n>c1 c2 9 9\n1 {} 1 {} {} {} 0\n0\n", aln + 1, aln + 1, errs, errs)
                    };
                    std::fs::write(&job.artifact, body).map_err(|e| e.to_string())
                }
                Stage::Filter => {
                    let delta = job.artifact.with_file_name(format!("{}.delta", stem));
                    std::fs::copy(&delta, &job.artifact)
                        .map(|_| ())
                        .map_err(|e| e.to_string())
                }
            }
        }
    }

    fn genome(name: &str) -> GenomeInfo {
        GenomeInfo {
            hash: format!("md5-{}", name),
            path: PathBuf::from(format!("/genomes/{}.fna", name)),
            description: format!("{} chromosome", name),
            length: 1000,
        }
    }

    fn config(outdir: &Path, recovery: bool) -> AnalysisConfig {
        AnalysisConfig {
            outdir: outdir.to_path_buf(),
            recovery,
            cmdline: "anicore test".to_string(),
            ..Default::default()
        }
    }

    fn mum_tool() -> NucmerTool {
        NucmerTool::new("nucmer", "delta-filter", false, false, "3.1")
    }

    fn orchestrator(store: &Store, outdir: &Path, executor: Arc<FakeNucmer>, recovery: bool) -> Orchestrator {
        let scheduler = Scheduler::WorkerPool(WorkerPoolScheduler::new(Some(2), executor));
        Orchestrator::new(store, mum_tool(), scheduler, config(outdir, recovery))
    }

    /// Accepts every batch without running anything
    #[derive(Debug)]
    struct IdleQueue;

    impl QueueSubmitter for IdleQueue {
        fn submit(&self, _batch: &ArrayBatch) -> Result<(), String> {
            Ok(())
        }
    }

    fn identities(store: &Store, run_id: i64) -> Vec<f64> {
        ComparisonStore::new(store.clone())
            .comparisons_for_run(run_id)
            .unwrap()
            .iter()
            .map(|c| (c.identity * 100.0).round() / 100.0)
            .collect()
    }

    #[test]
    fn test_second_run_reuses_memoized_comparisons() {
        let store = Store::in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(FakeNucmer::with(&[
            ("1_a_vs_2_b", 1000, 20),
            ("1_a_vs_3_c", 1000, 30),
            ("2_b_vs_3_c", 1000, 50),
        ]));
        let genomes = vec![genome("a"), genome("b"), genome("c")];

        let first = orchestrator(&store, dir.path(), executor.clone(), false)
            .run(&genomes)
            .unwrap();
        assert!(first.is_success());
        assert_eq!(first.pairs, 3);
        assert_eq!(first.jobs_submitted, 6);
        assert_eq!(first.ingest.committed, 3);
        assert_eq!(identities(&store, first.run_id), vec![0.98, 0.97, 0.95]);

        let second = orchestrator(&store, dir.path(), executor.clone(), false)
            .run(&genomes)
            .unwrap();
        assert!(second.is_success());
        assert_eq!(second.memoized, 3);
        assert_eq!(second.jobs_submitted, 0);
        assert_eq!(executor.executed(), 6);
        assert_eq!(identities(&store, second.run_id), vec![0.98, 0.97, 0.95]);
        assert_eq!(ComparisonStore::new(store.clone()).count().unwrap(), 3);
        assert_eq!(ItemCatalog::new(store.clone()).count().unwrap(), 3);
    }

    #[test]
    fn test_recovery_skips_existing_outputs_but_ingests_them() {
        let store = Store::in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(FakeNucmer::with(&[("1_a_vs_3_c", 900, 9), ("2_b_vs_3_c", 800, 8)]));
        let output_dir = mum_tool().output_dir(&dir.path().join(ALIGN_DIR));
        std::fs::create_dir_all(&output_dir).unwrap();
        std::fs::write(
            output_dir.join("1_a_vs_2_b.filter"),
            "NUCMER\n>c1 c2 9 9\n1 1001 1 1001 10 10 0\n0\n",
        )
        .unwrap();

        let summary = orchestrator(&store, dir.path(), executor.clone(), true)
            .run(&[genome("a"), genome("b"), genome("c")])
            .unwrap();
        assert!(summary.is_success());
        assert_eq!(summary.recovered, 1);
        assert_eq!(summary.jobs_submitted, 4);
        assert_eq!(executor.executed(), 4);
        assert_eq!(summary.ingest.committed, 3);
        assert_eq!(identities(&store, summary.run_id)[0], 0.99);
    }

    #[test]
    fn test_degenerate_pair_fails_run_but_keeps_others() {
        let store = Store::in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        // x_vs_y has no alignments at all
        let executor = Arc::new(FakeNucmer::with(&[("1_x_vs_3_z", 950, 5), ("2_y_vs_3_z", 940, 6)]));

        let summary = orchestrator(&store, dir.path(), executor, false)
            .run(&[genome("x"), genome("y"), genome("z")])
            .unwrap();
        assert!(!summary.is_success());
        assert_eq!(summary.job_failures, 0);
        assert_eq!(summary.ingest.committed, 2);
        assert_eq!(summary.ingest.failures.len(), 1);
        assert_eq!(
            RunRegistry::new(store.clone()).get(summary.run_id).unwrap().status,
            RunStatus::Failed
        );
        assert_eq!(identities(&store, summary.run_id).len(), 2);
    }

    #[test]
    fn test_failed_job_marks_run_failed() {
        let store = Store::in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut fake = FakeNucmer::with(&[
            ("1_a_vs_2_b", 1000, 20),
            ("1_a_vs_3_c", 1000, 30),
            ("2_b_vs_3_c", 1000, 50),
        ]);
        fake.failing.push("1_a_vs_3_c".to_string());
        let executor = Arc::new(fake);

        let summary = orchestrator(&store, dir.path(), executor.clone(), false)
            .run(&[genome("a"), genome("b"), genome("c")])
            .unwrap();
        assert_eq!(summary.status, RunStatus::Failed);
        // The failed align and its skipped filter
        assert_eq!(summary.job_failures, 2);
        assert_eq!(executor.executed(), 5);
        assert_eq!(summary.ingest.committed, 2);
        assert_eq!(identities(&store, summary.run_id), vec![0.98, 0.95]);
    }

    #[test]
    fn test_unwritable_outdir_is_fatal_before_planning() {
        let store = Store::in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let executor = Arc::new(FakeNucmer::default());

        let result = orchestrator(&store, &blocker, executor.clone(), false)
            .run(&[genome("a"), genome("b")]);
        assert!(matches!(result, Err(OrchestratorError::OutputDir { .. })));
        assert_eq!(executor.executed(), 0);
        assert_eq!(ItemCatalog::new(store).count().unwrap(), 0);
    }

    #[test]
    fn test_recovery_ignores_artifacts_from_other_params() {
        let store = Store::in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(FakeNucmer::with(&[
            ("1_a_vs_2_b", 1000, 20),
            ("1_a_vs_3_c", 1000, 30),
            ("2_b_vs_3_c", 1000, 50),
        ]));
        let genomes = vec![genome("a"), genome("b"), genome("c")];

        let mum = orchestrator(&store, dir.path(), executor.clone(), false)
            .run(&genomes)
            .unwrap();
        assert_eq!(mum.ingest.committed, 3);

        // Same outdir and store; the --mum files on disk must not satisfy --maxmatch
        let maxmatch = NucmerTool::new("nucmer", "delta-filter", true, false, "3.1");
        let scheduler = Scheduler::WorkerPool(WorkerPoolScheduler::new(Some(2), executor.clone()));
        let summary = Orchestrator::new(&store, maxmatch.clone(), scheduler, config(dir.path(), true))
            .run(&genomes)
            .unwrap();
        assert!(summary.is_success());
        assert_eq!(summary.memoized, 0);
        assert_eq!(summary.recovered, 0);
        assert_eq!(summary.jobs_submitted, 6);
        assert_eq!(executor.executed(), 12);
        assert_eq!(summary.ingest.committed, 3);
        assert!(maxmatch
            .output_dir(&dir.path().join(ALIGN_DIR))
            .join("1_a_vs_2_b.filter")
            .is_file());
        assert_eq!(ComparisonStore::new(store.clone()).count().unwrap(), 6);
    }

    #[test]
    fn test_single_genome_records_empty_run() {
        let store = Store::in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(FakeNucmer::default());

        let summary = orchestrator(&store, dir.path(), executor.clone(), false)
            .run(&[genome("solo")])
            .unwrap();
        assert!(summary.is_success());
        assert_eq!(summary.genomes, 1);
        assert_eq!(summary.pairs, 0);
        assert_eq!(summary.jobs_submitted, 0);
        assert_eq!(executor.executed(), 0);

        let run = RunRegistry::new(store.clone()).get(summary.run_id).unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(RunRegistry::new(store).item_ids(summary.run_id).unwrap().len(), 1);
    }

    #[test]
    fn test_scheduler_error_marks_run_failed() {
        let store = Store::in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        // The batch script directory cannot be created under a plain file
        let blocker = dir.path().join("scripts");
        std::fs::write(&blocker, "").unwrap();
        let cluster = ClusterScheduler::new(2, "ANIm", &blocker.join("batches"), Arc::new(IdleQueue));

        let orchestrator = Orchestrator::new(
            &store,
            mum_tool(),
            Scheduler::Cluster(cluster),
            config(&dir.path().join("out"), false),
        );
        let result = orchestrator.run(&[genome("a"), genome("b")]);
        assert!(matches!(result, Err(OrchestratorError::Scheduler(_))));

        let runs = RunRegistry::new(store);
        assert_eq!(runs.get(1).unwrap().status, RunStatus::Failed);
    }

    #[test]
    fn test_classes_and_labels_attach_to_run() {
        let store = Store::in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let classes = dir.path().join("classes.txt");
        std::fs::write(
            &classes,
            "md5-a\ta\tEscherichia\nmd5-b\tb\tSalmonella\nmd5-zz\tzz\tGhost\n",
        )
        .unwrap();
        let labels = dir.path().join("labels.txt");
        std::fs::write(&labels, "# hash\tstem\tlabel\nmd5-b\tb\tstrain B\n").unwrap();

        let executor = Arc::new(FakeNucmer::with(&[("1_a_vs_2_b", 1000, 10)]));
        let scheduler = Scheduler::WorkerPool(WorkerPoolScheduler::new(Some(1), executor));
        let mut analysis = config(&dir.path().join("out"), false);
        analysis.classes = Some(classes);
        analysis.labels = Some(labels);
        let summary = Orchestrator::new(&store, mum_tool(), scheduler, analysis)
            .run(&[genome("a"), genome("b")])
            .unwrap();

        let runs = RunRegistry::new(store);
        assert_eq!(
            runs.metadata(MetadataKind::Class, summary.run_id).unwrap(),
            vec![(1, "Escherichia".to_string()), (2, "Salmonella".to_string())]
        );
        assert_eq!(
            runs.metadata(MetadataKind::Label, summary.run_id).unwrap(),
            vec![(2, "strain B".to_string())]
        );
    }

    #[test]
    fn test_unreadable_classes_file_fails_run() {
        let store = Store::in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(FakeNucmer::default());
        let mut analysis = config(&dir.path().join("out"), false);
        analysis.classes = Some(dir.path().join("missing.txt"));

        let scheduler = Scheduler::WorkerPool(WorkerPoolScheduler::new(Some(1), executor.clone()));
        let result = Orchestrator::new(&store, mum_tool(), scheduler, analysis).run(&[genome("a"), genome("b")]);
        assert!(matches!(result, Err(OrchestratorError::Input(_))));
        assert_eq!(executor.executed(), 0);
        assert_eq!(RunRegistry::new(store).get(1).unwrap().status, RunStatus::Failed);
    }
}
