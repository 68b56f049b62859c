// main.rs - CLI entry point

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use anicore::cli::Config;
use anicore::prelude::*;

fn main() {
    if let Err(e) = run_main() {
        eprintln!("❌ ERROR: {}", e);
        std::process::exit(1);
    }
}

fn run_main() -> Result<(), String> {
    let mut args: Args = argh::from_env();
    let command_line = std::env::args().collect::<Vec<String>>().join(" ");

    // Handle generate config first
    if args.generate_config {
        let sample_config = Config::generate_sample();
        println!("{}", sample_config);
        println!("\n💡 Save this content to a .toml file and use --config /path/to/config.toml");
        return Ok(());
    }

    // Load configuration file if specified
    if let Some(config_path) = args.config.clone() {
        args = args.with_config_file(&config_path)?;
    }

    if args.index {
        let indir = validate_index_args(&args)?;
        let report = index_genomes(&indir, args.force)?;
        print_index_report(&report);
        return Ok(());
    }

    let validation = validate_args(&args)?;
    let total_start = Instant::now();

    println!("🚀 {}", anicore::get_info());

    let store = if args.create_db {
        println!("🗄️  Creating database {}", validation.dbpath.display());
        Store::create(&validation.dbpath, args.force).map_err(|e| e.to_string())?
    } else {
        println!("🗄️  Using database {}", validation.dbpath.display());
        Store::open(&validation.dbpath).map_err(|e| e.to_string())?
    };

    let version = NucmerTool::detect_version(&args.nucmer_exe)?;
    let tool = NucmerTool::new(
        &args.nucmer_exe,
        &args.filter_exe,
        args.maxmatch,
        args.nofilter,
        &version,
    );
    println!("🔧 nucmer {} ({})", version, tool.params());

    let genomes = discover_genomes(&validation.indir)?;
    println!("📂 Found {} genomes in {}", genomes.len(), validation.indir.display());

    let scheduler = build_scheduler(&args, validation.scheduler, &validation.outdir);
    let config = AnalysisConfig {
        name: args.name.clone(),
        cmdline: command_line,
        outdir: validation.outdir.clone(),
        recovery: args.recovery,
        job_prefix: args.job_prefix.clone(),
        classes: validation.classes.clone(),
        labels: validation.labels.clone(),
        ..AnalysisConfig::default()
    };

    let orchestrator = Orchestrator::new(&store, tool, scheduler, config);
    let summary = orchestrator.run(&genomes).map_err(|e| e.to_string())?;
    print_summary(&summary);
    println!("⏱️  Total time: {:.2}s", total_start.elapsed().as_secs_f64());

    if summary.is_success() {
        Ok(())
    } else {
        Err(format!(
            "run {} finished with {} failed jobs and {} failed comparisons",
            summary.run_id,
            summary.job_failures,
            summary.ingest.failures.len()
        ))
    }
}

fn build_scheduler(args: &Args, kind: SchedulerKind, outdir: &Path) -> Scheduler {
    match kind {
        SchedulerKind::Multiprocessing => {
            let pool = WorkerPoolScheduler::new(args.workers, Arc::new(ShellExecutor::new()))
                .with_fail_fast(args.fail_fast);
            Scheduler::WorkerPool(pool)
        }
        SchedulerKind::Sge => {
            let submitter = SgeSubmitter::new(&args.qsub_exe, args.sge_args.as_deref().unwrap_or(""));
            Scheduler::Cluster(ClusterScheduler::new(
                args.sge_group_size,
                &args.job_prefix,
                &outdir.join("jobs"),
                Arc::new(submitter),
            ))
        }
    }
}

fn print_index_report(report: &IndexReport) {
    println!("\n📈 === INDEX SUMMARY ===");
    println!("  • Hash files written: {}", report.hashed);
    println!("  • Hash files kept: {}", report.existing);
    for (what, path) in [("Classes", &report.classes), ("Labels", &report.labels)] {
        match path {
            Some(path) => println!("  • {}: {}", what, path.display()),
            None => println!("  • {}: existing file kept", what),
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!("\n📈 === RUN SUMMARY ===");
    println!("  • Run: {} ({})", summary.run_id, summary.name);
    println!("  • Genomes: {}", summary.genomes);
    println!("  • Pairs: {}", summary.pairs);
    println!("  • Reused from database: {}", summary.memoized);
    println!("  • Recovered from disk: {}", summary.recovered);
    println!("  • Jobs submitted: {}", summary.jobs_submitted);
    println!("  • Failed/skipped jobs: {}", summary.job_failures);
    println!("  • New comparisons: {}", summary.ingest.committed);
    println!("  • Failed comparisons: {}", summary.ingest.failures.len());
    println!("  • Status: {}", summary.status);
}
