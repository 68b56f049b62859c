// args.rs - Command line arguments definition

use argh::FromArgs;

/// Default location of the comparison database
pub const DEFAULT_DBPATH: &str = ".anicore/anicore.db";

#[derive(FromArgs)]
/// anicore - Memoized ANIm pairwise genome comparisons
pub struct Args {
    /// path to the comparison database (default: .anicore/anicore.db)
    #[argh(option, default = "String::from(DEFAULT_DBPATH)")]
    pub dbpath: String,

    /// directory containing input genome FASTA files (.fna, .fa, .fas, .fasta)
    #[argh(option)]
    pub indir: Option<String>,

    /// directory for alignment outputs and batch scripts
    #[argh(option)]
    pub outdir: Option<String>,

    /// name for this run (default: ANIm_<timestamp>)
    #[argh(option)]
    pub name: Option<String>,

    /// classes file (<hash>\t<stem>\t<class>) applied to this run's genomes
    #[argh(option)]
    pub classes: Option<String>,

    /// labels file (<hash>\t<stem>\t<label>) applied to this run's genomes
    #[argh(option)]
    pub labels: Option<String>,

    /// write .md5 hash files plus classes.txt and labels.txt in --indir, then exit
    #[argh(switch)]
    pub index: bool,

    /// job scheduler: multiprocessing, sge (default: multiprocessing)
    #[argh(option, default = "String::from(\"multiprocessing\")")]
    pub scheduler: String,

    /// number of local workers (default: auto-detect)
    #[argh(option)]
    pub workers: Option<usize>,

    /// number of jobs per SGE array submission (default: 10000)
    #[argh(option, default = "10000")]
    pub sge_group_size: usize,

    /// additional arguments passed to qsub, quoted as one string
    #[argh(option)]
    pub sge_args: Option<String>,

    /// queue submission executable (default: qsub)
    #[argh(option, default = "String::from(\"qsub\")")]
    pub qsub_exe: String,

    /// prefix for cluster job names (default: ANIm)
    #[argh(option, default = "String::from(\"ANIm\")")]
    pub job_prefix: String,

    /// reuse alignment outputs already present in the output directory
    #[argh(switch)]
    pub recovery: bool,

    /// ingest raw delta files instead of delta-filter output
    #[argh(switch)]
    pub nofilter: bool,

    /// run nucmer with --maxmatch instead of --mum
    #[argh(switch)]
    pub maxmatch: bool,

    /// path to the nucmer executable (default: nucmer)
    #[argh(option, default = "String::from(\"nucmer\")")]
    pub nucmer_exe: String,

    /// path to the delta-filter executable (default: delta-filter)
    #[argh(option, default = "String::from(\"delta-filter\")")]
    pub filter_exe: String,

    /// create the database before running
    #[argh(switch)]
    pub create_db: bool,

    /// overwrite an existing database, or existing index files with --index
    #[argh(switch)]
    pub force: bool,

    /// stop dispatching local jobs after the first failure
    #[argh(switch)]
    pub fail_fast: bool,

    /// path to TOML configuration file
    #[argh(option)]
    pub config: Option<String>,

    /// generate sample configuration file and exit
    #[argh(switch)]
    pub generate_config: bool,
}

impl Args {
    /// Arguments as if nothing was given on the command line
    pub fn defaults() -> Self {
        Self {
            dbpath: DEFAULT_DBPATH.to_string(),
            indir: None,
            outdir: None,
            name: None,
            classes: None,
            labels: None,
            index: false,
            scheduler: "multiprocessing".to_string(),
            workers: None,
            sge_group_size: 10000,
            sge_args: None,
            qsub_exe: "qsub".to_string(),
            job_prefix: "ANIm".to_string(),
            recovery: false,
            nofilter: false,
            maxmatch: false,
            nucmer_exe: "nucmer".to_string(),
            filter_exe: "delta-filter".to_string(),
            create_db: false,
            force: false,
            fail_fast: false,
            config: None,
            generate_config: false,
        }
    }
}
