// schema.rs - SQL schema for the comparison database
//
// genomes              - one row per input genome, unique on (hash, path)
// runs                 - one row per analysis run
// runs_genomes         - many:many membership of genomes in runs
// comparisons          - one row per memoized pairwise result, never updated
// runs_comparisons     - many:many link letting runs reuse stored comparisons
// classes, labels      - optional per-run metadata for member genomes

pub const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS genomes (
    genome_id INTEGER PRIMARY KEY AUTOINCREMENT,
    hash TEXT NOT NULL,
    path TEXT NOT NULL,
    description TEXT,
    length INTEGER NOT NULL,
    UNIQUE (hash, path)
);

CREATE TABLE IF NOT EXISTS runs (
    run_id INTEGER PRIMARY KEY AUTOINCREMENT,
    method TEXT NOT NULL,
    cmdline TEXT,
    date TEXT NOT NULL,
    status TEXT NOT NULL,
    name TEXT
);

CREATE TABLE IF NOT EXISTS runs_genomes (
    run_id INTEGER NOT NULL REFERENCES runs(run_id),
    genome_id INTEGER NOT NULL REFERENCES genomes(genome_id),
    PRIMARY KEY (run_id, genome_id)
);

CREATE TABLE IF NOT EXISTS comparisons (
    comparison_id INTEGER PRIMARY KEY AUTOINCREMENT,
    query_id INTEGER NOT NULL REFERENCES genomes(genome_id),
    subject_id INTEGER NOT NULL REFERENCES genomes(genome_id),
    aln_length INTEGER NOT NULL,
    sim_errs INTEGER NOT NULL,
    identity REAL NOT NULL,
    cov_query REAL NOT NULL,
    cov_subject REAL NOT NULL,
    program TEXT NOT NULL,
    version TEXT NOT NULL,
    params TEXT NOT NULL,
    UNIQUE (query_id, subject_id, program, version, params)
);

CREATE TABLE IF NOT EXISTS runs_comparisons (
    run_id INTEGER NOT NULL REFERENCES runs(run_id),
    query_id INTEGER NOT NULL,
    subject_id INTEGER NOT NULL,
    program TEXT NOT NULL,
    version TEXT NOT NULL,
    params TEXT NOT NULL,
    PRIMARY KEY (run_id, query_id, subject_id, program, version, params),
    FOREIGN KEY (query_id, subject_id, program, version, params)
        REFERENCES comparisons(query_id, subject_id, program, version, params)
);

CREATE TABLE IF NOT EXISTS classes (
    class_id INTEGER PRIMARY KEY AUTOINCREMENT,
    genome_id INTEGER NOT NULL REFERENCES genomes(genome_id),
    run_id INTEGER NOT NULL REFERENCES runs(run_id),
    class TEXT NOT NULL,
    UNIQUE (genome_id, run_id)
);

CREATE TABLE IF NOT EXISTS labels (
    label_id INTEGER PRIMARY KEY AUTOINCREMENT,
    genome_id INTEGER NOT NULL REFERENCES genomes(genome_id),
    run_id INTEGER NOT NULL REFERENCES runs(run_id),
    label TEXT NOT NULL,
    UNIQUE (genome_id, run_id)
);
";
