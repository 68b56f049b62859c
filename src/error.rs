// error.rs - Error types for the orchestration core

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the persistent store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A row with the same unique key already exists
    #[error("conflict: {0} already present")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("store lock poisoned")]
    Poisoned,
    #[error("database {0} already exists")]
    AlreadyExists(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Map a rusqlite error, turning UNIQUE/PRIMARY KEY violations into `Conflict`.
    ///
    /// Other constraint failures (foreign key, NOT NULL) stay `Sqlite` errors.
    pub fn from_insert(err: rusqlite::Error, what: impl Into<String>) -> Self {
        match extended_code(&err) {
            Some(code)
                if code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                StoreError::Conflict(what.into())
            }
            _ => StoreError::Sqlite(err),
        }
    }

    /// Map a rusqlite error, turning FOREIGN KEY violations into `NotFound`
    pub fn from_reference(err: rusqlite::Error, what: impl Into<String>) -> Self {
        match extended_code(&err) {
            Some(code) if code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                StoreError::NotFound(what.into())
            }
            _ => StoreError::Sqlite(err),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

fn extended_code(err: &rusqlite::Error) -> Option<std::os::raw::c_int> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => Some(e.extended_code),
        _ => None,
    }
}

/// Internal invariant failures of the job graph
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("duplicate job id '{0}'")]
    DuplicateJob(String),
    #[error("job '{job}' depends on unknown job '{dependency}'")]
    UnknownDependency { job: String, dependency: String },
    #[error("dependency cycle detected involving {0:?}")]
    CycleDetected(Vec<String>),
}

/// Failures of a scheduler backend itself (as opposed to failed jobs)
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("could not build worker pool: {0}")]
    Pool(String),
    #[error("could not write batch script {path}: {source}")]
    Script {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Per-pair failures while turning an artifact into a comparison
#[derive(Debug, Error)]
pub enum ComputationError {
    #[error("zero aligned length for items {item_a} vs {item_b}")]
    DegenerateAlignment { item_a: i64, item_b: i64 },
    #[error("failed to read artifact {path}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed artifact {path} at line {line}: {reason}")]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    /// The unit's jobs did not finish, so its artifact is not trusted
    #[error("no finished artifact {artifact} (jobs {state})")]
    Incomplete { artifact: PathBuf, state: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures of a whole orchestrated invocation
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("could not create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error("{0}")]
    Input(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
