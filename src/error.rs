use std::path::PathBuf;

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not open database {path:?}")]
    Connection {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("file not found: {0:?}")]
    MissingFile(PathBuf),
    #[error("no header record in {0:?}")]
    EmptyFile(PathBuf),
    #[error("error reading {path:?}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{path:?}, line {line}: expected at most {expected} fields, found {found}")]
    MalformedRow {
        path: PathBuf,
        line: u64,
        expected: usize,
        found: usize,
    },
    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),
    #[error("could not {operation} table {table}")]
    Ddl {
        operation: &'static str,
        table: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("could not insert rows into {table}")]
    Insert {
        table: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("could not {operation}")]
    Transaction {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },
    #[error("batch size must be at least 1")]
    InvalidBatchSize,
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("could not read configuration from {path:?}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: ConfigFileError,
    },
}

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error means the store itself is unusable, as opposed to a
    /// problem confined to a single input file.
    ///
    /// A write refused as read-only is not fatal: like any other failed
    /// create, rename or drop it only fails the file being imported.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Connection { .. } => true,
            Error::Ddl { source, .. }
            | Error::Insert { source, .. }
            | Error::Transaction { source, .. } => is_fatal_sqlite(source),
            _ => false,
        }
    }
}

fn is_fatal_sqlite(e: &rusqlite::Error) -> bool {
    match e.sqlite_error_code() {
        Some(code) => matches!(
            code,
            ErrorCode::CannotOpen
                | ErrorCode::NotADatabase
                | ErrorCode::DatabaseCorrupt
                | ErrorCode::SystemIoFailure
                | ErrorCode::DiskFull
        ),
        None => false,
    }
}
