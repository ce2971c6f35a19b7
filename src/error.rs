use std::path::PathBuf;

use thiserror::Error;

/// Shape errors while building a [`Table`](crate::data::table::Table).
#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),
    #[error("row has {found} cells, expected {expected}")]
    RowWidth { expected: usize, found: usize },
    #[error("column '{column}' has {found} values, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },
}

/// A signal's timestamp column could not be turned into absolute times.
#[derive(Debug, Error, PartialEq)]
pub enum TimeColumnError {
    #[error("missing time column '{0}'")]
    Missing(String),
    #[error("row {row}: cannot parse '{value}' as a timestamp")]
    Unparseable { row: usize, value: String },
    #[error("time column '{0}' has no timestamps")]
    NoTimestamps(String),
}

/// Failed lookup through the run accessor API.
#[derive(Debug, Error, PartialEq)]
pub enum LookupError {
    #[error("unknown modality '{0}'")]
    UnknownModality(String),
    #[error("modality '{modality}' has no column '{column}'")]
    UnknownColumn { modality: String, column: String },
    #[error("modality '{modality}' failed to load: {reason}")]
    SignalFailed { modality: String, reason: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("run has no signals")]
    NoSignals,
    #[error("no signal in the run has a usable first timestamp")]
    NoStartTime,
}

/// Errors when attaching derived tables to a run.
#[derive(Debug, Error, PartialEq)]
pub enum AttachError {
    #[error("{table} table is missing required column '{column}'")]
    MissingColumn { table: String, column: String },
    #[error("detection '{0}' is already attached")]
    DuplicateDetection(String),
    #[error("{0} already attached")]
    AlreadyAttached(&'static str),
}

#[derive(Debug, Error, PartialEq)]
pub enum DetectError {
    #[error("detector '{detector}' requires signal '{signal}' which is missing or failed")]
    MissingSignal { detector: String, signal: String },
    #[error("detector '{detector}' failed: {reason}")]
    Failed { detector: String, reason: String },
    #[error(transparent)]
    Attach(#[from] AttachError),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("processed directory not found: {0}")]
    MissingProcessedDir(PathBuf),
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum FilterParseError {
    #[error("expected 'field=value[,value...]', got '{0}'")]
    MissingEquals(String),
    #[error("empty field name in '{0}'")]
    EmptyField(String),
}
