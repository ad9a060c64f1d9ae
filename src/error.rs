use std::path::PathBuf;

use thiserror::Error;

/// File-level failures while reading one weekly report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("file name {name:?} has no YYYY-MM-DD-DD weekend token")]
    MalformedSourceName { name: String },

    #[error("failed to open workbook {}: {source}", path.display())]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("workbook {} has no worksheets", path.display())]
    EmptyWorkbook { path: PathBuf },
}

/// A ranked row that cannot go into the history. The row is skipped.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RowError {
    #[error("row {row}: column {column} is not a valid whole number ({value})")]
    NotWhole {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("row {row}: rank {rank} already used earlier in the report")]
    DuplicateRank { row: usize, rank: u32 },
}

/// Why an external metadata lookup produced no record.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LookupFailure {
    #[error("metadata service answered HTTP {0}")]
    Status(u16),

    #[error("metadata request timed out: {0}")]
    Timeout(String),

    #[error("metadata request failed: {0}")]
    Transport(String),

    #[error("metadata response was not a JSON object: {0}")]
    MalformedBody(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{title:?} appears more than once in the {report_date} report")]
pub struct DuplicateHistoryKey {
    pub title: String,
    pub report_date: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("sheet name {name:?} for {title:?} is already taken, using {resolved:?}")]
pub struct SheetNameCollision {
    pub title: String,
    pub name: String,
    pub resolved: String,
}

/// Structural errors. These stop the run before the workbook is written.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("API credential missing: set the {var} environment variable")]
    MissingCredential { var: String },

    #[error("target report {}: {source}", path.display())]
    TargetReport {
        path: PathBuf,
        #[source]
        source: ReportError,
    },

    #[error("cannot read report directory {}: {source}", path.display())]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("target report {} has no ranked rows", path.display())]
    EmptySelection { path: PathBuf },

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("workbook write failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),
}
