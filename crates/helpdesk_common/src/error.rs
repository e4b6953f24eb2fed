//! Error types for helpdesk.

use thiserror::Error;

/// Malformed row store text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("row store line {line}: {reason}")]
pub struct StoreFormatError {
    pub line: usize,
    pub reason: String,
}

impl StoreFormatError {
    pub fn new(line: usize, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }
}

/// Failures of a row store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("row store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Format(#[from] StoreFormatError),
}

/// Spreadsheet ingestion failures.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("cannot open spreadsheet: {0}")]
    Open(#[from] calamine::Error),

    #[error("spreadsheet has no worksheet")]
    NoWorksheet,

    #[error("ingestion task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures reported by a ticketing client for a single draft.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TicketingError {
    #[error("ticketing request timed out after {0}s")]
    Timeout(u64),

    #[error("ticketing request failed: {0}")]
    Transport(String),

    #[error("ticketing API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid requester e-mail: {0}")]
    InvalidRequester(String),
}

/// Conditions that abort a bulk run before any ticket is created.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("no valid rows found in row store")]
    StoreUnavailable,

    #[error("no rows found at or after row {start}")]
    NoRowsSelected { start: u32 },
}

/// Configuration loading and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}
