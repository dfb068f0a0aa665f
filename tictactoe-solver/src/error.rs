use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SolverError>;

#[derive(Debug, Error)]
pub enum SolverError {
    #[error(transparent)]
    Core(#[from] tictactoe_core::Error),

    #[error("{table} has no entry for position {key}")]
    LookupNotFound { table: &'static str, key: u32 },

    #[error("no tablebase named '{0}' is loaded")]
    UnknownTablebase(String),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt {what}: {detail}")]
    Corrupt { what: &'static str, detail: String },
}

impl SolverError {
    pub(crate) fn corrupt(what: &'static str, detail: impl Into<String>) -> SolverError {
        SolverError::Corrupt {
            what,
            detail: detail.into(),
        }
    }

    /// True for a missing file, as opposed to one that failed to parse.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SolverError::Io(err) if err.kind() == io::ErrorKind::NotFound)
    }
}
