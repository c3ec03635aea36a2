//! Error types for the collaborator interfaces

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading a DTC description table
#[derive(Debug, Error)]
pub enum DtcDbError {
    /// The table file could not be read
    #[error("Could not load {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Legacy K-Line autodetection failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DetectError {
    /// Every candidate profile was tried and none produced a session
    #[error("K-Line detection failed after trying: {}", .tried.join(", "))]
    Exhausted { tried: Vec<String> },

    /// Detection could not run at all (no candidates, adapter gone)
    #[error("K-Line detection aborted: {0}")]
    Aborted(String),
}
