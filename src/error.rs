use std::path::PathBuf;
use thiserror::Error;

/// Result type for ioperf operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while building or running a pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Worker or pipeline has already been started
    #[error("Worker has already been started")]
    AlreadyStarted,

    /// Pipeline is missing its source or sink
    #[error("Cannot build pipeline without a source and a sink")]
    NoStages,

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Backing file could not be opened, read or written
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Thread spawn or join error
    #[error("Thread error: {0}")]
    ThreadError(String),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
