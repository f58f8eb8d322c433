//! Error types for `burrow-core`.
//!
//! Start-time failures are returned to the caller as [`EngineError`]. Failures
//! that happen inside a running worker never escape it: they are logged and,
//! for deletes, recorded in the polled failure list.

use std::path::{Path, PathBuf};

/// Unified error type for the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The target path does not exist.
    #[error("path not found: {0}")]
    NotFound(PathBuf),

    /// A directory was expected but the path points to something else.
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The process lacks permission to read the path.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An explicit `/pattern/flags` find query failed to compile.
    #[error("invalid query {query:?}: {message}")]
    InvalidQuery { query: String, message: String },

    /// A classification rule table violates its authoring invariants.
    #[error("rule table error: {0}")]
    RuleTable(String),

    /// A worker pool could not be built.
    #[error("worker pool error: {0}")]
    Pool(String),

    /// The local key/value store holds something other than a JSON object.
    #[error("store error: {0}")]
    Store(String),

    /// Engine configuration is unusable.
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// An I/O error that doesn't fit a more specific variant.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Map an I/O error on `path` to the most specific variant.
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io(err),
        }
    }
}

impl From<rayon::ThreadPoolBuildError> for EngineError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        Self::Pool(err.to_string())
    }
}

/// Convenience alias used throughout `burrow-core`.
pub type EngineResult<T> = Result<T, EngineError>;
