//! Engine configuration: worker pool sizes and cache bounds.
//!
//! Every field has a default, so a config file only needs the keys it wants
//! to override:
//!
//! ```json
//! { "delete_workers": 8, "classifier_cache_limit": 100000 }
//! ```

use crate::error::{EngineError, EngineResult};
use serde::Deserialize;
use std::path::Path;

/// Number of children statted per parallel chunk during a listing.
pub const DEFAULT_LIST_CHUNK: usize = 64;

/// Size of the per-delete removal pool.
pub const DEFAULT_DELETE_WORKERS: usize = 16;

/// Tuning knobs shared by every operation the engine starts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Threads used by a listing to stat and classify children.
    pub list_workers: usize,
    /// Children handed to the listing pool at once.
    pub list_chunk: usize,
    /// Threads used by a delete to unlink / recycle entries.
    pub delete_workers: usize,
    /// Whether `start_delete` recycles by default.
    pub move_to_trash: bool,
    /// Flush the classifier cache once it holds this many names.
    /// `None` keeps it unbounded.
    pub classifier_cache_limit: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            list_workers: num_cpus::get(),
            list_chunk: DEFAULT_LIST_CHUNK,
            delete_workers: DEFAULT_DELETE_WORKERS,
            move_to_trash: true,
            classifier_cache_limit: None,
        }
    }
}

impl EngineConfig {
    /// Load and validate a JSON config file.
    pub fn from_json_file(path: &Path) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::from_io(path, e))?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make an operation unable to make progress.
    pub fn validate(&self) -> EngineResult<()> {
        if self.list_workers == 0 {
            return Err(EngineError::Config("list_workers must be > 0".into()));
        }
        if self.list_chunk == 0 {
            return Err(EngineError::Config("list_chunk must be > 0".into()));
        }
        if self.delete_workers == 0 {
            return Err(EngineError::Config("delete_workers must be > 0".into()));
        }
        if self.classifier_cache_limit == Some(0) {
            return Err(EngineError::Config(
                "classifier_cache_limit must be > 0 when set".into(),
            ));
        }
        Ok(())
    }
}
