//! The facade an RPC collaborator drives.
//!
//! One [`Engine`] owns the shared classifier, the listing pool, and one
//! [`OperationRegistry`] per operation variant. Every `start_*` is idempotent
//! per key; every poll (`ls`, `stream_*`) returns `None` once the operation
//! has been polled to its end and forgotten.

use crate::classify::Classifier;
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::model::PathEntry;
use crate::ops::{
    DeleteOp, DeleteProgress, FindOp, FindProgress, ListOp, ListProgress, Recycler, SizeOp,
    SizeProgress, SystemTrash,
};
use crate::registry::OperationRegistry;
use rayon::ThreadPool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// A search is identified by its root and its raw query text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FindKey {
    pub path: PathBuf,
    pub query: String,
}

impl FindKey {
    pub fn new(path: impl Into<PathBuf>, query: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: query.into(),
        }
    }
}

pub struct Engine {
    config: EngineConfig,
    classifier: Arc<Classifier>,
    list_pool: Arc<ThreadPool>,
    recycler: Arc<dyn Recycler>,
    lists: OperationRegistry<PathBuf, ListOp>,
    finds: OperationRegistry<FindKey, FindOp>,
    sizes: OperationRegistry<PathBuf, SizeOp>,
    deletes: OperationRegistry<String, DeleteOp>,
}

impl Engine {
    /// Build an engine with the standard classification tables.
    ///
    /// Fails when `config` is invalid or the listing pool cannot be built.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let classifier =
            Classifier::standard()?.with_cache_limit(config.classifier_cache_limit);
        let list_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.list_workers)
            .thread_name(|i| format!("burrow-list-pool-{i}"))
            .build()?;

        info!(
            "Engine ready: {} list workers, chunk {}, {} delete workers",
            config.list_workers, config.list_chunk, config.delete_workers
        );

        Ok(Self {
            config,
            classifier: Arc::new(classifier),
            list_pool: Arc::new(list_pool),
            recycler: Arc::new(SystemTrash),
            lists: OperationRegistry::new(),
            finds: OperationRegistry::new(),
            sizes: OperationRegistry::new(),
            deletes: OperationRegistry::new(),
        })
    }

    /// Replace the trash primitive used by recycling deletes.
    pub fn with_recycler(mut self, recycler: Arc<dyn Recycler>) -> Self {
        self.recycler = recycler;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    // ── Listing ────────────────────────────────────────────────────

    pub fn start_ls(&self, path: impl AsRef<Path>) -> EngineResult<bool> {
        let path = path.as_ref().to_path_buf();
        self.lists.start(path.clone(), || {
            info!("Listing {}", path.display());
            ListOp::start(
                path.clone(),
                Arc::clone(&self.classifier),
                Arc::clone(&self.list_pool),
                self.config.list_chunk,
            )
        })
    }

    pub fn ls(&self, path: impl AsRef<Path>) -> Option<ListProgress> {
        self.lists.poll(&path.as_ref().to_path_buf())
    }

    pub fn stop_ls(&self, path: impl AsRef<Path>) -> bool {
        self.lists.stop(&path.as_ref().to_path_buf())
    }

    pub fn stop_all_ls(&self) {
        self.lists.stop_all();
    }

    pub fn clear_ls(&self) {
        self.lists.clear();
    }

    // ── Search ─────────────────────────────────────────────────────

    /// Fails with [`InvalidQuery`](crate::EngineError::InvalidQuery) for an
    /// explicit regex that does not compile.
    pub fn start_find(&self, path: impl AsRef<Path>, query: &str) -> EngineResult<bool> {
        let key = FindKey::new(path.as_ref(), query);
        self.finds.start(key.clone(), || {
            info!("Searching {} for {query:?}", key.path.display());
            FindOp::start(key.path.clone(), query, Arc::clone(&self.classifier))
        })
    }

    /// Poll the search for `(path, query)`, or any search below `path` when
    /// `query` is `None`.
    pub fn stream_find(&self, path: impl AsRef<Path>, query: Option<&str>) -> Option<FindProgress> {
        let path = path.as_ref();
        match query {
            Some(q) => self.finds.poll(&FindKey::new(path, q)),
            None => self.finds.poll_where(|k| k.path == path),
        }
    }

    pub fn stop_find(&self, path: impl AsRef<Path>, query: &str) -> bool {
        self.finds.stop(&FindKey::new(path.as_ref(), query))
    }

    pub fn stop_all_find(&self) {
        self.finds.stop_all();
    }

    pub fn clear_find(&self) {
        self.finds.clear();
    }

    // ── Size ───────────────────────────────────────────────────────

    pub fn start_folder_size(&self, path: impl AsRef<Path>) -> EngineResult<bool> {
        let path = path.as_ref().to_path_buf();
        self.sizes.start(path.clone(), || {
            info!("Sizing {}", path.display());
            SizeOp::start(path.clone())
        })
    }

    pub fn stream_folder_size(&self, path: impl AsRef<Path>) -> Option<SizeProgress> {
        self.sizes.poll(&path.as_ref().to_path_buf())
    }

    /// Size scans cannot be cancelled, so this only logs.
    pub fn stop_all_folder_size(&self) {
        self.sizes.stop_all();
    }

    /// Size scans cannot be cancelled; this only forgets them.
    pub fn clear_folder_size(&self) {
        self.sizes.clear();
    }

    // ── Delete ─────────────────────────────────────────────────────

    /// Start deleting `paths` under the caller's unique `id`.
    ///
    /// `move_to_trash` falls back to the configured default when `None`.
    pub fn start_delete(
        &self,
        id: &str,
        paths: Vec<PathBuf>,
        move_to_trash: Option<bool>,
    ) -> EngineResult<bool> {
        let move_to_trash = move_to_trash.unwrap_or(self.config.move_to_trash);
        self.deletes.start(id.to_owned(), || {
            info!(
                "Delete {id}: {} root(s), trash={move_to_trash}",
                paths.len()
            );
            DeleteOp::start(
                paths,
                move_to_trash,
                Arc::clone(&self.recycler),
                self.config.delete_workers,
            )
        })
    }

    pub fn stream_delete(&self, id: &str) -> Option<DeleteProgress> {
        self.deletes.poll(&id.to_owned())
    }

    pub fn stop_delete(&self, id: &str) -> bool {
        self.deletes.stop(&id.to_owned())
    }

    pub fn stop_all_delete(&self) {
        self.deletes.stop_all();
    }

    pub fn clear_delete(&self) {
        self.deletes.clear();
    }

    // ── Teardown & misc ────────────────────────────────────────────

    /// Stop and forget everything, e.g. when the window closes.
    pub fn shutdown(&self) {
        self.clear_ls();
        self.clear_find();
        self.clear_folder_size();
        self.clear_delete();
        info!("Engine shut down");
    }

    /// Snapshot a single path now. `None` when it does not exist.
    pub fn path_info(&self, path: impl AsRef<Path>) -> Option<PathEntry> {
        PathEntry::observe(path.as_ref(), &self.classifier)
    }

    pub fn lists(&self) -> &OperationRegistry<PathBuf, ListOp> {
        &self.lists
    }

    pub fn finds(&self) -> &OperationRegistry<FindKey, FindOp> {
        &self.finds
    }

    pub fn sizes(&self) -> &OperationRegistry<PathBuf, SizeOp> {
        &self.sizes
    }

    pub fn deletes(&self) -> &OperationRegistry<String, DeleteOp> {
        &self.deletes
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
