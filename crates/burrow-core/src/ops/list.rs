//! One-level directory listing.
//!
//! The worker walks the direct children of a directory in chunks. Each chunk
//! is statted and classified in parallel on the engine's listing pool, then
//! appended to the shared buffer in enumeration order. Before every append
//! the worker waits at the [`PauseGate`], so a poll that pauses the gate,
//! swaps the buffer out and resumes it never races a half-finished append.

use super::{spawn_worker, Operation, PauseGate, Progress};
use crate::classify::Classifier;
use crate::error::{EngineError, EngineResult};
use crate::model::PathEntry;
use parking_lot::Mutex;
use rayon::prelude::*;
use rayon::ThreadPool;
use serde::Serialize;
use std::fs::ReadDir;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{debug, info};

/// One drained batch of a listing.
#[derive(Debug, Clone, Serialize)]
pub struct ListProgress {
    pub items: Vec<PathEntry>,
    pub end: bool,
}

impl Progress for ListProgress {
    fn is_end(&self) -> bool {
        self.end
    }
}

/// Observable lifecycle of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListState {
    Running,
    /// A poll is draining the buffer; the worker holds its next append.
    Paused,
    Finished,
}

struct ListShared {
    items: Mutex<Vec<PathEntry>>,
    total: AtomicU64,
    gate: PauseGate,
    cancel: AtomicBool,
    finished: AtomicBool,
}

/// A running or finished listing of one directory.
pub struct ListOp {
    shared: Arc<ListShared>,
    _worker: JoinHandle<()>,
}

impl ListOp {
    /// Open `path` and start listing it on a background thread.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`]: the path does not exist.
    /// - [`EngineError::NotADirectory`]: the path is not a directory.
    /// - [`EngineError::PermissionDenied`]: the directory cannot be read.
    pub fn start(
        path: PathBuf,
        classifier: Arc<Classifier>,
        pool: Arc<ThreadPool>,
        chunk: usize,
    ) -> EngineResult<Self> {
        let metadata = std::fs::metadata(&path).map_err(|e| EngineError::from_io(&path, e))?;
        if !metadata.is_dir() {
            return Err(EngineError::NotADirectory(path));
        }
        let read_dir = std::fs::read_dir(&path).map_err(|e| EngineError::from_io(&path, e))?;

        let shared = Arc::new(ListShared {
            items: Mutex::new(Vec::new()),
            total: AtomicU64::new(0),
            gate: PauseGate::default(),
            cancel: AtomicBool::new(false),
            finished: AtomicBool::new(false),
        });

        let worker = {
            let shared = Arc::clone(&shared);
            spawn_worker("burrow-list", move || {
                run_listing(&path, read_dir, &shared, &classifier, &pool, chunk.max(1));
            })?
        };

        Ok(Self {
            shared,
            _worker: worker,
        })
    }

    /// Children observed so far, drained or not.
    pub fn total(&self) -> u64 {
        self.shared.total.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> ListState {
        if self.shared.finished.load(Ordering::Acquire) {
            ListState::Finished
        } else if self.shared.gate.is_paused() {
            ListState::Paused
        } else {
            ListState::Running
        }
    }
}

impl Operation for ListOp {
    type Progress = ListProgress;

    fn poll(&self) -> ListProgress {
        // Read the flag before draining: everything appended before the
        // worker finished is then guaranteed to be in this batch.
        let end = self.shared.finished.load(Ordering::Acquire);

        self.shared.gate.pause();
        let items = std::mem::take(&mut *self.shared.items.lock());
        self.shared.gate.resume();

        ListProgress { items, end }
    }

    fn stop(&self) {
        self.shared.cancel.store(true, Ordering::Relaxed);
        // Wake a worker parked at the gate so it can see the flag.
        self.shared.gate.resume();
    }
}

fn run_listing(
    root: &Path,
    read_dir: ReadDir,
    shared: &ListShared,
    classifier: &Classifier,
    pool: &ThreadPool,
    chunk: usize,
) {
    let start = Instant::now();
    let mut children = read_dir.filter_map(Result::ok).map(|e| e.path());
    let mut batch: Vec<PathBuf> = Vec::with_capacity(chunk);

    'outer: loop {
        if shared.cancel.load(Ordering::Relaxed) {
            debug!("Listing of {} cancelled", root.display());
            break;
        }

        batch.clear();
        batch.extend(children.by_ref().take(chunk));
        if batch.is_empty() {
            break;
        }

        // Children that vanished since enumeration drop out here.
        let observed: Vec<PathEntry> = pool.install(|| {
            batch
                .par_iter()
                .filter_map(|p| PathEntry::observe(p, classifier))
                .collect()
        });

        for entry in observed {
            shared.gate.wait_while_paused();
            if shared.cancel.load(Ordering::Relaxed) {
                debug!("Listing of {} cancelled", root.display());
                break 'outer;
            }
            shared.items.lock().push(entry);
            shared.total.fetch_add(1, Ordering::Relaxed);
        }
    }

    shared.finished.store(true, Ordering::Release);
    info!(
        "Listed {} children of {} in {:?}",
        shared.total.load(Ordering::Relaxed),
        root.display(),
        start.elapsed()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn pool() -> Arc<ThreadPool> {
        Arc::new(
            rayon::ThreadPoolBuilder::new()
                .num_threads(2)
                .build()
                .unwrap(),
        )
    }

    fn classifier() -> Arc<Classifier> {
        Arc::new(Classifier::standard().unwrap())
    }

    fn drain(op: &ListOp) -> Vec<PathEntry> {
        let deadline = Instant::now() + Duration::from_secs(30);
        let mut all = Vec::new();
        loop {
            assert!(Instant::now() < deadline, "listing did not finish");
            let batch = op.poll();
            all.extend(batch.items);
            if batch.end {
                return all;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn lists_direct_children_only() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("src")).unwrap();
        fs::write(tmp.path().join("src").join("nested.rs"), "").unwrap();
        fs::write(tmp.path().join("Cargo.toml"), "").unwrap();

        let op = ListOp::start(tmp.path().to_path_buf(), classifier(), pool(), 1).unwrap();
        let items = drain(&op);

        let names: HashSet<String> = items.iter().map(|e| e.name.to_string()).collect();
        assert_eq!(names, HashSet::from(["src".to_string(), "Cargo.toml".to_string()]));
        assert_eq!(op.total(), 2);
        assert_eq!(op.state(), ListState::Finished);

        let src = items.iter().find(|e| e.name == "src").unwrap();
        assert_eq!(src.type_tag.as_str(), "folder-src");
        let cargo = items.iter().find(|e| e.name == "Cargo.toml").unwrap();
        assert_eq!(cargo.type_tag.as_str(), "file-cargo");
    }

    #[test]
    fn batches_are_disjoint_and_complete() {
        let tmp = TempDir::new().unwrap();
        for i in 0..300 {
            fs::write(tmp.path().join(format!("f{i:03}.txt")), "").unwrap();
        }

        let op = ListOp::start(tmp.path().to_path_buf(), classifier(), pool(), 7).unwrap();
        let items = drain(&op);

        let unique: HashSet<&str> = items.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(items.len(), 300, "every child exactly once");
        assert_eq!(unique.len(), 300, "no child repeated across batches");

        // The drained buffer stays empty after the end.
        assert!(op.poll().items.is_empty());
    }

    #[test]
    fn empty_directory_finishes_with_no_items() {
        let tmp = TempDir::new().unwrap();
        let op = ListOp::start(tmp.path().to_path_buf(), classifier(), pool(), 8).unwrap();
        assert!(drain(&op).is_empty());
    }

    #[test]
    fn missing_directory_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = ListOp::start(tmp.path().join("nope"), classifier(), pool(), 8)
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn file_target_is_not_a_directory() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("plain.txt");
        fs::write(&file, "x").unwrap();
        let err = ListOp::start(file, classifier(), pool(), 8).err().unwrap();
        assert!(matches!(err, EngineError::NotADirectory(_)));
    }

    #[test]
    fn stop_finishes_early() {
        let tmp = TempDir::new().unwrap();
        for i in 0..50 {
            fs::write(tmp.path().join(format!("{i}")), "").unwrap();
        }
        let op = ListOp::start(tmp.path().to_path_buf(), classifier(), pool(), 1).unwrap();
        op.stop();
        // Whatever was appended before the stop is still drainable.
        let items = drain(&op);
        assert!(items.len() <= 50);
        assert_eq!(op.state(), ListState::Finished);
    }
}
