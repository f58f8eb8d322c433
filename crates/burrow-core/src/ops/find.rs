//! Breadth-first recursive name search.

use super::{spawn_worker, Operation, Progress, Query};
use crate::classify::Classifier;
use crate::error::{EngineError, EngineResult};
use crate::model::PathEntry;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{debug, info};

/// One drained batch of search hits. `total` is cumulative and never drains.
#[derive(Debug, Clone, Serialize)]
pub struct FindProgress {
    pub end: bool,
    pub total: u64,
    pub files: Vec<PathEntry>,
}

impl Progress for FindProgress {
    fn is_end(&self) -> bool {
        self.end
    }
}

struct FindShared {
    files: Mutex<Vec<PathEntry>>,
    total: AtomicU64,
    cancel: AtomicBool,
    finished: AtomicBool,
}

/// A running or finished recursive search under one root.
pub struct FindOp {
    shared: Arc<FindShared>,
    _worker: JoinHandle<()>,
}

impl FindOp {
    /// Compile `query` and start searching below `path`.
    pub fn start(path: PathBuf, query: &str, classifier: Arc<Classifier>) -> EngineResult<Self> {
        let query = Query::parse(query)?;
        let metadata = std::fs::metadata(&path).map_err(|e| EngineError::from_io(&path, e))?;
        if !metadata.is_dir() {
            return Err(EngineError::NotADirectory(path));
        }

        let shared = Arc::new(FindShared {
            files: Mutex::new(Vec::new()),
            total: AtomicU64::new(0),
            cancel: AtomicBool::new(false),
            finished: AtomicBool::new(false),
        });

        let worker = {
            let shared = Arc::clone(&shared);
            spawn_worker("burrow-find", move || {
                run_search(&path, &query, &shared, &classifier);
            })?
        };

        Ok(Self {
            shared,
            _worker: worker,
        })
    }
}

impl Operation for FindOp {
    type Progress = FindProgress;

    fn poll(&self) -> FindProgress {
        let end = self.shared.finished.load(Ordering::Acquire);
        let files = std::mem::take(&mut *self.shared.files.lock());
        FindProgress {
            end,
            total: self.shared.total.load(Ordering::Relaxed),
            files,
        }
    }

    fn stop(&self) {
        self.shared.cancel.store(true, Ordering::Relaxed);
    }
}

fn run_search(root: &Path, query: &Query, shared: &FindShared, classifier: &Classifier) {
    let start = Instant::now();
    debug!(
        "Searching {} for {:?} as {}",
        root.display(),
        query.as_str(),
        if query.is_regex() { "regex" } else { "literal or glob" }
    );
    let mut queue = VecDeque::from([root.to_path_buf()]);
    let mut matched: u64 = 0;

    while let Some(dir) = queue.pop_front() {
        if shared.cancel.load(Ordering::Relaxed) {
            debug!("Search below {} cancelled", root.display());
            break;
        }

        let read_dir = match std::fs::read_dir(&dir) {
            Ok(rd) => rd,
            Err(err) => {
                debug!("Skipping unreadable {}: {err}", dir.display());
                continue;
            }
        };

        for entry in read_dir.filter_map(Result::ok) {
            shared.total.fetch_add(1, Ordering::Relaxed);
            let path = entry.path();

            // `DirEntry::file_type` does not follow links, so a linked
            // directory is reported but never queued.
            if entry.file_type().is_ok_and(|t| t.is_dir()) {
                queue.push_back(path.clone());
            }

            let name = entry.file_name();
            if !query.is_match(&name.to_string_lossy()) {
                continue;
            }
            if let Some(found) = PathEntry::observe(&path, classifier) {
                matched += 1;
                shared.files.lock().push(found);
            }
        }
    }

    shared.finished.store(true, Ordering::Release);
    info!(
        "Search for {:?} below {} visited {} entries, matched {} in {:?}",
        query.as_str(),
        root.display(),
        shared.total.load(Ordering::Relaxed),
        matched,
        start.elapsed()
    );
}
