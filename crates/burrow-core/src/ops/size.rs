//! Recursive byte count.
//!
//! There is no finished flag: the operation is over when its worker thread
//! has terminated.

use super::{spawn_worker, Operation, Progress};
use crate::error::EngineResult;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{fence, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeProgress {
    /// Bytes accumulated so far.
    pub size: u64,
    pub end: bool,
}

impl Progress for SizeProgress {
    fn is_end(&self) -> bool {
        self.end
    }
}

pub struct SizeOp {
    path: PathBuf,
    size: Arc<AtomicU64>,
    worker: JoinHandle<()>,
}

impl SizeOp {
    /// Start summing file sizes below `path`. A missing path finishes with 0.
    pub fn start(path: PathBuf) -> EngineResult<Self> {
        let size = Arc::new(AtomicU64::new(0));
        let worker = {
            let size = Arc::clone(&size);
            let root = path.clone();
            spawn_worker("burrow-size", move || sum_sizes(&root, &size))?
        };
        Ok(Self { path, size, worker })
    }
}

impl Operation for SizeOp {
    type Progress = SizeProgress;

    fn poll(&self) -> SizeProgress {
        // Termination first: once the thread is gone, the fence makes its
        // final total visible to the load below.
        let end = self.worker.is_finished();
        fence(Ordering::Acquire);
        SizeProgress {
            size: self.size.load(Ordering::Relaxed),
            end,
        }
    }

    fn stop(&self) {
        debug!("Size of {} has no cancellation, ignoring stop", self.path.display());
    }
}

fn sum_sizes(root: &Path, size: &AtomicU64) {
    let start = Instant::now();

    // A link root is followed; links below it are not.
    match std::fs::metadata(root) {
        Ok(m) if !m.is_dir() => {
            size.store(m.len(), Ordering::Release);
            return;
        }
        Ok(_) => {}
        Err(err) => {
            debug!("Nothing to size at {}: {err}", root.display());
            return;
        }
    }
    let target = match dunce::canonicalize(root) {
        Ok(t) => t,
        Err(err) => {
            debug!("Cannot resolve {}: {err}", root.display());
            return;
        }
    };

    let walker = jwalk::WalkDir::new(&target)
        .skip_hidden(false)
        .follow_links(false)
        .parallelism(jwalk::Parallelism::RayonNewPool(num_cpus::get()));

    let mut files: u64 = 0;
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                debug!("Skipping unreadable entry: {err}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        // Stat outside any lock; vanished files simply contribute nothing.
        if let Ok(meta) = std::fs::symlink_metadata(entry.path()) {
            size.fetch_add(meta.len(), Ordering::Release);
            files += 1;
        }
    }

    info!(
        "Sized {} ({} files, {} bytes) in {:?}",
        root.display(),
        files,
        size.load(Ordering::Relaxed),
        start.elapsed()
    );
}
