//! Recursive delete or recycle.
//!
//! The worker first enumerates every root in post-order, recording each
//! entry's kind and absolute depth without following links. Roots are
//! resolved to absolute paths first, so nested roots given in different
//! forms share one depth scale and each entry is recorded once. Removal then runs
//! on a bounded rayon pool in barriers:
//!
//! 1. every non-directory, all at once;
//! 2. directories grouped by depth, deepest group first, one group at a time.
//!
//! A directory is therefore only attempted after everything below it has
//! been attempted, even when the caller passes nested roots.

use super::{spawn_worker, Operation, Progress};
use crate::error::EngineResult;
use crate::model::wire_path;
use parking_lot::Mutex;
use rayon::ThreadPool;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Moves a path to the platform's recycle bin.
pub trait Recycler: Send + Sync {
    fn recycle(&self, path: &Path) -> io::Result<()>;
}

/// The desktop trash / recycle bin, via the `trash` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTrash;

impl Recycler for SystemTrash {
    fn recycle(&self, path: &Path) -> io::Result<()> {
        trash::delete(path).map_err(|e| io::Error::other(e.to_string()))
    }
}

/// One entry that could not be removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteFailure {
    pub path: String,
    pub message: String,
}

/// Counters of a delete. `failures` drains; everything else is cumulative.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteProgress {
    pub end: bool,
    pub total: u64,
    pub deleted: u64,
    /// Most recent completion by any removal task.
    pub last_deleted: Option<String>,
    pub failed: u64,
    pub failures: Vec<DeleteFailure>,
}

impl Progress for DeleteProgress {
    fn is_end(&self) -> bool {
        self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    path: PathBuf,
    is_dir: bool,
    depth: usize,
}

#[derive(Default)]
struct DeleteShared {
    total: AtomicU64,
    deleted: AtomicU64,
    failed: AtomicU64,
    last_deleted: Mutex<Option<String>>,
    failures: Mutex<Vec<DeleteFailure>>,
    cancel: AtomicBool,
    finished: AtomicBool,
}

struct Removal {
    move_to_trash: bool,
    recycler: Arc<dyn Recycler>,
}

/// A running or finished delete of one or more roots.
pub struct DeleteOp {
    shared: Arc<DeleteShared>,
    _worker: JoinHandle<()>,
}

impl DeleteOp {
    /// Start removing `paths` and everything below them.
    ///
    /// With `move_to_trash` every entry goes through `recycler`; otherwise
    /// files are unlinked and directories removed. `workers` bounds the
    /// removal pool.
    pub fn start(
        paths: Vec<PathBuf>,
        move_to_trash: bool,
        recycler: Arc<dyn Recycler>,
        workers: usize,
    ) -> EngineResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("burrow-delete-{i}"))
            .build()?;

        let shared = Arc::new(DeleteShared::default());
        let worker = {
            let shared = Arc::clone(&shared);
            let removal = Removal {
                move_to_trash,
                recycler,
            };
            spawn_worker("burrow-delete", move || {
                run_delete(&paths, &removal, &pool, &shared);
            })?
        };

        Ok(Self {
            shared,
            _worker: worker,
        })
    }
}

impl Operation for DeleteOp {
    type Progress = DeleteProgress;

    fn poll(&self) -> DeleteProgress {
        let end = self.shared.finished.load(Ordering::Acquire);
        DeleteProgress {
            end,
            total: self.shared.total.load(Ordering::Relaxed),
            deleted: self.shared.deleted.load(Ordering::Relaxed),
            last_deleted: self.shared.last_deleted.lock().clone(),
            failed: self.shared.failed.load(Ordering::Relaxed),
            failures: std::mem::take(&mut *self.shared.failures.lock()),
        }
    }

    fn stop(&self) {
        self.shared.cancel.store(true, Ordering::Relaxed);
    }
}

fn run_delete(roots: &[PathBuf], removal: &Removal, pool: &ThreadPool, shared: &DeleteShared) {
    let start = Instant::now();
    let targets = enumerate_post_order(roots, &shared.cancel);
    shared.total.store(targets.len() as u64, Ordering::Relaxed);

    let (dirs, files): (Vec<&Target>, Vec<&Target>) = targets.iter().partition(|t| t.is_dir);

    pool.scope(|s| {
        for target in &files {
            s.spawn(move |_| remove_one(target, removal, shared));
        }
    });

    let mut levels: BTreeMap<usize, Vec<&Target>> = BTreeMap::new();
    for target in dirs {
        levels.entry(target.depth).or_default().push(target);
    }
    for (_, level) in levels.iter().rev() {
        pool.scope(|s| {
            for target in level {
                s.spawn(move |_| remove_one(target, removal, shared));
            }
        });
    }

    shared.finished.store(true, Ordering::Release);
    info!(
        "Delete of {} root(s) finished: {}/{} removed, {} failed, trash={} in {:?}",
        roots.len(),
        shared.deleted.load(Ordering::Relaxed),
        targets.len(),
        shared.failed.load(Ordering::Relaxed),
        removal.move_to_trash,
        start.elapsed()
    );
}

/// Absolute form of `root` with every parent link and `.`/`..` resolved.
///
/// The last component is kept as given so a link root is removed as a
/// link. Falls back to `root` itself when its parent cannot be resolved.
fn resolve_root(root: &Path) -> PathBuf {
    match (root.parent(), root.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            dunce::canonicalize(parent)
                .map(|p| p.join(name))
                .unwrap_or_else(|_| root.to_path_buf())
        }
        _ => dunce::canonicalize(root).unwrap_or_else(|_| root.to_path_buf()),
    }
}

/// Every entry below and including each root, children before parents.
///
/// Links are recorded as non-directories and never followed. A root that
/// does not exist is still recorded, so its removal counts as deleted. An
/// entry reachable from several roots is recorded once.
fn enumerate_post_order(roots: &[PathBuf], cancel: &AtomicBool) -> Vec<Target> {
    let mut out = Vec::new();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    for root in roots {
        let root = resolve_root(root);
        let mut stack: Vec<(PathBuf, bool)> = vec![(root, false)];
        while let Some((path, expanded)) = stack.pop() {
            if cancel.load(Ordering::Relaxed) {
                debug!("Delete enumeration cancelled at {}", path.display());
                return out;
            }
            let depth = path.components().count();
            if expanded {
                out.push(Target {
                    path,
                    is_dir: true,
                    depth,
                });
                continue;
            }
            if !seen.insert(path.clone()) {
                continue;
            }

            let is_dir = std::fs::symlink_metadata(&path).is_ok_and(|m| m.is_dir());
            if !is_dir {
                out.push(Target {
                    path,
                    is_dir: false,
                    depth,
                });
                continue;
            }

            let children: Vec<PathBuf> = match std::fs::read_dir(&path) {
                Ok(rd) => rd.filter_map(Result::ok).map(|e| e.path()).collect(),
                Err(err) => {
                    debug!("Cannot enumerate {}: {err}", path.display());
                    Vec::new()
                }
            };
            stack.push((path, true));
            // Reversed so children pop in enumeration order.
            stack.extend(children.into_iter().rev().map(|c| (c, false)));
        }
    }
    out
}

fn remove_one(target: &Target, removal: &Removal, shared: &DeleteShared) {
    if shared.cancel.load(Ordering::Relaxed) {
        return;
    }
    let path = &target.path;

    let result = if removal.move_to_trash {
        // The recycler reports absence as a generic failure, so check first.
        match std::fs::symlink_metadata(path) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(err),
            _ => removal.recycler.recycle(path),
        }
    } else if target.is_dir {
        std::fs::remove_dir(path)
    } else {
        std::fs::remove_file(path)
    };

    match result {
        Ok(()) => record_deleted(path, shared),
        // Something else removed it first.
        Err(err) if err.kind() == io::ErrorKind::NotFound => record_deleted(path, shared),
        Err(err) => {
            warn!("Failed to remove {}: {err}", path.display());
            shared.failed.fetch_add(1, Ordering::Relaxed);
            shared.failures.lock().push(DeleteFailure {
                path: wire_path(path),
                message: err.to_string(),
            });
        }
    }
}

fn record_deleted(path: &Path, shared: &DeleteShared) {
    *shared.last_deleted.lock() = Some(wire_path(path));
    shared.deleted.fetch_add(1, Ordering::Relaxed);
}
