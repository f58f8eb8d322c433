/// Background operations: long-running filesystem scans with a poll-based
/// progress contract.
///
/// Every operation owns exactly one worker thread for its whole life. The
/// caller never talks to the worker directly; it calls [`Operation::poll`]
/// once per UI tick to drain whatever accumulated since the last call, and
/// learns from the returned progress when the worker is done.
///
/// - [`list`]: one-level directory listing with pause/resume backpressure.
/// - [`find`]: breadth-first recursive name search.
/// - [`size`]: recursive byte count, finished when its thread terminates.
/// - [`delete`]: post-order recursive delete or recycle on a bounded pool.
pub mod delete;
pub mod find;
pub mod list;
pub mod query;
pub mod size;

pub use delete::{DeleteFailure, DeleteOp, DeleteProgress, Recycler, SystemTrash};
pub use find::{FindOp, FindProgress};
pub use list::{ListOp, ListProgress, ListState};
pub use query::Query;
pub use size::{SizeOp, SizeProgress};

use crate::error::EngineResult;
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::thread::{self, JoinHandle};

/// A polled snapshot that knows whether it is the last one.
pub trait Progress: Serialize + Send {
    /// `true` once the worker has finished and everything it produced is
    /// contained in this or an earlier snapshot.
    fn is_end(&self) -> bool;
}

/// A unit of background work tracked by an
/// [`OperationRegistry`](crate::registry::OperationRegistry).
pub trait Operation: Send + Sync + 'static {
    type Progress: Progress;

    /// Drain accumulated results without stopping the worker.
    fn poll(&self) -> Self::Progress;

    /// Ask the worker to stop at its next checkpoint. Non-blocking, and a
    /// no-op for operations without cooperative cancellation.
    fn stop(&self);
}

/// Spawn a named worker thread.
pub(crate) fn spawn_worker<F>(name: &str, work: F) -> EngineResult<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    Ok(thread::Builder::new().name(name.to_owned()).spawn(work)?)
}

/// Producer/consumer handshake used by listings.
///
/// The consumer pauses before draining and resumes after; the producer
/// blocks on the condition variable instead of spinning while paused.
#[derive(Default)]
pub(crate) struct PauseGate {
    paused: Mutex<bool>,
    resumed: Condvar,
}

impl PauseGate {
    pub(crate) fn pause(&self) {
        *self.paused.lock() = true;
    }

    pub(crate) fn resume(&self) {
        *self.paused.lock() = false;
        self.resumed.notify_all();
    }

    pub(crate) fn is_paused(&self) -> bool {
        *self.paused.lock()
    }

    /// Block the calling producer until the gate is open.
    pub(crate) fn wait_while_paused(&self) {
        let mut paused = self.paused.lock();
        while *paused {
            self.resumed.wait(&mut paused);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn gate_blocks_producer_until_resumed() {
        let gate = Arc::new(PauseGate::default());
        let passed = Arc::new(AtomicBool::new(false));
        gate.pause();

        let producer = {
            let gate = Arc::clone(&gate);
            let passed = Arc::clone(&passed);
            std::thread::spawn(move || {
                gate.wait_while_paused();
                passed.store(true, Ordering::SeqCst);
            })
        };

        std::thread::sleep(Duration::from_millis(50));
        assert!(!passed.load(Ordering::SeqCst), "producer ran while paused");
        assert!(gate.is_paused());

        gate.resume();
        producer.join().unwrap();
        assert!(passed.load(Ordering::SeqCst));
    }

    #[test]
    fn open_gate_does_not_block() {
        let gate = PauseGate::default();
        gate.wait_while_paused();
        assert!(!gate.is_paused());
    }

    #[test]
    fn spawn_worker_names_thread() {
        let handle = spawn_worker("burrow-test-worker", || {
            assert_eq!(std::thread::current().name(), Some("burrow-test-worker"));
        })
        .unwrap();
        handle.join().unwrap();
    }
}
