//! Key-addressed table of running operations.
//!
//! The registry guarantees at most one live operation per key. Once a poll
//! observes the end of an operation, that same call forgets it, so the next
//! `start` under the key begins fresh work.

use crate::error::EngineResult;
use crate::ops::{Operation, Progress};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tracing::debug;

pub struct OperationRegistry<K, O> {
    ops: Mutex<HashMap<K, Arc<O>>>,
}

impl<K, O> Default for OperationRegistry<K, O> {
    fn default() -> Self {
        Self {
            ops: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, O> OperationRegistry<K, O>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    O: Operation,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an operation under `key` unless one is already tracked.
    ///
    /// Returns `Ok(true)` when `ctor` ran and its operation is now tracked,
    /// `Ok(false)` when the key was taken. The lock is held across `ctor`, so
    /// two racing starts never both construct.
    pub fn start<F>(&self, key: K, ctor: F) -> EngineResult<bool>
    where
        F: FnOnce() -> EngineResult<O>,
    {
        let mut ops = self.ops.lock();
        if ops.contains_key(&key) {
            debug!("Operation {key:?} already running, start ignored");
            return Ok(false);
        }
        let op = ctor()?;
        ops.insert(key, Arc::new(op));
        Ok(true)
    }

    /// Drain the operation under `key`. `None` when nothing is tracked.
    pub fn poll(&self, key: &K) -> Option<O::Progress> {
        let op = self.get(key)?;
        let progress = op.poll();
        if progress.is_end() {
            self.forget(key, &op);
        }
        Some(progress)
    }

    /// Poll the first tracked operation whose key satisfies `pred`.
    pub fn poll_where<P>(&self, pred: P) -> Option<O::Progress>
    where
        P: Fn(&K) -> bool,
    {
        let (key, op) = {
            let ops = self.ops.lock();
            let (k, o) = ops.iter().find(|(k, _)| pred(k))?;
            (k.clone(), Arc::clone(o))
        };
        let progress = op.poll();
        if progress.is_end() {
            self.forget(&key, &op);
        }
        Some(progress)
    }

    /// Ask the operation under `key` to stop. Returns whether one was tracked.
    pub fn stop(&self, key: &K) -> bool {
        match self.get(key) {
            Some(op) => {
                op.stop();
                true
            }
            None => false,
        }
    }

    /// Ask every tracked operation to stop. They stay tracked until polled to
    /// their end.
    pub fn stop_all(&self) {
        for op in self.ops.lock().values() {
            op.stop();
        }
    }

    /// Stop every tracked operation and forget them all.
    pub fn clear(&self) {
        let drained: Vec<Arc<O>> = self.ops.lock().drain().map(|(_, op)| op).collect();
        for op in &drained {
            op.stop();
        }
        if !drained.is_empty() {
            debug!("Cleared {} operation(s)", drained.len());
        }
    }

    pub fn get(&self, key: &K) -> Option<Arc<O>> {
        self.ops.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.ops.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.ops.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.lock().is_empty()
    }

    /// Remove `key` only if it still maps to `op`; a newer operation started
    /// under the same key after a `clear` must survive.
    fn forget(&self, key: &K, op: &Arc<O>) {
        let mut ops = self.ops.lock();
        if ops.get(key).is_some_and(|current| Arc::ptr_eq(current, op)) {
            ops.remove(key);
            debug!("Operation {key:?} finished and was removed");
        }
    }
}
