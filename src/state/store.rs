//! Observable state container with transactional updates
//!
//! A `Store` owns one state value and publishes it through a
//! `tokio::sync::watch` channel. Every mutation goes through [`Store::apply`]
//! or [`Store::apply_if`], which run the whole closure under the channel's
//! write lock and notify observers once when it returns. A compound update
//! such as "clear results and reset progress" is therefore never observed
//! half-applied.

use std::sync::Arc;
use tokio::sync::watch;

/// Shared, observable state value
#[derive(Debug)]
pub struct Store<S> {
    tx: Arc<watch::Sender<S>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<S> Store<S> {
    /// Create a store holding `initial`
    #[must_use]
    pub fn new(initial: S) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Apply a group of mutations atomically and publish once
    pub fn apply<F>(&self, update: F)
    where
        F: FnOnce(&mut S),
    {
        self.tx.send_modify(update);
    }

    /// Apply mutations atomically, publishing only when `update` returns `true`
    ///
    /// Returns whatever `update` returned. Used for updates that may turn out
    /// to be stale once the lock is held.
    pub fn apply_if<F>(&self, update: F) -> bool
    where
        F: FnOnce(&mut S) -> bool,
    {
        self.tx.send_if_modified(update)
    }

    /// Run `f` against the current state without cloning it
    pub fn read<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&S) -> R,
    {
        f(&self.tx.borrow())
    }

    /// Subscribe to state changes
    ///
    /// The receiver starts out having seen the current value.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<S> {
        self.tx.subscribe()
    }
}

impl<S: Clone> Store<S> {
    /// Snapshot of the current state
    #[must_use]
    pub fn get(&self) -> S {
        self.tx.borrow().clone()
    }
}

impl<S: Default> Default for Store<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}
