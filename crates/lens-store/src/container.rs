//! State container - owns the state, the reducer and the dispatch lock
//!
//! Dispatch runs as one critical section:
//!
//! ```text
//! lock -> before = state -> announce_pre(before) -> after = reducer(action, before)
//!      -> state = after -> announce_post(after) -> unlock
//! ```
//!
//! The lock is a fair mutex, so contending dispatchers are served in the
//! order they started waiting. Readers go through a separate `RwLock` and
//! never wait for a dispatch to finish, which lets subscriber callbacks read
//! the state they were just notified about.

use crate::equality::StateEq;
use crate::error::{Result, StoreError};
use crate::notifier::{ChangeNotifier, Snapshot};
use parking_lot::{FairMutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Boxed reducer: `(action, state) -> state`
pub(crate) type BoxedReducer<S, A> = Box<dyn Fn(&A, Option<&S>) -> Option<S> + Send + Sync>;

pub(crate) struct StateContainer<S, A> {
    /// Unregistered while empty, Registered once set; never reset
    reducer: OnceLock<BoxedReducer<S, A>>,
    state: RwLock<Snapshot<S>>,
    dispatch_lock: FairMutex<()>,
    notifier: ChangeNotifier<S>,
    equality: Arc<dyn StateEq<S>>,
    dispatches: AtomicU64,
}

impl<S, A> StateContainer<S, A> {
    pub(crate) fn new(equality: Arc<dyn StateEq<S>>) -> Self {
        Self::with_slot(equality, OnceLock::new())
    }

    /// Container that starts out Registered with `reducer`
    pub(crate) fn with_reducer(equality: Arc<dyn StateEq<S>>, reducer: BoxedReducer<S, A>) -> Self {
        Self::with_slot(equality, OnceLock::from(reducer))
    }

    fn with_slot(equality: Arc<dyn StateEq<S>>, reducer: OnceLock<BoxedReducer<S, A>>) -> Self {
        Self {
            reducer,
            state: RwLock::new(None),
            dispatch_lock: FairMutex::new(()),
            notifier: ChangeNotifier::new(),
            equality,
            dispatches: AtomicU64::new(0),
        }
    }

    /// Install the reducer; fails if one is already installed
    pub(crate) fn register(&self, reducer: BoxedReducer<S, A>) -> Result<()> {
        match self.reducer.set(reducer) {
            Ok(()) => {
                log::debug!("Reducer registered");
                Ok(())
            }
            Err(_rejected) => {
                log::warn!("Rejected second reducer registration, keeping the first");
                Err(StoreError::ReducerAlreadyRegistered)
            }
        }
    }

    pub(crate) fn is_registered(&self) -> bool {
        self.reducer.get().is_some()
    }

    /// Apply `action` through the reducer and announce the transition
    ///
    /// Does nothing while no reducer is registered.
    pub(crate) fn dispatch(&self, action: &A) {
        let Some(reducer) = self.reducer.get() else {
            log::debug!("Dispatch ignored: no reducer registered");
            return;
        };

        let _serial = self.dispatch_lock.lock();

        let before = self.state.read().clone();
        self.notifier.announce_pre(&before);

        let after: Snapshot<S> = reducer(action, before.as_deref()).map(Arc::new);
        *self.state.write() = after.clone();

        self.notifier.announce_post(&after);

        let count = self.dispatches.fetch_add(1, Ordering::AcqRel) + 1;
        log::trace!(
            "Dispatch #{} complete (state {})",
            count,
            if after.is_some() { "present" } else { "absent" }
        );
    }

    pub(crate) fn state(&self) -> Snapshot<S> {
        self.state.read().clone()
    }

    pub(crate) fn notifier(&self) -> &ChangeNotifier<S> {
        &self.notifier
    }

    pub(crate) fn equality(&self) -> Arc<dyn StateEq<S>> {
        self.equality.clone()
    }

    pub(crate) fn dispatches(&self) -> u64 {
        self.dispatches.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equality::ByValue;

    fn counter() -> StateContainer<i64, i64> {
        StateContainer::new(Arc::new(ByValue))
    }

    fn add() -> BoxedReducer<i64, i64> {
        Box::new(|delta, state| Some(state.copied().unwrap_or(0) + delta))
    }

    #[test]
    fn test_dispatch_before_register_is_noop() {
        let container = counter();
        container.dispatch(&1);
        assert!(container.state().is_none());
        assert_eq!(container.dispatches(), 0);
    }

    #[test]
    fn test_register_once() {
        let container = counter();
        assert!(!container.is_registered());
        assert_eq!(container.register(add()), Ok(()));
        assert!(container.is_registered());

        let replaced = container.register(Box::new(|_, _| Some(-1)));
        assert_eq!(replaced, Err(StoreError::ReducerAlreadyRegistered));

        container.dispatch(&5);
        assert_eq!(container.state().as_deref(), Some(&5));
    }

    #[test]
    fn test_reducer_may_clear_state() {
        let container = counter();
        container
            .register(Box::new(|delta, state| match delta {
                0 => None,
                d => Some(state.copied().unwrap_or(0) + d),
            }))
            .unwrap();

        container.dispatch(&3);
        assert_eq!(container.state().as_deref(), Some(&3));
        container.dispatch(&0);
        assert!(container.state().is_none());
        assert_eq!(container.dispatches(), 2);
    }

    #[test]
    fn test_with_reducer_starts_registered() {
        let container = StateContainer::with_reducer(Arc::new(ByValue), add());
        assert!(container.is_registered());
        assert_eq!(
            container.register(add()),
            Err(StoreError::ReducerAlreadyRegistered)
        );

        container.dispatch(&2);
        container.dispatch(&2);
        assert_eq!(container.state().as_deref(), Some(&4));
    }
}
