use crate::container::StateContainer;
use crate::equality::{ByValue, EqualityMode, StateEq};
use crate::error::Result;
use crate::notifier::{Projected, Snapshot, WholeState};
use crate::subscription::{CallbackSink, Delivery, Observer, Subscription};
use std::hash::Hash;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;

/// Store - holds the state and runs the unidirectional data flow
///
/// The state only ever changes through [`Store::dispatch`], which runs the
/// registered reducer under a lock and announces the transition to all
/// subscriptions. Cloning a store yields another handle to the same state.
///
/// # Example
/// ```
/// use lens_store::Store;
///
/// enum Action {
///     Increment,
///     Decrement,
/// }
///
/// let store = Store::with_reducer(|action: &Action, state: Option<&i32>| {
///     let value = state.copied().unwrap_or(0);
///     match action {
///         Action::Increment => Some(value + 1),
///         Action::Decrement => Some(value - 1),
///     }
/// });
///
/// store.dispatch(Action::Increment);
/// store.dispatch(Action::Increment);
/// store.dispatch(Action::Decrement);
/// assert_eq!(store.select(|v| *v), Some(1));
/// ```
///
/// # Reentrancy
///
/// Reducers and observer callbacks run while the dispatch lock is held.
/// Calling `dispatch` on the same store from inside either one deadlocks.
pub struct Store<S, A> {
    inner: Arc<StateContainer<S, A>>,
}

impl<S, A> Clone for Store<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: PartialEq, A> Default for Store<S, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: PartialEq, A> Store<S, A> {
    /// Create an empty store without a reducer, comparing states by value
    pub fn new() -> Self {
        Self::with_equality(Arc::new(ByValue))
    }

    /// Create a store whose reducer is fixed at construction
    pub fn with_reducer<R>(reducer: R) -> Self
    where
        R: Fn(&A, Option<&S>) -> Option<S> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(StateContainer::with_reducer(
                Arc::new(ByValue),
                Box::new(reducer),
            )),
        }
    }
}

impl<S: PartialEq + Hash, A> Store<S, A> {
    /// Create an empty store using the equality strategy named by `mode`
    pub fn with_mode(mode: EqualityMode) -> Self {
        log::debug!("Creating store with {:?} equality", mode);
        Self::with_equality(mode.strategy())
    }
}

impl<S, A> Store<S, A> {
    /// Create an empty store comparing whole states with `equality`
    pub fn with_equality(equality: Arc<dyn StateEq<S>>) -> Self {
        Self {
            inner: Arc::new(StateContainer::new(equality)),
        }
    }

    /// Register the reducer
    ///
    /// Succeeds once. Later calls return
    /// [`StoreError::ReducerAlreadyRegistered`](crate::StoreError::ReducerAlreadyRegistered)
    /// and leave the first reducer in place.
    pub fn register<R>(&self, reducer: R) -> Result<()>
    where
        R: Fn(&A, Option<&S>) -> Option<S> + Send + Sync + 'static,
    {
        self.inner.register(Box::new(reducer))
    }

    /// Whether a reducer has been registered
    pub fn is_registered(&self) -> bool {
        self.inner.is_registered()
    }

    /// Apply `action` and notify subscribers
    ///
    /// Silently ignored while no reducer is registered. Blocks while another
    /// dispatch is in progress.
    pub fn dispatch(&self, action: A) {
        self.inner.dispatch(&action);
    }

    /// Current state, `None` until the first dispatch produced one
    pub fn state(&self) -> Snapshot<S> {
        self.inner.state()
    }

    /// Project the current state, `None` while the state is absent
    pub fn select<P>(&self, projection: impl FnOnce(&S) -> P) -> Option<P> {
        self.inner.state().as_deref().map(projection)
    }

    /// Number of dispatches applied through the reducer
    pub fn dispatch_count(&self) -> u64 {
        self.inner.dispatches()
    }

    /// Number of live subscriptions and observers
    pub fn subscriber_count(&self) -> usize {
        self.inner.notifier().live()
    }

    /// Non-owning handle, for callbacks that need to reach back into the store
    pub fn downgrade(&self) -> WeakStore<S, A> {
        WeakStore {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

/// Non-owning handle to a [`Store`]
///
/// Observers are owned by the store they observe. Capturing a `Store` clone
/// in an observer callback keeps the store alive through its own registry;
/// capture a `WeakStore` instead.
pub struct WeakStore<S, A> {
    inner: Weak<StateContainer<S, A>>,
}

impl<S, A> WeakStore<S, A> {
    /// Get the store back, `None` once every `Store` handle was dropped
    pub fn upgrade(&self) -> Option<Store<S, A>> {
        self.inner.upgrade().map(|inner| Store { inner })
    }
}

impl<S, A> Clone for WeakStore<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S, A> std::fmt::Debug for WeakStore<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakStore")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl<S, A> Store<S, A>
where
    S: Send + Sync + 'static,
{
    /// Subscribe to whole-state changes
    ///
    /// Yields the new snapshot after every dispatch that changed the state
    /// under the store's equality. Nothing that happened before this call is
    /// replayed.
    pub fn subscribe(&self) -> Subscription<Snapshot<S>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let listener = WholeState::new(self.inner.equality(), tx);
        let liveness = self.inner.notifier().attach(Box::new(listener));
        Subscription::new(rx, liveness)
    }

    /// Subscribe to changes of a projected value
    ///
    /// Dispatches that leave `projection(state)` unchanged are not delivered,
    /// whatever else they changed. An absent state is never delivered.
    pub fn subscribe_to<P, F>(&self, projection: F) -> Subscription<P>
    where
        P: PartialEq + Clone + Send + 'static,
        F: Fn(&S) -> P + Send + 'static,
    {
        self.subscribe_to_by(projection, ByValue)
    }

    /// Like [`Store::subscribe_to`], comparing projected values with `equality`
    pub fn subscribe_to_by<P, F, E>(&self, projection: F, equality: E) -> Subscription<P>
    where
        P: Clone + Send + 'static,
        F: Fn(&S) -> P + Send + 'static,
        E: StateEq<P> + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let listener = Projected::<S, P, F, E, _>::new(projection, equality, tx);
        let liveness = self.inner.notifier().attach(Box::new(listener));
        Subscription::new(rx, liveness)
    }

    /// Run `callback` with every whole-state change
    ///
    /// The callback runs synchronously on the dispatching thread, in the
    /// dispatch critical section. Returning `false` (or
    /// [`Delivery::Detach`]) detaches it; returning `()` keeps it.
    ///
    /// A callback that panics is detached and the panic propagates out of
    /// `dispatch`; the state has already been updated and other
    /// subscriptions keep receiving later changes.
    ///
    /// To read the store from the callback, capture [`Store::downgrade`]
    /// rather than a `Store` clone, which would form a reference cycle.
    pub fn observe<F, R>(&self, callback: F) -> Observer
    where
        F: FnMut(Snapshot<S>) -> R + Send + 'static,
        R: Into<Delivery>,
    {
        let listener = WholeState::new(self.inner.equality(), CallbackSink(callback));
        Observer::new(self.inner.notifier().attach(Box::new(listener)))
    }

    /// Run `callback` with every change of `projection(state)`
    pub fn observe_to<P, F, C, R>(&self, projection: F, callback: C) -> Observer
    where
        P: PartialEq + Clone + Send + 'static,
        F: Fn(&S) -> P + Send + 'static,
        C: FnMut(P) -> R + Send + 'static,
        R: Into<Delivery>,
    {
        let sink = CallbackSink(callback);
        let listener = Projected::<S, P, F, _, _>::new(projection, ByValue, sink);
        Observer::new(self.inner.notifier().attach(Box::new(listener)))
    }
}

impl<S, A> std::fmt::Debug for Store<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("registered", &self.is_registered())
            .field("present", &self.inner.state().is_some())
            .field("dispatches", &self.dispatch_count())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq, Hash)]
    struct Counter {
        value: i32,
        user: String,
    }

    #[derive(Debug)]
    enum Action {
        Increment,
        Decrement,
        Rename(&'static str),
    }

    fn reduce(action: &Action, state: Option<&Counter>) -> Option<Counter> {
        let mut next = state.cloned().unwrap_or(Counter {
            value: 0,
            user: String::new(),
        });
        match action {
            Action::Increment => next.value += 1,
            Action::Decrement => next.value -= 1,
            Action::Rename(user) => next.user = user.to_string(),
        }
        Some(next)
    }

    #[test]
    fn test_store_increment_increment_decrement() {
        let store = Store::with_reducer(reduce);
        store.dispatch(Action::Increment);
        store.dispatch(Action::Increment);
        store.dispatch(Action::Decrement);
        assert_eq!(store.select(|s| s.value), Some(1));
        assert_eq!(store.dispatch_count(), 3);
    }

    #[test]
    fn test_store_absent_until_first_dispatch() {
        let store = Store::<Counter, Action>::new();
        assert!(store.state().is_none());
        assert!(store.select(|s| s.value).is_none());

        store.dispatch(Action::Increment);
        assert!(store.state().is_none(), "unregistered dispatch is a no-op");

        store.register(reduce).unwrap();
        store.dispatch(Action::Increment);
        assert!(store.state().is_some());
        assert_eq!(store.select(|s| s.value), Some(1));
    }

    #[test]
    fn test_store_with_reducer_rejects_register() {
        let store = Store::with_reducer(reduce);
        assert_eq!(
            store.register(|_: &Action, _: Option<&Counter>| None),
            Err(StoreError::ReducerAlreadyRegistered)
        );
        store.dispatch(Action::Rename("ada"));
        assert_eq!(store.select(|s| s.user.clone()).as_deref(), Some("ada"));
    }

    #[test]
    fn test_store_clones_share_state() {
        let store = Store::with_reducer(reduce);
        let other = store.clone();
        other.dispatch(Action::Increment);
        assert_eq!(store.select(|s| s.value), Some(1));
    }

    #[test]
    fn test_observe_runs_synchronously() {
        let store = Store::with_reducer(reduce);
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _observer = store.observe(move |snapshot: Snapshot<Counter>| {
            if let Some(state) = snapshot {
                sink.lock().push(state.value);
            }
        });

        store.dispatch(Action::Increment);
        assert_eq!(*seen.lock(), vec![1]);
        store.dispatch(Action::Rename("bob"));
        store.dispatch(Action::Increment);
        assert_eq!(*seen.lock(), vec![1, 1, 2]);
    }

    #[test]
    fn test_observe_to_detaches_on_false() {
        let store = Store::with_reducer(reduce);
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let observer = store.observe_to(
            |s: &Counter| s.value,
            move |value: i32| {
                sink.lock().push(value);
                value < 2
            },
        );

        for _ in 0..4 {
            store.dispatch(Action::Increment);
        }
        assert_eq!(*seen.lock(), vec![1, 2]);
        assert!(!observer.is_active());
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn test_observer_can_read_state() {
        let store = Store::with_reducer(reduce);
        let reader = store.downgrade();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _observer = store.observe_to(
            |s: &Counter| s.value,
            move |_| {
                let value = reader.upgrade().and_then(|store| store.select(|s| s.value));
                sink.lock().push(value);
            },
        );

        store.dispatch(Action::Increment);
        assert_eq!(*seen.lock(), vec![Some(1)]);
    }

    #[test]
    fn test_observer_can_subscribe_during_delivery() {
        let store = Store::with_reducer(reduce);
        let handle = store.downgrade();
        let late = Arc::new(parking_lot::Mutex::new(None));
        let slot = late.clone();
        let _observer = store.observe(move |_: Snapshot<Counter>| {
            let mut slot = slot.lock();
            if slot.is_none() {
                if let Some(store) = handle.upgrade() {
                    *slot = Some(store.subscribe_to(|s: &Counter| s.value));
                }
            }
        });

        store.dispatch(Action::Increment);
        store.dispatch(Action::Increment);

        let mut late = late.lock().take().unwrap();
        assert_eq!(late.drain(), vec![2]);
    }

    #[test]
    fn test_with_mode_hash() {
        let store = Store::<Counter, Action>::with_mode(EqualityMode::Hash);
        store.register(reduce).unwrap();
        let mut changes = store.subscribe();

        store.dispatch(Action::Increment);
        store.dispatch(Action::Rename(""));
        assert_eq!(changes.drain().len(), 1);
    }

    #[test]
    fn test_debug_output() {
        let store = Store::<Counter, Action>::new();
        let debug = format!("{:?}", store);
        assert!(debug.contains("registered: false"));
        assert!(debug.contains("present: false"));
    }

    #[test]
    fn test_weak_handle_in_observer_lets_store_drop() {
        let store = Store::with_reducer(reduce);
        let weak = store.downgrade();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let reader = store.downgrade();
        let _observer = store.observe(move |_: Snapshot<Counter>| {
            if let Some(store) = reader.upgrade() {
                sink.lock().push(store.dispatch_count());
            }
        });
        let mut changes = store.subscribe();

        store.dispatch(Action::Increment);
        assert_eq!(*seen.lock(), vec![0]);

        drop(store);
        assert!(weak.upgrade().is_none());
        assert!(changes.try_recv().is_some());
        // Registry went away with the store: the channel is closed
        assert!(changes.blocking_recv().is_none());
    }

    #[test]
    fn test_panicking_observer_keeps_store_usable() {
        let store = Store::with_reducer(reduce);
        let observer = store.observe_to(
            |s: &Counter| s.value,
            |value: i32| {
                if value == 1 {
                    panic!("observer failed");
                }
            },
        );
        let mut values = store.subscribe_to(|s: &Counter| s.value);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            store.dispatch(Action::Increment)
        }));
        assert!(result.is_err());
        assert_eq!(store.select(|s| s.value), Some(1));
        assert!(!observer.is_active());
        assert!(values.is_active());
        assert_eq!(store.subscriber_count(), 1);

        store.dispatch(Action::Increment);
        store.dispatch(Action::Increment);
        assert_eq!(values.drain(), vec![2, 3]);
    }
}
