//! Change notifier - pre/post announcement channels and per-subscription diffing
//!
//! The notifier keeps a registry of listeners. Each dispatch announces the
//! snapshot before the reducer ran ([`ChangeNotifier::announce_pre`]) and the
//! snapshot it produced ([`ChangeNotifier::announce_post`]). Every listener
//! feeds both announcements into its own [`Pairing`] and delivers only when
//! the pair it forms differs under its equality.
//!
//! Announcements are only made while the store's dispatch lock is held, so
//! at most one announcement is in flight. During delivery the entries are
//! moved out of the registry, which lets callbacks subscribe or detach
//! without contending on the registry lock. They are put back when delivery
//! ends, even if a callback panics.

use crate::equality::{same_option, same_snapshot, StateEq};
use crate::pairing::{Pairing, Side};
use crate::subscription::{Delivery, Liveness, Sink};
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared, immutable view of the state; `None` while the state is absent
pub type Snapshot<S> = Option<Arc<S>>;

/// One registered interest in the state
pub(crate) trait Listener<S>: Send {
    fn on_announce(&mut self, side: Side, snapshot: &Snapshot<S>) -> Delivery;
}

/// Whole-state listener: delivers the post snapshot when it differs from pre
pub(crate) struct WholeState<S, K> {
    eq: Arc<dyn StateEq<S>>,
    cells: Pairing<Snapshot<S>>,
    sink: K,
}

impl<S, K> WholeState<S, K> {
    pub(crate) fn new(eq: Arc<dyn StateEq<S>>, sink: K) -> Self {
        Self {
            eq,
            cells: Pairing::new(),
            sink,
        }
    }
}

impl<S, K> Listener<S> for WholeState<S, K>
where
    S: Send + Sync,
    K: Sink<Snapshot<S>>,
{
    fn on_announce(&mut self, side: Side, snapshot: &Snapshot<S>) -> Delivery {
        let eq = &self.eq;
        match self
            .cells
            .changed(side, snapshot.clone(), |a, b| same_snapshot(&**eq, a, b))
        {
            Some(post) => self.sink.deliver(post.clone()),
            None => Delivery::Continue,
        }
    }
}

/// Projection listener: maps both snapshots through `projection` first
///
/// An absent state projects to an absent value. Absent projected values
/// take part in the comparison but are never delivered.
pub(crate) struct Projected<S, P, F, E, K> {
    projection: F,
    eq: E,
    cells: Pairing<Option<P>>,
    sink: K,
    _state: PhantomData<fn(&S)>,
}

impl<S, P, F, E, K> Projected<S, P, F, E, K> {
    pub(crate) fn new(projection: F, eq: E, sink: K) -> Self {
        Self {
            projection,
            eq,
            cells: Pairing::new(),
            sink,
            _state: PhantomData,
        }
    }
}

impl<S, P, F, E, K> Listener<S> for Projected<S, P, F, E, K>
where
    P: Clone + Send,
    F: Fn(&S) -> P + Send,
    E: StateEq<P>,
    K: Sink<P>,
{
    fn on_announce(&mut self, side: Side, snapshot: &Snapshot<S>) -> Delivery {
        let projected = snapshot.as_deref().map(&self.projection);
        let eq = &self.eq;
        match self
            .cells
            .changed(side, projected, |a, b| same_option(eq, a, b))
        {
            Some(Some(post)) => self.sink.deliver(post.clone()),
            _ => Delivery::Continue,
        }
    }
}

struct Entry<S> {
    id: u64,
    liveness: Liveness,
    listener: Box<dyn Listener<S>>,
}

/// Registry of listeners plus the two announcement channels
pub(crate) struct ChangeNotifier<S> {
    entries: Mutex<Vec<Entry<S>>>,
    live: Arc<AtomicUsize>,
    next_id: AtomicU64,
}

impl<S> ChangeNotifier<S> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            live: Arc::new(AtomicUsize::new(0)),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a listener; it observes announcements from now on
    pub(crate) fn attach(&self, listener: Box<dyn Listener<S>>) -> Liveness {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let liveness = Liveness::new(self.live.clone());
        self.entries.lock().push(Entry {
            id,
            liveness: liveness.clone(),
            listener,
        });
        log::debug!("Subscription {} attached", id);
        liveness
    }

    /// Number of attached listeners
    pub(crate) fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Announce the state as it was before the reducer ran
    pub(crate) fn announce_pre(&self, before: &Snapshot<S>) {
        self.announce(Side::Pre, before);
    }

    /// Announce the state the reducer produced
    pub(crate) fn announce_post(&self, after: &Snapshot<S>) {
        self.announce(Side::Post, after);
    }

    fn announce(&self, side: Side, snapshot: &Snapshot<S>) {
        let mut delivery = Delivering {
            registry: &self.entries,
            entries: std::mem::take(&mut *self.entries.lock()),
            current: None,
        };

        for index in 0..delivery.entries.len() {
            delivery.current = Some(index);
            let entry = &mut delivery.entries[index];
            // Detached while waiting for this announcement
            if !entry.liveness.is_active() {
                continue;
            }
            if entry.listener.on_announce(side, snapshot) == Delivery::Detach
                && entry.liveness.detach()
            {
                log::debug!("Subscription {} detached by its sink", entry.id);
            }
        }
        delivery.current = None;
    }
}

/// Entries taken out of the registry for one announcement
///
/// Dropping it puts them back, also while unwinding from a panicking
/// listener. The listener that panicked is detached; the others keep their
/// registration.
struct Delivering<'a, S> {
    registry: &'a Mutex<Vec<Entry<S>>>,
    entries: Vec<Entry<S>>,
    current: Option<usize>,
}

impl<S> Drop for Delivering<'_, S> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            if let Some(entry) = self.current.and_then(|index| self.entries.get(index)) {
                if entry.liveness.detach() {
                    log::warn!("Subscription {} panicked during delivery, detaching", entry.id);
                }
            }
        }

        let mut entries = std::mem::take(&mut self.entries);
        let mut registry = self.registry.lock();
        // Listeners attached during delivery
        entries.append(&mut registry);
        entries.retain(|entry| {
            let keep = entry.liveness.is_active();
            if !keep {
                log::trace!("Pruning subscription {}", entry.id);
            }
            keep
        });
        *registry = entries;
    }
}
