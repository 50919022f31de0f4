//! Subscription handles and delivery sinks
//!
//! A subscription is a live registration in the [`ChangeNotifier`]. It is
//! delivered to either through a channel ([`Subscription`], for stream-style
//! consumers) or through a callback ([`Observer`], invoked synchronously in
//! the dispatch critical section).
//!
//! Both handles detach on drop. Detaching takes effect immediately: the
//! notifier checks the flag before each delivery and prunes detached entries
//! on its next announcement.
//!
//! [`ChangeNotifier`]: crate::notifier::ChangeNotifier

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc::{self, error::TryRecvError};

/// What a sink wants after a delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Keep delivering
    Continue,
    /// Detach this subscription
    Detach,
}

impl From<()> for Delivery {
    fn from(_: ()) -> Self {
        Delivery::Continue
    }
}

impl From<bool> for Delivery {
    /// `true` keeps the subscription, `false` detaches it
    fn from(keep: bool) -> Self {
        if keep {
            Delivery::Continue
        } else {
            Delivery::Detach
        }
    }
}

/// Destination for notifications of one subscription
pub(crate) trait Sink<T>: Send {
    fn deliver(&mut self, value: T) -> Delivery;
}

impl<T: Send> Sink<T> for mpsc::UnboundedSender<T> {
    fn deliver(&mut self, value: T) -> Delivery {
        match self.send(value) {
            Ok(()) => Delivery::Continue,
            // Receiver dropped
            Err(_) => Delivery::Detach,
        }
    }
}

/// Callback sink used by `observe`
pub(crate) struct CallbackSink<F>(pub(crate) F);

impl<T, F, R> Sink<T> for CallbackSink<F>
where
    F: FnMut(T) -> R + Send,
    R: Into<Delivery>,
{
    fn deliver(&mut self, value: T) -> Delivery {
        (self.0)(value).into()
    }
}

/// Shared liveness flag of one registration
///
/// The notifier and the handle hold clones; whichever side detaches first
/// decrements the live counter, exactly once.
#[derive(Debug, Clone)]
pub(crate) struct Liveness {
    active: Arc<AtomicBool>,
    live: Arc<AtomicUsize>,
}

impl Liveness {
    pub(crate) fn new(live: Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::AcqRel);
        Self {
            active: Arc::new(AtomicBool::new(true)),
            live,
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Returns `true` if this call performed the detach
    pub(crate) fn detach(&self) -> bool {
        if self.active.swap(false, Ordering::AcqRel) {
            self.live.fetch_sub(1, Ordering::AcqRel);
            true
        } else {
            false
        }
    }
}

/// Stream of change notifications
///
/// Yields a value for every dispatch that changed what this subscription
/// watches, starting at the moment it was created. Values are queued
/// without bound, in dispatch order. The stream ends (`None`) only once the
/// store itself has been dropped.
///
/// ```
/// use lens_store::Store;
/// use std::sync::Arc;
///
/// let store = Store::<i32, i32>::new();
/// store.register(|delta: &i32, state: Option<&i32>| Some(state.unwrap_or(&0) + delta)).unwrap();
///
/// let mut changes = store.subscribe();
/// store.dispatch(2);
/// assert_eq!(changes.try_recv(), Some(Some(Arc::new(2))));
/// ```
#[must_use = "dropping a Subscription unsubscribes it"]
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
    liveness: Liveness,
}

impl<T> Subscription<T> {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<T>, liveness: Liveness) -> Self {
        Self { rx, liveness }
    }

    /// Wait for the next notification
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Block the current thread until the next notification
    ///
    /// Must not be called from within an async runtime.
    pub fn blocking_recv(&mut self) -> Option<T> {
        self.rx.blocking_recv()
    }

    /// Take the next queued notification, if any
    pub fn try_recv(&mut self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(value) => Some(value),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Take every queued notification
    pub fn drain(&mut self) -> Vec<T> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Whether notifications are still being delivered
    pub fn is_active(&self) -> bool {
        self.liveness.is_active()
    }

    /// Stop delivery
    ///
    /// Equivalent to dropping the subscription.
    pub fn unsubscribe(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if self.liveness.detach() {
            log::debug!("Subscription dropped, detaching");
        }
    }
}

impl<T> futures_core::Stream for Subscription<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Handle of a callback subscription
///
/// The callback runs while the dispatching thread holds the store's dispatch
/// lock. It may read the store, subscribe, or unsubscribe, but calling
/// `dispatch` on the same store from inside it deadlocks.
#[must_use = "dropping an Observer detaches its callback"]
#[derive(Debug)]
pub struct Observer {
    liveness: Liveness,
}

impl Observer {
    pub(crate) fn new(liveness: Liveness) -> Self {
        Self { liveness }
    }

    /// Whether the callback is still attached
    pub fn is_active(&self) -> bool {
        self.liveness.is_active()
    }

    /// Detach the callback
    pub fn detach(self) {}
}

impl Drop for Observer {
    fn drop(&mut self) {
        if self.liveness.detach() {
            log::debug!("Observer dropped, detaching");
        }
    }
}
