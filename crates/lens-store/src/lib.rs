//! Lens Store
//!
//! A generic, thread-safe state container following the unidirectional data
//! flow pattern: the state is replaced only by applying a pure reducer to a
//! dispatched action, and observers subscribe either to the whole state or
//! to a projection of it.
//!
//! - [`Store`] - the handle application code talks to
//! - [`Subscription`] - stream of changes (async `recv`, blocking, or
//!   `futures_core::Stream`)
//! - [`Observer`] - callback subscription, run in the dispatch critical section
//! - [`StateEq`] - pluggable equality used for change detection
//!
//! # Example
//!
//! ```
//! use lens_store::Store;
//!
//! #[derive(Clone, PartialEq)]
//! struct State {
//!     value: i32,
//!     user: String,
//! }
//!
//! enum Action {
//!     Increment,
//!     Login(String),
//! }
//!
//! let store = Store::with_reducer(|action: &Action, state: Option<&State>| {
//!     let mut next = state.cloned().unwrap_or(State { value: 0, user: String::new() });
//!     match action {
//!         Action::Increment => next.value += 1,
//!         Action::Login(user) => next.user = user.clone(),
//!     }
//!     Some(next)
//! });
//!
//! let mut values = store.subscribe_to(|s: &State| s.value);
//! store.dispatch(Action::Increment);
//! store.dispatch(Action::Login("ada".into()));
//!
//! // The login changed only `user`, so `values` saw one change
//! assert_eq!(values.drain(), vec![1]);
//! ```

mod container;
mod equality;
mod error;
mod notifier;
mod pairing;
mod store;
mod subscription;

pub use equality::{ByHash, ByValue, EqFn, EqualityMode, StateEq};
pub use error::{Result, StoreError};
pub use notifier::Snapshot;
pub use store::{Store, WeakStore};
pub use subscription::{Delivery, Observer, Subscription};
