//! Equality strategies used for change detection
//!
//! Whole-state subscriptions compare snapshots with the store's strategy.
//! Projection subscriptions use `PartialEq` on the projected value unless
//! the caller passes their own strategy.
//!
//! Three strategies ship with the crate:
//! - [`ByValue`] - structural equality via `PartialEq` (the default)
//! - [`ByHash`] - compares hash values only. Two distinct states whose
//!   hashes collide are reported as unchanged and the update is dropped.
//!   Use it only where hash-based change detection is an existing contract.
//! - [`EqFn`] - wraps any `Fn(&T, &T) -> bool`

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Decides whether two values are the same for notification purposes
pub trait StateEq<T: ?Sized>: Send + Sync {
    /// Returns `true` if `a` and `b` should be treated as unchanged
    fn same(&self, a: &T, b: &T) -> bool;
}

/// Structural equality via `PartialEq`
#[derive(Debug, Clone, Copy, Default)]
pub struct ByValue;

impl<T: PartialEq + ?Sized> StateEq<T> for ByValue {
    fn same(&self, a: &T, b: &T) -> bool {
        a == b
    }
}

/// Hash-value equality
///
/// Two values are equal iff their hashes are equal. Hash collisions hide
/// real changes, so prefer [`ByValue`] unless compatibility requires this.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByHash;

impl ByHash {
    fn hash_of<T: Hash + ?Sized>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }
}

impl<T: Hash + ?Sized> StateEq<T> for ByHash {
    fn same(&self, a: &T, b: &T) -> bool {
        Self::hash_of(a) == Self::hash_of(b)
    }
}

/// Caller-supplied equality function
///
/// ```
/// use lens_store::{EqFn, StateEq};
///
/// let case_insensitive = EqFn(|a: &String, b: &String| a.eq_ignore_ascii_case(b));
/// assert!(case_insensitive.same(&"Ada".to_string(), &"ADA".to_string()));
/// ```
#[derive(Clone, Copy)]
pub struct EqFn<F>(pub F);

impl<T: ?Sized, F> StateEq<T> for EqFn<F>
where
    F: Fn(&T, &T) -> bool + Send + Sync,
{
    fn same(&self, a: &T, b: &T) -> bool {
        (self.0)(a, b)
    }
}

impl<F> std::fmt::Debug for EqFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EqFn(..)")
    }
}

/// Equality strategy selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EqualityMode {
    /// [`ByValue`]
    #[default]
    Value,
    /// [`ByHash`]
    Hash,
}

impl EqualityMode {
    /// Build the strategy for this mode
    pub fn strategy<T>(self) -> Arc<dyn StateEq<T>>
    where
        T: PartialEq + Hash + ?Sized,
    {
        match self {
            EqualityMode::Value => Arc::new(ByValue),
            EqualityMode::Hash => Arc::new(ByHash),
        }
    }
}

/// Compares two optional values; absent equals absent, absent never equals present
pub(crate) fn same_option<T, E>(eq: &E, a: &Option<T>, b: &Option<T>) -> bool
where
    E: StateEq<T> + ?Sized,
{
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => eq.same(a, b),
        _ => false,
    }
}

/// Compares two snapshots, short-circuiting when both point at the same allocation
pub(crate) fn same_snapshot<S: ?Sized>(
    eq: &dyn StateEq<S>,
    a: &Option<Arc<S>>,
    b: &Option<Arc<S>>,
) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b) || eq.same(a, b),
        _ => false,
    }
}
