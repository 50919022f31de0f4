//! Combine-latest pairing over the pre-update and post-update channels
//!
//! Every subscription owns one [`Pairing`]: two single-slot cells holding the
//! latest value it has seen on each channel since it attached. Each new value
//! replaces its slot and, once both slots are filled, forms a `(pre, post)`
//! pair that the subscription compares.
//!
//! A dispatch emits `pre_n` then `post_n`. Since `pre_n` is always equal to
//! `post_{n-1}`, the pair formed when `pre_n` arrives would compare a value
//! with itself, so only the pair formed when `post_n` arrives is evaluated.
//! Skipping the pre pair also keeps non-reflexive equalities (a projection
//! yielding `NaN`) from re-delivering the previous post value. A fresh
//! pairing has both slots empty, so nothing from before the attach point is
//! ever compared or replayed.

/// Which channel a value was announced on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    /// Snapshot taken before the reducer ran
    Pre,
    /// Snapshot produced by the reducer
    Post,
}

/// Two latest-value cells
#[derive(Debug)]
pub(crate) struct Pairing<T> {
    pre: Option<T>,
    post: Option<T>,
}

impl<T> Pairing<T> {
    pub(crate) fn new() -> Self {
        Self {
            pre: None,
            post: None,
        }
    }

    /// Store `value` in the slot for `side`
    ///
    /// Returns the `(pre, post)` pair if the other slot has been filled.
    pub(crate) fn push(&mut self, side: Side, value: T) -> Option<(&T, &T)> {
        match side {
            Side::Pre => self.pre = Some(value),
            Side::Post => self.post = Some(value),
        }
        match (&self.pre, &self.post) {
            (Some(pre), Some(post)) => Some((pre, post)),
            _ => None,
        }
    }

    /// Push and, on the post side, return the post value if the pair differs
    pub(crate) fn changed(
        &mut self,
        side: Side,
        value: T,
        same: impl FnOnce(&T, &T) -> bool,
    ) -> Option<&T> {
        let (pre, post) = self.push(side, value)?;
        if side == Side::Pre || same(pre, post) {
            None
        } else {
            Some(post)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq(a: &i32, b: &i32) -> bool {
        a == b
    }

    #[test]
    fn test_no_pair_until_both_sides_seen() {
        let mut pairing = Pairing::new();
        assert!(pairing.push(Side::Pre, 1).is_none());
        assert_eq!(pairing.push(Side::Post, 2), Some((&1, &2)));
    }

    #[test]
    fn test_post_first_waits_for_pre() {
        // Attached between pre and post of a dispatch
        let mut pairing = Pairing::new();
        assert!(pairing.changed(Side::Post, 5, eq).is_none());
        // Next dispatch: pre equals the last post, so nothing fires
        assert!(pairing.changed(Side::Pre, 5, eq).is_none());
        assert_eq!(pairing.changed(Side::Post, 6, eq), Some(&6));
    }

    #[test]
    fn test_dispatch_sequence_fires_once_per_change() {
        let mut pairing = Pairing::new();
        let mut fired = Vec::new();
        let mut state = 0;
        for next in [1, 1, 2, 2, 2, 3] {
            if let Some(v) = pairing.changed(Side::Pre, state, eq) {
                fired.push(*v);
            }
            state = next;
            if let Some(v) = pairing.changed(Side::Post, state, eq) {
                fired.push(*v);
            }
        }
        assert_eq!(fired, vec![1, 2, 3]);
    }

    #[test]
    fn test_pre_side_is_never_evaluated() {
        let mut pairing = Pairing::new();
        let never_same = |_: &f64, _: &f64| false;
        assert!(pairing.changed(Side::Pre, 1.0, never_same).is_none());
        assert_eq!(pairing.changed(Side::Post, 2.0, never_same), Some(&2.0));
        // Pre of the next dispatch pairs with the last post: not evaluated
        assert!(pairing.changed(Side::Pre, 2.0, never_same).is_none());
    }
}
