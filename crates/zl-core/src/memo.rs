//! Dependency-tracked cache cells — the memoization primitive behind
//! every derived quantity.
//!
//! A [`MemoCell`] stores the last-seen inputs and the last output of a
//! pure combining function. Re-evaluation compares input *identity*
//! (`Arc` pointer equality for shared maps, plain equality for copyable
//! scalars), not deep equality, before deciding whether to recompute.
//! The combining function must be pure and total in its declared inputs;
//! that precondition is documented, not runtime-checked, and violating
//! it silently breaks the caching invariant.

use std::cell::{Cell, RefCell};
use std::sync::Arc;

/// Identity comparison for memoization inputs.
///
/// `Arc<T>` compares by pointer so an unchanged subtree of the raw state
/// keeps its cached output after a snapshot replacement. Scalars compare
/// by value, which is their identity.
pub trait InputEq {
    /// Returns `true` when `self` and `other` are the same input.
    fn input_eq(&self, other: &Self) -> bool;
}

impl<T> InputEq for Arc<T> {
    fn input_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: InputEq> InputEq for Option<T> {
    fn input_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.input_eq(b),
            (None, None) => true,
            _ => false,
        }
    }
}

macro_rules! impl_input_eq_by_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl InputEq for $t {
                fn input_eq(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

impl_input_eq_by_value!(
    bool,
    u32,
    i32,
    i64,
    u64,
    f64,
    chrono::DateTime<chrono::Utc>,
    chrono::Weekday,
    chrono_tz::Tz,
    crate::calendar::Granularity,
    crate::types::TimeScale,
    crate::types::ViewportSize,
);

macro_rules! impl_input_eq_for_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: InputEq),+> InputEq for ($($name,)+) {
            fn input_eq(&self, other: &Self) -> bool {
                $(self.$idx.input_eq(&other.$idx))&&+
            }
        }
    };
}

impl_input_eq_for_tuple!(A: 0);
impl_input_eq_for_tuple!(A: 0, B: 1);
impl_input_eq_for_tuple!(A: 0, B: 1, C: 2);
impl_input_eq_for_tuple!(A: 0, B: 1, C: 2, D: 3);
impl_input_eq_for_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4);

/// A single memoized computation node.
///
/// Evaluation is lazy and pull-based: nothing recomputes until a reader
/// asks, and a reader pays only for the cells whose inputs changed.
#[derive(Debug)]
pub struct MemoCell<I, O> {
    slot: RefCell<Option<(I, Arc<O>)>>,
    computes: Cell<u64>,
}

impl<I, O> Default for MemoCell<I, O> {
    fn default() -> Self {
        Self {
            slot: RefCell::new(None),
            computes: Cell::new(0),
        }
    }
}

impl<I: InputEq, O> MemoCell<I, O> {
    /// Returns the cached output when `inputs` matches the previous
    /// invocation, otherwise runs `combine` and replaces the cache.
    pub fn get_or_compute(&self, inputs: I, combine: impl FnOnce(&I) -> O) -> Arc<O> {
        if let Some((prev_inputs, prev_output)) = &*self.slot.borrow() {
            if prev_inputs.input_eq(&inputs) {
                return Arc::clone(prev_output);
            }
        }
        self.computes.set(self.computes.get() + 1);
        let output = Arc::new(combine(&inputs));
        *self.slot.borrow_mut() = Some((inputs, Arc::clone(&output)));
        output
    }

    /// Number of times the combining function has run. Used by tests to
    /// assert that unchanged inputs do not recompute.
    pub fn compute_count(&self) -> u64 {
        self.computes.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_on_identical_arc_input() {
        let cell: MemoCell<Arc<Vec<i32>>, i32> = MemoCell::default();
        let data = Arc::new(vec![1, 2, 3]);

        let first = cell.get_or_compute(Arc::clone(&data), |v| v.iter().sum());
        let second = cell.get_or_compute(Arc::clone(&data), |v| v.iter().sum());

        assert_eq!(*first, 6);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cell.compute_count(), 1);
    }

    #[test]
    fn recomputes_on_new_arc_even_if_equal() {
        let cell: MemoCell<Arc<Vec<i32>>, i32> = MemoCell::default();

        cell.get_or_compute(Arc::new(vec![1, 2]), |v| v.iter().sum());
        cell.get_or_compute(Arc::new(vec![1, 2]), |v| v.iter().sum());

        // Identity comparison, not deep equality: a fresh Arc recomputes.
        assert_eq!(cell.compute_count(), 2);
    }

    #[test]
    fn scalar_inputs_compare_by_value() {
        let cell: MemoCell<(f64, u32), f64> = MemoCell::default();

        let a = cell.get_or_compute((2.0, 3), |&(x, n)| x * f64::from(n));
        let b = cell.get_or_compute((2.0, 3), |&(x, n)| x * f64::from(n));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cell.compute_count(), 1);

        cell.get_or_compute((2.0, 4), |&(x, n)| x * f64::from(n));
        assert_eq!(cell.compute_count(), 2);
    }

    #[test]
    fn tuple_inputs_mix_identity_and_value() {
        let cell: MemoCell<(Arc<Vec<i32>>, i64), usize> = MemoCell::default();
        let data = Arc::new(vec![1, 2, 3]);

        cell.get_or_compute((Arc::clone(&data), 7), |(v, _)| v.len());
        cell.get_or_compute((Arc::clone(&data), 7), |(v, _)| v.len());
        assert_eq!(cell.compute_count(), 1);

        cell.get_or_compute((Arc::clone(&data), 8), |(v, _)| v.len());
        assert_eq!(cell.compute_count(), 2);
    }

    #[test]
    fn option_inputs_compare_variant_and_contents() {
        let cell: MemoCell<Option<Arc<i32>>, i32> = MemoCell::default();
        let value = Arc::new(5);

        cell.get_or_compute(Some(Arc::clone(&value)), |v| v.as_deref().copied().unwrap_or(0));
        cell.get_or_compute(Some(Arc::clone(&value)), |v| v.as_deref().copied().unwrap_or(0));
        assert_eq!(cell.compute_count(), 1);

        cell.get_or_compute(None, |v| v.as_deref().copied().unwrap_or(0));
        assert_eq!(cell.compute_count(), 2);
    }
}
