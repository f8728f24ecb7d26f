#![forbid(unsafe_code)]

//! Stable sorting that reports the permutation it applied.
//!
//! Both helpers return the permutation in the same convention as
//! [`SubChange::Permute`](crate::SubChange::Permute): `perm[i]` is the new
//! absolute index of the element previously at `from + i`.

use std::cmp::Ordering;

/// Stably sort `values[from..to]` ascending, in place, and return the
/// permutation actually applied.
///
/// Used to normalize a filtered view's index map after a source permutation
/// has been remapped through it (the remapped slice must stay strictly
/// increasing).
pub fn stable_sort_range(values: &mut [usize], from: usize, to: usize) -> Vec<usize> {
    let slice = &mut values[from..to];
    let n = slice.len();
    // order[new_pos] = old_pos within the slice; stable, so equal values
    // keep their relative order.
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&i| slice[i]);

    let sorted: Vec<usize> = order.iter().map(|&i| slice[i]).collect();
    let mut perm = vec![0usize; n];
    for (new_pos, &old_pos) in order.iter().enumerate() {
        perm[old_pos] = from + new_pos;
    }
    slice.copy_from_slice(&sorted);
    perm
}

/// Stably sort `values` with `cmp`, in place, and return the permutation
/// actually applied (`perm[i]` = new index of the element previously at `i`).
pub fn stable_sort_by_permutation<T>(
    values: &mut Vec<T>,
    mut cmp: impl FnMut(&T, &T) -> Ordering,
) -> Vec<usize> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| cmp(&values[a], &values[b]));

    let mut perm = vec![0usize; n];
    for (new_pos, &old_pos) in order.iter().enumerate() {
        perm[old_pos] = new_pos;
    }

    let mut slots: Vec<Option<T>> = std::mem::take(values).into_iter().map(Some).collect();
    *values = order
        .iter()
        .map(|&i| slots[i].take().expect("each index moved exactly once"))
        .collect();
    perm
}
