//! Three-way key comparison.

use std::cmp::Ordering;

/// Compare two optional keys.
///
/// Rules, in order:
/// 1. Both absent: equal.
/// 2. `a` absent, or shorter than `b`: less.
/// 3. `b` absent, or `a` longer than `b`: greater.
/// 4. Same length: the first differing element decides.
///
/// Length is checked before any element, so `[5]` sorts before `[1, 2]`.
/// Node pointers keep only leading key columns and rely on this.
#[must_use]
pub fn compare_keys<T: Ord>(a: Option<&[T]>, b: Option<&[T]>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.len().cmp(&b.len()).then_with(|| a.iter().cmp(b.iter())),
    }
}
