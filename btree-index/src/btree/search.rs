//! Record search within a single page.
//!
//! Both searches return the greatest record that does not exceed the key:
//! an exact match, or the predecessor a node pointer routes through. Neither
//! reports a miss on its own; callers compare the returned record's key.

use std::cmp::Ordering;

use crate::btree::compare::compare_keys;
use crate::page::{Page, RecordCursor, RecordOffset};
use crate::record::{FieldValue, Record};

/// Scan forward from the cursor's first record.
///
/// Stops at the first record `r` such that `r <= key < next(r)`, or at the
/// last record before the supremum. The result may be the starting record
/// itself, including a starting infimum.
pub fn linear_search_from_cursor<P: Page>(
    mut cursor: RecordCursor<'_, P>,
    key: &[FieldValue],
) -> Option<Record> {
    let mut current = cursor.next()?;

    for next in cursor {
        tracing::trace!(
            "linear search: current={:?} next={:?} key={key:?}",
            current.key,
            next.key
        );
        if next.is_supremum() {
            return Some(current);
        }
        if compare_keys(Some(key), current.key()) != Ordering::Less
            && compare_keys(Some(key), next.key()) == Ordering::Less
        {
            return Some(current);
        }
        current = next;
    }

    Some(current)
}

/// Binary search over a page's directory slots, finishing with a linear scan.
///
/// The slot range narrows as follows, with `mid = len / 2`:
/// - infimum at `mid`: scan from it.
/// - key equal: the record at `mid`.
/// - key greater: scan from `mid` if it is the last slot, otherwise keep
///   `mid..` (the pivot stays in range since the directory is sparse).
/// - key less: nothing if it is the last slot, otherwise keep `..mid`.
///
/// A supremum at `mid` is greater than every key.
pub fn binary_search_by_directory<P: Page>(
    page: &P,
    directory: &[RecordOffset],
    key: &[FieldValue],
) -> Option<Record> {
    let mut slots = directory;

    loop {
        if slots.is_empty() {
            return None;
        }

        let mid = slots.len() / 2;
        let record = page.record(slots[mid])?;

        if record.is_infimum() {
            return linear_search_from_cursor(page.record_cursor(record.offset), key);
        }

        let ordering = if record.is_supremum() {
            Ordering::Less
        } else {
            compare_keys(Some(key), record.key())
        };
        tracing::trace!(
            "directory search on page {}: {} slots, mid={mid} key={:?} -> {ordering:?}",
            page.offset(),
            slots.len(),
            record.key
        );

        match ordering {
            Ordering::Equal => return Some(record),
            Ordering::Greater if slots.len() == 1 => {
                return linear_search_from_cursor(page.record_cursor(record.offset), key);
            }
            Ordering::Greater => slots = &slots[mid..],
            Ordering::Less if slots.len() == 1 => return None,
            Ordering::Less => slots = &slots[..mid],
        }
    }
}
