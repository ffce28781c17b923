//! Page collaborator contract.
//!
//! The navigator never decodes bytes. It works against two traits:
//!
//! - [`PageSource`]: maps a page address to a decoded page, or nothing if the
//!   page cannot be read.
//! - [`Page`]: a decoded index page exposing its header fields, its directory
//!   and random access to records by offset.
//!
//! Everything else (record cursors, user-record enumeration, child
//! enumeration) is provided on top of those accessors.
//!
//! # Record chain
//!
//! Records on a page form a singly-linked chain:
//! infimum -> user records in key order -> supremum.

use crate::record::{Key, Record};

/// A page address (0-indexed page number).
pub type PageId = u64;

/// Identifier of the index a page belongs to, taken from the page header.
pub type IndexId = u64;

/// Address of a record within its page.
pub type RecordOffset = u16;

/// Upper bound on records walked through a single page chain.
///
/// A page cannot hold more records than it has byte offsets, so a chain that
/// goes on longer than this is cyclic.
pub const RECORD_CHAIN_LIMIT: usize = RecordOffset::MAX as usize;

/// Page classification from the page header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageType {
    /// B-tree index page (leaf or internal).
    Index,
    /// Freshly allocated, never written.
    Allocated,
    /// Externally stored column data.
    Blob,
    /// Undo log page.
    UndoLog,
    /// Any other space-management page.
    Other,
}

impl std::fmt::Display for PageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Index => "INDEX",
            Self::Allocated => "ALLOCATED",
            Self::Blob => "BLOB",
            Self::UndoLog => "UNDO_LOG",
            Self::Other => "OTHER",
        };
        f.write_str(name)
    }
}

/// A reference from an internal page to one of its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildRef {
    pub page_id: PageId,
    /// Minimum key of the child, as stored in the node pointer.
    pub min_key: Option<Key>,
}

/// A decoded page.
///
/// Implementations are expected to be cheap to clone (for example by sharing
/// the decoded page behind an `Arc`).
pub trait Page: Clone {
    /// Value that tells the page how to decode its records.
    ///
    /// Opaque to the navigator; it is only passed along from parent pages to
    /// the pages fetched from them.
    type Describer;

    fn page_type(&self) -> PageType;

    /// Level in the tree, 0 for leaves.
    fn level(&self) -> u16;

    /// The page's own address.
    fn offset(&self) -> PageId;

    /// Previous sibling at the same level.
    fn prev(&self) -> Option<PageId>;

    /// Next sibling at the same level.
    fn next(&self) -> Option<PageId>;

    /// Index identifier from the page header.
    fn index_id(&self) -> IndexId;

    /// The infimum sentinel, if the page has a record area.
    fn infimum(&self) -> Option<Record>;

    /// Sparse, key-ordered record offsets. The first slot is the infimum and
    /// the last slot is the supremum.
    fn directory(&self) -> &[RecordOffset];

    /// Decode the record at `offset`.
    fn record(&self, offset: RecordOffset) -> Option<Record>;

    /// The describer this page was fetched with.
    fn describer(&self) -> Option<&Self::Describer>;

    fn is_index(&self) -> bool {
        self.page_type() == PageType::Index
    }

    fn is_leaf(&self) -> bool {
        self.level() == 0
    }

    /// A cursor over the record chain, starting at (and yielding) `offset`.
    fn record_cursor(&self, offset: RecordOffset) -> RecordCursor<'_, Self> {
        RecordCursor::new(self, offset)
    }

    /// The first user record, if the page has any.
    fn first_record(&self) -> Option<Record> {
        let next = self.infimum()?.next?;
        self.record(next).filter(|record| !record.kind.is_sentinel())
    }

    /// The last user record, if the page has any.
    fn last_record(&self) -> Option<Record> {
        self.records().last()
    }

    /// User records in page order, sentinels excluded.
    fn records(&self) -> impl Iterator<Item = Record> + '_ {
        self.infimum()
            .and_then(|infimum| infimum.next)
            .into_iter()
            .flat_map(move |offset| self.record_cursor(offset))
            .filter(|record| !record.kind.is_sentinel())
    }

    /// Child references of an internal page. Leaves have none.
    fn child_pages(&self) -> impl Iterator<Item = ChildRef> + '_ {
        let internal = !self.is_leaf();
        self.records()
            .take_while(move |_| internal)
            .filter_map(|record| {
                Some(ChildRef {
                    page_id: record.child_page_number?,
                    min_key: record.key,
                })
            })
    }
}

/// Retrieves decoded pages by address.
///
/// Implementations own caching and retry policy. `fetch` must be safe to call
/// repeatedly for the same address; it returns `None` for unreadable or
/// out-of-range pages.
pub trait PageSource {
    type Page: Page;

    /// Fetch a page, decoding its records with `describer`.
    fn fetch(
        &self,
        page_id: PageId,
        describer: Option<&<Self::Page as Page>::Describer>,
    ) -> Option<Self::Page>;

    /// The describer associated with this source, used for the root page.
    fn record_describer(&self) -> Option<&<Self::Page as Page>::Describer>;
}

impl<T: PageSource + ?Sized> PageSource for &T {
    type Page = T::Page;

    fn fetch(
        &self,
        page_id: PageId,
        describer: Option<&<Self::Page as Page>::Describer>,
    ) -> Option<Self::Page> {
        (**self).fetch(page_id, describer)
    }

    fn record_describer(&self) -> Option<&<Self::Page as Page>::Describer> {
        (**self).record_describer()
    }
}

/// Forward-only cursor over a page's record chain.
///
/// Yields the record at its start offset first, then follows `next` links.
/// The supremum is yielded and ends the chain. A missing record or an overlong
/// chain also ends it.
pub struct RecordCursor<'p, P: Page> {
    page: &'p P,
    position: Option<RecordOffset>,
    remaining: usize,
}

impl<'p, P: Page> RecordCursor<'p, P> {
    /// Create a cursor positioned at `offset`.
    #[must_use]
    pub const fn new(page: &'p P, offset: RecordOffset) -> Self {
        Self {
            page,
            position: Some(offset),
            remaining: RECORD_CHAIN_LIMIT,
        }
    }
}

impl<P: Page> Iterator for RecordCursor<'_, P> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        advance(self.page, &mut self.position, &mut self.remaining)
    }
}

/// Step a record chain position, returning the record it pointed at.
pub(crate) fn advance<P: Page>(
    page: &P,
    position: &mut Option<RecordOffset>,
    remaining: &mut usize,
) -> Option<Record> {
    let offset = position.take()?;
    if *remaining == 0 {
        tracing::warn!(
            "record chain on page {} exceeds {RECORD_CHAIN_LIMIT} records, stopping",
            page.offset()
        );
        return None;
    }
    *remaining -= 1;

    let record = page.record(offset)?;
    if !record.is_supremum() {
        *position = record.next;
    }
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;
    use crate::testing::MemoryPage;

    fn key(value: i64) -> Key {
        vec![FieldValue::Int(value)]
    }

    fn keys(values: &[i64]) -> Vec<Key> {
        values.iter().map(|&v| key(v)).collect()
    }

    #[test]
    fn test_cursor_walks_chain_to_supremum() {
        let page = MemoryPage::leaf(3, 1, &keys(&[1, 5, 10]), 1);
        let infimum = page.infimum().expect("infimum");

        let kinds: Vec<_> = page.record_cursor(infimum.offset).map(|r| r.kind).collect();
        assert_eq!(kinds.len(), 5);
        assert!(kinds[0].is_sentinel());
        assert!(kinds[4].is_sentinel());
    }

    #[test]
    fn test_cursor_starts_at_given_record() {
        let page = MemoryPage::leaf(3, 1, &keys(&[1, 5, 10]), 1);
        let second = page.records().nth(1).expect("second record");

        let first_yielded = page.record_cursor(second.offset).next();
        assert_eq!(first_yielded, Some(second));
    }

    #[test]
    fn test_records_exclude_sentinels() {
        let page = MemoryPage::leaf(3, 1, &keys(&[1, 5, 10]), 1);
        let found: Vec<_> = page.records().filter_map(|r| r.key).collect();
        assert_eq!(found, keys(&[1, 5, 10]));
        assert_eq!(page.first_record().and_then(|r| r.key), Some(key(1)));
        assert_eq!(page.last_record().and_then(|r| r.key), Some(key(10)));
    }

    #[test]
    fn test_empty_page_has_no_first_record() {
        let page = MemoryPage::leaf(3, 1, &[], 1);
        assert!(page.first_record().is_none());
        assert_eq!(page.records().count(), 0);
    }

    #[test]
    fn test_leaf_has_no_children() {
        let page = MemoryPage::leaf(3, 1, &keys(&[1, 5, 10]), 1);
        assert_eq!(page.child_pages().count(), 0);
    }

    #[test]
    fn test_internal_children_carry_min_keys() {
        let page = MemoryPage::internal(4, 1, 1, &[(key(1), 3), (key(15), 5)], 1);
        let children: Vec<_> = page.child_pages().collect();
        assert_eq!(
            children,
            vec![
                ChildRef {
                    page_id: 3,
                    min_key: Some(key(1)),
                },
                ChildRef {
                    page_id: 5,
                    min_key: Some(key(15)),
                },
            ]
        );
    }

    #[test]
    fn test_cyclic_chain_is_bounded() {
        let mut page = MemoryPage::leaf(3, 1, &keys(&[1, 5]), 1);
        // Point the last user record back at the first one.
        let first = page.first_record().expect("first");
        let last = page.last_record().expect("last");
        page.relink(last.offset, first.offset);

        let infimum = page.infimum().expect("infimum");
        assert_eq!(page.record_cursor(infimum.offset).count(), RECORD_CHAIN_LIMIT);
    }

    #[test]
    fn test_page_type_display() {
        assert_eq!(PageType::Index.to_string(), "INDEX");
        assert_eq!(PageType::Allocated.to_string(), "ALLOCATED");
    }
}
