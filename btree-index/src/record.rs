//! Decoded records as seen by the index navigator.
//!
//! Records arrive already decoded by the page collaborator. This module only
//! describes their shape: a kind tag, the page-local `next` link, an optional
//! key and, for node pointers, the child page they route to.

use crate::page::{PageId, RecordOffset};

/// A single decoded field value.
///
/// Values are opaque to the navigator apart from their total order. Values of
/// different variants order by variant (`Null` first).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldValue {
    Null,
    Int(i64),
    UInt(u64),
    Bytes(Vec<u8>),
    Text(String),
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

/// A record's sort key: the ordered key columns.
///
/// Node pointers usually store only the leading columns needed for routing,
/// so keys on internal pages may be shorter than leaf keys.
pub type Key = Vec<FieldValue>;

/// Record classification from the record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Virtual record ordered before every record on the page.
    Infimum,
    /// Virtual record ordered after every record on the page.
    Supremum,
    /// A user row on a leaf page.
    Conventional,
    /// A routing record on an internal page.
    NodePointer,
}

impl RecordKind {
    /// Whether this is one of the two page-bound sentinels.
    #[must_use]
    pub const fn is_sentinel(self) -> bool {
        matches!(self, Self::Infimum | Self::Supremum)
    }
}

/// A decoded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Address of the record within its page.
    pub offset: RecordOffset,
    pub kind: RecordKind,
    /// Address of the next record in page order, `None` after the supremum.
    pub next: Option<RecordOffset>,
    /// Sort key. Always `None` for sentinels.
    pub key: Option<Key>,
    /// Non-key fields of a conventional record.
    pub row: Vec<FieldValue>,
    /// Child page a node pointer routes to.
    pub child_page_number: Option<PageId>,
}

impl Record {
    /// Create the infimum sentinel.
    #[must_use]
    pub const fn infimum(offset: RecordOffset, next: RecordOffset) -> Self {
        Self {
            offset,
            kind: RecordKind::Infimum,
            next: Some(next),
            key: None,
            row: Vec::new(),
            child_page_number: None,
        }
    }

    /// Create the supremum sentinel.
    #[must_use]
    pub const fn supremum(offset: RecordOffset) -> Self {
        Self {
            offset,
            kind: RecordKind::Supremum,
            next: None,
            key: None,
            row: Vec::new(),
            child_page_number: None,
        }
    }

    /// Create a leaf row.
    #[must_use]
    pub const fn conventional(
        offset: RecordOffset,
        next: RecordOffset,
        key: Key,
        row: Vec<FieldValue>,
    ) -> Self {
        Self {
            offset,
            kind: RecordKind::Conventional,
            next: Some(next),
            key: Some(key),
            row,
            child_page_number: None,
        }
    }

    /// Create a node pointer routing to `child`.
    #[must_use]
    pub const fn node_pointer(
        offset: RecordOffset,
        next: RecordOffset,
        key: Key,
        child: PageId,
    ) -> Self {
        Self {
            offset,
            kind: RecordKind::NodePointer,
            next: Some(next),
            key: Some(key),
            row: Vec::new(),
            child_page_number: Some(child),
        }
    }

    #[must_use]
    pub const fn is_infimum(&self) -> bool {
        matches!(self.kind, RecordKind::Infimum)
    }

    #[must_use]
    pub const fn is_supremum(&self) -> bool {
        matches!(self.kind, RecordKind::Supremum)
    }

    /// The key as a slice, for comparisons.
    #[must_use]
    pub fn key(&self) -> Option<&[FieldValue]> {
        self.key.as_deref()
    }
}
