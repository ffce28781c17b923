//! In-memory pages and page store.
//!
//! `MemoryPageStore` implements [`PageSource`] over a map of pre-built pages,
//! with support for fault injection:
//! - Read errors (the page comes back absent)
//!
//! Faults are drawn from a seeded RNG, so the same seed produces the same
//! sequence of failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::page::{IndexId, Page, PageId, PageSource, PageType, RecordOffset};
use crate::record::{Key, Record};

/// Offset of the infimum record on every memory page.
pub const INFIMUM_OFFSET: RecordOffset = 99;

/// Offset of the supremum record on every memory page.
pub const SUPREMUM_OFFSET: RecordOffset = 112;

/// Offset of the first user record.
const FIRST_RECORD_OFFSET: RecordOffset = 120;

/// Distance between consecutive user records.
const RECORD_STRIDE: RecordOffset = 16;

/// Maximum number of user records a memory page can address.
pub const MAX_RECORDS_PER_PAGE: usize =
    ((RecordOffset::MAX - FIRST_RECORD_OFFSET) / RECORD_STRIDE) as usize;

/// Describes how records of an index are decoded.
///
/// Memory pages are already decoded, so this only records which columns make
/// up the key. It is carried from page to page like a real describer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnDescriber {
    pub key_columns: Vec<String>,
}

impl ColumnDescriber {
    #[must_use]
    pub fn new(key_columns: &[&str]) -> Self {
        Self {
            key_columns: key_columns.iter().map(|&c| c.to_owned()).collect(),
        }
    }
}

/// A decoded page held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryPage {
    page_id: PageId,
    page_type: PageType,
    level: u16,
    index_id: IndexId,
    prev: Option<PageId>,
    next: Option<PageId>,
    records: Arc<HashMap<RecordOffset, Record>>,
    directory: Arc<Vec<RecordOffset>>,
    describer: Option<ColumnDescriber>,
}

impl MemoryPage {
    /// Create a leaf page holding `keys` in the given order.
    ///
    /// Every `directory_every`-th record (starting with the first) gets a
    /// directory slot, in addition to the infimum and supremum.
    ///
    /// # Panics
    /// Panics if `keys` has more than `MAX_RECORDS_PER_PAGE` entries.
    #[must_use]
    #[allow(clippy::disallowed_methods)] // Clone needed to copy fixture keys into the page
    pub fn leaf(page_id: PageId, index_id: IndexId, keys: &[Key], directory_every: usize) -> Self {
        let entries = keys.iter().map(|key| (key.clone(), None)).collect();
        Self::with_records(page_id, index_id, 0, entries, directory_every)
    }

    /// Create an internal page of node pointers `(min_key, child)`.
    ///
    /// # Panics
    /// Panics if `level` is 0 or there are more than `MAX_RECORDS_PER_PAGE`
    /// entries.
    #[must_use]
    #[allow(clippy::disallowed_methods)] // Clone needed to copy fixture keys into the page
    pub fn internal(
        page_id: PageId,
        index_id: IndexId,
        level: u16,
        entries: &[(Key, PageId)],
        directory_every: usize,
    ) -> Self {
        assert!(level > 0, "internal pages live above level 0");
        let entries = entries
            .iter()
            .map(|(key, child)| (key.clone(), Some(*child)))
            .collect();
        Self::with_records(page_id, index_id, level, entries, directory_every)
    }

    fn with_records(
        page_id: PageId,
        index_id: IndexId,
        level: u16,
        entries: Vec<(Key, Option<PageId>)>,
        directory_every: usize,
    ) -> Self {
        assert!(
            entries.len() <= MAX_RECORDS_PER_PAGE,
            "a memory page holds at most {MAX_RECORDS_PER_PAGE} records"
        );
        let every = directory_every.max(1);

        let offsets: Vec<RecordOffset> = (0..entries.len()).map(record_offset).collect();
        let first = offsets.first().copied().unwrap_or(SUPREMUM_OFFSET);

        let mut records = HashMap::with_capacity(entries.len() + 2);
        records.insert(INFIMUM_OFFSET, Record::infimum(INFIMUM_OFFSET, first));
        records.insert(SUPREMUM_OFFSET, Record::supremum(SUPREMUM_OFFSET));

        let mut directory = vec![INFIMUM_OFFSET];
        for (i, ((key, child), &offset)) in entries.into_iter().zip(&offsets).enumerate() {
            let next = offsets.get(i + 1).copied().unwrap_or(SUPREMUM_OFFSET);
            let record = match child {
                Some(child) => Record::node_pointer(offset, next, key, child),
                None => Record::conventional(offset, next, key, Vec::new()),
            };
            records.insert(offset, record);
            if i % every == 0 {
                directory.push(offset);
            }
        }
        directory.push(SUPREMUM_OFFSET);

        Self {
            page_id,
            page_type: PageType::Index,
            level,
            index_id,
            prev: None,
            next: None,
            records: Arc::new(records),
            directory: Arc::new(directory),
            describer: None,
        }
    }

    /// Set the sibling links.
    #[must_use]
    pub const fn with_siblings(mut self, prev: Option<PageId>, next: Option<PageId>) -> Self {
        self.prev = prev;
        self.next = next;
        self
    }

    /// Override the page type.
    #[must_use]
    pub const fn with_page_type(mut self, page_type: PageType) -> Self {
        self.page_type = page_type;
        self
    }

    /// Point the record at `offset` to a different `next` record.
    pub fn relink(&mut self, offset: RecordOffset, next: RecordOffset) {
        if let Some(record) = Arc::make_mut(&mut self.records).get_mut(&offset) {
            record.next = Some(next);
        }
    }

    /// Replace the child pointer of the node pointer at `offset`.
    pub fn repoint(&mut self, offset: RecordOffset, child: PageId) {
        if let Some(record) = Arc::make_mut(&mut self.records).get_mut(&offset) {
            record.child_page_number = Some(child);
        }
    }
}

#[allow(clippy::cast_possible_truncation)] // bounded by MAX_RECORDS_PER_PAGE
const fn record_offset(index: usize) -> RecordOffset {
    FIRST_RECORD_OFFSET + (index as RecordOffset) * RECORD_STRIDE
}

impl Page for MemoryPage {
    type Describer = ColumnDescriber;

    fn page_type(&self) -> PageType {
        self.page_type
    }

    fn level(&self) -> u16 {
        self.level
    }

    fn offset(&self) -> PageId {
        self.page_id
    }

    fn prev(&self) -> Option<PageId> {
        self.prev
    }

    fn next(&self) -> Option<PageId> {
        self.next
    }

    fn index_id(&self) -> IndexId {
        self.index_id
    }

    fn infimum(&self) -> Option<Record> {
        self.record(INFIMUM_OFFSET)
    }

    fn directory(&self) -> &[RecordOffset] {
        &self.directory
    }

    #[allow(clippy::disallowed_methods)] // Clone needed to hand out decoded records
    fn record(&self, offset: RecordOffset) -> Option<Record> {
        self.records.get(&offset).cloned()
    }

    fn describer(&self) -> Option<&ColumnDescriber> {
        self.describer.as_ref()
    }
}

/// Configuration for fault injection.
#[derive(Debug, Clone, Default)]
pub struct FaultConfig {
    /// Probability of a read error (0.0 - 1.0).
    pub read_error_rate: f64,
}

impl FaultConfig {
    /// Create a fault config with no faults (for baseline testing).
    #[must_use]
    pub fn no_faults() -> Self {
        Self::default()
    }

    /// Create a fault config failing reads with the given probability.
    #[must_use]
    pub const fn read_errors(rate: f64) -> Self {
        Self {
            read_error_rate: rate,
        }
    }
}

/// Statistics about page store reads.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStoreStats {
    /// Number of fetch calls.
    pub reads: u64,
    /// Number of fetches answered with an injected failure.
    pub injected_read_errors: u64,
}

/// In-memory page source.
///
/// # Thread Safety
///
/// Fetches take `&self`; the RNG and counters are synchronized internally so
/// the store can back indexes shared across threads.
pub struct MemoryPageStore {
    pages: HashMap<PageId, MemoryPage>,
    describer: Option<ColumnDescriber>,
    fault_config: FaultConfig,
    rng: Mutex<StdRng>,
    reads: AtomicU64,
    injected_read_errors: AtomicU64,
}

impl MemoryPageStore {
    /// Create an empty store with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, FaultConfig::default())
    }

    /// Create an empty store with custom fault configuration.
    #[must_use]
    pub fn with_config(seed: u64, fault_config: FaultConfig) -> Self {
        Self {
            pages: HashMap::new(),
            describer: None,
            fault_config,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            reads: AtomicU64::new(0),
            injected_read_errors: AtomicU64::new(0),
        }
    }

    /// Set the describer handed to the root page.
    pub fn set_describer(&mut self, describer: Option<ColumnDescriber>) {
        self.describer = describer;
    }

    /// Update the fault configuration.
    pub fn set_fault_config(&mut self, config: FaultConfig) {
        self.fault_config = config;
    }

    /// Add or replace a page.
    pub fn insert(&mut self, page: MemoryPage) {
        self.pages.insert(page.page_id, page);
    }

    /// Remove a page, making it unreadable.
    pub fn remove(&mut self, page_id: PageId) -> Option<MemoryPage> {
        self.pages.remove(&page_id)
    }

    /// Mutable access to a stored page.
    pub fn page_mut(&mut self, page_id: PageId) -> Option<&mut MemoryPage> {
        self.pages.get_mut(&page_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Get the current statistics.
    #[must_use]
    pub fn stats(&self) -> MemoryStoreStats {
        MemoryStoreStats {
            reads: self.reads.load(Ordering::Relaxed),
            injected_read_errors: self.injected_read_errors.load(Ordering::Relaxed),
        }
    }

    /// Reset statistics.
    pub fn reset_stats(&self) {
        self.reads.store(0, Ordering::Relaxed);
        self.injected_read_errors.store(0, Ordering::Relaxed);
    }

    /// Check if a fault should be injected based on the given rate.
    fn should_inject_fault(&self, rate: f64) -> bool {
        if rate <= 0.0 {
            return false;
        }
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.random::<f64>() < rate
    }
}

impl PageSource for MemoryPageStore {
    type Page = MemoryPage;

    #[allow(clippy::disallowed_methods)] // Clone needed so each fetch owns its page
    fn fetch(&self, page_id: PageId, describer: Option<&ColumnDescriber>) -> Option<MemoryPage> {
        self.reads.fetch_add(1, Ordering::Relaxed);

        if self.should_inject_fault(self.fault_config.read_error_rate) {
            self.injected_read_errors.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("injected read error for page {page_id}");
            return None;
        }

        let mut page = self.pages.get(&page_id)?.clone();
        page.describer = describer.cloned();
        Some(page)
    }

    fn record_describer(&self) -> Option<&ColumnDescriber> {
        self.describer.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldValue, RecordKind};

    fn key(value: i64) -> Key {
        vec![FieldValue::Int(value)]
    }

    #[test]
    fn test_leaf_layout() {
        let page = MemoryPage::leaf(5, 9, &[key(1), key(2), key(3)], 2);

        assert_eq!(page.offset(), 5);
        assert_eq!(page.index_id(), 9);
        assert_eq!(page.level(), 0);
        assert!(page.is_index());
        // infimum, records 0 and 2, supremum
        assert_eq!(page.directory(), &[INFIMUM_OFFSET, 120, 152, SUPREMUM_OFFSET]);

        let infimum = page.infimum().expect("infimum");
        assert_eq!(infimum.next, Some(120));
        assert_eq!(page.record(152).and_then(|r| r.next), Some(SUPREMUM_OFFSET));
    }

    #[test]
    fn test_empty_leaf_links_infimum_to_supremum() {
        let page = MemoryPage::leaf(5, 9, &[], 1);
        assert_eq!(page.infimum().and_then(|r| r.next), Some(SUPREMUM_OFFSET));
        assert_eq!(page.directory(), &[INFIMUM_OFFSET, SUPREMUM_OFFSET]);
    }

    #[test]
    fn test_internal_records_are_node_pointers() {
        let page = MemoryPage::internal(4, 9, 2, &[(key(1), 10), (key(7), 11)], 1);
        let kinds: Vec<_> = page.records().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![RecordKind::NodePointer, RecordKind::NodePointer]);
        assert_eq!(page.level(), 2);
    }

    #[test]
    fn test_store_fetch_sets_describer() {
        let mut store = MemoryPageStore::new(0);
        store.insert(MemoryPage::leaf(5, 9, &[key(1)], 1));
        let describer = ColumnDescriber::new(&["id"]);

        let with = store.fetch(5, Some(&describer)).expect("page");
        assert_eq!(with.describer(), Some(&describer));

        let without = store.fetch(5, None).expect("page");
        assert_eq!(without.describer(), None);

        assert!(store.fetch(6, None).is_none());
        assert_eq!(store.stats().reads, 3);
    }

    #[test]
    fn test_fault_injection_is_deterministic() {
        let build = || {
            let mut store = MemoryPageStore::with_config(7, FaultConfig::read_errors(0.5));
            store.insert(MemoryPage::leaf(5, 9, &[key(1)], 1));
            store
        };

        let first: Vec<bool> = {
            let store = build();
            (0..64).map(|_| store.fetch(5, None).is_some()).collect()
        };
        let second: Vec<bool> = {
            let store = build();
            (0..64).map(|_| store.fetch(5, None).is_some()).collect()
        };

        assert_eq!(first, second);
        assert!(first.iter().any(|ok| *ok));
        assert!(first.iter().any(|ok| !*ok));
    }

    #[test]
    fn test_reset_stats() {
        let mut store = MemoryPageStore::with_config(1, FaultConfig::read_errors(1.0));
        store.insert(MemoryPage::leaf(5, 9, &[], 1));
        assert!(store.fetch(5, None).is_none());
        assert_eq!(
            store.stats(),
            MemoryStoreStats {
                reads: 1,
                injected_read_errors: 1
            }
        );

        store.reset_stats();
        store.set_fault_config(FaultConfig::no_faults());
        assert!(store.fetch(5, None).is_some());
        assert_eq!(store.stats().injected_read_errors, 0);
    }
}
