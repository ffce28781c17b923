//! Bulk-loads sorted keys into a well-formed tree of memory pages.

use crate::btree::compare_keys;
use crate::page::{IndexId, Page, PageId};
use crate::record::Key;
use crate::testing::memory::{MemoryPage, MemoryPageStore};

/// Records per page when no fanout is given.
pub const DEFAULT_FANOUT: usize = 16;

/// Directory slot spacing when none is given.
pub const DEFAULT_DIRECTORY_EVERY: usize = 4;

/// First page number handed out when none is given.
pub const DEFAULT_FIRST_PAGE_ID: PageId = 3;

/// Builds a B-tree bottom-up from a set of keys.
///
/// Leaves are filled left to right with up to `fanout` records each and
/// linked as siblings. Each level above holds one node pointer per page of
/// the level below, keyed by that page's minimum key, until a single root
/// remains. Page numbers are handed out sequentially from `first_page_id`,
/// leaves first.
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    index_id: IndexId,
    fanout: usize,
    directory_every: usize,
    first_page_id: PageId,
    raise_leftmost_keys: bool,
}

/// A page of the level being built, with the key range below it.
struct BuiltPage {
    page: MemoryPage,
    min_key: Option<Key>,
    max_key: Option<Key>,
}

impl TreeBuilder {
    #[must_use]
    pub const fn new(index_id: IndexId) -> Self {
        Self {
            index_id,
            fanout: DEFAULT_FANOUT,
            directory_every: DEFAULT_DIRECTORY_EVERY,
            first_page_id: DEFAULT_FIRST_PAGE_ID,
            raise_leftmost_keys: false,
        }
    }

    /// Maximum records per page.
    ///
    /// # Panics
    /// Panics if `fanout` is below 2, which could never reduce to a root.
    #[must_use]
    pub fn fanout(mut self, fanout: usize) -> Self {
        assert!(fanout >= 2, "fanout must be at least 2");
        self.fanout = fanout;
        self
    }

    /// Give every `every`-th record a directory slot.
    #[must_use]
    pub const fn directory_every(mut self, every: usize) -> Self {
        self.directory_every = every;
        self
    }

    #[must_use]
    pub const fn first_page_id(mut self, page_id: PageId) -> Self {
        self.first_page_id = page_id;
        self
    }

    /// Key the leftmost node pointer of each level by its child's maximum
    /// key instead of its minimum.
    ///
    /// Searches treat that pointer as covering every smaller key, so the tree
    /// stays searchable while its first pointer no longer bounds the child.
    #[must_use]
    pub const fn raise_leftmost_keys(mut self, raise: bool) -> Self {
        self.raise_leftmost_keys = raise;
        self
    }

    /// Build the tree into `store` and return the root page number.
    ///
    /// Keys are sorted and deduplicated first. No keys gives a single empty
    /// leaf root.
    #[allow(clippy::disallowed_methods)] // Clone needed to share keys between levels
    pub fn build_into(&self, store: &mut MemoryPageStore, keys: &[Key]) -> PageId {
        let mut keys = keys.to_vec();
        keys.sort_by(|a, b| compare_keys(Some(a.as_slice()), Some(b.as_slice())));
        keys.dedup();

        let mut next_page_id = self.first_page_id;
        let mut allocate = || {
            let page_id = next_page_id;
            next_page_id += 1;
            page_id
        };

        let mut level: Vec<BuiltPage> = if keys.is_empty() {
            vec![BuiltPage {
                page: MemoryPage::leaf(allocate(), self.index_id, &[], self.directory_every),
                min_key: None,
                max_key: None,
            }]
        } else {
            keys.chunks(self.fanout)
                .map(|chunk| BuiltPage {
                    page: MemoryPage::leaf(allocate(), self.index_id, chunk, self.directory_every),
                    min_key: chunk.first().cloned(),
                    max_key: chunk.last().cloned(),
                })
                .collect()
        };

        let mut height = 0;
        while level.len() > 1 {
            height += 1;
            let pointers: Vec<(Key, PageId)> = level
                .iter()
                .enumerate()
                .map(|(i, built)| {
                    let key = if self.raise_leftmost_keys && i == 0 {
                        &built.max_key
                    } else {
                        &built.min_key
                    };
                    (key.clone().unwrap_or_default(), built.page.offset())
                })
                .collect();
            let bounds: Vec<(Option<Key>, Option<Key>)> = level
                .iter()
                .map(|built| (built.min_key.clone(), built.max_key.clone()))
                .collect();
            store_linked(store, level.into_iter().map(|built| built.page).collect());

            level = pointers
                .chunks(self.fanout)
                .zip(bounds.chunks(self.fanout))
                .map(|(chunk, bounds)| BuiltPage {
                    page: MemoryPage::internal(
                        allocate(),
                        self.index_id,
                        height,
                        chunk,
                        self.directory_every,
                    ),
                    min_key: bounds.first().and_then(|(min, _)| min.clone()),
                    max_key: bounds.last().and_then(|(_, max)| max.clone()),
                })
                .collect();
        }

        let Some(root) = level.pop() else {
            unreachable!("a level is never empty");
        };
        let root_id = root.page.offset();
        store.insert(root.page);

        tracing::debug!(
            "built index {} with {} keys, height {}, root page {root_id}",
            self.index_id,
            keys.len(),
            height + 1
        );
        root_id
    }
}

/// Insert one level of pages, linking each to its neighbours.
fn store_linked(store: &mut MemoryPageStore, level: Vec<MemoryPage>) {
    let ids: Vec<PageId> = level.iter().map(Page::offset).collect();
    for (i, page) in level.into_iter().enumerate() {
        let prev = i.checked_sub(1).map(|j| ids[j]);
        let next = ids.get(i + 1).copied();
        store.insert(page.with_siblings(prev, next));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::PageSource;
    use crate::record::FieldValue;

    fn keys(values: impl IntoIterator<Item = i64>) -> Vec<Key> {
        values.into_iter().map(|v| vec![FieldValue::Int(v)]).collect()
    }

    #[test]
    fn test_empty_build_is_single_leaf() {
        let mut store = MemoryPageStore::new(0);
        let root = TreeBuilder::new(1).build_into(&mut store, &[]);

        assert_eq!(root, DEFAULT_FIRST_PAGE_ID);
        assert_eq!(store.len(), 1);
        let page = store.fetch(root, None).expect("root");
        assert!(page.is_leaf());
        assert_eq!(page.records().count(), 0);
    }

    #[test]
    fn test_levels_and_page_numbers() {
        let mut store = MemoryPageStore::new(0);
        // 10 leaves, 4 level-1 pages, 2 level-2 pages, 1 root
        let root = TreeBuilder::new(1)
            .fanout(3)
            .first_page_id(100)
            .build_into(&mut store, &keys(0..30));

        assert_eq!(store.len(), 17);
        assert_eq!(root, 116);
        let page = store.fetch(root, None).expect("root");
        assert_eq!(page.level(), 3);
        assert_eq!(page.prev(), None);
        assert_eq!(page.next(), None);
    }

    #[test]
    fn test_leaves_are_linked_in_order() {
        let mut store = MemoryPageStore::new(0);
        TreeBuilder::new(1).fanout(4).build_into(&mut store, &keys(0..10));

        let first = store.fetch(3, None).expect("first leaf");
        let second = store.fetch(4, None).expect("second leaf");
        let third = store.fetch(5, None).expect("third leaf");
        assert_eq!(first.prev(), None);
        assert_eq!(first.next(), Some(4));
        assert_eq!(second.prev(), Some(3));
        assert_eq!(third.next(), None);
        assert_eq!(third.records().count(), 2);
    }

    #[test]
    fn test_input_is_sorted_and_deduplicated() {
        let mut store = MemoryPageStore::new(0);
        let root = TreeBuilder::new(1).build_into(&mut store, &keys([5, 1, 5, 3, 1]));

        let page = store.fetch(root, None).expect("root");
        let found: Vec<_> = page.records().filter_map(|r| r.key).collect();
        assert_eq!(found, keys([1, 3, 5]));
    }

    #[test]
    fn test_raised_leftmost_keys() {
        let mut store = MemoryPageStore::new(0);
        let root = TreeBuilder::new(1)
            .fanout(3)
            .raise_leftmost_keys(true)
            .build_into(&mut store, &keys(0..27));

        // Levels: 9 leaves, 3 pages, root.
        let page = store.fetch(root, None).expect("root");
        let pointers: Vec<_> = page.child_pages().collect();
        assert_eq!(pointers[0].min_key, Some(vec![FieldValue::Int(8)]));
        assert_eq!(pointers[1].min_key, Some(vec![FieldValue::Int(9)]));

        let leftmost = store.fetch(pointers[0].page_id, None).expect("level 1");
        let keys_below: Vec<_> = leftmost.child_pages().filter_map(|c| c.min_key).collect();
        assert_eq!(keys_below, keys([2, 3, 6]));
    }

    #[test]
    fn test_node_pointers_carry_child_min_key() {
        let mut store = MemoryPageStore::new(0);
        let root = TreeBuilder::new(1).fanout(2).build_into(&mut store, &keys(0..4));

        let page = store.fetch(root, None).expect("root");
        let children: Vec<_> = page.child_pages().collect();
        assert_eq!(children.len(), 2);
        for child in children {
            let child_page = store.fetch(child.page_id, None).expect("child");
            assert_eq!(child.min_key, child_page.first_record().and_then(|r| r.key));
        }
    }
}
