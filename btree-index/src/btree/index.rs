//! The index handle: root validation, searches and traversal entry points.
//!
//! An [`Index`] is built once from a page source and a root page address and
//! never changes afterwards. Every query fetches the pages it needs on demand;
//! only the root page is held.

use std::cmp::Ordering;

use crate::btree::compare::compare_keys;
use crate::btree::navigator::{LeafRecords, LevelPages, NodeType, TreeWalk, WalkEvent};
use crate::btree::search::{binary_search_by_directory, linear_search_from_cursor};
use crate::config::IndexConfig;
use crate::page::{IndexId, Page, PageId, PageSource, PageType};
use crate::record::{FieldValue, Key, Record};

/// A read-only B-tree index over a page source.
pub struct Index<S: PageSource> {
    source: S,
    root: S::Page,
    config: IndexConfig,
}

impl<S: PageSource> Index<S> {
    /// Open the index rooted at `root_page` with the default configuration.
    pub fn new(source: S, root_page: PageId) -> Result<Self, IndexError> {
        Self::with_config(source, root_page, IndexConfig::default())
    }

    /// Open the index rooted at `root_page`.
    ///
    /// # Errors
    ///
    /// Fails if the root page cannot be fetched, is not an index page, or has
    /// a sibling (the root is alone at its level).
    pub fn with_config(
        source: S,
        root_page: PageId,
        config: IndexConfig,
    ) -> Result<Self, IndexError> {
        let root = source
            .fetch(root_page, source.record_describer())
            .ok_or(IndexError::RootNotFound { page_id: root_page })?;

        if !root.is_index() {
            return Err(IndexError::NotIndexPage {
                page_id: root_page,
                page_type: root.page_type(),
            });
        }

        if root.prev().is_some() || root.next().is_some() {
            return Err(IndexError::NotRootPage {
                page_id: root_page,
                prev: root.prev(),
                next: root.next(),
            });
        }

        tracing::info!(
            "opened index {} at root page {root_page} (level {})",
            root.index_id(),
            root.level()
        );

        Ok(Self {
            source,
            root,
            config,
        })
    }

    /// Index identifier from the root page header.
    #[must_use]
    pub fn id(&self) -> IndexId {
        self.root.index_id()
    }

    #[must_use]
    pub const fn root(&self) -> &S::Page {
        &self.root
    }

    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    #[must_use]
    pub const fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Number of levels, counting the leaf level.
    #[must_use]
    pub fn height(&self) -> u32 {
        u32::from(self.root.level()) + 1
    }

    /// Classify a page by its position in this tree.
    #[must_use]
    pub fn node_type(&self, page: &S::Page) -> NodeType {
        if page.offset() == self.root.offset() {
            NodeType::Root
        } else if page.is_leaf() {
            NodeType::Leaf
        } else {
            NodeType::Internal
        }
    }

    /// Find `key` by scanning each page's record chain.
    ///
    /// Returns the leaf page and record on an exact match. On internal pages
    /// the leftmost node pointer also routes keys below its own key.
    #[must_use]
    pub fn linear_search(&self, key: &[FieldValue]) -> Option<(S::Page, Record)> {
        self.search(key, |page| {
            let infimum = page.infimum()?;
            linear_search_from_cursor(page.record_cursor(infimum.offset), key)
        })
    }

    /// Find `key` using each page's directory.
    ///
    /// Always agrees with [`Index::linear_search`].
    #[must_use]
    pub fn binary_search(&self, key: &[FieldValue]) -> Option<(S::Page, Record)> {
        self.search(key, |page| binary_search_by_directory(page, page.directory(), key))
    }

    /// Descend from the root using `find` to pick a record on each page.
    fn search<F>(&self, key: &[FieldValue], find: F) -> Option<(S::Page, Record)>
    where
        F: Fn(&S::Page) -> Option<Record>,
    {
        let mut page = self.root.clone();

        for _ in 0..=self.config.max_depth {
            tracing::debug!(
                "search: page={}, level={}, key={key:?}",
                page.offset(),
                page.level()
            );

            let mut record = find(&page)?;

            if page.is_leaf() {
                return (compare_keys(Some(key), record.key()) == Ordering::Equal)
                    .then_some((page, record));
            }

            // The leftmost node pointer covers every key below it.
            if record.is_infimum() {
                record = page.first_record()?;
            }

            let child = record.child_page_number?;
            page = self.fetch_index_page(child, &page)?;
        }

        tracing::warn!(
            "search for {key:?} exceeded {} levels, giving up",
            self.config.max_depth
        );
        None
    }

    /// Fetch a page reached from `from`, requiring it to be an index page.
    fn fetch_index_page(&self, page_id: PageId, from: &S::Page) -> Option<S::Page> {
        let Some(page) = self.source.fetch(page_id, from.describer()) else {
            tracing::warn!(
                "page {} points to page {page_id}, which could not be read",
                from.offset()
            );
            return None;
        };

        if page.is_index() {
            Some(page)
        } else {
            tracing::warn!(
                "page {} points to page {page_id} of type {}",
                from.offset(),
                page.page_type()
            );
            None
        }
    }

    /// Walk every index page depth-first, pre-order, from the root.
    #[must_use]
    pub fn walk(&self) -> TreeWalk<'_, S> {
        TreeWalk::new(&self.source, &self.root, self.config.max_depth)
    }

    /// Visit every index page and every parent-child link.
    ///
    /// `page_visit` receives each page with its depth (root is 0).
    /// `link_visit` receives the parent, the child, the child's minimum key
    /// and the child's depth, just before the child itself is visited.
    pub fn recurse<F, G>(&self, mut page_visit: F, mut link_visit: G)
    where
        F: FnMut(&S::Page, usize),
        G: FnMut(&S::Page, &S::Page, Option<&Key>, usize),
    {
        for event in self.walk() {
            match event {
                WalkEvent::Page { page, depth } => page_visit(&page, depth),
                WalkEvent::Link {
                    parent,
                    child,
                    child_min_key,
                    depth,
                } => link_visit(&parent, &child, child_min_key.as_ref(), depth),
            }
        }
    }

    /// The leftmost page at `level`, following first records down from the root.
    #[must_use]
    pub fn first_page_at_level(&self, level: u16) -> Option<S::Page> {
        self.edge_page_at_level(level, <S::Page as Page>::first_record)
    }

    /// The rightmost page at `level`, following last records down from the root.
    #[must_use]
    pub fn last_page_at_level(&self, level: u16) -> Option<S::Page> {
        self.edge_page_at_level(level, <S::Page as Page>::last_record)
    }

    /// Descend along one edge of the tree until `level`.
    ///
    /// Returns nothing when the tree has no page at `level`, whether because
    /// the tree is shorter or because the descent ran out of records.
    fn edge_page_at_level<F>(&self, level: u16, pick: F) -> Option<S::Page>
    where
        F: Fn(&S::Page) -> Option<Record>,
    {
        let mut page = self.root.clone();

        for _ in 0..self.config.max_depth {
            if page.level() <= level {
                break;
            }
            let Some(record) = pick(&page) else {
                break;
            };
            page = self.fetch_index_page(record.child_page_number?, &page)?;
        }

        (page.level() == level).then_some(page)
    }

    /// Pages from `page` rightwards along its level.
    #[must_use]
    pub fn each_page_from(&self, page: S::Page) -> LevelPages<'_, S> {
        LevelPages::new(&self.source, Some(page))
    }

    /// All pages at `level`, left to right. Empty if the level does not exist.
    #[must_use]
    pub fn each_page_at_level(&self, level: u16) -> LevelPages<'_, S> {
        LevelPages::new(&self.source, self.first_page_at_level(level))
    }

    /// Every leaf record in ascending key order.
    #[must_use]
    pub fn each_record(&self) -> LeafRecords<'_, S> {
        LeafRecords::new(self.each_page_at_level(0))
    }

    /// The smallest record in the index.
    #[must_use]
    pub fn min_record(&self) -> Option<Record> {
        self.first_page_at_level(0)?.first_record()
    }

    /// The largest record in the index.
    #[must_use]
    pub fn max_record(&self) -> Option<Record> {
        self.last_page_at_level(0)?.last_record()
    }
}

/// Errors that can occur when opening an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// The root page could not be fetched.
    RootNotFound { page_id: PageId },
    /// The root page is not an index page.
    NotIndexPage { page_id: PageId, page_type: PageType },
    /// The root page has siblings, so it is not the top of a tree.
    NotRootPage {
        page_id: PageId,
        prev: Option<PageId>,
        next: Option<PageId>,
    },
}

impl std::fmt::Display for IndexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RootNotFound { page_id } => {
                write!(f, "root page {page_id} could not be read")
            }
            Self::NotIndexPage { page_id, page_type } => {
                write!(f, "root page {page_id} has type {page_type}, not INDEX")
            }
            Self::NotRootPage {
                page_id,
                prev,
                next,
            } => write!(
                f,
                "page {page_id} has siblings (prev: {prev:?}, next: {next:?}) and cannot be a root"
            ),
        }
    }
}

impl std::error::Error for IndexError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryPage, MemoryPageStore, TreeBuilder};

    fn key(value: i64) -> Key {
        vec![FieldValue::Int(value)]
    }

    fn keys(values: impl IntoIterator<Item = i64>) -> Vec<Key> {
        values.into_iter().map(key).collect()
    }

    #[test]
    fn test_open_rejects_missing_root() {
        let store = MemoryPageStore::new(0);
        let result = Index::new(&store, 3);
        assert_eq!(result.err(), Some(IndexError::RootNotFound { page_id: 3 }));
    }

    #[test]
    fn test_open_rejects_non_index_root() {
        let mut store = MemoryPageStore::new(0);
        store.insert(MemoryPage::leaf(3, 1, &keys([1]), 1).with_page_type(PageType::Blob));

        let result = Index::new(&store, 3);
        assert_eq!(
            result.err(),
            Some(IndexError::NotIndexPage {
                page_id: 3,
                page_type: PageType::Blob,
            })
        );
    }

    #[test]
    fn test_open_rejects_page_with_siblings() {
        let mut store = MemoryPageStore::new(0);
        store.insert(MemoryPage::leaf(3, 1, &keys([1]), 1).with_siblings(None, Some(4)));

        let result = Index::new(&store, 3);
        assert_eq!(
            result.err(),
            Some(IndexError::NotRootPage {
                page_id: 3,
                prev: None,
                next: Some(4),
            })
        );
    }

    #[test]
    fn test_error_messages_are_distinct() {
        let messages = [
            IndexError::RootNotFound { page_id: 3 }.to_string(),
            IndexError::NotIndexPage {
                page_id: 3,
                page_type: PageType::Allocated,
            }
            .to_string(),
            IndexError::NotRootPage {
                page_id: 3,
                prev: Some(2),
                next: None,
            }
            .to_string(),
        ];
        assert_eq!(messages[0], "root page 3 could not be read");
        assert_eq!(messages[1], "root page 3 has type ALLOCATED, not INDEX");
        assert!(messages[2].contains("has siblings"));
    }

    #[test]
    fn test_accessors() {
        let mut store = MemoryPageStore::new(0);
        let root = TreeBuilder::new(42).fanout(4).build_into(&mut store, &keys(0..50));
        let index = Index::new(&store, root).expect("open");

        assert_eq!(index.id(), 42);
        assert_eq!(index.root().offset(), root);
        assert_eq!(index.height(), u32::from(index.root().level()) + 1);
        assert_eq!(index.node_type(index.root()), NodeType::Root);

        let leaf = index.first_page_at_level(0).expect("leaf");
        assert_eq!(index.node_type(&leaf), NodeType::Leaf);
        let internal = index.first_page_at_level(1).expect("internal");
        assert_eq!(index.node_type(&internal), NodeType::Internal);
    }

    #[test]
    fn test_single_leaf_root() {
        let mut store = MemoryPageStore::new(0);
        let root = TreeBuilder::new(1).build_into(&mut store, &keys([3, 1, 2]));
        let index = Index::new(&store, root).expect("open");

        assert_eq!(index.height(), 1);
        assert_eq!(index.node_type(index.root()), NodeType::Root);
        let (page, record) = index.binary_search(&key(2)).expect("found");
        assert_eq!(page.offset(), root);
        assert_eq!(record.key, Some(key(2)));
        assert!(index.linear_search(&key(4)).is_none());
    }

    #[test]
    fn test_empty_tree() {
        let mut store = MemoryPageStore::new(0);
        let root = TreeBuilder::new(1).build_into(&mut store, &[]);
        let index = Index::new(&store, root).expect("open");

        assert!(index.linear_search(&key(1)).is_none());
        assert!(index.binary_search(&key(1)).is_none());
        assert_eq!(index.each_record().count(), 0);
        assert!(index.min_record().is_none());
        assert!(index.max_record().is_none());
    }

    #[test]
    fn test_min_and_max_record() {
        let mut store = MemoryPageStore::new(0);
        let root = TreeBuilder::new(1).fanout(3).build_into(&mut store, &keys(10..40));
        let index = Index::new(&store, root).expect("open");

        assert_eq!(index.min_record().and_then(|r| r.key), Some(key(10)));
        assert_eq!(index.max_record().and_then(|r| r.key), Some(key(39)));
    }

    #[test]
    fn test_first_and_last_page_at_level() {
        let mut store = MemoryPageStore::new(0);
        let root = TreeBuilder::new(1).fanout(3).build_into(&mut store, &keys(0..30));
        let index = Index::new(&store, root).expect("open");

        let top = index.root().level();
        assert_eq!(index.first_page_at_level(top).map(|p| p.offset()), Some(root));
        assert_eq!(index.last_page_at_level(top).map(|p| p.offset()), Some(root));
        assert!(index.first_page_at_level(top + 1).is_none());

        let first = index.first_page_at_level(0).expect("first leaf");
        let last = index.last_page_at_level(0).expect("last leaf");
        assert_eq!(first.prev(), None);
        assert_eq!(last.next(), None);
        assert_ne!(first.offset(), last.offset());
    }

    #[test]
    fn test_recurse_callbacks() {
        let mut store = MemoryPageStore::new(0);
        let root = TreeBuilder::new(1).fanout(4).build_into(&mut store, &keys(0..40));
        let index = Index::new(&store, root).expect("open");

        let mut pages = Vec::new();
        let mut links = Vec::new();
        index.recurse(
            |page, depth| pages.push((page.offset(), depth)),
            |parent, child, min_key, depth| {
                links.push((parent.offset(), child.offset(), min_key.cloned(), depth));
            },
        );

        assert_eq!(pages[0], (root, 0));
        assert_eq!(links.len(), pages.len() - 1);
        for (parent, child, min_key, depth) in &links {
            let parent_depth = pages.iter().find(|(id, _)| id == parent).map(|(_, d)| *d);
            assert_eq!(parent_depth, Some(depth - 1));
            let child_page = store.fetch(*child, None).expect("child");
            assert_eq!(min_key.as_ref(), child_page.first_record().and_then(|r| r.key).as_ref());
        }
    }

    #[test]
    fn test_keys_below_leftmost_pointer_follow_it() {
        let mut store = MemoryPageStore::new(0);
        store.insert(MemoryPage::internal(3, 1, 1, &[(key(10), 4), (key(20), 5)], 2));
        store.insert(MemoryPage::leaf(4, 1, &keys([1, 5, 10]), 1).with_siblings(None, Some(5)));
        store.insert(MemoryPage::leaf(5, 1, &keys([20, 25]), 1).with_siblings(Some(4), None));
        let index = Index::new(&store, 3).expect("open");

        for value in [1, 5, 10, 20, 25] {
            let linear = index.linear_search(&key(value)).map(|(p, r)| (p.offset(), r.key));
            let binary = index.binary_search(&key(value)).map(|(p, r)| (p.offset(), r.key));
            assert_eq!(linear, binary, "{value}");
            assert_eq!(linear.and_then(|(_, k)| k), Some(key(value)));
        }
        assert!(index.linear_search(&key(0)).is_none());
        assert!(index.binary_search(&key(0)).is_none());
        assert!(index.binary_search(&key(15)).is_none());
    }

    #[test]
    fn test_search_stops_at_depth_limit() {
        let mut store = MemoryPageStore::new(0);
        store.insert(MemoryPage::internal(3, 1, 1, &[(key(1), 3)], 1));
        let config = IndexConfig { max_depth: 8 };
        let index = Index::with_config(&store, 3, config).expect("open");

        assert!(index.linear_search(&key(1)).is_none());
        assert!(index.binary_search(&key(1)).is_none());
        assert!(index.first_page_at_level(0).is_none());
    }
}
