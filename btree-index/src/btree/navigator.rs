//! Horizontal and vertical traversal over index pages.
//!
//! All sequences here are lazy: each page is fetched from the [`PageSource`]
//! when the caller asks for the next element, and the caller can stop at any
//! point. Every fetch passes along the describer of the page it was reached
//! from.

use std::collections::HashSet;

use crate::page::{ChildRef, Page, PageId, PageSource, RECORD_CHAIN_LIMIT, RecordOffset, advance};
use crate::record::{Key, Record};

/// Position of a page within the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Root,
    Internal,
    Leaf,
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Root => write!(f, "root"),
            Self::Internal => write!(f, "internal"),
            Self::Leaf => write!(f, "leaf"),
        }
    }
}

enum LevelState<P> {
    Start(P),
    After(P),
    Done,
}

/// Pages at one level, following `next` sibling links.
///
/// Ends at the last page, at a sibling that cannot be fetched or is not an
/// index page, or when a sibling address repeats.
pub struct LevelPages<'a, S: PageSource> {
    source: &'a S,
    state: LevelState<S::Page>,
    seen: HashSet<PageId>,
}

impl<'a, S: PageSource> LevelPages<'a, S> {
    pub(crate) fn new(source: &'a S, start: Option<S::Page>) -> Self {
        let state = start.map_or(LevelState::Done, LevelState::Start);
        Self {
            source,
            state,
            seen: HashSet::new(),
        }
    }

    fn fetch_sibling(&mut self, previous: &S::Page) -> Option<S::Page> {
        let next_id = previous.next()?;
        if self.seen.contains(&next_id) {
            tracing::warn!(
                "sibling chain loops back to page {next_id} after page {}",
                previous.offset()
            );
            return None;
        }

        let sibling = self.source.fetch(next_id, previous.describer());
        if sibling.is_none() {
            tracing::warn!(
                "page {} links to sibling {next_id}, which could not be read",
                previous.offset()
            );
        }
        sibling
    }
}

impl<S: PageSource> Iterator for LevelPages<'_, S> {
    type Item = S::Page;

    fn next(&mut self) -> Option<S::Page> {
        let page = match std::mem::replace(&mut self.state, LevelState::Done) {
            LevelState::Start(page) => page,
            LevelState::After(previous) => self.fetch_sibling(&previous)?,
            LevelState::Done => return None,
        };

        if !page.is_index() {
            tracing::debug!(
                "level walk stopped at page {} of type {}",
                page.offset(),
                page.page_type()
            );
            return None;
        }

        self.seen.insert(page.offset());
        self.state = LevelState::After(page.clone());
        Some(page)
    }
}

/// Every user record on the leaf level, in key order.
pub struct LeafRecords<'a, S: PageSource> {
    pages: LevelPages<'a, S>,
    page: Option<S::Page>,
    position: Option<RecordOffset>,
    remaining: usize,
}

impl<'a, S: PageSource> LeafRecords<'a, S> {
    pub(crate) const fn new(pages: LevelPages<'a, S>) -> Self {
        Self {
            pages,
            page: None,
            position: None,
            remaining: RECORD_CHAIN_LIMIT,
        }
    }
}

impl<S: PageSource> Iterator for LeafRecords<'_, S> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        loop {
            if let Some(page) = &self.page {
                if let Some(record) = advance(page, &mut self.position, &mut self.remaining) {
                    if record.kind.is_sentinel() {
                        continue;
                    }
                    return Some(record);
                }
            }

            let page = self.pages.next()?;
            self.position = page.infimum().and_then(|infimum| infimum.next);
            self.remaining = RECORD_CHAIN_LIMIT;
            self.page = Some(page);
        }
    }
}

/// One step of a depth-first walk.
#[derive(Debug, Clone)]
pub enum WalkEvent<P> {
    /// An index page, visited before any of its children.
    Page { page: P, depth: usize },
    /// A parent-to-child link, reported just before the child's `Page` event.
    Link {
        parent: P,
        child: P,
        child_min_key: Option<Key>,
        depth: usize,
    },
}

struct Frame<P> {
    page: P,
    depth: usize,
    children: std::vec::IntoIter<ChildRef>,
}

impl<P: Page> Frame<P> {
    fn new(page: P, depth: usize) -> Self {
        let children = page.child_pages().collect::<Vec<_>>().into_iter();
        Self {
            page,
            depth,
            children,
        }
    }
}

/// Depth-first, pre-order walk over every index page reachable from a root.
///
/// Children that cannot be fetched or are not index pages end their branch
/// silently (with a log line). Branches deeper than the configured limit are
/// cut off.
pub struct TreeWalk<'a, S: PageSource> {
    source: &'a S,
    max_depth: usize,
    stack: Vec<Frame<S::Page>>,
    pending: Option<WalkEvent<S::Page>>,
}

impl<'a, S: PageSource> TreeWalk<'a, S> {
    pub(crate) fn new(source: &'a S, root: &S::Page, max_depth: usize) -> Self {
        let (stack, pending) = if root.is_index() {
            let event = WalkEvent::Page {
                page: root.clone(),
                depth: 0,
            };
            (vec![Frame::new(root.clone(), 0)], Some(event))
        } else {
            (Vec::new(), None)
        };

        Self {
            source,
            max_depth,
            stack,
            pending,
        }
    }
}

impl<S: PageSource> Iterator for TreeWalk<'_, S> {
    type Item = WalkEvent<S::Page>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(event) = self.pending.take() {
            return Some(event);
        }

        loop {
            let frame = self.stack.last_mut()?;
            let Some(child_ref) = frame.children.next() else {
                self.stack.pop();
                continue;
            };

            let Some(child) = self.source.fetch(child_ref.page_id, frame.page.describer()) else {
                tracing::warn!(
                    "page {} points to child {}, which could not be read",
                    frame.page.offset(),
                    child_ref.page_id
                );
                continue;
            };
            if !child.is_index() {
                tracing::debug!(
                    "skipping child {} of page {}: type {}",
                    child_ref.page_id,
                    frame.page.offset(),
                    child.page_type()
                );
                continue;
            }

            let depth = frame.depth + 1;
            if depth > self.max_depth {
                tracing::warn!(
                    "walk reached depth {depth} at page {}, not descending further",
                    child.offset()
                );
                continue;
            }

            let parent = frame.page.clone();
            self.stack.push(Frame::new(child.clone(), depth));
            self.pending = Some(WalkEvent::Page {
                page: child.clone(),
                depth,
            });
            return Some(WalkEvent::Link {
                parent,
                child,
                child_min_key: child_ref.min_key,
                depth,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;
    use crate::testing::{MemoryPage, MemoryPageStore};

    fn key(value: i64) -> Key {
        vec![FieldValue::Int(value)]
    }

    fn leaf(page_id: PageId, values: &[i64]) -> MemoryPage {
        let keys: Vec<Key> = values.iter().map(|&v| key(v)).collect();
        MemoryPage::leaf(page_id, 1, &keys, 1)
    }

    #[test]
    fn test_level_pages_follow_siblings() {
        let mut store = MemoryPageStore::new(0);
        store.insert(leaf(10, &[1, 2]).with_siblings(None, Some(11)));
        store.insert(leaf(11, &[3]).with_siblings(Some(10), Some(12)));
        store.insert(leaf(12, &[4]).with_siblings(Some(11), None));

        let start = store.fetch(10, None);
        let ids: Vec<_> = LevelPages::new(&store, start).map(|p| p.offset()).collect();
        assert_eq!(ids, vec![10, 11, 12]);
    }

    #[test]
    fn test_level_pages_stop_at_missing_sibling() {
        let mut store = MemoryPageStore::new(0);
        store.insert(leaf(10, &[1]).with_siblings(None, Some(11)));
        store.insert(leaf(11, &[2]).with_siblings(Some(10), Some(99)));

        let start = store.fetch(10, None);
        assert_eq!(LevelPages::new(&store, start).count(), 2);
    }

    #[test]
    fn test_level_pages_stop_at_non_index_sibling() {
        let mut store = MemoryPageStore::new(0);
        store.insert(leaf(10, &[1]).with_siblings(None, Some(11)));
        store.insert(
            leaf(11, &[2])
                .with_siblings(Some(10), None)
                .with_page_type(crate::page::PageType::Allocated),
        );

        let start = store.fetch(10, None);
        assert_eq!(LevelPages::new(&store, start).count(), 1);
    }

    #[test]
    fn test_level_pages_stop_on_cycle() {
        let mut store = MemoryPageStore::new(0);
        store.insert(leaf(10, &[1]).with_siblings(Some(11), Some(11)));
        store.insert(leaf(11, &[2]).with_siblings(Some(10), Some(10)));

        let start = store.fetch(10, None);
        let ids: Vec<_> = LevelPages::new(&store, start).map(|p| p.offset()).collect();
        assert_eq!(ids, vec![10, 11]);
    }

    #[test]
    fn test_leaf_records_skip_empty_pages() {
        let mut store = MemoryPageStore::new(0);
        store.insert(leaf(10, &[1, 2]).with_siblings(None, Some(11)));
        store.insert(leaf(11, &[]).with_siblings(Some(10), Some(12)));
        store.insert(leaf(12, &[3]).with_siblings(Some(11), None));

        let start = store.fetch(10, None);
        let found: Vec<_> = LeafRecords::new(LevelPages::new(&store, start))
            .filter_map(|r| r.key)
            .collect();
        assert_eq!(found, vec![key(1), key(2), key(3)]);
    }

    #[test]
    fn test_walk_skips_unreadable_children() {
        let mut store = MemoryPageStore::new(0);
        store.insert(MemoryPage::internal(3, 1, 1, &[(key(1), 10), (key(5), 77)], 1));
        store.insert(leaf(10, &[1, 2]));

        let root = store.fetch(3, None).expect("root");
        let events: Vec<_> = TreeWalk::new(&store, &root, 64).collect();
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], WalkEvent::Page { depth: 0, .. }));
        assert!(matches!(&events[1], WalkEvent::Link { depth: 1, .. }));
        assert!(matches!(&events[2], WalkEvent::Page { depth: 1, .. }));
    }

    #[test]
    fn test_walk_cuts_off_cycles_at_max_depth() {
        let mut store = MemoryPageStore::new(0);
        // Page 3 lists itself as its own child.
        store.insert(MemoryPage::internal(3, 1, 1, &[(key(1), 3)], 1));

        let root = store.fetch(3, None).expect("root");
        let pages = TreeWalk::new(&store, &root, 4)
            .filter(|event| matches!(event, WalkEvent::Page { .. }))
            .count();
        assert_eq!(pages, 5);
    }

    #[test]
    fn test_node_type_display() {
        assert_eq!(NodeType::Root.to_string(), "root");
        assert_eq!(NodeType::Internal.to_string(), "internal");
        assert_eq!(NodeType::Leaf.to_string(), "leaf");
    }
}
