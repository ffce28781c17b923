//! A hand-built two-level tree with a root pointing at only one of its leaves.

use crate::btree::{Index, NodeType};
use crate::e2e_tests::helpers::*;
use crate::page::{Page, PageSource};
use crate::testing::{MemoryPage, MemoryPageStore};

const ROOT: u64 = 3;
const L1: u64 = 4;
const L2: u64 = 5;

fn store() -> MemoryPageStore {
    let mut store = MemoryPageStore::new(0);
    store.insert(MemoryPage::internal(ROOT, 7, 1, &[(key(10), L1)], 1));
    store.insert(MemoryPage::leaf(L1, 7, &keys([1, 5, 10]), 1).with_siblings(None, Some(L2)));
    store.insert(MemoryPage::leaf(L2, 7, &keys([15, 20]), 1).with_siblings(Some(L1), None));
    store
}

#[test]
fn test_binary_search_finds_key_on_first_leaf() {
    let store = store();
    let index = Index::new(&store, ROOT).expect("open");

    let (page, record) = index.binary_search(&key(10)).expect("found");
    assert_eq!(page.offset(), L1);
    assert_eq!(record.key, Some(key(10)));
    assert_eq!(index.node_type(&page), NodeType::Leaf);
}

#[test]
fn test_keys_below_only_pointer_are_found() {
    let store = store();
    let index = Index::new(&store, ROOT).expect("open");

    for value in [1, 5] {
        let (page, record) = index.binary_search(&key(value)).expect("binary");
        assert_eq!((page.offset(), record.key), (L1, Some(key(value))));
        let (page, record) = index.linear_search(&key(value)).expect("linear");
        assert_eq!((page.offset(), record.key), (L1, Some(key(value))));
    }
    assert!(index.binary_search(&key(0)).is_none());
    assert!(index.linear_search(&key(0)).is_none());
}

#[test]
fn test_binary_search_misses_absent_key() {
    let store = store();
    let index = Index::new(&store, ROOT).expect("open");

    assert!(index.binary_search(&key(12)).is_none());
    assert!(index.linear_search(&key(12)).is_none());
}

#[test]
fn test_each_record_crosses_sibling_link() {
    let store = store();
    let index = Index::new(&store, ROOT).expect("open");

    let found: Vec<_> = index.each_record().filter_map(|r| r.key).collect();
    assert_eq!(found, keys([1, 5, 10, 15, 20]));
}

#[test]
fn test_shape() {
    let store = store();
    let index = Index::new(&store, ROOT).expect("open");

    assert_eq!(index.id(), 7);
    assert_eq!(index.height(), 2);
    let leaves: Vec<_> = index.each_page_at_level(0).map(|p| p.offset()).collect();
    assert_eq!(leaves, vec![L1, L2]);
    assert_eq!(index.last_page_at_level(0).map(|p| p.offset()), Some(L1));

    // Only L1 is reachable through node pointers.
    let pages = index
        .walk()
        .filter(|event| matches!(event, crate::btree::WalkEvent::Page { .. }))
        .count();
    assert_eq!(pages, 2);
    assert!(store.fetch(L2, None).is_some());
}
