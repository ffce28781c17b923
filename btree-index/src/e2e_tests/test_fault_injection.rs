//! Unreadable or malformed pages end queries with no result, never a panic.

use crate::btree::WalkEvent;
use crate::e2e_tests::helpers::*;
use crate::page::{Page, PageType};
use crate::testing::{FaultConfig, INFIMUM_OFFSET, SUPREMUM_OFFSET};

#[test]
fn test_searches_under_read_errors_never_return_wrong_records() {
    let mut tree = TestTree::build(&keys(0..500), 6, 3);
    let index_keys = tree.keys.clone();
    tree.store.set_fault_config(FaultConfig::read_errors(0.2));
    let index = tree.open_retrying();

    let mut found = 0;
    for present in &index_keys {
        for result in [index.linear_search(present), index.binary_search(present)] {
            if let Some((page, record)) = result {
                assert!(page.is_leaf());
                assert_eq!(record.key.as_ref(), Some(present));
                found += 1;
            }
        }
    }

    let stats = tree.store.stats();
    assert!(stats.injected_read_errors > 0);
    assert!(found > 0);
}

#[test]
fn test_each_record_under_read_errors_yields_ordered_prefix() {
    let mut tree = TestTree::build(&keys(0..500), 6, 3);
    tree.store.set_fault_config(FaultConfig::read_errors(0.05));
    let index = tree.open_retrying();

    for _ in 0..20 {
        let found: Vec<_> = index.each_record().filter_map(|r| r.key).collect();
        assert_eq!(found, keys(0..500)[..found.len()].to_vec());
    }
}

#[test]
fn test_missing_leaf_truncates_enumeration() {
    let mut tree = TestTree::build(&keys(0..40), 4, 2);
    let leaves: Vec<_> = tree.index().each_page_at_level(0).map(|p| p.offset()).collect();
    tree.store.remove(leaves[5]);
    let index = tree.index();

    let found: Vec<_> = index.each_record().filter_map(|r| r.key).collect();
    assert_eq!(found, keys(0..20));
    assert!(index.binary_search(&key(21)).is_none());
    assert!(index.linear_search(&key(19)).is_some());
    assert!(index.linear_search(&key(30)).is_some());
}

#[test]
fn test_corrupt_child_pointer_ends_descent() {
    let mut tree = TestTree::build(&keys(0..40), 4, 2);
    let root = tree.root;

    // Point the root's last node pointer at a page that does not exist.
    let last = tree.index().root().last_record().expect("node pointer");
    tree.store.page_mut(root).expect("root").repoint(last.offset, 9_999);
    let index = tree.index();

    assert!(index.binary_search(&key(39)).is_none());
    assert!(index.linear_search(&key(39)).is_none());
    assert!(index.last_page_at_level(0).is_none());
    assert!(index.max_record().is_none());
    assert!(index.binary_search(&key(0)).is_some());

    let pages = index
        .walk()
        .filter(|event| matches!(event, WalkEvent::Page { .. }))
        .count();
    assert!(pages < tree.pages().len());
}

#[test]
fn test_child_pointing_at_non_index_page_ends_descent() {
    let mut tree = TestTree::build(&keys(0..40), 4, 2);
    let first_leaf = tree.index().first_page_at_level(0).expect("leaf").offset();
    let page = tree.store.remove(first_leaf).expect("leaf");
    tree.store.insert(page.with_page_type(PageType::Allocated));
    let index = tree.index();

    assert!(index.binary_search(&key(0)).is_none());
    assert!(index.first_page_at_level(0).is_none());
    assert_eq!(index.each_record().count(), 0);
    assert!(index.binary_search(&key(39)).is_some());
}

#[test]
fn test_cyclic_record_chain_is_cut_off() {
    let mut tree = TestTree::build(&keys(0..4), 8, 1);
    let root = tree.root;

    // Last user record loops back to the infimum instead of the supremum.
    let page = tree.store.page_mut(root).expect("root");
    let last = page.last_record().expect("record");
    page.relink(last.offset, INFIMUM_OFFSET);
    let index = tree.index();

    assert!(index.each_record().count() >= 4);
    assert!(index.linear_search(&key(100)).is_none());
    assert!(index.binary_search(&key(100)).is_none());
    assert!(index.linear_search(&key(2)).is_some());
}

#[test]
fn test_dangling_record_link_ends_page() {
    let mut tree = TestTree::build(&keys(0..4), 8, 1);
    let root = tree.root;

    let page = tree.store.page_mut(root).expect("root");
    let first = page.first_record().expect("record");
    page.relink(first.offset, SUPREMUM_OFFSET + 1);
    let index = tree.index();

    let found: Vec<_> = index.each_record().filter_map(|r| r.key).collect();
    assert_eq!(found, keys(0..1));
    assert!(index.linear_search(&key(0)).is_some());
    assert!(index.linear_search(&key(3)).is_none());
}
