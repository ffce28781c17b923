//! Opening an index on anything but a valid root fails with a distinct error.

use crate::btree::{Index, IndexError};
use crate::e2e_tests::helpers::*;
use crate::page::{Page, PageType};

#[test]
fn test_open_on_leaf_chain_member_fails() {
    let tree = TestTree::build(&keys(0..50), 4, 2);
    let index = tree.index();
    let leaves: Vec<_> = index.each_page_at_level(0).collect();

    for leaf in &leaves {
        let result = Index::new(&tree.store, leaf.offset());
        assert!(
            matches!(result, Err(IndexError::NotRootPage { page_id, .. }) if page_id == leaf.offset()),
            "leaf {}",
            leaf.offset()
        );
    }
}

#[test]
fn test_open_on_internal_page_with_siblings_fails() {
    let tree = TestTree::build(&keys(0..50), 4, 2);
    let index = tree.index();
    let first = index.first_page_at_level(1).expect("level 1");

    let result = Index::new(&tree.store, first.offset());
    assert_eq!(
        result.err(),
        Some(IndexError::NotRootPage {
            page_id: first.offset(),
            prev: None,
            next: first.next(),
        })
    );
}

#[test]
fn test_open_on_non_index_page_fails() {
    let mut tree = TestTree::build(&keys(0..50), 4, 2);
    let root = tree.root;
    let page = tree.store.remove(root).expect("root");
    tree.store.insert(page.with_page_type(PageType::UndoLog));

    let result = Index::new(&tree.store, root);
    assert_eq!(
        result.err(),
        Some(IndexError::NotIndexPage {
            page_id: root,
            page_type: PageType::UndoLog,
        })
    );
}

#[test]
fn test_open_on_unresolvable_address_fails() {
    let tree = TestTree::build(&keys(0..50), 4, 2);

    let result = Index::new(&tree.store, 10_000);
    assert_eq!(result.err(), Some(IndexError::RootNotFound { page_id: 10_000 }));
}

#[test]
fn test_single_leaf_opens_as_root() {
    let tree = TestTree::build(&keys(0..3), 4, 2);
    let index = tree.index();
    assert!(index.root().is_leaf());
    assert_eq!(index.each_record().count(), 3);
}
