//! The source's describer reaches every page fetched through the index.

use crate::btree::{Index, WalkEvent};
use crate::e2e_tests::helpers::*;
use crate::page::Page;
use crate::testing::ColumnDescriber;

fn described_tree() -> (TestTree, ColumnDescriber) {
    let mut tree = TestTree::build(&keys(0..120), 4, 2);
    let describer = ColumnDescriber::new(&["id"]);
    tree.store.set_describer(Some(describer.clone()));
    (tree, describer)
}

#[test]
fn test_walk_pages_carry_describer() {
    let (tree, describer) = described_tree();
    let index = tree.index();

    assert_eq!(index.root().describer(), Some(&describer));
    let mut pages = 0;
    for event in index.walk() {
        match event {
            WalkEvent::Page { page, .. } => {
                assert_eq!(page.describer(), Some(&describer));
                pages += 1;
            }
            WalkEvent::Link { parent, child, .. } => {
                assert_eq!(parent.describer(), child.describer());
            }
        }
    }
    assert_eq!(pages, tree.pages().len());
}

#[test]
fn test_search_and_scan_pages_carry_describer() {
    let (tree, describer) = described_tree();
    let index = tree.index();

    let (page, _) = index.binary_search(&key(77)).expect("found");
    assert_eq!(page.describer(), Some(&describer));
    let (page, _) = index.linear_search(&key(3)).expect("found");
    assert_eq!(page.describer(), Some(&describer));

    for level in 0..=index.root().level() {
        assert!(
            index
                .each_page_at_level(level)
                .all(|p| p.describer() == Some(&describer))
        );
    }
}

#[test]
fn test_source_without_describer() {
    let tree = TestTree::build(&keys(0..120), 4, 2);
    let index = tree.index();

    assert!(index.walk().all(|event| match event {
        WalkEvent::Page { page, .. } => page.describer().is_none(),
        WalkEvent::Link { .. } => true,
    }));
}

#[test]
fn test_describer_follows_parent_not_source() {
    let (tree, describer) = described_tree();
    let index = Index::new(&tree.store, tree.root).expect("open");

    // A direct fetch without a describer yields an undescribed page.
    let detached = index.first_page_at_level(0).expect("leaf");
    assert_eq!(detached.describer(), Some(&describer));
    let bare = crate::page::PageSource::fetch(&tree.store, detached.offset(), None)
        .expect("leaf");
    assert!(bare.describer().is_none());

    // Scanning from a bare page passes its (empty) describer along.
    assert!(index.each_page_from(bare).all(|p| p.describer().is_none()));
}
