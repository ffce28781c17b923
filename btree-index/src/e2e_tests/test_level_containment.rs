//! Level scans stay on their level and cover it.

use std::collections::HashMap;

use crate::e2e_tests::helpers::*;
use crate::page::Page;

#[test]
fn test_each_page_at_level_stays_on_level() {
    for seed in 0..16 {
        let tree = TestTree::random(seed);
        let index = tree.index();
        let top = index.root().level();

        let mut expected: HashMap<u16, Vec<u64>> = HashMap::new();
        for page in tree.pages() {
            expected.entry(page.level()).or_default().push(page.offset());
        }

        for level in 0..=top {
            let found: Vec<_> = index.each_page_at_level(level).collect();
            assert!(found.iter().all(|p| p.level() == level), "seed {seed}");

            let ids: Vec<_> = found.iter().map(Page::offset).collect();
            assert_eq!(Some(&ids), expected.get(&level), "seed {seed}, level {level}");
        }

        for level in top + 1..top + 4 {
            assert_eq!(index.each_page_at_level(level).count(), 0, "seed {seed}");
            assert!(index.first_page_at_level(level).is_none());
        }
    }
}

#[test]
fn test_each_page_from_middle_of_level() {
    let tree = TestTree::build(&keys(0..40), 4, 2);
    let index = tree.index();

    let leaves: Vec<_> = index.each_page_at_level(0).collect();
    assert_eq!(leaves.len(), 10);

    let from_fourth: Vec<_> = index
        .each_page_from(leaves[3].clone())
        .map(|p| p.offset())
        .collect();
    let expected: Vec<_> = leaves[3..].iter().map(Page::offset).collect();
    assert_eq!(from_fourth, expected);
}

#[test]
fn test_first_and_last_page_bound_each_level() {
    let tree = TestTree::build(&keys(0..200), 3, 2);
    let index = tree.index();

    for level in 0..=index.root().level() {
        let pages: Vec<_> = index.each_page_at_level(level).collect();
        let first = index.first_page_at_level(level).expect("first");
        let last = index.last_page_at_level(level).expect("last");

        assert_eq!(pages.first().map(Page::offset), Some(first.offset()));
        assert_eq!(pages.last().map(Page::offset), Some(last.offset()));
        assert_eq!(first.prev(), None);
        assert_eq!(last.next(), None);
    }
}
