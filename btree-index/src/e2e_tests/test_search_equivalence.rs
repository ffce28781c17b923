//! Linear and binary search agree on every key, across tree shapes.

use crate::btree::compare_keys;
use crate::e2e_tests::helpers::*;
use crate::testing::TreeBuilder;
use std::cmp::Ordering;

#[test]
fn test_linear_and_binary_search_agree() {
    for seed in 0..24 {
        let tree = TestTree::random(seed);
        let index = tree.index();

        for target in tree.search_keys(seed + 1000) {
            let linear = summarize(index.linear_search(&target));
            let binary = summarize(index.binary_search(&target));
            assert_eq!(linear, binary, "seed {seed}, key {target:?}");
        }
    }
}

#[test]
fn test_present_keys_are_found() {
    for seed in 0..12 {
        let tree = TestTree::random(seed);
        let index = tree.index();

        for present in &tree.keys {
            let (_, record) = index
                .binary_search(present)
                .unwrap_or_else(|| panic!("seed {seed}: {present:?} not found"));
            assert_eq!(record.key.as_ref(), Some(present));
        }
    }
}

#[test]
fn test_absent_keys_are_missed() {
    let tree = TestTree::build(&keys((0..200).map(|v| v * 2)), 5, 3);
    let index = tree.index();

    for odd in (-1..401).step_by(2) {
        assert!(index.linear_search(&key(odd)).is_none(), "{odd}");
        assert!(index.binary_search(&key(odd)).is_none(), "{odd}");
    }
}

#[test]
fn test_agreement_holds_for_every_directory_spacing() {
    let values = keys(0..60);
    for every in 1..=10 {
        for fanout in [2, 3, 7, 60] {
            let tree = TestTree::build(&values, fanout, every);
            let index = tree.index();

            for target in -2..63 {
                let linear = summarize(index.linear_search(&key(target)));
                let binary = summarize(index.binary_search(&key(target)));
                assert_eq!(linear, binary, "every {every}, fanout {fanout}, key {target}");
                assert_eq!(linear.is_some(), (0..60).contains(&target));
            }
        }
    }
}

#[test]
fn test_raised_leftmost_pointers_still_route_every_key() {
    let values = keys(0..120);
    for every in 1..=6 {
        for fanout in [2, 3, 5, 11] {
            let builder = TreeBuilder::new(1)
                .fanout(fanout)
                .directory_every(every)
                .raise_leftmost_keys(true);
            let tree = TestTree::with_builder(&builder, &values);
            let index = tree.index();

            for target in -3..123 {
                let linear = summarize(index.linear_search(&key(target)));
                let binary = summarize(index.binary_search(&key(target)));
                assert_eq!(linear, binary, "every {every}, fanout {fanout}, key {target}");
                assert_eq!(
                    linear.map(|(_, found)| found),
                    (0..120).contains(&target).then(|| key(target)),
                    "every {every}, fanout {fanout}, key {target}"
                );
            }
        }
    }
}

#[test]
fn test_found_record_matches_key_exactly() {
    let tree = TestTree::random(99);
    let index = tree.index();

    for target in tree.search_keys(7) {
        if let Some((page, record)) = index.linear_search(&target) {
            assert!(crate::page::Page::is_leaf(&page));
            assert_eq!(
                compare_keys(Some(target.as_slice()), record.key()),
                Ordering::Equal
            );
        }
    }
}
