//! Leaf enumeration: ordering and agreement with searches.

use std::cmp::Ordering;

use crate::btree::compare_keys;
use crate::e2e_tests::helpers::*;
use crate::page::Page;

#[test]
fn test_each_record_is_ordered() {
    for seed in 0..16 {
        let tree = TestTree::random(seed);
        let index = tree.index();

        let records: Vec<_> = index.each_record().collect();
        for pair in records.windows(2) {
            assert_ne!(
                compare_keys(pair[0].key(), pair[1].key()),
                Ordering::Greater,
                "seed {seed}: {:?} before {:?}",
                pair[0].key,
                pair[1].key
            );
        }
    }
}

#[test]
fn test_each_record_yields_every_key_once() {
    let values = keys((0..500).rev());
    let tree = TestTree::build(&values, 9, 4);
    let index = tree.index();

    let found: Vec<_> = index.each_record().filter_map(|r| r.key).collect();
    assert_eq!(found, keys(0..500));
}

#[test]
fn test_search_results_appear_once_in_leaf_order() {
    for seed in 0..8 {
        let tree = TestTree::random(seed);
        let index = tree.index();

        let positioned: Vec<_> = index
            .each_page_at_level(0)
            .flat_map(|page| {
                let page_id = page.offset();
                page.records()
                    .map(move |record| (page_id, record))
                    .collect::<Vec<_>>()
            })
            .collect();

        let records: Vec<_> = index.each_record().collect();
        assert_eq!(positioned.len(), records.len());

        for present in &tree.keys {
            let (page, record) = index.linear_search(present).expect("present key");
            let hits = positioned
                .iter()
                .filter(|(page_id, r)| *page_id == page.offset() && *r == record)
                .count();
            assert_eq!(hits, 1, "seed {seed}: {present:?}");
        }
    }
}

#[test]
fn test_each_record_is_lazy() {
    let tree = TestTree::build(&keys(0..1000), 4, 2);
    let index = tree.index();
    tree.store.reset_stats();

    let first: Vec<_> = index.each_record().take(3).filter_map(|r| r.key).collect();
    assert_eq!(first, keys(0..3));

    // Descent to the first leaf plus that leaf itself, no siblings.
    let reads = tree.store.stats().reads;
    assert!(reads <= u64::from(index.root().level()) + 1, "{reads} reads");
}
