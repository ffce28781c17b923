//! The same seed produces the same trees, faults and results.

use crate::btree::Index;
use crate::e2e_tests::helpers::*;
use crate::page::PageId;
use crate::record::Key;
use crate::testing::{FaultConfig, MemoryPageStore, TreeBuilder};

fn run_sequence(seed: u64) -> Vec<Option<(PageId, Key)>> {
    let mut store = MemoryPageStore::with_config(seed, FaultConfig::no_faults());
    let root = TreeBuilder::new(5).fanout(5).build_into(&mut store, &keys(0..300));
    store.set_fault_config(FaultConfig::read_errors(0.1));

    let Some(index) = (0..64).find_map(|_| Index::new(&store, root).ok()) else {
        return Vec::new();
    };

    let mut results = Vec::new();
    for target in (0..300).step_by(7) {
        results.push(summarize(index.binary_search(&key(target))));
        results.push(summarize(index.linear_search(&key(target))));
    }
    results.push(index.each_record().last().and_then(|r| r.key).map(|k| (0, k)));
    results
}

#[test]
fn test_deterministic_sequence() {
    let run1 = run_sequence(42);
    let run2 = run_sequence(42);

    assert!(!run1.is_empty());
    assert_eq!(run1, run2);
}

#[test]
fn test_seeds_change_fault_pattern() {
    let runs: Vec<_> = (0..4).map(run_sequence).collect();
    assert!(runs.windows(2).any(|pair| pair[0] != pair[1]));
}

#[test]
fn test_random_trees_are_reproducible() {
    let first = TestTree::random(17);
    let second = TestTree::random(17);
    assert_eq!(first.keys, second.keys);
    assert_eq!(first.root, second.root);
    assert_eq!(first.pages(), second.pages());
}
