//! The depth-first walk visits every page and link exactly once.

use std::collections::{HashMap, HashSet};

use crate::btree::WalkEvent;
use crate::e2e_tests::helpers::*;
use crate::page::Page;

#[test]
fn test_recurse_visits_every_page_once() {
    for seed in 0..16 {
        let tree = TestTree::random(seed);
        let index = tree.index();

        let mut visited = Vec::new();
        let mut links = Vec::new();
        index.recurse(
            |page, depth| visited.push((page.offset(), depth)),
            |parent, child, _, depth| links.push((parent.offset(), child.offset(), depth)),
        );

        let all: HashSet<_> = tree.pages().iter().map(Page::offset).collect();
        let seen: HashSet<_> = visited.iter().map(|(id, _)| *id).collect();
        assert_eq!(seen.len(), visited.len(), "seed {seed}: page visited twice");
        assert_eq!(seen, all, "seed {seed}");

        let unique_links: HashSet<_> = links.iter().map(|(p, c, _)| (*p, *c)).collect();
        assert_eq!(unique_links.len(), links.len(), "seed {seed}: link visited twice");
        assert_eq!(links.len() + 1, visited.len(), "seed {seed}");

        let depth_of: HashMap<_, _> = visited.iter().copied().collect();
        for (parent, child, depth) in &links {
            assert_eq!(depth_of[parent] + 1, *depth, "seed {seed}");
            assert_eq!(depth_of[child], *depth, "seed {seed}");
        }
    }
}

#[test]
fn test_walk_is_pre_order() {
    let tree = TestTree::build(&keys(0..64), 4, 2);
    let index = tree.index();

    let mut stack: Vec<u64> = Vec::new();
    let mut expecting_child = None;
    for event in index.walk() {
        match event {
            WalkEvent::Link { parent, child, depth, .. } => {
                // The parent is on the current path.
                stack.truncate(depth);
                assert_eq!(stack.last(), Some(&parent.offset()));
                expecting_child = Some(child.offset());
            }
            WalkEvent::Page { page, depth } => {
                if depth > 0 {
                    assert_eq!(expecting_child.take(), Some(page.offset()));
                }
                stack.truncate(depth);
                stack.push(page.offset());
            }
        }
    }
}

#[test]
fn test_walk_depth_matches_levels() {
    let tree = TestTree::build(&keys(0..300), 5, 3);
    let index = tree.index();
    let top = usize::from(index.root().level());

    for event in index.walk() {
        if let WalkEvent::Page { page, depth } = event {
            assert_eq!(depth + usize::from(page.level()), top);
            assert_eq!(page.index_id(), index.id());
        }
    }
}
