//! End-to-end tests at the index level.
//!
//! Each test file covers a specific scenario, building trees from seeded
//! inputs and checking searches and traversals against each other.

#![cfg(test)]

mod helpers;

mod test_concrete_tree;
mod test_describer_propagation;
mod test_determinism;
mod test_each_record;
mod test_fault_injection;
mod test_level_containment;
mod test_open_rejections;
mod test_recurse_completeness;
mod test_search_equivalence;
