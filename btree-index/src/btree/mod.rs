//! Read-only B-tree navigation.
//!
//! # Structure
//!
//! Pages hold records in a page-local chain bounded by infimum and supremum
//! sentinels. Leaf pages (level 0) hold rows; internal pages hold node
//! pointers, each routing to a child page whose smallest key equals the node
//! pointer's key. Pages on the same level are linked by `prev`/`next`.
//!
//! # Searching
//!
//! Two page-level strategies find the greatest record not exceeding a key:
//! a linear scan of the record chain, and a binary search over the page
//! directory that finishes with a short linear scan. [`Index`] descends from
//! the root with either one and both give the same answers.
//!
//! # Usage
//!
//! ```
//! use btree_index::testing::{MemoryPageStore, TreeBuilder};
//! use btree_index::{FieldValue, Index};
//!
//! let keys: Vec<_> = (0..100).map(|i| vec![FieldValue::Int(i)]).collect();
//! let mut store = MemoryPageStore::new(0);
//! let root = TreeBuilder::new(1).fanout(8).build_into(&mut store, &keys);
//!
//! let index = Index::new(&store, root).expect("valid root");
//! let (_page, record) = index.binary_search(&[FieldValue::Int(42)]).expect("present");
//! assert_eq!(record.key, Some(vec![FieldValue::Int(42)]));
//! assert_eq!(index.each_record().count(), 100);
//! ```

mod compare;
mod index;
mod navigator;
mod search;

pub use compare::compare_keys;
pub use index::{Index, IndexError};
pub use navigator::{LeafRecords, LevelPages, NodeType, TreeWalk, WalkEvent};
pub use search::{binary_search_by_directory, linear_search_from_cursor};
