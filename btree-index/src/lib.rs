// Read-only navigation over a disk-resident B-tree index:
// 1. A page source hands out decoded pages by address
// 2. `Index` validates the root page once
// 3. Queries descend (search), move sideways (level scans, leaf records)
//    or walk the whole tree (page and link events)
//
// Components:
//  - Key comparator
//  - Page-level linear and directory searches
//  - Tree navigator
//  - Index aggregate

pub mod btree;
pub mod config;
mod e2e_tests;
pub mod page;
pub mod record;
pub mod testing;

pub use btree::{Index, IndexError, NodeType, WalkEvent, compare_keys};
pub use config::{ConfigError, IndexConfig};
pub use page::{ChildRef, IndexId, Page, PageId, PageSource, PageType, RecordCursor, RecordOffset};
pub use record::{FieldValue, Key, Record, RecordKind};
