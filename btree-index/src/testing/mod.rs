//! In-memory page source and tree construction for tests and examples.

mod builder;
mod memory;

pub use builder::{DEFAULT_DIRECTORY_EVERY, DEFAULT_FANOUT, DEFAULT_FIRST_PAGE_ID, TreeBuilder};
pub use memory::{
    ColumnDescriber, FaultConfig, INFIMUM_OFFSET, MAX_RECORDS_PER_PAGE, MemoryPage,
    MemoryPageStore, MemoryStoreStats, SUPREMUM_OFFSET,
};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Install a test-friendly tracing subscriber.
///
/// Honors `RUST_LOG`, defaulting to debug output for this crate. Safe to call
/// from every test; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "btree_index=debug".into()))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}
