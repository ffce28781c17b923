//! Common helpers for end-to-end tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::btree::Index;
use crate::config::IndexConfig;
use crate::page::{Page, PageId, PageSource};
use crate::record::{FieldValue, Key};
use crate::testing::{self, DEFAULT_FIRST_PAGE_ID, MemoryPage, MemoryPageStore, TreeBuilder};

/// Single-column integer key.
pub fn key(value: i64) -> Key {
    vec![FieldValue::Int(value)]
}

pub fn keys(values: impl IntoIterator<Item = i64>) -> Vec<Key> {
    values.into_iter().map(key).collect()
}

/// Random keys of one or two columns, drawn from a small domain so that
/// duplicates and near misses are common.
pub fn random_keys(rng: &mut StdRng, count: usize) -> Vec<Key> {
    (0..count).map(|_| random_key(rng)).collect()
}

pub fn random_key(rng: &mut StdRng) -> Key {
    let first = FieldValue::Int(rng.random_range(-500..500));
    if rng.random_bool(0.3) {
        let second = FieldValue::Text(format!("k{}", rng.random_range(0..20)));
        vec![first, second]
    } else {
        vec![first]
    }
}

/// A tree built into a fresh store.
pub struct TestTree {
    pub store: MemoryPageStore,
    pub root: PageId,
    /// Sorted, deduplicated keys present in the tree.
    pub keys: Vec<Key>,
}

impl TestTree {
    /// Build a tree from `keys` with the given shape.
    pub fn build(keys: &[Key], fanout: usize, directory_every: usize) -> Self {
        let builder = TreeBuilder::new(1)
            .fanout(fanout)
            .directory_every(directory_every);
        Self::with_builder(&builder, keys)
    }

    /// Build a tree from `keys` with a fully configured builder.
    pub fn with_builder(builder: &TreeBuilder, keys: &[Key]) -> Self {
        testing::init_tracing();

        let mut store = MemoryPageStore::new(0);
        let root = builder.build_into(&mut store, keys);

        let keys = Index::new(&store, root)
            .map(|index| index.each_record().filter_map(|r| r.key).collect())
            .unwrap_or_default();

        Self { store, root, keys }
    }

    /// Build a randomly shaped tree from a seed.
    pub fn random(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let count = rng.random_range(0..400);
        let fanout = rng.random_range(2..=12);
        let directory_every = rng.random_range(1..=6);
        let raise_leftmost_keys = rng.random_bool(0.5);
        let keys = random_keys(&mut rng, count);

        let builder = TreeBuilder::new(1)
            .fanout(fanout)
            .directory_every(directory_every)
            .raise_leftmost_keys(raise_leftmost_keys);
        Self::with_builder(&builder, &keys)
    }

    /// Open the index with the configuration from the environment.
    #[allow(clippy::expect_used)]
    pub fn index(&self) -> Index<&MemoryPageStore> {
        let config = IndexConfig::from_env().expect("valid BTREE_INDEX_MAX_DEPTH");
        Index::with_config(&self.store, self.root, config).expect("built tree has a valid root")
    }

    /// Open the index on a store that may fail reads, retrying the root.
    #[allow(clippy::expect_used)]
    pub fn open_retrying(&self) -> Index<&MemoryPageStore> {
        (0..64)
            .find_map(|_| Index::new(&self.store, self.root).ok())
            .expect("root readable within 64 attempts")
    }

    /// Every page the builder allocated.
    pub fn pages(&self) -> Vec<MemoryPage> {
        (DEFAULT_FIRST_PAGE_ID..=self.root)
            .filter_map(|page_id| self.store.fetch(page_id, None))
            .collect()
    }

    /// Keys to search for: every present key plus random ones that are mostly absent.
    pub fn search_keys(&self, seed: u64) -> Vec<Key> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut search_keys = self.keys.clone();
        search_keys.extend(random_keys(&mut rng, 200));
        search_keys.push(Vec::new());
        search_keys.push(vec![FieldValue::Null]);
        search_keys.push(vec![FieldValue::Int(i64::MIN)]);
        search_keys.push(vec![FieldValue::Int(i64::MAX)]);
        search_keys.push(vec![FieldValue::Int(0), FieldValue::Text("zzz".into()), FieldValue::Null]);
        search_keys
    }
}

/// Page ids and keys of a search result, for comparisons.
pub fn summarize(found: Option<(MemoryPage, crate::record::Record)>) -> Option<(PageId, Key)> {
    found.map(|(page, record)| (page.offset(), record.key.unwrap_or_default()))
}
