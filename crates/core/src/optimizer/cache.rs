//! In-memory cache of optimization results.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

use crate::coverage::CombinationResult;
use crate::metrics;

/// A cached optimization outcome, shared between callers.
pub type CachedResults = Arc<Vec<CombinationResult>>;

#[derive(Debug, Default)]
struct Entries {
    map: HashMap<String, CachedResults>,
    /// Bumped on every invalidation.
    generation: u64,
}

/// Result cache keyed by serialized `OptimizationRequest`.
///
/// Entries never expire on their own. Call [`ResultCache::invalidate_all`]
/// whenever catalog prices or coverage change. Writers that computed their
/// value from catalog data read before an invalidation use
/// [`ResultCache::put_if_current`] so the stale value is discarded.
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: RwLock<Entries>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<CachedResults> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let hit = entries.map.get(key).cloned();
        let label = if hit.is_some() { "hit" } else { "miss" };
        metrics::CACHE_LOOKUPS.with_label_values(&[label]).inc();
        hit
    }

    pub fn put(&self, key: String, value: CachedResults) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.map.insert(key, value);
    }

    /// Current invalidation generation.
    pub fn generation(&self) -> u64 {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .generation
    }

    /// Store `value` only if no invalidation happened since `generation`
    /// was read. Returns whether the value was stored.
    pub fn put_if_current(&self, key: String, value: CachedResults, generation: u64) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.generation != generation {
            debug!(key = %key, "Discarding result computed before cache invalidation");
            return false;
        }
        entries.map.insert(key, value);
        true
    }

    /// Drop every entry. Returns how many were removed.
    pub fn invalidate_all(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let removed = entries.map.len();
        entries.map.clear();
        entries.generation += 1;
        metrics::CACHE_INVALIDATIONS.inc();
        info!(removed, "Result cache invalidated");
        removed
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .map
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
