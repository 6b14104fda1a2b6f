//! Per-principal caching of computed grants.
//!
//! Building a [`QueryNeed`] merges every filter a principal was granted.
//! [`NeedCache`] keeps the result keyed by principal and rebuilds it only
//! when the grant content changes.
//!
//! # Key Format
//!
//! ```text
//! {principal} -> (sha256 of the grant filters, QueryNeed)
//! ```

mod hash;
pub use hash::compute_hash;

use std::sync::Arc;

use dashmap::DashMap;
use log::debug;

use crate::permission::{DimensionFilter, GrantProvider, QueryNeed};

/// Errors that can occur during cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug)]
struct CachedNeed {
    fingerprint: String,
    need: Arc<QueryNeed>,
}

/// Concurrent principal -> grant cache.
#[derive(Debug, Default)]
pub struct NeedCache {
    entries: DashMap<String, CachedNeed>,
}

impl NeedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The merged grant of `principal`, rebuilt if `grants` changed since the
    /// last call.
    pub fn get_or_build(
        &self,
        principal: &str,
        grants: Vec<DimensionFilter>,
    ) -> CacheResult<Arc<QueryNeed>> {
        // Fingerprint the merged form so grant order does not matter.
        let merged = QueryNeed::new(grants);
        let fingerprint = merged.fingerprint()?;

        // Release the shard lock before any insert below.
        if let Some(entry) = self.entries.get(principal) {
            if entry.fingerprint == fingerprint {
                return Ok(Arc::clone(&entry.need));
            }
        }

        debug!(
            "building grant for '{}' over {} dimension(s)",
            principal,
            merged.len()
        );
        let need = Arc::new(merged);
        self.entries.insert(
            principal.to_string(),
            CachedNeed {
                fingerprint,
                need: Arc::clone(&need),
            },
        );
        Ok(need)
    }

    /// Look up the grants of `principal` in `provider` and cache the result.
    pub fn need_for<P: GrantProvider + ?Sized>(
        &self,
        provider: &P,
        principal: &str,
    ) -> CacheResult<Arc<QueryNeed>> {
        self.get_or_build(principal, provider.grants_for(principal))
    }

    /// Drop the cached grant of `principal`. Returns whether one existed.
    pub fn invalidate(&self, principal: &str) -> bool {
        self.entries.remove(principal).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
