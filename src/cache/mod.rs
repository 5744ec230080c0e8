//! Cache store seam.
//!
//! The store is an injected dependency, never process-global state, so the
//! pipeline can swap backends and tests can substitute their own. Only the
//! lookup/insert interface lives here; eviction and the merge of cached and
//! fetched ranges are the owning pipeline's business.

pub mod key;

pub use key::derive_cache_key;

use crate::context::CacheLookupResult;
use crate::error::CacheError;
use crate::extent::MatrixExtents;
use crate::model::PrometheusEnvelope;
use parking_lot::RwLock;
use std::collections::HashMap;

/// A cached envelope together with the range it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedDocument {
    pub envelope: PrometheusEnvelope,
    pub extents: MatrixExtents,
}

/// Outcome of a cache lookup: the classification plus whatever was found.
///
/// `document` is present for `Hit` and `Partial`, absent for `Miss`.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheLookup {
    pub result: CacheLookupResult,
    pub document: Option<CachedDocument>,
}

impl CacheLookup {
    pub fn miss() -> Self {
        Self {
            result: CacheLookupResult::Miss,
            document: None,
        }
    }
}

/// Cache store interface.
pub trait CacheStore: Send + Sync {
    /// Look up `key`, classifying the result against `requested`.
    fn get(&self, key: &str, requested: MatrixExtents) -> Result<CacheLookup, CacheError>;

    /// Store or replace the document under `key`.
    fn put(&self, key: &str, document: CachedDocument) -> Result<(), CacheError>;
}

/// In-process cache backend.
///
/// Classification: a stored document covering the whole requested range is a
/// hit, any overlap is a partial, anything else (or no document) a miss.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CachedDocument>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str, requested: MatrixExtents) -> Result<CacheLookup, CacheError> {
        let entries = self.entries.read();
        let Some(document) = entries.get(key) else {
            return Ok(CacheLookup::miss());
        };

        let covers =
            document.extents.start <= requested.start && document.extents.end >= requested.end;
        let overlaps =
            document.extents.start <= requested.end && document.extents.end >= requested.start;

        let result = if covers {
            CacheLookupResult::Hit
        } else if overlaps {
            CacheLookupResult::Partial
        } else {
            CacheLookupResult::Miss
        };

        Ok(CacheLookup {
            result,
            document: if overlaps || covers {
                Some(document.clone())
            } else {
                None
            },
        })
    }

    fn put(&self, key: &str, document: CachedDocument) -> Result<(), CacheError> {
        self.entries.write().insert(key.to_string(), document);
        Ok(())
    }
}
