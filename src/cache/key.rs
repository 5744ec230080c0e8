//! Cache key derivation from normalized request parameters.
//!
//! Two requests asking for the same series with the same step must land on
//! the same key regardless of parameter order, while the requested time
//! range must NOT contribute (the whole point of delta caching is that
//! different ranges of one query share a cache entry).

use blake3::Hasher;

/// Parameters that identify a cache entry, excluded from hashing.
const RANGE_PARAMS: [&str; 3] = ["start", "end", "time"];

/// Derive the cache key for an origin plus a set of query parameters.
///
/// Parameters are sorted by name for determinism; range-selection parameters
/// are skipped so differing windows of the same query share an entry.
pub fn derive_cache_key(origin_url: &str, params: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = params
        .iter()
        .filter(|(name, _)| !RANGE_PARAMS.contains(&name.as_str()))
        .collect();
    sorted.sort();

    let mut hasher = Hasher::new();
    hasher.update(origin_url.as_bytes());
    hasher.update(b"\n");
    for (name, value) in sorted {
        hasher.update(name.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize().as_bytes())
}
