//! End-to-end pipeline scenarios: lookup classification, fetch fan-out, and
//! the state the merge stage receives.

use async_trait::async_trait;
use parking_lot::Mutex;
use promdelta::cache::{derive_cache_key, CacheStore, CachedDocument, MemoryCache};
use promdelta::context::{
    run_origin_fetches, CacheLookupResult, OriginClient, RequestContext,
};
use promdelta::error::FetchError;
use promdelta::extent::MatrixExtents;
use promdelta::model::decode_envelope;
use std::sync::Arc;
use std::time::Duration;

/// Origin double that records which extents were fetched and answers each
/// with a matrix body covering exactly that extent.
#[derive(Default)]
struct RecordingOrigin {
    fetched: Mutex<Vec<MatrixExtents>>,
}

#[async_trait]
impl OriginClient for RecordingOrigin {
    async fn fetch_range(
        &self,
        _query: &str,
        extent: MatrixExtents,
    ) -> Result<Vec<u8>, FetchError> {
        self.fetched.lock().push(extent);
        let body = format!(
            r#"{{"status":"success","data":{{"resultType":"matrix","result":[
                {{"metric":{{"__name__":"up"}},"values":[[{},"1"],[{},"1"]]}}
            ]}}}}"#,
            extent.start as f64 / 1000.0,
            extent.end as f64 / 1000.0
        );
        Ok(body.into_bytes())
    }
}

fn matrix_doc(start: i64, end: i64) -> CachedDocument {
    let envelope = decode_envelope(
        br#"{"status":"success","data":{"resultType":"matrix","result":[]}}"#,
    )
    .unwrap();
    CachedDocument {
        envelope,
        extents: MatrixExtents::new(start, end).unwrap(),
    }
}

#[tokio::test]
async fn partial_lookup_fetches_both_gaps_for_merge() {
    let requested = MatrixExtents::new(0, 2999).unwrap();
    let cache = MemoryCache::new();
    let key = derive_cache_key("http://origin", &[("query".into(), "up".into())]);
    cache.put(&key, matrix_doc(1000, 1999)).unwrap();

    let lookup = cache.get(&key, requested).unwrap();
    assert_eq!(lookup.result, CacheLookupResult::Partial);

    // Gap computation is the lookup stage's job; here it found gaps on both
    // sides of the cached [1000, 1999] range.
    let mut ctx = RequestContext::new(&key, requested);
    ctx.apply_lookup(
        lookup.result,
        MatrixExtents::new(0, 999).unwrap(),
        MatrixExtents::new(2000, 2999).unwrap(),
    )
    .unwrap();
    assert_eq!(ctx.fetch_count(), 2);

    let origin = Arc::new(RecordingOrigin::default());
    run_origin_fetches(&mut ctx, origin.clone(), "up", Duration::from_secs(1)).await;

    let mut fetched = origin.fetched.lock().clone();
    fetched.sort_by_key(|e| e.start);
    assert_eq!(
        fetched,
        vec![
            MatrixExtents::new(0, 999).unwrap(),
            MatrixExtents::new(2000, 2999).unwrap()
        ]
    );

    // Merge receives two decoded envelopes, each tagged with its extent.
    let decoded = ctx.decoded_results();
    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded[0].0, MatrixExtents::new(0, 999).unwrap());
    assert_eq!(decoded[1].0, MatrixExtents::new(2000, 2999).unwrap());
    for (_, envelope) in decoded {
        assert!(envelope.is_success());
    }
}

#[tokio::test]
async fn hit_lookup_triggers_no_fetches() {
    let requested = MatrixExtents::new(1000, 1999).unwrap();
    let cache = MemoryCache::new();
    let key = derive_cache_key("http://origin", &[("query".into(), "up".into())]);
    cache.put(&key, matrix_doc(0, 5000)).unwrap();

    let lookup = cache.get(&key, requested).unwrap();
    assert_eq!(lookup.result, CacheLookupResult::Hit);

    let mut ctx = RequestContext::new(&key, requested);
    ctx.apply_lookup(lookup.result, MatrixExtents::zero(), MatrixExtents::zero())
        .unwrap();
    assert_eq!(ctx.fetch_count(), 0);

    let origin = Arc::new(RecordingOrigin::default());
    run_origin_fetches(&mut ctx, origin.clone(), "up", Duration::from_secs(1)).await;

    assert!(origin.fetched.lock().is_empty());
    assert!(ctx.decoded_results().is_empty());
}

#[tokio::test]
async fn miss_lookup_fetches_the_full_range_once() {
    let requested = MatrixExtents::new(0, 2999).unwrap();
    let cache = MemoryCache::new();
    let key = derive_cache_key("http://origin", &[("query".into(), "up".into())]);

    let lookup = cache.get(&key, requested).unwrap();
    assert_eq!(lookup.result, CacheLookupResult::Miss);

    let mut ctx = RequestContext::new(&key, requested);
    ctx.apply_lookup(lookup.result, requested, MatrixExtents::zero())
        .unwrap();
    assert_eq!(ctx.fetch_count(), 1);

    let origin = Arc::new(RecordingOrigin::default());
    run_origin_fetches(&mut ctx, origin.clone(), "up", Duration::from_secs(1)).await;

    assert_eq!(origin.fetched.lock().clone(), vec![requested]);
    let decoded = ctx.decoded_results();
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].0, requested);
}

#[tokio::test]
async fn one_failed_fetch_leaves_the_other_decoded() {
    /// Fails any fetch whose extent starts at zero.
    struct FlakyOrigin;

    #[async_trait]
    impl OriginClient for FlakyOrigin {
        async fn fetch_range(
            &self,
            _query: &str,
            extent: MatrixExtents,
        ) -> Result<Vec<u8>, FetchError> {
            if extent.start == 0 {
                return Err(FetchError::Transport("connection refused".into()));
            }
            Ok(
                br#"{"status":"success","data":{"resultType":"matrix","result":[]}}"#.to_vec(),
            )
        }
    }

    let mut ctx = RequestContext::new("k", MatrixExtents::new(0, 2999).unwrap());
    ctx.apply_lookup(
        CacheLookupResult::Partial,
        MatrixExtents::new(0, 999).unwrap(),
        MatrixExtents::new(2000, 2999).unwrap(),
    )
    .unwrap();

    run_origin_fetches(&mut ctx, Arc::new(FlakyOrigin), "up", Duration::from_secs(1)).await;

    // Whether a partial success fails the whole request is merge policy;
    // the context just has to report both outcomes unambiguously.
    assert!(ctx.lower_fetch.is_failed());
    assert!(ctx.upper_fetch.envelope().is_some());
    assert_eq!(ctx.decoded_results().len(), 1);
}
