//! Concurrent origin fetch coordination.
//!
//! Each non-zero origin extent gets its own tokio task; the lower and upper
//! fetches write disjoint slots on the context, so they need no coordination
//! with each other. The single join point here resolves both before the
//! caller's merge stage reads anything.

use crate::context::{FetchSlot, RequestContext};
use crate::error::FetchError;
use crate::extent::MatrixExtents;
use crate::model::{decode_envelope, PrometheusEnvelope};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Injected origin transport.
///
/// Implementations perform the actual range query against the upstream
/// service and return the raw response body. Transport failures come back as
/// [`FetchError::Transport`]; this core never constructs HTTP requests
/// itself.
#[async_trait]
pub trait OriginClient: Send + Sync {
    async fn fetch_range(
        &self,
        query: &str,
        extent: MatrixExtents,
    ) -> Result<Vec<u8>, FetchError>;
}

/// Run every required origin fetch for `ctx` and fill its fetch slots.
///
/// Spawns one task per non-zero extent (zero, one, or two), each bounded by
/// `timeout`, and returns only after all of them have resolved. Slots end up
/// `Decoded` or `Failed`; a timed-out or panicked fetch is recorded `Failed`,
/// never left `Pending`, so the merge stage can always distinguish a missing
/// fetch from an empty result.
pub async fn run_origin_fetches(
    ctx: &mut RequestContext,
    client: Arc<dyn OriginClient>,
    query: &str,
    timeout: Duration,
) {
    let lower = spawn_fetch(
        Arc::clone(&client),
        query,
        ctx.origin_lower_extents,
        timeout,
    );
    let upper = spawn_fetch(Arc::clone(&client), query, ctx.origin_upper_extents, timeout);

    if lower.is_some() {
        ctx.lower_fetch = FetchSlot::Pending;
    }
    if upper.is_some() {
        ctx.upper_fetch = FetchSlot::Pending;
    }

    let (lower_slot, upper_slot) = tokio::join!(resolve(lower), resolve(upper));
    ctx.lower_fetch = lower_slot;
    ctx.upper_fetch = upper_slot;
}

fn spawn_fetch(
    client: Arc<dyn OriginClient>,
    query: &str,
    extent: MatrixExtents,
    timeout: Duration,
) -> Option<JoinHandle<Result<PrometheusEnvelope, FetchError>>> {
    if extent.is_zero() {
        return None;
    }
    let query = query.to_string();
    Some(tokio::spawn(async move {
        debug!(%extent, "starting origin fetch");
        let body = tokio::time::timeout(timeout, client.fetch_range(&query, extent))
            .await
            .map_err(|_| FetchError::Timeout(timeout.as_millis() as u64))??;
        let envelope = decode_envelope(&body)?;
        debug!(%extent, result_type = %envelope.data.result_type, "origin fetch decoded");
        Ok(envelope)
    }))
}

async fn resolve(handle: Option<JoinHandle<Result<PrometheusEnvelope, FetchError>>>) -> FetchSlot {
    let Some(handle) = handle else {
        return FetchSlot::NotNeeded;
    };
    match handle.await {
        Ok(Ok(envelope)) => FetchSlot::Decoded(envelope),
        Ok(Err(err)) => {
            warn!(error = %err, "origin fetch failed");
            FetchSlot::Failed(err.to_string())
        }
        Err(join_err) => {
            let err = FetchError::Aborted(join_err.to_string());
            warn!(error = %err, "origin fetch task aborted");
            FetchSlot::Failed(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CacheLookupResult;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticOrigin {
        body: Vec<u8>,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl StaticOrigin {
        fn new(body: &[u8]) -> Self {
            Self {
                body: body.to_vec(),
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl OriginClient for StaticOrigin {
        async fn fetch_range(
            &self,
            _query: &str,
            _extent: MatrixExtents,
        ) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(self.body.clone())
        }
    }

    const SCALAR_BODY: &[u8] =
        br#"{"status":"success","data":{"resultType":"scalar","result":[100,"1"]}}"#;

    fn partial_ctx() -> RequestContext {
        let mut ctx = RequestContext::new("k", MatrixExtents::new(0, 2999).unwrap());
        ctx.apply_lookup(
            CacheLookupResult::Partial,
            MatrixExtents::new(0, 999).unwrap(),
            MatrixExtents::new(2000, 2999).unwrap(),
        )
        .unwrap();
        ctx
    }

    #[tokio::test]
    async fn two_gaps_issue_exactly_two_fetches() {
        let mut ctx = partial_ctx();
        let client = Arc::new(StaticOrigin::new(SCALAR_BODY));
        run_origin_fetches(&mut ctx, client.clone(), "up", Duration::from_secs(1)).await;

        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
        assert!(ctx.lower_fetch.envelope().is_some());
        assert!(ctx.upper_fetch.envelope().is_some());
        assert_eq!(ctx.decoded_results().len(), 2);
    }

    #[tokio::test]
    async fn hit_issues_no_fetches() {
        let mut ctx = RequestContext::new("k", MatrixExtents::new(0, 2999).unwrap());
        ctx.apply_lookup(
            CacheLookupResult::Hit,
            MatrixExtents::zero(),
            MatrixExtents::zero(),
        )
        .unwrap();

        let client = Arc::new(StaticOrigin::new(SCALAR_BODY));
        run_origin_fetches(&mut ctx, client.clone(), "up", Duration::from_secs(1)).await;

        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
        assert_eq!(ctx.lower_fetch, FetchSlot::NotNeeded);
        assert_eq!(ctx.upper_fetch, FetchSlot::NotNeeded);
    }

    #[tokio::test]
    async fn timeout_marks_the_slot_failed_not_pending() {
        let mut ctx = partial_ctx();
        let client = Arc::new(StaticOrigin {
            body: SCALAR_BODY.to_vec(),
            calls: AtomicUsize::new(0),
            delay: Duration::from_secs(5),
        });
        run_origin_fetches(&mut ctx, client, "up", Duration::from_millis(20)).await;

        assert!(ctx.lower_fetch.is_failed());
        assert!(ctx.upper_fetch.is_failed());
        assert!(ctx.decoded_results().is_empty());
    }

    #[tokio::test]
    async fn undecodable_body_fails_the_slot() {
        let mut ctx = partial_ctx();
        let client = Arc::new(StaticOrigin::new(
            br#"{"status":"success","data":{"resultType":"histogram","result":[]}}"#,
        ));
        run_origin_fetches(&mut ctx, client, "up", Duration::from_secs(1)).await;

        match &ctx.lower_fetch {
            FetchSlot::Failed(reason) => assert!(reason.contains("histogram")),
            other => panic!("expected failed slot, got {other:?}"),
        }
    }
}
