//! Per-request state shared between the cache-lookup, fetch, and merge
//! stages of the proxy pipeline.
//!
//! A [`RequestContext`] is owned by exactly one client request: created when
//! the request is accepted, populated by the lookup stage, filled in by the
//! fetch stage, read by the merge stage, then dropped. It is never persisted
//! and never shared across requests. The two origin fetch slots are disjoint
//! fields, so the lower and upper fetches can resolve independently.

pub mod fetch;

pub use fetch::{run_origin_fetches, OriginClient};

use crate::config::OriginConfig;
use crate::error::ContextError;
use crate::extent::MatrixExtents;
use crate::model::PrometheusEnvelope;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of the cache lookup for a request's key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheLookupResult {
    /// Nothing cached; the full request range must be fetched.
    Miss,
    /// Some of the range is cached; only the gaps must be fetched.
    Partial,
    /// The cached range covers the request; no fetch required.
    Hit,
}

impl CacheLookupResult {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheLookupResult::Miss => "miss",
            CacheLookupResult::Partial => "partial",
            CacheLookupResult::Hit => "hit",
        }
    }
}

impl fmt::Display for CacheLookupResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The state of one origin fetch slot.
///
/// A cancelled or timed-out fetch lands in `Failed`, never stays `Pending`,
/// so the merge stage can tell "no data" (a legitimate `none` result) apart
/// from "fetch did not complete".
#[derive(Debug, Clone, PartialEq)]
pub enum FetchSlot {
    /// The extent was zero; no fetch was issued.
    NotNeeded,
    /// A fetch was issued and has not resolved yet.
    Pending,
    /// The fetch completed and its body decoded.
    Decoded(PrometheusEnvelope),
    /// The fetch failed, timed out, or its body did not decode.
    Failed(String),
}

impl FetchSlot {
    pub fn envelope(&self) -> Option<&PrometheusEnvelope> {
        match self {
            FetchSlot::Decoded(env) => Some(env),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FetchSlot::Failed(_))
    }
}

/// Everything one in-flight client request carries between pipeline stages.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Cache key derived from the normalized request parameters.
    pub cache_key: String,
    pub lookup_result: CacheLookupResult,

    /// The range the client asked for.
    pub request_extents: MatrixExtents,
    /// Gap below the cached range, zero if none.
    pub origin_lower_extents: MatrixExtents,
    /// Gap above the cached range, zero if none.
    pub origin_upper_extents: MatrixExtents,

    /// Step as given by the client and its parsed millisecond form.
    /// Only [`RequestContext::set_step`] writes these, keeping them consistent.
    pub step_param: String,
    pub step_ms: i64,

    /// Evaluation timestamp for instant queries; unused for ranges.
    pub time: i64,

    /// Origin the request resolves against.
    pub origin: OriginConfig,

    /// Decoded result per fetched extent. One slot per side; the two are
    /// written by independent tasks and joined before merge.
    pub lower_fetch: FetchSlot,
    pub upper_fetch: FetchSlot,
}

impl RequestContext {
    pub fn new(cache_key: impl Into<String>, request_extents: MatrixExtents) -> Self {
        Self {
            cache_key: cache_key.into(),
            lookup_result: CacheLookupResult::Miss,
            request_extents,
            origin_lower_extents: MatrixExtents::zero(),
            origin_upper_extents: MatrixExtents::zero(),
            step_param: String::new(),
            step_ms: 0,
            time: 0,
            origin: OriginConfig::default(),
            lower_fetch: FetchSlot::NotNeeded,
            upper_fetch: FetchSlot::NotNeeded,
        }
    }

    pub fn with_origin(mut self, origin: OriginConfig) -> Self {
        self.origin = origin;
        self
    }

    /// Parse and record the client's step parameter.
    pub fn set_step(&mut self, param: &str) -> Result<(), ContextError> {
        self.step_ms = parse_step_ms(param)?;
        self.step_param = param.to_string();
        Ok(())
    }

    /// Record the lookup stage's outcome, enforcing the lookup state machine:
    /// a hit leaves no gaps, a miss covers the whole request (recorded on the
    /// lower side), a partial records exactly the uncached gaps.
    pub fn apply_lookup(
        &mut self,
        result: CacheLookupResult,
        lower: MatrixExtents,
        upper: MatrixExtents,
    ) -> Result<(), ContextError> {
        match result {
            CacheLookupResult::Hit => {
                if !lower.is_zero() || !upper.is_zero() {
                    return Err(ContextError::HitWithGaps { lower, upper });
                }
            }
            CacheLookupResult::Miss => {
                let full_on_lower = lower == self.request_extents && upper.is_zero();
                let full_on_upper = upper == self.request_extents && lower.is_zero();
                if !full_on_lower && !full_on_upper {
                    return Err(ContextError::MissNotFullRange {
                        request: self.request_extents,
                        lower,
                        upper,
                    });
                }
            }
            CacheLookupResult::Partial => {}
        }

        self.lookup_result = result;
        self.origin_lower_extents = lower;
        self.origin_upper_extents = upper;
        self.lower_fetch = FetchSlot::NotNeeded;
        self.upper_fetch = FetchSlot::NotNeeded;
        Ok(())
    }

    /// Number of origin fetches this request requires (0, 1, or 2).
    pub fn fetch_count(&self) -> usize {
        [self.origin_lower_extents, self.origin_upper_extents]
            .iter()
            .filter(|e| !e.is_zero())
            .count()
    }

    /// Decoded results with the extents they cover, for the merge stage.
    pub fn decoded_results(&self) -> Vec<(MatrixExtents, &PrometheusEnvelope)> {
        let mut out = Vec::with_capacity(2);
        if let Some(env) = self.lower_fetch.envelope() {
            out.push((self.origin_lower_extents, env));
        }
        if let Some(env) = self.upper_fetch.envelope() {
            out.push((self.origin_upper_extents, env));
        }
        out
    }
}

/// Parse a client step parameter to milliseconds.
///
/// Accepts bare (possibly fractional) seconds or an integer with one of the
/// duration suffixes `ms`, `s`, `m`, `h`, `d`, `w`.
pub fn parse_step_ms(param: &str) -> Result<i64, ContextError> {
    const SUFFIXES: [(&str, i64); 6] = [
        ("ms", 1),
        ("s", 1_000),
        ("m", 60_000),
        ("h", 3_600_000),
        ("d", 86_400_000),
        ("w", 604_800_000),
    ];

    let param = param.trim();
    if param.is_empty() {
        return Err(ContextError::InvalidStep(param.to_string()));
    }

    if let Ok(secs) = param.parse::<f64>() {
        if secs.is_finite() && secs > 0.0 {
            return Ok((secs * 1000.0).round() as i64);
        }
        return Err(ContextError::InvalidStep(param.to_string()));
    }

    for (suffix, scale) in SUFFIXES {
        if let Some(count) = param.strip_suffix(suffix) {
            if let Ok(n) = count.parse::<i64>() {
                if n > 0 {
                    return Ok(n * scale);
                }
            }
            return Err(ContextError::InvalidStep(param.to_string()));
        }
    }

    Err(ContextError::InvalidStep(param.to_string()))
}
