//! Error types for the delta-cache request core.

use thiserror::Error;

/// Errors produced while decoding an upstream result envelope.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The envelope shell itself was not valid JSON or lacked required fields.
    #[error("Invalid response envelope: {0}")]
    Envelope(#[from] serde_json::Error),

    /// The `resultType` tag named a shape this core does not know.
    ///
    /// Permanent: retrying cannot succeed, the upstream schema is incompatible.
    #[error("Unknown result type: {0}")]
    UnknownResultType(String),

    /// The tag was recognized but the `result` payload did not match its shape.
    #[error("Malformed {result_type} result: {source}")]
    MalformedResult {
        result_type: &'static str,
        source: serde_json::Error,
    },
}

impl DecodeError {
    /// Whether retrying the fetch can never produce a decodable response.
    pub fn is_permanent(&self) -> bool {
        matches!(self, DecodeError::UnknownResultType(_))
    }
}

/// Errors from constructing time extents.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ExtentError {
    #[error("Inverted extent: start {start} > end {end}")]
    Inverted { start: i64, end: i64 },
}

/// Violations of the request-context lookup state machine.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Cache hit must leave no origin gaps (lower {lower}, upper {upper})")]
    HitWithGaps {
        lower: crate::extent::MatrixExtents,
        upper: crate::extent::MatrixExtents,
    },

    #[error("Cache miss must cover the full request {request}, got lower {lower} upper {upper}")]
    MissNotFullRange {
        request: crate::extent::MatrixExtents,
        lower: crate::extent::MatrixExtents,
        upper: crate::extent::MatrixExtents,
    },

    #[error("Invalid step parameter: {0:?}")]
    InvalidStep(String),

    #[error(transparent)]
    Extent(#[from] ExtentError),
}

/// Errors surfaced by an origin fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure reported by the injected origin client.
    #[error("Origin transport error: {0}")]
    Transport(String),

    #[error("Origin fetch timed out after {0} ms")]
    Timeout(u64),

    /// The fetch task was cancelled or panicked before producing a result.
    #[error("Origin fetch aborted: {0}")]
    Aborted(String),

    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),
}

/// Errors from the injected cache store.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cached document corrupt for key {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
