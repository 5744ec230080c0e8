//! Promdelta: Delta-Cache Request Core
//!
//! Typed decoding of heterogeneous time-series query results and the
//! per-request context a delta-caching proxy uses to reconcile a client's
//! requested range against what is already cached. Transport, the merge of
//! cached and fetched series, and process wiring are external collaborators.

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod extent;
pub mod logging;
pub mod model;
