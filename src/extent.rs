//! Time extents: closed `[start, end]` intervals in epoch milliseconds.

use crate::error::ExtentError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A closed time interval in epoch milliseconds.
///
/// The zero value `{0, 0}` doubles as the "no gap" sentinel on origin
/// extents. Inverted intervals are rejected at construction rather than
/// normalized, so a swapped start/end upstream surfaces immediately instead
/// of silently widening or shrinking a fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixExtents {
    pub start: i64,
    pub end: i64,
}

impl MatrixExtents {
    /// Construct an extent, rejecting `start > end`.
    ///
    /// A zero-length interval (`start == end`) is degenerate but legal.
    pub fn new(start: i64, end: i64) -> Result<Self, ExtentError> {
        if start > end {
            return Err(ExtentError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// The zero-value sentinel meaning "nothing to fetch".
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.start == 0 && self.end == 0
    }

    pub fn duration_ms(&self) -> i64 {
        self.end - self.start
    }

    pub fn contains(&self, ts_ms: i64) -> bool {
        ts_ms >= self.start && ts_ms <= self.end
    }

    /// Snap both bounds outward to the enclosing step boundaries.
    ///
    /// Gap extents derived from cached data land on arbitrary timestamps;
    /// origin queries want step-aligned ranges so cached and fetched samples
    /// line up.
    pub fn step_aligned(&self, step_ms: i64) -> Self {
        if step_ms <= 0 || self.is_zero() {
            return *self;
        }
        let start = self.start - self.start.rem_euclid(step_ms);
        let rem = self.end.rem_euclid(step_ms);
        let end = if rem == 0 {
            self.end
        } else {
            self.end + (step_ms - rem)
        };
        Self { start, end }
    }
}

impl fmt::Display for MatrixExtents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}
