//! Per-filter match telemetry.
//!
//! Counters are plain atomics so that the matching path never takes a lock.
//! A `FilterStatistics` outlives the filter it describes: removing a filter
//! from a channel leaves its statistics in the channel's log.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::{ClockSource, SystemClock};

/// Match count and first/last match timestamps for one filter.
pub struct FilterStatistics {
    filter_id: String,
    count: AtomicU64,
    /// Epoch millis of the first match; 0 until the first increment.
    first: AtomicU64,
    /// Epoch millis of the latest match; only ever moves forward.
    last: AtomicU64,
    clock: Arc<dyn ClockSource>,
}

impl FilterStatistics {
    /// Creates zeroed statistics stamped by the given clock.
    #[must_use]
    pub fn new(filter_id: impl Into<String>, clock: Arc<dyn ClockSource>) -> Self {
        Self {
            filter_id: filter_id.into(),
            count: AtomicU64::new(0),
            first: AtomicU64::new(0),
            last: AtomicU64::new(0),
            clock,
        }
    }

    /// Creates zeroed statistics stamped by the system clock.
    #[must_use]
    pub fn with_system_clock(filter_id: impl Into<String>) -> Self {
        Self::new(filter_id, Arc::new(SystemClock))
    }

    /// Records one match.
    ///
    /// The increment that takes the count from 0 to 1 claims `first` with a
    /// compare-and-set against the zero sentinel, so a racing increment can
    /// never overwrite it. `last` is advanced with a max-update loop and never
    /// regresses when increments are reordered. `last` moves before `first` is
    /// claimed, so a reader never sees a non-zero `first` above `last`.
    pub fn increment_count(&self) {
        let now = self.clock.now();
        let claims_first = self.count.fetch_add(1, Ordering::AcqRel) == 0;
        let _ = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                (now > last).then_some(now)
            });
        if claims_first {
            let _ = self
                .first
                .compare_exchange(0, now, Ordering::AcqRel, Ordering::Acquire);
        }
    }

    #[must_use]
    pub fn filter_id(&self) -> &str {
        &self.filter_id
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn first(&self) -> u64 {
        self.first.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn last(&self) -> u64 {
        self.last.load(Ordering::Acquire)
    }

    /// Point-in-time copy of the counters.
    ///
    /// The three fields are read independently; under concurrent increments
    /// the snapshot may mix values from adjacent increments.
    #[must_use]
    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            filter_id: self.filter_id.clone(),
            count: self.count(),
            first: self.first(),
            last: self.last(),
        }
    }
}

impl fmt::Debug for FilterStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterStatistics")
            .field("filter_id", &self.filter_id)
            .field("count", &self.count())
            .field("first", &self.first())
            .field("last", &self.last())
            .finish()
    }
}

impl fmt::Display for FilterStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.snapshot(), f)
    }
}

/// Serializable copy of a [`FilterStatistics`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSnapshot {
    pub filter_id: String,
    pub count: u64,
    pub first: u64,
    pub last: u64,
}

impl fmt::Display for StatisticsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FilterStatistics [id: {}, count: {}, first: {}, last: {}]",
            self.filter_id, self.count, self.first, self.last
        )
    }
}
