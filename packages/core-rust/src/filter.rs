//! Prioritized filters: one subscription of a channel.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::predicate::Predicate;
use crate::statistics::FilterStatistics;

/// Sort key of a filter within its channel.
///
/// Ordering is priority ascending (lower value wins), then id ascending in
/// lexicographic byte order. Derived `Ord` compares fields in declaration
/// order, which is exactly this.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FilterKey {
    pub priority: i32,
    pub id: String,
}

impl FilterKey {
    #[must_use]
    pub fn new(priority: i32, id: impl Into<String>) -> Self {
        Self {
            priority,
            id: id.into(),
        }
    }
}

/// Immutable description of one subscription: when (`predicate`) and where
/// (`endpoint`) to route, and in which order (`priority`, then `id`).
///
/// Two notions of identity coexist on purpose. Ordering uses the full
/// `(priority, id)` key via [`Ord`]; "is this the same filter" for
/// add/update/remove uses the `id` alone (see [`PrioritizedFilter::same_id`]).
/// `PartialEq` follows the ordering so that it stays consistent with `Ord`.
pub struct PrioritizedFilter {
    key: FilterKey,
    predicate: Arc<dyn Predicate>,
    endpoint: String,
    statistics: Arc<FilterStatistics>,
}

impl PrioritizedFilter {
    /// Creates a filter.
    ///
    /// # Panics
    ///
    /// Panics if `id` or `endpoint` is empty. Supplying them is the caller's
    /// contract; the router validates its inputs before getting here.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        priority: i32,
        predicate: Arc<dyn Predicate>,
        endpoint: impl Into<String>,
        statistics: Arc<FilterStatistics>,
    ) -> Self {
        let id = id.into();
        let endpoint = endpoint.into();
        assert!(!id.is_empty(), "filter id must not be empty");
        assert!(!endpoint.is_empty(), "filter endpoint must not be empty");
        Self {
            key: FilterKey { priority, id },
            predicate,
            endpoint,
            statistics,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.key.id
    }

    #[must_use]
    pub fn priority(&self) -> i32 {
        self.key.priority
    }

    #[must_use]
    pub fn key(&self) -> &FilterKey {
        &self.key
    }

    #[must_use]
    pub fn predicate(&self) -> &Arc<dyn Predicate> {
        &self.predicate
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Shared handle to this filter's statistics. The same object stays in the
    /// channel's statistics log after the filter is removed.
    #[must_use]
    pub fn statistics(&self) -> &Arc<FilterStatistics> {
        &self.statistics
    }

    /// Evaluates the predicate against `message`.
    #[must_use]
    pub fn matches(&self, message: &Message) -> bool {
        self.predicate.matches(message)
    }

    /// Logical identity used for deduplication: same id, any priority.
    #[must_use]
    pub fn same_id(&self, other: &PrioritizedFilter) -> bool {
        self.key.id == other.key.id
    }

    #[must_use]
    pub fn summary(&self) -> FilterSummary {
        FilterSummary {
            id: self.key.id.clone(),
            priority: self.key.priority,
            predicate: self.predicate.describe(),
            endpoint: self.endpoint.clone(),
        }
    }
}

impl PartialEq for PrioritizedFilter {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for PrioritizedFilter {}

impl PartialOrd for PrioritizedFilter {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PrioritizedFilter {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Debug for PrioritizedFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrioritizedFilter")
            .field("id", &self.key.id)
            .field("priority", &self.key.priority)
            .field("predicate", &self.predicate)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for PrioritizedFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.summary(), f)
    }
}

/// Serializable listing entry for a filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSummary {
    pub id: String,
    pub priority: i32,
    pub predicate: String,
    pub endpoint: String,
}

impl fmt::Display for FilterSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PrioritizedFilter [id: {}, priority: {}, predicate: {}, endpoint: {}]",
            self.id, self.priority, self.predicate, self.endpoint
        )
    }
}
