//! Per-channel filter state.
//!
//! Readers (the matching path) never lock: they load the current
//! [`FilterSet`] through an `ArcSwap` and iterate an immutable snapshot.
//! Writers serialize on a per-channel mutex, clone the set, mutate the clone
//! and publish it with a single atomic store. Mutations are therefore
//! linearizable with each other, and a matching pass always sees one
//! complete, correctly ordered set.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use dynrouter_core::{FilterKey, FilterStatistics, PrioritizedFilter};
use parking_lot::{Mutex, RwLock};

use super::error::AddRejected;

// ---------------------------------------------------------------------------
// FilterSet
// ---------------------------------------------------------------------------

/// Immutable-once-published ordered filter set with an id index.
///
/// `ordered` is keyed by `(priority, id)` and drives iteration order.
/// `by_id` answers "is this id active" independently of priority, which is
/// what the add/update gate needs.
#[derive(Clone, Default)]
pub struct FilterSet {
    ordered: BTreeMap<FilterKey, Arc<PrioritizedFilter>>,
    by_id: HashMap<String, FilterKey>,
}

impl FilterSet {
    #[must_use]
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Filters in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<PrioritizedFilter>> {
        self.ordered.values()
    }

    #[must_use]
    pub fn contains_id(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<PrioritizedFilter>> {
        self.by_id.get(id).and_then(|key| self.ordered.get(key))
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<Arc<PrioritizedFilter>> {
        self.ordered.values().cloned().collect()
    }

    /// Inserts `filter`, replacing any filter with the same id regardless of
    /// its priority. Returns the replaced filter.
    fn upsert(&mut self, filter: Arc<PrioritizedFilter>) -> Option<Arc<PrioritizedFilter>> {
        let previous = self.remove(filter.id());
        self.by_id.insert(filter.id().to_string(), filter.key().clone());
        self.ordered.insert(filter.key().clone(), filter);
        previous
    }

    fn remove(&mut self, id: &str) -> Option<Arc<PrioritizedFilter>> {
        let key = self.by_id.remove(id)?;
        self.ordered.remove(&key)
    }
}

impl fmt::Debug for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.ordered.keys()).finish()
    }
}

// ---------------------------------------------------------------------------
// ChannelFilters
// ---------------------------------------------------------------------------

/// Active filter set and statistics log of one channel.
pub struct ChannelFilters {
    channel: String,
    filters: ArcSwap<FilterSet>,
    /// Every statistics object ever registered here, in registration order.
    statistics: RwLock<Vec<Arc<FilterStatistics>>>,
    /// Serializes writers so that read-modify-publish is atomic.
    writer: Mutex<()>,
}

impl ChannelFilters {
    /// Creates an empty channel.
    #[must_use]
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            filters: ArcSwap::from_pointee(FilterSet::default()),
            statistics: RwLock::new(Vec::new()),
            writer: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// The currently published filter set. Later mutations do not affect it.
    #[must_use]
    pub fn snapshot(&self) -> Arc<FilterSet> {
        self.filters.load_full()
    }

    /// Copy of the active filters in evaluation order.
    #[must_use]
    pub fn filters(&self) -> Vec<Arc<PrioritizedFilter>> {
        self.filters.load().to_vec()
    }

    /// Copy of the statistics log.
    #[must_use]
    pub fn statistics(&self) -> Vec<Arc<FilterStatistics>> {
        self.statistics.read().clone()
    }

    #[must_use]
    pub fn contains_id(&self, id: &str) -> bool {
        self.filters.load().contains_id(id)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<PrioritizedFilter>> {
        self.filters.load().get(id).cloned()
    }

    /// Inserts unconditionally, replacing any active filter with the same id.
    /// Returns the replaced filter.
    pub fn insert(&self, filter: Arc<PrioritizedFilter>) -> Option<Arc<PrioritizedFilter>> {
        let _guard = self.writer.lock();
        self.insert_locked(filter)
    }

    /// Inserts only if `update` agrees with whether the id is already active:
    /// new ids may only be added, existing ids may only be updated.
    ///
    /// The check and the insert happen under the channel's writer lock, so two
    /// racing adds of the same new id cannot both succeed.
    ///
    /// # Errors
    ///
    /// Returns [`AddRejected`] when `update` and existence disagree.
    pub fn add(&self, filter: Arc<PrioritizedFilter>, update: bool) -> Result<(), AddRejected> {
        let _guard = self.writer.lock();
        let exists = self.filters.load().contains_id(filter.id());
        if update != exists {
            return Err(AddRejected {
                filter_id: filter.id().to_string(),
                channel: self.channel.clone(),
                update,
                exists,
            });
        }
        self.insert_locked(filter);
        Ok(())
    }

    /// Removes the active filter with `id`. Its statistics stay in the log.
    pub fn remove(&self, id: &str) -> Option<Arc<PrioritizedFilter>> {
        let _guard = self.writer.lock();
        let current = self.filters.load_full();
        if !current.contains_id(id) {
            return None;
        }
        let mut next = FilterSet::clone(&current);
        let removed = next.remove(id);
        self.filters.store(Arc::new(next));
        removed
    }

    fn insert_locked(&self, filter: Arc<PrioritizedFilter>) -> Option<Arc<PrioritizedFilter>> {
        // The log is extended before the set is published, so it always
        // covers every filter a reader can see.
        {
            let stats = filter.statistics();
            let mut log = self.statistics.write();
            if !log.iter().any(|existing| Arc::ptr_eq(existing, stats)) {
                log.push(Arc::clone(stats));
            }
        }
        let mut next = FilterSet::clone(&self.filters.load());
        let previous = next.upsert(filter);
        self.filters.store(Arc::new(next));
        previous
    }
}

impl fmt::Debug for ChannelFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelFilters")
            .field("channel", &self.channel)
            .field("filters", &self.filters.load().len())
            .field("statistics", &self.statistics.read().len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
