//! Channel registry: channel name -> [`ChannelFilters`], backed by [`DashMap`].
//!
//! Lookups on different channels proceed in parallel; the map's internal
//! sharding is the only cross-channel synchronization. Channels are created
//! lazily and live as long as the registry.

use std::sync::Arc;

use dashmap::DashMap;

use super::channel::ChannelFilters;

/// Concurrent map of channels.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    channels: DashMap<String, Arc<ChannelFilters>>,
}

impl ChannelRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Returns the channel, creating it if absent.
    ///
    /// Uses the map's entry API, so concurrent callers for the same channel all
    /// observe the single instance that won.
    pub fn ensure_initialized(&self, channel: &str) -> Arc<ChannelFilters> {
        if let Some(existing) = self.channels.get(channel) {
            return Arc::clone(existing.value());
        }
        self.channels
            .entry(channel.to_string())
            .or_insert_with(|| Arc::new(ChannelFilters::new(channel)))
            .value()
            .clone()
    }

    /// Returns the channel if it was ever initialized.
    #[must_use]
    pub fn get(&self, channel: &str) -> Option<Arc<ChannelFilters>> {
        self.channels.get(channel).map(|entry| Arc::clone(entry.value()))
    }

    #[must_use]
    pub fn contains(&self, channel: &str) -> bool {
        self.channels.contains_key(channel)
    }

    /// All channels, sorted by name for deterministic cross-channel searches.
    #[must_use]
    pub fn channels(&self) -> Vec<Arc<ChannelFilters>> {
        let mut all: Vec<Arc<ChannelFilters>> = self
            .channels
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        all.sort_by(|a, b| a.channel().cmp(b.channel()));
        all
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
