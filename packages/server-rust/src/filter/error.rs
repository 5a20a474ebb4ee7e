//! Typed failures of the filter service.

/// Lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("channel not found: {channel}")]
    ChannelNotFound { channel: String },
    /// `channel` is `None` when every channel was searched.
    #[error("filter not found: {filter_id}{}", channel_suffix(.channel.as_deref()))]
    FilterNotFound {
        filter_id: String,
        channel: Option<String>,
    },
}

fn channel_suffix(channel: Option<&str>) -> String {
    channel.map_or_else(String::new, |c| format!(" in channel {c}"))
}

/// Policy violation from `add_filter_for_channel`: adding an id that already
/// exists, or updating one that does not.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "error adding filter {filter_id} to channel {channel}: update = {update}, filter exists = {exists}"
)]
pub struct AddRejected {
    pub filter_id: String,
    pub channel: String,
    /// Whether the caller asked for an update.
    pub update: bool,
    /// Whether a filter with the same id was already active.
    pub exists: bool,
}
