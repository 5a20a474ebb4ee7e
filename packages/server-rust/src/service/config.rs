/// How many matching filters contribute recipients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecipientMode {
    /// Stop at the first matching filter.
    #[default]
    FirstMatch,
    /// Every matching filter contributes, in evaluation order.
    AllMatch,
}

impl RecipientMode {
    #[must_use]
    pub fn first_match_only(self) -> bool {
        matches!(self, RecipientMode::FirstMatch)
    }
}

/// How a routed message is handed to its recipients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchOptions {
    /// Deliver to all recipients concurrently instead of one after another.
    pub parallel_processing: bool,
    /// Abort on the first failed delivery and fail the operation.
    pub stop_on_exception: bool,
}

/// Router-level configuration for the operation pipeline.
///
/// Controls matching mode, dropped-message logging, operation timeouts,
/// concurrency limits and multicast delivery.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub recipient_mode: RecipientMode,
    /// Log dropped messages at WARN rather than DEBUG.
    pub warn_dropped_message: bool,
    /// Default timeout for operations in milliseconds.
    pub default_operation_timeout_ms: u64,
    /// Maximum number of concurrent operations before load shedding.
    pub max_concurrent_operations: u32,
    pub dispatch: DispatchOptions,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            recipient_mode: RecipientMode::FirstMatch,
            warn_dropped_message: false,
            default_operation_timeout_ms: 30_000,
            max_concurrent_operations: 1000,
            dispatch: DispatchOptions::default(),
        }
    }
}
