//! Filter registry and matching.
//!
//! - [`channel`]: per-channel ordered filter set with lock-free readers
//! - [`registry`]: concurrent channel name map
//! - [`service`]: subscription management and message matching
//! - [`factory`]: filter construction seam

pub mod channel;
pub mod error;
pub mod factory;
pub mod registry;
pub mod service;

pub use channel::{ChannelFilters, FilterSet};
pub use error::{AddRejected, FilterError};
pub use factory::{DefaultFilterFactory, FilterFactory};
pub use registry::ChannelRegistry;
pub use service::{DropLevel, FilterService, RoutingOutcome, DROP_LOG_CATEGORY};
