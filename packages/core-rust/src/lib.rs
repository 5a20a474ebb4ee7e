//! `dynrouter` Core: prioritized filters, match statistics, routable messages,
//! predicates and control-channel schemas.

pub mod clock;
pub mod filter;
pub mod message;
pub mod messages;
pub mod predicate;
pub mod statistics;
pub mod types;

pub use clock::{ClockSource, ManualClock, SystemClock};
pub use filter::{FilterKey, FilterSummary, PrioritizedFilter};
pub use message::{Message, ORIGINAL_BODY_HEADER};
pub use predicate::{Always, HeaderEquals, Never, Predicate, PredicateResolver};
pub use statistics::{FilterStatistics, StatisticsSnapshot};
pub use types::Value;
