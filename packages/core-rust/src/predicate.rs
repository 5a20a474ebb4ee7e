//! Message predicates.
//!
//! The router treats predicates as opaque boolean tests supplied by the host.
//! Evaluation must be synchronous and should not block.

use std::fmt;
use std::sync::Arc;

use crate::message::Message;
use crate::types::Value;

/// A boolean test over a message.
pub trait Predicate: Send + Sync {
    /// Returns `true` if the message satisfies this predicate.
    fn matches(&self, message: &Message) -> bool;

    /// Short human-readable label used in filter listings.
    fn describe(&self) -> String {
        "predicate".to_string()
    }
}

impl<F> Predicate for F
where
    F: Fn(&Message) -> bool + Send + Sync,
{
    fn matches(&self, message: &Message) -> bool {
        self(message)
    }
}

impl fmt::Debug for dyn Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Looks up predicates by name.
///
/// Control requests name their predicate instead of carrying one, so the host
/// supplies a resolver that maps those names to live predicates.
pub trait PredicateResolver: Send + Sync {
    /// Returns the predicate registered under `name`, if any.
    fn resolve(&self, name: &str) -> Option<Arc<dyn Predicate>>;
}

/// Matches every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct Always;

impl Predicate for Always {
    fn matches(&self, _message: &Message) -> bool {
        true
    }

    fn describe(&self) -> String {
        "always".to_string()
    }
}

/// Matches no message.
#[derive(Debug, Clone, Copy, Default)]
pub struct Never;

impl Predicate for Never {
    fn matches(&self, _message: &Message) -> bool {
        false
    }

    fn describe(&self) -> String {
        "never".to_string()
    }
}

/// Matches messages whose header `name` equals `value`.
#[derive(Debug, Clone)]
pub struct HeaderEquals {
    name: String,
    value: Value,
}

impl HeaderEquals {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Predicate for HeaderEquals {
    fn matches(&self, message: &Message) -> bool {
        message.header(&self.name) == Some(&self.value)
    }

    fn describe(&self) -> String {
        format!("header({}) == {}", self.name, self.value)
    }
}
