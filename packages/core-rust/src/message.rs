//! Routable application message: a body plus a side-channel header map.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::Value;

/// Header under which the router preserves the original body of a message
/// that matched no filter.
pub const ORIGINAL_BODY_HEADER: &str = "originalBody";

/// A message travelling through the router.
///
/// The router reads the body only through predicates. It writes to the message
/// in exactly one case: when nothing matches, the body is swapped for a
/// diagnostic text and the original body is parked under
/// [`ORIGINAL_BODY_HEADER`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Application payload.
    #[serde(default)]
    pub body: Value,
    /// Side-channel headers.
    #[serde(default)]
    pub headers: BTreeMap<String, Value>,
}

impl Message {
    /// Creates a message with the given body and no headers.
    #[must_use]
    pub fn new(body: impl Into<Value>) -> Self {
        Self {
            body: body.into(),
            headers: BTreeMap::new(),
        }
    }

    /// Builder-style header setter.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_header(key, value);
        self
    }

    #[must_use]
    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<Value>) {
        self.body = body.into();
    }

    /// Replaces the body with `Value::Null` and returns the previous one.
    pub fn take_body(&mut self) -> Value {
        std::mem::take(&mut self.body)
    }

    #[must_use]
    pub fn header(&self, key: &str) -> Option<&Value> {
        self.headers.get(key)
    }

    /// Sets a header, returning the previous value if one was present.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.headers.insert(key.into(), value.into())
    }

    /// The body preserved by an unmatched routing pass, if any.
    #[must_use]
    pub fn original_body(&self) -> Option<&Value> {
        self.header(ORIGINAL_BODY_HEADER)
    }
}
