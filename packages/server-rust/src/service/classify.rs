//! Envelope classification: converts inbound `RouterEnvelope`s into typed
//! `Operation` variants.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dynrouter_core::messages::ControlRequest;
use dynrouter_core::{ClockSource, Message, Value};

use super::config::RouterConfig;
use super::operation::{service_names, ClassifyError, Operation, OperationContext};

/// An inbound unit of work before classification.
#[derive(Debug, Clone, PartialEq)]
pub enum RouterEnvelope {
    /// A control-channel request.
    Control(ControlRequest),
    /// An application message published on `channel`.
    Route { channel: String, message: Message },
}

impl RouterEnvelope {
    /// Lifts a plain JSON document into an envelope.
    ///
    /// Documents carrying an `action` field are control requests. Anything
    /// else is a routing message of the form
    /// `{"channel": "...", "body": <any>, "headers": {"name": <any>}}`.
    ///
    /// # Errors
    ///
    /// [`ClassifyError::Malformed`] for an invalid control request or a
    /// non-object `headers`; [`ClassifyError::MissingChannel`] for a routing
    /// message without a channel.
    pub fn from_json(json: serde_json::Value) -> Result<Self, ClassifyError> {
        if json.get("action").is_some() {
            return Ok(RouterEnvelope::Control(serde_json::from_value(json)?));
        }

        let serde_json::Value::Object(mut fields) = json else {
            return Err(ClassifyError::MissingChannel);
        };
        let channel = match fields.remove("channel") {
            Some(serde_json::Value::String(channel)) => channel,
            _ => return Err(ClassifyError::MissingChannel),
        };
        let body = fields.remove("body").map_or(Value::Null, Value::from);
        let headers: BTreeMap<String, serde_json::Value> = match fields.remove("headers") {
            Some(headers) => serde_json::from_value(headers)?,
            None => BTreeMap::new(),
        };

        let mut message = Message::new(body);
        for (name, value) in headers {
            message.set_header(name, Value::from(value));
        }
        Ok(RouterEnvelope::Route { channel, message })
    }
}

// ---------------------------------------------------------------------------
// OperationService
// ---------------------------------------------------------------------------

/// Classifies inbound envelopes into typed `Operation` variants.
///
/// Each call stamps the current clock time and a unique call ID.
pub struct OperationService {
    clock: Arc<dyn ClockSource>,
    config: Arc<RouterConfig>,
    call_id_counter: AtomicU64,
}

impl OperationService {
    /// Create a new `OperationService`.
    #[must_use]
    pub fn new(clock: Arc<dyn ClockSource>, config: Arc<RouterConfig>) -> Self {
        Self {
            clock,
            config,
            call_id_counter: AtomicU64::new(1),
        }
    }

    /// Generate a unique call ID for each operation.
    fn next_call_id(&self) -> u64 {
        self.call_id_counter.fetch_add(1, Ordering::Relaxed)
    }

    fn make_ctx(&self, service_name: &'static str) -> OperationContext {
        OperationContext::new(
            self.next_call_id(),
            service_name,
            self.clock.now(),
            self.config.default_operation_timeout_ms,
        )
    }

    /// Classify an envelope into an `Operation`.
    ///
    /// # Errors
    ///
    /// [`ClassifyError::MissingChannel`] for a routing message with an empty
    /// channel name.
    pub fn classify(&self, envelope: RouterEnvelope) -> Result<Operation, ClassifyError> {
        match envelope {
            RouterEnvelope::Control(request) => Ok(Operation::Control {
                ctx: self.make_ctx(service_names::CONTROL),
                request,
            }),
            RouterEnvelope::Route { channel, .. } if channel.is_empty() => {
                Err(ClassifyError::MissingChannel)
            }
            RouterEnvelope::Route { channel, message } => Ok(Operation::Route {
                ctx: self.make_ctx(service_names::ROUTING),
                channel,
                message: Box::new(message),
            }),
        }
    }

    /// Lift a JSON document and classify it.
    ///
    /// # Errors
    ///
    /// See [`RouterEnvelope::from_json`] and [`OperationService::classify`].
    pub fn classify_json(&self, json: serde_json::Value) -> Result<Operation, ClassifyError> {
        self.classify(RouterEnvelope::from_json(json)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
