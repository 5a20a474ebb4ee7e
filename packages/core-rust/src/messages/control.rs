//! Control-channel payloads: subscription management requests and their replies.
//!
//! All structs use `#[serde(rename_all = "camelCase")]`; requests are tagged by
//! an `action` field and responses by a `type` field. Both encode to named
//! `MsgPack` via `rmp_serde::to_vec_named()` and to JSON via `serde_json`.

use serde::{Deserialize, Serialize};

use crate::filter::FilterSummary;
use crate::statistics::StatisticsSnapshot;

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Payload for `subscribe` and `update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribePayload {
    /// Filter id, unique within the channel.
    pub subscription_id: String,
    /// Channel the filter belongs to.
    pub subscribe_channel: String,
    /// Lower value is evaluated first.
    #[serde(default)]
    pub priority: i32,
    /// Where matching messages go.
    pub destination_uri: String,
    /// Name the host's predicate resolver knows the predicate by.
    pub predicate_name: String,
}

/// Payload for `unsubscribe`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribePayload {
    pub subscription_id: String,
    /// Absent or empty searches every channel for the id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribe_channel: Option<String>,
}

/// Payload for the read-only `list` and `statistics` actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelQueryPayload {
    pub channel: String,
}

// ---------------------------------------------------------------------------
// ControlRequest
// ---------------------------------------------------------------------------

/// A subscription-management request arriving on the control channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ControlRequest {
    /// Add a new filter; rejected if the id is already present.
    Subscribe(SubscribePayload),
    /// Replace an existing filter by id; rejected if the id is absent.
    Update(SubscribePayload),
    /// Remove a filter from the active set.
    Unsubscribe(UnsubscribePayload),
    /// List the active filters of a channel in evaluation order.
    List(ChannelQueryPayload),
    /// List the statistics log of a channel.
    Statistics(ChannelQueryPayload),
}

impl ControlRequest {
    /// Wire name of the action, as used in the `action` tag.
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            ControlRequest::Subscribe(_) => "subscribe",
            ControlRequest::Update(_) => "update",
            ControlRequest::Unsubscribe(_) => "unsubscribe",
            ControlRequest::List(_) => "list",
            ControlRequest::Statistics(_) => "statistics",
        }
    }

    /// The channel this request targets, if it names one.
    #[must_use]
    pub fn channel(&self) -> Option<&str> {
        match self {
            ControlRequest::Subscribe(p) | ControlRequest::Update(p) => {
                Some(p.subscribe_channel.as_str())
            }
            ControlRequest::Unsubscribe(p) => p
                .subscribe_channel
                .as_deref()
                .filter(|channel| !channel.is_empty()),
            ControlRequest::List(p) | ControlRequest::Statistics(p) => Some(p.channel.as_str()),
        }
    }

    /// Encodes to named `MsgPack`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_msgpack(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec_named(self)
    }

    /// Decodes from `MsgPack`.
    ///
    /// # Errors
    ///
    /// Returns an error if `bytes` is not a valid encoded request.
    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, rmp_serde::decode::Error> {
        rmp_serde::from_slice(bytes)
    }
}

// ---------------------------------------------------------------------------
// ControlResponse
// ---------------------------------------------------------------------------

/// Reply to a successful [`ControlRequest`]. Failures travel as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControlResponse {
    /// A subscribe or update was applied.
    #[serde(rename_all = "camelCase")]
    Subscribed { filter_id: String, updated: bool },
    /// `removed` is false when the filter vanished between lookup and removal.
    #[serde(rename_all = "camelCase")]
    Unsubscribed { filter_id: String, removed: bool },
    Filters {
        channel: String,
        filters: Vec<FilterSummary>,
    },
    Statistics {
        channel: String,
        statistics: Vec<StatisticsSnapshot>,
    },
}

impl ControlResponse {
    /// Encodes to named `MsgPack`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_msgpack(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec_named(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscribe() -> ControlRequest {
        ControlRequest::Subscribe(SubscribePayload {
            subscription_id: "f1".to_string(),
            subscribe_channel: "orders".to_string(),
            priority: 10,
            destination_uri: "queue:q1".to_string(),
            predicate_name: "always".to_string(),
        })
    }

    #[test]
    fn request_roundtrips_through_named_msgpack() {
        let request = subscribe();
        let bytes = request.to_msgpack().expect("serialize subscribe");
        let decoded = ControlRequest::from_msgpack(&bytes).expect("deserialize subscribe");
        assert_eq!(decoded, request);
    }

    #[test]
    fn request_json_uses_action_tag_and_camel_case() {
        let json = serde_json::to_value(subscribe()).expect("serialize");
        assert_eq!(json["action"], "subscribe");
        assert_eq!(json["subscriptionId"], "f1");
        assert_eq!(json["subscribeChannel"], "orders");
        assert_eq!(json["destinationUri"], "queue:q1");
        assert_eq!(json["predicateName"], "always");
    }

    #[test]
    fn unsubscribe_channel_is_optional() {
        let request: ControlRequest =
            serde_json::from_str(r#"{"action":"unsubscribe","subscriptionId":"f2"}"#)
                .expect("deserialize unsubscribe");
        assert_eq!(request.action(), "unsubscribe");
        assert_eq!(request.channel(), None);

        let request: ControlRequest = serde_json::from_str(
            r#"{"action":"unsubscribe","subscriptionId":"f2","subscribeChannel":""}"#,
        )
        .expect("deserialize unsubscribe with empty channel");
        assert_eq!(request.channel(), None);
    }

    #[test]
    fn priority_defaults_to_zero() {
        let request: ControlRequest = serde_json::from_str(
            r#"{"action":"update","subscriptionId":"f1","subscribeChannel":"c",
                "destinationUri":"mock:a","predicateName":"always"}"#,
        )
        .expect("deserialize update");
        let ControlRequest::Update(payload) = request else {
            panic!("expected update");
        };
        assert_eq!(payload.priority, 0);
    }

    #[test]
    fn response_carries_type_tag() {
        let response = ControlResponse::Unsubscribed {
            filter_id: "f1".to_string(),
            removed: true,
        };
        let json = serde_json::to_value(&response).expect("serialize");
        assert_eq!(json["type"], "unsubscribed");
        assert_eq!(json["filterId"], "f1");

        let bytes = response.to_msgpack().expect("serialize");
        let decoded: ControlResponse = rmp_serde::from_slice(&bytes).expect("deserialize");
        assert_eq!(decoded, response);
    }
}
