//! Wire-compatible message schemas for the router's control channel.
//!
//! All types use named `MsgPack` serialization (`rmp_serde::to_vec_named()`)
//! or JSON with camelCase field names.

pub mod control;

pub use control::{
    ChannelQueryPayload, ControlRequest, ControlResponse, SubscribePayload, UnsubscribePayload,
};
