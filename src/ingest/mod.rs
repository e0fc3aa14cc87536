//! Track ingestion: one gateway, several thin transports feeding it.

use serde::Serialize;
use serde_json::Value;

use crate::{
    domain::track::TrackRecord,
    ingest::{
        error::IngestError,
        gateway::{Gateway, IngestAck},
    },
    notify::Origin,
};

pub mod error;
pub mod gateway;
pub mod message;
pub mod normalize;
pub mod socket;

/// Type tag of an incoming add request, on the message channel and the socket.
pub const ADD_MUSIC_TRACK: &str = "ADD_MUSIC_TRACK";
pub const ADD_MUSIC_TRACK_RESPONSE: &str = "ADD_MUSIC_TRACK_RESPONSE";

/// `{type: "ADD_MUSIC_TRACK_RESPONSE", ...ack}`
#[derive(Debug, Serialize)]
pub struct ResponseFrame<'a> {
    #[serde(rename = "type")]
    pub frame_type: &'static str,
    #[serde(flatten)]
    pub ack: &'a IngestAck,
}

impl<'a> ResponseFrame<'a> {
    pub fn new(ack: &'a IngestAck) -> Self {
        Self {
            frame_type: ADD_MUSIC_TRACK_RESPONSE,
            ack,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// the `type` tag of a request, if it has one
pub(crate) fn frame_type(data: &Value) -> Option<&str> {
    data.get("type").and_then(Value::as_str)
}

/// Submits the `track` of an add request, rejecting requests without one.
pub(crate) fn submit_add_request(
    gateway: &Gateway,
    data: &Value,
    origin: Origin,
) -> Result<TrackRecord, IngestError> {
    match data.get("track").filter(|t| !t.is_null()) {
        Some(track) => gateway.submit(track, origin),
        None => gateway.reject(
            origin,
            IngestError::MalformedPayload("request carries no track".into()),
        ),
    }
}
