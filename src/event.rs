//! Pipeline event types consumed by the destination plugin.
//!
//! These mirror the wire shape of Segment identify/track payloads. The plugin never stores them:
//! each event is consumed, forwarded as a side effect, and handed back to the pipeline unchanged.

use serde::{Deserialize, Serialize};

/// A map of free-form event properties (or identify traits).
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// An identify call from the host pipeline, associating the current user with an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyEvent {
    /// Known user id, if the user has been identified.
    pub user_id: Option<String>,
    /// Anonymous id assigned by the pipeline before identification.
    pub anonymous_id: Option<String>,
    /// User traits attached to the identify call.
    pub traits: Option<Properties>,
}

/// A track call from the host pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEvent {
    /// Event name, e.g. `"Purchase"`.
    pub event: String,
    /// Known user id, if any.
    pub user_id: Option<String>,
    /// Anonymous id assigned by the pipeline.
    pub anonymous_id: Option<String>,
    /// Event properties.
    pub properties: Option<Properties>,
}

impl TrackEvent {
    /// Create a track event with the given name and no ids or properties.
    pub fn new(event: impl Into<String>) -> TrackEvent {
        TrackEvent {
            event: event.into(),
            user_id: None,
            anonymous_id: None,
            properties: None,
        }
    }
}
