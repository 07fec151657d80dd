//! Timeline events and groups — the externally-owned raw records.

use serde::{Deserialize, Serialize};

use crate::types::{EventId, GroupId, Interval};

/// A scheduled item occupying a span of time within a group.
///
/// Records are replaced wholesale on mutation; nothing in the engine
/// mutates an event in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineEvent {
    /// Unique identifier for this event.
    pub id: EventId,
    /// The committed time span.
    pub interval: Interval,
    /// The group this event belongs to.
    pub group: GroupId,
    /// Whether the event is currently selected.
    #[serde(default)]
    pub selected: bool,
    /// Caller-defined payload, passed through to `map_events_to_props`.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
}

impl TimelineEvent {
    /// Creates an event with no payload.
    #[must_use]
    pub const fn new(id: EventId, interval: Interval, group: GroupId) -> Self {
        Self {
            id,
            interval,
            group,
            selected: false,
            payload: serde_json::Value::Null,
        }
    }
}

/// A horizontal band of the timeline holding related events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Group {
    /// Unique identifier for this group.
    pub id: GroupId,
    /// Caller-defined payload, not interpreted by the engine.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
}

impl Group {
    /// Creates a group with no payload.
    #[must_use]
    pub const fn new(id: GroupId) -> Self {
        Self {
            id,
            payload: serde_json::Value::Null,
        }
    }
}

/// Pending, not-yet-committed values overlaid on an event during an
/// interactive drag or resize. Present fields win over the committed
/// record for every derived computation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolatileEvent {
    /// Ghost interval while the pointer is down.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<Interval>,
    /// Ghost group while dragging across group boundaries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupId>,
    /// Selection toggle pending commit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
}

impl VolatileEvent {
    /// Returns `true` when no field is overridden.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.interval.is_none() && self.group.is_none() && self.selected.is_none()
    }
}
