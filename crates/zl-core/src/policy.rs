//! The pluggable business-logic contract.
//!
//! The engine never decides domain questions itself; it calls these
//! capabilities to order groups, order events for packing, assign
//! layers, force shared rows, and validate interactive manipulation.
//! Every method must be a pure, total function of its arguments — the
//! memoization layer assumes it and cannot detect a violation.

use std::collections::HashMap;
use std::sync::Arc;

use crate::event::TimelineEvent;
use crate::state::{EventMap, GroupMap};
use crate::types::{EventId, GroupId, Interval, Layer};

/// Input to the drag/resize validation hooks.
#[derive(Debug, Clone)]
pub struct ValidationInput {
    /// The event under the pointer.
    pub manipulated: EventId,
    /// Proposed intervals, usually just for the manipulated event but a
    /// policy may move linked events along.
    pub new_intervals: HashMap<EventId, Interval>,
    /// The committed events the proposal applies to.
    pub events: Arc<EventMap>,
}

/// A partial replacement of the raw maps returned by a validation hook.
///
/// `None` means "leave as is"; a populated field replaces the
/// corresponding map wholesale.
#[derive(Debug, Clone, Default)]
pub struct PolicyUpdate {
    /// Replacement event map, when the policy wants one.
    pub events: Option<EventMap>,
}

impl PolicyUpdate {
    /// Accepts the proposal unchanged: applies every proposed interval
    /// on top of the committed events.
    #[must_use]
    pub fn accepting(input: &ValidationInput) -> Self {
        let events = input
            .events
            .iter()
            .map(|(id, event)| {
                let mut event = event.clone();
                if let Some(&interval) = input.new_intervals.get(id) {
                    event.interval = interval;
                }
                (id.clone(), event)
            })
            .collect();
        Self {
            events: Some(events),
        }
    }
}

/// Capability set the engine calls into; implement on a caller-owned
/// value and hand it to [`crate::facade::Timeline`]. Defaults give a
/// plain timeline: lexicographic groups, start-ordered packing, one
/// layer, no shared rows, accept-all validation.
pub trait TimelinePolicy {
    /// Final display order of group ids.
    fn order_groups(&self, mut ids: Vec<GroupId>) -> Vec<GroupId> {
        ids.sort();
        ids
    }

    /// Processing order for row packing within one batch. The order is
    /// part of the layout contract; ties must break deterministically.
    fn order_events_for_positioning(&self, events: &EventMap) -> Vec<EventId> {
        let mut ordered: Vec<&TimelineEvent> = events.values().collect();
        ordered.sort_by(|a, b| {
            a.interval
                .start
                .cmp(&b.interval.start)
                .then_with(|| a.id.cmp(&b.id))
        });
        ordered.into_iter().map(|event| event.id.clone()).collect()
    }

    /// Vertical sub-stack within the event's group.
    fn map_event_to_layer(&self, _event: &TimelineEvent) -> Layer {
        0
    }

    /// Sets of event ids forced to share one packing row.
    fn display_events_in_same_row(&self, _events: &EventMap) -> Vec<Vec<EventId>> {
        Vec::new()
    }

    /// Rendering-only projection of events; never affects layout.
    fn map_events_to_props(&self, events: &EventMap) -> HashMap<EventId, serde_json::Value> {
        events
            .iter()
            .map(|(id, event)| (id.clone(), event.payload.clone()))
            .collect()
    }

    /// Reconciles an incoming event map with the current one when the
    /// caller replaces raw events.
    fn merge_new_events(&self, _current: &EventMap, incoming: EventMap) -> EventMap {
        incoming
    }

    /// Reconciles an incoming group map with the current one.
    fn merge_new_groups(&self, _current: &GroupMap, incoming: GroupMap) -> GroupMap {
        incoming
    }

    /// Synchronous validation applied to the volatile overlay on every
    /// pointer move during a drag.
    fn validate_during_drag(&self, input: &ValidationInput) -> PolicyUpdate {
        PolicyUpdate::accepting(input)
    }

    /// Synchronous validation applied to the volatile overlay on every
    /// pointer move during a resize.
    fn validate_during_resize(&self, input: &ValidationInput) -> PolicyUpdate {
        PolicyUpdate::accepting(input)
    }

    /// Asynchronous validation awaited by the caller before the drag
    /// result is committed. The engine itself never awaits.
    fn validate_after_drag(
        &self,
        input: &ValidationInput,
    ) -> impl Future<Output = PolicyUpdate> + Send {
        std::future::ready(PolicyUpdate::accepting(input))
    }

    /// Asynchronous validation awaited by the caller before the resize
    /// result is committed.
    fn validate_after_resize(
        &self,
        input: &ValidationInput,
    ) -> impl Future<Output = PolicyUpdate> + Send {
        std::future::ready(PolicyUpdate::accepting(input))
    }
}

/// The no-frills policy: every contract method at its default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicy;

impl TimelinePolicy for DefaultPolicy {}
