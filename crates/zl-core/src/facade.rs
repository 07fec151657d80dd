//! The read-only query surface plus the snapshot-replacement entry
//! points callers mutate through.
//!
//! Reads are thin calls into the selector graph; they never mutate the
//! snapshot. Writes replace whole fields of the snapshot (maps stay
//! `Arc`-shared when untouched), so unchanged derived subtrees keep
//! their cached values.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc, Weekday};
use chrono_tz::Tz;

use crate::calendar::Granularity;
use crate::derived::DerivedState;
use crate::event::{Group, TimelineEvent, VolatileEvent};
use crate::policy::{TimelinePolicy, ValidationInput};
use crate::state::{EventMap, GroupMap, TimelineState, VolatileMap};
use crate::types::{EventId, GroupId, Interval, Layer, Row, TimeScale, ViewportSize};

/// A timeline: one raw-state snapshot and the memoized graph over it.
pub struct Timeline<P> {
    state: TimelineState,
    derived: DerivedState<P>,
}

impl<P: TimelinePolicy> Timeline<P> {
    /// Creates an empty timeline driven by `policy`.
    pub fn new(policy: P, time_scale: TimeScale) -> Self {
        Self {
            state: TimelineState::new(time_scale),
            derived: DerivedState::new(policy),
        }
    }

    /// The current raw snapshot.
    pub fn state(&self) -> &TimelineState {
        &self.state
    }

    // ---- read surface ----

    /// Effective (volatile-aware) interval of an event.
    pub fn interval(&self, id: &EventId) -> Option<Interval> {
        self.derived.event_intervals(&self.state).get(id).copied()
    }

    /// Packing row of an event within its (group, layer) batch.
    pub fn row(&self, id: &EventId) -> Option<Row> {
        self.derived.event_rows(&self.state).get(id).copied()
    }

    /// Layer of an event.
    pub fn layer(&self, id: &EventId) -> Option<Layer> {
        self.derived.event_layers(&self.state).get(id).copied()
    }

    /// Effective group membership of an event.
    pub fn group_of(&self, id: &EventId) -> Option<GroupId> {
        self.derived.event_groups(&self.state).get(id).cloned()
    }

    /// Effective selection flag; unknown events are unselected.
    pub fn is_selected(&self, id: &EventId) -> bool {
        self.derived
            .event_selected(&self.state)
            .get(id)
            .copied()
            .unwrap_or(false)
    }

    /// All group ids, explicit and implicit, in display order.
    pub fn group_ids(&self) -> Arc<Vec<GroupId>> {
        self.derived.group_ids(&self.state)
    }

    /// Rows a group needs; zero when the group has no events.
    pub fn group_height(&self, id: &GroupId) -> Option<u32> {
        self.derived.group_heights(&self.state).get(id).copied()
    }

    /// Rows above the group's first row.
    pub fn group_offset(&self, id: &GroupId) -> Option<u32> {
        self.derived.group_offsets(&self.state).get(id).copied()
    }

    /// Event ids in painting order (selected events paint on top).
    pub fn paint_order(&self) -> Arc<Vec<EventId>> {
        self.derived.paint_order(&self.state)
    }

    /// Rendering props per event from the policy projection.
    pub fn event_props(&self) -> Arc<HashMap<EventId, serde_json::Value>> {
        self.derived.event_props(&self.state)
    }

    /// Calendar ticks covering (and padding) the visible window.
    pub fn header_intervals(&self, granularity: Granularity) -> Arc<Vec<Interval>> {
        self.derived.header_intervals(&self.state, granularity)
    }

    /// The instant at the left edge of the viewport.
    pub fn start_date(&self) -> DateTime<Utc> {
        self.state.time_scale.start_date
    }

    /// The instant at the right edge of the viewport.
    pub fn end_date(&self) -> DateTime<Utc> {
        self.state.end_date()
    }

    /// The currently visible time window.
    pub fn visible_window(&self) -> Interval {
        self.state.visible_window()
    }

    // ---- write surface ----

    /// Replaces the committed events, reconciled by the policy's merge
    /// hook.
    pub fn set_events(&mut self, incoming: EventMap) {
        let merged = self.derived.policy.merge_new_events(&self.state.events, incoming);
        self.state.events = Arc::new(merged);
    }

    /// Replaces the explicit groups, reconciled by the policy's merge
    /// hook.
    pub fn set_groups(&mut self, incoming: GroupMap) {
        let merged = self.derived.policy.merge_new_groups(&self.state.groups, incoming);
        self.state.groups = Arc::new(merged);
    }

    /// Convenience wrapper over [`Self::set_events`] for a plain list.
    pub fn set_event_list(&mut self, events: Vec<TimelineEvent>) {
        self.set_events(events.into_iter().map(|e| (e.id.clone(), e)).collect());
    }

    /// Convenience wrapper over [`Self::set_groups`] for a plain list.
    pub fn set_group_list(&mut self, groups: Vec<Group>) {
        self.set_groups(groups.into_iter().map(|g| (g.id.clone(), g)).collect());
    }

    /// Replaces the pixel-to-time mapping.
    pub fn set_time_scale(&mut self, time_scale: TimeScale) {
        self.state.time_scale = time_scale;
    }

    /// Replaces the viewport dimensions.
    pub fn set_viewport(&mut self, viewport: ViewportSize) {
        self.state.viewport = viewport;
    }

    /// Replaces the tick-alignment timezone.
    pub fn set_time_zone(&mut self, time_zone: Tz) {
        self.state.time_zone = time_zone;
    }

    /// Replaces the first day of the week.
    pub fn set_week_starts_on(&mut self, weekday: Weekday) {
        self.state.week_starts_on = weekday;
    }

    /// Marks an event selected via the volatile overlay.
    pub fn select(&mut self, id: &EventId) {
        self.set_selected(id, true);
    }

    /// Marks an event unselected via the volatile overlay.
    pub fn deselect(&mut self, id: &EventId) {
        self.set_selected(id, false);
    }

    fn set_selected(&mut self, id: &EventId, selected: bool) {
        let mut volatile: VolatileMap = (*self.state.volatile).clone();
        volatile.entry(id.clone()).or_default().selected = Some(selected);
        self.state.volatile = Arc::new(volatile);
    }

    /// Applies a pointer-move during a drag: the policy's synchronous
    /// during-drag hook decides what lands in the volatile overlay.
    pub fn update_drag(&mut self, manipulated: EventId, new_intervals: HashMap<EventId, Interval>) {
        let input = self.validation_input(manipulated, new_intervals);
        let update = self.derived.policy.validate_during_drag(&input);
        self.overlay_from_validated(update.events);
    }

    /// Applies a pointer-move during a resize.
    pub fn update_resize(
        &mut self,
        manipulated: EventId,
        new_intervals: HashMap<EventId, Interval>,
    ) {
        let input = self.validation_input(manipulated, new_intervals);
        let update = self.derived.policy.validate_during_resize(&input);
        self.overlay_from_validated(update.events);
    }

    /// Discards in-flight drag/resize ghosts, keeping selection.
    pub fn cancel_interaction(&mut self) {
        self.clear_interaction_overlay();
    }

    /// Finishes a drag: awaits the policy's after-drag validation, then
    /// commits the returned events and clears the ghosts.
    pub async fn commit_drag(
        &mut self,
        manipulated: EventId,
        new_intervals: HashMap<EventId, Interval>,
    ) {
        let input = self.validation_input(manipulated, new_intervals);
        let update = self.derived.policy.validate_after_drag(&input).await;
        self.commit_validated(update.events);
    }

    /// Finishes a resize: awaits the policy's after-resize validation,
    /// then commits the returned events and clears the ghosts.
    pub async fn commit_resize(
        &mut self,
        manipulated: EventId,
        new_intervals: HashMap<EventId, Interval>,
    ) {
        let input = self.validation_input(manipulated, new_intervals);
        let update = self.derived.policy.validate_after_resize(&input).await;
        self.commit_validated(update.events);
    }

    fn validation_input(
        &self,
        manipulated: EventId,
        new_intervals: HashMap<EventId, Interval>,
    ) -> ValidationInput {
        ValidationInput {
            manipulated,
            new_intervals,
            events: Arc::clone(&self.state.events),
        }
    }

    /// Turns a validated event map into interval/group ghosts by
    /// diffing against the committed records. Selection ghosts survive.
    fn overlay_from_validated(&mut self, validated: Option<EventMap>) {
        let Some(validated) = validated else {
            return;
        };
        let mut volatile = VolatileMap::new();
        for (id, ghost) in self.state.volatile.iter() {
            if ghost.selected.is_some() {
                volatile.insert(
                    id.clone(),
                    VolatileEvent {
                        selected: ghost.selected,
                        ..VolatileEvent::default()
                    },
                );
            }
        }
        for (id, event) in &validated {
            let Some(committed) = self.state.events.get(id) else {
                tracing::warn!(event = %id, "policy returned unknown event, ignoring");
                continue;
            };
            let entry = volatile.entry(id.clone()).or_default();
            if event.interval != committed.interval {
                entry.interval = Some(event.interval);
            }
            if event.group != committed.group {
                entry.group = Some(event.group.clone());
            }
        }
        volatile.retain(|_, ghost| !ghost.is_empty());
        self.state.volatile = Arc::new(volatile);
    }

    fn commit_validated(&mut self, validated: Option<EventMap>) {
        if let Some(events) = validated {
            self.state.events = Arc::new(events);
        }
        self.clear_interaction_overlay();
    }

    fn clear_interaction_overlay(&mut self) {
        let mut volatile: VolatileMap = (*self.state.volatile).clone();
        for ghost in volatile.values_mut() {
            ghost.interval = None;
            ghost.group = None;
        }
        volatile.retain(|_, ghost| !ghost.is_empty());
        self.state.volatile = Arc::new(volatile);
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use crate::policy::{DefaultPolicy, PolicyUpdate};

    use super::*;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, 0).unwrap()
    }

    fn eid(s: &str) -> EventId {
        EventId::new(s).unwrap()
    }

    fn gid(s: &str) -> GroupId {
        GroupId::new(s).unwrap()
    }

    fn event(id: &str, group: &str, start: (u32, u32), end: (u32, u32)) -> TimelineEvent {
        TimelineEvent::new(
            eid(id),
            Interval::new(at(start.0, start.1), at(end.0, end.1)),
            gid(group),
        )
    }

    fn timeline() -> Timeline<DefaultPolicy> {
        let scale = TimeScale::new(at(0, 0), at(0, 0), 1000.0).unwrap();
        let mut timeline = Timeline::new(DefaultPolicy, scale);
        timeline.set_viewport(ViewportSize {
            width: 3600.0,
            height: 400.0,
        });
        timeline
    }

    #[test]
    fn read_surface_reflects_raw_state() {
        let mut tl = timeline();
        tl.set_event_list(vec![
            event("a", "g", (10, 0), (11, 0)),
            event("b", "g", (10, 30), (11, 30)),
        ]);

        assert_eq!(tl.row(&eid("a")), Some(0));
        assert_eq!(tl.row(&eid("b")), Some(1));
        assert_eq!(tl.group_height(&gid("g")), Some(2));
        assert_eq!(tl.group_offset(&gid("g")), Some(0));
        assert_eq!(tl.layer(&eid("a")), Some(0));
        assert_eq!(tl.group_of(&eid("a")), Some(gid("g")));
        assert!(!tl.is_selected(&eid("a")));
        assert_eq!(tl.row(&eid("missing")), None);
    }

    #[test]
    fn update_drag_creates_ghost_and_cancel_clears_it() {
        let mut tl = timeline();
        tl.set_event_list(vec![event("a", "g", (10, 0), (11, 0))]);

        let proposed = Interval::new(at(12, 0), at(13, 0));
        tl.update_drag(eid("a"), HashMap::from([(eid("a"), proposed)]));
        assert_eq!(tl.interval(&eid("a")), Some(proposed));
        // Committed record is untouched.
        assert_eq!(
            tl.state().events[&eid("a")].interval,
            Interval::new(at(10, 0), at(11, 0))
        );

        tl.cancel_interaction();
        assert_eq!(tl.interval(&eid("a")), Some(Interval::new(at(10, 0), at(11, 0))));
        assert!(tl.state().volatile.is_empty());
    }

    #[tokio::test]
    async fn commit_drag_replaces_committed_state() {
        let mut tl = timeline();
        tl.set_event_list(vec![event("a", "g", (10, 0), (11, 0))]);

        let proposed = Interval::new(at(12, 0), at(13, 0));
        tl.update_drag(eid("a"), HashMap::from([(eid("a"), proposed)]));
        tl.commit_drag(eid("a"), HashMap::from([(eid("a"), proposed)]))
            .await;

        assert_eq!(tl.state().events[&eid("a")].interval, proposed);
        assert!(tl.state().volatile.is_empty());
        assert_eq!(tl.interval(&eid("a")), Some(proposed));
    }

    #[tokio::test]
    async fn rejecting_policy_keeps_committed_interval() {
        struct Rejecting;
        impl TimelinePolicy for Rejecting {
            fn validate_during_drag(&self, input: &ValidationInput) -> PolicyUpdate {
                // Refuse every proposal: echo the committed events.
                PolicyUpdate {
                    events: Some((*input.events).clone()),
                }
            }
            fn validate_after_drag(
                &self,
                input: &ValidationInput,
            ) -> impl Future<Output = PolicyUpdate> + Send {
                std::future::ready(PolicyUpdate {
                    events: Some((*input.events).clone()),
                })
            }
        }

        let scale = TimeScale::new(at(0, 0), at(0, 0), 1000.0).unwrap();
        let mut tl = Timeline::new(Rejecting, scale);
        tl.set_event_list(vec![event("a", "g", (10, 0), (11, 0))]);

        let original = Interval::new(at(10, 0), at(11, 0));
        let proposed = Interval::new(at(12, 0), at(13, 0));

        tl.update_drag(eid("a"), HashMap::from([(eid("a"), proposed)]));
        assert_eq!(tl.interval(&eid("a")), Some(original));

        tl.commit_drag(eid("a"), HashMap::from([(eid("a"), proposed)]))
            .await;
        assert_eq!(tl.state().events[&eid("a")].interval, original);
    }

    #[test]
    fn selection_survives_drag_and_cancel() {
        let mut tl = timeline();
        tl.set_event_list(vec![event("a", "g", (10, 0), (11, 0))]);

        tl.select(&eid("a"));
        tl.update_drag(
            eid("a"),
            HashMap::from([(eid("a"), Interval::new(at(12, 0), at(13, 0)))]),
        );
        assert!(tl.is_selected(&eid("a")));

        tl.cancel_interaction();
        assert!(tl.is_selected(&eid("a")));

        tl.deselect(&eid("a"));
        assert!(!tl.is_selected(&eid("a")));
    }

    #[test]
    fn merge_hook_controls_event_replacement() {
        struct KeepExisting;
        impl TimelinePolicy for KeepExisting {
            fn merge_new_events(&self, current: &EventMap, incoming: EventMap) -> EventMap {
                let mut merged = current.clone();
                for (id, event) in incoming {
                    merged.entry(id).or_insert(event);
                }
                merged
            }
        }

        let scale = TimeScale::new(at(0, 0), at(0, 0), 1000.0).unwrap();
        let mut tl = Timeline::new(KeepExisting, scale);
        tl.set_event_list(vec![event("a", "g", (10, 0), (11, 0))]);
        // Second replacement may not overwrite the existing record.
        tl.set_event_list(vec![event("a", "g", (12, 0), (13, 0)), event("b", "g", (14, 0), (15, 0))]);

        assert_eq!(
            tl.state().events[&eid("a")].interval,
            Interval::new(at(10, 0), at(11, 0))
        );
        assert!(tl.state().events.contains_key(&eid("b")));
    }

    #[test]
    fn header_intervals_flow_through_facade() {
        let tl = timeline();
        let ticks = tl.header_intervals(Granularity::Hour);
        assert!(!ticks.is_empty());
        assert!(ticks[0].start <= tl.start_date());
        assert!(ticks.last().unwrap().end >= tl.end_date());
    }
}
