//! The memoized selector graph over a [`TimelineState`] snapshot.
//!
//! Each method evaluates its dependencies first, then feeds their
//! outputs (by identity) into its own [`MemoCell`]. Reads are lazy and
//! pull-based: only the chain reaching the requested quantity runs, and
//! only the cells whose inputs changed recompute. A `DerivedState` owns
//! its policy, so distinct policy instances get independent caches.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use chrono::{DateTime, Weekday};
use chrono_tz::Tz;

use crate::calendar::{self, Granularity, IntervalOptions};
use crate::layout;
use crate::memo::MemoCell;
use crate::policy::TimelinePolicy;
use crate::state::{EventMap, GroupMap, TimelineState, VolatileMap};
use crate::types::{EventId, GroupId, Interval, Layer, Row};

/// How far the header-interval query range is rounded outward, as a
/// multiple of the granularity's nominal length. Larger values
/// regenerate ticks less often while scrolling at the cost of
/// generating more of them per pass. A tunable, not a contract.
pub const HEADER_ROUNDING_WINDOW: i64 = 10;

type IntervalMap = HashMap<EventId, Interval>;
type GroupIdMap = HashMap<EventId, GroupId>;
type LayerMap = HashMap<EventId, Layer>;
type SelectedMap = HashMap<EventId, bool>;
type RowMap = HashMap<EventId, Row>;
type HeightMap = HashMap<GroupId, u32>;
type HeaderInputs = (i64, i64, Tz, Weekday);

/// The full derived-state computation graph.
pub struct DerivedState<P> {
    pub(crate) policy: P,
    effective: MemoCell<(Arc<EventMap>, Arc<VolatileMap>), EventMap>,
    intervals: MemoCell<Arc<EventMap>, IntervalMap>,
    event_groups: MemoCell<Arc<EventMap>, GroupIdMap>,
    event_layers: MemoCell<Arc<EventMap>, LayerMap>,
    event_selected: MemoCell<Arc<EventMap>, SelectedMap>,
    group_ids: MemoCell<(Arc<GroupIdMap>, Arc<GroupMap>), Vec<GroupId>>,
    group_events: MemoCell<(Arc<Vec<GroupId>>, Arc<GroupIdMap>), HashMap<GroupId, Vec<EventId>>>,
    group_layer_pairs: MemoCell<
        (
            Arc<Vec<GroupId>>,
            Arc<HashMap<GroupId, Vec<EventId>>>,
            Arc<LayerMap>,
        ),
        Vec<(GroupId, Layer)>,
    >,
    batches: MemoCell<
        (
            Arc<EventMap>,
            Arc<Vec<(GroupId, Layer)>>,
            Arc<HashMap<GroupId, Vec<EventId>>>,
            Arc<LayerMap>,
        ),
        Vec<Vec<EventId>>,
    >,
    same_row: MemoCell<Arc<EventMap>, Vec<Vec<EventId>>>,
    rows: MemoCell<(Arc<Vec<Vec<EventId>>>, Arc<IntervalMap>, Arc<Vec<Vec<EventId>>>), RowMap>,
    group_heights: MemoCell<(Arc<HashMap<GroupId, Vec<EventId>>>, Arc<RowMap>), HeightMap>,
    group_offsets: MemoCell<(Arc<Vec<GroupId>>, Arc<HeightMap>), HeightMap>,
    paint_order: MemoCell<(Arc<IntervalMap>, Arc<LayerMap>, Arc<SelectedMap>), Vec<EventId>>,
    event_props: MemoCell<Arc<EventMap>, HashMap<EventId, serde_json::Value>>,
    headers: RefCell<HashMap<Granularity, Rc<MemoCell<HeaderInputs, Vec<Interval>>>>>,
}

impl<P: TimelinePolicy> DerivedState<P> {
    /// Creates an empty graph owned by `policy`.
    pub fn new(policy: P) -> Self {
        Self {
            policy,
            effective: MemoCell::default(),
            intervals: MemoCell::default(),
            event_groups: MemoCell::default(),
            event_layers: MemoCell::default(),
            event_selected: MemoCell::default(),
            group_ids: MemoCell::default(),
            group_events: MemoCell::default(),
            group_layer_pairs: MemoCell::default(),
            batches: MemoCell::default(),
            same_row: MemoCell::default(),
            rows: MemoCell::default(),
            group_heights: MemoCell::default(),
            group_offsets: MemoCell::default(),
            paint_order: MemoCell::default(),
            event_props: MemoCell::default(),
            headers: RefCell::new(HashMap::new()),
        }
    }

    /// Committed events with the volatile overlay applied. Every
    /// downstream stage reads these, never the raw records.
    pub fn effective_events(&self, state: &TimelineState) -> Arc<EventMap> {
        self.effective.get_or_compute(
            (Arc::clone(&state.events), Arc::clone(&state.volatile)),
            |(events, volatile)| {
                events
                    .iter()
                    .map(|(id, event)| {
                        let mut event = event.clone();
                        if let Some(ghost) = volatile.get(id) {
                            if let Some(interval) = ghost.interval {
                                event.interval = interval;
                            }
                            if let Some(group) = &ghost.group {
                                event.group = group.clone();
                            }
                            if let Some(selected) = ghost.selected {
                                event.selected = selected;
                            }
                        }
                        (id.clone(), event)
                    })
                    .collect()
            },
        )
    }

    /// Effective interval per event.
    pub fn event_intervals(&self, state: &TimelineState) -> Arc<IntervalMap> {
        let effective = self.effective_events(state);
        self.intervals.get_or_compute(effective, |events| {
            events
                .iter()
                .map(|(id, event)| (id.clone(), event.interval))
                .collect()
        })
    }

    /// Effective group membership per event.
    pub fn event_groups(&self, state: &TimelineState) -> Arc<GroupIdMap> {
        let effective = self.effective_events(state);
        self.event_groups.get_or_compute(effective, |events| {
            events
                .iter()
                .map(|(id, event)| (id.clone(), event.group.clone()))
                .collect()
        })
    }

    /// Layer per event, from the policy's per-event hook.
    pub fn event_layers(&self, state: &TimelineState) -> Arc<LayerMap> {
        let effective = self.effective_events(state);
        self.event_layers.get_or_compute(effective, |events| {
            events
                .iter()
                .map(|(id, event)| (id.clone(), self.policy.map_event_to_layer(event)))
                .collect()
        })
    }

    /// Effective selection flag per event.
    pub fn event_selected(&self, state: &TimelineState) -> Arc<SelectedMap> {
        let effective = self.effective_events(state);
        self.event_selected.get_or_compute(effective, |events| {
            events
                .iter()
                .map(|(id, event)| (id.clone(), event.selected))
                .collect()
        })
    }

    /// Union of explicit and event-referenced group ids, in policy order.
    pub fn group_ids(&self, state: &TimelineState) -> Arc<Vec<GroupId>> {
        let event_groups = self.event_groups(state);
        self.group_ids.get_or_compute(
            (event_groups, Arc::clone(&state.groups)),
            |(event_groups, groups)| {
                let mut ids: Vec<GroupId> = event_groups
                    .values()
                    .chain(groups.keys())
                    .cloned()
                    .collect();
                ids.sort();
                ids.dedup();
                self.policy.order_groups(ids)
            },
        )
    }

    /// Event ids per group, members sorted by id for determinism.
    pub fn group_events(&self, state: &TimelineState) -> Arc<HashMap<GroupId, Vec<EventId>>> {
        let group_ids = self.group_ids(state);
        let event_groups = self.event_groups(state);
        self.group_events
            .get_or_compute((group_ids, event_groups), |(group_ids, event_groups)| {
                let mut map: HashMap<GroupId, Vec<EventId>> = group_ids
                    .iter()
                    .map(|gid| (gid.clone(), Vec::new()))
                    .collect();
                for (eid, gid) in event_groups.iter() {
                    if let Some(members) = map.get_mut(gid) {
                        members.push(eid.clone());
                    }
                }
                for members in map.values_mut() {
                    members.sort();
                }
                map
            })
    }

    /// Distinct `(group, layer)` pairs: group order first, then layer
    /// first-seen order within the group.
    pub fn group_layer_pairs(&self, state: &TimelineState) -> Arc<Vec<(GroupId, Layer)>> {
        let group_ids = self.group_ids(state);
        let group_events = self.group_events(state);
        let layers = self.event_layers(state);
        self.group_layer_pairs.get_or_compute(
            (group_ids, group_events, layers),
            |(group_ids, group_events, layers)| {
                let mut pairs: Vec<(GroupId, Layer)> = Vec::new();
                for gid in group_ids.iter() {
                    for eid in group_events.get(gid).map_or(&[][..], Vec::as_slice) {
                        let layer = layers.get(eid).copied().unwrap_or(0);
                        if !pairs.iter().any(|(g, l)| g == gid && *l == layer) {
                            pairs.push((gid.clone(), layer));
                        }
                    }
                }
                pairs
            },
        )
    }

    /// Per-batch event ids in positioning order.
    pub fn positioning_batches(&self, state: &TimelineState) -> Arc<Vec<Vec<EventId>>> {
        let effective = self.effective_events(state);
        let pairs = self.group_layer_pairs(state);
        let group_events = self.group_events(state);
        let layers = self.event_layers(state);
        self.batches.get_or_compute(
            (effective, pairs, group_events, layers),
            |(effective, pairs, group_events, layers)| {
                pairs
                    .iter()
                    .map(|(gid, layer)| {
                        let members: EventMap = group_events
                            .get(gid)
                            .map_or(&[][..], Vec::as_slice)
                            .iter()
                            .filter(|eid| layers.get(*eid).copied().unwrap_or(0) == *layer)
                            .filter_map(|eid| {
                                effective.get(eid).map(|event| (eid.clone(), event.clone()))
                            })
                            .collect();
                        self.policy.order_events_for_positioning(&members)
                    })
                    .collect()
            },
        )
    }

    /// Same-row override sets, computed from committed events so a
    /// pairing does not flicker while one member is mid-drag.
    pub fn same_row_groups(&self, state: &TimelineState) -> Arc<Vec<Vec<EventId>>> {
        self.same_row
            .get_or_compute(Arc::clone(&state.events), |events| {
                self.policy.display_events_in_same_row(events)
            })
    }

    /// Collision-free row per event, packed batch by batch.
    pub fn event_rows(&self, state: &TimelineState) -> Arc<RowMap> {
        let batches = self.positioning_batches(state);
        let intervals = self.event_intervals(state);
        let same_row = self.same_row_groups(state);
        self.rows.get_or_compute(
            (batches, intervals, same_row),
            |(batches, intervals, same_row)| {
                let mut rows = RowMap::new();
                for batch in batches.iter() {
                    rows.extend(layout::distribute_rows(batch, intervals, same_row));
                }
                rows
            },
        )
    }

    /// Rows needed per group: `1 + max(row)`, zero when empty.
    pub fn group_heights(&self, state: &TimelineState) -> Arc<HeightMap> {
        let group_events = self.group_events(state);
        let rows = self.event_rows(state);
        self.group_heights
            .get_or_compute((group_events, rows), |(group_events, rows)| {
                group_events
                    .iter()
                    .map(|(gid, members)| {
                        let height = members
                            .iter()
                            .filter_map(|eid| rows.get(eid))
                            .max()
                            .map_or(0, |max_row| max_row + 1);
                        (gid.clone(), height)
                    })
                    .collect()
            })
    }

    /// Vertical offset per group: prefix sums of heights in group order.
    pub fn group_offsets(&self, state: &TimelineState) -> Arc<HeightMap> {
        let group_ids = self.group_ids(state);
        let heights = self.group_heights(state);
        self.group_offsets
            .get_or_compute((group_ids, heights), |(group_ids, heights)| {
                let mut offsets = HeightMap::new();
                let mut running = 0u32;
                for gid in group_ids.iter() {
                    offsets.insert(gid.clone(), running);
                    running += heights.get(gid).copied().unwrap_or(0);
                }
                offsets
            })
    }

    /// Event ids in painting order: by layer, unselected before
    /// selected (selected paint on top), then start, then id.
    pub fn paint_order(&self, state: &TimelineState) -> Arc<Vec<EventId>> {
        let intervals = self.event_intervals(state);
        let layers = self.event_layers(state);
        let selected = self.event_selected(state);
        self.paint_order.get_or_compute(
            (intervals, layers, selected),
            |(intervals, layers, selected)| {
                let mut ids: Vec<EventId> = intervals.keys().cloned().collect();
                ids.sort_by(|a, b| {
                    let layer_a = layers.get(a).copied().unwrap_or(0);
                    let layer_b = layers.get(b).copied().unwrap_or(0);
                    let sel_a = selected.get(a).copied().unwrap_or(false);
                    let sel_b = selected.get(b).copied().unwrap_or(false);
                    layer_a
                        .cmp(&layer_b)
                        .then(sel_a.cmp(&sel_b))
                        .then_with(|| {
                            let start_a = intervals.get(a).map(|iv| iv.start);
                            let start_b = intervals.get(b).map(|iv| iv.start);
                            start_a.cmp(&start_b)
                        })
                        .then_with(|| a.cmp(b))
                });
                ids
            },
        )
    }

    /// Rendering props per event, from the policy projection.
    pub fn event_props(&self, state: &TimelineState) -> Arc<HashMap<EventId, serde_json::Value>> {
        let effective = self.effective_events(state);
        self.event_props
            .get_or_compute(effective, |events| self.policy.map_events_to_props(events))
    }

    /// Calendar tick intervals for the visible window at `granularity`.
    ///
    /// The query range is the visible window expanded to twice its
    /// width, then rounded outward to [`HEADER_ROUNDING_WINDOW`]
    /// nominal bucket lengths, so small scrolls reuse the cached run.
    pub fn header_intervals(
        &self,
        state: &TimelineState,
        granularity: Granularity,
    ) -> Arc<Vec<Interval>> {
        let cell = Rc::clone(
            self.headers
                .borrow_mut()
                .entry(granularity)
                .or_default(),
        );

        // Rounding happens before the memo key is formed: scrolls that
        // stay within the rounded range are cache hits.
        let start_ms = state.time_scale.start_date.timestamp_millis();
        let end_ms = state.end_date().timestamp_millis();
        let width = end_ms.saturating_sub(start_ms);
        let from = start_ms.saturating_sub(width / 2);
        let to = end_ms.saturating_add(width / 2);

        let bucket = HEADER_ROUNDING_WINDOW * granularity.characteristic_length_ms();
        let rounded_from = from.div_euclid(bucket) * bucket;
        let rounded_to =
            to.div_euclid(bucket) * bucket + if to.rem_euclid(bucket) == 0 { 0 } else { bucket };

        let inputs: HeaderInputs = (
            rounded_from,
            rounded_to,
            state.time_zone,
            state.week_starts_on,
        );
        cell.get_or_compute(inputs, |&(rounded_from, rounded_to, tz, week_starts_on)| {
            let (Some(from), Some(to)) = (
                DateTime::from_timestamp_millis(rounded_from),
                DateTime::from_timestamp_millis(rounded_to),
            ) else {
                tracing::warn!(granularity = %granularity, "header range out of representable time");
                return Vec::new();
            };

            calendar::generate_intervals(
                granularity,
                from,
                to,
                &IntervalOptions {
                    time_zone: tz,
                    week_starts_on,
                },
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone as _, Utc};

    use crate::event::{TimelineEvent, VolatileEvent};
    use crate::policy::DefaultPolicy;
    use crate::types::{TimeScale, ViewportSize};

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

    fn state_with(events: Vec<TimelineEvent>) -> TimelineState {
        let scale = TimeScale::new(at(0, 0), at(0, 0), 1000.0).unwrap();
        let mut state = TimelineState::new(scale);
        state.viewport = ViewportSize {
            width: 3600.0,
            height: 600.0,
        };
        state.events = Arc::new(
            events
                .into_iter()
                .map(|e| (e.id.clone(), e))
                .collect::<EventMap>(),
        );
        state
    }

    #[test]
    fn overlapping_events_stack_and_group_height_follows() {
        let state = state_with(vec![
            event("a", "g", (10, 0), (11, 0)),
            event("b", "g", (10, 30), (11, 30)),
        ]);
        let derived = DerivedState::new(DefaultPolicy);

        let rows = derived.event_rows(&state);
        assert_eq!(rows[&eid("a")], 0);
        assert_eq!(rows[&eid("b")], 1);

        let heights = derived.group_heights(&state);
        assert_eq!(heights[&gid("g")], 2);
    }

    #[test]
    fn touching_events_share_row_and_height_is_one() {
        let state = state_with(vec![
            event("a", "g", (10, 0), (11, 0)),
            event("b", "g", (11, 0), (12, 0)),
        ]);
        let derived = DerivedState::new(DefaultPolicy);

        let rows = derived.event_rows(&state);
        assert_eq!(rows[&eid("a")], 0);
        assert_eq!(rows[&eid("b")], 0);
        assert_eq!(derived.group_heights(&state)[&gid("g")], 1);
    }

    #[test]
    fn implicit_groups_union_with_explicit_and_sort() {
        let mut state = state_with(vec![event("a", "implicit", (1, 0), (2, 0))]);
        state.groups = Arc::new(
            [(gid("explicit"), crate::event::Group::new(gid("explicit")))]
                .into_iter()
                .collect(),
        );
        let derived = DerivedState::new(DefaultPolicy);

        let ids = derived.group_ids(&state);
        assert_eq!(*ids, vec![gid("explicit"), gid("implicit")]);
    }

    #[test]
    fn empty_group_has_zero_height_and_offsets_accumulate() {
        let mut state = state_with(vec![
            event("a", "b-group", (10, 0), (11, 0)),
            event("b", "b-group", (10, 30), (11, 30)),
            event("c", "c-group", (10, 0), (11, 0)),
        ]);
        state.groups = Arc::new(
            [(gid("a-empty"), crate::event::Group::new(gid("a-empty")))]
                .into_iter()
                .collect(),
        );
        let derived = DerivedState::new(DefaultPolicy);

        let heights = derived.group_heights(&state);
        assert_eq!(heights[&gid("a-empty")], 0);
        assert_eq!(heights[&gid("b-group")], 2);
        assert_eq!(heights[&gid("c-group")], 1);

        let offsets = derived.group_offsets(&state);
        assert_eq!(offsets[&gid("a-empty")], 0);
        assert_eq!(offsets[&gid("b-group")], 0);
        assert_eq!(offsets[&gid("c-group")], 2);
    }

    #[test]
    fn volatile_interval_wins_for_layout() {
        let mut state = state_with(vec![
            event("a", "g", (10, 0), (11, 0)),
            event("b", "g", (12, 0), (13, 0)),
        ]);
        // Drag b over a.
        state.volatile = Arc::new(
            [(
                eid("b"),
                VolatileEvent {
                    interval: Some(Interval::new(at(10, 15), at(11, 15))),
                    ..VolatileEvent::default()
                },
            )]
            .into_iter()
            .collect(),
        );
        let derived = DerivedState::new(DefaultPolicy);

        let rows = derived.event_rows(&state);
        assert_eq!(rows[&eid("a")], 0);
        assert_eq!(rows[&eid("b")], 1);
    }

    #[test]
    fn events_in_different_layers_never_collide() {
        struct LayeredPolicy;
        impl TimelinePolicy for LayeredPolicy {
            fn map_event_to_layer(&self, event: &TimelineEvent) -> Layer {
                i32::from(event.id.as_str().starts_with("upper"))
            }
        }

        let state = state_with(vec![
            event("lower", "g", (10, 0), (11, 0)),
            event("upper", "g", (10, 0), (11, 0)),
        ]);
        let derived = DerivedState::new(LayeredPolicy);

        let rows = derived.event_rows(&state);
        // Same span, but separate layers pack independently.
        assert_eq!(rows[&eid("lower")], 0);
        assert_eq!(rows[&eid("upper")], 0);

        let pairs = derived.group_layer_pairs(&state);
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn same_row_policy_forces_shared_row() {
        struct PairedPolicy;
        impl TimelinePolicy for PairedPolicy {
            fn display_events_in_same_row(&self, _events: &EventMap) -> Vec<Vec<EventId>> {
                vec![vec![eid("a"), eid("b")]]
            }
        }

        let state = state_with(vec![
            event("a", "g", (10, 0), (11, 0)),
            event("b", "g", (10, 30), (11, 30)),
        ]);
        let derived = DerivedState::new(PairedPolicy);

        let rows = derived.event_rows(&state);
        assert_eq!(rows[&eid("a")], rows[&eid("b")]);
        assert_eq!(derived.group_heights(&state)[&gid("g")], 1);
    }

    #[test]
    fn same_row_pair_spanning_groups_packs_each_batch_independently() {
        struct CrossGroupPolicy;
        impl TimelinePolicy for CrossGroupPolicy {
            fn display_events_in_same_row(&self, _events: &EventMap) -> Vec<Vec<EventId>> {
                vec![vec![eid("a"), eid("b")]]
            }
        }

        // a and c overlap within g1; b sits alone in g2 but is paired
        // with a. The pairing must not drag b into g1's packing, nor
        // let g2's packing overwrite a's row.
        let state = state_with(vec![
            event("c", "g1", (10, 0), (11, 0)),
            event("a", "g1", (10, 30), (11, 30)),
            event("b", "g2", (10, 0), (11, 0)),
        ]);
        let derived = DerivedState::new(CrossGroupPolicy);

        let rows = derived.event_rows(&state);
        assert_eq!(rows[&eid("c")], 0);
        assert_eq!(rows[&eid("a")], 1);
        assert_eq!(rows[&eid("b")], 0);
        assert_ne!(rows[&eid("a")], rows[&eid("c")]);
    }

    #[test]
    fn paint_order_puts_selected_last_within_layer() {
        let mut events = vec![
            event("early", "g", (9, 0), (10, 0)),
            event("late", "g", (12, 0), (13, 0)),
        ];
        events[0].selected = true;
        let state = state_with(events);
        let derived = DerivedState::new(DefaultPolicy);

        let order = derived.paint_order(&state);
        // "early" starts first but is selected, so it paints last.
        assert_eq!(*order, vec![eid("late"), eid("early")]);
    }

    #[test]
    fn unchanged_inputs_return_cached_reference() {
        let state = state_with(vec![
            event("a", "g", (10, 0), (11, 0)),
            event("b", "g", (10, 30), (11, 30)),
        ]);
        let derived = DerivedState::new(DefaultPolicy);

        let first = derived.event_rows(&state);
        let second = derived.event_rows(&state);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(derived.rows.compute_count(), 1);
        assert_eq!(derived.effective.compute_count(), 1);
    }

    #[test]
    fn snapshot_replacement_with_shared_subtree_skips_recompute() {
        let state = state_with(vec![event("a", "g", (10, 0), (11, 0))]);
        let derived = DerivedState::new(DefaultPolicy);

        let first = derived.event_rows(&state);

        // New snapshot, same Arcs for events/volatile: layout must not rerun.
        let mut moved = state.clone();
        moved.time_scale = TimeScale::new(at(5, 0), at(0, 0), 500.0).unwrap();
        let second = derived.event_rows(&moved);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(derived.rows.compute_count(), 1);

        // Replacing the event map invalidates the chain.
        let mut changed = moved.clone();
        changed.events = Arc::new(
            [(eid("a"), event("a", "g", (10, 0), (12, 0)))]
                .into_iter()
                .collect::<EventMap>(),
        );
        let third = derived.event_rows(&changed);
        assert!(!Arc::ptr_eq(&second, &third));
        assert_eq!(derived.rows.compute_count(), 2);
    }

    #[test]
    fn repeated_evaluation_is_deterministic() {
        let events = vec![
            event("a", "g1", (10, 0), (11, 0)),
            event("b", "g1", (10, 30), (11, 30)),
            event("c", "g2", (10, 0), (10, 30)),
            event("d", "g2", (10, 0), (12, 0)),
            event("e", "g2", (11, 0), (11, 30)),
        ];
        let run = || {
            let state = state_with(events.clone());
            let derived = DerivedState::new(DefaultPolicy);
            (
                derived.event_rows(&state).as_ref().clone(),
                derived.group_ids(&state).as_ref().clone(),
                derived.paint_order(&state).as_ref().clone(),
                derived.group_offsets(&state).as_ref().clone(),
            )
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn header_intervals_cache_absorbs_small_scrolls() {
        let state = state_with(Vec::new());
        let derived = DerivedState::new(DefaultPolicy);

        let first = derived.header_intervals(&state, Granularity::Hour);
        assert!(!first.is_empty());
        for pair in first.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }

        // Scroll by one minute: rounded query range is unchanged.
        let mut scrolled = state.clone();
        scrolled.time_scale.start_date += chrono::Duration::minutes(1);
        let second = derived.header_intervals(&scrolled, Granularity::Hour);
        assert!(Arc::ptr_eq(&first, &second));

        // A different granularity uses its own cell.
        let days = derived.header_intervals(&state, Granularity::Day);
        assert!(!days.is_empty());
    }

    #[test]
    fn header_intervals_cover_padded_window() {
        let state = state_with(Vec::new());
        let derived = DerivedState::new(DefaultPolicy);

        let intervals = derived.header_intervals(&state, Granularity::Minute);
        let window = state.visible_window();
        assert!(intervals[0].start <= window.start);
        assert!(intervals.last().unwrap().end >= window.end);
    }

    #[test]
    fn dangling_volatile_entry_is_ignored() {
        let mut state = state_with(vec![event("a", "g", (10, 0), (11, 0))]);
        state.volatile = Arc::new(
            [(
                eid("ghost"),
                VolatileEvent {
                    selected: Some(true),
                    ..VolatileEvent::default()
                },
            )]
            .into_iter()
            .collect(),
        );
        let derived = DerivedState::new(DefaultPolicy);

        let effective = derived.effective_events(&state);
        assert_eq!(effective.len(), 1);
        assert!(effective.contains_key(&eid("a")));
    }
}
