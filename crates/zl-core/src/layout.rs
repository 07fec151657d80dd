//! Greedy row packing — first-fit interval-graph coloring.
//!
//! Events are processed in the order chosen by the positioning policy,
//! so the ordering is part of the observable layout contract: a
//! different processing order can legally produce a different (still
//! collision-free) row assignment.

use std::collections::HashMap;

use crate::types::{EventId, Interval, Row};

/// Smallest row not occupied by an already-placed event whose interval
/// strictly intersects `interval`. Touching endpoints do not collide.
fn first_free_row(placed: &HashMap<EventId, (Interval, Row)>, interval: Interval) -> Row {
    let mut occupied: Vec<Row> = placed
        .values()
        .filter(|(other, _)| other.intersects(&interval))
        .map(|&(_, row)| row)
        .collect();
    occupied.sort_unstable();
    occupied.dedup();

    let mut row: Row = 0;
    for taken in occupied {
        if taken == row {
            row += 1;
        } else if taken > row {
            break;
        }
    }
    row
}

/// Packs one batch of events into non-overlapping rows.
///
/// `ordered` is the batch in positioning order; `intervals` holds the
/// effective interval per member; `same_row` lists sets of event ids
/// forced onto a shared row. Members of a same-row set that are missing
/// from this batch are ignored — a set may span batches, and each batch
/// packs only its own members against its own occupancy. An event in no
/// set forms its own singleton. Every member of a set lands on the
/// maximum of the rows the members would individually need.
pub fn distribute_rows(
    ordered: &[EventId],
    intervals: &HashMap<EventId, Interval>,
    same_row: &[Vec<EventId>],
) -> HashMap<EventId, Row> {
    let mut placed: HashMap<EventId, (Interval, Row)> = HashMap::new();

    for event_id in ordered {
        if placed.contains_key(event_id) {
            continue;
        }
        let Some(&interval) = intervals.get(event_id) else {
            tracing::warn!(event = %event_id, "no interval for batch member, skipping");
            continue;
        };

        let members: Vec<(EventId, Interval)> = same_row
            .iter()
            .find(|set| set.contains(event_id))
            .map_or_else(
                || vec![(event_id.clone(), interval)],
                |set| {
                    set.iter()
                        .filter(|id| ordered.contains(id))
                        .filter_map(|id| intervals.get(id).map(|&iv| (id.clone(), iv)))
                        .collect()
                },
            );

        let row = members
            .iter()
            .map(|(_, iv)| first_free_row(&placed, *iv))
            .max()
            .unwrap_or(0);

        for (id, iv) in members {
            placed.insert(id, (iv, row));
        }
    }

    placed
        .into_iter()
        .map(|(id, (_, row))| (id, row))
        .collect()
}
