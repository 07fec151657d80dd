//! Layout command: derived rows, group stacking, and paint order for a
//! state snapshot.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use zl_core::{DefaultPolicy, Timeline};

use crate::config::Config;
use crate::snapshot::StateFile;

/// Derived placement of one event.
#[derive(Debug, Serialize, PartialEq)]
pub struct EventPlacement {
    /// Group the event is displayed in.
    pub group: String,
    /// Layer within the group.
    pub layer: i32,
    /// Packed row within the (group, layer) batch.
    pub row: u32,
}

/// Derived vertical placement of one group.
#[derive(Debug, Serialize, PartialEq)]
pub struct GroupPlacement {
    /// Group id.
    pub id: String,
    /// Rows this group needs.
    pub height: u32,
    /// Rows above this group's first row.
    pub offset: u32,
}

/// Everything `zl layout` reports.
#[derive(Debug, Serialize)]
pub struct LayoutReport {
    /// Placement per event id, sorted for stable output.
    pub events: BTreeMap<String, EventPlacement>,
    /// Groups in display order.
    pub groups: Vec<GroupPlacement>,
    /// Event ids back-to-front.
    pub paint_order: Vec<String>,
}

/// Computes the report for an already-built timeline.
pub fn compute_report(timeline: &Timeline<DefaultPolicy>) -> LayoutReport {
    let mut events = BTreeMap::new();
    for id in timeline.state().events.keys() {
        let placement = EventPlacement {
            group: timeline
                .group_of(id)
                .map(String::from)
                .unwrap_or_default(),
            layer: timeline.layer(id).unwrap_or(0),
            row: timeline.row(id).unwrap_or(0),
        };
        events.insert(id.to_string(), placement);
    }

    let groups = timeline
        .group_ids()
        .iter()
        .map(|gid| GroupPlacement {
            id: gid.to_string(),
            height: timeline.group_height(gid).unwrap_or(0),
            offset: timeline.group_offset(gid).unwrap_or(0),
        })
        .collect();

    let paint_order = timeline
        .paint_order()
        .iter()
        .map(ToString::to_string)
        .collect();

    LayoutReport {
        events,
        groups,
        paint_order,
    }
}

/// Loads a snapshot, computes its layout, and prints it as JSON.
pub fn run(state_path: &Path, config: &Config) -> Result<()> {
    let timeline = StateFile::read(state_path)?.into_timeline(config)?;
    let report = compute_report(&timeline);
    tracing::debug!(
        events = report.events.len(),
        groups = report.groups.len(),
        "layout computed"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
