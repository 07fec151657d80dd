//! The JSON state-snapshot format `zl layout` consumes.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use zl_core::{DefaultPolicy, Group, TimeScale, Timeline, TimelineEvent, ViewportSize};

use crate::config::Config;

/// A timeline state snapshot as stored on disk.
#[derive(Debug, Deserialize)]
pub struct StateFile {
    /// Committed events.
    pub events: Vec<TimelineEvent>,
    /// Explicitly declared groups; events may reference others.
    #[serde(default)]
    pub groups: Vec<Group>,
    /// Pixel-to-time mapping.
    pub time_scale: TimeScale,
    /// Viewport dimensions.
    #[serde(default)]
    pub viewport: ViewportSize,
    /// Snapshot-level timezone override.
    #[serde(default)]
    pub time_zone: Option<String>,
    /// Snapshot-level week start override.
    #[serde(default)]
    pub week_starts_on: Option<String>,
}

impl StateFile {
    /// Reads and parses a snapshot file.
    pub fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read state file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse state file {}", path.display()))
    }

    /// Builds a timeline from the snapshot, with config-level defaults
    /// filling in what the file leaves out.
    pub fn into_timeline(self, config: &Config) -> Result<Timeline<DefaultPolicy>> {
        let time_scale = TimeScale::new(
            self.time_scale.start_date,
            self.time_scale.date_zero,
            self.time_scale.time_per_pixel,
        )
        .context("invalid time scale in state file")?;

        let mut timeline = Timeline::new(DefaultPolicy, time_scale);
        timeline.set_viewport(self.viewport);

        let zone = match &self.time_zone {
            Some(name) => name
                .parse()
                .ok()
                .with_context(|| format!("unknown timezone in state file: {name}"))?,
            None => config.parsed_time_zone(),
        };
        timeline.set_time_zone(zone);

        let week_start = match &self.week_starts_on {
            Some(day) => day
                .parse()
                .ok()
                .with_context(|| format!("unknown week start in state file: {day}"))?,
            None => config.parsed_week_starts_on(),
        };
        timeline.set_week_starts_on(week_start);

        timeline.set_group_list(self.groups);
        timeline.set_event_list(self.events);
        Ok(timeline)
    }
}
