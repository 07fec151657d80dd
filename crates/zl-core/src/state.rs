//! The raw state snapshot the selector graph reads from.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc, Weekday};
use chrono_tz::Tz;

use crate::event::{Group, TimelineEvent, VolatileEvent};
use crate::types::{EventId, GroupId, Interval, TimeScale, ViewportSize};

/// Shared map of committed events.
pub type EventMap = HashMap<EventId, TimelineEvent>;
/// Shared map of explicit groups.
pub type GroupMap = HashMap<GroupId, Group>;
/// Shared map of in-flight drag/resize overlays.
pub type VolatileMap = HashMap<EventId, VolatileEvent>;

/// An immutable value snapshot of everything the engine derives from.
///
/// Maps are `Arc`-shared: replacing the snapshot while leaving a map
/// untouched preserves that map's identity, which is what keeps the
/// memoized subtrees warm. Mutating a map in place while a snapshot is
/// live is a contract violation, not a protected race.
#[derive(Debug, Clone)]
pub struct TimelineState {
    /// Committed events keyed by id.
    pub events: Arc<EventMap>,
    /// Explicitly declared groups keyed by id.
    pub groups: Arc<GroupMap>,
    /// Pending drag/resize ghosts, layered over `events` at read time.
    pub volatile: Arc<VolatileMap>,
    /// Pixel-to-time mapping for the viewport.
    pub time_scale: TimeScale,
    /// Viewport dimensions in pixels.
    pub viewport: ViewportSize,
    /// Timezone calendar ticks are aligned in.
    pub time_zone: Tz,
    /// First day of the week for week-granularity ticks.
    pub week_starts_on: Weekday,
}

impl TimelineState {
    /// Creates an empty snapshot around the given time scale.
    #[must_use]
    pub fn new(time_scale: TimeScale) -> Self {
        Self {
            events: Arc::new(EventMap::new()),
            groups: Arc::new(GroupMap::new()),
            volatile: Arc::new(VolatileMap::new()),
            time_scale,
            viewport: ViewportSize::default(),
            time_zone: Tz::UTC,
            week_starts_on: Weekday::Mon,
        }
    }

    /// The instant at the right edge of the viewport.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "pixel spans are far below i64 millisecond range"
    )]
    pub fn end_date(&self) -> DateTime<Utc> {
        let span_ms = self.viewport.width * self.time_scale.time_per_pixel;
        self.time_scale.start_date + Duration::milliseconds(span_ms as i64)
    }

    /// The currently visible time window.
    #[must_use]
    pub fn visible_window(&self) -> Interval {
        Interval::new(self.time_scale.start_date, self.end_date())
    }
}
