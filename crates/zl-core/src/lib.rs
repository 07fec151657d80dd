//! Derived-state engine for a zoomable timeline.
//!
//! This crate computes everything a timeline renderer needs that is not
//! pixels: which events overlap, how they pack into rows, how groups
//! stack, and which calendar-aligned ticks label the visible range.
//!
//! - [`memo`]: dependency-tracked cache cells (identity-compared inputs)
//! - [`calendar`]: gap-free, timezone-correct tick generation at eleven
//!   granularities
//! - [`layout`]: first-fit row packing
//! - [`policy`]: the pluggable business-logic contract
//! - [`derived`]: the memoized selector graph tying it together
//! - [`facade`]: the query/mutation surface handed to the renderer
//!
//! Evaluation is single-threaded, synchronous, and pull-based; raw
//! state is replaced wholesale per mutation and treated as an immutable
//! snapshot while read.

pub mod calendar;
pub mod derived;
pub mod event;
pub mod facade;
pub mod layout;
pub mod memo;
pub mod policy;
pub mod state;
pub mod types;

pub use calendar::{Granularity, IntervalOptions, generate_intervals};
pub use derived::DerivedState;
pub use event::{Group, TimelineEvent, VolatileEvent};
pub use facade::Timeline;
pub use policy::{DefaultPolicy, PolicyUpdate, TimelinePolicy, ValidationInput};
pub use state::{EventMap, GroupMap, TimelineState, VolatileMap};
pub use types::{EventId, GroupId, Interval, Layer, Row, TimeScale, ValidationError, ViewportSize};
