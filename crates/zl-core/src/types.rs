//! Core type definitions with validation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// The time-per-pixel ratio was zero, negative, or non-finite.
    #[error("time per pixel must be a positive finite number, got {value}")]
    TimePerPixelOutOfRange { value: f64 },
}

/// Vertical stack within a group. Events on different layers never share rows.
pub type Layer = i32;

/// A packing row index within a (group, layer) batch. Non-negative by construction.
pub type Row = u32;

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated event identifier.
    ///
    /// Event IDs must be non-empty strings and unique within a timeline;
    /// uniqueness is enforced by the map keys of the raw state.
    EventId, "event ID"
);

define_string_id!(
    /// A validated group identifier.
    ///
    /// Group IDs must be non-empty strings. A group referenced by an event
    /// but absent from the explicit group set is created implicitly.
    GroupId, "group ID"
);

/// A half-open span of time, `[start, end)`.
///
/// Intervals where `start > end` can transiently exist while a drag or
/// resize is in flight; downstream logic treats them as intersecting
/// nothing rather than rejecting them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    /// Inclusive lower bound.
    pub start: DateTime<Utc>,
    /// Exclusive upper bound.
    pub end: DateTime<Utc>,
}

impl Interval {
    /// Creates an interval without validating `start <= end`.
    #[must_use]
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Returns `true` when `start <= end`.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.start <= self.end
    }

    /// Strict intersection test: intervals that only touch at an endpoint
    /// do not count as overlapping. Malformed intervals intersect nothing.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        if !self.is_well_formed() || !other.is_well_formed() {
            return false;
        }
        self.start < other.end && other.start < self.end
    }

    /// Returns the interval's length, or zero for malformed intervals.
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        (self.end - self.start).max(chrono::Duration::zero())
    }
}

/// The mapping between pixels and time for the visible window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeScale {
    /// The instant displayed at the left edge of the viewport.
    pub start_date: DateTime<Utc>,
    /// Animation-neutral reference instant; positions are expressed
    /// relative to it so zooming does not churn every coordinate.
    pub date_zero: DateTime<Utc>,
    /// Milliseconds of time represented by one horizontal pixel.
    pub time_per_pixel: f64,
}

impl TimeScale {
    /// Creates a time scale after validating `time_per_pixel > 0`.
    pub fn new(
        start_date: DateTime<Utc>,
        date_zero: DateTime<Utc>,
        time_per_pixel: f64,
    ) -> Result<Self, ValidationError> {
        if !time_per_pixel.is_finite() || time_per_pixel <= 0.0 {
            return Err(ValidationError::TimePerPixelOutOfRange {
                value: time_per_pixel,
            });
        }
        Ok(Self {
            start_date,
            date_zero,
            time_per_pixel,
        })
    }
}

/// Viewport dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewportSize {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}
