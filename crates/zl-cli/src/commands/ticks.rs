//! Ticks command: calendar interval generation for a time range.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use zl_core::calendar::{IntervalOptions, generate_intervals};

use crate::config::Config;

/// One generated tick for output.
#[derive(Debug, Serialize)]
pub struct Tick {
    /// Bucket start (UTC).
    pub start: DateTime<Utc>,
    /// Bucket end (UTC).
    pub end: DateTime<Utc>,
    /// Bucket length in milliseconds; varies across DST days and
    /// calendar months.
    pub length_ms: i64,
}

/// Parses an RFC 3339 timestamp, or a naive one read as UTC.
fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(instant) = raw.parse::<DateTime<Utc>>() {
        return Ok(instant);
    }
    raw.parse::<NaiveDateTime>()
        .map(|naive| naive.and_utc())
        .with_context(|| format!("unparseable timestamp: {raw}"))
}

/// Computes the ticks a `zl ticks` invocation asks for.
pub fn compute_ticks(
    granularity: &str,
    from: &str,
    to: &str,
    zone: Option<&str>,
    week_start: Option<&str>,
    config: &Config,
) -> Result<Vec<Tick>> {
    let granularity = granularity
        .parse()
        .with_context(|| format!("unknown granularity: {granularity}"))?;
    let from = parse_instant(from)?;
    let to = parse_instant(to)?;

    let time_zone = match zone {
        Some(name) => name
            .parse()
            .ok()
            .with_context(|| format!("unknown timezone: {name}"))?,
        None => config.parsed_time_zone(),
    };
    let week_starts_on = match week_start {
        Some(day) => day
            .parse()
            .ok()
            .with_context(|| format!("unknown week start: {day}"))?,
        None => config.parsed_week_starts_on(),
    };

    let options = IntervalOptions {
        time_zone,
        week_starts_on,
    };
    let intervals = generate_intervals(granularity, from, to, &options);
    tracing::debug!(
        granularity = %granularity,
        count = intervals.len(),
        zone = %time_zone,
        "ticks generated"
    );

    Ok(intervals
        .into_iter()
        .map(|interval| Tick {
            start: interval.start,
            end: interval.end,
            length_ms: interval.duration().num_milliseconds(),
        })
        .collect())
}

/// Computes and prints ticks as JSON.
pub fn run(
    granularity: &str,
    from: &str,
    to: &str,
    zone: Option<&str>,
    week_start: Option<&str>,
    config: &Config,
) -> Result<()> {
    let ticks = compute_ticks(granularity, from, to, zone, week_start, config)?;
    println!("{}", serde_json::to_string_pretty(&ticks)?);
    Ok(())
}
