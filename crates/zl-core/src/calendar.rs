//! Calendar-aligned interval generation.
//!
//! Eleven granularities, minute through century, each producing a
//! gap-free run of buckets whose boundaries sit on natural calendar
//! marks in the requested timezone. Stepping uses civil-calendar
//! arithmetic rather than fixed millisecond deltas so month-and-coarser
//! buckets respect variable month lengths and day/week buckets survive
//! DST transitions.

use chrono::{
    DateTime, Datelike, Duration, LocalResult, Months, NaiveDate, NaiveDateTime, NaiveTime,
    TimeZone, Timelike, Utc, Weekday,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::types::Interval;

/// Options shared by every interval generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalOptions {
    /// IANA timezone the buckets are aligned in.
    pub time_zone: Tz,
    /// First day of the week for week buckets.
    pub week_starts_on: Weekday,
}

impl Default for IntervalOptions {
    fn default() -> Self {
        Self {
            time_zone: Tz::UTC,
            week_starts_on: Weekday::Mon,
        }
    }
}

/// One of the eleven fixed calendar bucket sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Granularity {
    /// One minute.
    Minute,
    /// Fifteen minutes, anchored at :00/:15/:30/:45.
    QuarterHour,
    /// One hour.
    Hour,
    /// Four hours, anchored at local midnight.
    FourHours,
    /// One local calendar day.
    Day,
    /// Seven days, anchored at the configured week start.
    Week,
    /// One calendar month.
    Month,
    /// Three calendar months, anchored at Jan/Apr/Jul/Oct.
    Quarter,
    /// One calendar year.
    Year,
    /// Ten years, anchored at a multiple-of-ten year.
    Decade,
    /// One hundred years, anchored at a multiple-of-one-hundred year.
    Century,
}

impl Granularity {
    /// All granularities, finest first.
    pub const ALL: [Self; 11] = [
        Self::Minute,
        Self::QuarterHour,
        Self::Hour,
        Self::FourHours,
        Self::Day,
        Self::Week,
        Self::Month,
        Self::Quarter,
        Self::Year,
        Self::Decade,
        Self::Century,
    ];

    /// Nominal bucket length in milliseconds.
    ///
    /// Used only to round query ranges outward; real bucket edges come
    /// from calendar arithmetic and may differ (DST days, 28-31 day
    /// months, leap years).
    #[must_use]
    pub const fn characteristic_length_ms(self) -> i64 {
        const MINUTE: i64 = 60 * 1000;
        const HOUR: i64 = 60 * MINUTE;
        const DAY: i64 = 24 * HOUR;
        match self {
            Self::Minute => MINUTE,
            Self::QuarterHour => 15 * MINUTE,
            Self::Hour => HOUR,
            Self::FourHours => 4 * HOUR,
            Self::Day => DAY,
            Self::Week => 7 * DAY,
            Self::Month => 30 * DAY,
            Self::Quarter => 91 * DAY,
            Self::Year => 365 * DAY,
            Self::Decade => 3650 * DAY,
            Self::Century => 36500 * DAY,
        }
    }

    /// Kebab-case name, matching the serde representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::QuarterHour => "quarter-hour",
            Self::Hour => "hour",
            Self::FourHours => "four-hours",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Quarter => "quarter",
            Self::Year => "year",
            Self::Decade => "decade",
            Self::Century => "century",
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognized granularity names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown granularity: {0}")]
pub struct UnknownGranularity(String);

impl std::str::FromStr for Granularity {
    type Err = UnknownGranularity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| UnknownGranularity(s.to_string()))
    }
}

/// Maps a civil local time to an instant, resolving DST irregularities.
///
/// Ambiguous local times (clocks rolled back) take the earlier instant;
/// skipped local times (clocks rolled forward) advance to the first
/// valid instant after the gap.
fn resolve_local(tz: Tz, local: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            // Gaps are at most a couple of hours in practice; probe
            // forward in quarter-hour steps until the zone resolves.
            let mut probe = local;
            for _ in 0..(24 * 4) {
                probe += Duration::minutes(15);
                if let Some(dt) = tz.from_local_datetime(&probe).earliest() {
                    return dt.with_timezone(&Utc);
                }
            }
            tz.from_utc_datetime(&local).with_timezone(&Utc)
        }
    }
}

/// The instant of local midnight on the day containing `instant`.
fn start_of_day(instant: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    midnight_of(instant.with_timezone(&tz).date_naive(), tz)
}

/// The instant of local midnight on `date`.
fn midnight_of(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    resolve_local(tz, date.and_time(NaiveTime::MIN))
}

/// Truncates to the top of the local minute.
fn start_of_minute(instant: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let local = instant.with_timezone(&tz).naive_local();
    resolve_local(tz, local.with_second(0).and_then(|l| l.with_nanosecond(0)).unwrap_or(local))
}

/// Truncates to the most recent local :00/:15/:30/:45 mark.
fn start_of_quarter_hour(instant: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let local = instant.with_timezone(&tz).naive_local();
    let truncated = local
        .with_minute((local.minute() / 15) * 15)
        .and_then(|l| l.with_second(0))
        .and_then(|l| l.with_nanosecond(0))
        .unwrap_or(local);
    resolve_local(tz, truncated)
}

/// Truncates to the top of the local hour.
fn start_of_hour(instant: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let local = instant.with_timezone(&tz).naive_local();
    let truncated = local
        .with_minute(0)
        .and_then(|l| l.with_second(0))
        .and_then(|l| l.with_nanosecond(0))
        .unwrap_or(local);
    resolve_local(tz, truncated)
}

/// Walks boundaries forward from `first` until one exceeds `to`, then
/// pairs consecutive boundaries into intervals. The final unterminated
/// boundary only ever closes the last interval.
fn collect_intervals(
    first: DateTime<Utc>,
    to: DateTime<Utc>,
    mut step: impl FnMut(DateTime<Utc>) -> Option<DateTime<Utc>>,
) -> Vec<Interval> {
    let mut boundaries = vec![first];
    let mut current = first;
    while current <= to {
        let Some(next) = step(current) else { break };
        if next <= current {
            // A non-advancing step would loop forever; bail out.
            tracing::warn!(at = %current, "calendar step failed to advance");
            break;
        }
        boundaries.push(next);
        current = next;
    }
    boundaries
        .windows(2)
        .map(|pair| Interval::new(pair[0], pair[1]))
        .collect()
}

/// Minute buckets.
pub fn generate_minute_intervals(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    options: &IntervalOptions,
) -> Vec<Interval> {
    let first = start_of_minute(from, options.time_zone);
    collect_intervals(first, to, |current| current.checked_add_signed(Duration::minutes(1)))
}

/// Quarter-hour buckets.
pub fn generate_quarter_hour_intervals(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    options: &IntervalOptions,
) -> Vec<Interval> {
    let first = start_of_quarter_hour(from, options.time_zone);
    collect_intervals(first, to, |current| current.checked_add_signed(Duration::minutes(15)))
}

/// Hour buckets.
pub fn generate_hour_intervals(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    options: &IntervalOptions,
) -> Vec<Interval> {
    let first = start_of_hour(from, options.time_zone);
    collect_intervals(first, to, |current| current.checked_add_signed(Duration::hours(1)))
}

/// Four-hour buckets counted from local midnight.
pub fn generate_four_hour_intervals(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    options: &IntervalOptions,
) -> Vec<Interval> {
    let first = start_of_day(from, options.time_zone);
    collect_intervals(first, to, |current| current.checked_add_signed(Duration::hours(4)))
}

/// Local calendar-day buckets.
///
/// Stepping adds 36 hours and re-truncates to local midnight, which
/// lands in the following day regardless of whether the current day ran
/// 23, 24, or 25 wall-clock hours.
pub fn generate_day_intervals(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    options: &IntervalOptions,
) -> Vec<Interval> {
    let tz = options.time_zone;
    let first = start_of_day(from, tz);
    collect_intervals(first, to, |current| {
        current
            .checked_add_signed(Duration::hours(36))
            .map(|pushed| start_of_day(pushed, tz))
    })
}

/// Week buckets anchored at the configured week start.
pub fn generate_week_intervals(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    options: &IntervalOptions,
) -> Vec<Interval> {
    let tz = options.time_zone;
    let local_date = from.with_timezone(&tz).date_naive();
    let back = i64::from(local_date.weekday().days_since(options.week_starts_on));
    let week_start = local_date
        .checked_sub_signed(Duration::days(back))
        .unwrap_or(local_date);
    let first = midnight_of(week_start, tz);
    // 7 days + 12 hours overshoots any DST wobble, then re-truncate.
    collect_intervals(first, to, |current| {
        current
            .checked_add_signed(Duration::days(7) + Duration::hours(12))
            .map(|pushed| start_of_day(pushed, tz))
    })
}

/// Calendar-month buckets.
pub fn generate_month_intervals(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    options: &IntervalOptions,
) -> Vec<Interval> {
    let tz = options.time_zone;
    let local_date = from.with_timezone(&tz).date_naive();
    let month_start = local_date.with_day(1).unwrap_or(local_date);
    let first = midnight_of(month_start, tz);
    collect_intervals(first, to, |current| {
        current
            .with_timezone(&tz)
            .date_naive()
            .checked_add_months(Months::new(1))
            .map(|next| midnight_of(next, tz))
    })
}

/// Quarter buckets anchored at January, April, July, October.
pub fn generate_quarter_intervals(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    options: &IntervalOptions,
) -> Vec<Interval> {
    let tz = options.time_zone;
    let local_date = from.with_timezone(&tz).date_naive();
    let quarter_month = ((local_date.month0() / 3) * 3) + 1;
    let quarter_start = NaiveDate::from_ymd_opt(local_date.year(), quarter_month, 1)
        .unwrap_or(local_date);
    let first = midnight_of(quarter_start, tz);
    collect_intervals(first, to, |current| {
        current
            .with_timezone(&tz)
            .date_naive()
            .checked_add_months(Months::new(3))
            .map(|next| midnight_of(next, tz))
    })
}

/// Calendar-year buckets.
pub fn generate_year_intervals(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    options: &IntervalOptions,
) -> Vec<Interval> {
    year_aligned_intervals(from, to, options.time_zone, 1)
}

/// Ten-year buckets anchored at years divisible by ten.
pub fn generate_decade_intervals(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    options: &IntervalOptions,
) -> Vec<Interval> {
    year_aligned_intervals(from, to, options.time_zone, 10)
}

/// Hundred-year buckets anchored at years divisible by one hundred.
pub fn generate_century_intervals(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    options: &IntervalOptions,
) -> Vec<Interval> {
    year_aligned_intervals(from, to, options.time_zone, 100)
}

fn year_aligned_intervals(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    tz: Tz,
    span_years: i32,
) -> Vec<Interval> {
    let local_year = from.with_timezone(&tz).date_naive().year();
    let floored = local_year.div_euclid(span_years) * span_years;
    let Some(start_date) = NaiveDate::from_ymd_opt(floored, 1, 1) else {
        return Vec::new();
    };
    let first = midnight_of(start_date, tz);
    collect_intervals(first, to, |current| {
        let date = current.with_timezone(&tz).date_naive();
        date.year()
            .checked_add(span_years)
            .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
            .map(|next| midnight_of(next, tz))
    })
}

/// Dispatches to the generator for `granularity`.
pub fn generate_intervals(
    granularity: Granularity,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    options: &IntervalOptions,
) -> Vec<Interval> {
    match granularity {
        Granularity::Minute => generate_minute_intervals(from, to, options),
        Granularity::QuarterHour => generate_quarter_hour_intervals(from, to, options),
        Granularity::Hour => generate_hour_intervals(from, to, options),
        Granularity::FourHours => generate_four_hour_intervals(from, to, options),
        Granularity::Day => generate_day_intervals(from, to, options),
        Granularity::Week => generate_week_intervals(from, to, options),
        Granularity::Month => generate_month_intervals(from, to, options),
        Granularity::Quarter => generate_quarter_intervals(from, to, options),
        Granularity::Year => generate_year_intervals(from, to, options),
        Granularity::Decade => generate_decade_intervals(from, to, options),
        Granularity::Century => generate_century_intervals(from, to, options),
    }
}
