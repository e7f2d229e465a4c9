//! Time-window helpers over normalized readings.
//!
//! All helpers are pure and work in local time.

use crate::NormalizedReading;
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};

/// Readings of one local calendar day
#[derive(Clone, Debug, PartialEq)]
pub struct DayBucket<'a> {
    pub date: NaiveDate,
    pub readings: Vec<&'a NormalizedReading>,
}

impl DayBucket<'_> {
    /// `YYYY-MM-DD` key of this bucket
    pub fn key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// Keep readings within 24 hours of `now`, in either direction
pub fn last_24h(readings: &[NormalizedReading], now: NaiveDateTime) -> Vec<&NormalizedReading> {
    let window = Duration::hours(24);
    readings
        .iter()
        .filter(|r| (r.ts_date - now).abs() <= window)
        .collect()
}

/// Local hour of day with minutes as a fraction (08:30 -> 8.5)
pub fn fractional_hour(ts: NaiveDateTime) -> f64 {
    f64::from(ts.hour()) + f64::from(ts.minute()) / 60.0
}

/// True when the reading's hour of day lies in `[start_hour, end_hour)`
///
/// For whole-hour bounds this is the same as comparing the bare hour.
pub fn in_hour_window(reading: &NormalizedReading, start_hour: f64, end_hour: f64) -> bool {
    let h = fractional_hour(reading.ts_date);
    h >= start_hour && h < end_hour
}

/// Filter a set of readings down to an hour-of-day window
pub fn readings_in_window<'a, I>(readings: I, start_hour: f64, end_hour: f64) -> Vec<&'a NormalizedReading>
where
    I: IntoIterator<Item = &'a NormalizedReading>,
{
    readings
        .into_iter()
        .filter(|r| in_hour_window(r, start_hour, end_hour))
        .collect()
}

/// Partition readings by local calendar date, in first-seen order
pub fn group_by_calendar_day<'a, I>(readings: I) -> Vec<DayBucket<'a>>
where
    I: IntoIterator<Item = &'a NormalizedReading>,
{
    let mut buckets: Vec<DayBucket<'a>> = Vec::new();

    for reading in readings {
        let date = reading.ts_date.date();
        match buckets.iter_mut().find(|b| b.date == date) {
            Some(bucket) => bucket.readings.push(reading),
            None => buckets.push(DayBucket {
                date,
                readings: vec![reading],
            }),
        }
    }

    buckets
}

/// Arithmetic mean; `None` for an empty input
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ts: &str, value: f64) -> NormalizedReading {
        NormalizedReading {
            id: ts.into(),
            timestamp: ts.into(),
            value,
            ts_date: NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M").unwrap(),
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2025-11-06T12:00", "%Y-%m-%dT%H:%M").unwrap()
    }

    #[test]
    fn test_last_24h_is_rolling_and_inclusive() {
        let readings = vec![
            at("2025-11-05T11:59", 1.0), // 24h01m ago
            at("2025-11-05T12:00", 2.0), // exactly 24h
            at("2025-11-06T00:30", 3.0),
            at("2025-11-07T12:00", 4.0), // exactly 24h ahead
            at("2025-11-07T12:01", 5.0),
        ];

        let kept: Vec<f64> = last_24h(&readings, now()).iter().map(|r| r.value).collect();
        assert_eq!(kept, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_hour_window_is_start_inclusive_end_exclusive() {
        assert!(in_hour_window(&at("2025-11-06T00:00", 5.0), 0.0, 6.0));
        assert!(in_hour_window(&at("2025-11-06T05:59", 5.0), 0.0, 6.0));
        assert!(!in_hour_window(&at("2025-11-06T06:00", 5.0), 0.0, 6.0));
        assert!(in_hour_window(&at("2025-11-06T21:59", 5.0), 14.0, 22.0));
        assert!(!in_hour_window(&at("2025-11-06T22:00", 5.0), 14.0, 22.0));
    }

    #[test]
    fn test_fractional_bounds() {
        let r = at("2025-11-06T07:45", 5.0);
        assert_eq!(fractional_hour(r.ts_date), 7.75);
        assert!(in_hour_window(&r, 7.5, 8.0));
        assert!(!in_hour_window(&r, 4.0, 7.5));
    }

    #[test]
    fn test_group_by_calendar_day_preserves_first_seen_order() {
        let readings = vec![
            at("2025-11-06T08:00", 1.0),
            at("2025-11-04T08:00", 2.0),
            at("2025-11-06T20:00", 3.0),
        ];

        let days = group_by_calendar_day(&readings);
        let keys: Vec<String> = days.iter().map(DayBucket::key).collect();
        assert_eq!(keys, vec!["2025-11-06", "2025-11-04"]);
        assert_eq!(days[0].readings.len(), 2);
        assert_eq!(days[1].readings[0].value, 2.0);
    }

    #[test]
    fn test_group_splits_at_local_midnight() {
        let readings = vec![at("2025-11-05T23:59", 1.0), at("2025-11-06T00:00", 2.0)];
        assert_eq!(group_by_calendar_day(&readings).len(), 2);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(Vec::new()), None);
        assert_eq!(mean(vec![0.0]), Some(0.0));
        assert_eq!(mean(vec![4.0, 6.0, 11.0]), Some(7.0));
    }
}
