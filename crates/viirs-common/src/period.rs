//! Inclusive calendar-date periods for composites.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ViirsError};

/// `[starts_at, ends_at]`, both days included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    pub starts_at: NaiveDate,
    pub ends_at: NaiveDate,
}

impl Period {
    pub fn new(starts_at: NaiveDate, ends_at: NaiveDate) -> Result<Self> {
        if starts_at > ends_at {
            return Err(ViirsError::invalid(format!(
                "period starts after it ends: {} > {}",
                starts_at, ends_at
            )));
        }
        Ok(Self { starts_at, ends_at })
    }

    /// The `days`-long window whose last day is `ends_at`.
    pub fn ending_at(ends_at: NaiveDate, days: u32) -> Self {
        let span = i64::from(days.max(1)) - 1;
        Self {
            starts_at: ends_at - Duration::days(span),
            ends_at,
        }
    }

    pub fn days(&self) -> i64 {
        (self.ends_at - self.starts_at).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.starts_at && date <= self.ends_at
    }

    pub fn contains_instant(&self, at: DateTime<Utc>) -> bool {
        self.contains(at.date_naive())
    }

    /// First instant of the period.
    pub fn start_instant(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.starts_at.and_time(chrono::NaiveTime::MIN))
    }

    /// Last instant of the period, inclusive, at second resolution.
    pub fn end_instant(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&(self.ends_at + Duration::days(1)).and_time(chrono::NaiveTime::MIN))
            - Duration::seconds(1)
    }

    /// Days between the end of `self` and the start of `later`.
    /// Adjacent periods have a gap of one.
    pub fn gap_days(&self, later: &Period) -> i64 {
        (later.starts_at - self.ends_at).num_days()
    }

    pub fn is_adjacent_to(&self, later: &Period) -> bool {
        let gap = self.gap_days(later);
        (0..=1).contains(&gap)
    }

    /// `DD.MM - DD.MM.YYYY`, as printed on maps and in reports.
    pub fn date_text(&self) -> String {
        format!(
            "{} - {}",
            self.starts_at.format("%d.%m"),
            self.ends_at.format("%d.%m.%Y")
        )
    }

    /// `YYYYMMDD_YYYYMMDD`, used in output file names.
    pub fn compact(&self) -> String {
        format!(
            "{}_{}",
            self.starts_at.format("%Y%m%d"),
            self.ends_at.format("%Y%m%d")
        )
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.starts_at, self.ends_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_ending_at_is_inclusive() {
        let p = Period::ending_at(date(2021, 2, 24), 4);
        assert_eq!(p.starts_at, date(2021, 2, 21));
        assert_eq!(p.days(), 4);
        assert!(p.contains(date(2021, 2, 21)));
        assert!(p.contains(date(2021, 2, 24)));
        assert!(!p.contains(date(2021, 2, 25)));
    }

    #[test]
    fn test_instants_cover_whole_days() {
        let p = Period::new(date(2021, 2, 21), date(2021, 2, 22)).unwrap();
        assert_eq!(p.start_instant().to_rfc3339(), "2021-02-21T00:00:00+00:00");
        assert_eq!(p.end_instant().to_rfc3339(), "2021-02-22T23:59:59+00:00");
    }

    #[test]
    fn test_adjacency() {
        let b1 = Period::ending_at(date(2021, 2, 20), 4);
        let b2 = Period::ending_at(date(2021, 2, 24), 4);
        assert_eq!(b1.gap_days(&b2), 1);
        assert!(b1.is_adjacent_to(&b2));

        let far = Period::ending_at(date(2021, 2, 16), 4);
        assert_eq!(far.gap_days(&b2), 5);
        assert!(!far.is_adjacent_to(&b2));
    }

    #[test]
    fn test_text_forms() {
        let p = Period::new(date(2021, 2, 21), date(2021, 2, 24)).unwrap();
        assert_eq!(p.date_text(), "21.02 - 24.02.2021");
        assert_eq!(p.compact(), "20210221_20210224");
    }

    #[test]
    fn test_reversed_period_rejected() {
        assert!(Period::new(date(2021, 2, 24), date(2021, 2, 21)).is_err());
    }
}
