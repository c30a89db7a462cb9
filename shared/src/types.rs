//! Common types used across the platform

use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Date range for queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Inclusive on both calendar days
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Half-open UTC instant bounds `[start 00:00, end + 1 day 00:00)`
    pub fn utc_bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (start_of_day(self.start), start_of_day(self.end + Duration::days(1)))
    }
}

/// Midnight UTC of a calendar day
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// An ISO 8601 week, written `YYYY-Wxx`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IsoWeek {
    pub year: i32,
    pub week: u32,
}

impl IsoWeek {
    /// ISO week containing the given day
    pub fn containing(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    pub fn monday(&self) -> NaiveDate {
        // Parsing guarantees the week exists in its year
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon)
            .unwrap_or(NaiveDate::MIN)
    }

    /// The seven calendar days of the week, Monday first
    pub fn days(&self) -> [NaiveDate; 7] {
        let monday = self.monday();
        std::array::from_fn(|offset| monday + Duration::days(offset as i64))
    }

    pub fn range(&self) -> DateRange {
        let monday = self.monday();
        DateRange {
            start: monday,
            end: monday + Duration::days(6),
        }
    }
}

impl FromStr for IsoWeek {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::InvalidIsoWeek(s.to_string());

        let (year, week) = s.trim().split_once(['W', 'w']).ok_or_else(invalid)?;
        let year: i32 = year
            .strip_suffix('-')
            .unwrap_or(year)
            .parse()
            .map_err(|_| invalid())?;
        let week: u32 = week.parse().map_err(|_| invalid())?;

        NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).ok_or_else(invalid)?;
        Ok(Self { year, week })
    }
}

impl std::fmt::Display for IsoWeek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

impl Serialize for IsoWeek {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IsoWeek {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
