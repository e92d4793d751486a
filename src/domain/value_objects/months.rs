use std::{fmt::Display, str::FromStr};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::domain::errors::ParseError;

pub const MONTH_FORMAT: &str = "MM-YYYY";

/// A calendar month (year + month). Day-of-month is not part of the value.
///
/// Ordering is by `(year, month)`, which is the field order below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if !(0..=9999).contains(&year) || !(1..=12).contains(&month) {
            return None;
        }
        Some(Self { year, month })
    }

    /// Parses the canonical `MM-YYYY` form, e.g. `"03-2024"`.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let invalid = || ParseError::InvalidMonth(text.to_string());

        let (month_part, year_part) = text.split_once('-').ok_or_else(invalid)?;
        if month_part.len() != 2 || year_part.len() != 4 {
            return Err(invalid());
        }
        if !month_part.bytes().all(|b| b.is_ascii_digit())
            || !year_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let month: u32 = month_part.parse().map_err(|_| invalid())?;
        let year: i32 = year_part.parse().map_err(|_| invalid())?;

        Self::new(year, month).ok_or_else(invalid)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .expect("year and month are range-checked on construction")
    }
}

/// The later of two months. Used for the start of an overlap.
pub fn clamp_lower_bound(a: Month, b: Month) -> Month {
    a.max(b)
}

/// The earlier of `a` and an optional bound. An absent bound is open-ended and never
/// constrains `a`.
pub fn clamp_upper_bound(a: Month, b: Option<Month>) -> Month {
    match b {
        Some(b) => a.min(b),
        None => a,
    }
}

/// Number of months spanned by `[start, end]`, counting both ends.
///
/// Non-positive when `start` is after `end`; callers treat that as no overlap.
pub fn months_between_inclusive(start: Month, end: Month) -> i64 {
    let years = i64::from(end.year) - i64::from(start.year);
    let months = i64::from(end.month) - i64::from(start.month);
    years * 12 + months + 1
}

impl Display for Month {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}-{:04}", self.month, self.year)
    }
}

impl FromStr for Month {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<NaiveDate> for Month {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl From<Month> for NaiveDate {
    fn from(month: Month) -> Self {
        month.first_day()
    }
}

impl Serialize for Month {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Month::parse(&raw).map_err(de::Error::custom)
    }
}
