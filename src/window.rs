// src/window.rs

use anyhow::Result;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use std::fmt;

use crate::error::ExtractError;

/// A calendar month. Ordering is chronological.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// The month containing `dt`, i.e. `dt` truncated to the first of its month.
    pub fn containing(dt: NaiveDateTime) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
        }
    }

    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// The following month.
    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Parse a date bound. Accepts `YYYY-MM-DD`, naive ISO datetimes with `T` or a
/// space separator, and RFC 3339. An offset is dropped and the wall-clock
/// reading kept, so the bound stays in the month it was written in.
pub fn parse_bound(raw: &str) -> Result<NaiveDateTime> {
    let s = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d.and_time(chrono::NaiveTime::MIN));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_local());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    Err(ExtractError::InvalidDate {
        value: raw.to_string(),
    }
    .into())
}

/// Months visited by walking the window `[start, end)`.
///
/// The first cursor is `start` itself; each later cursor is the first of the
/// following month at the same time of day. A cursor counts while it is still
/// before `end`, so a window ending mid-month includes that month and a
/// reversed or empty window yields nothing.
pub fn months_in_window(start: NaiveDateTime, end: NaiveDateTime) -> Vec<YearMonth> {
    let mut cursor = start;
    let mut out = Vec::new();
    while cursor < end {
        let month = YearMonth::containing(cursor);
        out.push(month);
        match month.next().first_day() {
            Some(day) => cursor = day.and_time(cursor.time()),
            None => break,
        }
    }
    out
}
