//! Period selection and Monday..Sunday week spans.

use crate::summary::{SummaryError, SummaryResult};
use chrono::{Datelike, Days, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

/// Days covered by one summary period.
pub const DAYS_PER_WEEK: usize = 7;

static WEEK_SELECTOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d{4})-?[Ww](\d{1,2})\s*$").expect("valid week selector regex")
});

/// Aggregation granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Week,
}

/// Which week the summary shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum When {
    /// Week containing today.
    #[default]
    Current,
    /// Week before the current one.
    Previous,
    /// Week containing the explicitly selected date.
    WeekNumber,
}

/// Inclusive Monday..Sunday range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekSpan {
    first: NaiveDate,
    last: NaiveDate,
}

impl WeekSpan {
    /// Canonical week containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        let week = date.week(Weekday::Mon);
        Self {
            first: week.first_day(),
            last: week.last_day(),
        }
    }

    /// Week `week` of ISO year `iso_year`.
    pub fn iso(iso_year: i32, week: u32) -> Option<Self> {
        NaiveDate::from_isoywd_opt(iso_year, week, Weekday::Mon).map(Self::containing)
    }

    pub fn first(&self) -> NaiveDate {
        self.first
    }

    pub fn last(&self) -> NaiveDate {
        self.last
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.first <= date && date <= self.last
    }

    /// Zero-based column of `date` within the span (Monday = 0).
    pub fn day_index(&self, date: NaiveDate) -> Option<usize> {
        if !self.contains(date) {
            return None;
        }
        usize::try_from((date - self.first).num_days()).ok()
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.first.iter_days().take(DAYS_PER_WEEK)
    }

    /// `(iso_year, week_number)` of this span.
    pub fn iso_week(&self) -> (i32, u32) {
        let week = self.first.iso_week();
        (week.year(), week.week())
    }
}

/// Resolves the date whose week `when` selects.
pub fn target_date(when: When, today: NaiveDate, selection: NaiveDate) -> NaiveDate {
    match when {
        When::Current => today,
        When::Previous => today.checked_sub_days(Days::new(7)).unwrap_or(today),
        When::WeekNumber => selection,
    }
}

/// Parses `2026-W43`, `2026W43` or `2026-w7` into the Monday of that ISO week.
pub fn parse_week_selector(value: &str) -> SummaryResult<NaiveDate> {
    let invalid = || SummaryError::InvalidWeek(value.to_string());
    let captures = WEEK_SELECTOR_RE.captures(value).ok_or_else(invalid)?;
    let year: i32 = captures[1].parse().map_err(|_| invalid())?;
    let week: u32 = captures[2].parse().map_err(|_| invalid())?;
    WeekSpan::iso(year, week)
        .map(|span| span.first())
        .ok_or_else(invalid)
}
