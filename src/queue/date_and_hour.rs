use crate::effort::EffortDuration;
use crate::intraday::IntraDayDate;
use chrono::{Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter;

/// Position in a limiting queue: a date and an hour within it.
/// Ordered by date, then hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DateAndHour {
    date: NaiveDate,
    hour: u32,
}

impl DateAndHour {
    pub fn new(date: NaiveDate, hour: u32) -> Self {
        Self { date, hour }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self::new(date, 0)
    }

    /// Whole hours of the intra-day offset; minutes are dropped.
    pub fn from_intra_day(date: IntraDayDate) -> Self {
        let hours = u32::try_from(date.offset().hours_part()).unwrap_or(u32::MAX);
        Self::new(date.date(), hours)
    }

    pub fn ten_years_from(date: NaiveDate) -> Self {
        Self::from_date(date).plus_years(10)
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn is_before(&self, other: &DateAndHour) -> bool {
        self < other
    }

    pub fn is_after(&self, other: &DateAndHour) -> bool {
        self > other
    }

    pub fn to_intra_day(&self) -> IntraDayDate {
        IntraDayDate::create(self.date, EffortDuration::hours(u64::from(self.hour)))
    }

    pub fn to_date_time(&self) -> NaiveDateTime {
        self.date.and_time(NaiveTime::MIN) + TimeDelta::hours(i64::from(self.hour))
    }

    pub fn plus_years(&self, years: u32) -> Self {
        let date = self
            .date
            .checked_add_months(Months::new(years.saturating_mul(12)))
            .unwrap_or(NaiveDate::MAX);
        Self::new(date, self.hour)
    }

    /// Latest of the present values, `None` if there are none.
    pub fn max_of(values: impl IntoIterator<Item = Option<DateAndHour>>) -> Option<DateAndHour> {
        values.into_iter().flatten().max()
    }

    pub fn min_of(values: impl IntoIterator<Item = Option<DateAndHour>>) -> Option<DateAndHour> {
        values.into_iter().flatten().min()
    }

    /// Dates from this one onwards whose start lies before `end`.
    /// Without an end the sequence is unbounded.
    ///
    /// Panics if `end` is not after `self`.
    pub fn days_until(&self, end: Option<DateAndHour>) -> impl Iterator<Item = NaiveDate> + use<> {
        assert!(
            end.is_none_or(|end| end > *self),
            "days_until needs an end after {self}"
        );
        iter::successors(Some(self.date), |date| date.succ_opt())
            .take_while(move |date| end.is_none_or(|end| DateAndHour::from_date(*date) < end))
    }
}

impl fmt::Display for DateAndHour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:02}h", self.date, self.hour)
    }
}
