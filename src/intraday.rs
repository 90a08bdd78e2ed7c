use crate::effort::{EffortDuration, ResourcesPerDay};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A date plus the effort already elapsed within it.
///
/// Ordered by date, then by offset. `2025-01-06 @ 0:00` is the start of
/// that day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IntraDayDate {
    date: NaiveDate,
    #[serde(default)]
    offset: EffortDuration,
}

impl IntraDayDate {
    pub fn create(date: NaiveDate, offset: EffortDuration) -> Self {
        Self { date, offset }
    }

    pub fn start_of_day(date: NaiveDate) -> Self {
        Self::create(date, EffortDuration::zero())
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn offset(&self) -> EffortDuration {
        self.offset
    }

    pub fn is_start_of_day(&self) -> bool {
        self.offset.is_zero()
    }

    pub fn next_day_at_start(&self) -> Self {
        Self::start_of_day(next_day(self.date))
    }

    /// The first day not touched by an interval ending at `self`.
    pub fn as_exclusive_end(&self) -> NaiveDate {
        if self.is_start_of_day() {
            self.date
        } else {
            next_day(self.date)
        }
    }

    pub fn number_of_days_until(&self, end: IntraDayDate) -> i64 {
        (end.date - self.date).num_days()
    }

    /// Moves the offset forward by the calendar time needed to produce
    /// `effort` at `resources_per_day`.
    pub fn increase_by(&self, resources_per_day: ResourcesPerDay, effort: EffortDuration) -> Self {
        let elapsed = resources_per_day.calendar_time_for(effort);
        Self::create(self.date, self.offset.plus(elapsed))
    }

    /// Moves the offset backward, stopping at the start of the day.
    pub fn decrease_by(&self, resources_per_day: ResourcesPerDay, effort: EffortDuration) -> Self {
        let elapsed = resources_per_day.calendar_time_for(effort);
        Self::create(self.date, self.offset.saturating_minus(elapsed))
    }

    /// The days covered by `[self, end)`, each clipped to the interval.
    ///
    /// The end date only appears when `end` falls inside it.
    pub fn days_until(&self, end: IntraDayDate) -> Vec<PartialDay> {
        assert!(
            *self <= end,
            "interval start {self} must not be after its end {end}"
        );
        let mut days = Vec::new();
        let mut current = self.date;
        while current < end.as_exclusive_end() {
            let day_start = Self::start_of_day(current).max(*self);
            let day_end = Self::start_of_day(next_day(current)).min(end);
            if day_start < day_end {
                days.push(PartialDay::new(day_start, day_end));
            }
            current = next_day(current);
        }
        days
    }

    pub fn days_until_backwards(&self, end: IntraDayDate) -> Vec<PartialDay> {
        let mut days = self.days_until(end);
        days.reverse();
        days
    }
}

impl fmt::Display for IntraDayDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.date, self.offset)
    }
}

/// One date with the part of it that is in scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartialDay {
    start: IntraDayDate,
    end: IntraDayDate,
}

impl PartialDay {
    pub fn new(start: IntraDayDate, end: IntraDayDate) -> Self {
        assert!(start <= end, "partial day start {start} is after its end {end}");
        Self { start, end }
    }

    pub fn whole_day(date: NaiveDate) -> Self {
        Self::new(
            IntraDayDate::start_of_day(date),
            IntraDayDate::start_of_day(next_day(date)),
        )
    }

    pub fn date(&self) -> NaiveDate {
        self.start.date
    }

    pub fn start(&self) -> IntraDayDate {
        self.start
    }

    pub fn end(&self) -> IntraDayDate {
        self.end
    }

    pub fn is_whole_day(&self) -> bool {
        self.start.is_start_of_day() && self.end == self.start.next_day_at_start()
    }

    /// Offset where this day ends, `working_day` when it runs to midnight.
    pub fn end_offset_within(&self, working_day: EffortDuration) -> EffortDuration {
        if self.end.date == self.date() {
            self.end.offset
        } else {
            working_day
        }
    }

    /// The share of a `working_day` long day that falls inside this
    /// partial day.
    pub fn limit_working_day(&self, working_day: EffortDuration) -> EffortDuration {
        if self.is_whole_day() {
            return working_day;
        }
        let until_end = self.end_offset_within(working_day).min(working_day);
        let already_elapsed = self.start.offset.min(working_day);
        until_end.saturating_minus(already_elapsed)
    }
}

impl fmt::Display for PartialDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

pub(crate) fn next_day(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX)
}

pub(crate) fn previous_day(date: NaiveDate) -> NaiveDate {
    date.checked_sub_days(Days::new(1)).unwrap_or(NaiveDate::MIN)
}

pub(crate) fn plus_days(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX)
}

pub(crate) fn minus_days(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN)
}
