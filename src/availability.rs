use crate::intraday::next_day;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A position on the unbounded date line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Point {
    StartOfTime,
    At(NaiveDate),
    EndOfTime,
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Point::StartOfTime => write!(f, "-inf"),
            Point::At(date) => write!(f, "{date}"),
            Point::EndOfTime => write!(f, "+inf"),
        }
    }
}

/// Half-open range of valid days, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    start: Point,
    end: Point,
}

impl Interval {
    fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn end(&self) -> Point {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= Point::At(date) && Point::At(date) < self.end
    }

    fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    fn intersect(&self, other: &Interval) -> Interval {
        Interval::new(self.start.max(other.start), self.end.min(other.end))
    }
}

/// Which days are valid for allocating, as a normalized set of disjoint
/// intervals sorted by start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityTimeLine {
    valid: Vec<Interval>,
}

impl AvailabilityTimeLine {
    pub fn all_valid() -> Self {
        Self {
            valid: vec![Interval::new(Point::StartOfTime, Point::EndOfTime)],
        }
    }

    pub fn all_invalid() -> Self {
        Self { valid: Vec::new() }
    }

    /// Valid only on days in `[start, end)`; `None` leaves that side open.
    pub fn valid_between(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        let start = start.map_or(Point::StartOfTime, Point::At);
        let end = end.map_or(Point::EndOfTime, Point::At);
        Self::from_intervals(vec![Interval::new(start, end)])
    }

    fn from_intervals(mut intervals: Vec<Interval>) -> Self {
        intervals.retain(|i| !i.is_empty());
        intervals.sort_by_key(|i| (i.start, i.end));
        let mut valid: Vec<Interval> = Vec::with_capacity(intervals.len());
        for interval in intervals {
            match valid.last_mut() {
                Some(last) if interval.start <= last.end => {
                    last.end = last.end.max(interval.end);
                }
                _ => valid.push(interval),
            }
        }
        Self { valid }
    }

    pub fn valid_periods(&self) -> &[Interval] {
        &self.valid
    }

    pub fn is_all_invalid(&self) -> bool {
        self.valid.is_empty()
    }

    pub fn is_valid(&self, date: NaiveDate) -> bool {
        self.valid.iter().any(|i| i.contains(date))
    }

    /// Whether any day in `[start, end)` is valid.
    pub fn has_valid_day_between(&self, start: NaiveDate, end: NaiveDate) -> bool {
        let window = Interval::new(Point::At(start), Point::At(end));
        self.valid.iter().any(|i| !i.intersect(&window).is_empty())
    }

    pub fn and(&self, other: &AvailabilityTimeLine) -> AvailabilityTimeLine {
        let mut result = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.valid.len() && j < other.valid.len() {
            let a = &self.valid[i];
            let b = &other.valid[j];
            let overlap = a.intersect(b);
            if !overlap.is_empty() {
                result.push(overlap);
            }
            if a.end < b.end {
                i += 1;
            } else {
                j += 1;
            }
        }
        Self::from_intervals(result)
    }

    pub fn or(&self, other: &AvailabilityTimeLine) -> AvailabilityTimeLine {
        let mut all = self.valid.clone();
        all.extend_from_slice(&other.valid);
        Self::from_intervals(all)
    }

    fn invalidate(&mut self, start: Point, end: Point) {
        let complement = Self::from_intervals(vec![
            Interval::new(Point::StartOfTime, start),
            Interval::new(end, Point::EndOfTime),
        ]);
        *self = self.and(&complement);
    }

    /// Days before `date` become invalid.
    pub fn invalid_until(&mut self, date: NaiveDate) {
        self.invalidate(Point::StartOfTime, Point::At(date));
    }

    /// `date` and every day after it become invalid.
    pub fn invalid_from(&mut self, date: NaiveDate) {
        self.invalidate(Point::At(date), Point::EndOfTime);
    }

    pub fn invalid_at(&mut self, date: NaiveDate) {
        self.invalidate(Point::At(date), Point::At(next_day(date)));
    }

    /// Days in `[start, end)` become invalid.
    pub fn invalid_between(&mut self, start: NaiveDate, end: NaiveDate) {
        self.invalidate(Point::At(start), Point::At(end));
    }
}

impl Default for AvailabilityTimeLine {
    fn default() -> Self {
        Self::all_valid()
    }
}
