use crate::availability::AvailabilityTimeLine;
use crate::calendar::{Calendar, WorkCalendar};
use crate::effort::EffortDuration;
use crate::intraday::IntraDayDate;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub u32);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// A named quality a resource can satisfy, e.g. `skill:welder`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Criterion {
    pub kind: String,
    pub name: String,
}

impl Criterion {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

/// A resource satisfies `criterion` on days in `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionSatisfaction {
    pub criterion: Criterion,
    pub start: NaiveDate,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

impl CriterionSatisfaction {
    pub fn new(criterion: Criterion, start: NaiveDate, end: Option<NaiveDate>) -> Self {
        Self {
            criterion,
            start,
            end,
        }
    }

    pub fn is_active_at(&self, date: NaiveDate) -> bool {
        self.start <= date && self.end.is_none_or(|end| date < end)
    }

    fn timeline(&self) -> AvailabilityTimeLine {
        AvailabilityTimeLine::valid_between(Some(self.start), self.end)
    }
}

#[derive(Debug, Clone)]
pub struct Resource {
    id: ResourceId,
    name: String,
    calendar: Option<Arc<WorkCalendar>>,
    satisfactions: Vec<CriterionSatisfaction>,
    limiting: bool,
}

impl Resource {
    pub fn new(id: ResourceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            calendar: None,
            satisfactions: Vec::new(),
            limiting: false,
        }
    }

    pub fn with_calendar(mut self, calendar: Arc<WorkCalendar>) -> Self {
        self.calendar = Some(calendar);
        self
    }

    pub fn with_satisfaction(mut self, satisfaction: CriterionSatisfaction) -> Self {
        self.satisfactions.push(satisfaction);
        self
    }

    pub fn limiting(mut self, limiting: bool) -> Self {
        self.limiting = limiting;
        self
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_limiting(&self) -> bool {
        self.limiting
    }

    pub fn own_calendar(&self) -> Option<&Arc<WorkCalendar>> {
        self.calendar.as_ref()
    }

    /// The resource's calendar, or the default working week.
    pub fn calendar(&self) -> Arc<WorkCalendar> {
        self.calendar
            .clone()
            .unwrap_or_else(WorkCalendar::default_working_week)
    }

    pub fn satisfactions(&self) -> &[CriterionSatisfaction] {
        &self.satisfactions
    }

    pub fn satisfies(&self, criterion: &Criterion, date: NaiveDate) -> bool {
        self.satisfactions
            .iter()
            .any(|s| &s.criterion == criterion && s.is_active_at(date))
    }

    pub fn satisfies_all(&self, criteria: &[Criterion], date: NaiveDate) -> bool {
        criteria.iter().all(|c| self.satisfies(c, date))
    }

    /// Days on which every criterion is satisfied at once.
    pub fn criteria_timeline(&self, criteria: &[Criterion]) -> AvailabilityTimeLine {
        criteria.iter().fold(AvailabilityTimeLine::all_valid(), |acc, criterion| {
            let satisfied = self
                .satisfactions
                .iter()
                .filter(|s| &s.criterion == criterion)
                .fold(AvailabilityTimeLine::all_invalid(), |t, s| t.or(&s.timeline()));
            acc.and(&satisfied)
        })
    }

    /// Days the resource can work on satisfying `criteria`.
    pub fn availability(&self, criteria: &[Criterion]) -> AvailabilityTimeLine {
        self.criteria_timeline(criteria)
            .and(&self.calendar().availability())
    }

    /// Calendar capacity over `[start, end)` on days satisfying `criteria`.
    pub fn total_effort_for(
        &self,
        start: IntraDayDate,
        end: IntraDayDate,
        criteria: &[Criterion],
    ) -> EffortDuration {
        let calendar = self.calendar();
        start
            .days_until(end)
            .iter()
            .filter(|day| self.satisfies_all(criteria, day.date()))
            .map(|day| calendar.capacity_on(day))
            .sum()
    }
}
