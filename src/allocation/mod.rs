//! Resource allocations and the engine that turns an intensity goal into
//! day-by-day assignments.

use crate::availability::AvailabilityTimeLine;
use crate::calendar::{Calendar, CombinedCalendar, SameWorkHoursEveryDay};
use crate::effort::{EffortDuration, ResourcesPerDay};
use crate::intraday::{IntraDayDate, PartialDay};
use crate::resource::{Criterion, Resource, ResourceId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub mod distributor;
mod engine;
mod error;

pub use distributor::EffortDistributor;
pub use engine::EffortAllocator;
pub use error::{AllocationError, AllocationScope, NoValidPeriodsCause};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AllocationId(pub u32);

impl fmt::Display for AllocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Backward,
}

/// Effort one resource works for one allocation on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayAssignment {
    pub allocation: AllocationId,
    pub resource: ResourceId,
    pub day: NaiveDate,
    pub duration: EffortDuration,
}

impl DayAssignment {
    /// The part of this assignment inside `[start, end)`.
    pub fn effort_within(&self, start: IntraDayDate, end: IntraDayDate) -> EffortDuration {
        let day = PartialDay::whole_day(self.day);
        let clipped_start = day.start().max(start);
        let clipped_end = day.end().min(end);
        if clipped_start >= clipped_end {
            return EffortDuration::zero();
        }
        PartialDay::new(clipped_start, clipped_end).limit_working_day(self.duration)
    }
}

/// Dates of the task an allocation belongs to.
#[derive(Debug, Clone)]
pub struct TaskWindow {
    start: IntraDayDate,
    end: IntraDayDate,
    calendar: Option<Arc<dyn Calendar>>,
}

impl TaskWindow {
    pub fn new(start: IntraDayDate, end: IntraDayDate) -> Result<Self, AllocationError> {
        if start > end {
            return Err(AllocationError::InvalidInterval { start, end });
        }
        Ok(Self {
            start,
            end,
            calendar: None,
        })
    }

    /// Whole days from `start` up to, but not including, `end`.
    pub fn between_dates(start: NaiveDate, end: NaiveDate) -> Result<Self, AllocationError> {
        Self::new(
            IntraDayDate::start_of_day(start),
            IntraDayDate::start_of_day(end),
        )
    }

    pub fn with_calendar(mut self, calendar: Arc<dyn Calendar>) -> Self {
        self.calendar = Some(calendar);
        self
    }

    pub fn start(&self) -> IntraDayDate {
        self.start
    }

    pub fn end(&self) -> IntraDayDate {
        self.end
    }

    pub fn calendar(&self) -> Option<&Arc<dyn Calendar>> {
        self.calendar.as_ref()
    }

    pub(crate) fn set_start(&mut self, start: IntraDayDate) {
        self.start = start;
    }

    pub(crate) fn set_end(&mut self, end: IntraDayDate) {
        self.end = end;
    }
}

#[derive(Debug, Clone)]
pub enum AllocationKind {
    /// Any of `resources` satisfying `criteria` can do the work.
    Generic {
        criteria: Vec<Criterion>,
        resources: Vec<Arc<Resource>>,
    },
    Specific { resource: Arc<Resource> },
}

impl AllocationKind {
    pub fn scope(&self) -> AllocationScope {
        match self {
            AllocationKind::Generic { .. } => AllocationScope::Generic,
            AllocationKind::Specific { .. } => AllocationScope::Specific,
        }
    }

    pub fn resources(&self) -> &[Arc<Resource>] {
        match self {
            AllocationKind::Generic { resources, .. } => resources,
            AllocationKind::Specific { resource } => std::slice::from_ref(resource),
        }
    }

    pub fn criteria(&self) -> &[Criterion] {
        match self {
            AllocationKind::Generic { criteria, .. } => criteria,
            AllocationKind::Specific { .. } => &[],
        }
    }

    /// Per day, the best of the resources' calendars for generic
    /// allocations, the resource's own one for specific ones.
    pub fn resources_calendar(&self) -> Arc<dyn Calendar> {
        match self {
            AllocationKind::Generic { resources, .. } => Arc::new(CombinedCalendar::max_of(
                resources
                    .iter()
                    .map(|r| r.calendar() as Arc<dyn Calendar>)
                    .collect(),
            )),
            AllocationKind::Specific { resource } => resource.calendar(),
        }
    }

    /// Days on which at least one resource satisfies the criteria and its
    /// calendar is available.
    pub fn availability(&self) -> AvailabilityTimeLine {
        let criteria = self.criteria();
        self.resources()
            .iter()
            .map(|r| r.availability(criteria))
            .fold(AvailabilityTimeLine::all_invalid(), |acc, t| acc.or(&t))
    }
}

#[derive(Debug, Clone)]
pub struct ResourceAllocation {
    id: AllocationId,
    kind: AllocationKind,
    task: TaskWindow,
    assignments: Vec<DayAssignment>,
    intra_day_start: Option<IntraDayDate>,
    intra_day_end: Option<IntraDayDate>,
    resources_per_day: Option<ResourcesPerDay>,
    intended_resources_per_day: Option<ResourcesPerDay>,
}

impl ResourceAllocation {
    pub fn new(id: AllocationId, kind: AllocationKind, task: TaskWindow) -> Self {
        Self {
            id,
            kind,
            task,
            assignments: Vec::new(),
            intra_day_start: None,
            intra_day_end: None,
            resources_per_day: None,
            intended_resources_per_day: None,
        }
    }

    pub fn generic(
        id: AllocationId,
        criteria: Vec<Criterion>,
        resources: Vec<Arc<Resource>>,
        task: TaskWindow,
    ) -> Self {
        Self::new(
            id,
            AllocationKind::Generic {
                criteria,
                resources,
            },
            task,
        )
    }

    pub fn specific(id: AllocationId, resource: Arc<Resource>, task: TaskWindow) -> Self {
        Self::new(id, AllocationKind::Specific { resource }, task)
    }

    pub fn id(&self) -> AllocationId {
        self.id
    }

    pub fn kind(&self) -> &AllocationKind {
        &self.kind
    }

    pub fn is_generic(&self) -> bool {
        matches!(self.kind, AllocationKind::Generic { .. })
    }

    pub fn is_specific(&self) -> bool {
        !self.is_generic()
    }

    pub fn criteria(&self) -> &[Criterion] {
        self.kind.criteria()
    }

    pub fn resources(&self) -> &[Arc<Resource>] {
        self.kind.resources()
    }

    pub fn task(&self) -> &TaskWindow {
        &self.task
    }

    pub fn assignments(&self) -> &[DayAssignment] {
        &self.assignments
    }

    /// Where the assignments start; the task start before any allocation.
    pub fn start(&self) -> IntraDayDate {
        self.intra_day_start.unwrap_or(self.task.start)
    }

    pub fn end(&self) -> IntraDayDate {
        self.intra_day_end.unwrap_or(self.task.end)
    }

    /// Intensity actually achieved by the current assignments.
    pub fn resources_per_day(&self) -> Option<ResourcesPerDay> {
        self.resources_per_day
    }

    /// Intensity last asked for.
    pub fn intended_resources_per_day(&self) -> Option<ResourcesPerDay> {
        self.intended_resources_per_day
    }

    pub fn is_satisfied(&self) -> bool {
        !self.assignments.is_empty()
    }

    pub fn mark_as_unsatisfied(&mut self) {
        self.assignments = Vec::new();
        self.resources_per_day = None;
    }

    /// Task calendar (or `default_daily` hours every day) restricted by the
    /// resources' calendar.
    pub fn allocation_calendar(&self, default_daily: EffortDuration) -> Arc<dyn Calendar> {
        let task_calendar = self
            .task
            .calendar
            .clone()
            .unwrap_or_else(|| Arc::new(SameWorkHoursEveryDay::new(default_daily)) as Arc<dyn Calendar>);
        Arc::new(CombinedCalendar::min_of(vec![
            task_calendar,
            self.kind.resources_calendar(),
        ]))
    }

    pub fn assigned_effort(&self) -> EffortDuration {
        self.assignments.iter().map(|a| a.duration).sum()
    }

    pub fn has_assignments_for(&self, resource: ResourceId) -> bool {
        self.assignments.iter().any(|a| a.resource == resource)
    }

    pub fn assigned_effort_for_resource(
        &self,
        resource: ResourceId,
        start: IntraDayDate,
        end: IntraDayDate,
    ) -> EffortDuration {
        self.assignments
            .iter()
            .filter(|a| a.resource == resource)
            .map(|a| a.effort_within(start, end))
            .sum()
    }

    /// Effort inside `[start, end)` by resources satisfying `criterion` on
    /// the assignment's day.
    pub fn assigned_effort_for_criterion(
        &self,
        criterion: &Criterion,
        start: IntraDayDate,
        end: IntraDayDate,
    ) -> EffortDuration {
        let satisfying = |a: &DayAssignment| {
            self.resources()
                .iter()
                .any(|r| r.id() == a.resource && r.satisfies(criterion, a.day))
        };
        self.assignments
            .iter()
            .filter(|a| satisfying(a))
            .map(|a| a.effort_within(start, end))
            .sum()
    }

    pub fn assignments_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Iterator<Item = &DayAssignment> {
        self.assignments
            .iter()
            .filter(move |a| start <= a.day && a.day < end)
    }

    pub fn assignments_by_day(&self) -> BTreeMap<NaiveDate, EffortDuration> {
        let mut by_day = BTreeMap::new();
        for assignment in &self.assignments {
            let total = by_day.entry(assignment.day).or_insert_with(EffortDuration::zero);
            *total = total.plus(assignment.duration);
        }
        by_day
    }

    /// Installs assignments decided elsewhere, as the limiting queue does
    /// when it places an element.
    pub fn allocate_limiting_day_assignments(&mut self, mut assignments: Vec<DayAssignment>) {
        for assignment in &mut assignments {
            assignment.allocation = self.id;
        }
        assignments.retain(|a| !a.duration.is_zero());
        assignments.sort_by_key(|a| (a.day, a.resource));
        self.intra_day_start = assignments
            .first()
            .map(|a| IntraDayDate::start_of_day(a.day));
        self.intra_day_end = assignments
            .last()
            .map(|a| IntraDayDate::start_of_day(a.day).next_day_at_start());
        self.assignments = assignments;
    }

    pub fn remove_limiting_day_assignments(&mut self) {
        self.mark_as_unsatisfied();
        self.intra_day_start = None;
        self.intra_day_end = None;
    }

    /// Swaps in a freshly built assignment list in one step.
    pub(crate) fn reset_assignments_to(
        &mut self,
        mut assignments: Vec<DayAssignment>,
        start: IntraDayDate,
        end: IntraDayDate,
        achieved: ResourcesPerDay,
        intended: ResourcesPerDay,
    ) {
        assignments.retain(|a| !a.duration.is_zero());
        assignments.sort_by_key(|a| (a.day, a.resource));
        self.assignments = assignments;
        self.intra_day_start = Some(start);
        self.intra_day_end = Some(end);
        self.resources_per_day = Some(achieved);
        self.intended_resources_per_day = Some(intended);
    }

    pub(crate) fn task_mut(&mut self) -> &mut TaskWindow {
        &mut self.task
    }

    pub fn sorted_by_start_date(allocations: &mut [ResourceAllocation]) {
        allocations.sort_by_key(|a| (a.start(), a.id));
    }

    pub fn by_resource<'a>(
        allocations: &'a [ResourceAllocation],
    ) -> BTreeMap<ResourceId, Vec<&'a ResourceAllocation>> {
        let mut grouped: BTreeMap<ResourceId, Vec<&ResourceAllocation>> = BTreeMap::new();
        for allocation in allocations {
            let mut seen: Vec<ResourceId> = allocation.assignments.iter().map(|a| a.resource).collect();
            seen.sort();
            seen.dedup();
            for resource in seen {
                grouped.entry(resource).or_default().push(allocation);
            }
        }
        grouped
    }
}
