use super::{
    AllocationError, AllocationId, DayAssignment, Direction, EffortDistributor, NoValidPeriodsCause,
    ResourceAllocation,
};
use crate::availability::AvailabilityTimeLine;
use crate::calendar::Calendar;
use crate::config::EngineConfig;
use crate::effort::{EffortDuration, ResourcesPerDay};
use crate::intraday::{IntraDayDate, PartialDay, minus_days, plus_days};
use std::sync::Arc;
use tracing::debug;

/// Distributes effort over the days of one allocation at a given
/// intensity.
///
/// Every successful call replaces the allocation's assignments in one
/// step. Failures leave the allocation unsatisfied.
pub struct EffortAllocator<'a> {
    allocation: &'a mut ResourceAllocation,
    goal: ResourcesPerDay,
    config: &'a EngineConfig,
}

impl<'a> EffortAllocator<'a> {
    pub fn new(
        allocation: &'a mut ResourceAllocation,
        goal: ResourcesPerDay,
        config: &'a EngineConfig,
    ) -> Result<Self, AllocationError> {
        if goal.is_zero() {
            return Err(AllocationError::ZeroResourcesPerDay);
        }
        if allocation.resources().is_empty() {
            return Err(AllocationError::NoResources);
        }
        config
            .validate()
            .map_err(|err| AllocationError::InvalidConfig(err.to_string()))?;
        Ok(Self {
            allocation,
            goal,
            config,
        })
    }

    pub fn apply_allocation_on_all_task_length(&mut self) -> Result<(), AllocationError> {
        let task = self.allocation.task();
        let (start, end) = (task.start(), task.end());
        self.allocate_between(start, end, Direction::Forward)
    }

    /// Allocates from the task start up to `end` (exclusive).
    pub fn apply_allocation_until(&mut self, end: IntraDayDate) -> Result<(), AllocationError> {
        let start = self.allocation.task().start();
        self.allocate_between(start, end, Direction::Forward)
    }

    /// Allocates from the task end backwards down to `start`.
    pub fn apply_allocation_from_end_until(
        &mut self,
        start: IntraDayDate,
    ) -> Result<(), AllocationError> {
        let end = self.allocation.task().end();
        self.allocate_between(start, end, Direction::Backward)
    }

    /// Walks days from the task start (forward) or end (backward) until
    /// `effort` is assigned. Returns the new task end or start, which is
    /// also stored on the task window.
    pub fn until_allocating(
        &mut self,
        direction: Direction,
        effort: EffortDuration,
    ) -> Result<IntraDayDate, AllocationError> {
        if effort.is_zero() {
            return Err(AllocationError::ZeroEffort);
        }
        let lookahead = self.config.max_lookahead_days;
        let (window_start, window_end, days) = match direction {
            Direction::Forward => {
                let start = self.allocation.task().start();
                let end = IntraDayDate::start_of_day(plus_days(start.date(), lookahead)).max(start);
                (start, end, start.days_until(end))
            }
            Direction::Backward => {
                let end = self.allocation.task().end();
                let start = IntraDayDate::start_of_day(minus_days(end.date(), lookahead)).min(end);
                (start, end, start.days_until_backwards(end))
            }
        };

        let context = self.context();
        let mut distribution = Distribution::default();
        let mut remaining = effort;
        for day in days {
            if remaining.is_zero() {
                break;
            }
            let (effective_day, assignments) =
                context.assignments_at_day(day, Some(remaining), direction);
            let assigned: EffortDuration = assignments.iter().map(|a| a.duration).sum();
            if assigned.is_zero() {
                continue;
            }
            remaining = remaining.saturating_minus(assigned);
            distribution.push(effective_day, assignments, context.calendar.capacity_on(&effective_day));
        }

        let last_day = match distribution.last_day {
            Some(day) if remaining.is_zero() => day,
            Some(_) => {
                drop(context);
                self.allocation.mark_as_unsatisfied();
                return Err(AllocationError::InsufficientCapacity {
                    requested: effort,
                    allocated: effort.minus(remaining),
                    lookahead_days: lookahead,
                });
            }
            None => {
                let cause = context.classify(window_start, window_end);
                drop(context);
                return Err(self.fail(cause));
            }
        };

        let (start, end) = match direction {
            Direction::Forward => (window_start, context.normalize_end(last_day.end())),
            Direction::Backward => (last_day.start(), window_end),
        };
        let achieved = distribution.achieved_resources_per_day();
        debug!(
            allocation = %self.allocation.id(),
            ?direction,
            %effort,
            %start,
            %end,
            "allocated until effort reached"
        );
        drop(context);

        let goal = self.goal;
        self.allocation
            .reset_assignments_to(distribution.assignments, start, end, achieved, goal);
        match direction {
            Direction::Forward => {
                self.allocation.task_mut().set_end(end);
                Ok(end)
            }
            Direction::Backward => {
                self.allocation.task_mut().set_start(start);
                Ok(start)
            }
        }
    }

    fn allocate_between(
        &mut self,
        start: IntraDayDate,
        end: IntraDayDate,
        direction: Direction,
    ) -> Result<(), AllocationError> {
        if start > end {
            return Err(AllocationError::InvalidInterval { start, end });
        }
        if start == end {
            self.allocation.mark_as_unsatisfied();
            return Ok(());
        }
        let days = match direction {
            Direction::Forward => start.days_until(end),
            Direction::Backward => start.days_until_backwards(end),
        };

        let context = self.context();
        let mut distribution = Distribution::default();
        for day in days {
            let (day, assignments) = context.assignments_at_day(day, None, direction);
            if !assignments.is_empty() {
                distribution.push(day, assignments, context.calendar.capacity_on(&day));
            }
        }
        if distribution.assignments.is_empty() {
            let cause = context.classify(start, end);
            drop(context);
            return Err(self.fail(cause));
        }
        debug!(
            allocation = %self.allocation.id(),
            ?direction,
            assigned = %distribution.total(),
            %start,
            %end,
            "allocated interval"
        );
        let achieved = distribution.achieved_resources_per_day();
        drop(context);

        let goal = self.goal;
        self.allocation
            .reset_assignments_to(distribution.assignments, start, end, achieved, goal);
        Ok(())
    }

    fn context(&self) -> AllocationContext<'_> {
        let default_daily = self.config.default_daily_effort();
        let calendar = self.allocation.allocation_calendar(default_daily);
        let resources_availability = self.allocation.kind().availability();
        let task_availability = self
            .allocation
            .task()
            .calendar()
            .map(|c| c.availability())
            .unwrap_or_else(AvailabilityTimeLine::all_valid);
        let availability = resources_availability.and(&task_availability);
        AllocationContext {
            allocation: self.allocation.id(),
            calendar,
            resources_availability,
            availability,
            distributor: EffortDistributor::for_kind(self.allocation.kind()),
            goal: self.goal,
        }
    }

    fn fail(&mut self, cause: NoValidPeriodsCause) -> AllocationError {
        self.allocation.mark_as_unsatisfied();
        let scope = self.allocation.kind().scope();
        debug!(allocation = %self.allocation.id(), ?cause, "no valid periods");
        AllocationError::NoValidPeriods { scope, cause }
    }
}

struct AllocationContext<'k> {
    allocation: AllocationId,
    calendar: Arc<dyn Calendar>,
    resources_availability: AvailabilityTimeLine,
    availability: AvailabilityTimeLine,
    distributor: EffortDistributor<'k>,
    goal: ResourcesPerDay,
}

impl AllocationContext<'_> {
    /// Assignments for one day. With a `limit` smaller than what the day
    /// can take, the day is shrunk to the calendar time that limit needs.
    fn assignments_at_day(
        &self,
        day: PartialDay,
        limit: Option<EffortDuration>,
        direction: Direction,
    ) -> (PartialDay, Vec<DayAssignment>) {
        if !self.availability.is_valid(day.date()) {
            return (day, Vec::new());
        }
        let to_distribute = self.calendar.as_duration_on(&day, self.goal);
        if to_distribute.is_zero() {
            return (day, Vec::new());
        }
        let (effort, day) = match limit {
            Some(limit) if to_distribute >= limit => (limit, self.shrink(day, limit, direction)),
            _ => (to_distribute, day),
        };
        let assignments = self
            .distributor
            .distribute_for_day(&day, effort)
            .into_iter()
            .map(|(resource, duration)| DayAssignment {
                allocation: self.allocation,
                resource,
                day: day.date(),
                duration,
            })
            .collect();
        (day, assignments)
    }

    fn shrink(&self, day: PartialDay, effort: EffortDuration, direction: Direction) -> PartialDay {
        match direction {
            Direction::Forward => PartialDay::new(day.start(), day.start().increase_by(self.goal, effort)),
            Direction::Backward => {
                let end = IntraDayDate::create(
                    day.date(),
                    day.end_offset_within(self.working_day(day)),
                );
                let start = end.decrease_by(self.goal, effort).max(day.start());
                PartialDay::new(start, end)
            }
        }
    }

    fn working_day(&self, day: PartialDay) -> EffortDuration {
        self.calendar.capacity_on(&PartialDay::whole_day(day.date()))
    }

    /// An end that consumes the whole working day is the next day's start.
    fn normalize_end(&self, end: IntraDayDate) -> IntraDayDate {
        let working_day = self
            .calendar
            .capacity_on(&PartialDay::whole_day(end.date()));
        if !end.is_start_of_day() && end.offset() >= working_day {
            end.next_day_at_start()
        } else {
            end
        }
    }

    fn classify(&self, start: IntraDayDate, end: IntraDayDate) -> NoValidPeriodsCause {
        if self
            .resources_availability
            .has_valid_day_between(start.date(), end.as_exclusive_end())
        {
            NoValidPeriodsCause::CalendarIntersection
        } else {
            NoValidPeriodsCause::ResourcesNotAvailable
        }
    }
}

#[derive(Default)]
struct Distribution {
    assignments: Vec<DayAssignment>,
    workable: EffortDuration,
    last_day: Option<PartialDay>,
}

impl Distribution {
    fn push(&mut self, day: PartialDay, assignments: Vec<DayAssignment>, workable: EffortDuration) {
        self.assignments.extend(assignments);
        self.workable = self.workable.plus(workable);
        self.last_day = Some(day);
    }

    fn total(&self) -> EffortDuration {
        self.assignments.iter().map(|a| a.duration).sum()
    }

    fn achieved_resources_per_day(&self) -> ResourcesPerDay {
        ResourcesPerDay::calculate_from(self.total(), self.workable)
    }
}
