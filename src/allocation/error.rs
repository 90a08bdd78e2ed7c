use crate::effort::EffortDuration;
use crate::intraday::IntraDayDate;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationScope {
    Generic,
    Specific,
}

/// Why an allocation found no day to put effort on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoValidPeriodsCause {
    /// The resources never satisfy the criteria, or their calendars are
    /// never available.
    ResourcesNotAvailable,
    /// The resources are available but not on any day the task calendar
    /// gives capacity to.
    CalendarIntersection,
}

impl NoValidPeriodsCause {
    pub fn message(self, scope: AllocationScope) -> &'static str {
        match (scope, self) {
            (AllocationScope::Generic, NoValidPeriodsCause::ResourcesNotAvailable) => {
                "There are no days available due to not satisfying the criteria. \
                 Another possibility is that the resources do not have days available \
                 due to their calendars."
            }
            (AllocationScope::Generic, NoValidPeriodsCause::CalendarIntersection) => {
                "There are no days available in the days marked available by the task \
                 calendar. Maybe the criteria are not satisfied in those days."
            }
            (AllocationScope::Specific, NoValidPeriodsCause::ResourcesNotAvailable) => {
                "Resource is not available from task's start"
            }
            (AllocationScope::Specific, NoValidPeriodsCause::CalendarIntersection) => {
                "Resource is not available according to task's calendar"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("resources per day must be greater than zero")]
    ZeroResourcesPerDay,
    #[error("effort to allocate must be greater than zero")]
    ZeroEffort,
    #[error("a generic allocation needs at least one resource")]
    NoResources,
    #[error("interval start {start} is after its end {end}")]
    InvalidInterval {
        start: IntraDayDate,
        end: IntraDayDate,
    },
    #[error("{}", cause.message(*scope))]
    NoValidPeriods {
        scope: AllocationScope,
        cause: NoValidPeriodsCause,
    },
    #[error(
        "only {allocated} of the requested {requested} fit in the next {lookahead_days} days"
    )]
    InsufficientCapacity {
        requested: EffortDuration,
        allocated: EffortDuration,
        lookahead_days: u32,
    },
    #[error("{0}")]
    InvalidConfig(String),
}
