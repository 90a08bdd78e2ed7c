pub mod allocation;
pub mod availability;
pub mod calendar;
pub mod config;
pub mod effort;
pub mod graph;
pub mod intraday;
pub mod load;
pub mod persistence;
pub mod queue;
pub mod resource;

pub use allocation::{
    AllocationError, AllocationId, DayAssignment, Direction, EffortAllocator, ResourceAllocation,
    TaskWindow,
};
pub use availability::AvailabilityTimeLine;
pub use calendar::{Calendar, CombinedCalendar, SameWorkHoursEveryDay, WorkCalendar};
pub use config::EngineConfig;
pub use effort::{Capacity, EffortDuration, ResourcesPerDay};
pub use intraday::{IntraDayDate, PartialDay};
pub use load::{LoadChart, LoadLevel, LoadPeriod, PeriodsBuilder};
pub use queue::{LimitingResourceQueue, LimitingResourceQueueElement};
pub use resource::{Criterion, Resource, ResourceId};
