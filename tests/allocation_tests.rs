use chrono::{NaiveDate, Weekday};
use schedule_allocation::allocation::{
    AllocationError, AllocationId, AllocationScope, Direction, EffortAllocator,
    NoValidPeriodsCause, ResourceAllocation, TaskWindow,
};
use schedule_allocation::calendar::{Calendar, WorkCalendar};
use schedule_allocation::config::EngineConfig;
use schedule_allocation::effort::{Capacity, EffortDuration, ResourcesPerDay};
use schedule_allocation::intraday::IntraDayDate;
use schedule_allocation::resource::{Criterion, CriterionSatisfaction, Resource, ResourceId};
use std::sync::Arc;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn h(hours: u64) -> EffortDuration {
    EffortDuration::hours(hours)
}

fn at(date: NaiveDate, hours: u64) -> IntraDayDate {
    IntraDayDate::create(date, h(hours))
}

fn worker(id: u32) -> Arc<Resource> {
    Arc::new(Resource::new(ResourceId(id), format!("worker-{id}")))
}

fn welder() -> Criterion {
    Criterion::new("skill", "welder")
}

fn welder_from(id: u32, start: NaiveDate) -> Arc<Resource> {
    Arc::new(
        Resource::new(ResourceId(id), format!("welder-{id}"))
            .with_satisfaction(CriterionSatisfaction::new(welder(), start, None)),
    )
}

/// Welder on a Monday to Friday calendar of `hours` without overtime.
fn strict_welder_from(id: u32, start: NaiveDate, hours: u64) -> Arc<Resource> {
    let mut calendar = WorkCalendar::new(format!("strict-{hours}h"));
    for weekday in [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri] {
        calendar.set_weekday_capacity(weekday, Some(Capacity::create(h(hours))));
    }
    Arc::new(
        Resource::new(ResourceId(id), format!("welder-{id}"))
            .with_calendar(Arc::new(calendar))
            .with_satisfaction(CriterionSatisfaction::new(welder(), start, None)),
    )
}

fn per_resource(allocation: &ResourceAllocation) -> Vec<(ResourceId, EffortDuration)> {
    allocation
        .assignments()
        .iter()
        .map(|a| (a.resource, a.duration))
        .collect()
}

fn specific(task: TaskWindow) -> ResourceAllocation {
    ResourceAllocation::specific(AllocationId(1), worker(1), task)
}

fn point(date: NaiveDate, hours: u64) -> TaskWindow {
    let p = at(date, hours);
    TaskWindow::new(p, p).unwrap()
}

fn durations(allocation: &ResourceAllocation) -> Vec<(NaiveDate, EffortDuration)> {
    allocation
        .assignments()
        .iter()
        .map(|a| (a.day, a.duration))
        .collect()
}

#[test]
fn full_intensity_over_three_weekdays() {
    let config = EngineConfig::default();
    // Monday 2024-01-15 to Thursday exclusive
    let mut allocation = specific(TaskWindow::between_dates(d(2024, 1, 15), d(2024, 1, 18)).unwrap());
    EffortAllocator::new(&mut allocation, ResourcesPerDay::amount(1), &config)
        .unwrap()
        .apply_allocation_on_all_task_length()
        .unwrap();

    assert_eq!(
        durations(&allocation),
        vec![(d(2024, 1, 15), h(8)), (d(2024, 1, 16), h(8)), (d(2024, 1, 17), h(8))]
    );
    assert_eq!(allocation.assigned_effort(), h(24));
    assert_eq!(allocation.resources_per_day(), Some(ResourcesPerDay::amount(1)));
    assert!(allocation.is_satisfied());
}

#[test]
fn half_intensity_halves_each_day() {
    let config = EngineConfig::default();
    let mut allocation = specific(TaskWindow::between_dates(d(2024, 1, 15), d(2024, 1, 18)).unwrap());
    EffortAllocator::new(&mut allocation, ResourcesPerDay::from_hundredths(50), &config)
        .unwrap()
        .apply_allocation_on_all_task_length()
        .unwrap();

    assert!(allocation.assignments().iter().all(|a| a.duration == h(4)));
    assert_eq!(allocation.assignments().len(), 3);
    assert_eq!(allocation.resources_per_day(), Some(ResourcesPerDay::from_hundredths(50)));
    assert_eq!(allocation.intended_resources_per_day(), Some(ResourcesPerDay::from_hundredths(50)));
}

#[test]
fn weekend_days_get_nothing() {
    let config = EngineConfig::default();
    // Friday to Tuesday exclusive
    let mut allocation = specific(TaskWindow::between_dates(d(2024, 1, 19), d(2024, 1, 23)).unwrap());
    EffortAllocator::new(&mut allocation, ResourcesPerDay::amount(1), &config)
        .unwrap()
        .apply_allocation_on_all_task_length()
        .unwrap();

    let days: Vec<NaiveDate> = allocation.assignments().iter().map(|a| a.day).collect();
    assert_eq!(days, vec![d(2024, 1, 19), d(2024, 1, 22)]);
}

#[test]
fn generic_pool_uses_max_capacity_not_sum() {
    let config = EngineConfig::default();
    let resources = vec![welder_from(1, d(2024, 1, 1)), welder_from(2, d(2024, 1, 1))];
    let mut allocation = ResourceAllocation::generic(
        AllocationId(7),
        vec![welder()],
        resources,
        TaskWindow::between_dates(d(2024, 1, 15), d(2024, 1, 16)).unwrap(),
    );
    EffortAllocator::new(&mut allocation, ResourcesPerDay::amount(1), &config)
        .unwrap()
        .apply_allocation_on_all_task_length()
        .unwrap();

    assert_eq!(allocation.assigned_effort(), h(8));
    let per_resource: Vec<(ResourceId, EffortDuration)> = allocation
        .assignments()
        .iter()
        .map(|a| (a.resource, a.duration))
        .collect();
    assert_eq!(per_resource, vec![(ResourceId(1), h(4)), (ResourceId(2), h(4))]);
}

#[test]
fn generic_pool_skips_resources_not_yet_qualified() {
    let config = EngineConfig::default();
    let resources = vec![welder_from(1, d(2024, 1, 1)), welder_from(2, d(2024, 1, 16))];
    let mut allocation = ResourceAllocation::generic(
        AllocationId(7),
        vec![welder()],
        resources,
        TaskWindow::between_dates(d(2024, 1, 15), d(2024, 1, 17)).unwrap(),
    );
    EffortAllocator::new(&mut allocation, ResourcesPerDay::amount(1), &config)
        .unwrap()
        .apply_allocation_on_all_task_length()
        .unwrap();

    let monday: Vec<ResourceId> = allocation
        .assignments_between(d(2024, 1, 15), d(2024, 1, 16))
        .map(|a| a.resource)
        .collect();
    assert_eq!(monday, vec![ResourceId(1)]);
    assert_eq!(allocation.assignments_by_day()[&d(2024, 1, 16)], h(8));
}

#[test]
fn weekend_only_window_fails_on_calendar_intersection() {
    let config = EngineConfig::default();
    // Saturday and Sunday
    let mut allocation = specific(TaskWindow::between_dates(d(2024, 1, 20), d(2024, 1, 22)).unwrap());
    let err = EffortAllocator::new(&mut allocation, ResourcesPerDay::amount(1), &config)
        .unwrap()
        .apply_allocation_on_all_task_length()
        .unwrap_err();

    assert_eq!(
        err,
        AllocationError::NoValidPeriods {
            scope: AllocationScope::Specific,
            cause: NoValidPeriodsCause::CalendarIntersection,
        }
    );
    assert_eq!(err.to_string(), "Resource is not available according to task's calendar");
    assert!(!allocation.is_satisfied());
}

#[test]
fn unsatisfied_criteria_fail_with_criteria_message() {
    let config = EngineConfig::default();
    let mut allocation = ResourceAllocation::generic(
        AllocationId(3),
        vec![welder()],
        vec![welder_from(1, d(2024, 2, 1))],
        TaskWindow::between_dates(d(2024, 1, 15), d(2024, 1, 18)).unwrap(),
    );
    let err = EffortAllocator::new(&mut allocation, ResourcesPerDay::amount(1), &config)
        .unwrap()
        .apply_allocation_on_all_task_length()
        .unwrap_err();

    assert_eq!(
        err,
        AllocationError::NoValidPeriods {
            scope: AllocationScope::Generic,
            cause: NoValidPeriodsCause::ResourcesNotAvailable,
        }
    );
    assert!(err.to_string().starts_with("There are no days available due to not satisfying the criteria."));
}

#[test]
fn weekend_window_on_generic_pool_blames_the_task_calendar() {
    let config = EngineConfig::default();
    let mut allocation = ResourceAllocation::generic(
        AllocationId(3),
        vec![welder()],
        vec![welder_from(1, d(2024, 1, 1))],
        TaskWindow::between_dates(d(2024, 1, 20), d(2024, 1, 22)).unwrap(),
    );
    let err = EffortAllocator::new(&mut allocation, ResourcesPerDay::amount(1), &config)
        .unwrap()
        .apply_allocation_on_all_task_length()
        .unwrap_err();
    assert!(err.to_string().starts_with("There are no days available in the days marked available by the task calendar."));
}

#[test]
fn zero_goal_and_missing_resources_are_rejected() {
    let config = EngineConfig::default();
    let task = TaskWindow::between_dates(d(2024, 1, 15), d(2024, 1, 16)).unwrap();
    let mut allocation = specific(task.clone());
    assert!(matches!(
        EffortAllocator::new(&mut allocation, ResourcesPerDay::amount(0), &config),
        Err(AllocationError::ZeroResourcesPerDay)
    ));

    let mut empty = ResourceAllocation::generic(AllocationId(2), vec![welder()], Vec::new(), task);
    assert!(matches!(
        EffortAllocator::new(&mut empty, ResourcesPerDay::amount(1), &config),
        Err(AllocationError::NoResources)
    ));
}

#[test]
fn inverted_interval_is_an_error() {
    assert!(matches!(
        TaskWindow::between_dates(d(2024, 1, 18), d(2024, 1, 15)),
        Err(AllocationError::InvalidInterval { .. })
    ));

    let config = EngineConfig::default();
    let mut allocation = specific(TaskWindow::between_dates(d(2024, 1, 15), d(2024, 1, 18)).unwrap());
    let err = EffortAllocator::new(&mut allocation, ResourcesPerDay::amount(1), &config)
        .unwrap()
        .apply_allocation_until(IntraDayDate::start_of_day(d(2024, 1, 10)))
        .unwrap_err();
    assert!(matches!(err, AllocationError::InvalidInterval { .. }));
}

#[test]
fn empty_interval_leaves_allocation_unsatisfied() {
    let config = EngineConfig::default();
    let mut allocation = specific(point(d(2024, 1, 15), 0));
    EffortAllocator::new(&mut allocation, ResourcesPerDay::amount(1), &config)
        .unwrap()
        .apply_allocation_on_all_task_length()
        .unwrap();
    assert!(!allocation.is_satisfied());
    assert_eq!(allocation.resources_per_day(), None);
}

#[test]
fn reallocation_replaces_previous_assignments() {
    let config = EngineConfig::default();
    let mut allocation = specific(TaskWindow::between_dates(d(2024, 1, 15), d(2024, 1, 18)).unwrap());
    let mut allocator = EffortAllocator::new(&mut allocation, ResourcesPerDay::amount(1), &config).unwrap();
    allocator.apply_allocation_on_all_task_length().unwrap();
    allocator
        .apply_allocation_until(IntraDayDate::start_of_day(d(2024, 1, 16)))
        .unwrap();
    assert_eq!(durations(&allocation), vec![(d(2024, 1, 15), h(8))]);
}

#[test]
fn backward_interval_covers_same_days() {
    let config = EngineConfig::default();
    let mut allocation = specific(TaskWindow::between_dates(d(2024, 1, 15), d(2024, 1, 18)).unwrap());
    EffortAllocator::new(&mut allocation, ResourcesPerDay::amount(1), &config)
        .unwrap()
        .apply_allocation_from_end_until(IntraDayDate::start_of_day(d(2024, 1, 16)))
        .unwrap();
    assert_eq!(
        durations(&allocation),
        vec![(d(2024, 1, 16), h(8)), (d(2024, 1, 17), h(8))]
    );
}

#[test]
fn forward_effort_ending_on_a_day_boundary_moves_to_next_day() {
    let config = EngineConfig::default();
    let mut allocation = specific(point(d(2024, 1, 15), 0));
    let end = EffortAllocator::new(&mut allocation, ResourcesPerDay::amount(2), &config)
        .unwrap()
        .until_allocating(Direction::Forward, h(32))
        .unwrap();
    assert_eq!(end, IntraDayDate::start_of_day(d(2024, 1, 17)));
    assert_eq!(allocation.task().end(), end);
    assert_eq!(allocation.end(), end);
    assert_eq!(allocation.assigned_effort(), h(32));
}

#[test]
fn forward_effort_stops_inside_the_last_day() {
    let config = EngineConfig::default();
    let mut allocation = specific(point(d(2024, 1, 15), 0));
    let end = EffortAllocator::new(&mut allocation, ResourcesPerDay::amount(1), &config)
        .unwrap()
        .until_allocating(Direction::Forward, h(31))
        .unwrap();
    assert_eq!(end, at(d(2024, 1, 18), 7));
    assert_eq!(
        durations(&allocation),
        vec![
            (d(2024, 1, 15), h(8)),
            (d(2024, 1, 16), h(8)),
            (d(2024, 1, 17), h(8)),
            (d(2024, 1, 18), h(7)),
        ]
    );
}

#[test]
fn forward_effort_at_double_intensity() {
    let config = EngineConfig::default();
    let mut allocation = specific(point(d(2024, 1, 15), 0));
    let end = EffortAllocator::new(&mut allocation, ResourcesPerDay::amount(2), &config)
        .unwrap()
        .until_allocating(Direction::Forward, h(20))
        .unwrap();
    assert_eq!(end, at(d(2024, 1, 16), 2));
}

#[test]
fn forward_effort_from_mid_day_fills_the_rest_of_it() {
    let config = EngineConfig::default();
    let mut allocation = specific(point(d(2024, 1, 15), 1));
    let end = EffortAllocator::new(&mut allocation, ResourcesPerDay::amount(1), &config)
        .unwrap()
        .until_allocating(Direction::Forward, h(7))
        .unwrap();
    assert_eq!(end, IntraDayDate::start_of_day(d(2024, 1, 16)));
    assert_eq!(durations(&allocation), vec![(d(2024, 1, 15), h(7))]);
}

#[test]
fn backward_effort_from_day_start() {
    let config = EngineConfig::default();
    // 2024-01-20 is a Saturday; the 18th and 19th are Thursday and Friday
    let cases = [
        (1, 16, IntraDayDate::start_of_day(d(2024, 1, 18))),
        (1, 14, at(d(2024, 1, 18), 2)),
        (2, 20, at(d(2024, 1, 18), 6)),
    ];
    for (rpd, effort, expected) in cases {
        let mut allocation = specific(point(d(2024, 1, 20), 0));
        let start = EffortAllocator::new(&mut allocation, ResourcesPerDay::amount(rpd), &config)
            .unwrap()
            .until_allocating(Direction::Backward, h(effort))
            .unwrap();
        assert_eq!(start, expected, "{effort}h at {rpd} resources per day");
        assert_eq!(allocation.task().start(), expected);
        assert_eq!(allocation.assigned_effort(), h(effort));
    }
}

#[test]
fn backward_effort_from_mid_day() {
    let config = EngineConfig::default();
    let mut allocation = specific(point(d(2024, 1, 19), 4));
    let start = EffortAllocator::new(&mut allocation, ResourcesPerDay::amount(2), &config)
        .unwrap()
        .until_allocating(Direction::Backward, h(6))
        .unwrap();
    assert_eq!(start, at(d(2024, 1, 19), 1));
    assert_eq!(durations(&allocation), vec![(d(2024, 1, 19), h(6))]);
}

#[test]
fn forward_then_backward_lands_on_the_same_start() {
    let config = EngineConfig::default();
    let mut forward = specific(point(d(2024, 1, 15), 0));
    let end = EffortAllocator::new(&mut forward, ResourcesPerDay::amount(1), &config)
        .unwrap()
        .until_allocating(Direction::Forward, h(31))
        .unwrap();

    let mut backward = specific(TaskWindow::new(end, end).unwrap());
    let start = EffortAllocator::new(&mut backward, ResourcesPerDay::amount(1), &config)
        .unwrap()
        .until_allocating(Direction::Backward, h(31))
        .unwrap();
    assert_eq!(start, IntraDayDate::start_of_day(d(2024, 1, 15)));
    assert_eq!(durations(&forward), durations(&backward));
}

#[test]
fn zero_effort_is_rejected() {
    let config = EngineConfig::default();
    let mut allocation = specific(point(d(2024, 1, 15), 0));
    let err = EffortAllocator::new(&mut allocation, ResourcesPerDay::amount(1), &config)
        .unwrap()
        .until_allocating(Direction::Forward, EffortDuration::zero())
        .unwrap_err();
    assert_eq!(err, AllocationError::ZeroEffort);
}

#[test]
fn calendar_without_capacity_terminates() {
    let config = EngineConfig {
        max_lookahead_days: 30,
        ..EngineConfig::default()
    };
    let idle = Arc::new(
        Resource::new(ResourceId(9), "idle").with_calendar(Arc::new(WorkCalendar::new("idle"))),
    );
    let mut allocation =
        ResourceAllocation::specific(AllocationId(1), idle, point(d(2024, 1, 15), 0));
    let err = EffortAllocator::new(&mut allocation, ResourcesPerDay::amount(1), &config)
        .unwrap()
        .until_allocating(Direction::Forward, h(8))
        .unwrap_err();
    assert!(matches!(err, AllocationError::NoValidPeriods { .. }));
}

#[test]
fn effort_beyond_lookahead_reports_what_fit() {
    let config = EngineConfig {
        max_lookahead_days: 7,
        ..EngineConfig::default()
    };
    let mut allocation = specific(point(d(2024, 1, 15), 0));
    let err = EffortAllocator::new(&mut allocation, ResourcesPerDay::amount(1), &config)
        .unwrap()
        .until_allocating(Direction::Forward, h(100))
        .unwrap_err();
    assert_eq!(
        err,
        AllocationError::InsufficientCapacity {
            requested: h(100),
            allocated: h(40),
            lookahead_days: 7,
        }
    );
    assert!(!allocation.is_satisfied());
}

#[test]
fn task_calendar_restricts_the_resource() {
    let config = EngineConfig::default();
    let mut task_calendar = WorkCalendar::working_week("short", h(4));
    task_calendar.add_exception(d(2024, 1, 16), Capacity::zero());
    let task = TaskWindow::between_dates(d(2024, 1, 15), d(2024, 1, 18))
        .unwrap()
        .with_calendar(Arc::new(task_calendar) as Arc<dyn Calendar>);
    let mut allocation = specific(task);
    EffortAllocator::new(&mut allocation, ResourcesPerDay::amount(1), &config)
        .unwrap()
        .apply_allocation_on_all_task_length()
        .unwrap();
    assert_eq!(
        durations(&allocation),
        vec![(d(2024, 1, 15), h(4)), (d(2024, 1, 17), h(4))]
    );
}

#[test]
fn generic_share_never_exceeds_a_part_timer_capacity() {
    let config = EngineConfig::default();
    // the full-timer only qualifies from Wednesday
    let resources = vec![
        strict_welder_from(1, d(2024, 1, 1), 4),
        welder_from(2, d(2024, 1, 17)),
    ];
    let mut allocation = ResourceAllocation::generic(
        AllocationId(3),
        vec![welder()],
        resources,
        TaskWindow::between_dates(d(2024, 1, 15), d(2024, 1, 16)).unwrap(),
    );
    EffortAllocator::new(&mut allocation, ResourcesPerDay::amount(1), &config)
        .unwrap()
        .apply_allocation_on_all_task_length()
        .unwrap();

    assert_eq!(per_resource(&allocation), vec![(ResourceId(1), h(4))]);
}

#[test]
fn generic_excess_moves_to_resources_with_room() {
    let config = EngineConfig::default();
    let resources = vec![
        strict_welder_from(1, d(2024, 1, 1), 2),
        welder_from(2, d(2024, 1, 1)),
    ];
    let mut allocation = ResourceAllocation::generic(
        AllocationId(3),
        vec![welder()],
        resources,
        TaskWindow::between_dates(d(2024, 1, 15), d(2024, 1, 16)).unwrap(),
    );
    EffortAllocator::new(&mut allocation, ResourcesPerDay::amount(1), &config)
        .unwrap()
        .apply_allocation_on_all_task_length()
        .unwrap();

    assert_eq!(
        per_resource(&allocation),
        vec![(ResourceId(1), h(2)), (ResourceId(2), h(6))]
    );
    assert_eq!(allocation.assigned_effort(), h(8));
}

#[test]
fn generic_effort_walk_keeps_going_past_capped_days() {
    let config = EngineConfig::default();
    let resources = vec![strict_welder_from(1, d(2024, 1, 1), 4), welder_from(2, d(2024, 2, 1))];
    let mut allocation = ResourceAllocation::generic(
        AllocationId(3),
        vec![welder()],
        resources,
        point(d(2024, 1, 15), 0),
    );
    let end = EffortAllocator::new(&mut allocation, ResourcesPerDay::amount(1), &config)
        .unwrap()
        .until_allocating(Direction::Forward, h(8))
        .unwrap();

    assert_eq!(allocation.assigned_effort(), h(8));
    assert_eq!(
        durations(&allocation),
        vec![(d(2024, 1, 15), h(4)), (d(2024, 1, 16), h(4))]
    );
    assert_eq!(end, at(d(2024, 1, 16), 4));
}

#[test]
fn invalid_engine_config_is_refused_up_front() {
    let config = EngineConfig {
        max_lookahead_days: 0,
        ..EngineConfig::default()
    };
    let mut allocation = specific(point(d(2024, 1, 15), 2));
    assert!(matches!(
        EffortAllocator::new(&mut allocation, ResourcesPerDay::amount(1), &config),
        Err(AllocationError::InvalidConfig(_))
    ));
}
