use chrono::{NaiveDate, Weekday};
use schedule_allocation::calendar::{
    Calendar, CalendarAvailability, CalendarData, CombinedCalendar, SameWorkHoursEveryDay,
    WorkCalendar, WorkCalendarConfig,
};
use schedule_allocation::effort::{Capacity, EffortDuration, ResourcesPerDay};
use schedule_allocation::intraday::{IntraDayDate, PartialDay};
use std::sync::Arc;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn h(hours: u64) -> EffortDuration {
    EffortDuration::hours(hours)
}

#[test]
fn default_calendar_weekends_have_no_capacity() {
    let cal = WorkCalendar::default();
    // 2025-01-04 is a Saturday, 2025-01-05 is a Sunday
    assert!(cal.capacity_with_overtime(d(2025, 1, 4)).is_zero());
    assert!(cal.capacity_with_overtime(d(2025, 1, 5)).is_zero());
    assert!(!cal.is_working_day(d(2025, 1, 4)));
}

#[test]
fn default_calendar_weekdays_are_eight_hours() {
    let cal = WorkCalendar::default();
    let thursday = d(2025, 1, 2);
    let capacity = cal.capacity_with_overtime(thursday);
    assert_eq!(capacity.standard_effort(), h(8));
    assert!(capacity.is_over_assignable_without_limit());
    assert_eq!(cal.capacity_on(&PartialDay::whole_day(thursday)), h(8));
}

#[test]
fn exception_overrides_weekday() {
    let mut cal = WorkCalendar::default();
    cal.add_exception(d(2025, 1, 6), Capacity::zero());
    cal.add_exception(d(2025, 1, 4), Capacity::create(h(4)));
    assert!(cal.capacity_with_overtime(d(2025, 1, 6)).is_zero());
    assert_eq!(cal.capacity_with_overtime(d(2025, 1, 4)).standard_effort(), h(4));
}

#[test]
fn parent_fills_missing_weekdays() {
    let parent = Arc::new(WorkCalendar::working_week("base", h(8)));
    let mut child = WorkCalendar::derived_from("part-time", parent);
    child.set_weekday_capacity(Weekday::Fri, Some(Capacity::create(h(4))));
    // Friday from the child, Monday inherited
    assert_eq!(child.capacity_with_overtime(d(2025, 1, 10)).standard_effort(), h(4));
    assert_eq!(child.capacity_with_overtime(d(2025, 1, 6)).standard_effort(), h(8));
}

#[test]
fn parent_exceptions_apply_to_children() {
    let mut parent = WorkCalendar::working_week("base", h(8));
    parent.add_exception(d(2025, 1, 6), Capacity::zero());
    let child = WorkCalendar::derived_from("team", Arc::new(parent));
    assert!(child.capacity_with_overtime(d(2025, 1, 6)).is_zero());
}

#[test]
fn versions_switch_on_expiring_date() {
    let mut cal = WorkCalendar::new("changing");
    cal.add_version(
        CalendarData::new(Some(d(2025, 1, 8))).with_capacity(Weekday::Mon, Capacity::create(h(6))),
    );
    cal.set_weekday_capacity(Weekday::Mon, Some(Capacity::create(h(8))));
    assert_eq!(cal.capacity_with_overtime(d(2025, 1, 6)).standard_effort(), h(6));
    assert_eq!(cal.capacity_with_overtime(d(2025, 1, 13)).standard_effort(), h(8));
}

#[test]
fn chain_without_capacity_falls_back_to_zero() {
    let cal = WorkCalendar::new("empty");
    assert_eq!(cal.resolved_capacity(d(2025, 1, 6)), None);
    assert!(cal.capacity_with_overtime(d(2025, 1, 6)).is_zero());
}

#[test]
fn availability_windows_bound_capacity() {
    let mut cal = WorkCalendar::default();
    cal.add_availability(CalendarAvailability::new(d(2025, 1, 6), Some(d(2025, 1, 7))));
    assert!(cal.capacity_with_overtime(d(2025, 1, 3)).is_zero());
    assert_eq!(cal.capacity_with_overtime(d(2025, 1, 7)).standard_effort(), h(8));
    assert!(cal.capacity_with_overtime(d(2025, 1, 8)).is_zero());

    let availability = cal.availability();
    assert!(availability.is_valid(d(2025, 1, 7)));
    assert!(!availability.is_valid(d(2025, 1, 8)));
}

#[test]
fn total_capacity_skips_weekend() {
    let cal = WorkCalendar::default();
    // Mon 2025-01-06 .. Mon 2025-01-13 exclusive
    assert_eq!(cal.total_capacity_between(d(2025, 1, 6), d(2025, 1, 13)), h(40));
}

#[test]
fn partial_day_limits_capacity() {
    let cal = WorkCalendar::default();
    let day = PartialDay::new(
        IntraDayDate::create(d(2025, 1, 6), h(2)),
        IntraDayDate::create(d(2025, 1, 6), h(5)),
    );
    assert_eq!(cal.capacity_on(&day), h(3));
}

#[test]
fn overtime_allowance_caps_intensity() {
    let mut cal = WorkCalendar::new("strict");
    cal.set_weekday_capacity(
        Weekday::Mon,
        Some(Capacity::create(h(8)).with_allowed_extra_effort(h(2))),
    );
    let monday = PartialDay::whole_day(d(2025, 1, 6));
    assert_eq!(cal.as_duration_on(&monday, ResourcesPerDay::amount(2)), h(10));
    assert_eq!(cal.as_duration_on(&monday, ResourcesPerDay::from_hundredths(50)), h(4));
}

#[test]
fn combined_max_is_not_a_sum() {
    let a: Arc<dyn Calendar> = Arc::new(WorkCalendar::working_week("a", h(8)));
    let b: Arc<dyn Calendar> = Arc::new(WorkCalendar::working_week("b", h(6)));
    let max = CombinedCalendar::max_of(vec![a.clone(), b.clone()]);
    let min = CombinedCalendar::min_of(vec![a, b]);
    let monday = PartialDay::whole_day(d(2025, 1, 6));
    assert_eq!(max.capacity_on(&monday), h(8));
    assert_eq!(min.capacity_on(&monday), h(6));
}

#[test]
fn empty_min_combination_has_no_valid_days() {
    let none = CombinedCalendar::min_of(Vec::new());
    assert!(none.availability().is_all_invalid());
    assert!(none.capacity_with_overtime(d(2025, 1, 6)).is_zero());
}

#[test]
fn same_hours_every_day_includes_weekends() {
    let cal = SameWorkHoursEveryDay::new(h(6));
    assert_eq!(cal.capacity_on(&PartialDay::whole_day(d(2025, 1, 4))), h(6));
}

#[test]
fn config_round_trip_keeps_capacities() {
    let mut cal = WorkCalendar::working_week("ops", h(7));
    cal.add_exception(d(2025, 12, 25), Capacity::zero());
    let config = cal.to_config();
    let json = serde_json::to_string(&config).unwrap();
    let parsed: WorkCalendarConfig = serde_json::from_str(&json).unwrap();
    let rebuilt = WorkCalendar::from_config(&parsed).unwrap();

    assert_eq!(rebuilt.name(), "ops");
    assert_eq!(rebuilt.capacity_with_overtime(d(2025, 1, 6)).standard_effort(), h(7));
    assert!(rebuilt.capacity_with_overtime(d(2025, 12, 25)).is_zero());
    assert_eq!(
        parsed.working_days(),
        vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri]
    );
}

#[test]
fn misspelled_weekday_in_config_is_an_error() {
    let raw = r#"{
        "name": "typo",
        "versions": [{ "capacities": { "Mon": { "standard_effort": "8:00" }, "Fir": { "standard_effort": "4:00" } } }]
    }"#;
    let config: WorkCalendarConfig = serde_json::from_str(raw).unwrap();
    let err = WorkCalendar::from_config(&config).unwrap_err();
    assert!(err.to_string().contains("unknown weekday 'Fir'"));
    assert_eq!(config.working_days(), vec![Weekday::Mon]);
}
