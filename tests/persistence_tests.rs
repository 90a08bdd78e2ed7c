use chrono::NaiveDate;
use schedule_allocation::allocation::{AllocationId, EffortAllocator, ResourceAllocation, TaskWindow};
use schedule_allocation::calendar::Calendar;
use schedule_allocation::effort::{EffortDuration, ResourcesPerDay};
use schedule_allocation::load::LoadChart;
use schedule_allocation::persistence::{
    PersistenceError, load_assignments_from_csv, load_scenario_from_json, save_assignments_to_csv,
    save_assignments_to_json, save_load_periods_to_csv, save_scenario_to_json,
    scenario_from_json_str,
};
use schedule_allocation::resource::{Criterion, ResourceId};
use std::fs;
use tempfile::NamedTempFile;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

const SCENARIO: &str = r#"{
    "config": { "max_lookahead_days": 120 },
    "calendars": [
        {
            "name": "four-day week",
            "versions": [
                {
                    "capacities": {
                        "Mon": { "standard_effort": "10:00" },
                        "Tue": { "standard_effort": "10:00" },
                        "Wed": { "standard_effort": "10:00" },
                        "Thu": { "standard_effort": "10:00" },
                        "Fri": { "standard_effort": "0:00" },
                        "Sat": { "standard_effort": "0:00" },
                        "Sun": { "standard_effort": "0:00" }
                    }
                }
            ],
            "exceptions": [
                { "date": "2024-01-16", "capacity": { "standard_effort": "0:00" }, "code": "holiday" }
            ]
        }
    ],
    "resources": [
        {
            "id": 1,
            "name": "ana",
            "calendar": "four-day week",
            "satisfactions": [
                { "criterion": { "kind": "skill", "name": "welder" }, "start": "2024-01-01" }
            ]
        },
        { "id": 2, "name": "crane", "limiting": true }
    ]
}"#;

#[test]
fn scenario_wires_calendars_and_criteria() {
    let scenario = scenario_from_json_str(SCENARIO).unwrap();
    assert_eq!(scenario.config.max_lookahead_days, 120);
    assert_eq!(scenario.config.default_daily_hours, 8);

    let ana = scenario.resource(ResourceId(1)).unwrap();
    let calendar = ana.calendar();
    assert_eq!(calendar.name(), "four-day week");
    assert_eq!(
        calendar.capacity_with_overtime(d(2024, 1, 15)).standard_effort(),
        EffortDuration::hours(10)
    );
    assert!(calendar.capacity_with_overtime(d(2024, 1, 16)).is_zero());

    let welders = scenario.resources_satisfying(&[Criterion::new("skill", "welder")]);
    assert_eq!(welders.len(), 1);
    let limiting: Vec<ResourceId> = scenario.limiting_resources().map(|r| r.id()).collect();
    assert_eq!(limiting, vec![ResourceId(2)]);
    assert_eq!(scenario.resource_by_name("crane").unwrap().calendar().name(), "default");
}

#[test]
fn unknown_calendar_is_invalid_data() {
    let raw = r#"{ "resources": [ { "id": 1, "name": "ana", "calendar": "nope" } ] }"#;
    assert!(matches!(
        scenario_from_json_str(raw),
        Err(PersistenceError::InvalidData(_))
    ));
}

#[test]
fn duplicate_resource_ids_are_invalid_data() {
    let raw = r#"{ "resources": [ { "id": 1, "name": "a" }, { "id": 1, "name": "b" } ] }"#;
    assert!(matches!(
        scenario_from_json_str(raw),
        Err(PersistenceError::InvalidData(_))
    ));
}

#[test]
fn invalid_config_inside_scenario_is_rejected() {
    let raw = r#"{ "config": { "max_lookahead_days": 0 }, "resources": [] }"#;
    assert!(matches!(
        scenario_from_json_str(raw),
        Err(PersistenceError::Config(_))
    ));
}

#[test]
fn misspelled_weekday_in_scenario_calendar_is_rejected() {
    let raw = r#"{
        "calendars": [ { "name": "odd", "versions": [ { "capacities": { "Fir": { "standard_effort": "8:00" } } } ] } ],
        "resources": []
    }"#;
    assert!(matches!(
        scenario_from_json_str(raw),
        Err(PersistenceError::Config(_))
    ));
}

#[test]
fn scenario_round_trips_through_a_file() {
    let scenario = scenario_from_json_str(SCENARIO).unwrap();
    let tmp = NamedTempFile::new().expect("create temp file");
    save_scenario_to_json(&scenario, tmp.path()).unwrap();
    let reloaded = load_scenario_from_json(tmp.path()).unwrap();

    assert_eq!(reloaded.resources.len(), 2);
    assert_eq!(reloaded.calendars.len(), 1);
    let ana = reloaded.resource(ResourceId(1)).unwrap();
    assert_eq!(ana.satisfactions(), scenario.resource(ResourceId(1)).unwrap().satisfactions());
    assert!(ana.calendar().capacity_with_overtime(d(2024, 1, 16)).is_zero());
    assert!(reloaded.resource(ResourceId(2)).unwrap().is_limiting());
}

#[test]
fn assignments_and_load_export() {
    let scenario = scenario_from_json_str(SCENARIO).unwrap();
    let ana = scenario.resource(ResourceId(1)).unwrap();
    let mut allocation = ResourceAllocation::specific(
        AllocationId(1),
        ana.clone(),
        // Monday to Friday exclusive; Tuesday is a holiday
        TaskWindow::between_dates(d(2024, 1, 15), d(2024, 1, 19)).unwrap(),
    );
    EffortAllocator::new(&mut allocation, ResourcesPerDay::amount(1), &scenario.config)
        .unwrap()
        .apply_allocation_on_all_task_length()
        .unwrap();
    let allocations = vec![allocation];

    let csv_file = NamedTempFile::new().expect("create temp file");
    save_assignments_to_csv(&allocations, csv_file.path()).unwrap();
    let loaded = load_assignments_from_csv(csv_file.path()).unwrap();
    assert_eq!(loaded, allocations[0].assignments());
    // the task calendar caps each day at the default 8h
    assert!(loaded.iter().all(|a| a.duration == EffortDuration::hours(8)));
    assert_eq!(loaded.len(), 3);

    let json_file = NamedTempFile::new().expect("create temp file");
    save_assignments_to_json(&allocations, json_file.path()).unwrap();
    let json = fs::read_to_string(json_file.path()).unwrap();
    assert!(json.contains("\"8:00\""));

    let chart = LoadChart::new(&scenario.resources, &allocations).build();
    let load_file = NamedTempFile::new().expect("create temp file");
    save_load_periods_to_csv(&chart, load_file.path()).unwrap();
    let load_csv = fs::read_to_string(load_file.path()).unwrap();
    let mut lines = load_csv.lines();
    assert_eq!(
        lines.next(),
        Some("resource,start,end,available_effort,assigned_effort,load_percentage,category")
    );
    // 24h assigned over 30h available
    assert_eq!(lines.next(), Some("1,2024-01-15 @ 0:00,2024-01-19 @ 0:00,30:00,24:00,80,SomeLoad"));
}
