use super::{PersistenceError, PersistenceResult};
use crate::allocation::{AllocationId, DayAssignment, ResourceAllocation};
use crate::calendar::{WorkCalendar, WorkCalendarConfig};
use crate::config::EngineConfig;
use crate::effort::EffortDuration;
use crate::load::LoadPeriod;
use crate::resource::{Criterion, CriterionSatisfaction, Resource, ResourceId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Resources and calendars the engine works against, plus its settings.
#[derive(Debug, Clone, Default)]
pub struct Scenario {
    pub config: EngineConfig,
    pub calendars: BTreeMap<String, Arc<WorkCalendar>>,
    pub resources: Vec<Arc<Resource>>,
}

impl Scenario {
    pub fn resource(&self, id: ResourceId) -> Option<&Arc<Resource>> {
        self.resources.iter().find(|r| r.id() == id)
    }

    pub fn resource_by_name(&self, name: &str) -> Option<&Arc<Resource>> {
        self.resources.iter().find(|r| r.name() == name)
    }

    /// Resources that satisfy every one of `criteria` at some point.
    pub fn resources_satisfying(&self, criteria: &[Criterion]) -> Vec<Arc<Resource>> {
        self.resources
            .iter()
            .filter(|r| {
                criteria.iter().all(|c| {
                    r.satisfactions().iter().any(|s| &s.criterion == c)
                })
            })
            .cloned()
            .collect()
    }

    pub fn limiting_resources(&self) -> impl Iterator<Item = &Arc<Resource>> {
        self.resources.iter().filter(|r| r.is_limiting())
    }
}

#[derive(Serialize, Deserialize)]
struct ScenarioSnapshot {
    #[serde(default)]
    config: EngineConfig,
    #[serde(default)]
    calendars: Vec<WorkCalendarConfig>,
    resources: Vec<ResourceRecord>,
}

#[derive(Serialize, Deserialize)]
struct ResourceRecord {
    id: u32,
    name: String,
    #[serde(default)]
    calendar: Option<String>,
    #[serde(default)]
    satisfactions: Vec<CriterionSatisfaction>,
    #[serde(default)]
    limiting: bool,
}

impl ScenarioSnapshot {
    fn from_scenario(scenario: &Scenario) -> Self {
        let mut by_name: BTreeMap<&str, &WorkCalendar> = scenario
            .calendars
            .iter()
            .map(|(name, calendar)| (name.as_str(), calendar.as_ref()))
            .collect();
        for calendar in scenario.resources.iter().filter_map(|r| r.own_calendar()) {
            by_name.entry(calendar.name()).or_insert(calendar.as_ref());
        }
        let calendars = by_name.values().map(|c| c.to_config()).collect();
        let resources = scenario
            .resources
            .iter()
            .map(|r| ResourceRecord {
                id: r.id().0,
                name: r.name().to_string(),
                calendar: r.own_calendar().map(|c| c.name().to_string()),
                satisfactions: r.satisfactions().to_vec(),
                limiting: r.is_limiting(),
            })
            .collect();
        Self {
            config: scenario.config.clone(),
            calendars,
            resources,
        }
    }

    fn into_scenario(self) -> PersistenceResult<Scenario> {
        self.config.validate()?;

        let mut calendars = BTreeMap::new();
        for config in &self.calendars {
            let calendar = Arc::new(WorkCalendar::from_config(config)?);
            if calendars.insert(config.name.clone(), calendar).is_some() {
                return Err(PersistenceError::InvalidData(format!(
                    "duplicate calendar name '{}'",
                    config.name
                )));
            }
        }

        let mut seen_ids = HashSet::with_capacity(self.resources.len());
        let mut resources = Vec::with_capacity(self.resources.len());
        for record in self.resources {
            if !seen_ids.insert(record.id) {
                return Err(PersistenceError::InvalidData(format!(
                    "duplicate resource id {}",
                    record.id
                )));
            }
            for satisfaction in &record.satisfactions {
                if satisfaction.end.is_some_and(|end| end < satisfaction.start) {
                    return Err(PersistenceError::InvalidData(format!(
                        "resource {} satisfies {} ending before it starts",
                        record.id, satisfaction.criterion
                    )));
                }
            }
            let mut resource = Resource::new(ResourceId(record.id), record.name)
                .limiting(record.limiting);
            if let Some(name) = record.calendar {
                let calendar = calendars.get(&name).ok_or_else(|| {
                    PersistenceError::InvalidData(format!(
                        "resource {} uses unknown calendar '{name}'",
                        record.id
                    ))
                })?;
                resource = resource.with_calendar(Arc::clone(calendar));
            }
            for satisfaction in record.satisfactions {
                resource = resource.with_satisfaction(satisfaction);
            }
            resources.push(Arc::new(resource));
        }

        Ok(Scenario {
            config: self.config,
            calendars,
            resources,
        })
    }
}

pub fn scenario_from_json_str(raw: &str) -> PersistenceResult<Scenario> {
    let snapshot: ScenarioSnapshot = serde_json::from_str(raw)?;
    snapshot.into_scenario()
}

pub fn load_scenario_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<Scenario> {
    let raw = fs::read_to_string(path.as_ref())?;
    let scenario = scenario_from_json_str(&raw)?;
    info!(
        path = %path.as_ref().display(),
        resources = scenario.resources.len(),
        calendars = scenario.calendars.len(),
        "loaded scenario"
    );
    Ok(scenario)
}

pub fn save_scenario_to_json<P: AsRef<Path>>(
    scenario: &Scenario,
    path: P,
) -> PersistenceResult<()> {
    let snapshot = ScenarioSnapshot::from_scenario(scenario);
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &snapshot)?;
    Ok(())
}

#[derive(Serialize, Deserialize)]
struct AssignmentCsvRecord {
    allocation: u32,
    resource: u32,
    day: NaiveDate,
    duration: String,
}

impl From<&DayAssignment> for AssignmentCsvRecord {
    fn from(assignment: &DayAssignment) -> Self {
        Self {
            allocation: assignment.allocation.0,
            resource: assignment.resource.0,
            day: assignment.day,
            duration: assignment.duration.to_string(),
        }
    }
}

impl AssignmentCsvRecord {
    fn into_assignment(self) -> PersistenceResult<DayAssignment> {
        let duration: EffortDuration = self.duration.parse().map_err(|err| {
            PersistenceError::InvalidData(format!(
                "assignment of A{} on {}: {err}",
                self.allocation, self.day
            ))
        })?;
        Ok(DayAssignment {
            allocation: AllocationId(self.allocation),
            resource: ResourceId(self.resource),
            day: self.day,
            duration,
        })
    }
}

/// One row per day assignment, ordered by allocation then day.
pub fn save_assignments_to_csv<P: AsRef<Path>>(
    allocations: &[ResourceAllocation],
    path: P,
) -> PersistenceResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for allocation in allocations {
        for assignment in allocation.assignments() {
            writer.serialize(AssignmentCsvRecord::from(assignment))?;
        }
    }
    writer.flush()?;
    Ok(())
}

pub fn load_assignments_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Vec<DayAssignment>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut assignments = Vec::new();
    for record in reader.deserialize::<AssignmentCsvRecord>() {
        assignments.push(record?.into_assignment()?);
    }
    Ok(assignments)
}

pub fn save_assignments_to_json<P: AsRef<Path>>(
    allocations: &[ResourceAllocation],
    path: P,
) -> PersistenceResult<()> {
    let assignments: Vec<&DayAssignment> = allocations
        .iter()
        .flat_map(|a| a.assignments())
        .collect();
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &assignments)?;
    Ok(())
}

#[derive(Serialize)]
struct LoadPeriodCsvRecord<'a> {
    resource: u32,
    start: String,
    end: String,
    available_effort: &'a str,
    assigned_effort: &'a str,
    load_percentage: String,
    category: String,
}

pub fn save_load_periods_to_csv<P: AsRef<Path>>(
    chart: &[(ResourceId, Vec<LoadPeriod>)],
    path: P,
) -> PersistenceResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for (resource, periods) in chart {
        for period in periods {
            let level = period.level();
            writer.serialize(LoadPeriodCsvRecord {
                resource: resource.0,
                start: period.start().to_string(),
                end: period.end().to_string(),
                available_effort: period.available_effort(),
                assigned_effort: period.assigned_effort(),
                load_percentage: if level.is_infinite() {
                    "inf".to_string()
                } else {
                    level.percentage().to_string()
                },
                category: format!("{:?}", level.category()),
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}
