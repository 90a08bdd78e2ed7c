use crate::availability::AvailabilityTimeLine;
use crate::config::ConfigError;
use crate::effort::{Capacity, EffortDuration, ResourcesPerDay};
use crate::intraday::{PartialDay, next_day};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Anything that can tell how much work fits in a day.
pub trait Calendar: Send + Sync + fmt::Debug {
    /// Capacity of the whole date, overtime allowance included.
    fn capacity_with_overtime(&self, date: NaiveDate) -> Capacity;

    fn availability(&self) -> AvailabilityTimeLine;

    fn capacity_on(&self, day: &PartialDay) -> EffortDuration {
        day.limit_working_day(self.capacity_with_overtime(day.date()).standard_effort())
    }

    /// Effort `resources_per_day` resources produce on `day`, capped by the
    /// overtime allowance.
    fn as_duration_on(&self, day: &PartialDay, resources_per_day: ResourcesPerDay) -> EffortDuration {
        let capacity = self.capacity_with_overtime(day.date());
        let working = day.limit_working_day(capacity.standard_effort());
        capacity.limit_duration(resources_per_day.as_duration_given_working_day_of(working))
    }
}

const ALL_WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// One version of a calendar's weekly capacities, valid until
/// `expiring_date` (exclusive). `None` capacities defer to the parent.
#[derive(Debug, Clone, Default)]
pub struct CalendarData {
    capacities: [Option<Capacity>; 7],
    expiring_date: Option<NaiveDate>,
    parent: Option<Arc<WorkCalendar>>,
}

impl CalendarData {
    pub fn new(expiring_date: Option<NaiveDate>) -> Self {
        Self {
            expiring_date,
            ..Self::default()
        }
    }

    pub fn with_parent(mut self, parent: Arc<WorkCalendar>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_capacity(mut self, weekday: Weekday, capacity: Capacity) -> Self {
        self.set_capacity(weekday, Some(capacity));
        self
    }

    pub fn set_capacity(&mut self, weekday: Weekday, capacity: Option<Capacity>) {
        self.capacities[weekday.num_days_from_monday() as usize] = capacity;
    }

    pub fn capacity_for(&self, weekday: Weekday) -> Option<Capacity> {
        self.capacities[weekday.num_days_from_monday() as usize]
    }

    pub fn expiring_date(&self) -> Option<NaiveDate> {
        self.expiring_date
    }

    pub fn parent(&self) -> Option<&Arc<WorkCalendar>> {
        self.parent.as_ref()
    }

    /// Still in force on `date`.
    pub fn is_posterior_to(&self, date: NaiveDate) -> bool {
        self.expiring_date.is_none_or(|expiring| expiring > date)
    }

    fn by_expiring_date(a: &CalendarData, b: &CalendarData) -> Ordering {
        match (a.expiring_date, b.expiring_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarException {
    pub date: NaiveDate,
    pub capacity: Capacity,
    #[serde(default)]
    pub code: String,
}

/// Window in which a calendar can be used. Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarAvailability {
    pub start: NaiveDate,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

impl CalendarAvailability {
    pub fn new(start: NaiveDate, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn is_active(&self, date: NaiveDate) -> bool {
        self.start <= date && self.end.is_none_or(|end| end >= date)
    }
}

/// Versioned calendar with exception days, availability windows and an
/// optional parent per version.
#[derive(Debug, Clone)]
pub struct WorkCalendar {
    name: String,
    versions: Vec<CalendarData>,
    exceptions: BTreeMap<NaiveDate, CalendarException>,
    availabilities: Vec<CalendarAvailability>,
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self::working_week("default", EffortDuration::hours(8))
    }
}

impl WorkCalendar {
    /// An empty calendar: a single open-ended version with no capacities.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            versions: vec![CalendarData::new(None)],
            exceptions: BTreeMap::new(),
            availabilities: Vec::new(),
        }
    }

    /// `daily` hours Monday to Friday, nothing at weekends.
    pub fn working_week(name: impl Into<String>, daily: EffortDuration) -> Self {
        let mut calendar = Self::new(name);
        for weekday in ALL_WEEKDAYS {
            let standard = match weekday {
                Weekday::Sat | Weekday::Sun => EffortDuration::zero(),
                _ => daily,
            };
            calendar.set_weekday_capacity(
                weekday,
                Some(Capacity::create(standard).over_assignable_without_limit()),
            );
        }
        calendar
    }

    /// Shared 8h Monday to Friday calendar used for resources without one.
    pub fn default_working_week() -> Arc<WorkCalendar> {
        static DEFAULT: OnceLock<Arc<WorkCalendar>> = OnceLock::new();
        Arc::clone(DEFAULT.get_or_init(|| Arc::new(WorkCalendar::default())))
    }

    pub fn derived_from(name: impl Into<String>, parent: Arc<WorkCalendar>) -> Self {
        let mut calendar = Self::new(name);
        calendar.versions = vec![CalendarData::new(None).with_parent(parent)];
        calendar
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn versions(&self) -> &[CalendarData] {
        &self.versions
    }

    /// Sets the capacity on the open-ended version.
    pub fn set_weekday_capacity(&mut self, weekday: Weekday, capacity: Option<Capacity>) {
        self.last_version_mut().set_capacity(weekday, capacity);
    }

    fn last_version_mut(&mut self) -> &mut CalendarData {
        if self.versions.is_empty() {
            self.versions.push(CalendarData::new(None));
        }
        let last = self.versions.len() - 1;
        &mut self.versions[last]
    }

    /// Adds a version, replacing any with the same expiring date.
    pub fn add_version(&mut self, version: CalendarData) {
        self.versions
            .retain(|existing| existing.expiring_date != version.expiring_date);
        self.versions.push(version);
        self.versions.sort_by(CalendarData::by_expiring_date);
    }

    pub fn add_exception(&mut self, date: NaiveDate, capacity: Capacity) {
        self.exceptions.insert(
            date,
            CalendarException {
                date,
                capacity,
                code: String::new(),
            },
        );
    }

    pub fn add_exceptions(&mut self, exceptions: impl IntoIterator<Item = CalendarException>) {
        for exception in exceptions {
            self.exceptions.insert(exception.date, exception);
        }
    }

    pub fn exceptions(&self) -> impl Iterator<Item = &CalendarException> {
        self.exceptions.values()
    }

    pub fn add_availability(&mut self, availability: CalendarAvailability) {
        self.availabilities.push(availability);
        self.availabilities.sort_by_key(|a| a.start);
    }

    pub fn availabilities(&self) -> &[CalendarAvailability] {
        &self.availabilities
    }

    /// Version in force on `date`: the earliest one expiring after it.
    pub fn version_at(&self, date: NaiveDate) -> Option<&CalendarData> {
        self.versions.iter().find(|v| v.is_posterior_to(date))
    }

    pub fn parent_at(&self, date: NaiveDate) -> Option<&Arc<WorkCalendar>> {
        self.version_at(date).and_then(CalendarData::parent)
    }

    /// No availability windows means always available.
    pub fn is_active(&self, date: NaiveDate) -> bool {
        self.availabilities.is_empty() || self.availabilities.iter().any(|a| a.is_active(date))
    }

    fn exception_capacity(&self, date: NaiveDate) -> Option<Capacity> {
        self.exceptions
            .get(&date)
            .map(|e| e.capacity)
            .or_else(|| self.parent_at(date)?.exception_capacity(date))
    }

    fn weekday_capacity(&self, date: NaiveDate) -> Option<Capacity> {
        let version = self.version_at(date)?;
        version
            .capacity_for(date.weekday())
            .or_else(|| version.parent()?.weekday_capacity(date))
    }

    /// Capacity ignoring availability windows: exceptions up the parent
    /// chain, then the weekday of the active version, then the parents'
    /// weekdays.
    pub fn resolved_capacity(&self, date: NaiveDate) -> Option<Capacity> {
        self.exception_capacity(date)
            .or_else(|| self.weekday_capacity(date))
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        !self.capacity_with_overtime(date).is_zero()
    }

    /// Total standard capacity over `[start, end)`.
    pub fn total_capacity_between(&self, start: NaiveDate, end: NaiveDate) -> EffortDuration {
        let mut total = EffortDuration::zero();
        let mut current = start;
        while current < end {
            total = total.plus(self.capacity_with_overtime(current).standard_effort());
            current = next_day(current);
        }
        total
    }

    /// Fails on weekday keys that are not a weekday name.
    pub fn from_config(config: &WorkCalendarConfig) -> Result<Self, ConfigError> {
        let mut calendar = Self::new(config.name.clone());
        calendar.versions.clear();
        for version_config in &config.versions {
            let mut version = CalendarData::new(version_config.expiring_date);
            for (weekday, capacity) in version_config.capacities(&config.name)? {
                version.set_capacity(weekday, Some(capacity));
            }
            if let Some(parent) = &version_config.parent {
                version.parent = Some(Arc::new(Self::from_config(parent)?));
            }
            calendar.add_version(version);
        }
        if calendar.versions.is_empty() {
            calendar.versions.push(CalendarData::new(None));
        }
        calendar.add_exceptions(config.exceptions.iter().cloned());
        for availability in &config.availabilities {
            calendar.add_availability(*availability);
        }
        Ok(calendar)
    }

    pub fn to_config(&self) -> WorkCalendarConfig {
        WorkCalendarConfig::from(self)
    }
}

impl Calendar for WorkCalendar {
    fn capacity_with_overtime(&self, date: NaiveDate) -> Capacity {
        if !self.is_active(date) {
            return Capacity::zero();
        }
        self.resolved_capacity(date).unwrap_or_else(Capacity::zero)
    }

    fn availability(&self) -> AvailabilityTimeLine {
        if self.availabilities.is_empty() {
            return AvailabilityTimeLine::all_valid();
        }
        self.availabilities
            .iter()
            .map(|a| AvailabilityTimeLine::valid_between(Some(a.start), a.end.map(next_day)))
            .fold(AvailabilityTimeLine::all_invalid(), |acc, t| acc.or(&t))
    }
}

/// The same working hours every day of the week, over-assignable
/// without limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SameWorkHoursEveryDay {
    hours: EffortDuration,
}

impl SameWorkHoursEveryDay {
    pub fn new(hours: EffortDuration) -> Self {
        Self { hours }
    }

    pub fn default_working_day() -> Self {
        Self::new(EffortDuration::hours(8))
    }
}

impl Calendar for SameWorkHoursEveryDay {
    fn capacity_with_overtime(&self, _date: NaiveDate) -> Capacity {
        Capacity::create(self.hours).over_assignable_without_limit()
    }

    fn availability(&self) -> AvailabilityTimeLine {
        AvailabilityTimeLine::all_valid()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combination {
    Min,
    Max,
}

/// Day-by-day minimum or maximum of several calendars.
#[derive(Debug, Clone)]
pub struct CombinedCalendar {
    combination: Combination,
    calendars: Vec<Arc<dyn Calendar>>,
}

impl CombinedCalendar {
    pub fn min_of(calendars: Vec<Arc<dyn Calendar>>) -> Self {
        Self {
            combination: Combination::Min,
            calendars,
        }
    }

    pub fn max_of(calendars: Vec<Arc<dyn Calendar>>) -> Self {
        Self {
            combination: Combination::Max,
            calendars,
        }
    }

    pub fn combination(&self) -> Combination {
        self.combination
    }

    fn combine<T, F>(&self, mut value_of: F, pick: fn(T, T) -> T, empty: T) -> T
    where
        F: FnMut(&dyn Calendar) -> T,
    {
        self.calendars
            .iter()
            .map(|c| value_of(c.as_ref()))
            .reduce(pick)
            .unwrap_or(empty)
    }

    fn pick_effort(&self) -> fn(EffortDuration, EffortDuration) -> EffortDuration {
        match self.combination {
            Combination::Min => std::cmp::min,
            Combination::Max => std::cmp::max,
        }
    }
}

impl Calendar for CombinedCalendar {
    fn capacity_with_overtime(&self, date: NaiveDate) -> Capacity {
        let pick = match self.combination {
            Combination::Min => Capacity::min_of,
            Combination::Max => Capacity::max_of,
        };
        self.combine(|c| c.capacity_with_overtime(date), pick, Capacity::zero())
    }

    fn availability(&self) -> AvailabilityTimeLine {
        let timelines = self.calendars.iter().map(|c| c.availability());
        match self.combination {
            Combination::Min if self.calendars.is_empty() => AvailabilityTimeLine::all_invalid(),
            Combination::Min => timelines.fold(AvailabilityTimeLine::all_valid(), |acc, t| acc.and(&t)),
            Combination::Max => timelines.fold(AvailabilityTimeLine::all_invalid(), |acc, t| acc.or(&t)),
        }
    }

    fn capacity_on(&self, day: &PartialDay) -> EffortDuration {
        self.combine(|c| c.capacity_on(day), self.pick_effort(), EffortDuration::zero())
    }

    fn as_duration_on(&self, day: &PartialDay, resources_per_day: ResourcesPerDay) -> EffortDuration {
        self.combine(
            |c| c.as_duration_on(day, resources_per_day),
            self.pick_effort(),
            EffortDuration::zero(),
        )
    }
}

/// Serializable form of a [`WorkCalendar`]. Parents are nested inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkCalendarConfig {
    pub name: String,
    #[serde(default)]
    pub versions: Vec<CalendarVersionConfig>,
    #[serde(default)]
    pub exceptions: Vec<CalendarException>,
    #[serde(default)]
    pub availabilities: Vec<CalendarAvailability>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarVersionConfig {
    #[serde(default)]
    pub expiring_date: Option<NaiveDate>,
    /// Weekday (`"Mon"`, `"Tue"`, ...) to capacity; missing days inherit.
    #[serde(default)]
    pub capacities: BTreeMap<String, Capacity>,
    #[serde(default)]
    pub parent: Option<Box<WorkCalendarConfig>>,
}

impl CalendarVersionConfig {
    fn capacities(&self, calendar: &str) -> Result<Vec<(Weekday, Capacity)>, ConfigError> {
        self.capacities
            .iter()
            .map(|(day, capacity)| {
                day.parse::<Weekday>()
                    .map(|weekday| (weekday, *capacity))
                    .map_err(|_| {
                        ConfigError::Invalid(format!(
                            "calendar '{calendar}': unknown weekday '{day}'"
                        ))
                    })
            })
            .collect()
    }
}

impl WorkCalendarConfig {
    /// Weekdays with capacity in the open-ended version.
    pub fn working_days(&self) -> Vec<Weekday> {
        let Some(version) = self
            .versions
            .iter()
            .max_by_key(|v| (v.expiring_date.is_none(), v.expiring_date))
        else {
            return Vec::new();
        };
        ALL_WEEKDAYS
            .into_iter()
            .filter(|wd| {
                version
                    .capacities
                    .iter()
                    .any(|(day, c)| day.parse::<Weekday>().ok() == Some(*wd) && !c.is_zero())
            })
            .collect()
    }
}

impl Default for WorkCalendarConfig {
    fn default() -> Self {
        WorkCalendarConfig::from(&WorkCalendar::default())
    }
}

impl From<&WorkCalendar> for WorkCalendarConfig {
    fn from(calendar: &WorkCalendar) -> Self {
        let versions = calendar
            .versions
            .iter()
            .map(|version| CalendarVersionConfig {
                expiring_date: version.expiring_date,
                capacities: ALL_WEEKDAYS
                    .into_iter()
                    .filter_map(|wd| version.capacity_for(wd).map(|c| (wd.to_string(), c)))
                    .collect(),
                parent: version
                    .parent
                    .as_ref()
                    .map(|p| Box::new(WorkCalendarConfig::from(p.as_ref()))),
            })
            .collect();

        Self {
            name: calendar.name.clone(),
            versions,
            exceptions: calendar.exceptions.values().cloned().collect(),
            availabilities: calendar.availabilities.clone(),
        }
    }
}
