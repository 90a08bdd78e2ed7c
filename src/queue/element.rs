use super::{DateAndHour, QueueElementId, QueueError, QueueId};
use crate::allocation::{DayAssignment, ResourceAllocation};
use crate::resource::Criterion;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuePosition {
    date: Option<NaiveDate>,
    #[serde(default)]
    hour: u32,
}

impl QueuePosition {
    pub fn at(position: DateAndHour) -> Self {
        Self {
            date: Some(position.date()),
            hour: position.hour(),
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn to_date_and_hour(&self) -> Option<DateAndHour> {
        self.date.map(|date| DateAndHour::new(date, self.hour))
    }

    pub(crate) fn set_date(&mut self, date: Option<NaiveDate>) {
        self.date = date;
    }

    pub(crate) fn set_hour(&mut self, hour: u32) {
        self.hour = hour;
    }
}

/// How an element refers to another one. Two references denote the same
/// element when their ids match or both carry the same persisted id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef {
    pub id: QueueElementId,
    #[serde(default)]
    pub persisted_id: Option<u64>,
}

impl ElementRef {
    pub fn new(id: QueueElementId) -> Self {
        Self {
            id,
            persisted_id: None,
        }
    }

    pub fn same_element(&self, other: &ElementRef) -> bool {
        self.id == other.id
            || matches!((self.persisted_id, other.persisted_id), (Some(a), Some(b)) if a == b)
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyKind {
    EndStart,
    StartStart,
    EndEnd,
    StartEnd,
}

/// `destiny` must be positioned after `origin` as `kind` says.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueDependency {
    origin: ElementRef,
    destiny: ElementRef,
    kind: DependencyKind,
}

impl QueueDependency {
    pub fn new(origin: ElementRef, destiny: ElementRef, kind: DependencyKind) -> Self {
        Self {
            origin,
            destiny,
            kind,
        }
    }

    pub fn origin(&self) -> ElementRef {
        self.origin
    }

    pub fn destiny(&self) -> ElementRef {
        self.destiny
    }

    pub fn kind(&self) -> DependencyKind {
        self.kind
    }

    /// Whether the two positioned elements respect this dependency.
    pub fn is_respected_by(
        &self,
        origin: &LimitingResourceQueueElement,
        destiny: &LimitingResourceQueueElement,
    ) -> bool {
        let (reference, constrained) = match self.kind {
            DependencyKind::EndStart => (origin.end_time(), destiny.start_time()),
            DependencyKind::StartStart => (origin.start_time(), destiny.start_time()),
            DependencyKind::EndEnd => (origin.end_time(), destiny.end_time()),
            DependencyKind::StartEnd => (origin.start_time(), destiny.end_time()),
        };
        match (reference, constrained) {
            (Some(reference), Some(constrained)) => constrained >= reference,
            _ => true,
        }
    }
}

/// An allocation of a limiting resource waiting for, or holding, a slot in
/// that resource's queue.
#[derive(Debug, Clone)]
pub struct LimitingResourceQueueElement {
    id: QueueElementId,
    persisted_id: Option<u64>,
    allocation: ResourceAllocation,
    queue: Option<QueueId>,
    start: QueuePosition,
    end: QueuePosition,
    creation_timestamp: NaiveDateTime,
    earliest_start_date_because_of_gantt: Option<NaiveDate>,
    earliest_end_date_because_of_gantt: Option<NaiveDate>,
    dependencies_as_origin: Vec<QueueDependency>,
    dependencies_as_destiny: Vec<QueueDependency>,
}

impl LimitingResourceQueueElement {
    pub fn new(
        id: QueueElementId,
        allocation: ResourceAllocation,
        creation_timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            id,
            persisted_id: None,
            allocation,
            queue: None,
            start: QueuePosition::default(),
            end: QueuePosition::default(),
            creation_timestamp,
            earliest_start_date_because_of_gantt: None,
            earliest_end_date_because_of_gantt: None,
            dependencies_as_origin: Vec::new(),
            dependencies_as_destiny: Vec::new(),
        }
    }

    pub fn with_persisted_id(mut self, persisted_id: u64) -> Self {
        self.persisted_id = Some(persisted_id);
        self
    }

    pub fn id(&self) -> QueueElementId {
        self.id
    }

    pub fn persisted_id(&self) -> Option<u64> {
        self.persisted_id
    }

    pub fn element_ref(&self) -> ElementRef {
        ElementRef {
            id: self.id,
            persisted_id: self.persisted_id,
        }
    }

    pub fn allocation(&self) -> &ResourceAllocation {
        &self.allocation
    }

    pub fn allocation_mut(&mut self) -> &mut ResourceAllocation {
        &mut self.allocation
    }

    pub fn queue(&self) -> Option<QueueId> {
        self.queue
    }

    pub fn start(&self) -> QueuePosition {
        self.start
    }

    pub fn end(&self) -> QueuePosition {
        self.end
    }

    pub fn start_time(&self) -> Option<DateAndHour> {
        self.start.to_date_and_hour()
    }

    pub fn end_time(&self) -> Option<DateAndHour> {
        self.end.to_date_and_hour()
    }

    pub fn creation_timestamp(&self) -> NaiveDateTime {
        self.creation_timestamp
    }

    pub fn earliest_start_date_because_of_gantt(&self) -> Option<NaiveDate> {
        self.earliest_start_date_because_of_gantt
    }

    pub fn set_earliest_start_date_because_of_gantt(&mut self, date: Option<NaiveDate>) {
        self.earliest_start_date_because_of_gantt = date;
    }

    pub fn earliest_end_date_because_of_gantt(&self) -> Option<NaiveDate> {
        self.earliest_end_date_because_of_gantt
    }

    pub fn set_earliest_end_date_because_of_gantt(&mut self, date: Option<NaiveDate>) {
        self.earliest_end_date_because_of_gantt = date;
    }

    pub fn is_specific(&self) -> bool {
        self.allocation.is_specific()
    }

    pub fn is_generic(&self) -> bool {
        self.allocation.is_generic()
    }

    pub fn criteria(&self) -> &[Criterion] {
        self.allocation.criteria()
    }

    pub fn day_assignments(&self) -> &[DayAssignment] {
        self.allocation.assignments()
    }

    /// Time between start and end, when both are set.
    pub fn length_between(&self) -> Option<TimeDelta> {
        let start = self.start_time()?.to_date_time();
        let end = self.end_time()?.to_date_time();
        Some(end - start)
    }

    pub fn dependencies_as_origin(&self) -> &[QueueDependency] {
        &self.dependencies_as_origin
    }

    pub fn dependencies_as_destiny(&self) -> &[QueueDependency] {
        &self.dependencies_as_destiny
    }

    /// Records `dependency` on the side this element plays in it.
    pub fn add(&mut self, dependency: QueueDependency) -> Result<(), QueueError> {
        let me = self.element_ref();
        let side = if dependency.origin.same_element(&me) {
            &mut self.dependencies_as_origin
        } else if dependency.destiny.same_element(&me) {
            &mut self.dependencies_as_destiny
        } else {
            return Err(QueueError::NotAnEndpoint {
                element: self.id,
                origin: dependency.origin.id,
                destiny: dependency.destiny.id,
            });
        };
        if !side.contains(&dependency) {
            side.push(dependency);
        }
        Ok(())
    }

    pub fn remove(&mut self, dependency: &QueueDependency) -> bool {
        let before = self.dependencies_as_origin.len() + self.dependencies_as_destiny.len();
        self.dependencies_as_origin.retain(|d| d != dependency);
        self.dependencies_as_destiny.retain(|d| d != dependency);
        before != self.dependencies_as_origin.len() + self.dependencies_as_destiny.len()
    }

    /// Leaves the element unscheduled: no queue, no position, no day
    /// assignments.
    pub fn detach(&mut self) {
        self.queue = None;
        self.start = QueuePosition::default();
        self.end = QueuePosition::default();
        self.allocation.remove_limiting_day_assignments();
    }

    pub fn is_detached(&self) -> bool {
        self.start.date.is_none()
    }

    /// Orders by start time; unscheduled elements go last. Ties fall back
    /// to creation time, then id.
    pub fn by_start_time(a: &Self, b: &Self) -> Ordering {
        let key = |e: &Self| (e.is_detached(), e.start_time(), e.creation_timestamp, e.id);
        key(a).cmp(&key(b))
    }

    pub(crate) fn set_queue(&mut self, queue: Option<QueueId>) {
        self.queue = queue;
    }

    pub(crate) fn start_mut(&mut self) -> &mut QueuePosition {
        &mut self.start
    }

    pub(crate) fn end_mut(&mut self) -> &mut QueuePosition {
        &mut self.end
    }
}
