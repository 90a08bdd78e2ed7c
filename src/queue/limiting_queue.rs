use super::{
    DateAndHour, ElementRef, LimitingResourceQueueElement, QueueDependency, QueueElementId,
    QueueError, QueueId,
};
use crate::graph::DependencyGraph;
use crate::resource::ResourceId;
use chrono::NaiveDate;
use std::mem;
use tracing::debug;

/// Elements of one limiting resource, kept sorted by start time.
///
/// Position changes go through the queue; each one re-sorts the elements
/// and records a single move notification.
#[derive(Debug, Clone)]
pub struct LimitingResourceQueue {
    id: QueueId,
    resource: ResourceId,
    elements: Vec<LimitingResourceQueueElement>,
    moved: Vec<QueueElementId>,
}

impl LimitingResourceQueue {
    pub fn new(id: QueueId, resource: ResourceId) -> Self {
        Self {
            id,
            resource,
            elements: Vec::new(),
            moved: Vec::new(),
        }
    }

    pub fn id(&self) -> QueueId {
        self.id
    }

    pub fn resource(&self) -> ResourceId {
        self.resource
    }

    pub fn elements(&self) -> &[LimitingResourceQueueElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, id: QueueElementId) -> Option<&LimitingResourceQueueElement> {
        self.elements.iter().find(|e| e.id() == id)
    }

    pub fn add_element(&mut self, mut element: LimitingResourceQueueElement) -> Result<(), QueueError> {
        if self.get(element.id()).is_some() {
            return Err(QueueError::DuplicateElement(element.id()));
        }
        element.set_queue(Some(self.id));
        self.elements.push(element);
        self.sort();
        Ok(())
    }

    /// Takes the element out of the queue, leaving it positioned.
    pub fn remove_element(
        &mut self,
        id: QueueElementId,
    ) -> Result<LimitingResourceQueueElement, QueueError> {
        let index = self.index_of(id)?;
        let mut element = self.elements.remove(index);
        element.set_queue(None);
        Ok(element)
    }

    /// Takes the element out of the queue and unschedules it.
    pub fn detach(&mut self, id: QueueElementId) -> Result<LimitingResourceQueueElement, QueueError> {
        let mut element = self.remove_element(id)?;
        element.detach();
        debug!(queue = %self.id, element = %id, "detached queue element");
        Ok(element)
    }

    pub fn set_start_date(&mut self, id: QueueElementId, date: Option<NaiveDate>) -> Result<(), QueueError> {
        self.update(id, |e| e.start_mut().set_date(date))
    }

    pub fn set_start_hour(&mut self, id: QueueElementId, hour: u32) -> Result<(), QueueError> {
        self.update(id, |e| e.start_mut().set_hour(hour))
    }

    pub fn set_end_date(&mut self, id: QueueElementId, date: Option<NaiveDate>) -> Result<(), QueueError> {
        self.update(id, |e| e.end_mut().set_date(date))
    }

    pub fn set_end_hour(&mut self, id: QueueElementId, hour: u32) -> Result<(), QueueError> {
        self.update(id, |e| e.end_mut().set_hour(hour))
    }

    /// Places the element at `[start, end]` as a single move.
    pub fn move_element(
        &mut self,
        id: QueueElementId,
        start: DateAndHour,
        end: DateAndHour,
    ) -> Result<(), QueueError> {
        if end < start {
            return Err(QueueError::InvalidPosition {
                element: id,
                start,
                end,
            });
        }
        self.update(id, |e| {
            let start_position = e.start_mut();
            start_position.set_date(Some(start.date()));
            start_position.set_hour(start.hour());
            let end_position = e.end_mut();
            end_position.set_date(Some(end.date()));
            end_position.set_hour(end.hour());
        })
    }

    /// Ids of the elements moved since the last call, one entry per move.
    pub fn take_moved(&mut self) -> Vec<QueueElementId> {
        mem::take(&mut self.moved)
    }

    /// First positioned element starting at or after `at`.
    pub fn first_after(&self, at: DateAndHour) -> Option<&LimitingResourceQueueElement> {
        self.elements
            .iter()
            .find(|e| e.start_time().is_some_and(|start| start >= at))
    }

    /// Positioned elements whose span intersects `[start, end)`.
    pub fn elements_between(
        &self,
        start: DateAndHour,
        end: DateAndHour,
    ) -> impl Iterator<Item = &LimitingResourceQueueElement> {
        self.elements.iter().filter(move |e| match (e.start_time(), e.end_time()) {
            (Some(s), Some(f)) => s < end && start < f,
            _ => false,
        })
    }

    /// Records `dependency` on the queued elements it links, refusing
    /// edges that would close a cycle.
    pub fn add_dependency(&mut self, dependency: QueueDependency) -> Result<(), QueueError> {
        let origin = dependency.origin();
        let destiny = dependency.destiny();
        let involved: Vec<usize> = self
            .elements
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                let me = e.element_ref();
                origin.same_element(&me) || destiny.same_element(&me)
            })
            .map(|(idx, _)| idx)
            .collect();
        if involved.is_empty() {
            return Err(QueueError::UnknownElement(origin.id));
        }
        if self.dependency_graph().would_create_cycle(origin, destiny) {
            return Err(QueueError::Cycle {
                origin: origin.id,
                destiny: destiny.id,
            });
        }
        for idx in involved {
            self.elements[idx].add(dependency)?;
        }
        Ok(())
    }

    pub fn remove_dependency(&mut self, dependency: &QueueDependency) -> bool {
        let mut removed = false;
        for element in &mut self.elements {
            removed |= element.remove(dependency);
        }
        removed
    }

    pub fn dependency_graph(&self) -> DependencyGraph {
        DependencyGraph::build(&self.elements)
    }

    /// Dependencies whose positioned endpoints are out of order.
    pub fn dependency_violations(&self) -> Vec<QueueDependency> {
        let find = |target: &ElementRef| {
            self.elements
                .iter()
                .find(|e| target.same_element(&e.element_ref()))
        };
        self.elements
            .iter()
            .flat_map(|e| e.dependencies_as_origin().iter())
            .filter(|dependency| match (find(&dependency.origin()), find(&dependency.destiny())) {
                (Some(origin), Some(destiny)) => !dependency.is_respected_by(origin, destiny),
                _ => false,
            })
            .copied()
            .collect()
    }

    fn index_of(&self, id: QueueElementId) -> Result<usize, QueueError> {
        self.elements
            .iter()
            .position(|e| e.id() == id)
            .ok_or(QueueError::UnknownElement(id))
    }

    fn update<F>(&mut self, id: QueueElementId, change: F) -> Result<(), QueueError>
    where
        F: FnOnce(&mut LimitingResourceQueueElement),
    {
        let index = self.index_of(id)?;
        change(&mut self.elements[index]);
        self.element_moved(id);
        Ok(())
    }

    fn element_moved(&mut self, id: QueueElementId) {
        self.sort();
        self.moved.push(id);
        debug!(queue = %self.id, element = %id, "queue element moved");
    }

    fn sort(&mut self) {
        self.elements.sort_by(LimitingResourceQueueElement::by_start_time);
    }
}
