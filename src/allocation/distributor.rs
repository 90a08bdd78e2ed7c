use crate::allocation::AllocationKind;
use crate::calendar::Calendar;
use crate::effort::EffortDuration;
use crate::intraday::PartialDay;
use crate::resource::{Criterion, Resource, ResourceId};
use std::sync::Arc;

/// Splits one day's effort among the resources of an allocation.
#[derive(Debug, Clone, Copy)]
pub enum EffortDistributor<'a> {
    Specific(&'a Resource),
    Generic {
        criteria: &'a [Criterion],
        resources: &'a [Arc<Resource>],
    },
}

impl<'a> EffortDistributor<'a> {
    pub fn for_kind(kind: &'a AllocationKind) -> Self {
        match kind {
            AllocationKind::Specific { resource } => EffortDistributor::Specific(resource),
            AllocationKind::Generic {
                criteria,
                resources,
            } => EffortDistributor::Generic {
                criteria,
                resources,
            },
        }
    }

    /// Specific allocations give everything to their resource. Generic
    /// ones split evenly among the resources that satisfy the criteria and
    /// have capacity on `day`. A share never exceeds what the resource's
    /// own capacity allows; the excess goes to the others with room left,
    /// and effort nobody can absorb is not assigned.
    pub fn distribute_for_day(
        &self,
        day: &PartialDay,
        effort: EffortDuration,
    ) -> Vec<(ResourceId, EffortDuration)> {
        if effort.is_zero() {
            return Vec::new();
        }
        match self {
            EffortDistributor::Specific(resource) => vec![(resource.id(), effort)],
            EffortDistributor::Generic {
                criteria,
                resources,
            } => {
                let slots: Vec<Slot> = resources
                    .iter()
                    .filter(|r| r.satisfies_all(criteria, day.date()))
                    .filter(|r| !r.calendar().capacity_on(day).is_zero())
                    .map(|r| Slot::new(r, day))
                    .collect();
                split_within_capacity(slots, effort)
            }
        }
    }
}

struct Slot {
    resource: ResourceId,
    /// `None` when the resource can be over-assigned without limit.
    limit: Option<EffortDuration>,
    assigned: EffortDuration,
}

impl Slot {
    fn new(resource: &Resource, day: &PartialDay) -> Self {
        let capacity = resource.calendar().capacity_with_overtime(day.date());
        let limit = capacity
            .allowed_extra_effort()
            .map(|extra| day.limit_working_day(capacity.standard_effort()).plus(extra));
        Self {
            resource: resource.id(),
            limit,
            assigned: EffortDuration::zero(),
        }
    }

    fn room(&self) -> Option<EffortDuration> {
        self.limit.map(|limit| limit.saturating_minus(self.assigned))
    }

    fn is_open(&self) -> bool {
        self.room().is_none_or(|room| !room.is_zero())
    }
}

fn split_within_capacity(mut slots: Vec<Slot>, effort: EffortDuration) -> Vec<(ResourceId, EffortDuration)> {
    let mut remaining = effort;
    while !remaining.is_zero() {
        let open: Vec<usize> = (0..slots.len()).filter(|&i| slots[i].is_open()).collect();
        if open.is_empty() {
            break;
        }
        let count = open.len() as u64;
        let share = remaining.divide_by(count);
        let remainder = remaining.as_seconds() - share.as_seconds() * count;
        let mut given = EffortDuration::zero();
        for (n, &i) in open.iter().enumerate() {
            let wanted = share.plus(EffortDuration::seconds(u64::from((n as u64) < remainder)));
            let granted = slots[i].room().map_or(wanted, |room| room.min(wanted));
            slots[i].assigned = slots[i].assigned.plus(granted);
            given = given.plus(granted);
        }
        remaining = remaining.saturating_minus(given);
    }
    slots
        .into_iter()
        .filter(|slot| !slot.assigned.is_zero())
        .map(|slot| (slot.resource, slot.assigned))
        .collect()
}
