use super::{LoadLevel, LoadPeriod};
use crate::allocation::ResourceAllocation;
use crate::effort::EffortDuration;
use crate::intraday::IntraDayDate;
use crate::resource::{Criterion, Resource, ResourceId};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, warn};

/// Whose load is being computed.
#[derive(Debug, Clone, Copy)]
pub enum LoadScope<'a> {
    /// One resource, counting availability only on days it satisfies
    /// `criteria`.
    OnResource {
        resource: &'a Resource,
        criteria: &'a [Criterion],
    },
    /// Every resource of the pool satisfying `criterion`.
    OnCriterion {
        criterion: &'a Criterion,
        resources: &'a [Arc<Resource>],
    },
}

impl LoadScope<'_> {
    fn includes(&self, allocation: &ResourceAllocation) -> bool {
        match self {
            LoadScope::OnResource { resource, .. } => allocation.has_assignments_for(resource.id()),
            LoadScope::OnCriterion { criterion, .. } => {
                allocation.is_satisfied()
                    && allocation
                        .resources()
                        .iter()
                        .any(|r| r.satisfactions().iter().any(|s| &s.criterion == *criterion))
            }
        }
    }

    fn available_effort(&self, start: IntraDayDate, end: IntraDayDate) -> EffortDuration {
        match self {
            LoadScope::OnResource { resource, criteria } => {
                resource.total_effort_for(start, end, criteria)
            }
            LoadScope::OnCriterion {
                criterion,
                resources,
            } => resources
                .iter()
                .map(|r| r.total_effort_for(start, end, std::slice::from_ref(*criterion)))
                .sum(),
        }
    }

    fn assigned_effort(
        &self,
        allocation: &ResourceAllocation,
        start: IntraDayDate,
        end: IntraDayDate,
    ) -> EffortDuration {
        match self {
            LoadScope::OnResource { resource, .. } => {
                allocation.assigned_effort_for_resource(resource.id(), start, end)
            }
            LoadScope::OnCriterion { criterion, .. } => {
                allocation.assigned_effort_for_criterion(criterion, start, end)
            }
        }
    }
}

/// A time range with the allocations contributing to it.
#[derive(Debug, Clone)]
pub struct LoadPeriodGenerator<'a> {
    scope: LoadScope<'a>,
    start: IntraDayDate,
    end: IntraDayDate,
    allocations: Vec<&'a ResourceAllocation>,
}

impl<'a> LoadPeriodGenerator<'a> {
    pub fn new(
        scope: LoadScope<'a>,
        start: IntraDayDate,
        end: IntraDayDate,
        allocations: Vec<&'a ResourceAllocation>,
    ) -> Self {
        Self {
            scope,
            start,
            end,
            allocations,
        }
    }

    pub fn for_allocation(scope: LoadScope<'a>, allocation: &'a ResourceAllocation) -> Self {
        Self::new(scope, allocation.start(), allocation.end(), vec![allocation])
    }

    pub fn start(&self) -> IntraDayDate {
        self.start
    }

    pub fn end(&self) -> IntraDayDate {
        self.end
    }

    pub fn allocations(&self) -> &[&'a ResourceAllocation] {
        &self.allocations
    }

    pub fn overlaps(&self, other: &LoadPeriodGenerator<'_>) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether `other` lies entirely within this range.
    pub fn is_included(&self, other: &LoadPeriodGenerator<'_>) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Splits two generators into non-overlapping ones. The shared part
    /// carries the allocations of both. Empty pieces are dropped.
    pub fn join(&self, other: &LoadPeriodGenerator<'a>) -> Vec<LoadPeriodGenerator<'a>> {
        if !self.overlaps(other) {
            return vec![self.clone(), other.clone()];
        }
        let (first, second) = if self.start <= other.start {
            (self, other)
        } else {
            (other, self)
        };
        let pieces = if first.is_included(second) {
            vec![
                first.until(second.start),
                first.intersect(second),
                first.since(second.end),
            ]
        } else {
            vec![
                first.until(second.start),
                first.intersect(second),
                second.since(first.end),
            ]
        };
        pieces.into_iter().filter(|g| g.start < g.end).collect()
    }

    fn until(&self, end: IntraDayDate) -> Self {
        Self::new(self.scope, self.start, end, self.allocations.clone())
    }

    fn since(&self, start: IntraDayDate) -> Self {
        Self::new(self.scope, start, self.end, self.allocations.clone())
    }

    fn intersect(&self, other: &LoadPeriodGenerator<'a>) -> Self {
        let mut allocations = self.allocations.clone();
        for allocation in &other.allocations {
            if !allocations.iter().any(|a| a.id() == allocation.id()) {
                allocations.push(*allocation);
            }
        }
        Self::new(
            self.scope,
            self.start.max(other.start),
            self.end.min(other.end),
            allocations,
        )
    }

    /// Computes the period, or drops it with a warning when its range is
    /// inverted.
    pub fn build(&self) -> Option<LoadPeriod> {
        if self.start > self.end {
            warn!(
                start = %self.start,
                end = %self.end,
                "dropping load period that ends before it starts"
            );
            return None;
        }
        let available = self.scope.available_effort(self.start, self.end);
        let assigned: EffortDuration = self
            .allocations
            .iter()
            .map(|a| self.scope.assigned_effort(a, self.start, self.end))
            .sum();
        LoadPeriod::new(
            self.start,
            self.end,
            available.to_string(),
            assigned.to_string(),
            LoadLevel::from_efforts(assigned, available),
        )
        .map_err(|err| warn!(%err, "dropping inconsistent load period"))
        .ok()
    }
}

/// Builds the load timeline of one scope from a set of allocations.
pub struct PeriodsBuilder<'a> {
    scope: LoadScope<'a>,
    allocations: Vec<&'a ResourceAllocation>,
}

impl<'a> PeriodsBuilder<'a> {
    pub fn new(
        scope: LoadScope<'a>,
        allocations: impl IntoIterator<Item = &'a ResourceAllocation>,
    ) -> Self {
        Self {
            scope,
            allocations: allocations.into_iter().collect(),
        }
    }

    pub fn build(&self) -> Vec<LoadPeriod> {
        let generators: Vec<LoadPeriodGenerator<'a>> = self
            .allocations
            .iter()
            .copied()
            .filter(|a| a.is_satisfied() && self.scope.includes(a))
            .map(|a| LoadPeriodGenerator::for_allocation(self.scope, a))
            .collect();
        let merged = Self::merge(generators);
        debug!(segments = merged.len(), "merged load period generators");
        let mut periods: Vec<LoadPeriod> = merged.iter().filter_map(|g| g.build()).collect();
        periods.sort_by_key(|p| (p.start(), p.end()));
        periods
    }

    fn merge(mut pending: Vec<LoadPeriodGenerator<'a>>) -> Vec<LoadPeriodGenerator<'a>> {
        let mut result = Vec::with_capacity(pending.len());
        Self::sort_latest_first(&mut pending);
        while let Some(current) = pending.pop() {
            let overlapping = pending.last().is_some_and(|next| current.overlaps(next));
            if !overlapping {
                result.push(current);
                continue;
            }
            if let Some(next) = pending.pop() {
                pending.extend(current.join(&next));
                Self::sort_latest_first(&mut pending);
            }
        }
        result
    }

    fn sort_latest_first(generators: &mut [LoadPeriodGenerator<'a>]) {
        generators.sort_by(|a, b| (b.start, b.end).cmp(&(a.start, a.end)));
    }
}

/// Load timelines of many resources, computed in parallel.
pub struct LoadChart<'a> {
    resources: &'a [Arc<Resource>],
    allocations: &'a [ResourceAllocation],
}

impl<'a> LoadChart<'a> {
    pub fn new(resources: &'a [Arc<Resource>], allocations: &'a [ResourceAllocation]) -> Self {
        Self {
            resources,
            allocations,
        }
    }

    pub fn build(&self) -> Vec<(ResourceId, Vec<LoadPeriod>)> {
        self.resources
            .par_iter()
            .map(|resource| {
                let scope = LoadScope::OnResource {
                    resource,
                    criteria: &[],
                };
                (
                    resource.id(),
                    PeriodsBuilder::new(scope, self.allocations).build(),
                )
            })
            .collect()
    }
}
