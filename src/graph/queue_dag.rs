use crate::queue::{
    DependencyKind, ElementRef, LimitingResourceQueue, LimitingResourceQueueElement,
    QueueDependency, QueueElementId, QueueError,
};
use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

/// Elements as nodes, dependencies as edges from origin to destiny.
///
/// Endpoints that are referenced but not among the built elements still get
/// a node, so paths through other queues are not lost.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    pub graph: DiGraph<QueueElementId, DependencyKind>,
    pub id_to_index: HashMap<QueueElementId, NodeIndex>,
    persisted_to_index: HashMap<u64, NodeIndex>,
}

impl DependencyGraph {
    pub fn build<'e>(elements: impl IntoIterator<Item = &'e LimitingResourceQueueElement>) -> Self {
        let mut dag = Self::default();
        let mut dependencies: Vec<QueueDependency> = Vec::new();
        let mut seen: HashSet<QueueDependency> = HashSet::new();

        // Nodes first
        for element in elements {
            dag.node_for(element.element_ref());
            for dependency in element
                .dependencies_as_origin()
                .iter()
                .chain(element.dependencies_as_destiny())
            {
                if seen.insert(*dependency) {
                    dependencies.push(*dependency);
                }
            }
        }

        // Edges: origin -> destiny
        for dependency in dependencies {
            let u = dag.node_for(dependency.origin());
            let v = dag.node_for(dependency.destiny());
            dag.graph.add_edge(u, v, dependency.kind());
        }
        dag
    }

    pub fn from_queues(queues: &[LimitingResourceQueue]) -> Self {
        Self::build(queues.iter().flat_map(|q| q.elements()))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, element: ElementRef) -> bool {
        self.index_of(element).is_some()
    }

    /// Whether adding `origin -> destiny` would close a cycle.
    pub fn would_create_cycle(&self, origin: ElementRef, destiny: ElementRef) -> bool {
        if origin.same_element(&destiny) {
            return true;
        }
        match (self.index_of(origin), self.index_of(destiny)) {
            (Some(u), Some(v)) => has_path_connecting(&self.graph, v, u, None),
            _ => false,
        }
    }

    pub fn ensure_acyclic(&self) -> Result<(), QueueError> {
        self.topological_order().map(|_| ())
    }

    /// Elements ordered so every origin precedes its destinies.
    pub fn topological_order(&self) -> Result<Vec<QueueElementId>, QueueError> {
        toposort(&self.graph, None)
            .map(|order| order.into_iter().map(|ix| self.graph[ix]).collect())
            .map_err(|cycle| QueueError::CycleDetected(self.graph[cycle.node_id()]))
    }

    fn index_of(&self, element: ElementRef) -> Option<NodeIndex> {
        self.id_to_index.get(&element.id).copied().or_else(|| {
            element
                .persisted_id
                .and_then(|persisted| self.persisted_to_index.get(&persisted).copied())
        })
    }

    fn node_for(&mut self, element: ElementRef) -> NodeIndex {
        if let Some(ix) = self.index_of(element) {
            return ix;
        }
        let ix = self.graph.add_node(element.id);
        self.id_to_index.insert(element.id, ix);
        if let Some(persisted) = element.persisted_id {
            self.persisted_to_index.insert(persisted, ix);
        }
        ix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::{AllocationId, ResourceAllocation, TaskWindow};
    use crate::resource::{Resource, ResourceId};
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn element(id: u32) -> LimitingResourceQueueElement {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let resource = Arc::new(Resource::new(ResourceId(1), "crane").limiting(true));
        let task = TaskWindow::between_dates(day, day).unwrap();
        let allocation = ResourceAllocation::specific(AllocationId(id), resource, task);
        LimitingResourceQueueElement::new(QueueElementId(id), allocation, day.and_hms_opt(0, 0, 0).unwrap())
    }

    fn dep(origin: u32, destiny: u32) -> QueueDependency {
        QueueDependency::new(
            ElementRef::new(QueueElementId(origin)),
            ElementRef::new(QueueElementId(destiny)),
            DependencyKind::EndStart,
        )
    }

    #[test]
    fn path_back_to_origin_is_a_cycle() {
        let mut a = element(1);
        let mut b = element(2);
        a.add(dep(1, 2)).unwrap();
        b.add(dep(1, 2)).unwrap();
        let dag = DependencyGraph::build([&a, &b]);
        assert_eq!(dag.edge_count(), 1);
        assert!(dag.would_create_cycle(ElementRef::new(QueueElementId(2)), ElementRef::new(QueueElementId(1))));
        assert!(!dag.would_create_cycle(ElementRef::new(QueueElementId(1)), ElementRef::new(QueueElementId(2))));
        assert_eq!(dag.topological_order().unwrap(), vec![QueueElementId(1), QueueElementId(2)]);
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let a = element(1);
        let dag = DependencyGraph::build([&a]);
        let me = ElementRef::new(QueueElementId(1));
        assert!(dag.would_create_cycle(me, me));
    }
}
