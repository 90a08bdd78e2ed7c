//! Dependency graphs over limiting queue elements.

mod queue_dag;

pub use queue_dag::DependencyGraph;
