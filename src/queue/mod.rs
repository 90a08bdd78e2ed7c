//! Queues that serialize the work of limiting resources.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

mod date_and_hour;
mod element;
mod limiting_queue;

pub use date_and_hour::DateAndHour;
pub use element::{
    DependencyKind, ElementRef, LimitingResourceQueueElement, QueueDependency, QueuePosition,
};
pub use limiting_queue::LimitingResourceQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QueueId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QueueElementId(pub u32);

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.0)
    }
}

impl fmt::Display for QueueElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("element {element} is neither origin nor destiny of dependency {origin} -> {destiny}")]
    NotAnEndpoint {
        element: QueueElementId,
        origin: QueueElementId,
        destiny: QueueElementId,
    },
    #[error("no element {0} in the queue")]
    UnknownElement(QueueElementId),
    #[error("element {0} is already queued")]
    DuplicateElement(QueueElementId),
    #[error("element {element} would end at {end}, before its start {start}")]
    InvalidPosition {
        element: QueueElementId,
        start: DateAndHour,
        end: DateAndHour,
    },
    #[error("dependency {origin} -> {destiny} would close a cycle")]
    Cycle {
        origin: QueueElementId,
        destiny: QueueElementId,
    },
    #[error("dependencies form a cycle through element {0}")]
    CycleDetected(QueueElementId),
}
