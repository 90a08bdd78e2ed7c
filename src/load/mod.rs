use crate::effort::EffortDuration;
use crate::intraday::IntraDayDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod generator;

pub use generator::{LoadChart, LoadPeriodGenerator, LoadScope, PeriodsBuilder};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("load period start {start} is after its end {end}")]
    InvalidInterval {
        start: IntraDayDate,
        end: IntraDayDate,
    },
    #[error("load periods overlap: [{first_start}, {first_end}) and [{second_start}, {second_end})")]
    Overlapping {
        first_start: IntraDayDate,
        first_end: IntraDayDate,
        second_start: IntraDayDate,
        second_end: IntraDayDate,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadCategory {
    NoLoad,
    SomeLoad,
    FullLoad,
    Overload,
}

/// Percentage of the available effort that is assigned.
/// [`LoadLevel::INFINITE`] marks effort assigned where none is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoadLevel {
    percentage: u32,
}

impl LoadLevel {
    pub const INFINITE: u32 = u32::MAX;

    pub fn new(percentage: u32) -> Self {
        Self { percentage }
    }

    pub fn from_efforts(assigned: EffortDuration, available: EffortDuration) -> Self {
        if available.is_zero() {
            let percentage = if assigned.is_zero() { 0 } else { Self::INFINITE };
            return Self::new(percentage);
        }
        let a = u128::from(assigned.as_seconds());
        let v = u128::from(available.as_seconds());
        let rounded = (a * 200 + v) / (2 * v);
        Self::new(u32::try_from(rounded).unwrap_or(Self::INFINITE - 1))
    }

    pub fn percentage(&self) -> u32 {
        self.percentage
    }

    pub fn is_infinite(&self) -> bool {
        self.percentage == Self::INFINITE
    }

    pub fn category(&self) -> LoadCategory {
        match self.percentage {
            0 => LoadCategory::NoLoad,
            1..=99 => LoadCategory::SomeLoad,
            100 => LoadCategory::FullLoad,
            _ => LoadCategory::Overload,
        }
    }
}

/// One segment of a load timeline. Efforts are kept as display strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadPeriod {
    start: IntraDayDate,
    end: IntraDayDate,
    available_effort: String,
    assigned_effort: String,
    level: LoadLevel,
}

impl LoadPeriod {
    pub fn new(
        start: IntraDayDate,
        end: IntraDayDate,
        available_effort: impl Into<String>,
        assigned_effort: impl Into<String>,
        level: LoadLevel,
    ) -> Result<Self, LoadError> {
        if start > end {
            return Err(LoadError::InvalidInterval { start, end });
        }
        Ok(Self {
            start,
            end,
            available_effort: available_effort.into(),
            assigned_effort: assigned_effort.into(),
            level,
        })
    }

    pub fn start(&self) -> IntraDayDate {
        self.start
    }

    pub fn end(&self) -> IntraDayDate {
        self.end
    }

    pub fn available_effort(&self) -> &str {
        &self.available_effort
    }

    pub fn assigned_effort(&self) -> &str {
        &self.assigned_effort
    }

    pub fn level(&self) -> LoadLevel {
        self.level
    }

    pub fn overlaps(&self, other: &LoadPeriod) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Sorts by start, rejecting periods that overlap.
    pub fn sort(mut periods: Vec<LoadPeriod>) -> Result<Vec<LoadPeriod>, LoadError> {
        periods.sort_by_key(|p| (p.start, p.end));
        for pair in periods.windows(2) {
            if pair[0].overlaps(&pair[1]) {
                return Err(LoadError::Overlapping {
                    first_start: pair[0].start,
                    first_end: pair[0].end,
                    second_start: pair[1].start,
                    second_end: pair[1].end,
                });
            }
        }
        Ok(periods)
    }
}
