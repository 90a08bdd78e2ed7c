use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};
use std::str::FromStr;
use thiserror::Error;

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 3_600;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueParseError {
    #[error("empty value")]
    Empty,
    #[error("invalid component `{0}`")]
    InvalidComponent(String),
    #[error("too many components in `{0}` (expected H, H:MM or H:MM:SS)")]
    TooManyComponents(String),
    #[error("minutes and seconds must be below 60 in `{0}`")]
    OutOfRange(String),
    #[error("`{0}` is too large for an effort")]
    TooLarge(String),
}

/// Non-negative amount of work time with second granularity.
///
/// Constructors and additions saturate at `u64::MAX` seconds. Subtraction
/// below zero is a usage error and panics; use
/// [`EffortDuration::checked_minus`] when the operands are not known to be
/// ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EffortDuration {
    seconds: u64,
}

impl EffortDuration {
    pub const fn zero() -> Self {
        Self { seconds: 0 }
    }

    pub const fn seconds(seconds: u64) -> Self {
        Self { seconds }
    }

    pub const fn minutes(minutes: u64) -> Self {
        Self::seconds(minutes.saturating_mul(SECONDS_PER_MINUTE))
    }

    pub const fn hours(hours: u64) -> Self {
        Self::seconds(hours.saturating_mul(SECONDS_PER_HOUR))
    }

    pub const fn hours_and_minutes(hours: u64, minutes: u64) -> Self {
        Self::hours(hours).plus(Self::minutes(minutes))
    }

    pub const fn as_seconds(self) -> u64 {
        self.seconds
    }

    pub const fn is_zero(self) -> bool {
        self.seconds == 0
    }

    pub const fn plus(self, other: Self) -> Self {
        Self::seconds(self.seconds.saturating_add(other.seconds))
    }

    /// Panics if `other` is greater than `self`.
    pub fn minus(self, other: Self) -> Self {
        match self.checked_minus(other) {
            Some(result) => result,
            None => panic!("cannot subtract {other} from {self}: effort would be negative"),
        }
    }

    pub fn checked_minus(self, other: Self) -> Option<Self> {
        self.seconds.checked_sub(other.seconds).map(Self::seconds)
    }

    pub fn saturating_minus(self, other: Self) -> Self {
        Self::seconds(self.seconds.saturating_sub(other.seconds))
    }

    pub const fn multiply_by(self, factor: u64) -> Self {
        Self::seconds(self.seconds.saturating_mul(factor))
    }

    /// Integer division, rounding down to the second.
    pub fn divide_by(self, divisor: u64) -> Self {
        assert!(divisor > 0, "effort cannot be divided by zero");
        Self::seconds(self.seconds / divisor)
    }

    /// How many whole `other` fit in `self`.
    pub fn divide_by_duration(self, other: Self) -> u64 {
        assert!(!other.is_zero(), "effort cannot be divided by a zero duration");
        self.seconds / other.seconds
    }

    pub fn sum<T, F>(items: impl IntoIterator<Item = T>, extractor: F) -> Self
    where
        F: FnMut(T) -> Self,
    {
        items.into_iter().map(extractor).sum()
    }

    pub fn hours_part(self) -> u64 {
        self.seconds / SECONDS_PER_HOUR
    }

    pub fn minutes_part(self) -> u64 {
        (self.seconds % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE
    }

    pub fn seconds_part(self) -> u64 {
        self.seconds % SECONDS_PER_MINUTE
    }

    /// Whole hours, half an hour or more rounding up.
    pub fn round_to_hours(self) -> u64 {
        (self.seconds + SECONDS_PER_HOUR / 2) / SECONDS_PER_HOUR
    }

    pub fn at_nearest_minute(self) -> Self {
        let minutes = (self.seconds + SECONDS_PER_MINUTE / 2) / SECONDS_PER_MINUTE;
        Self::minutes(minutes)
    }
}

impl Add for EffortDuration {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.plus(rhs)
    }
}

impl Sub for EffortDuration {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.minus(rhs)
    }
}

impl Sum for EffortDuration {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Self::plus)
    }
}

impl<'a> Sum<&'a EffortDuration> for EffortDuration {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl fmt::Display for EffortDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}", self.hours_part(), self.minutes_part())?;
        if self.seconds_part() != 0 {
            write!(f, ":{:02}", self.seconds_part())?;
        }
        Ok(())
    }
}

impl FromStr for EffortDuration {
    type Err = ValueParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValueParseError::Empty);
        }
        let parts: Vec<&str> = trimmed.split(':').collect();
        if parts.len() > 3 {
            return Err(ValueParseError::TooManyComponents(trimmed.to_string()));
        }
        let mut values = [0u64; 3];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .trim()
                .parse::<u64>()
                .map_err(|_| ValueParseError::InvalidComponent(part.to_string()))?;
        }
        let [hours, minutes, seconds] = values;
        if minutes >= 60 || seconds >= 60 {
            return Err(ValueParseError::OutOfRange(trimmed.to_string()));
        }
        hours
            .checked_mul(SECONDS_PER_HOUR)
            .and_then(|total| total.checked_add(minutes * SECONDS_PER_MINUTE + seconds))
            .map(Self::seconds)
            .ok_or_else(|| ValueParseError::TooLarge(trimmed.to_string()))
    }
}

impl TryFrom<String> for EffortDuration {
    type Error = ValueParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EffortDuration> for String {
    fn from(value: EffortDuration) -> Self {
        value.to_string()
    }
}

/// How much work a day can absorb.
///
/// `allowed_extra_effort` of `None` means the day can be over-assigned
/// without limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capacity {
    standard_effort: EffortDuration,
    #[serde(default)]
    allowed_extra_effort: Option<EffortDuration>,
}

impl Capacity {
    /// Capacity without any overtime allowance.
    pub fn create(standard_effort: EffortDuration) -> Self {
        Self {
            standard_effort,
            allowed_extra_effort: Some(EffortDuration::zero()),
        }
    }

    pub fn zero() -> Self {
        Self::create(EffortDuration::zero())
    }

    pub fn standard_effort(&self) -> EffortDuration {
        self.standard_effort
    }

    pub fn allowed_extra_effort(&self) -> Option<EffortDuration> {
        self.allowed_extra_effort
    }

    pub fn is_zero(&self) -> bool {
        self.standard_effort.is_zero()
    }

    pub fn is_over_assignable_without_limit(&self) -> bool {
        self.allowed_extra_effort.is_none()
    }

    pub fn over_assignable_without_limit(self) -> Self {
        Self {
            allowed_extra_effort: None,
            ..self
        }
    }

    pub fn not_over_assignable_without_limit(self) -> Self {
        Self {
            allowed_extra_effort: Some(self.allowed_extra_effort.unwrap_or_default()),
            ..self
        }
    }

    pub fn with_allowed_extra_effort(self, extra: EffortDuration) -> Self {
        Self {
            allowed_extra_effort: Some(extra),
            ..self
        }
    }

    pub fn with_standard_effort(self, standard_effort: EffortDuration) -> Self {
        Self {
            standard_effort,
            ..self
        }
    }

    /// Clamps `duration` to standard plus extra effort.
    pub fn limit_duration(&self, duration: EffortDuration) -> EffortDuration {
        match self.allowed_extra_effort {
            None => duration,
            Some(extra) => duration.min(self.standard_effort.plus(extra)),
        }
    }

    pub fn has_spare_space_for_more_allocations(&self, assigned: EffortDuration) -> bool {
        match self.allowed_extra_effort {
            None => true,
            Some(extra) => assigned < self.standard_effort.plus(extra),
        }
    }

    pub fn min_of(a: Capacity, b: Capacity) -> Capacity {
        let extra = match (a.allowed_extra_effort, b.allowed_extra_effort) {
            (None, other) | (other, None) => other,
            (Some(x), Some(y)) => Some(x.min(y)),
        };
        Capacity {
            standard_effort: a.standard_effort.min(b.standard_effort),
            allowed_extra_effort: extra,
        }
    }

    pub fn max_of(a: Capacity, b: Capacity) -> Capacity {
        let extra = match (a.allowed_extra_effort, b.allowed_extra_effort) {
            (Some(x), Some(y)) => Some(x.max(y)),
            _ => None,
        };
        Capacity {
            standard_effort: a.standard_effort.max(b.standard_effort),
            allowed_extra_effort: extra,
        }
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.allowed_extra_effort {
            None => write!(f, "{} (+unlimited)", self.standard_effort),
            Some(extra) if extra.is_zero() => write!(f, "{}", self.standard_effort),
            Some(extra) => write!(f, "{} (+{})", self.standard_effort, extra),
        }
    }
}

/// Allocation intensity relative to one resource working a full day,
/// held as hundredths (`1.25` is stored as `125`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourcesPerDay {
    hundredths: u32,
}

impl ResourcesPerDay {
    pub const fn amount(units: u32) -> Self {
        Self {
            hundredths: units.saturating_mul(100),
        }
    }

    pub const fn from_hundredths(hundredths: u32) -> Self {
        Self { hundredths }
    }

    pub const fn hundredths(self) -> u32 {
        self.hundredths
    }

    pub const fn is_zero(self) -> bool {
        self.hundredths == 0
    }

    /// Effort produced in a day whose working time is `working_day`,
    /// rounded half up to the second.
    pub fn as_duration_given_working_day_of(self, working_day: EffortDuration) -> EffortDuration {
        let scaled = u128::from(working_day.as_seconds()) * u128::from(self.hundredths);
        EffortDuration::seconds(u64::try_from((scaled * 2 + 100) / 200).unwrap_or(u64::MAX))
    }

    /// Calendar time one resource needs to produce `effort` at this
    /// intensity, rounded half up to the second.
    pub fn calendar_time_for(self, effort: EffortDuration) -> EffortDuration {
        assert!(!self.is_zero(), "zero resources per day never produce effort");
        let h = u128::from(self.hundredths);
        let seconds = (u128::from(effort.as_seconds()) * 200 + h) / (2 * h);
        EffortDuration::seconds(u64::try_from(seconds).unwrap_or(u64::MAX))
    }

    /// Intensity that produces `total` given `workable` effort at one
    /// resource per day. Zero when nothing is workable.
    pub fn calculate_from(total: EffortDuration, workable: EffortDuration) -> Self {
        if workable.is_zero() {
            return Self::default();
        }
        let w = u128::from(workable.as_seconds());
        let hundredths = (u128::from(total.as_seconds()) * 200 + w) / (2 * w);
        Self::from_hundredths(u32::try_from(hundredths).unwrap_or(u32::MAX))
    }
}

impl fmt::Display for ResourcesPerDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.hundredths / 100, self.hundredths % 100)
    }
}

impl FromStr for ResourcesPerDay {
    type Err = ValueParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValueParseError::Empty);
        }
        let invalid = || ValueParseError::InvalidComponent(trimmed.to_string());
        let (int_part, frac_part) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        let units: u32 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid())?
        };
        if !frac_part.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let digits: Vec<u32> = frac_part.chars().filter_map(|c| c.to_digit(10)).collect();
        let tenths = digits.first().copied().unwrap_or(0);
        let cents = digits.get(1).copied().unwrap_or(0);
        let round_up = u32::from(digits.get(2).is_some_and(|d| *d >= 5));
        units
            .checked_mul(100)
            .and_then(|v| v.checked_add(tenths * 10 + cents + round_up))
            .map(Self::from_hundredths)
            .ok_or_else(invalid)
    }
}

impl TryFrom<String> for ResourcesPerDay {
    type Error = ValueParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResourcesPerDay> for String {
    fn from(value: ResourcesPerDay) -> Self {
        value.to_string()
    }
}
