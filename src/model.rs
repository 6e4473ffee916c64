// Model of the data read in this app

use thiserror::Error;

/// Open interval of plausible temperatures in °C.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureRange {
    low: f32,
    high: f32,
}

impl TemperatureRange {
    pub const fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }

    pub const fn low(&self) -> f32 {
        self.low
    }

    pub const fn high(&self) -> f32 {
        self.high
    }

    /// Both bounds are excluded; NaN is never contained.
    pub fn contains(&self, celsius: f32) -> bool {
        celsius > self.low && celsius < self.high
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq)]
#[error("temperature {value} outside ({low}, {high})")]
pub struct OutOfRange {
    pub value: f32,
    pub low: f32,
    pub high: f32,
}

/// A temperature that passed range validation.
///
/// The only constructor is [`Reading::validate`], so anything holding a
/// `Reading` may be submitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading(f32);

impl Reading {
    pub fn validate(celsius: f32, range: TemperatureRange) -> Result<Self, OutOfRange> {
        if range.contains(celsius) {
            Ok(Self(celsius))
        } else {
            Err(OutOfRange {
                value: celsius,
                low: range.low,
                high: range.high,
            })
        }
    }

    pub fn celsius(self) -> f32 {
        self.0
    }
}
