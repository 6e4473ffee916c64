//! Business logic layer (hardware-independent)
//!
//! The sampling loop reads the sensor, rejects implausible values, hands the
//! rest to a [`ReadingSink`] and keeps count of consecutive failures. When
//! the retry budget runs out, [`SamplingLoop::run`] returns and the caller
//! restarts the device.

use embedded_hal_async::delay::DelayNs;
use log::{error, info, warn};
use thiserror::Error;

use crate::client::SubmitError;
use crate::config::LoopConfig;
use crate::model::{OutOfRange, Reading};
use crate::traits::{ReadingSink, TemperatureSensor};

/// Why a cycle did not deliver a reading
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum CycleFailure {
    #[error("sensor read failed: {0}")]
    Sensor(&'static str),
    #[error(transparent)]
    OutOfRange(#[from] OutOfRange),
    #[error(transparent)]
    Submit(#[from] SubmitError),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoopStats {
    pub cycles: u32,
    pub submitted: u32,
    pub rejected: u32,
    pub failed: u32,
}

/// Returned once the retry budget is spent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopExit {
    pub stats: LoopStats,
    pub last_failure: CycleFailure,
}

pub struct SamplingLoop<S, P, D> {
    sensor: S,
    sink: P,
    delay: D,
    config: LoopConfig,
    stats: LoopStats,
}

impl<S, P, D> SamplingLoop<S, P, D>
where
    S: TemperatureSensor,
    P: ReadingSink,
    D: DelayNs,
{
    /// `sensor` must already be initialised.
    pub fn new(sensor: S, sink: P, delay: D, config: LoopConfig) -> Self {
        Self {
            sensor,
            sink,
            delay,
            config,
            stats: LoopStats::default(),
        }
    }

    /// Sample until `retry_budget` consecutive cycles have failed.
    pub async fn run(&mut self) -> LoopExit {
        info!("Waiting for initialisation...");
        self.delay.delay_ms(self.config.warmup_ms).await;

        let mut budget = self.config.retry_budget;
        loop {
            match self.cycle().await {
                Ok(_) => budget = self.config.retry_budget,
                Err(failure) => {
                    budget = budget.saturating_sub(1);
                    if budget == 0 {
                        error!("Retry budget spent, last failure: {}", failure);
                        return LoopExit {
                            stats: self.stats,
                            last_failure: failure,
                        };
                    }
                    warn!("Cycle failed ({}), {} attempts left", failure, budget);
                }
            }
            self.delay.delay_ms(self.config.interval_ms).await;
        }
    }

    /// One measure-and-submit round.
    pub async fn cycle(&mut self) -> Result<Reading, CycleFailure> {
        self.stats.cycles += 1;

        let celsius = self.sensor.read_temperature().map_err(CycleFailure::Sensor)?;
        info!("Temp = {:.6}", celsius);

        let reading = match Reading::validate(celsius, self.config.valid_range) {
            Ok(reading) => reading,
            Err(e) => {
                error!("Invalid temperature: {}", e);
                self.stats.rejected += 1;
                return Err(e.into());
            }
        };

        if let Err(e) = self.sink.submit(reading).await {
            info!("Submitting temperature failed");
            self.stats.failed += 1;
            self.delay.delay_ms(self.config.failure_penalty_ms).await;
            return Err(e.into());
        }

        self.stats.submitted += 1;
        Ok(reading)
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }
}
