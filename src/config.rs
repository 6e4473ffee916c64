//! Compile-time settings for the collector and the sampling cadence.

use core::time::Duration;

use crate::model::TemperatureRange;

/// One scheduler tick, the unit all delays below are expressed in.
pub const TICK_MS: u32 = 1_000;

// Collector
pub const COLLECTOR_HOST: &str = match option_env!("THERMOPUSH_HOST") {
    Some(host) => host,
    None => "cocytus",
};
pub const COLLECTOR_PORT: u16 = 9091;
pub const METRICS_PATH: &str = "/metrics/job/pushgateway/";
pub const USER_AGENT: &str = "esp32/1.0 thom";
pub const METRIC_NAME: &str = "temperature_slaapkamer";

/// Readings outside this open interval are never pushed.
pub const VALID_RANGE: TemperatureRange = TemperatureRange::new(5.0, 45.0);

/// Consecutive failed cycles tolerated before the agent restarts.
pub const RETRY_BUDGET: u32 = 10;

/// Where and as what the readings are pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushTarget {
    pub host: &'static str,
    pub port: u16,
    pub path: &'static str,
    pub user_agent: &'static str,
}

impl PushTarget {
    pub const DEFAULT: Self = Self {
        host: COLLECTOR_HOST,
        port: COLLECTOR_PORT,
        path: METRICS_PATH,
        user_agent: USER_AGENT,
    };
}

impl Default for PushTarget {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Settings for [`PushClient`](crate::client::PushClient).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClientConfig {
    pub target: PushTarget,
    pub metric: &'static str,
    /// Pause between failed DNS lookups
    pub dns_retry_ms: u32,
    /// Pause after a socket could not be allocated
    pub socket_retry_ms: u32,
    /// Bound on connect and send
    pub io_timeout: Duration,
    /// Bound on the response drain
    pub receive_timeout: Duration,
}

impl ClientConfig {
    pub const DEFAULT: Self = Self {
        target: PushTarget::DEFAULT,
        metric: METRIC_NAME,
        dns_retry_ms: 2 * TICK_MS,
        socket_retry_ms: TICK_MS,
        io_timeout: Duration::from_millis(10 * TICK_MS as u64),
        receive_timeout: Duration::from_millis(5 * TICK_MS as u64),
    };
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Settings for [`SamplingLoop`](crate::logic::SamplingLoop).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopConfig {
    /// Settle time after sensor initialisation
    pub warmup_ms: u32,
    /// Pause between cycles
    pub interval_ms: u32,
    /// Extra pause after a failed submission
    pub failure_penalty_ms: u32,
    pub retry_budget: u32,
    pub valid_range: TemperatureRange,
}

impl LoopConfig {
    pub const DEFAULT: Self = Self {
        warmup_ms: 4 * TICK_MS,
        interval_ms: 20 * TICK_MS,
        failure_penalty_ms: 10 * TICK_MS,
        retry_budget: RETRY_BUDGET,
        valid_range: VALID_RANGE,
    };
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
