//! Temperature push agent.
//!
//! Samples a temperature sensor on a fixed cadence and pushes every valid
//! reading to a Pushgateway-style collector over a plain HTTP/1.0 exchange.
//!
//! Everything outside `hardware` and `network` is hardware independent and
//! talks to the device through the traits in [`traits`].

#![cfg_attr(not(test), no_std)]

pub mod client;
pub mod config;
pub mod logic;
pub mod metrics;
pub mod model;
pub mod resolver;
pub mod traits;

#[cfg(target_arch = "xtensa")]
pub mod hardware;

#[cfg(target_arch = "xtensa")]
pub mod network;

#[cfg(test)]
mod mock;
