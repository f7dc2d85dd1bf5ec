//! Common test utilities for integration tests
//!
//! This module provides:
//! - A deterministic RNG with Gaussian noise
//! - Tolerance assertions
//! - Heat-pump signal scenarios and filter drivers

#![allow(dead_code)]

pub mod harness;
pub mod scenarios;

use hpukf_core::{
    measurement::Readings,
    HeatPumpUkf, TickStatus, UkfConfig,
};

/// Filter seeded at the neutral state (20 °C / 50 %RH, zero rates)
pub fn neutral_filter(config: UkfConfig) -> HeatPumpUkf {
    let mut ukf = HeatPumpUkf::new(config).expect("valid test config");
    ukf.initialize(&Readings::new());
    ukf
}

/// Filter seeded from a snapshot
pub fn seeded_filter(config: UkfConfig, seed: &Readings) -> HeatPumpUkf {
    let mut ukf = HeatPumpUkf::new(config).expect("valid test config");
    ukf.initialize(seed);
    ukf
}

/// Run `ticks` ticks on the same snapshot, returning the last status
pub fn hold(ukf: &mut HeatPumpUkf, readings: &Readings, ticks: usize) -> TickStatus {
    let mut status = TickStatus::PredictOnly;
    for _ in 0..ticks {
        status = ukf.tick(readings);
    }
    status
}
