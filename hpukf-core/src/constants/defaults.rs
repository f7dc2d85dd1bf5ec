//! Default Configuration Values
//!
//! Noise levels were obtained by letting the EM autotuner converge on a
//! week of field data from an air-to-water heat pump (inlet probe in the
//! return duct, outlet probe after the evaporator coil). They are good
//! starting points for similar installations.

use super::filter::{M_MAX, N_MAX};

/// Poll interval (milliseconds).
///
/// Source: Host component default of one tick per second
pub const DEFAULT_UPDATE_INTERVAL_MS: u32 = 1000;

/// Largest accepted poll interval (milliseconds).
///
/// Beyond one hour the constant-derivative model is meaningless.
pub const MAX_UPDATE_INTERVAL_MS: u32 = 3_600_000;

/// Process-noise diagonal Q in canonical 8-state order
/// `[T_in, RH_in, T_out, RH_out, dT_in, dRH_in, dT_out, dRH_out]`.
///
/// Units: °C², %², (°C/s)², (%/s)² per tick.
///
/// Source: EM-converged values from field data
pub const DEFAULT_PROCESS_NOISE: [f64; N_MAX] = [
    0.000337, // T_in
    0.000183, // RH_in
    0.000829, // T_out
    0.001065, // RH_out
    0.01,     // dT_in
    0.001,    // dRH_in
    0.01,     // dT_out
    0.001,    // dRH_out
];

/// Measurement-noise diagonal R in channel order `[T_in, RH_in, T_out, RH_out]`.
///
/// The inlet probe sits in turbulent return air and is far noisier than the
/// outlet probe.
///
/// Source: EM-converged values from field data
pub const DEFAULT_MEASUREMENT_NOISE: [f64; M_MAX] = [
    0.025809, // T_in
    0.189530, // RH_in
    0.000058, // T_out
    0.000374, // RH_out
];

/// Seed variance for every state component.
pub const DEFAULT_INITIAL_VARIANCE: f64 = 1.0;

/// Forgetting factor for process-noise adaptation.
///
/// Effective memory 1/(1-λ) = 200 ticks.
pub const DEFAULT_LAMBDA_Q: f64 = 0.995;

/// Forgetting factor for inlet measurement-noise adaptation.
///
/// Effective memory 500 ticks; inlet noise is stationary.
pub const DEFAULT_LAMBDA_R_INLET: f64 = 0.998;

/// Forgetting factor for outlet measurement-noise adaptation.
///
/// Effective memory 50 ticks; outlet noise shifts with compressor state.
pub const DEFAULT_LAMBDA_R_OUTLET: f64 = 0.98;
