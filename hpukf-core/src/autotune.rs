//! EM Noise Autotuner
//!
//! Re-estimates the diagonals of Q and R after every successful update by
//! innovation-based covariance matching with exponential memory:
//!
//! ```text
//! r_j ← λ_R,g(j) · r_j + (1 − λ_R,g(j)) · max(R_MIN, ν_j² − Ŝ_jj)
//! q_i ← λ_Q      · q_i + (1 − λ_Q)      · max(Q_MIN, (Kν)_i²)
//! ```
//!
//! `ν` is the innovation, `Ŝ` the predicted measurement covariance *before*
//! R was added, and `Kν` the correction the update applied to the state.
//! Subtracting `Ŝ` keeps uncertainty the filter already models from being
//! counted again as sensor noise.
//!
//! Each measurement channel uses the forgetting factor of its sensor group,
//! so inlet and outlet noise adapt at different speeds. Only observed
//! channels move; an absent channel keeps its R. Off-diagonal terms are not
//! modelled.
//!
//! Both tables are floored ([`PROCESS_NOISE_FLOOR`],
//! [`MEASUREMENT_NOISE_FLOOR`]) after every step so Q and R stay positive
//! definite whatever the residuals look like.

use heapless::Vec;

use crate::{
    constants::{
        defaults::{DEFAULT_LAMBDA_Q, DEFAULT_LAMBDA_R_INLET, DEFAULT_LAMBDA_R_OUTLET},
        filter::{M_MAX, MEASUREMENT_NOISE_FLOOR, N_MAX, PROCESS_NOISE_FLOOR},
    },
    errors::{ConfigError, ConfigResult, FactorKind},
    measurement::{Channel, MeasurementVector, SensorGroup},
    state::StateVector,
};

/// The three independent forgetting factors
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ForgettingFactors {
    /// λ_Q
    pub process: f64,
    /// λ_R,in
    pub inlet: f64,
    /// λ_R,out
    pub outlet: f64,
}

impl Default for ForgettingFactors {
    fn default() -> Self {
        Self {
            process: DEFAULT_LAMBDA_Q,
            inlet: DEFAULT_LAMBDA_R_INLET,
            outlet: DEFAULT_LAMBDA_R_OUTLET,
        }
    }
}

impl ForgettingFactors {
    /// Factor by kind
    pub fn get(&self, kind: FactorKind) -> f64 {
        match kind {
            FactorKind::Process => self.process,
            FactorKind::Inlet => self.inlet,
            FactorKind::Outlet => self.outlet,
        }
    }

    /// Measurement-noise factor of a sensor group
    pub fn for_group(&self, group: SensorGroup) -> f64 {
        match group {
            SensorGroup::Inlet => self.inlet,
            SensorGroup::Outlet => self.outlet,
        }
    }

    /// Every factor must lie in (0, 1]
    pub fn validate(&self) -> ConfigResult<()> {
        for kind in [FactorKind::Process, FactorKind::Inlet, FactorKind::Outlet] {
            let value = self.get(kind);
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::ForgettingFactorOutOfRange { factor: kind, value });
            }
        }
        Ok(())
    }
}

/// What one update step leaves behind for the autotuner
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateResiduals {
    channels: Vec<Channel, M_MAX>,
    innovation: MeasurementVector,
    predicted_variance: MeasurementVector,
    correction: StateVector,
    state_dim: usize,
}

impl UpdateResiduals {
    /// Bundle the residuals of one update
    ///
    /// `predicted_variance` is diag(Pzz) without R, in the order of `channels`.
    pub fn new(
        channels: &[Channel],
        innovation: MeasurementVector,
        predicted_variance: MeasurementVector,
        correction: StateVector,
        state_dim: usize,
    ) -> Self {
        let mut list = Vec::new();
        for channel in channels.iter().take(M_MAX) {
            let _ = list.push(*channel);
        }
        Self {
            channels: list,
            innovation,
            predicted_variance,
            correction,
            state_dim,
        }
    }

    /// Observed channels
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// ν = z − ẑ
    pub fn innovation(&self) -> &[f64] {
        &self.innovation[..self.channels.len()]
    }

    /// diag(Pzz) before R
    pub fn predicted_variance(&self) -> &[f64] {
        &self.predicted_variance[..self.channels.len()]
    }

    /// Kν
    pub fn correction(&self) -> &[f64] {
        &self.correction[..self.state_dim]
    }
}

/// Recursive Q/R estimator
#[derive(Debug, Clone, PartialEq)]
pub struct EmAutotuner {
    factors: ForgettingFactors,
    steps: u32,
}

impl EmAutotuner {
    /// Create with fixed forgetting factors
    pub fn new(factors: ForgettingFactors) -> Self {
        Self { factors, steps: 0 }
    }

    /// Forgetting factors in use
    pub fn factors(&self) -> &ForgettingFactors {
        &self.factors
    }

    /// Number of adaptation steps taken
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// One adaptation step from one update's residuals
    ///
    /// Non-finite samples leave their entry untouched.
    pub fn adapt(
        &mut self,
        residuals: &UpdateResiduals,
        process_noise: &mut [f64; N_MAX],
        measurement_noise: &mut [f64; M_MAX],
    ) {
        for (k, channel) in residuals.channels().iter().enumerate() {
            let nu = residuals.innovation[k];
            let sample = nu * nu - residuals.predicted_variance[k];
            if !sample.is_finite() {
                continue;
            }
            let lambda = self.factors.for_group(channel.group());
            let r = &mut measurement_noise[channel.index()];
            *r = blend(*r, sample.max(MEASUREMENT_NOISE_FLOOR), lambda).max(MEASUREMENT_NOISE_FLOOR);
        }

        let lambda = self.factors.process;
        for (q, dx) in process_noise.iter_mut().zip(residuals.correction()) {
            let sample = dx * dx;
            if !sample.is_finite() {
                continue;
            }
            *q = blend(*q, sample.max(PROCESS_NOISE_FLOOR), lambda).max(PROCESS_NOISE_FLOOR);
        }

        self.steps = self.steps.saturating_add(1);
        if self.steps == 1 {
            log_debug!(
                "autotune first step: R = {:?}, Q = {:?}",
                measurement_noise,
                &process_noise[..residuals.state_dim]
            );
        }
    }
}

#[inline]
fn blend(previous: f64, sample: f64, lambda: f64) -> f64 {
    lambda * previous + (1.0 - lambda) * sample
}
