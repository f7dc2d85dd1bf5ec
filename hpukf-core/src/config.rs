//! Estimator Configuration
//!
//! Set once at startup and immutable while the filter runs. Values are
//! checked by [`UkfConfig::validate`]; [`HeatPumpUkf::new`](crate::ukf::HeatPumpUkf::new)
//! refuses an invalid configuration.
//!
//! ```rust
//! use hpukf_core::UkfConfig;
//!
//! let config = UkfConfig::default()
//!     .with_update_interval_ms(5_000)
//!     .with_track_derivatives(false)
//!     .with_autotune(true);
//!
//! assert!(config.validate().is_ok());
//! assert_eq!(config.dt_s(), 5.0);
//! assert_eq!(config.layout().dim(), 4);
//! ```

use crate::{
    autotune::ForgettingFactors,
    constants::{
        defaults::{
            DEFAULT_INITIAL_VARIANCE, DEFAULT_MEASUREMENT_NOISE, DEFAULT_PROCESS_NOISE,
            DEFAULT_UPDATE_INTERVAL_MS, MAX_UPDATE_INTERVAL_MS,
        },
        filter::{M_MAX, N_MAX},
    },
    errors::{ConfigError, ConfigResult, NoiseKind},
    sigma::UnscentedParams,
    state::StateLayout,
};

/// Startup configuration of the estimator
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UkfConfig {
    /// Poll interval (ms); Δt = interval / 1000
    pub update_interval_ms: u32,
    /// Track time derivatives (n = 8) or levels only (n = 4)
    pub track_derivatives: bool,
    /// Adapt Q and R online
    pub autotune: bool,
    /// Forgetting factors of the autotuner
    pub forgetting: ForgettingFactors,
    /// Initial Q diagonal in 8-state order; the first four apply when n = 4
    pub process_noise: [f64; N_MAX],
    /// Initial R diagonal in channel order
    pub measurement_noise: [f64; M_MAX],
    /// Seed variance per state
    pub initial_variance: [f64; N_MAX],
    /// Unscented transform parameters
    pub unscented: UnscentedParams,
}

impl Default for UkfConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
            track_derivatives: true,
            autotune: false,
            forgetting: ForgettingFactors::default(),
            process_noise: DEFAULT_PROCESS_NOISE,
            measurement_noise: DEFAULT_MEASUREMENT_NOISE,
            initial_variance: [DEFAULT_INITIAL_VARIANCE; N_MAX],
            unscented: UnscentedParams::default(),
        }
    }
}

impl UkfConfig {
    /// Set the poll interval
    pub fn with_update_interval_ms(mut self, interval_ms: u32) -> Self {
        self.update_interval_ms = interval_ms;
        self
    }

    /// Enable or disable derivative tracking
    pub fn with_track_derivatives(mut self, enabled: bool) -> Self {
        self.track_derivatives = enabled;
        self
    }

    /// Enable or disable noise autotuning
    pub fn with_autotune(mut self, enabled: bool) -> Self {
        self.autotune = enabled;
        self
    }

    /// Set λ_Q, λ_R,in and λ_R,out
    pub fn with_forgetting_factors(mut self, process: f64, inlet: f64, outlet: f64) -> Self {
        self.forgetting = ForgettingFactors { process, inlet, outlet };
        self
    }

    /// Set the initial Q diagonal
    pub fn with_process_noise(mut self, noise: [f64; N_MAX]) -> Self {
        self.process_noise = noise;
        self
    }

    /// Set the initial R diagonal
    pub fn with_measurement_noise(mut self, noise: [f64; M_MAX]) -> Self {
        self.measurement_noise = noise;
        self
    }

    /// Set the same seed variance for every state
    pub fn with_initial_variance(mut self, variance: f64) -> Self {
        self.initial_variance = [variance; N_MAX];
        self
    }

    /// Set the unscented transform parameters
    pub fn with_unscented(mut self, params: UnscentedParams) -> Self {
        self.unscented = params;
        self
    }

    /// State layout implied by the derivative flag
    pub fn layout(&self) -> StateLayout {
        StateLayout::from_tracking(self.track_derivatives)
    }

    /// Tick length in seconds
    pub fn dt_s(&self) -> f64 {
        f64::from(self.update_interval_ms) / 1000.0
    }

    /// Check every value before the filter starts
    pub fn validate(&self) -> ConfigResult<()> {
        if self.update_interval_ms == 0 || self.update_interval_ms > MAX_UPDATE_INTERVAL_MS {
            return Err(ConfigError::InvalidUpdateInterval {
                interval_ms: self.update_interval_ms,
                max_ms: MAX_UPDATE_INTERVAL_MS,
            });
        }

        self.forgetting.validate()?;

        check_noise(NoiseKind::Process, &self.process_noise, false)?;
        check_noise(NoiseKind::Measurement, &self.measurement_noise, false)?;
        check_noise(NoiseKind::InitialVariance, &self.initial_variance, true)?;

        let spread = self.unscented.spread(self.layout().dim());
        if !(spread > 0.0) || !spread.is_finite() {
            return Err(ConfigError::InvalidUnscentedParams { spread });
        }

        Ok(())
    }
}

fn check_noise(kind: NoiseKind, values: &[f64], strictly_positive: bool) -> ConfigResult<()> {
    for (index, &value) in values.iter().enumerate() {
        let ok = value.is_finite() && if strictly_positive { value > 0.0 } else { value >= 0.0 };
        if !ok {
            return Err(ConfigError::NegativeNoise { kind, index, value });
        }
    }
    Ok(())
}
