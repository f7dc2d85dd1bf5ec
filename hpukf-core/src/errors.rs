//! Error Types for the Estimator
//!
//! ## Design Philosophy
//!
//! The estimator runs inside a host polling loop on small devices, so errors
//! follow the same rules as the rest of the crate:
//!
//! 1. **Small Size**: scalar payloads only, no `String`
//! 2. **Copy Semantics**: errors are cheap to return and to store in a tick report
//! 3. **Never Fatal**: every runtime error has a local recovery, and the tick
//!    that hit it still completes and publishes
//!
//! ## Runtime Errors
//!
//! - `NotPositiveDefinite`: a Cholesky pivot collapsed. The caller inflates the
//!   diagonal and retries once; a second failure resets the filter to its seed.
//! - `FilterDiverged`: a state or covariance entry went non-finite. The filter
//!   resets to its seed.
//!
//! A tick without any live sensor is *not* an error; it is reported as
//! [`TickStatus::PredictOnly`](crate::ukf::TickStatus::PredictOnly).
//!
//! ## Configuration Errors
//!
//! [`ConfigError`] is returned by [`UkfConfig::validate`](crate::config::UkfConfig::validate)
//! before a filter is built. Once running, the configuration is immutable.
//!
//! ```rust
//! use hpukf_core::{UkfConfig, ConfigError};
//!
//! let config = UkfConfig::default().with_forgetting_factors(0.0, 0.99, 0.99);
//! assert!(matches!(
//!     config.validate(),
//!     Err(ConfigError::ForgettingFactorOutOfRange { .. })
//! ));
//! ```

use thiserror_no_std::Error;

/// Result type for filter operations
pub type FilterResult<T> = Result<T, FilterError>;

/// Result type for configuration checks
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Numerical failures inside a tick
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum FilterError {
    /// Cholesky factorisation met a non-positive pivot
    #[error("Matrix not positive definite: pivot {pivot} at row {row}")]
    NotPositiveDefinite {
        /// Row at which factorisation stopped
        row: usize,
        /// Pivot value after subtracting accumulated terms
        pivot: f64,
    },

    /// State or covariance contains NaN or infinity
    #[error("Filter diverged: non-finite state or covariance")]
    FilterDiverged,
}

/// Which noise table a [`ConfigError::NegativeNoise`] refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseKind {
    /// Process noise Q
    Process,
    /// Measurement noise R
    Measurement,
    /// Initial state variance
    InitialVariance,
}

/// Which forgetting factor a [`ConfigError::ForgettingFactorOutOfRange`] refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactorKind {
    /// λ_Q, process-noise memory
    Process,
    /// λ_R,in, inlet measurement-noise memory
    Inlet,
    /// λ_R,out, outlet measurement-noise memory
    Outlet,
}

/// Rejected configuration values
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// Poll interval is zero or longer than one hour
    #[error("Update interval {interval_ms} ms outside (0, {max_ms}] ms")]
    InvalidUpdateInterval {
        /// Configured interval
        interval_ms: u32,
        /// Largest accepted interval
        max_ms: u32,
    },

    /// Forgetting factor outside (0, 1]
    #[error("Forgetting factor {factor:?} = {value} outside (0, 1]")]
    ForgettingFactorOutOfRange {
        /// Offending factor
        factor: FactorKind,
        /// Configured value
        value: f64,
    },

    /// Negative or non-finite noise entry
    #[error("{kind:?} noise entry {index} = {value} must be finite and non-negative")]
    NegativeNoise {
        /// Table containing the entry
        kind: NoiseKind,
        /// Index within the table
        index: usize,
        /// Configured value
        value: f64,
    },

    /// Unscented parameters give a non-positive spread n + λ_ukf
    #[error("Unscented parameters give non-positive spread {spread}")]
    InvalidUnscentedParams {
        /// Resulting n + λ_ukf
        spread: f64,
    },
}

#[cfg(feature = "defmt")]
impl defmt::Format for FilterError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::NotPositiveDefinite { row, pivot } =>
                defmt::write!(fmt, "Not positive definite: pivot {} at row {}", pivot, row),
            Self::FilterDiverged =>
                defmt::write!(fmt, "Filter diverged"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConfigError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::InvalidUpdateInterval { interval_ms, max_ms } =>
                defmt::write!(fmt, "Interval {} ms outside (0, {}]", interval_ms, max_ms),
            Self::ForgettingFactorOutOfRange { value, .. } =>
                defmt::write!(fmt, "Forgetting factor {} outside (0, 1]", value),
            Self::NegativeNoise { index, value, .. } =>
                defmt::write!(fmt, "Noise entry {} = {} invalid", index, value),
            Self::InvalidUnscentedParams { spread } =>
                defmt::write!(fmt, "Non-positive sigma spread {}", spread),
        }
    }
}
