//! Constants for the HP-UKF estimator
//!
//! Every numeric value the filter depends on lives here, grouped by concern,
//! with a note on where it comes from.
//!
//! ## Organization
//!
//! - **Physics**: Physical bounds of the estimated quantities
//! - **Filter**: Numerical tolerances and unscented-transform constants
//! - **Defaults**: Startup configuration values (noise levels, seeds, memory)
//!
//! ## Usage Guidelines
//!
//! 1. Always use these constants instead of magic numbers
//! 2. Include units in the name where a unit applies
//! 3. Record the source of every tuned value

/// Physical limits of relative humidity and neutral seed values.
pub mod physics;

/// Numerical tolerances, floors and unscented-transform parameters.
pub mod filter;

/// Default configuration values used when the host supplies none.
pub mod defaults;

pub use physics::{
    HUMIDITY_MIN_PCT, HUMIDITY_MAX_PCT,
    NEUTRAL_TEMPERATURE_C, NEUTRAL_HUMIDITY_PCT, NEUTRAL_RATE,
};

pub use filter::{
    N_MAX, M_MAX, SIGMA_MAX,
    CHOLESKY_PIVOT_EPSILON, COVARIANCE_INFLATION,
    EIGENVALUE_FLOOR, EIGENVALUE_CEILING,
    PROCESS_NOISE_FLOOR, MEASUREMENT_NOISE_FLOOR,
};

pub use defaults::{
    DEFAULT_UPDATE_INTERVAL_MS, DEFAULT_PROCESS_NOISE, DEFAULT_MEASUREMENT_NOISE,
    DEFAULT_INITIAL_VARIANCE, DEFAULT_LAMBDA_Q, DEFAULT_LAMBDA_R_INLET, DEFAULT_LAMBDA_R_OUTLET,
};
