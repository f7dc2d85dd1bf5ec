//! Heat-pump air-state estimator
//!
//! Estimates the true temperature and relative humidity at the inlet and
//! outlet of a heat-pump air stream from noisy, possibly missing sensor
//! readings. An unscented Kalman filter over a 4- or 8-dimensional state
//! (levels, optionally their rates) runs once per poll tick, and an
//! EM-style autotuner can adapt the process and measurement noise online.
//!
//! Key constraints:
//! - `no_std`, no heap allocation anywhere in a tick
//! - Fixed-capacity linear algebra (n ≤ 8, m ≤ 4)
//! - Numerical failures self-heal; a tick always completes and publishes
//!
//! ```rust
//! use hpukf_core::{HeatPumpUkf, UkfConfig};
//! use hpukf_core::measurement::{Channel, Readings};
//!
//! let mut ukf = HeatPumpUkf::new(UkfConfig::default().with_autotune(true)).unwrap();
//!
//! for _ in 0..50 {
//!     let readings = Readings::new()
//!         .with(Channel::InletTemperature, 21.0)
//!         .with(Channel::OutletTemperature, 8.5);
//!     ukf.tick(&readings);
//! }
//!
//! let estimate = ukf.estimate();
//! assert!((estimate.level(Channel::OutletTemperature) - 8.5).abs() < 0.05);
//! assert!((estimate.level(Channel::InletHumidity) - 50.0).abs() < 1e-9);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
mod macros;

pub mod autotune;
pub mod component;
pub mod config;
pub mod constants;
pub mod errors;
pub mod matrix;
pub mod measurement;
pub mod process;
pub mod sigma;
pub mod state;
pub mod traits;
pub mod ukf;

// Public API
pub use autotune::{EmAutotuner, ForgettingFactors};
pub use component::{HeatPumpEstimator, Output};
pub use config::UkfConfig;
pub use errors::{ConfigError, ConfigResult, FilterError, FilterResult};
pub use measurement::{Channel, Reading, Readings};
pub use traits::{EstimateSink, SensorSource};
pub use ukf::{Estimate, FilterPhase, HeatPumpUkf, TickStatus};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
