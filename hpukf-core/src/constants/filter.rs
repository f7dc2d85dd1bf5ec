//! Filter Numerics
//!
//! Dimensions, tolerances and unscented-transform constants for the UKF.
//! All arithmetic is `f64`; tolerances below are sized for double precision.

// ===== DIMENSIONS =====

/// Maximum state dimension (four observables plus four derivatives).
pub const N_MAX: usize = 8;

/// Number of physically observable channels.
pub const M_MAX: usize = 4;

/// Maximum number of sigma points, 2·N_MAX + 1.
pub const SIGMA_MAX: usize = 2 * N_MAX + 1;

// ===== UNSCENTED TRANSFORM =====

/// Default sigma-point spread α.
///
/// With κ = 0 this gives λ_ukf = 0 and c = n, so every sigma weight is
/// non-negative and the transformed covariance stays positive semidefinite.
/// Smaller α such as 1e-3 gives a large negative centre weight and can
/// leave the transformed covariance indefinite.
///
/// Source: Julier & Uhlmann, "Unscented Filtering and Nonlinear Estimation" (2004)
pub const UKF_ALPHA: f64 = 1.0;

/// Prior-distribution parameter β; 2 is optimal for Gaussian priors.
///
/// Source: Van der Merwe, "Sigma-Point Kalman Filters" (2004)
pub const UKF_BETA: f64 = 2.0;

/// Secondary scaling parameter κ.
pub const UKF_KAPPA: f64 = 0.0;

// ===== FACTORISATION AND REPAIR =====

/// Smallest accepted Cholesky pivot.
///
/// A pivot at or below this value (after subtracting the accumulated terms)
/// marks the matrix as not positive definite.
pub const CHOLESKY_PIVOT_EPSILON: f64 = 1e-12;

/// Diagonal inflation applied before the single factorisation retry.
///
/// Source: Tikhonov regularisation, sized a few orders above the pivot epsilon
pub const COVARIANCE_INFLATION: f64 = 1e-9;

/// Lower clamp for covariance eigenvalues after the posterior update.
///
/// Sits above the pivot epsilon so a repaired covariance always factorises.
pub const EIGENVALUE_FLOOR: f64 = 1e-9;

/// Upper clamp for covariance eigenvalues after the posterior update.
///
/// Caps the uncertainty of channels that go unobserved for days so the
/// covariance stays well conditioned for factorisation. 1e6 corresponds to a
/// standard deviation of 1000 units, far beyond any physical range.
pub const EIGENVALUE_CEILING: f64 = 1e6;

/// Maximum Jacobi sweeps during covariance repair.
///
/// Cyclic Jacobi converges quadratically; 8×8 symmetric matrices settle in
/// well under ten sweeps.
pub const JACOBI_MAX_SWEEPS: usize = 32;

/// Off-diagonal energy below which a Jacobi sweep is considered converged.
pub const JACOBI_TOLERANCE: f64 = 1e-24;

// ===== NOISE ADAPTATION =====

/// Floor for every adapted measurement-noise variance.
///
/// Keeps R positive definite even when innovations are tiny.
///
/// Source: Field data from the reference heat-pump installation
pub const MEASUREMENT_NOISE_FLOOR: f64 = 1e-6;

/// Floor for every adapted process-noise variance.
pub const PROCESS_NOISE_FLOOR: f64 = 1e-10;
