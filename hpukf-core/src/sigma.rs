//! Sigma-Point Generator
//!
//! ## Unscented Transform
//!
//! A Gaussian (x, P) of dimension n is represented by 2n+1 points:
//!
//! ```text
//! λ_ukf = α²(n + κ) − n          c = n + λ_ukf
//! χ₀     = x
//! χᵢ     = x + √c · colᵢ(L)       i = 1..n
//! χᵢ₊ₙ   = x − √c · colᵢ(L)       L = chol(P)
//! ```
//!
//! with weights
//!
//! ```text
//! W₀ᵐ = λ_ukf / c
//! W₀ᶜ = λ_ukf / c + (1 − α² + β)
//! Wᵢᵐ = Wᵢᶜ = 1 / (2c)
//! ```
//!
//! The mean weights sum to one; the covariance weights sum to one plus the
//! correction term (1 − α² + β). Pushing the points back through
//! [`SigmaPoints::weighted_mean`] and [`SigmaPoints::weighted_covariance`]
//! recovers (x, P) exactly up to rounding.
//!
//! `λ_ukf` is the unscented scaling constant. It is unrelated to the
//! forgetting factors of the noise autotuner.

use crate::{
    constants::filter::{N_MAX, SIGMA_MAX, UKF_ALPHA, UKF_BETA, UKF_KAPPA},
    errors::FilterResult,
    matrix::cholesky,
    state::{StateCovariance, StateVector},
};

/// Spread parameters of the unscented transform
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnscentedParams {
    /// Spread of the sigma points around the mean
    pub alpha: f64,
    /// Prior knowledge of the distribution (2 for Gaussian)
    pub beta: f64,
    /// Secondary scaling
    pub kappa: f64,
}

impl Default for UnscentedParams {
    fn default() -> Self {
        Self {
            alpha: UKF_ALPHA,
            beta: UKF_BETA,
            kappa: UKF_KAPPA,
        }
    }
}

impl UnscentedParams {
    /// Scaling constant λ_ukf = α²(n + κ) − n
    pub fn scaling(&self, dim: usize) -> f64 {
        let n = dim as f64;
        self.alpha * self.alpha * (n + self.kappa) - n
    }

    /// Spread c = n + λ_ukf
    pub fn spread(&self, dim: usize) -> f64 {
        dim as f64 + self.scaling(dim)
    }
}

/// Mean and covariance weights for 2n+1 sigma points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SigmaWeights {
    dim: usize,
    spread: f64,
    correction: f64,
    mean: [f64; SIGMA_MAX],
    covariance: [f64; SIGMA_MAX],
}

impl SigmaWeights {
    /// Compute weights for an n-dimensional state
    pub fn new(dim: usize, params: &UnscentedParams) -> Self {
        debug_assert!(dim <= N_MAX);

        let scaling = params.scaling(dim);
        let spread = dim as f64 + scaling;
        let correction = 1.0 - params.alpha * params.alpha + params.beta;

        let mut mean = [0.0; SIGMA_MAX];
        let mut covariance = [0.0; SIGMA_MAX];
        let outer = 0.5 / spread;
        for i in 1..(2 * dim + 1) {
            mean[i] = outer;
            covariance[i] = outer;
        }
        mean[0] = scaling / spread;
        covariance[0] = mean[0] + correction;

        Self {
            dim,
            spread,
            correction,
            mean,
            covariance,
        }
    }

    /// State dimension the weights were built for
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of sigma points, 2n+1
    pub fn count(&self) -> usize {
        2 * self.dim + 1
    }

    /// Spread c = n + λ_ukf
    pub fn spread(&self) -> f64 {
        self.spread
    }

    /// Extra covariance weight on the centre point, 1 − α² + β
    pub fn correction(&self) -> f64 {
        self.correction
    }

    /// Mean weights Wᵐ
    pub fn mean(&self) -> &[f64] {
        &self.mean[..self.count()]
    }

    /// Covariance weights Wᶜ
    pub fn covariance(&self) -> &[f64] {
        &self.covariance[..self.count()]
    }
}

/// One tick's sigma-point set
///
/// Lives on the stack for the duration of a predict or update step and is
/// never carried across ticks.
#[derive(Debug, Clone)]
pub struct SigmaPoints {
    dim: usize,
    points: [StateVector; SIGMA_MAX],
}

impl SigmaPoints {
    /// Spread sigma points around (mean, covariance)
    ///
    /// Fails with `NotPositiveDefinite` when the covariance cannot be
    /// factorised; the caller decides how to repair it.
    pub fn generate(
        mean: &StateVector,
        covariance: &StateCovariance,
        weights: &SigmaWeights,
    ) -> FilterResult<Self> {
        let dim = weights.dim();
        let mut l = [[0.0; N_MAX]; N_MAX];
        cholesky(covariance, dim, &mut l)?;

        let scale = libm::sqrt(weights.spread());
        let mut points = [*mean; SIGMA_MAX];
        for j in 0..dim {
            for i in 0..dim {
                let offset = scale * l[i][j];
                points[j + 1][i] = mean[i] + offset;
                points[j + 1 + dim][i] = mean[i] - offset;
            }
        }

        Ok(Self { dim, points })
    }

    /// State dimension
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of points, 2n+1
    pub fn count(&self) -> usize {
        2 * self.dim + 1
    }

    /// Active points
    pub fn points(&self) -> &[StateVector] {
        &self.points[..self.count()]
    }

    /// Push every point through `f`
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(&StateVector) -> StateVector,
    {
        let mut points = self.points;
        for point in points[..self.count()].iter_mut() {
            *point = f(&*point);
        }
        Self {
            dim: self.dim,
            points,
        }
    }

    /// Weighted mean Σ Wᵢᵐ χᵢ
    pub fn weighted_mean(&self, weights: &SigmaWeights) -> StateVector {
        let mut mean = [0.0; N_MAX];
        for (point, w) in self.points().iter().zip(weights.mean()) {
            for i in 0..self.dim {
                mean[i] += w * point[i];
            }
        }
        mean
    }

    /// Weighted covariance Σ Wᵢᶜ (χᵢ − x)(χᵢ − x)ᵀ
    pub fn weighted_covariance(&self, weights: &SigmaWeights, mean: &StateVector) -> StateCovariance {
        let mut covariance = [[0.0; N_MAX]; N_MAX];
        for (point, w) in self.points().iter().zip(weights.covariance()) {
            for i in 0..self.dim {
                let di = point[i] - mean[i];
                for j in 0..self.dim {
                    covariance[i][j] += w * di * (point[j] - mean[j]);
                }
            }
        }
        covariance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_covariance() -> StateCovariance {
        let mut p = [[0.0; N_MAX]; N_MAX];
        for i in 0..N_MAX {
            p[i][i] = 0.5 + i as f64 * 0.25;
        }
        p[0][4] = 0.1;
        p[4][0] = 0.1;
        p[2][6] = -0.2;
        p[6][2] = -0.2;
        p
    }

    #[test]
    fn default_params_keep_weights_positive() {
        for dim in [4, 8] {
            let weights = SigmaWeights::new(dim, &UnscentedParams::default());
            assert_eq!(weights.count(), 2 * dim + 1);
            assert!(weights.mean().iter().all(|w| *w >= 0.0));
            assert!((weights.spread() - dim as f64).abs() < 1e-12);
        }
    }

    #[test]
    fn weights_sum_to_one() {
        let params = UnscentedParams { alpha: 0.5, beta: 2.0, kappa: 1.0 };
        let weights = SigmaWeights::new(8, &params);

        let mean_sum: f64 = weights.mean().iter().sum();
        let cov_sum: f64 = weights.covariance().iter().sum();

        assert!((mean_sum - 1.0).abs() < 1e-12);
        assert!((cov_sum - weights.correction() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn round_trip_recovers_moments() {
        let weights = SigmaWeights::new(8, &UnscentedParams::default());
        let x = [21.0, 45.0, 12.0, 80.0, 0.01, -0.02, 0.0, 0.3];
        let p = sample_covariance();

        let sigma = SigmaPoints::generate(&x, &p, &weights).unwrap();
        assert_eq!(sigma.points().len(), 17);
        assert_eq!(sigma.points()[0], x);

        let mean = sigma.weighted_mean(&weights);
        let cov = sigma.weighted_covariance(&weights, &mean);
        for i in 0..8 {
            assert!((mean[i] - x[i]).abs() < 1e-9);
            for j in 0..8 {
                assert!((cov[i][j] - p[i][j]).abs() < 1e-9, "P[{}][{}]", i, j);
            }
        }
    }

    #[test]
    fn points_are_symmetric_about_mean() {
        let weights = SigmaWeights::new(4, &UnscentedParams::default());
        let x = [20.0, 50.0, 20.0, 50.0, 0.0, 0.0, 0.0, 0.0];
        let sigma = SigmaPoints::generate(&x, &sample_covariance(), &weights).unwrap();
        for j in 1..=4 {
            for i in 0..4 {
                let plus = sigma.points()[j][i] - x[i];
                let minus = sigma.points()[j + 4][i] - x[i];
                assert!((plus + minus).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn generation_reports_indefinite_covariance() {
        let weights = SigmaWeights::new(4, &UnscentedParams::default());
        let mut p = sample_covariance();
        p[1][1] = -1.0;
        assert!(SigmaPoints::generate(&[0.0; N_MAX], &p, &weights).is_err());
    }

    #[test]
    fn map_applies_to_every_point() {
        let weights = SigmaWeights::new(4, &UnscentedParams::default());
        let sigma = SigmaPoints::generate(&[1.0; N_MAX], &sample_covariance(), &weights).unwrap();
        let shifted = sigma.map(|p| {
            let mut q = *p;
            q[0] += 10.0;
            q
        });
        for (a, b) in sigma.points().iter().zip(shifted.points()) {
            assert!((b[0] - a[0] - 10.0).abs() < 1e-12);
        }
    }
}
