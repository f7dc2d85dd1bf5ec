//! UKF Core
//!
//! ## State Machine
//!
//! ```text
//!   Uninitialized ──first tick / initialize()──▶ Tracking ◀─┐
//!                                                  │        │
//!                                                  └─tick───┘
//! ```
//!
//! The first tick seeds the state from whatever readings are available and
//! publishes the seed without predicting or updating. Every later tick runs:
//!
//! 1. **Predict**: sigma points from (x, P) through the process model,
//!    recombined into (x⁻, P⁻), plus Q.
//! 2. **Update** (only if a channel is available): sigma points regenerated
//!    from (x⁻, P⁻) and projected through this tick's measurement model,
//!    giving ẑ, Pzz + R and Pxz. K = Pxz · Pzz⁻¹ is solved through the
//!    Cholesky factor of Pzz. Then x = x⁻ + Kν and P = P⁻ − K·Pzz·Kᵀ,
//!    symmetrised with its spectrum clamped.
//! 3. **Guard**: any non-finite entry in x or P is `FilterDiverged`.
//!    Humidity levels are clamped into [0, 100] afterwards.
//! 4. **Autotune** (if enabled): the update's residuals adapt Q and R.
//!
//! ## Recovery
//!
//! A failed tick never stops the filter. A covariance that cannot be
//! factorised gets its diagonal inflated once; if that is not enough, or
//! the filter diverged, (x, P) return to the seed while Q and R keep their
//! current values. The tick still completes and reports
//! [`TickStatus::Recovered`]. The autotuner never sees a failed tick.
//!
//! ```rust
//! use hpukf_core::{HeatPumpUkf, UkfConfig, TickStatus};
//! use hpukf_core::measurement::{Channel, Readings};
//!
//! let mut ukf = HeatPumpUkf::new(UkfConfig::default()).unwrap();
//! let readings = Readings::new().with(Channel::InletTemperature, 21.0);
//!
//! assert_eq!(ukf.tick(&readings), TickStatus::Seeded);
//! assert_eq!(ukf.tick(&readings), TickStatus::Updated { observed: 1 });
//! assert!((ukf.estimate().level(Channel::InletTemperature) - 21.0).abs() < 0.1);
//! ```

use crate::{
    autotune::{EmAutotuner, ForgettingFactors, UpdateResiduals},
    config::UkfConfig,
    constants::{
        filter::{
            COVARIANCE_INFLATION, EIGENVALUE_CEILING, EIGENVALUE_FLOOR,
            M_MAX, N_MAX, SIGMA_MAX,
        },
        physics::{NEUTRAL_HUMIDITY_PCT, NEUTRAL_RATE, NEUTRAL_TEMPERATURE_C},
    },
    errors::{ConfigResult, FilterError, FilterResult},
    matrix::{
        add_diagonal, all_finite, cholesky_inflated, make_symmetric, matvec, multiply,
        repair_covariance, solve_cholesky, transpose, Matrix, SquareMatrix,
    },
    measurement::{Channel, MeasurementModel, Readings},
    process::ProcessModel,
    sigma::{SigmaPoints, SigmaWeights},
    state::{clamp_humidity, StateCovariance, StateLayout, StateVector},
};

/// Lifecycle of the filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPhase {
    /// No seed yet
    Uninitialized,
    /// Seeded and running
    Tracking,
}

/// Outcome of one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickStatus {
    /// First tick: state seeded from the readings, no predict or update
    Seeded,
    /// No channel available: predict only
    PredictOnly,
    /// Predict plus a correction from `observed` channels
    Updated {
        /// Number of channels fused
        observed: usize,
    },
    /// The tick failed and the filter was reset to its seed
    Recovered(FilterError),
}

/// Filtered levels and, when tracked, their rates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    levels: [f64; M_MAX],
    rates: Option<[f64; M_MAX]>,
}

impl Estimate {
    fn from_state(state: &StateVector, layout: StateLayout) -> Self {
        let mut levels = [0.0; M_MAX];
        let mut rates = [0.0; M_MAX];
        for channel in Channel::ALL {
            levels[channel.index()] = state[layout.level_index(channel)];
            if let Some(i) = layout.rate_index(channel) {
                rates[channel.index()] = state[i];
            }
        }
        Self {
            levels,
            rates: layout.tracks_rates().then_some(rates),
        }
    }

    /// Filtered value of a channel (°C or %RH)
    pub fn level(&self, channel: Channel) -> f64 {
        self.levels[channel.index()]
    }

    /// Filtered rate of a channel (per second), if tracked
    pub fn rate(&self, channel: Channel) -> Option<f64> {
        self.rates.map(|rates| rates[channel.index()])
    }
}

/// Unscented Kalman filter over the heat-pump air state
///
/// All storage is fixed-capacity; a tick performs no allocation.
#[derive(Debug, Clone)]
pub struct HeatPumpUkf {
    config: UkfConfig,
    layout: StateLayout,
    process: ProcessModel,
    weights: SigmaWeights,
    phase: FilterPhase,

    x: StateVector,
    p: StateCovariance,
    seed_x: StateVector,
    seed_p: StateCovariance,

    q: [f64; N_MAX],
    r: [f64; M_MAX],
    autotuner: Option<EmAutotuner>,

    ticks: u64,
    recoveries: u32,
}

impl HeatPumpUkf {
    /// Build a filter from a validated configuration
    pub fn new(config: UkfConfig) -> ConfigResult<Self> {
        config.validate()?;

        let layout = config.layout();
        let n = layout.dim();
        let (seed_x, seed_p) = seed(&Readings::new(), layout, &config.initial_variance);

        let mut q = [0.0; N_MAX];
        q[..n].copy_from_slice(&config.process_noise[..n]);

        Ok(Self {
            layout,
            process: ProcessModel::new(layout, config.dt_s()),
            weights: SigmaWeights::new(n, &config.unscented),
            phase: FilterPhase::Uninitialized,
            x: seed_x,
            p: seed_p,
            seed_x,
            seed_p,
            q,
            r: config.measurement_noise,
            autotuner: config.autotune.then(|| EmAutotuner::new(config.forgetting)),
            ticks: 0,
            recoveries: 0,
            config,
        })
    }

    /// Seed (x, P) from one snapshot and start tracking
    ///
    /// Absent or non-finite channels fall back to 20 °C / 50 %RH; rates
    /// start at zero. The seed is kept for later resets.
    pub fn initialize(&mut self, readings: &Readings) {
        let (x, p) = seed(readings, self.layout, &self.config.initial_variance);
        self.seed_x = x;
        self.seed_p = p;
        self.x = x;
        self.p = p;
        self.phase = FilterPhase::Tracking;
        log_debug!("filter seeded: {:?}", &x[..self.layout.dim()]);
    }

    /// Restore (x, P) to the seed; Q and R are kept
    pub fn reset(&mut self) {
        self.x = self.seed_x;
        self.p = self.seed_p;
    }

    /// Run one poll tick on a snapshot of the sensors
    pub fn tick(&mut self, readings: &Readings) -> TickStatus {
        self.ticks = self.ticks.saturating_add(1);

        if self.phase == FilterPhase::Uninitialized {
            self.initialize(readings);
            return TickStatus::Seeded;
        }

        match self.predict().and_then(|()| self.update(readings)) {
            Ok(Some(residuals)) => {
                if let Some(tuner) = self.autotuner.as_mut() {
                    tuner.adapt(&residuals, &mut self.q, &mut self.r);
                }
                TickStatus::Updated { observed: residuals.channels().len() }
            }
            Ok(None) => TickStatus::PredictOnly,
            Err(err) => {
                self.recoveries = self.recoveries.saturating_add(1);
                log_warn!("tick {} failed ({}), resetting filter to seed", self.ticks, err);
                self.reset();
                TickStatus::Recovered(err)
            }
        }
    }

    /// Predict step: (x, P) → (x⁻, P⁻ + Q)
    ///
    /// On error (x, P) may be partially modified; callers reset.
    pub fn predict(&mut self) -> FilterResult<()> {
        let n = self.layout.dim();
        let sigma = spread(&self.x, &mut self.p, &self.weights)?;

        let process = self.process;
        let propagated = sigma.map(|point| process.propagate(point));
        let x = propagated.weighted_mean(&self.weights);
        let mut p = propagated.weighted_covariance(&self.weights, &x);
        for i in 0..n {
            p[i][i] += self.q[i];
        }
        make_symmetric(&mut p, n);

        self.commit(x, p)
    }

    /// Update step against this tick's available readings
    ///
    /// Returns `Ok(None)` when no channel is available.
    pub fn update(&mut self, readings: &Readings) -> FilterResult<Option<UpdateResiduals>> {
        let model = MeasurementModel::for_mask(readings.mask());
        if model.is_empty() {
            return Ok(None);
        }
        let n = self.layout.dim();
        let m = model.dim();

        let sigma = spread(&self.x, &mut self.p, &self.weights)?;

        let mut projected = [[0.0; M_MAX]; SIGMA_MAX];
        for (z, point) in projected.iter_mut().zip(sigma.points()) {
            *z = model.project(point);
        }

        let mut z_hat = [0.0; M_MAX];
        for (z, w) in projected.iter().zip(self.weights.mean()) {
            for j in 0..m {
                z_hat[j] += w * z[j];
            }
        }

        let mut pzz: SquareMatrix<M_MAX> = [[0.0; M_MAX]; M_MAX];
        let mut pxz: Matrix<N_MAX, M_MAX> = [[0.0; M_MAX]; N_MAX];
        for ((z, point), w) in projected.iter().zip(sigma.points()).zip(self.weights.covariance()) {
            for j in 0..m {
                let dz = z[j] - z_hat[j];
                for k in 0..m {
                    pzz[j][k] += w * dz * (z[k] - z_hat[k]);
                }
                for i in 0..n {
                    pxz[i][j] += w * (point[i] - self.x[i]) * dz;
                }
            }
        }

        let mut predicted_variance = [0.0; M_MAX];
        let noise = model.noise(&self.r);
        for j in 0..m {
            predicted_variance[j] = pzz[j][j];
            pzz[j][j] += noise[j];
        }
        make_symmetric(&mut pzz, m);

        let mut l = [[0.0; M_MAX]; M_MAX];
        cholesky_inflated(&mut pzz, m, &mut l)?;

        // Pzz is symmetric, so each row of K solves Pzz · kᵢ = pxzᵢ
        let mut gain: Matrix<N_MAX, M_MAX> = [[0.0; M_MAX]; N_MAX];
        for i in 0..n {
            solve_cholesky(&l, m, &pxz[i], &mut gain[i]);
        }

        let z = model.gather(readings);
        let mut innovation = [0.0; M_MAX];
        for j in 0..m {
            innovation[j] = z[j] - z_hat[j];
        }

        let mut correction = [0.0; N_MAX];
        matvec(&gain, &innovation, n, m, &mut correction);

        let mut x = self.x;
        for i in 0..n {
            x[i] += correction[i];
        }

        let mut k_pzz: Matrix<N_MAX, M_MAX> = [[0.0; M_MAX]; N_MAX];
        multiply(&gain, &pzz, n, m, m, &mut k_pzz);
        let mut gain_t: Matrix<M_MAX, N_MAX> = [[0.0; N_MAX]; M_MAX];
        transpose(&gain, n, m, &mut gain_t);
        let mut shrink: StateCovariance = [[0.0; N_MAX]; N_MAX];
        multiply(&k_pzz, &gain_t, n, m, n, &mut shrink);

        let mut p = self.p;
        for i in 0..n {
            for j in 0..n {
                p[i][j] -= shrink[i][j];
            }
        }
        if !all_finite(&p, n) {
            return Err(FilterError::FilterDiverged);
        }
        repair_covariance(&mut p, n, EIGENVALUE_FLOOR, EIGENVALUE_CEILING);

        self.commit(x, p)?;
        Ok(Some(UpdateResiduals::new(
            model.channels(),
            innovation,
            predicted_variance,
            correction,
            n,
        )))
    }

    /// Accept a new (x, P) after the divergence guard and humidity clamp
    fn commit(&mut self, mut x: StateVector, p: StateCovariance) -> FilterResult<()> {
        let n = self.layout.dim();
        if !x[..n].iter().all(|v| v.is_finite()) || !all_finite(&p, n) {
            return Err(FilterError::FilterDiverged);
        }
        clamp_humidity(&mut x);
        self.x = x;
        self.p = p;
        Ok(())
    }

    /// Active state vector
    pub fn state(&self) -> &[f64] {
        &self.x[..self.layout.dim()]
    }

    /// Full covariance storage; the active block is `dim × dim`
    pub fn covariance(&self) -> &StateCovariance {
        &self.p
    }

    /// Filtered levels and rates
    pub fn estimate(&self) -> Estimate {
        Estimate::from_state(&self.x, self.layout)
    }

    /// Seeded state the filter resets to
    pub fn seed_state(&self) -> &[f64] {
        &self.seed_x[..self.layout.dim()]
    }

    /// Current Q diagonal (active states)
    pub fn process_noise(&self) -> &[f64] {
        &self.q[..self.layout.dim()]
    }

    /// Current R diagonal
    pub fn measurement_noise(&self) -> &[f64; M_MAX] {
        &self.r
    }

    /// Forgetting factors of the autotuner
    pub fn forgetting_factors(&self) -> &ForgettingFactors {
        &self.config.forgetting
    }

    /// True when Q and R adapt online
    pub fn autotune_enabled(&self) -> bool {
        self.autotuner.is_some()
    }

    /// Lifecycle phase
    pub fn phase(&self) -> FilterPhase {
        self.phase
    }

    /// State layout
    pub fn layout(&self) -> StateLayout {
        self.layout
    }

    /// Configuration the filter was built from
    pub fn config(&self) -> &UkfConfig {
        &self.config
    }

    /// Ticks run so far, including the seeding tick
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Ticks that ended in a reset
    pub fn recoveries(&self) -> u32 {
        self.recoveries
    }
}

/// Sigma points with a single diagonal inflation on factorisation failure
fn spread(
    x: &StateVector,
    p: &mut StateCovariance,
    weights: &SigmaWeights,
) -> FilterResult<SigmaPoints> {
    match SigmaPoints::generate(x, p, weights) {
        Ok(points) => Ok(points),
        Err(_err) => {
            log_debug!("sigma spread failed ({}), inflating covariance", _err);
            add_diagonal(p, weights.dim(), COVARIANCE_INFLATION);
            SigmaPoints::generate(x, p, weights)
        }
    }
}

fn seed(
    readings: &Readings,
    layout: StateLayout,
    initial_variance: &[f64; N_MAX],
) -> (StateVector, StateCovariance) {
    let mut x = [0.0; N_MAX];
    for channel in Channel::ALL {
        let neutral = if channel.is_humidity() {
            NEUTRAL_HUMIDITY_PCT
        } else {
            NEUTRAL_TEMPERATURE_C
        };
        x[layout.level_index(channel)] = readings
            .get(channel)
            .value()
            .filter(|v| v.is_finite())
            .unwrap_or(neutral);
        if let Some(i) = layout.rate_index(channel) {
            x[i] = NEUTRAL_RATE;
        }
    }
    clamp_humidity(&mut x);

    let mut p = [[0.0; N_MAX]; N_MAX];
    for i in 0..layout.dim() {
        p[i][i] = initial_variance[i];
    }
    (x, p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::trace;

    fn tracking(config: UkfConfig) -> HeatPumpUkf {
        let mut ukf = HeatPumpUkf::new(config).unwrap();
        ukf.initialize(&Readings::new());
        ukf
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = UkfConfig::default().with_update_interval_ms(0);
        assert!(HeatPumpUkf::new(config).is_err());
    }

    #[test]
    fn first_tick_seeds_without_filtering() {
        let mut ukf = HeatPumpUkf::new(UkfConfig::default()).unwrap();
        assert_eq!(ukf.phase(), FilterPhase::Uninitialized);

        let readings = Readings::new()
            .with(Channel::InletTemperature, 23.5)
            .with(Channel::InletHumidity, 130.0)
            .with(Channel::OutletTemperature, f64::NAN);

        assert_eq!(ukf.tick(&readings), TickStatus::Seeded);
        assert_eq!(ukf.phase(), FilterPhase::Tracking);
        assert_eq!(ukf.state(), &[23.5, 100.0, 20.0, 50.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(ukf.covariance()[3][3], 1.0);
        assert_eq!(ukf.ticks(), 1);
    }

    #[test]
    fn predict_only_moves_levels_by_rate() {
        let mut ukf = tracking(UkfConfig::default().with_update_interval_ms(2000));
        ukf.x[4] = 0.5;
        ukf.x[7] = -1.0;
        let before = trace(&ukf.p, 8);

        assert_eq!(ukf.tick(&Readings::new()), TickStatus::PredictOnly);
        assert!((ukf.state()[0] - 21.0).abs() < 1e-9);
        assert!((ukf.state()[3] - 48.0).abs() < 1e-9);
        assert!(trace(&ukf.p, 8) > before);
    }

    #[test]
    fn update_moves_toward_measurement() {
        let mut ukf = tracking(UkfConfig::default());
        let readings = Readings::new().with(Channel::OutletTemperature, 12.0);

        assert_eq!(ukf.tick(&readings), TickStatus::Updated { observed: 1 });
        let estimate = ukf.estimate();
        assert!(estimate.level(Channel::OutletTemperature) < 12.1);
        assert!(estimate.level(Channel::OutletTemperature) > 11.9);
        assert!((estimate.level(Channel::InletTemperature) - 20.0).abs() < 1e-9);
        assert!(ukf.p[2][2] < 0.01);
        assert!(ukf.p[0][0] > 1.0);
    }

    #[test]
    fn non_finite_reading_resets_to_seed() {
        let mut ukf = HeatPumpUkf::new(UkfConfig::default().with_autotune(true)).unwrap();
        let seed = Readings::new()
            .with(Channel::InletTemperature, 24.0)
            .with(Channel::OutletHumidity, 80.0);
        ukf.tick(&seed);
        ukf.tick(&seed.with(Channel::InletTemperature, 25.0));
        let r_before = *ukf.measurement_noise();

        let bad = seed.with(Channel::OutletHumidity, f64::NAN);
        assert_eq!(ukf.tick(&bad), TickStatus::Recovered(FilterError::FilterDiverged));
        assert_eq!(ukf.state(), ukf.seed_state());
        assert_eq!(ukf.covariance()[0][0], 1.0);
        assert_eq!(*ukf.measurement_noise(), r_before);
        assert_eq!(ukf.recoveries(), 1);
    }

    #[test]
    fn humidity_stays_in_range() {
        let mut ukf = tracking(UkfConfig::default());
        let wet = Readings::new().with(Channel::InletHumidity, 180.0);
        for _ in 0..20 {
            ukf.tick(&wet);
            let rh = ukf.estimate().level(Channel::InletHumidity);
            assert!((0.0..=100.0).contains(&rh));
        }
        assert_eq!(ukf.estimate().level(Channel::InletHumidity), 100.0);
    }

    #[test]
    fn collapsed_covariance_is_inflated() {
        let mut ukf = tracking(UkfConfig::default());
        ukf.p = [[0.0; N_MAX]; N_MAX];
        assert_eq!(ukf.tick(&Readings::new()), TickStatus::PredictOnly);
        assert!(ukf.p[0][0] > 0.0);
    }

    #[test]
    fn indefinite_covariance_resets() {
        let mut ukf = tracking(UkfConfig::default());
        for i in 0..N_MAX {
            ukf.p[i][i] = -1.0;
        }
        assert!(matches!(
            ukf.tick(&Readings::new()),
            TickStatus::Recovered(FilterError::NotPositiveDefinite { row: 0, .. })
        ));
        assert_eq!(ukf.covariance()[5][5], 1.0);
    }

    #[test]
    fn noise_is_fixed_without_autotune() {
        let mut ukf = tracking(UkfConfig::default());
        let readings = Readings::new().with(Channel::InletTemperature, 30.0);
        for _ in 0..10 {
            ukf.tick(&readings);
        }
        assert!(!ukf.autotune_enabled());
        assert_eq!(ukf.process_noise(), &UkfConfig::default().process_noise[..]);
        assert_eq!(*ukf.measurement_noise(), UkfConfig::default().measurement_noise);
    }

    #[test]
    fn autotune_adapts_observed_channels_only() {
        let mut ukf = tracking(UkfConfig::default().with_autotune(true));
        let readings = Readings::new().with(Channel::InletTemperature, 30.0);
        ukf.tick(&readings);

        let defaults = UkfConfig::default().measurement_noise;
        assert_ne!(ukf.measurement_noise()[0], defaults[0]);
        assert_eq!(&ukf.measurement_noise()[1..], &defaults[1..]);
    }

    #[test]
    fn levels_only_layout() {
        let mut ukf = tracking(UkfConfig::default().with_track_derivatives(false));
        let readings = Readings::new().with(Channel::OutletHumidity, 70.0);
        ukf.tick(&readings);

        assert_eq!(ukf.state().len(), 4);
        assert_eq!(ukf.estimate().rate(Channel::OutletHumidity), None);
        assert!(ukf.estimate().level(Channel::OutletHumidity) > 69.0);
    }
}
