//! Polling Component
//!
//! Glues the host boundaries to the filter. Each poll interval the host
//! scheduler calls [`HeatPumpEstimator::update`], which:
//!
//! 1. snapshots all four channels once from the [`SensorSource`],
//! 2. runs one filter tick on that snapshot,
//! 3. collects the outputs into a fixed-capacity publication and hands
//!    every finite value to the [`EstimateSink`].
//!
//! Rates are published only when derivatives are tracked. The Q and R
//! diagonals and the three forgetting factors are published only when
//! autotuning is on.
//!
//! A tick that ended in recovery still publishes, so the host sees the
//! seeded values rather than nothing.

use heapless::Vec;

use crate::{
    constants::filter::{M_MAX, N_MAX},
    errors::{ConfigResult, FactorKind},
    measurement::{Channel, Readings},
    traits::{EstimateSink, SensorSource},
    ukf::{HeatPumpUkf, TickStatus},
    UkfConfig,
};

/// Upper bound on values published per tick
pub const MAX_OUTPUTS: usize = M_MAX + M_MAX + N_MAX + M_MAX + 3;

/// One tick's published values
pub type Publication = Vec<(Output, f64), MAX_OUTPUTS>;

/// A published value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Output {
    /// Filtered level of a channel
    Level(Channel),
    /// Filtered rate of a channel
    Rate(Channel),
    /// Q diagonal entry for a state index
    ProcessNoise(usize),
    /// R diagonal entry for a channel
    MeasurementNoise(Channel),
    /// A forgetting factor
    ForgettingFactor(FactorKind),
}

/// Estimator component between a sensor source and a sink
pub struct HeatPumpEstimator<S, K> {
    source: S,
    sink: K,
    filter: HeatPumpUkf,
    last_status: Option<TickStatus>,
}

impl<S, K> HeatPumpEstimator<S, K>
where
    S: SensorSource,
    K: EstimateSink,
{
    /// Build the component; the configuration is validated here
    pub fn new(config: UkfConfig, source: S, sink: K) -> ConfigResult<Self> {
        Ok(Self {
            source,
            sink,
            filter: HeatPumpUkf::new(config)?,
            last_status: None,
        })
    }

    /// Seed the filter from one snapshot and publish the seed
    pub fn setup(&mut self) -> TickStatus {
        let readings = self.snapshot();
        self.filter.initialize(&readings);
        log_info!(
            "heat-pump estimator ready: n = {}, autotune = {}",
            self.filter.layout().dim(),
            self.filter.autotune_enabled()
        );
        self.finish(TickStatus::Seeded)
    }

    /// One poll tick
    pub fn update(&mut self) -> TickStatus {
        let readings = self.snapshot();
        let status = self.filter.tick(&readings);
        self.finish(status)
    }

    /// Log the active configuration
    pub fn dump_config(&self) {
        log_info!("Heat-pump UKF:");
        log_info!("  update interval: {} ms", self.filter.config().update_interval_ms);
        log_info!("  track derivatives: {}", self.filter.config().track_derivatives);
        log_info!("  autotune: {}", self.filter.autotune_enabled());
        log_info!("  forgetting factors: {:?}", self.filter.forgetting_factors());
        log_info!("  Q: {:?}", self.filter.process_noise());
        log_info!("  R: {:?}", self.filter.measurement_noise());
    }

    /// Read every channel exactly once
    pub fn snapshot(&mut self) -> Readings {
        let mut readings = Readings::new();
        for channel in Channel::ALL {
            readings.set(channel, self.source.read(channel));
        }
        readings
    }

    /// Values the current state would publish (finite only)
    pub fn publication(&self) -> Publication {
        let mut out = Publication::new();
        let estimate = self.filter.estimate();

        for channel in Channel::ALL {
            push_finite(&mut out, Output::Level(channel), estimate.level(channel));
        }
        for channel in Channel::ALL {
            if let Some(rate) = estimate.rate(channel) {
                push_finite(&mut out, Output::Rate(channel), rate);
            }
        }

        if self.filter.autotune_enabled() {
            for (i, q) in self.filter.process_noise().iter().enumerate() {
                push_finite(&mut out, Output::ProcessNoise(i), *q);
            }
            for channel in Channel::ALL {
                push_finite(
                    &mut out,
                    Output::MeasurementNoise(channel),
                    self.filter.measurement_noise()[channel.index()],
                );
            }
            let factors = self.filter.forgetting_factors();
            for kind in [FactorKind::Process, FactorKind::Inlet, FactorKind::Outlet] {
                push_finite(&mut out, Output::ForgettingFactor(kind), factors.get(kind));
            }
        }

        out
    }

    /// Filter state
    pub fn filter(&self) -> &HeatPumpUkf {
        &self.filter
    }

    /// Status of the most recent tick
    pub fn last_status(&self) -> Option<TickStatus> {
        self.last_status
    }

    /// The sink
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Take the boundaries back
    pub fn into_parts(self) -> (S, K) {
        (self.source, self.sink)
    }

    fn finish(&mut self, status: TickStatus) -> TickStatus {
        for (output, value) in self.publication() {
            self.sink.publish(output, value);
        }
        self.last_status = Some(status);
        status
    }
}

fn push_finite(out: &mut Publication, output: Output, value: f64) {
    if value.is_finite() {
        // Capacity covers every output
        let _ = out.push((output, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::Reading;

    struct FixedSource {
        readings: [Reading; M_MAX],
        reads: usize,
    }

    impl SensorSource for FixedSource {
        fn read(&mut self, channel: Channel) -> Reading {
            self.reads += 1;
            self.readings[channel.index()]
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        published: Vec<(Output, f64), 64>,
    }

    impl EstimateSink for RecordingSink {
        fn publish(&mut self, output: Output, value: f64) {
            let _ = self.published.push((output, value));
        }
    }

    impl RecordingSink {
        fn value(&self, output: Output) -> Option<f64> {
            self.published.iter().rev().find(|(o, _)| *o == output).map(|(_, v)| *v)
        }
    }

    fn source(readings: [Reading; M_MAX]) -> FixedSource {
        FixedSource { readings, reads: 0 }
    }

    #[test]
    fn setup_publishes_seed() {
        let readings = [
            Reading::Available(22.0),
            Reading::Absent,
            Reading::Available(9.0),
            Reading::Absent,
        ];
        let mut estimator =
            HeatPumpEstimator::new(UkfConfig::default(), source(readings), RecordingSink::default()).unwrap();

        assert_eq!(estimator.setup(), TickStatus::Seeded);
        let sink = estimator.sink();
        assert_eq!(sink.value(Output::Level(Channel::InletTemperature)), Some(22.0));
        assert_eq!(sink.value(Output::Level(Channel::InletHumidity)), Some(50.0));
        assert_eq!(sink.value(Output::Rate(Channel::OutletTemperature)), Some(0.0));
        assert_eq!(sink.value(Output::ProcessNoise(0)), None);
        assert_eq!(sink.published.len(), 8);
    }

    #[test]
    fn update_reads_each_channel_once() {
        let mut estimator = HeatPumpEstimator::new(
            UkfConfig::default(),
            source([Reading::Available(21.0); M_MAX]),
            RecordingSink::default(),
        )
        .unwrap();

        estimator.setup();
        assert_eq!(estimator.update(), TickStatus::Updated { observed: 4 });
        assert_eq!(estimator.last_status(), Some(TickStatus::Updated { observed: 4 }));

        let (source, _) = estimator.into_parts();
        assert_eq!(source.reads, 8);
    }

    #[test]
    fn autotune_publishes_diagnostics() {
        let config = UkfConfig::default().with_track_derivatives(false).with_autotune(true);
        let mut estimator =
            HeatPumpEstimator::new(config, source([Reading::Absent; M_MAX]), RecordingSink::default()).unwrap();

        let publication = estimator.publication();
        assert_eq!(publication.len(), 4 + 4 + 4 + 3);
        assert!(publication.iter().all(|(o, _)| !matches!(o, Output::Rate(_))));

        estimator.update();
        assert_eq!(
            estimator.sink().value(Output::ForgettingFactor(FactorKind::Outlet)),
            Some(0.98)
        );
    }

    #[test]
    fn recovery_publishes_seed_values() {
        let mut estimator = HeatPumpEstimator::new(
            UkfConfig::default(),
            |channel: Channel| match channel {
                Channel::OutletHumidity => Reading::Available(f64::NAN),
                Channel::InletTemperature => Reading::Available(19.0),
                _ => Reading::Absent,
            },
            RecordingSink::default(),
        )
        .unwrap();

        estimator.setup();
        assert_eq!(estimator.update(), TickStatus::Recovered(crate::FilterError::FilterDiverged));
        let sink = estimator.sink();
        assert_eq!(sink.value(Output::Level(Channel::InletTemperature)), Some(19.0));
        assert_eq!(sink.value(Output::Level(Channel::OutletHumidity)), Some(50.0));
        assert!(sink.published.iter().all(|(_, v)| v.is_finite()));
    }
}
