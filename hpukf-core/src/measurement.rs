//! Measurement Model
//!
//! ## Channels
//!
//! Four physical quantities can be observed, always handled in this
//! canonical order:
//!
//! | Channel            | Unit | Group  |
//! |--------------------|------|--------|
//! | Inlet temperature  | °C   | Inlet  |
//! | Inlet humidity     | %RH  | Inlet  |
//! | Outlet temperature | °C   | Outlet |
//! | Outlet humidity    | %RH  | Outlet |
//!
//! ## Availability
//!
//! Each tick the host snapshots all four channels once into [`Readings`].
//! A channel is either `Available(value)` or `Absent` (unbound, never
//! reported, or stale). The [`AvailabilityMask`] of that snapshot decides
//! the dimension of the update step: the [`MeasurementModel`] is rebuilt
//! for every tick and projects a state onto exactly the available
//! channels. There is no sentinel value for a missing channel.
//!
//! An available reading is taken at face value even when it is not finite;
//! the UKF core detects the resulting divergence and recovers.
//!
//! ```rust
//! use hpukf_core::measurement::{Channel, Readings, MeasurementModel};
//!
//! let readings = Readings::new()
//!     .with(Channel::InletTemperature, 21.5)
//!     .with(Channel::OutletHumidity, 88.0);
//!
//! let model = MeasurementModel::for_mask(readings.mask());
//! assert_eq!(model.dim(), 2);
//! assert_eq!(model.channels(), &[Channel::InletTemperature, Channel::OutletHumidity]);
//! ```

use heapless::Vec;

use crate::{
    constants::filter::M_MAX,
    matrix::Vector,
    state::StateVector,
};

/// Fixed-capacity measurement vector (active length = model dimension)
pub type MeasurementVector = Vector<M_MAX>;

/// An observable quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Channel {
    /// Inlet air temperature (°C)
    InletTemperature,
    /// Inlet relative humidity (%RH)
    InletHumidity,
    /// Outlet air temperature (°C)
    OutletTemperature,
    /// Outlet relative humidity (%RH)
    OutletHumidity,
}

/// Sensor location, used to pick the measurement-noise forgetting factor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorGroup {
    /// Return-air side of the heat exchanger
    Inlet,
    /// Supply-air side of the heat exchanger
    Outlet,
}

impl Channel {
    /// All channels in canonical order
    pub const ALL: [Channel; M_MAX] = [
        Channel::InletTemperature,
        Channel::InletHumidity,
        Channel::OutletTemperature,
        Channel::OutletHumidity,
    ];

    /// Position in canonical order (also the state index of the level)
    pub const fn index(self) -> usize {
        match self {
            Channel::InletTemperature => 0,
            Channel::InletHumidity => 1,
            Channel::OutletTemperature => 2,
            Channel::OutletHumidity => 3,
        }
    }

    /// Sensor location
    pub const fn group(self) -> SensorGroup {
        match self {
            Channel::InletTemperature | Channel::InletHumidity => SensorGroup::Inlet,
            Channel::OutletTemperature | Channel::OutletHumidity => SensorGroup::Outlet,
        }
    }

    /// True for relative-humidity channels
    pub const fn is_humidity(self) -> bool {
        matches!(self, Channel::InletHumidity | Channel::OutletHumidity)
    }

    /// Short name for logs
    pub const fn label(self) -> &'static str {
        match self {
            Channel::InletTemperature => "T_in",
            Channel::InletHumidity => "RH_in",
            Channel::OutletTemperature => "T_out",
            Channel::OutletHumidity => "RH_out",
        }
    }
}

/// One channel's value for the current tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Reading {
    /// Live value
    Available(f64),
    /// No live value this tick
    #[default]
    Absent,
}

impl Reading {
    /// Value if available
    pub fn value(self) -> Option<f64> {
        match self {
            Reading::Available(v) => Some(v),
            Reading::Absent => None,
        }
    }

    /// True if available
    pub fn is_available(self) -> bool {
        matches!(self, Reading::Available(_))
    }
}

impl From<Option<f64>> for Reading {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Reading::Absent, Reading::Available)
    }
}

/// Snapshot of all four channels, taken once at the start of a tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Readings {
    values: [Reading; M_MAX],
}

impl Readings {
    /// Snapshot with every channel absent
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a channel to an available value
    pub fn with(mut self, channel: Channel, value: f64) -> Self {
        self.values[channel.index()] = Reading::Available(value);
        self
    }

    /// Set a channel's reading
    pub fn set(&mut self, channel: Channel, reading: Reading) {
        self.values[channel.index()] = reading;
    }

    /// A channel's reading
    pub fn get(&self, channel: Channel) -> Reading {
        self.values[channel.index()]
    }

    /// Which channels are available
    pub fn mask(&self) -> AvailabilityMask {
        let mut mask = AvailabilityMask::empty();
        for channel in Channel::ALL {
            if self.get(channel).is_available() {
                mask.insert(channel);
            }
        }
        mask
    }
}

/// Set of channels with a live reading this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AvailabilityMask(u8);

impl AvailabilityMask {
    /// No channels
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Every channel
    pub const fn all() -> Self {
        Self(0b1111)
    }

    /// Add a channel
    pub fn insert(&mut self, channel: Channel) {
        self.0 |= 1 << channel.index();
    }

    /// Membership test
    pub const fn contains(self, channel: Channel) -> bool {
        self.0 & (1 << channel.index()) != 0
    }

    /// Number of channels
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// True when no channel is available (predict-only tick)
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Channels in canonical order
    pub fn iter(self) -> impl Iterator<Item = Channel> {
        Channel::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

/// Projection from state space onto this tick's available channels
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementModel {
    channels: Vec<Channel, M_MAX>,
}

impl MeasurementModel {
    /// Build the model for one tick's mask
    pub fn for_mask(mask: AvailabilityMask) -> Self {
        let mut channels = Vec::new();
        for channel in mask.iter() {
            // Capacity equals the number of channels
            let _ = channels.push(channel);
        }
        Self { channels }
    }

    /// Measurement dimension m (0..=4)
    pub fn dim(&self) -> usize {
        self.channels.len()
    }

    /// True when there is nothing to observe
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Observed channels in canonical order
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// h(x): pick the observed levels out of a state
    pub fn project(&self, state: &StateVector) -> MeasurementVector {
        let mut z = [0.0; M_MAX];
        for (k, channel) in self.channels.iter().enumerate() {
            z[k] = state[channel.index()];
        }
        z
    }

    /// Gather the observed values out of a snapshot
    pub fn gather(&self, readings: &Readings) -> MeasurementVector {
        let mut z = [0.0; M_MAX];
        for (k, channel) in self.channels.iter().enumerate() {
            z[k] = readings.get(*channel).value().unwrap_or(f64::NAN);
        }
        z
    }

    /// R restricted to the observed channels (diagonal entries)
    pub fn noise(&self, measurement_noise: &[f64; M_MAX]) -> MeasurementVector {
        let mut r = [0.0; M_MAX];
        for (k, channel) in self.channels.iter().enumerate() {
            r[k] = measurement_noise[channel.index()];
        }
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_follows_readings() {
        let readings = Readings::new()
            .with(Channel::OutletTemperature, 7.5)
            .with(Channel::InletHumidity, 40.0);
        let mask = readings.mask();

        assert_eq!(mask.len(), 2);
        assert!(mask.contains(Channel::InletHumidity));
        assert!(!mask.contains(Channel::InletTemperature));

        let order: heapless::Vec<Channel, 4> = mask.iter().collect();
        assert_eq!(order.as_slice(), &[Channel::InletHumidity, Channel::OutletTemperature]);
    }

    #[test]
    fn empty_snapshot_is_predict_only() {
        let readings = Readings::new();
        assert!(readings.mask().is_empty());
        assert!(MeasurementModel::for_mask(readings.mask()).is_empty());
    }

    #[test]
    fn projection_picks_levels_in_canonical_order() {
        let model = MeasurementModel::for_mask(AvailabilityMask::all());
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        assert_eq!(model.project(&x), [1.0, 2.0, 3.0, 4.0]);

        let mut mask = AvailabilityMask::empty();
        mask.insert(Channel::OutletHumidity);
        mask.insert(Channel::InletTemperature);
        let partial = MeasurementModel::for_mask(mask);
        let z = partial.project(&x);
        assert_eq!(&z[..partial.dim()], &[1.0, 4.0]);
    }

    #[test]
    fn gather_and_noise_align_with_projection() {
        let readings = Readings::new()
            .with(Channel::InletHumidity, 55.0)
            .with(Channel::OutletHumidity, 91.0);
        let model = MeasurementModel::for_mask(readings.mask());

        assert_eq!(&model.gather(&readings)[..2], &[55.0, 91.0]);
        assert_eq!(&model.noise(&[0.1, 0.2, 0.3, 0.4])[..2], &[0.2, 0.4]);
    }

    #[test]
    fn non_finite_reading_is_still_available() {
        let readings = Readings::new().with(Channel::OutletHumidity, f64::NAN);
        assert!(readings.mask().contains(Channel::OutletHumidity));
    }

    #[test]
    fn channel_groups() {
        assert_eq!(Channel::InletHumidity.group(), SensorGroup::Inlet);
        assert_eq!(Channel::OutletTemperature.group(), SensorGroup::Outlet);
        assert!(Channel::OutletHumidity.is_humidity());
        assert!(!Channel::InletTemperature.is_humidity());
        assert_eq!(Reading::from(None), Reading::Absent);
        assert_eq!(Reading::from(Some(1.0)).value(), Some(1.0));
    }
}
