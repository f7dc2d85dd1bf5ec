//! Host Boundaries
//!
//! The estimator is a pure computation unit between two synchronous
//! boundaries owned by the host firmware: sensor intake and publication.
//! Neither call may re-enter the estimator.

use crate::{
    component::Output,
    measurement::{Channel, Reading},
};

/// Sensor intake
///
/// Called once per channel at the start of every tick. Implementations
/// report [`Reading::Absent`] for unbound or stale sensors.
pub trait SensorSource {
    /// Current value of one channel
    fn read(&mut self, channel: Channel) -> Reading;
}

/// Publication of filtered values and diagnostics
pub trait EstimateSink {
    /// Publish one value; only finite values are ever passed
    fn publish(&mut self, output: Output, value: f64);
}

impl<F> SensorSource for F
where
    F: FnMut(Channel) -> Reading,
{
    fn read(&mut self, channel: Channel) -> Reading {
        self(channel)
    }
}
