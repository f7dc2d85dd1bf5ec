//! Process Model
//!
//! Constant-derivative motion over one tick of Δt seconds:
//!
//! ```text
//! level ← level + rate · Δt
//! rate  ← rate
//! ```
//!
//! Rates are a random walk; all of their uncertainty growth comes from Q.
//! Without rate tracking the model is the identity and the filter tracks
//! constant values. Δt is fixed by the configured poll interval and never
//! derived from wall-clock time.

use crate::{
    measurement::Channel,
    state::{StateLayout, StateVector},
};

/// Motion model applied identically to every sigma point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessModel {
    layout: StateLayout,
    dt_s: f64,
}

impl ProcessModel {
    /// Model for a layout and a tick length in seconds
    pub const fn new(layout: StateLayout, dt_s: f64) -> Self {
        Self { layout, dt_s }
    }

    /// Tick length (s)
    pub fn dt_s(&self) -> f64 {
        self.dt_s
    }

    /// State layout
    pub fn layout(&self) -> StateLayout {
        self.layout
    }

    /// Advance one state by one tick
    pub fn propagate(&self, state: &StateVector) -> StateVector {
        let mut next = *state;
        for channel in Channel::ALL {
            if let Some(rate) = self.layout.rate_index(channel) {
                next[self.layout.level_index(channel)] += state[rate] * self.dt_s;
            }
        }
        next
    }
}
