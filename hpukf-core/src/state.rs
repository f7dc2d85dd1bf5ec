//! State Layout
//!
//! The state vector always lives in fixed-capacity storage of [`N_MAX`]
//! entries. The layout decides how many are active:
//!
//! ```text
//! Levels          [T_in, RH_in, T_out, RH_out]                                  n = 4
//! LevelsAndRates  [T_in, RH_in, T_out, RH_out, dT_in, dRH_in, dT_out, dRH_out]  n = 8
//! ```
//!
//! Units: °C, %RH, °C/s, %RH/s. The rate of channel `c` sits at `c + 4`.

use crate::{
    constants::{filter::{M_MAX, N_MAX}, physics::{HUMIDITY_MAX_PCT, HUMIDITY_MIN_PCT}},
    matrix::{SquareMatrix, Vector},
    measurement::Channel,
};

/// Fixed-capacity state vector
pub type StateVector = Vector<N_MAX>;

/// Fixed-capacity state covariance
pub type StateCovariance = SquareMatrix<N_MAX>;

/// Which components the state carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateLayout {
    /// Observable levels only; the filter is a constant-value tracker
    Levels,
    /// Levels plus their time derivatives
    LevelsAndRates,
}

impl StateLayout {
    /// Layout for the derivative-tracking flag
    pub const fn from_tracking(track_derivatives: bool) -> Self {
        if track_derivatives {
            Self::LevelsAndRates
        } else {
            Self::Levels
        }
    }

    /// Active state dimension
    pub const fn dim(self) -> usize {
        match self {
            Self::Levels => M_MAX,
            Self::LevelsAndRates => N_MAX,
        }
    }

    /// True when derivatives are part of the state
    pub const fn tracks_rates(self) -> bool {
        matches!(self, Self::LevelsAndRates)
    }

    /// State index of a channel's level
    pub const fn level_index(self, channel: Channel) -> usize {
        channel.index()
    }

    /// State index of a channel's rate, if rates are tracked
    pub const fn rate_index(self, channel: Channel) -> Option<usize> {
        match self {
            Self::Levels => None,
            Self::LevelsAndRates => Some(channel.index() + M_MAX),
        }
    }
}

/// Clamp the humidity levels of a state into the physical range
///
/// Rates are left alone: a humidity that is pinned at saturation may still
/// be heading back down.
pub fn clamp_humidity(state: &mut StateVector) {
    for channel in Channel::ALL {
        if channel.is_humidity() {
            let i = channel.index();
            state[i] = state[i].clamp(HUMIDITY_MIN_PCT, HUMIDITY_MAX_PCT);
        }
    }
}
