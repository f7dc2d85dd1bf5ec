//! Heat-pump signal scenarios
//!
//! Each scenario produces one sensor snapshot per tick.

use hpukf_core::measurement::{Channel, Readings};

use super::harness::TestRng;

/// Compressor cycling: the outlet swings between a heating and an idle
/// temperature while the inlet drifts slowly
pub struct CompressorCycle {
    rng: TestRng,
    tick: u32,
    /// Ticks per half cycle
    pub half_period: u32,
    /// Outlet temperature while running (°C)
    pub running_c: f64,
    /// Outlet temperature while idle (°C)
    pub idle_c: f64,
    /// Sensor noise standard deviations `[T_in, RH_in, T_out, RH_out]`
    pub noise: [f64; 4],
}

impl CompressorCycle {
    pub fn new(seed: u32) -> Self {
        Self {
            rng: TestRng::new(seed),
            tick: 0,
            half_period: 120,
            running_c: 45.0,
            idle_c: 22.0,
            noise: [0.15, 0.4, 0.01, 0.02],
        }
    }

    /// Noise-free values at the current tick
    pub fn truth(&self) -> [f64; 4] {
        let running = (self.tick / self.half_period) % 2 == 0;
        let outlet = if running { self.running_c } else { self.idle_c };
        let inlet = 20.0 + 0.002 * f64::from(self.tick);
        [inlet, 45.0, outlet, if running { 18.0 } else { 40.0 }]
    }

    /// Next noisy snapshot
    pub fn next_readings(&mut self) -> Readings {
        let truth = self.truth();
        let mut readings = Readings::new();
        for channel in Channel::ALL {
            let i = channel.index();
            readings = readings.with(channel, truth[i] + self.rng.gaussian(self.noise[i]));
        }
        self.tick += 1;
        readings
    }
}

/// A single channel at a fixed level with Gaussian noise whose standard
/// deviation switches once
pub struct NoiseStep {
    rng: TestRng,
    tick: u32,
    pub channel: Channel,
    pub level: f64,
    pub std_before: f64,
    pub std_after: f64,
    pub step_at: u32,
}

impl NoiseStep {
    pub fn new(seed: u32, channel: Channel, level: f64) -> Self {
        Self {
            rng: TestRng::new(seed),
            tick: 0,
            channel,
            level,
            std_before: 0.1,
            std_after: 1.0,
            step_at: 300,
        }
    }

    pub fn next_readings(&mut self) -> Readings {
        let std = if self.tick < self.step_at { self.std_before } else { self.std_after };
        self.tick += 1;
        Readings::new().with(self.channel, self.level + self.rng.gaussian(std))
    }
}
