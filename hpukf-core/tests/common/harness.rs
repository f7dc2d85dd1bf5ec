//! Deterministic randomness and assertion helpers

/// Assert that two floats agree within an absolute tolerance
#[macro_export]
macro_rules! assert_within_tolerance {
    ($actual:expr, $expected:expr, $tolerance:expr) => {
        let actual: f64 = $actual;
        let expected: f64 = $expected;
        let diff = (actual - expected).abs();
        if !(diff <= $tolerance) {
            panic!(
                "Value {} not within tolerance {} of expected {} (diff: {})",
                actual, $tolerance, expected, diff
            );
        }
    };
}

/// Simple deterministic RNG for tests
pub struct TestRng {
    state: u32,
}

impl TestRng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed.max(1) }
    }

    pub fn next_u32(&mut self) -> u32 {
        // Xorshift algorithm
        self.state ^= self.state << 13;
        self.state ^= self.state >> 17;
        self.state ^= self.state << 5;
        self.state
    }

    /// Uniform in [0, 1)
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32() >> 8) / 16_777_216.0
    }

    pub fn gen_range(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_f64() * (max - min)
    }

    /// Zero-mean Gaussian sample (Box-Muller)
    pub fn gaussian(&mut self, std_dev: f64) -> f64 {
        let u1 = 1.0 - self.next_f64();
        let u2 = self.next_f64();
        std_dev * (-2.0 * u1.ln()).sqrt() * (2.0 * core::f64::consts::PI * u2).cos()
    }
}

/// Running mean of a sampled series
#[derive(Default)]
pub struct RunningMean {
    sum: f64,
    count: usize,
}

impl RunningMean {
    pub fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}
