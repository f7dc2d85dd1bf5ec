//! Physical Bounds and Neutral Seeds
//!
//! Relative humidity is a ratio and is bounded by definition. Temperature is
//! deliberately left unbounded: refrigerant-side outlet air can legitimately
//! swing far below freezing during defrost cycles.

/// Lower bound of relative humidity in percent.
///
/// Source: Definition of relative humidity
pub const HUMIDITY_MIN_PCT: f64 = 0.0;

/// Upper bound of relative humidity in percent.
///
/// Supersaturated readings (fog, condensate on the probe) are clamped here;
/// the filter state never reports more than saturation.
///
/// Source: Definition of relative humidity
pub const HUMIDITY_MAX_PCT: f64 = 100.0;

/// Temperature used to seed a channel with no live reading (°C).
///
/// Typical indoor air temperature; far enough from any extreme that the
/// first real measurement pulls the state in within a few ticks.
///
/// Source: ASHRAE 55 comfort band midpoint
pub const NEUTRAL_TEMPERATURE_C: f64 = 20.0;

/// Relative humidity used to seed a channel with no live reading (%RH).
///
/// Source: Midpoint of the humidity scale
pub const NEUTRAL_HUMIDITY_PCT: f64 = 50.0;

/// Seed value for every derivative state (°C/s or %RH/s).
///
/// Air is assumed to be at rest until measurements say otherwise.
pub const NEUTRAL_RATE: f64 = 0.0;
