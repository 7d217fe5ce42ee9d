//! Unit conversion for the Rydberg-analog model (component C1).
//!
//! A [`Converter`] carries a single degree of freedom — time, energy or
//! distance — under two algebraic invariants:
//!
//! 1. `time * energy == 1000`
//! 2. `energy * distance^6 == c6`
//!
//! `c6` is the interaction coefficient of the target device and is fixed
//! for the lifetime of a converter; any two of `(time, energy, distance)`
//! determine the third.

use nalgebra::DVector;

use crate::error::{BladeError, BladeResult};

const INVARIANT_TOLERANCE: f64 = 1e-7;
const TIME_ENERGY_PRODUCT: f64 = 1000.0;

fn factors_from_time(c6: f64, time: f64) -> (f64, f64, f64) {
    let energy = TIME_ENERGY_PRODUCT / time;
    let distance = (c6 / energy).powf(1.0 / 6.0);
    (time, energy, distance)
}

fn factors_from_energy(c6: f64, energy: f64) -> (f64, f64, f64) {
    let time = TIME_ENERGY_PRODUCT / energy;
    let distance = (c6 / energy).powf(1.0 / 6.0);
    (time, energy, distance)
}

fn factors_from_distance(c6: f64, distance: f64) -> (f64, f64, f64) {
    let energy = c6 / distance.powi(6);
    let time = TIME_ENERGY_PRODUCT / energy;
    (time, energy, distance)
}

fn check_positive(_name: &str, value: f64) -> BladeResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(BladeError::Domain { value })
    }
}

/// The `(time, energy, distance)` conversion triple, plus the interaction
/// coefficient `c6` that anchors it.
///
/// Invariants: `time * energy == 1000` and `energy * distance^6 == c6`,
/// both within [`INVARIANT_TOLERANCE`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Converter {
    c6: f64,
    time: f64,
    energy: f64,
    distance: f64,
}

impl Converter {
    fn from_factors(c6: f64, time: f64, energy: f64, distance: f64) -> BladeResult<Self> {
        let converter = Converter {
            c6,
            time,
            energy,
            distance,
        };
        converter.check_invariants()?;
        Ok(converter)
    }

    fn check_invariants(&self) -> BladeResult<()> {
        let time_energy = self.time * self.energy;
        if (time_energy - TIME_ENERGY_PRODUCT).abs() > INVARIANT_TOLERANCE {
            return Err(BladeError::InvariantViolation(format!(
                "time * energy = {time_energy}, expected {TIME_ENERGY_PRODUCT}"
            )));
        }
        let energy_distance = self.energy * self.distance.powi(6);
        if (energy_distance - self.c6).abs() > INVARIANT_TOLERANCE {
            return Err(BladeError::InvariantViolation(format!(
                "energy * distance^6 = {energy_distance}, expected c6 = {}",
                self.c6
            )));
        }
        Ok(())
    }

    /// Anchors the converter on a chosen time unit `t`.
    pub fn from_time(c6: f64, t: f64) -> BladeResult<Self> {
        check_positive("c6", c6)?;
        check_positive("time", t)?;
        let (time, energy, distance) = factors_from_time(c6, t);
        Self::from_factors(c6, time, energy, distance)
    }

    /// Anchors the converter on a chosen energy unit `e`.
    pub fn from_energy(c6: f64, e: f64) -> BladeResult<Self> {
        check_positive("c6", c6)?;
        check_positive("energy", e)?;
        let (time, energy, distance) = factors_from_energy(c6, e);
        Self::from_factors(c6, time, energy, distance)
    }

    /// Anchors the converter on a chosen distance unit `d`.
    pub fn from_distance(c6: f64, d: f64) -> BladeResult<Self> {
        check_positive("c6", c6)?;
        check_positive("distance", d)?;
        let (time, energy, distance) = factors_from_distance(c6, d);
        Self::from_factors(c6, time, energy, distance)
    }

    /// Mirrors `qoolqit`'s device-driven construction: anchors on
    /// `max_amp` when supplied by the device, otherwise on `4*PI`.
    pub fn from_device_defaults(c6: f64, max_amp: Option<f64>) -> BladeResult<Self> {
        let energy = max_amp.unwrap_or(4.0 * std::f64::consts::PI);
        Self::from_energy(c6, energy)
    }

    /// The current `(time, energy, distance)` triple.
    pub fn factors(&self) -> (f64, f64, f64) {
        (self.time, self.energy, self.distance)
    }

    pub fn c6(&self) -> f64 {
        self.c6
    }

    /// Re-anchors the converter on a new time unit, preserving both
    /// invariants.
    pub fn set_time_unit(&mut self, t: f64) -> BladeResult<()> {
        check_positive("time", t)?;
        let (time, energy, distance) = factors_from_time(self.c6, t);
        self.time = time;
        self.energy = energy;
        self.distance = distance;
        self.check_invariants()
    }

    /// Re-anchors the converter on a new energy unit, preserving both
    /// invariants.
    pub fn set_energy_unit(&mut self, e: f64) -> BladeResult<()> {
        check_positive("energy", e)?;
        let (time, energy, distance) = factors_from_energy(self.c6, e);
        self.time = time;
        self.energy = energy;
        self.distance = distance;
        self.check_invariants()
    }

    /// Re-anchors the converter on a new distance unit, preserving both
    /// invariants.
    pub fn set_distance_unit(&mut self, d: f64) -> BladeResult<()> {
        check_positive("distance", d)?;
        let (time, energy, distance) = factors_from_distance(self.c6, d);
        self.time = time;
        self.energy = energy;
        self.distance = distance;
        self.check_invariants()
    }
}

/// Per-node non-positive detuning weights paired with a non-positive
/// waveform, as consumed by device compilation (out of scope here).
///
/// Kept as a data-model entity so the converter module exposes a complete
/// surface for an eventual compilation layer; no waveform algebra is
/// implemented against it.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedDetuning {
    weights: DVector<f64>,
}

impl WeightedDetuning {
    /// Builds a weighted detuning, rejecting any positive weight.
    pub fn new(weights: DVector<f64>) -> BladeResult<Self> {
        if weights.iter().any(|&w| w > 0.0) {
            return Err(BladeError::InvalidInput(
                "all detuning weights must be non-positive".to_string(),
            ));
        }
        Ok(WeightedDetuning { weights })
    }

    pub fn weights(&self) -> &DVector<f64> {
        &self.weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn from_energy_matches_closed_form() {
        // Scenario 4 of the testable-properties section: C6=5420.0, E=4*pi.
        let c6 = 5420.0;
        let converter = Converter::from_energy(c6, 4.0 * std::f64::consts::PI).unwrap();
        let (time, energy, distance) = converter.factors();
        assert_relative_eq!(time, 79.577_471_545_947_67, epsilon = 1e-6);
        assert_relative_eq!(energy, 4.0 * std::f64::consts::PI, epsilon = 1e-9);
        assert_relative_eq!(distance, 2.748_726_759_482_693, epsilon = 1e-6);
    }

    #[test]
    fn set_time_unit_preserves_invariants() {
        let c6 = 5420.0;
        let mut converter = Converter::from_energy(c6, 4.0 * std::f64::consts::PI).unwrap();
        converter.set_time_unit(10.0).unwrap();
        let (time, energy, distance) = converter.factors();
        assert_relative_eq!(time, 10.0, epsilon = 1e-12);
        assert_relative_eq!(energy, 100.0, epsilon = 1e-9);
        assert_relative_eq!(distance, (c6 / 100.0).powf(1.0 / 6.0), epsilon = 1e-9);
        assert_relative_eq!(time * energy, 1000.0, epsilon = 1e-7);
        assert_relative_eq!(energy * distance.powi(6), c6, epsilon = 1e-7);
    }

    #[test]
    fn rejects_non_positive_inputs() {
        assert!(Converter::from_time(5420.0, 0.0).is_err());
        assert!(Converter::from_energy(5420.0, -1.0).is_err());
        assert!(Converter::from_distance(-5420.0, 1.0).is_err());
    }

    #[test]
    fn weighted_detuning_rejects_positive_weight() {
        let weights = DVector::from_vec(vec![-1.0, 0.5]);
        assert!(WeightedDetuning::new(weights).is_err());
        let weights = DVector::from_vec(vec![-1.0, -0.5, 0.0]);
        assert!(WeightedDetuning::new(weights).is_ok());
    }

    #[test]
    fn round_trips_between_anchors() {
        let c6 = 5420.0;
        let by_time = Converter::from_time(c6, 79.577_471_545_947_67).unwrap();
        let by_energy = Converter::from_energy(c6, 4.0 * std::f64::consts::PI).unwrap();
        assert_relative_eq!(by_time.factors().1, by_energy.factors().1, epsilon = 1e-6);
    }
}
