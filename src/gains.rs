//! Defines the closed-loop gains for the drive and steer actuators.
//!
//! A [GainSet] is created once from configuration and then lives for the lifetime of
//! the drivetrain. Live tuning edits the values in place and marks the set as dirty.
//! The dirty flag is only cleared by the owner of the set once every actuator that
//! uses the set has received the new values.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::Error;

#[cfg(test)]
#[path = "gains_tests.rs"]
mod gains_tests;

/// Identifies a single value in a [GainSet].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum GainField {
    /// The proportional gain.
    P,
    /// The integral gain.
    I,
    /// The derivative gain.
    D,
    /// The static feedforward.
    S,
    /// The velocity feedforward.
    V,
    /// The acceleration feedforward.
    A,
    /// The minimum controller output.
    OutputMin,
    /// The maximum controller output.
    OutputMax,
}

impl GainField {
    /// The gains that are mirrored to the tuning transport, in publication order.
    ///
    /// The static and acceleration feedforward terms are not pushed to the actuators
    /// and are therefore not tuned live.
    pub const TRACKED: [GainField; 6] = [
        GainField::P,
        GainField::I,
        GainField::D,
        GainField::OutputMin,
        GainField::OutputMax,
        GainField::V,
    ];

    /// Returns the label that is used for the gain in tuning slot keys.
    pub fn label(&self) -> &'static str {
        match self {
            GainField::P => "kP",
            GainField::I => "kI",
            GainField::D => "kD",
            GainField::S => "kS",
            GainField::V => "kV",
            GainField::A => "kA",
            GainField::OutputMin => "kMin",
            GainField::OutputMax => "kMax",
        }
    }
}

impl Display for GainField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The subset of a [GainSet] that is pushed to the closed-loop controller of an actuator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClosedLoopGains {
    /// The proportional gain.
    pub kp: f64,
    /// The integral gain.
    pub ki: f64,
    /// The derivative gain.
    pub kd: f64,
    /// The velocity feedforward.
    pub kv: f64,
    /// The minimum controller output.
    pub output_min: f64,
    /// The maximum controller output.
    pub output_max: f64,
}

/// The static configuration for a [GainSet].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct GainSetConfig {
    /// The proportional gain.
    pub kp: f64,
    /// The integral gain.
    pub ki: f64,
    /// The derivative gain.
    pub kd: f64,
    /// The static feedforward.
    pub ks: f64,
    /// The velocity feedforward.
    pub kv: f64,
    /// The acceleration feedforward.
    pub ka: f64,
    /// The minimum controller output.
    pub output_min: f64,
    /// The maximum controller output.
    pub output_max: f64,
}

impl Default for GainSetConfig {
    fn default() -> Self {
        Self {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            ks: 0.0,
            kv: 0.0,
            ka: 0.0,
            output_min: -1.0,
            output_max: 1.0,
        }
    }
}

/// A bundle of closed-loop gains together with a flag that indicates if the gains
/// have been changed since they were last pushed to the hardware.
#[derive(Clone, Debug, PartialEq)]
pub struct GainSet {
    kp: f64,
    ki: f64,
    kd: f64,
    ks: f64,
    kv: f64,
    ka: f64,
    output_min: f64,
    output_max: f64,

    /// Set when a value changes, cleared by the owner after the change was applied.
    dirty: bool,
}

impl GainSet {
    /// Clears the dirty flag.
    ///
    /// Should only be called by the owner of the set after all actuators that share
    /// the set have received the current values.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Returns the values that are pushed to the closed-loop controller of an actuator.
    pub fn closed_loop_gains(&self) -> ClosedLoopGains {
        ClosedLoopGains {
            kp: self.kp,
            ki: self.ki,
            kd: self.kd,
            kv: self.kv,
            output_min: self.output_min,
            output_max: self.output_max,
        }
    }

    /// Creates a new [GainSet] from the given configuration.
    ///
    /// ## Errors
    ///
    /// * [Error::InvalidGainValue] - Returned when one of the values is not finite.
    /// * [Error::InvalidGainRange] - Returned when the minimum output exceeds the maximum output.
    pub fn from_config(config: &GainSetConfig) -> Result<Self, Error> {
        Self::new(
            config.kp,
            config.ki,
            config.kd,
            config.ks,
            config.kv,
            config.ka,
            config.output_min,
            config.output_max,
        )
    }

    /// Returns the current value of the given gain.
    pub fn get(&self, field: GainField) -> f64 {
        match field {
            GainField::P => self.kp,
            GainField::I => self.ki,
            GainField::D => self.kd,
            GainField::S => self.ks,
            GainField::V => self.kv,
            GainField::A => self.ka,
            GainField::OutputMin => self.output_min,
            GainField::OutputMax => self.output_max,
        }
    }

    /// Returns a value indicating whether the gains changed since they were last applied.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Creates a new, clean, [GainSet].
    ///
    /// ## Parameters
    ///
    /// * 'kp' - The proportional gain
    /// * 'ki' - The integral gain
    /// * 'kd' - The derivative gain
    /// * 'ks' - The static feedforward
    /// * 'kv' - The velocity feedforward
    /// * 'ka' - The acceleration feedforward
    /// * 'output_min' - The minimum controller output
    /// * 'output_max' - The maximum controller output
    ///
    /// ## Errors
    ///
    /// * [Error::InvalidGainValue] - Returned when one of the values is not finite.
    /// * [Error::InvalidGainRange] - Returned when `output_min` is larger than `output_max`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kp: f64,
        ki: f64,
        kd: f64,
        ks: f64,
        kv: f64,
        ka: f64,
        output_min: f64,
        output_max: f64,
    ) -> Result<Self, Error> {
        let result = Self {
            kp,
            ki,
            kd,
            ks,
            kv,
            ka,
            output_min,
            output_max,
            dirty: false,
        };

        for field in [
            GainField::P,
            GainField::I,
            GainField::D,
            GainField::S,
            GainField::V,
            GainField::A,
            GainField::OutputMin,
            GainField::OutputMax,
        ] {
            check_finite(field, result.get(field))?;
        }

        if output_min > output_max {
            return Err(Error::InvalidGainRange {
                min: output_min,
                max: output_max,
            });
        }

        Ok(result)
    }

    /// Sets a single gain and marks the set dirty if the value changed.
    ///
    /// Changing a single output limit goes through [GainSet::set_output_range] with the
    /// other limit unchanged. Use that method directly to move both limits at once.
    ///
    /// ## Parameters
    ///
    /// * 'field' - The gain that should be changed
    /// * 'value' - The new value
    ///
    /// ## Returns
    ///
    /// `true` if the value changed, `false` otherwise.
    ///
    /// ## Errors
    ///
    /// * [Error::InvalidGainValue] - Returned when the value is not finite.
    /// * [Error::InvalidGainRange] - Returned when an output limit would cross the other limit.
    pub fn set(&mut self, field: GainField, value: f64) -> Result<bool, Error> {
        check_finite(field, value)?;

        let slot = match field {
            GainField::OutputMin => return self.set_output_range(value, self.output_max),
            GainField::OutputMax => return self.set_output_range(self.output_min, value),
            GainField::P => &mut self.kp,
            GainField::I => &mut self.ki,
            GainField::D => &mut self.kd,
            GainField::S => &mut self.ks,
            GainField::V => &mut self.kv,
            GainField::A => &mut self.ka,
        };

        if *slot == value {
            return Ok(false);
        }

        *slot = value;
        self.dirty = true;
        Ok(true)
    }

    /// Sets both output limits and marks the set dirty if either limit changed.
    ///
    /// ## Errors
    ///
    /// * [Error::InvalidGainValue] - Returned when a limit is not finite.
    /// * [Error::InvalidGainRange] - Returned when `output_min` is larger than `output_max`.
    ///   The current limits are kept.
    pub fn set_output_range(&mut self, output_min: f64, output_max: f64) -> Result<bool, Error> {
        check_finite(GainField::OutputMin, output_min)?;
        check_finite(GainField::OutputMax, output_max)?;

        if output_min > output_max {
            return Err(Error::InvalidGainRange {
                min: output_min,
                max: output_max,
            });
        }

        if self.output_min == output_min && self.output_max == output_max {
            return Ok(false);
        }

        self.output_min = output_min;
        self.output_max = output_max;
        self.dirty = true;
        Ok(true)
    }

    /// Overrides the velocity feedforward at configuration time without marking the
    /// set dirty.
    ///
    /// Used for values that are derived before any actuator has been configured.
    pub(crate) fn override_velocity_feedforward(&mut self, kv: f64) {
        self.kv = kv;
    }
}

impl Default for GainSet {
    fn default() -> Self {
        Self {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            ks: 0.0,
            kv: 0.0,
            ka: 0.0,
            output_min: -1.0,
            output_max: 1.0,
            dirty: false,
        }
    }
}

impl Display for GainSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "GainSet [kP: {}, kI: {}, kD: {}, kS: {}, kV: {}, kA: {}, kMin: {}, kMax: {}]",
            self.kp, self.ki, self.kd, self.ks, self.kv, self.ka, self.output_min, self.output_max
        )
    }
}

fn check_finite(field: GainField, value: f64) -> Result<(), Error> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidGainValue {
            field: field.label().to_string(),
            value,
        })
    }
}
