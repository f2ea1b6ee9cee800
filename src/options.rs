//! Defines the live options that change the behaviour of the drivetrain at runtime.
//!
//! The options are mirrored into slots of a [TuningTransport] in the same way as the
//! gains. The drivetrain reads one [DriveOptionValues] snapshot per tick.

use serde::{Deserialize, Serialize};

use crate::tuning::{SlotValue, TuningTransport};

#[cfg(test)]
#[path = "options_tests.rs"]
mod options_tests;

/// A single option value that is mirrored into a tuning slot.
#[derive(Clone, Debug, PartialEq)]
pub struct LiveOption<T> {
    key: String,
    value: T,

    /// Set when the value changed during the last call to [LiveOption::ingest].
    dirty: bool,
}

impl<T> LiveOption<T>
where
    T: Copy + PartialEq + Into<SlotValue> + TryFrom<SlotValue, Error = SlotValue>,
{
    /// Reads the slot of the option and takes over its value.
    ///
    /// A slot that is missing or that holds a value of the wrong kind is reset to the
    /// current value of the option.
    ///
    /// ## Returns
    ///
    /// `true` if the value changed.
    pub fn ingest(&mut self, transport: &mut dyn TuningTransport) -> bool {
        self.dirty = false;
        match transport.read(&self.key).map(T::try_from) {
            Some(Ok(value)) => {
                if value != self.value {
                    let previous: SlotValue = self.value.into();
                    let current: SlotValue = value.into();
                    log::debug!(
                        "Option {} changed from {} to {}",
                        self.key,
                        previous,
                        current
                    );
                    self.value = value;
                    self.dirty = true;
                }
            }
            Some(Err(value)) => {
                log::warn!("Rejected option {}: {} is not a valid value", self.key, value);
                self.publish(transport);
            }
            None => self.publish(transport),
        }

        self.dirty
    }

    /// Returns a value indicating whether the option changed during the last ingest.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns the key of the slot of the option.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Creates a new [LiveOption] with the given slot key and initial value.
    pub fn new(key: String, value: T) -> Self {
        Self {
            key,
            value,
            dirty: false,
        }
    }

    /// Writes the current value of the option into its slot.
    pub fn publish(&self, transport: &mut dyn TuningTransport) {
        transport.publish(&self.key, self.value.into());
    }

    /// Returns the current value of the option.
    pub fn value(&self) -> T {
        self.value
    }
}

/// A snapshot of the drivetrain options.
///
/// The options are independent of each other. For instance the module state optimizations
/// also apply when rotation is not allowed.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct DriveOptionValues {
    /// Allows the robot to rotate. When not allowed all modules point in the direction
    /// of travel and the rotational velocity is dropped.
    pub allow_rotation: bool,

    /// Allows modules to reverse the wheel instead of turning more than a quarter turn.
    pub angle_optimize: bool,

    /// Scales the drive speed of a module by the cosine of its heading error.
    pub cosine_optimize: bool,

    /// The speed scale applied to [crate::drivetrain::DrivetrainController::percent_output_drive].
    pub drive_speed_scale: f64,

    /// Allows field relative driving. When disabled field relative requests are treated
    /// as robot relative.
    pub field_relative: bool,
}

impl Default for DriveOptionValues {
    fn default() -> Self {
        Self {
            allow_rotation: true,
            angle_optimize: true,
            cosine_optimize: true,
            drive_speed_scale: 1.0,
            field_relative: true,
        }
    }
}

/// The live options of the drivetrain.
pub struct DriveOptions {
    allow_rotation: LiveOption<bool>,
    angle_optimize: LiveOption<bool>,
    cosine_optimize: LiveOption<bool>,
    drive_speed_scale: LiveOption<f64>,
    field_relative: LiveOption<bool>,
    initialized: bool,
}

impl DriveOptions {
    /// Returns the option that allows or disallows rotation.
    pub fn allow_rotation(&self) -> &LiveOption<bool> {
        &self.allow_rotation
    }

    /// Returns the option that enables the angle optimization.
    pub fn angle_optimize(&self) -> &LiveOption<bool> {
        &self.angle_optimize
    }

    /// Returns the option that enables the cosine optimization.
    pub fn cosine_optimize(&self) -> &LiveOption<bool> {
        &self.cosine_optimize
    }

    /// Returns the option that holds the drive speed scale.
    pub fn drive_speed_scale(&self) -> &LiveOption<f64> {
        &self.drive_speed_scale
    }

    /// Returns the option that enables field relative driving.
    pub fn field_relative(&self) -> &LiveOption<bool> {
        &self.field_relative
    }

    /// Returns a value indicating whether any option changed during the last call to
    /// [DriveOptions::periodic].
    pub fn is_dirty(&self) -> bool {
        self.allow_rotation.is_dirty()
            || self.angle_optimize.is_dirty()
            || self.cosine_optimize.is_dirty()
            || self.drive_speed_scale.is_dirty()
            || self.field_relative.is_dirty()
    }

    /// Creates a new [DriveOptions] instance.
    ///
    /// ## Parameters
    ///
    /// * 'table' - The prefix of the slot keys. The options are published under
    ///   `<table>/Options/<name>`.
    /// * 'defaults' - The initial values of the options.
    pub fn new(table: &str, defaults: DriveOptionValues) -> Self {
        let key = |name: &str| format!("{}/Options/{}", table, name);
        Self {
            allow_rotation: LiveOption::new(key("Allow Rotation"), defaults.allow_rotation),
            angle_optimize: LiveOption::new(key("Angle Optimize"), defaults.angle_optimize),
            cosine_optimize: LiveOption::new(key("Cosine Optimize"), defaults.cosine_optimize),
            drive_speed_scale: LiveOption::new(
                key("Drive Speed Scale"),
                defaults.drive_speed_scale,
            ),
            field_relative: LiveOption::new(key("Field Relative"), defaults.field_relative),
            initialized: false,
        }
    }

    /// Synchronizes the options with their slots and returns the resulting snapshot.
    ///
    /// The first call publishes the current values. Later calls take over the slot values.
    pub fn periodic(&mut self, transport: &mut dyn TuningTransport) -> DriveOptionValues {
        if !self.initialized {
            self.allow_rotation.publish(transport);
            self.angle_optimize.publish(transport);
            self.cosine_optimize.publish(transport);
            self.drive_speed_scale.publish(transport);
            self.field_relative.publish(transport);
            self.initialized = true;
        } else {
            self.allow_rotation.ingest(transport);
            self.angle_optimize.ingest(transport);
            self.cosine_optimize.ingest(transport);
            self.drive_speed_scale.ingest(transport);
            self.field_relative.ingest(transport);
        }

        self.values()
    }

    /// Returns a snapshot of the current option values.
    pub fn values(&self) -> DriveOptionValues {
        DriveOptionValues {
            allow_rotation: self.allow_rotation.value(),
            angle_optimize: self.angle_optimize.value(),
            cosine_optimize: self.cosine_optimize.value(),
            drive_speed_scale: self.drive_speed_scale.value(),
            field_relative: self.field_relative.value(),
        }
    }
}
