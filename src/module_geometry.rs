//! Defines the static configuration of the swerve modules and the conversions between
//! the physical units of the motors (RPM, rotations) and the control units of the
//! drivetrain (m/s, degrees).

extern crate nalgebra as na;

use std::{f64::consts::PI, fmt::Display};

use na::Vector2;
use serde::{Deserialize, Serialize};

use crate::Error;

#[cfg(test)]
#[path = "module_geometry_tests.rs"]
mod module_geometry_tests;

/// The voltage at which the free speed of a drive motor is specified.
const FREE_SPEED_REFERENCE_VOLTAGE: f64 = 12.0;

/// Defines the four corners of the robot at which a swerve module is mounted.
///
/// The order of [ModuleRole::ALL] is the order used for all module arrays, the
/// kinematics and the telemetry keys.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleRole {
    /// The front left module.
    FrontLeft,
    /// The front right module.
    FrontRight,
    /// The back right module.
    BackRight,
    /// The back left module.
    BackLeft,
}

impl ModuleRole {
    /// All module roles in the fixed module order.
    pub const ALL: [ModuleRole; 4] = [
        ModuleRole::FrontLeft,
        ModuleRole::FrontRight,
        ModuleRole::BackRight,
        ModuleRole::BackLeft,
    ];

    /// Returns the position of the role in the fixed module order.
    pub fn index(&self) -> usize {
        match self {
            ModuleRole::FrontLeft => 0,
            ModuleRole::FrontRight => 1,
            ModuleRole::BackRight => 2,
            ModuleRole::BackLeft => 3,
        }
    }

    /// Returns the human readable name of the role.
    pub fn name(&self) -> &'static str {
        match self {
            ModuleRole::FrontLeft => "Front Left",
            ModuleRole::FrontRight => "Front Right",
            ModuleRole::BackRight => "Back Right",
            ModuleRole::BackLeft => "Back Left",
        }
    }
}

impl Display for ModuleRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The electrical characteristics of the drive motors.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct DriveMotorConstants {
    /// The unloaded speed of the motor, in RPM, at 12 V.
    pub free_speed_rpm: f64,

    /// The voltage the motor controllers compensate to.
    pub nominal_voltage: f64,
}

impl DriveMotorConstants {
    /// Returns the maximum motor speed, in RPM, at the nominal voltage.
    pub fn max_rpm(&self) -> f64 {
        self.free_speed_rpm * (self.nominal_voltage / FREE_SPEED_REFERENCE_VOLTAGE)
    }

    /// Checks that the constants describe a motor that can move.
    ///
    /// ## Errors
    ///
    /// * [Error::InvalidMotorConstants] - Returned when the free speed or the nominal voltage
    ///   is not a finite, positive number.
    pub fn validate(&self) -> Result<(), Error> {
        let is_positive = |v: f64| v.is_finite() && v > 0.0;
        if !is_positive(self.free_speed_rpm) || !is_positive(self.nominal_voltage) {
            return Err(Error::InvalidMotorConstants {
                free_speed_rpm: self.free_speed_rpm,
                nominal_voltage: self.nominal_voltage,
            });
        }

        Ok(())
    }
}

impl Default for DriveMotorConstants {
    fn default() -> Self {
        Self {
            free_speed_rpm: 5676.0,
            nominal_voltage: 12.0,
        }
    }
}

/// The static configuration for a single swerve module as provided by a configuration
/// loader.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ModuleGeometryConfig {
    /// The corner of the robot at which the module is mounted.
    pub role: ModuleRole,

    /// The human readable name of the module. Defaults to the name of the role.
    #[serde(default)]
    pub name: Option<String>,

    /// The hardware ID of the drive motor controller.
    pub drive_motor_id: i32,

    /// The hardware ID of the steer motor controller.
    pub steer_motor_id: i32,

    /// The hardware ID of the absolute steering encoder.
    pub encoder_id: i32,

    /// Indicates if positive drive output moves the wheel backwards.
    #[serde(default)]
    pub drive_inverted: bool,

    /// Indicates if positive steer output rotates the module clockwise.
    #[serde(default)]
    pub steer_inverted: bool,

    /// Indicates if the absolute encoder counts clockwise.
    #[serde(default)]
    pub encoder_inverted: bool,

    /// The number of drive motor rotations per wheel rotation.
    pub drive_gear_ratio: f64,

    /// The number of steer motor rotations per module rotation.
    pub steer_gear_ratio: f64,

    /// The diameter of the wheel in meters.
    pub wheel_diameter_meters: f64,

    /// The absolute encoder reading, in degrees, when the wheel points forward.
    #[serde(default)]
    pub encoder_offset_degrees: f64,

    /// The location of the module relative to the robot center, in meters. The x-axis
    /// points forward and the y-axis points to the left.
    pub mount_offset_meters: [f64; 2],
}

/// The validated, immutable, configuration of a single swerve module.
#[derive(Clone, Debug, PartialEq)]
pub struct ModuleGeometry {
    role: ModuleRole,
    name: String,
    drive_motor_id: i32,
    steer_motor_id: i32,
    encoder_id: i32,
    drive_inverted: bool,
    steer_inverted: bool,
    encoder_inverted: bool,
    drive_gear_ratio: f64,
    steer_gear_ratio: f64,
    wheel_diameter_meters: f64,
    encoder_offset_degrees: f64,
    mount_offset: Vector2<f64>,
}

impl ModuleGeometry {
    /// Returns the hardware ID of the drive motor controller.
    pub fn drive_motor_id(&self) -> i32 {
        self.drive_motor_id
    }

    /// Returns the number of drive motor rotations per wheel rotation.
    pub fn drive_gear_ratio(&self) -> f64 {
        self.drive_gear_ratio
    }

    /// Returns a value indicating whether positive drive output moves the wheel backwards.
    pub fn drive_inverted(&self) -> bool {
        self.drive_inverted
    }

    /// Converts a wheel surface speed in m/s into a drive motor speed in RPM.
    pub fn drive_meters_per_second_to_rpm(&self, meters_per_second: f64) -> f64 {
        meters_per_second / (PI * self.wheel_diameter_meters) * 60.0 * self.drive_gear_ratio
    }

    /// Converts a drive motor speed in RPM into a wheel surface speed in m/s.
    pub fn drive_rpm_to_meters_per_second(&self, rpm: f64) -> f64 {
        rpm / self.drive_gear_ratio / 60.0 * (PI * self.wheel_diameter_meters)
    }

    /// Returns the hardware ID of the absolute steering encoder.
    pub fn encoder_id(&self) -> i32 {
        self.encoder_id
    }

    /// Returns a value indicating whether the absolute encoder counts clockwise.
    pub fn encoder_inverted(&self) -> bool {
        self.encoder_inverted
    }

    /// Returns the absolute encoder reading, in degrees, when the wheel points forward.
    pub fn encoder_offset_degrees(&self) -> f64 {
        self.encoder_offset_degrees
    }

    /// Returns the theoretical maximum wheel surface speed, in m/s, for the given motor.
    pub fn max_linear_velocity(&self, motor: &DriveMotorConstants) -> f64 {
        self.drive_rpm_to_meters_per_second(motor.max_rpm())
    }

    /// Returns the location of the module relative to the robot center.
    pub fn mount_offset(&self) -> &Vector2<f64> {
        &self.mount_offset
    }

    /// Returns the distance, in meters, between the module and the robot center.
    pub fn mount_radius(&self) -> f64 {
        self.mount_offset.norm()
    }

    /// Returns the human readable name of the module.
    pub fn name(&self) -> &str {
        self.name.as_ref()
    }

    /// Creates a new [ModuleGeometry] from the given configuration.
    ///
    /// ## Parameters
    ///
    /// * 'config' - The static configuration for the module.
    ///
    /// ## Errors
    ///
    /// * [Error::InvalidGearRatio] - Returned when either gear ratio is not a finite, positive number.
    /// * [Error::InvalidWheelDiameter] - Returned when the wheel diameter is not a finite, positive number.
    pub fn new(config: ModuleGeometryConfig) -> Result<Self, Error> {
        let name = config
            .name
            .unwrap_or_else(|| config.role.name().to_string());

        for ratio in [config.drive_gear_ratio, config.steer_gear_ratio] {
            if !(ratio.is_finite() && ratio > 0.0) {
                return Err(Error::InvalidGearRatio { name, ratio });
            }
        }

        let diameter = config.wheel_diameter_meters;
        if !(diameter.is_finite() && diameter > 0.0) {
            return Err(Error::InvalidWheelDiameter { name, diameter });
        }

        Ok(Self {
            role: config.role,
            name,
            drive_motor_id: config.drive_motor_id,
            steer_motor_id: config.steer_motor_id,
            encoder_id: config.encoder_id,
            drive_inverted: config.drive_inverted,
            steer_inverted: config.steer_inverted,
            encoder_inverted: config.encoder_inverted,
            drive_gear_ratio: config.drive_gear_ratio,
            steer_gear_ratio: config.steer_gear_ratio,
            wheel_diameter_meters: diameter,
            encoder_offset_degrees: config.encoder_offset_degrees,
            mount_offset: Vector2::new(config.mount_offset_meters[0], config.mount_offset_meters[1]),
        })
    }

    /// Returns the corner of the robot at which the module is mounted.
    pub fn role(&self) -> ModuleRole {
        self.role
    }

    /// Converts a module angle in degrees into steer motor rotations.
    pub fn steer_degrees_to_rotations(&self, degrees: f64) -> f64 {
        degrees / 360.0 * self.steer_gear_ratio
    }

    /// Returns the number of steer motor rotations per module rotation.
    pub fn steer_gear_ratio(&self) -> f64 {
        self.steer_gear_ratio
    }

    /// Returns a value indicating whether positive steer output rotates the module clockwise.
    pub fn steer_inverted(&self) -> bool {
        self.steer_inverted
    }

    /// Returns the hardware ID of the steer motor controller.
    pub fn steer_motor_id(&self) -> i32 {
        self.steer_motor_id
    }

    /// Converts steer motor rotations into a module angle in degrees.
    pub fn steer_rotations_to_degrees(&self, rotations: f64) -> f64 {
        rotations * 360.0 / self.steer_gear_ratio
    }

    /// Returns the diameter of the wheel in meters.
    pub fn wheel_diameter_meters(&self) -> f64 {
        self.wheel_diameter_meters
    }
}
