#![warn(missing_docs)]

//! Kinematics and module coordination for a four wheel swerve (independently steered
//! and driven) robot drivetrain.
//!
//! Translates a requested chassis motion into per-module steer angle and drive speed
//! targets, keeps the closed-loop gains of each module in sync with live tuning values
//! and reports the controller state through a telemetry sink. The crate is driven by
//! a single periodic tick, see [drivetrain::DrivetrainController::periodic].

use thiserror::Error;

use drivetrain::DrivetrainKind;
use module_geometry::ModuleRole;

/// Defines the degree number space used for all steering angle math.
pub mod number_space;

/// Defines the closed-loop gains used by the module actuators.
pub mod gains;

/// Defines the static configuration of a single swerve module.
pub mod module_geometry;

/// Provides the chassis speed model and the swerve kinematics.
pub mod kinematics;

/// Defines a single swerve module.
pub mod swerve_module;

/// Defines the ordered group of four swerve modules.
pub mod module_group;

/// Defines the live options that change the drivetrain behaviour at runtime.
pub mod options;

/// Provides the live tuning protocol for gains and options.
pub mod tuning;

/// Defines the per-tick drivetrain controller.
pub mod drivetrain;

/// Defines the interfaces to the drivetrain hardware.
pub mod hardware;

#[cfg(test)]
mod test_support;

/// Defines the different errors for the swerve drive control crate.
#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Indicates that a gear ratio was zero, negative or not a finite number.
    #[error("Module {name} has an invalid gear ratio of {ratio}. Gear ratios must be larger than zero.")]
    InvalidGearRatio {
        /// The name of the module
        name: String,
        /// The offending ratio
        ratio: f64,
    },

    /// Indicates that a wheel diameter was zero, negative or not a finite number.
    #[error("Module {name} has an invalid wheel diameter of {diameter} m. Wheel diameters must be larger than zero.")]
    InvalidWheelDiameter {
        /// The name of the module
        name: String,
        /// The offending diameter in meters
        diameter: f64,
    },

    /// Indicates that the drivetrain was configured with a module count other than four.
    #[error("Expected exactly 4 swerve modules but got {count}.")]
    InvalidModuleCount {
        /// The number of modules that were provided
        count: usize,
    },

    /// Indicates that the modules were not provided in the fixed role order.
    #[error("Expected the {expected} module at position {index} but found the {found} module.")]
    ModuleOutOfOrder {
        /// The position in the module list
        index: usize,
        /// The role that belongs at the position
        expected: ModuleRole,
        /// The role that was found at the position
        found: ModuleRole,
    },

    /// Indicates that two modules are mounted at the same location.
    #[error("The {first} and {second} modules are mounted at the same location.")]
    DuplicateModuleOffset {
        /// The first module
        first: ModuleRole,
        /// The second module
        second: ModuleRole,
    },

    /// Indicates that all module mounting locations lie on a single line.
    #[error("The module mounting locations are collinear.")]
    CollinearModuleOffsets,

    /// Indicates that the inverse kinematics could not be computed for the module layout.
    #[error("The module layout does not allow the chassis speeds to be recovered from the module states.")]
    DegenerateKinematics,

    /// Indicates that a gain set has a minimum output larger than its maximum output.
    #[error("Invalid output range [{min}, {max}]. The minimum output must not exceed the maximum output.")]
    InvalidGainRange {
        /// The minimum output
        min: f64,
        /// The maximum output
        max: f64,
    },

    /// Indicates that a gain value was not a finite number.
    #[error("Gain {field} was set to the non-finite value {value}.")]
    InvalidGainValue {
        /// The name of the gain
        field: String,
        /// The rejected value
        value: f64,
    },

    /// Indicates that the drive motor constants would produce a zero or invalid top speed.
    #[error("Invalid drive motor constants: free speed {free_speed_rpm} RPM at {nominal_voltage} V.")]
    InvalidMotorConstants {
        /// The free speed of the motor in RPM
        free_speed_rpm: f64,
        /// The nominal voltage
        nominal_voltage: f64,
    },

    /// Indicates that the maximum speed scale is outside of (0, 1].
    #[error("Invalid maximum speed scale {scale}. The scale must be in the range (0, 1].")]
    InvalidSpeedScale {
        /// The rejected scale
        scale: f64,
    },

    /// Indicates that a set of module states did not contain exactly one state per module.
    #[error("Expected exactly 4 module states but got {count}.")]
    InvalidModuleStateCount {
        /// The number of states that were provided
        count: usize,
    },

    /// Indicates that a chassis speed had a component that was not a finite number.
    #[error("The requested chassis speeds contain a non-finite component.")]
    NonFiniteChassisSpeeds,

    /// Indicates that a drivetrain that only issues open-loop outputs was asked to hold
    /// module states.
    #[error("A {kind:?} drivetrain cannot hold module states.")]
    HoldNotSupported {
        /// The kind of the drivetrain
        kind: DrivetrainKind,
    },

    /// Indicates that a module state had a component that was not a finite number.
    #[error("The requested module state contains a non-finite component.")]
    NonFiniteModuleState,

    /// Indicates that the state of an actuator could not be read.
    #[error("Failed to read the state of actuator {id}.")]
    FailedToReadActuatorState {
        /// The ID of the actuator
        id: i32,
    },

    /// Indicates that the closed-loop configuration of an actuator could not be updated.
    #[error("Failed to configure actuator {id}.")]
    FailedToConfigureActuator {
        /// The ID of the actuator
        id: i32,
    },

    /// Indicates that an absolute encoder could not be read.
    #[error("Failed to read absolute encoder {id}.")]
    FailedToReadAbsoluteEncoder {
        /// The ID of the encoder
        id: i32,
    },

    /// Indicates that a tuning edit could not be delivered to the tuning transport.
    #[error("Failed to send the tuning edit for slot {key}.")]
    FailedToSendTuningEdit {
        /// The key of the slot
        key: String,
    },
}
