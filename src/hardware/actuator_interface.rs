use std::fmt::Display;

use crate::{gains::ClosedLoopGains, Error};

#[cfg(test)]
#[path = "actuator_interface_tests.rs"]
mod actuator_interface_tests;

/// Defines the setpoint that was last issued to an actuator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ActuatorCommand {
    /// A closed-loop velocity target in motor RPM.
    Velocity(f64),

    /// A closed-loop position target in motor rotations.
    Position(f64),

    /// An open-loop output as a fraction of the supply voltage, in the range [-1, 1].
    PercentOutput(f64),
}

impl ActuatorCommand {
    /// Returns the value of the setpoint, in the units of the control mode.
    pub fn value(&self) -> f64 {
        match self {
            ActuatorCommand::Velocity(v)
            | ActuatorCommand::Position(v)
            | ActuatorCommand::PercentOutput(v) => *v,
        }
    }
}

impl Display for ActuatorCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActuatorCommand::Velocity(v) => write!(f, "Velocity [{} RPM]", v),
            ActuatorCommand::Position(v) => write!(f, "Position [{} rotations]", v),
            ActuatorCommand::PercentOutput(v) => write!(f, "PercentOutput [{}]", v),
        }
    }
}

/// Defines the interface for a motor controller that drives a wheel or steers a swerve
/// module.
///
/// All calls are expected to be non-blocking register or bus operations. Position values
/// are in motor rotations, velocity values in motor RPM. Setpoints are fire-and-forget,
/// a controller that cannot deliver a setpoint is expected to report that itself.
pub trait HardwareActuator {
    /// Pushes the closed-loop gains to the controller of the actuator.
    ///
    /// ## Errors
    ///
    /// * [Error::FailedToConfigureActuator] - Returned when the controller did not accept
    ///   the configuration.
    fn configure_gains(&mut self, gains: &ClosedLoopGains) -> Result<(), Error>;

    /// Returns the hardware ID of the actuator.
    fn id(&self) -> i32;

    /// Returns the measured position in motor rotations.
    ///
    /// ## Errors
    ///
    /// * [Error::FailedToReadActuatorState] - Returned when the position could not be read.
    fn read_position(&self) -> Result<f64, Error>;

    /// Returns the measured velocity in motor RPM.
    ///
    /// ## Errors
    ///
    /// * [Error::FailedToReadActuatorState] - Returned when the velocity could not be read.
    fn read_velocity(&self) -> Result<f64, Error>;

    /// Overwrites the position, in motor rotations, that the integrated encoder of the
    /// actuator reports for its current physical position.
    ///
    /// ## Errors
    ///
    /// * [Error::FailedToConfigureActuator] - Returned when the controller did not accept
    ///   the new position.
    fn set_encoder_position(&mut self, rotations: f64) -> Result<(), Error>;

    /// Sets an open-loop output as a fraction of the supply voltage.
    fn set_percent_output(&mut self, fraction: f64);

    /// Sets a closed-loop position target in motor rotations.
    fn set_position_target(&mut self, rotations: f64);

    /// Sets a closed-loop velocity target in motor RPM.
    fn set_velocity_target(&mut self, rpm: f64);
}

/// Defines the interface for an encoder that reports the absolute heading of a swerve
/// module.
pub trait AbsoluteEncoder {
    /// Returns the hardware ID of the encoder.
    fn id(&self) -> i32;

    /// Returns the raw heading of the module in degrees, without any offset applied.
    ///
    /// ## Errors
    ///
    /// * [Error::FailedToReadAbsoluteEncoder] - Returned when the encoder could not be read.
    fn read_absolute_degrees(&self) -> Result<f64, Error>;
}
