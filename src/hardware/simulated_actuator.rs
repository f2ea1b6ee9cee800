//! An in-memory stand-in for the drivetrain hardware.
//!
//! The simulated actuator tracks its setpoints perfectly: a position target is reached
//! immediately and a velocity target is the measured velocity. All clones of a
//! [SimulatedActuator] share the same state so that a clone can be kept to observe an
//! actuator after it has been moved into a swerve module.

use std::sync::{Arc, Mutex};

use crate::{gains::ClosedLoopGains, Error};

use super::actuator_interface::{AbsoluteEncoder, ActuatorCommand, HardwareActuator};

#[cfg(test)]
#[path = "simulated_actuator_tests.rs"]
mod simulated_actuator_tests;

/// The motor speed, in RPM, that a simulated actuator reaches at full open-loop output.
pub const FULL_OUTPUT_RPM: f64 = 5676.0;

/// The shared state of a simulated actuator.
#[derive(Debug, Default)]
struct SimulatedActuatorState {
    /// The last setpoint issued to the actuator.
    command: Option<ActuatorCommand>,

    /// The last gains that were accepted by the actuator.
    gains: Option<ClosedLoopGains>,

    /// The number of times gains were accepted.
    gain_pushes: usize,

    /// The current position in motor rotations.
    position: f64,

    /// The current velocity in motor RPM.
    velocity: f64,

    /// Indicates if reads should fail.
    fail_reads: bool,

    /// Indicates if configuration calls should fail.
    fail_configuration: bool,
}

/// A [HardwareActuator] that lives in memory.
#[derive(Clone, Debug)]
pub struct SimulatedActuator {
    id: i32,
    state: Arc<Mutex<SimulatedActuatorState>>,
}

impl SimulatedActuator {
    /// Returns the last setpoint issued to the actuator, if any.
    pub fn command(&self) -> Option<ActuatorCommand> {
        self.with_state(|s| s.command)
    }

    /// Returns the number of times the actuator accepted new gains.
    pub fn gain_pushes(&self) -> usize {
        self.with_state(|s| s.gain_pushes)
    }

    /// Returns the last gains the actuator accepted, if any.
    pub fn gains(&self) -> Option<ClosedLoopGains> {
        self.with_state(|s| s.gains)
    }

    /// Creates a new [SimulatedActuator] at rest at position zero.
    pub fn new(id: i32) -> Self {
        Self {
            id,
            state: Arc::new(Mutex::new(SimulatedActuatorState::default())),
        }
    }

    /// Returns the last open-loop output, or `None` if the last setpoint was closed-loop.
    pub fn percent_output(&self) -> Option<f64> {
        match self.command() {
            Some(ActuatorCommand::PercentOutput(v)) => Some(v),
            _ => None,
        }
    }

    /// Returns the last position target, or `None` if the last setpoint was not a position.
    pub fn position_target(&self) -> Option<f64> {
        match self.command() {
            Some(ActuatorCommand::Position(v)) => Some(v),
            _ => None,
        }
    }

    /// Makes all subsequent configuration calls fail, or succeed again.
    pub fn set_configuration_failure(&self, fail: bool) {
        self.with_state(|s| s.fail_configuration = fail);
    }

    /// Makes all subsequent reads fail, or succeed again.
    pub fn set_read_failure(&self, fail: bool) {
        self.with_state(|s| s.fail_reads = fail);
    }

    /// Returns the last velocity target, or `None` if the last setpoint was not a velocity.
    pub fn velocity_target(&self) -> Option<f64> {
        match self.command() {
            Some(ActuatorCommand::Velocity(v)) => Some(v),
            _ => None,
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut SimulatedActuatorState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(|err| err.into_inner());
        f(&mut state)
    }
}

impl HardwareActuator for SimulatedActuator {
    fn configure_gains(&mut self, gains: &ClosedLoopGains) -> Result<(), Error> {
        let id = self.id;
        self.with_state(|s| {
            if s.fail_configuration {
                return Err(Error::FailedToConfigureActuator { id });
            }

            s.gains = Some(*gains);
            s.gain_pushes += 1;
            Ok(())
        })
    }

    fn id(&self) -> i32 {
        self.id
    }

    fn read_position(&self) -> Result<f64, Error> {
        let id = self.id;
        self.with_state(|s| {
            if s.fail_reads {
                Err(Error::FailedToReadActuatorState { id })
            } else {
                Ok(s.position)
            }
        })
    }

    fn read_velocity(&self) -> Result<f64, Error> {
        let id = self.id;
        self.with_state(|s| {
            if s.fail_reads {
                Err(Error::FailedToReadActuatorState { id })
            } else {
                Ok(s.velocity)
            }
        })
    }

    fn set_encoder_position(&mut self, rotations: f64) -> Result<(), Error> {
        let id = self.id;
        self.with_state(|s| {
            if s.fail_configuration {
                return Err(Error::FailedToConfigureActuator { id });
            }

            s.position = rotations;
            Ok(())
        })
    }

    fn set_percent_output(&mut self, fraction: f64) {
        self.with_state(|s| {
            s.command = Some(ActuatorCommand::PercentOutput(fraction));
            s.velocity = fraction * FULL_OUTPUT_RPM;
        });
    }

    fn set_position_target(&mut self, rotations: f64) {
        self.with_state(|s| {
            s.command = Some(ActuatorCommand::Position(rotations));
            s.position = rotations;
        });
    }

    fn set_velocity_target(&mut self, rpm: f64) {
        self.with_state(|s| {
            s.command = Some(ActuatorCommand::Velocity(rpm));
            s.velocity = rpm;
        });
    }
}

/// An [AbsoluteEncoder] that reports a fixed heading.
#[derive(Clone, Debug)]
pub struct SimulatedAbsoluteEncoder {
    id: i32,
    degrees: Option<f64>,
}

impl SimulatedAbsoluteEncoder {
    /// Creates an encoder that fails every read.
    pub fn failing(id: i32) -> Self {
        Self { id, degrees: None }
    }

    /// Creates an encoder that always reports the given raw heading.
    pub fn new(id: i32, degrees: f64) -> Self {
        Self {
            id,
            degrees: Some(degrees),
        }
    }
}

impl AbsoluteEncoder for SimulatedAbsoluteEncoder {
    fn id(&self) -> i32 {
        self.id
    }

    fn read_absolute_degrees(&self) -> Result<f64, Error> {
        self.degrees
            .ok_or(Error::FailedToReadAbsoluteEncoder { id: self.id })
    }
}
