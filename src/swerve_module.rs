//! Defines a single swerve module: one drive actuator and one steer actuator mounted at
//! a corner of the robot.
//!
//! The module is the only place where control units (m/s, degrees) are converted into
//! the physical units of the actuators (RPM, rotations).

use crate::{
    gains::GainSet,
    hardware::{
        actuator_interface::{AbsoluteEncoder, HardwareActuator},
        telemetry::TelemetrySink,
    },
    kinematics::ModuleState,
    module_geometry::{DriveMotorConstants, ModuleGeometry, ModuleRole},
    number_space::{normalize_degrees, smallest_distance_degrees},
    Error,
};

#[cfg(test)]
#[path = "swerve_module_tests.rs"]
mod swerve_module_tests;

/// The optimizations applied to a module state before it is dispatched to the hardware.
///
/// Both optimizations are independent of each other.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StateOptimizations {
    /// Turn the module to the opposite heading and reverse the wheel when that is the
    /// shorter turn.
    pub angle: bool,

    /// Scale the drive speed by the cosine of the remaining heading error.
    pub cosine: bool,
}

/// The hardware that belongs to a single swerve module.
pub struct ModuleHardware {
    /// The actuator that drives the wheel.
    pub drive: Box<dyn HardwareActuator>,

    /// The actuator that steers the module.
    pub steer: Box<dyn HardwareActuator>,

    /// The encoder that reports the absolute heading of the module, if one is fitted.
    pub absolute_encoder: Option<Box<dyn AbsoluteEncoder>>,
}

/// A single swerve module.
pub struct SwerveModule {
    geometry: ModuleGeometry,
    motor: DriveMotorConstants,
    drive: Box<dyn HardwareActuator>,
    steer: Box<dyn HardwareActuator>,

    /// The last dispatched state, after optimization.
    target: ModuleState,

    /// The last state read back from the actuators.
    measured: ModuleState,

    /// Set after a read failure was logged, cleared after the next successful read.
    read_failure_reported: bool,
}

impl SwerveModule {
    /// Pushes the gains to the drive and steer actuators if they are dirty.
    ///
    /// The dirty flags are not cleared, that is up to the owner of the gains once every
    /// module that shares them has applied them.
    ///
    /// ## Returns
    ///
    /// `true` if either of the gain sets was dirty.
    pub fn apply_gains(&mut self, drive_gains: &GainSet, steer_gains: &GainSet) -> bool {
        let mut dirty = false;
        if drive_gains.is_dirty() {
            push_gains(self.drive.as_mut(), self.geometry.name(), "drive", drive_gains);
            dirty = true;
        }

        if steer_gains.is_dirty() {
            push_gains(self.steer.as_mut(), self.geometry.name(), "steer", steer_gains);
            dirty = true;
        }

        dirty
    }

    /// Pushes the gains to the drive and steer actuators whether they are dirty or not.
    pub(crate) fn configure_gains(&mut self, drive_gains: &GainSet, steer_gains: &GainSet) {
        push_gains(self.drive.as_mut(), self.geometry.name(), "drive", drive_gains);
        push_gains(self.steer.as_mut(), self.geometry.name(), "steer", steer_gains);
    }

    /// Returns the static configuration of the module.
    pub fn geometry(&self) -> &ModuleGeometry {
        &self.geometry
    }

    /// Returns the theoretical maximum wheel speed of the module in m/s.
    pub fn max_linear_velocity(&self) -> f64 {
        self.geometry.max_linear_velocity(&self.motor)
    }

    /// Returns the state that was last read back from the actuators.
    pub fn measured_state(&self) -> ModuleState {
        self.measured
    }

    /// Returns the drive motor constants of the module.
    pub fn motor(&self) -> &DriveMotorConstants {
        &self.motor
    }

    /// Returns the human readable name of the module.
    pub fn name(&self) -> &str {
        self.geometry.name()
    }

    /// Creates a new [SwerveModule].
    ///
    /// When an absolute encoder is provided its heading is used to seed the position of
    /// the steer actuator. If the encoder cannot be read the module starts from the position
    /// the steer actuator reports.
    ///
    /// ## Parameters
    ///
    /// * 'geometry' - The static configuration of the module.
    /// * 'motor' - The constants of the drive motor.
    /// * 'hardware' - The actuators and encoder of the module.
    pub fn new(geometry: ModuleGeometry, motor: DriveMotorConstants, hardware: ModuleHardware) -> Self {
        let mut result = Self {
            geometry,
            motor,
            drive: hardware.drive,
            steer: hardware.steer,
            target: ModuleState::default(),
            measured: ModuleState::default(),
            read_failure_reported: false,
        };

        if let Some(encoder) = hardware.absolute_encoder {
            result.seed_steer_position(encoder.as_ref());
        }

        match result.read_angle() {
            Ok(angle) => result.measured.angle_degrees = angle,
            Err(e) => log::warn!(
                "Module {} could not read its steer position at start up: {}",
                result.geometry.name(),
                e
            ),
        }

        result.target.angle_degrees = result.measured.angle_degrees;
        result
    }

    /// Reads back the state of the actuators and records it in the telemetry.
    ///
    /// Pushes dirty gains to the actuators first. When the owner of the gains already ran
    /// [SwerveModule::apply_gains] in this tick the gains are clean and nothing is pushed.
    /// The push here serves owners that only run the periodic work. Read failures are
    /// logged once and the previous measurement is kept.
    ///
    /// ## Returns
    ///
    /// `true` if either of the gain sets was dirty.
    pub fn periodic(
        &mut self,
        drive_gains: &GainSet,
        steer_gains: &GainSet,
        telemetry: &mut dyn TelemetrySink,
    ) -> bool {
        let dirty = self.apply_gains(drive_gains, steer_gains);

        match self.read_state() {
            Ok(state) => {
                self.measured = state;
                self.read_failure_reported = false;
            }
            Err(e) => {
                if !self.read_failure_reported {
                    log::warn!(
                        "Module {} failed to read its actuators: {}. Keeping the last measurement.",
                        self.geometry.name(),
                        e
                    );
                    self.read_failure_reported = true;
                }
            }
        }

        let prefix = format!("Mod {}", self.geometry.name());
        telemetry.record(
            &format!("{}/driveVelocity", prefix),
            self.measured.speed_meters_per_second.into(),
        );
        telemetry.record(
            &format!("{}/steerAngle", prefix),
            self.measured.angle_degrees.into(),
        );
        telemetry.record(
            &format!("{}/driveSetpoint", prefix),
            self.target.speed_meters_per_second.into(),
        );
        telemetry.record(
            &format!("{}/steerSetpoint", prefix),
            self.target.angle_degrees.into(),
        );

        dirty
    }

    /// Returns the corner of the robot at which the module is mounted.
    pub fn role(&self) -> ModuleRole {
        self.geometry.role()
    }

    /// Issues a closed-loop velocity setpoint to the drive actuator.
    ///
    /// ## Parameters
    ///
    /// * 'meters_per_second' - The signed wheel surface speed.
    pub fn set_drive_velocity(&mut self, meters_per_second: f64) {
        let rpm = self.geometry.drive_meters_per_second_to_rpm(meters_per_second)
            * direction(self.geometry.drive_inverted());
        self.drive.set_velocity_target(rpm);
        self.target.speed_meters_per_second = meters_per_second;
    }

    /// Optimizes the given state and dispatches it to the actuators.
    ///
    /// ## Parameters
    ///
    /// * 'state' - The requested state of the module.
    /// * 'optimizations' - The optimizations that should be applied to the state.
    ///
    /// ## Errors
    ///
    /// * [Error::NonFiniteModuleState] - Returned when the state is not finite. Nothing is
    ///   dispatched.
    pub fn set_module_state(
        &mut self,
        state: &ModuleState,
        optimizations: StateOptimizations,
    ) -> Result<(), Error> {
        if !state.is_finite() {
            return Err(Error::NonFiniteModuleState);
        }

        let current = self.current_angle();
        let mut desired = ModuleState::new(state.speed_meters_per_second, state.angle_degrees);
        if optimizations.angle {
            desired = desired.optimize(current);
        }

        if optimizations.cosine {
            let error = smallest_distance_degrees(current, desired.angle_degrees);
            desired.speed_meters_per_second *= error.to_radians().cos();
        }

        self.set_steer_angle(desired.angle_degrees);
        self.set_drive_velocity(desired.speed_meters_per_second);
        Ok(())
    }

    /// Issues open-loop outputs to both actuators, bypassing the closed-loop controllers.
    ///
    /// Both outputs are clamped to [-1, 1]. Non-finite outputs are replaced by zero.
    pub fn set_percent_output(&mut self, drive_fraction: f64, steer_fraction: f64) {
        let clamp = |v: f64| if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };

        self.drive
            .set_percent_output(clamp(drive_fraction) * direction(self.geometry.drive_inverted()));
        self.steer
            .set_percent_output(clamp(steer_fraction) * direction(self.geometry.steer_inverted()));
    }

    /// Issues a closed-loop position setpoint to the steer actuator.
    ///
    /// ## Parameters
    ///
    /// * 'degrees' - The heading of the module, normalized into (-180, 180] before it is
    ///   converted into motor rotations.
    pub fn set_steer_angle(&mut self, degrees: f64) {
        let angle = normalize_degrees(degrees);
        let rotations = self.geometry.steer_degrees_to_rotations(angle)
            * direction(self.geometry.steer_inverted());
        self.steer.set_position_target(rotations);
        self.target.angle_degrees = angle;
    }

    /// Commands zero drive output. The steer actuator keeps its last position setpoint.
    pub fn stop(&mut self) {
        self.drive.set_percent_output(0.0);
        self.target.speed_meters_per_second = 0.0;
    }

    /// Returns the last dispatched state of the module, after optimization.
    pub fn target_state(&self) -> ModuleState {
        self.target
    }

    /// Returns the current heading of the module, or the last commanded heading when the
    /// steer actuator cannot be read.
    fn current_angle(&mut self) -> f64 {
        match self.read_angle() {
            Ok(angle) => angle,
            Err(e) => {
                if !self.read_failure_reported {
                    log::warn!(
                        "Module {} failed to read its steer position: {}. Using the last setpoint.",
                        self.geometry.name(),
                        e
                    );
                    self.read_failure_reported = true;
                }

                self.target.angle_degrees
            }
        }
    }

    fn read_angle(&self) -> Result<f64, Error> {
        let rotations = self.steer.read_position()? * direction(self.geometry.steer_inverted());
        Ok(normalize_degrees(
            self.geometry.steer_rotations_to_degrees(rotations),
        ))
    }

    fn read_state(&self) -> Result<ModuleState, Error> {
        let rpm = self.drive.read_velocity()? * direction(self.geometry.drive_inverted());
        let angle = self.read_angle()?;
        Ok(ModuleState::new(
            self.geometry.drive_rpm_to_meters_per_second(rpm),
            angle,
        ))
    }

    fn seed_steer_position(&mut self, encoder: &dyn AbsoluteEncoder) {
        let raw = match encoder.read_absolute_degrees() {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!(
                    "Module {} could not read absolute encoder {}: {}. Starting from the steer actuator position.",
                    self.geometry.name(),
                    encoder.id(),
                    e
                );
                return;
            }
        };

        let heading = if self.geometry.encoder_inverted() {
            -raw
        } else {
            raw
        };
        let angle = normalize_degrees(heading - self.geometry.encoder_offset_degrees());
        let rotations = self.geometry.steer_degrees_to_rotations(angle)
            * direction(self.geometry.steer_inverted());

        if let Err(e) = self.steer.set_encoder_position(rotations) {
            log::warn!(
                "Module {} could not seed the steer position: {}",
                self.geometry.name(),
                e
            );
        }
    }
}

/// Returns the sign that converts between control units and actuator units.
fn direction(inverted: bool) -> f64 {
    if inverted {
        -1.0
    } else {
        1.0
    }
}

fn push_gains(actuator: &mut dyn HardwareActuator, module: &str, role: &str, gains: &GainSet) {
    match actuator.configure_gains(&gains.closed_loop_gains()) {
        Ok(()) => log::info!("Module {} applied {} gains {}", module, role, gains),
        Err(e) => log::warn!(
            "Module {} failed to apply {} gains to actuator {}: {}",
            module,
            role,
            actuator.id(),
            e
        ),
    }
}
