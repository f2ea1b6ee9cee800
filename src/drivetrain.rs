//! Defines the drivetrain controller that runs once per control loop tick.
//!
//! Callers store the requested chassis motion with [DrivetrainController::drive] at any
//! time. [DrivetrainController::periodic] then turns the stored motion into module
//! setpoints. Within a tick the order is fixed: the heading is read, tuning edits are
//! taken over and pushed to the hardware, the module states are computed and dispatched
//! and finally the state of the hardware is read back.

extern crate nalgebra as na;

use na::Rotation2;
use serde::{Deserialize, Serialize};

use crate::{
    gains::{GainSet, GainSetConfig},
    hardware::{heading_source::HeadingSource, telemetry::TelemetrySink},
    kinematics::{desaturate_wheel_speeds, ChassisSpeeds, ModuleState},
    module_geometry::{DriveMotorConstants, ModuleGeometry, ModuleGeometryConfig},
    module_group::ModuleGroup,
    options::{DriveOptionValues, DriveOptions},
    swerve_module::{ModuleHardware, StateOptimizations, SwerveModule},
    tuning::{GainTuner, TuningTransport},
    Error,
};

#[cfg(test)]
#[path = "drivetrain_tests.rs"]
mod drivetrain_tests;

/// Selects how the drivetrain turns a chassis motion into actuator commands.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrivetrainKind {
    /// Closed-loop control through the swerve kinematics.
    #[default]
    Swerve,

    /// Open-loop control for checking the wiring of the modules. The forward velocity
    /// drives every wheel and the rotational velocity turns every module.
    Diagnostic,
}

/// The mode the drivetrain is operating in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DriveMode {
    /// The stored chassis speeds are converted into module states by the kinematics.
    Kinematic,

    /// The stored chassis speeds are converted into open-loop outputs.
    PercentOutput,

    /// Every module is held at the same fixed state.
    HoldStates(ModuleState),
}

fn default_max_speed_scale() -> f64 {
    1.0
}

fn default_tuning_table() -> String {
    "Drivetrain".to_string()
}

/// The static configuration of the drivetrain as provided by a configuration loader.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DrivetrainConfig {
    /// The kind of drivetrain.
    #[serde(default)]
    pub kind: DrivetrainKind,

    /// The largest speed scale a caller may request, in the range (0, 1].
    #[serde(default = "default_max_speed_scale")]
    pub max_speed_scale: f64,

    /// The initial values of the live options.
    #[serde(default)]
    pub options: DriveOptionValues,

    /// The constants of the drive motors.
    #[serde(default)]
    pub motor: DriveMotorConstants,

    /// The gains shared by the drive actuators.
    #[serde(default)]
    pub drive_gains: GainSetConfig,

    /// The gains shared by the steer actuators.
    #[serde(default)]
    pub steer_gains: GainSetConfig,

    /// The four modules in role order.
    pub modules: Vec<ModuleGeometryConfig>,

    /// The prefix of the tuning slot keys.
    #[serde(default = "default_tuning_table")]
    pub tuning_table: String,
}

/// The collaborators of the drivetrain that live outside of this crate.
pub struct DrivetrainServices {
    /// The source of the robot heading.
    pub heading: Box<dyn HeadingSource>,

    /// The transport for live tuning of gains and options.
    pub tuning: Box<dyn TuningTransport>,

    /// The sink for the controller and module telemetry.
    pub telemetry: Box<dyn TelemetrySink>,
}

/// The per-tick drivetrain controller.
pub struct DrivetrainController {
    kind: DrivetrainKind,
    mode: DriveMode,
    group: ModuleGroup,
    services: DrivetrainServices,
    options: DriveOptions,
    option_values: DriveOptionValues,
    drive_tuner: GainTuner,
    steer_tuner: GainTuner,

    /// The robot relative chassis speeds that are dispatched every tick.
    chassis_speeds: ChassisSpeeds,

    max_speed_scale: f64,
    drive_speed_scale: f64,

    /// The heading read at the start of the current tick.
    heading_degrees: f64,

    /// Set after rejected drive input was logged, cleared by the next accepted input.
    invalid_input_reported: bool,

    /// Set after an invalid heading was logged, cleared by the next valid heading.
    invalid_heading_reported: bool,
}

impl DrivetrainController {
    /// Returns the robot relative chassis speeds that are dispatched every tick.
    pub fn chassis_speeds(&self) -> ChassisSpeeds {
        self.chassis_speeds
    }

    /// Stores the chassis motion that is dispatched from the next tick on.
    ///
    /// Field relative speeds are rotated into the robot frame with the heading read at the
    /// start of the current tick, but only when field relative driving is enabled. All
    /// three components are multiplied by the speed scale. The translation is then limited
    /// to the maximum linear velocity without changing its direction, and the rotation is
    /// limited to the maximum angular velocity.
    ///
    /// ## Parameters
    ///
    /// * 'speeds' - The requested chassis speeds in m/s and rad/s.
    /// * 'field_relative' - Indicates if the translation is relative to the field.
    /// * 'scale' - The speed scale, clamped to [0, max speed scale].
    ///
    /// ## Errors
    ///
    /// * [Error::NonFiniteChassisSpeeds] - Returned when a speed or the scale is not finite.
    ///   The previous motion is kept.
    pub fn drive(
        &mut self,
        speeds: ChassisSpeeds,
        field_relative: bool,
        scale: f64,
    ) -> Result<(), Error> {
        if !speeds.is_finite() || !scale.is_finite() {
            if !self.invalid_input_reported {
                log::warn!(
                    "Rejected drive request {:?} with scale {}. Keeping {:?}.",
                    speeds,
                    scale,
                    self.chassis_speeds
                );
                self.invalid_input_reported = true;
            }

            return Err(Error::NonFiniteChassisSpeeds);
        }

        self.invalid_input_reported = false;

        let scale = scale.clamp(0.0, self.max_speed_scale);
        let robot = if field_relative && self.option_values.field_relative {
            speeds.to_robot_relative(self.heading_degrees)
        } else {
            speeds
        };

        let mut translation_factor = scale;
        let max_linear = self.group.max_linear_velocity();
        let translation_speed = robot.translation_speed() * scale;
        if translation_speed > max_linear {
            translation_factor *= max_linear / translation_speed;
        }

        let max_angular = self.group.max_angular_velocity();
        self.chassis_speeds = ChassisSpeeds::new(
            robot.vx * translation_factor,
            robot.vy * translation_factor,
            (robot.omega * scale).clamp(-max_angular, max_angular),
        );

        Ok(())
    }

    /// Returns the speed scale used by [DrivetrainController::percent_output_drive].
    pub fn drive_speed_scale(&self) -> f64 {
        self.drive_speed_scale
    }

    /// Creates a new [DrivetrainController] from the static configuration.
    ///
    /// ## Parameters
    ///
    /// * 'config' - The static configuration of the drivetrain.
    /// * 'hardware' - Provides the hardware for a module.
    /// * 'services' - The collaborators of the drivetrain.
    ///
    /// ## Errors
    ///
    /// Returns the first configuration error that is found, see [ModuleGeometry::new],
    /// [GainSet::new], [ModuleGroup::new] and [DrivetrainController::new].
    pub fn from_config<F>(
        config: &DrivetrainConfig,
        mut hardware: F,
        services: DrivetrainServices,
    ) -> Result<Self, Error>
    where
        F: FnMut(&ModuleGeometry) -> ModuleHardware,
    {
        config.motor.validate()?;

        let mut modules = Vec::with_capacity(config.modules.len());
        for module_config in config.modules.iter() {
            let geometry = ModuleGeometry::new(module_config.clone())?;
            let module_hardware = hardware(&geometry);
            modules.push(SwerveModule::new(
                geometry,
                config.motor.clone(),
                module_hardware,
            ));
        }

        let group = ModuleGroup::new(
            modules,
            GainSet::from_config(&config.drive_gains)?,
            GainSet::from_config(&config.steer_gains)?,
        )?;

        Self::new(
            config.kind,
            group,
            DriveOptions::new(&config.tuning_table, config.options),
            config.max_speed_scale,
            &config.tuning_table,
            services,
        )
    }

    /// Returns the heading, in degrees, read at the start of the current tick.
    pub fn heading_degrees(&self) -> f64 {
        self.heading_degrees
    }

    /// Holds every module at the same fixed state until [DrivetrainController::release_hold]
    /// or [DrivetrainController::stop] is called.
    ///
    /// Only a [DrivetrainKind::Swerve] drivetrain can hold module states, the diagnostic
    /// drivetrain never issues closed-loop setpoints.
    ///
    /// ## Errors
    ///
    /// * [Error::HoldNotSupported] - Returned when the drivetrain is not a swerve drivetrain.
    /// * [Error::NonFiniteModuleState] - Returned when the state is not finite. The current
    ///   mode is kept.
    pub fn hold_module_states(
        &mut self,
        speed_meters_per_second: f64,
        angle_degrees: f64,
    ) -> Result<(), Error> {
        if self.kind != DrivetrainKind::Swerve {
            return Err(Error::HoldNotSupported { kind: self.kind });
        }

        let state = ModuleState::new(speed_meters_per_second, angle_degrees);
        if !state.is_finite() {
            return Err(Error::NonFiniteModuleState);
        }

        log::info!("Holding all modules at {:?}", state);
        self.mode = DriveMode::HoldStates(state);
        Ok(())
    }

    /// Returns the kind of the drivetrain.
    pub fn kind(&self) -> DrivetrainKind {
        self.kind
    }

    /// Returns the largest speed scale a caller may request.
    pub fn max_speed_scale(&self) -> f64 {
        self.max_speed_scale
    }

    /// Returns the current drive mode.
    pub fn mode(&self) -> DriveMode {
        self.mode
    }

    /// Returns the group of modules.
    pub fn module_group(&self) -> &ModuleGroup {
        &self.group
    }

    /// Creates a new [DrivetrainController].
    ///
    /// ## Parameters
    ///
    /// * 'kind' - The kind of drivetrain.
    /// * 'group' - The modules of the drivetrain.
    /// * 'options' - The live options.
    /// * 'max_speed_scale' - The largest speed scale a caller may request, in (0, 1].
    /// * 'tuning_table' - The prefix of the gain tuning slot keys.
    /// * 'services' - The collaborators of the drivetrain.
    ///
    /// ## Errors
    ///
    /// * [Error::InvalidSpeedScale] - Returned when the maximum speed scale is outside (0, 1].
    pub fn new(
        kind: DrivetrainKind,
        group: ModuleGroup,
        options: DriveOptions,
        max_speed_scale: f64,
        tuning_table: &str,
        services: DrivetrainServices,
    ) -> Result<Self, Error> {
        if !(max_speed_scale > 0.0 && max_speed_scale <= 1.0) {
            return Err(Error::InvalidSpeedScale {
                scale: max_speed_scale,
            });
        }

        let option_values = options.values();
        let heading_degrees = services.heading.heading_degrees();
        let mode = match kind {
            DrivetrainKind::Swerve => DriveMode::Kinematic,
            DrivetrainKind::Diagnostic => DriveMode::PercentOutput,
        };

        log::info!(
            "Created {:?} drivetrain. Max linear velocity {} m/s, max angular velocity {} rad/s.",
            kind,
            group.max_linear_velocity(),
            group.max_angular_velocity()
        );

        let mut result = Self {
            kind,
            mode,
            group,
            services,
            options,
            option_values,
            drive_tuner: GainTuner::new(&format!("{}/Drive", tuning_table)),
            steer_tuner: GainTuner::new(&format!("{}/Steer", tuning_table)),
            chassis_speeds: ChassisSpeeds::default(),
            max_speed_scale,
            drive_speed_scale: 0.0,
            heading_degrees: if heading_degrees.is_finite() {
                heading_degrees
            } else {
                0.0
            },
            invalid_input_reported: false,
            invalid_heading_reported: false,
        };

        result.set_drive_speed_scale(option_values.drive_speed_scale);
        Ok(result)
    }

    /// Returns the option values used in the current tick.
    pub fn option_values(&self) -> DriveOptionValues {
        self.option_values
    }

    /// Stores a chassis motion given as fractions of the maximum velocities.
    ///
    /// Each component is clamped to [-1, 1] and multiplied by the maximum linear or angular
    /// velocity. The result is passed to [DrivetrainController::drive] with the current
    /// drive speed scale.
    ///
    /// ## Errors
    ///
    /// * [Error::NonFiniteChassisSpeeds] - Returned when a component is not finite.
    pub fn percent_output_drive(
        &mut self,
        fractions: ChassisSpeeds,
        field_relative: bool,
    ) -> Result<(), Error> {
        let max_linear = self.group.max_linear_velocity();
        let max_angular = self.group.max_angular_velocity();
        let speeds = ChassisSpeeds::new(
            fractions.vx.clamp(-1.0, 1.0) * max_linear,
            fractions.vy.clamp(-1.0, 1.0) * max_linear,
            fractions.omega.clamp(-1.0, 1.0) * max_angular,
        );

        self.drive(speeds, field_relative, self.drive_speed_scale)
    }

    /// Runs one tick of the drivetrain.
    pub fn periodic(&mut self) {
        self.update_heading();

        self.services.tuning.poll();
        let values = self.options.periodic(self.services.tuning.as_mut());
        if self.options.is_dirty() {
            log::info!("Drive options changed to {:?}", values);
        }

        if self.options.drive_speed_scale().is_dirty() {
            self.set_drive_speed_scale(values.drive_speed_scale);
        }

        self.option_values = values;

        self.drive_tuner
            .periodic(self.services.tuning.as_mut(), self.group.drive_gains_mut());
        self.steer_tuner
            .periodic(self.services.tuning.as_mut(), self.group.steer_gains_mut());
        self.group.apply_pending_gains();

        self.dispatch();

        self.group.periodic(self.services.telemetry.as_mut());
        self.record_telemetry();
    }

    /// Stops holding the module states. The modules are stopped and the drivetrain goes
    /// back to its normal mode.
    pub fn release_hold(&mut self) {
        if let DriveMode::HoldStates(_) = self.mode {
            self.stop();
        }
    }

    /// Makes the current heading of the robot the zero heading.
    pub fn reset_heading(&mut self) {
        self.services.heading.reset_heading();
        self.update_heading();
    }

    /// Returns the rotation of the robot relative to the field, read at the start of the
    /// current tick.
    pub fn rotation(&self) -> Rotation2<f64> {
        Rotation2::new(self.heading_degrees.to_radians())
    }

    /// Sets the speed scale used by [DrivetrainController::percent_output_drive].
    ///
    /// The scale is clamped to [0, max speed scale]. Non-finite values are ignored.
    pub fn set_drive_speed_scale(&mut self, scale: f64) {
        if !scale.is_finite() {
            log::warn!("Ignoring non-finite drive speed scale {}", scale);
            return;
        }

        self.drive_speed_scale = scale.clamp(0.0, self.max_speed_scale);
    }

    /// Stops the drivetrain.
    ///
    /// The stored chassis motion is cleared so that the next tick does not resume moving.
    /// Every drive output is set to zero while the modules keep their heading. Ends a hold.
    pub fn stop(&mut self) {
        if let DriveMode::HoldStates(_) = self.mode {
            log::info!("Releasing the module hold");
        }

        self.mode = match self.kind {
            DrivetrainKind::Swerve => DriveMode::Kinematic,
            DrivetrainKind::Diagnostic => DriveMode::PercentOutput,
        };
        self.chassis_speeds = ChassisSpeeds::default();
        self.group.stop();
        self.sync_kinematics_headings();
    }

    fn dispatch(&mut self) {
        let optimizations = StateOptimizations {
            angle: self.option_values.angle_optimize,
            cosine: self.option_values.cosine_optimize,
        };

        let states = match self.mode {
            DriveMode::PercentOutput => {
                self.group.set_percent_output(
                    self.chassis_speeds.vx / self.group.max_linear_velocity(),
                    self.chassis_speeds.omega / self.group.max_angular_velocity(),
                );
                return;
            }
            DriveMode::HoldStates(state) => [state; 4],
            DriveMode::Kinematic => {
                let kinematics = self.group.kinematics_mut();
                let mut states = if self.option_values.allow_rotation {
                    kinematics.to_module_states(&self.chassis_speeds)
                } else {
                    kinematics.to_translation_only_module_states(&self.chassis_speeds)
                };

                desaturate_wheel_speeds(&mut states, self.group.max_linear_velocity());
                states
            }
        };

        match self.group.set_swerve_module_states(&states, optimizations) {
            // At rest the kinematics repeat the last heading, which has to be the heading the
            // modules were sent after optimization.
            Ok(()) => self.sync_kinematics_headings(),
            Err(e) => log::debug!("Module states were not dispatched: {}", e),
        }
    }

    fn record_telemetry(&mut self) {
        let telemetry = self.services.telemetry.as_mut();
        telemetry.record("Drive/vx", self.chassis_speeds.vx.into());
        telemetry.record("Drive/vy", self.chassis_speeds.vy.into());
        telemetry.record("Drive/omega", self.chassis_speeds.omega.into());
        telemetry.record("Drive/heading", self.heading_degrees.into());
        telemetry.record("Drive/speedScale", self.drive_speed_scale.into());
        telemetry.record(
            "Drive/allowRotation",
            self.option_values.allow_rotation.into(),
        );

        if let DriveMode::HoldStates(_) = self.mode {
            let implied = self
                .group
                .kinematics()
                .to_chassis_speeds(&self.group.target_states());
            telemetry.record("Drive/heldVx", implied.vx.into());
            telemetry.record("Drive/heldVy", implied.vy.into());
            telemetry.record("Drive/heldOmega", implied.omega.into());
        }
    }

    fn sync_kinematics_headings(&mut self) {
        let headings = self.group.target_states().map(|s| s.angle_degrees);
        self.group.kinematics_mut().reset_headings(headings);
    }

    fn update_heading(&mut self) {
        let heading = self.services.heading.heading_degrees();
        if heading.is_finite() {
            self.heading_degrees = heading;
            self.invalid_heading_reported = false;
        } else if !self.invalid_heading_reported {
            log::warn!(
                "Heading source reported {}. Keeping the heading at {} degrees.",
                heading,
                self.heading_degrees
            );
            self.invalid_heading_reported = true;
        }
    }
}
