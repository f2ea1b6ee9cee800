//! Defines the ordered group of the four swerve modules of the drivetrain.
//!
//! The group owns the drive and steer [GainSet] that all modules share. Modules push
//! dirty gains to their actuators, the group clears the dirty flags once every module
//! has done so.

use crate::{
    gains::{GainField, GainSet},
    hardware::telemetry::TelemetrySink,
    kinematics::{ModuleState, SwerveKinematics},
    module_geometry::ModuleRole,
    swerve_module::{StateOptimizations, SwerveModule},
    Error,
};

#[cfg(test)]
#[path = "module_group_tests.rs"]
mod module_group_tests;

/// The difference in meters between module radii above which the layout is considered
/// to be non-uniform.
const RADIUS_TOLERANCE: f64 = 1e-6;

/// The four swerve modules of the drivetrain in the order given by [ModuleRole::ALL].
pub struct ModuleGroup {
    modules: Vec<SwerveModule>,
    drive_gains: GainSet,
    steer_gains: GainSet,
    kinematics: SwerveKinematics,
    max_linear_velocity: f64,
    max_angular_velocity: f64,

    /// Set after a rejected set of module states was logged, cleared by the next
    /// accepted set.
    invalid_states_reported: bool,
}

impl ModuleGroup {
    /// Pushes dirty gains to every module and then clears the dirty flags.
    ///
    /// ## Returns
    ///
    /// `true` if any gains were pushed.
    pub fn apply_pending_gains(&mut self) -> bool {
        let mut dirty = false;
        for module in self.modules.iter_mut() {
            dirty |= module.apply_gains(&self.drive_gains, &self.steer_gains);
        }

        if dirty {
            self.clear_dirty_gains();
        }

        dirty
    }

    /// Returns the gains shared by the drive actuators.
    pub fn drive_gains(&self) -> &GainSet {
        &self.drive_gains
    }

    /// Returns the gains shared by the drive actuators for live tuning.
    pub fn drive_gains_mut(&mut self) -> &mut GainSet {
        &mut self.drive_gains
    }

    /// Returns the kinematic model of the module layout.
    pub fn kinematics(&self) -> &SwerveKinematics {
        &self.kinematics
    }

    /// Returns the kinematic model of the module layout.
    pub fn kinematics_mut(&mut self) -> &mut SwerveKinematics {
        &mut self.kinematics
    }

    /// Returns the fastest rotation the robot can achieve, in rad/s.
    ///
    /// Derived from [ModuleGroup::max_linear_velocity] and the largest distance between a
    /// module and the robot center.
    pub fn max_angular_velocity(&self) -> f64 {
        self.max_angular_velocity
    }

    /// Returns the fastest speed the robot can drive at, in m/s.
    ///
    /// This is the smallest of the maximum speeds of the modules, the slowest module limits
    /// the robot.
    pub fn max_linear_velocity(&self) -> f64 {
        self.max_linear_velocity
    }

    /// Returns the states last read back from the modules, in role order.
    pub fn measured_states(&self) -> [ModuleState; 4] {
        std::array::from_fn(|i| self.modules[i].measured_state())
    }

    /// Returns the modules in role order.
    pub fn modules(&self) -> &[SwerveModule] {
        &self.modules
    }

    /// Creates a new [ModuleGroup].
    ///
    /// When the drive velocity feedforward is zero it is derived from the maximum linear
    /// velocity so that full output is reached at the top speed. The steer velocity
    /// feedforward is always zero. The gains are pushed to all modules.
    ///
    /// ## Parameters
    ///
    /// * 'modules' - The four modules in the order given by [ModuleRole::ALL].
    /// * 'drive_gains' - The gains shared by the drive actuators.
    /// * 'steer_gains' - The gains shared by the steer actuators.
    ///
    /// ## Errors
    ///
    /// * [Error::InvalidModuleCount] - Returned when there are not exactly four modules.
    /// * [Error::ModuleOutOfOrder] - Returned when the modules are not in role order.
    /// * [Error::InvalidMotorConstants] - Returned when a module cannot move.
    /// * [Error::DuplicateModuleOffset], [Error::CollinearModuleOffsets],
    ///   [Error::DegenerateKinematics] - Returned when the module layout is invalid.
    pub fn new(
        modules: Vec<SwerveModule>,
        mut drive_gains: GainSet,
        mut steer_gains: GainSet,
    ) -> Result<Self, Error> {
        if modules.len() != ModuleRole::ALL.len() {
            return Err(Error::InvalidModuleCount {
                count: modules.len(),
            });
        }

        for (index, (module, expected)) in modules.iter().zip(ModuleRole::ALL).enumerate() {
            if module.role() != expected {
                return Err(Error::ModuleOutOfOrder {
                    index,
                    expected,
                    found: module.role(),
                });
            }

            module.motor().validate()?;
        }

        let mut kinematics =
            SwerveKinematics::new(std::array::from_fn(|i| *modules[i].geometry().mount_offset()))?;
        kinematics.reset_headings(std::array::from_fn(|i| {
            modules[i].target_state().angle_degrees
        }));

        let max_linear_velocity = modules
            .iter()
            .map(|m| m.max_linear_velocity())
            .fold(f64::INFINITY, f64::min);

        let radii = modules.iter().map(|m| m.geometry().mount_radius());
        let max_radius = radii.clone().fold(0.0, f64::max);
        let min_radius = radii.fold(f64::INFINITY, f64::min);
        if max_radius - min_radius > RADIUS_TOLERANCE {
            log::warn!(
                "Module radii range from {} m to {} m. The maximum angular velocity is based on the largest radius.",
                min_radius,
                max_radius
            );
        }

        let max_angular_velocity = max_linear_velocity / max_radius;

        if drive_gains.get(GainField::V) == 0.0 {
            drive_gains.override_velocity_feedforward(1.0 / max_linear_velocity);
        }

        steer_gains.override_velocity_feedforward(0.0);

        let mut result = Self {
            modules,
            drive_gains,
            steer_gains,
            kinematics,
            max_linear_velocity,
            max_angular_velocity,
            invalid_states_reported: false,
        };

        for module in result.modules.iter_mut() {
            module.configure_gains(&result.drive_gains, &result.steer_gains);
        }

        Ok(result)
    }

    /// Runs the periodic work of every module and then clears the dirty gain flags.
    ///
    /// Every module observes the same gain values in a single call, so the flags can
    /// only be cleared after all modules have applied them.
    ///
    /// ## Returns
    ///
    /// `true` if the modules pushed dirty gains to their actuators.
    pub fn periodic(&mut self, telemetry: &mut dyn TelemetrySink) -> bool {
        let mut applied = false;
        for module in self.modules.iter_mut() {
            applied |= module.periodic(&self.drive_gains, &self.steer_gains, telemetry);
        }

        if applied {
            self.clear_dirty_gains();
        }

        applied
    }

    /// Issues open-loop outputs to the drive and steer actuators of every module.
    pub fn set_percent_output(&mut self, drive_fraction: f64, steer_fraction: f64) {
        for module in self.modules.iter_mut() {
            module.set_percent_output(drive_fraction, steer_fraction);
        }
    }

    /// Dispatches one state to each module, in role order.
    ///
    /// The states are either all dispatched or none is. The first rejection is logged,
    /// subsequent rejections are not logged until a valid set of states was accepted.
    ///
    /// ## Parameters
    ///
    /// * 'states' - The states for the modules in the order given by [ModuleRole::ALL].
    /// * 'optimizations' - The optimizations applied by each module.
    ///
    /// ## Errors
    ///
    /// * [Error::InvalidModuleStateCount] - Returned when there are not exactly four states.
    /// * [Error::NonFiniteModuleState] - Returned when one of the states is not finite.
    pub fn set_swerve_module_states(
        &mut self,
        states: &[ModuleState],
        optimizations: StateOptimizations,
    ) -> Result<(), Error> {
        let validation = if states.len() != self.modules.len() {
            Err(Error::InvalidModuleStateCount {
                count: states.len(),
            })
        } else if states.iter().any(|s| !s.is_finite()) {
            Err(Error::NonFiniteModuleState)
        } else {
            Ok(())
        };

        if let Err(e) = validation {
            if !self.invalid_states_reported {
                log::warn!("Rejected module states: {}", e);
                self.invalid_states_reported = true;
            }

            return Err(e);
        }

        self.invalid_states_reported = false;
        for (module, state) in self.modules.iter_mut().zip(states) {
            module.set_module_state(state, optimizations)?;
        }

        Ok(())
    }

    /// Returns the gains shared by the steer actuators.
    pub fn steer_gains(&self) -> &GainSet {
        &self.steer_gains
    }

    /// Returns the gains shared by the steer actuators for live tuning.
    pub fn steer_gains_mut(&mut self) -> &mut GainSet {
        &mut self.steer_gains
    }

    /// Commands zero drive output on every module. The steer setpoints are kept.
    pub fn stop(&mut self) {
        for module in self.modules.iter_mut() {
            module.stop();
        }
    }

    /// Returns the states last dispatched to the modules, in role order.
    pub fn target_states(&self) -> [ModuleState; 4] {
        std::array::from_fn(|i| self.modules[i].target_state())
    }

    fn clear_dirty_gains(&mut self) {
        if self.drive_gains.is_dirty() {
            self.drive_gains.clear_dirty();
        }

        if self.steer_gains.is_dirty() {
            self.steer_gains.clear_dirty();
        }
    }
}
