//! Provides the mapping between the motion of the chassis and the states of the four
//! swerve modules.
//!
//! The robot frame has the x-axis pointing forward and the y-axis pointing to the left.
//! Angles are measured counter clockwise from the x-axis in degrees, rotational
//! velocities are in radians per second.

extern crate nalgebra as na;

use na::{Rotation2, SMatrix, SVector, Vector2};

use crate::{
    module_geometry::ModuleRole,
    number_space::{normalize_degrees, smallest_distance_degrees},
    Error,
};

#[cfg(test)]
#[path = "kinematics_tests.rs"]
mod kinematics_tests;

/// The distance, in meters, below which two mounting locations are considered equal.
const OFFSET_TOLERANCE: f64 = 1e-9;

/// The module speed, in m/s, below which a module is considered to be at rest.
const REST_SPEED_TOLERANCE: f64 = 1e-9;

/// The commanded motion of the chassis.
///
/// Depending on the caller the translational velocities are either relative to the
/// robot or relative to the field.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChassisSpeeds {
    /// The forward velocity in m/s.
    pub vx: f64,

    /// The sideways velocity, positive to the left, in m/s.
    pub vy: f64,

    /// The rotational velocity, counter clockwise positive, in rad/s.
    pub omega: f64,
}

impl ChassisSpeeds {
    /// Returns a value indicating whether all components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.vx.is_finite() && self.vy.is_finite() && self.omega.is_finite()
    }

    /// Returns a value indicating whether all components are exactly zero.
    pub fn is_zero(&self) -> bool {
        self.vx == 0.0 && self.vy == 0.0 && self.omega == 0.0
    }

    /// Creates a new [ChassisSpeeds] instance.
    pub fn new(vx: f64, vy: f64, omega: f64) -> Self {
        Self { vx, vy, omega }
    }

    /// Converts field relative speeds into robot relative speeds.
    ///
    /// The translation is rotated by the negative of the robot heading. The rotational
    /// velocity is the same in both frames.
    ///
    /// ## Parameters
    ///
    /// * 'heading_degrees' - The heading of the robot relative to the field, counter
    ///   clockwise positive.
    ///
    /// ## Example
    ///
    /// ```
    /// use swerve_drive_control::kinematics::ChassisSpeeds;
    ///
    /// // Driving 'up field' while the robot faces left means driving to the robot's right.
    /// let robot = ChassisSpeeds::new(1.0, 0.0, 0.5).to_robot_relative(90.0);
    /// assert!((robot.vx - 0.0).abs() < 1e-12);
    /// assert!((robot.vy + 1.0).abs() < 1e-12);
    /// assert_eq!(robot.omega, 0.5);
    /// ```
    pub fn to_robot_relative(&self, heading_degrees: f64) -> Self {
        let rotation = Rotation2::new(-heading_degrees.to_radians());
        let translation = rotation * Vector2::new(self.vx, self.vy);
        Self {
            vx: translation.x,
            vy: translation.y,
            omega: self.omega,
        }
    }

    /// Returns the magnitude of the translational velocity in m/s.
    pub fn translation_speed(&self) -> f64 {
        self.vx.hypot(self.vy)
    }
}

/// The commanded or measured state of a single swerve module.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ModuleState {
    /// The signed wheel surface speed in m/s.
    pub speed_meters_per_second: f64,

    /// The heading of the module in degrees, in the range (-180, 180].
    pub angle_degrees: f64,
}

impl ModuleState {
    /// Returns a value indicating whether both components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.speed_meters_per_second.is_finite() && self.angle_degrees.is_finite()
    }

    /// Creates a new [ModuleState] with the angle normalized into (-180, 180].
    pub fn new(speed_meters_per_second: f64, angle_degrees: f64) -> Self {
        Self {
            speed_meters_per_second,
            angle_degrees: normalize_degrees(angle_degrees),
        }
    }

    /// Returns the state that drives the wheel in the same direction while turning the
    /// module the least from the current heading.
    ///
    /// If the target is more than a quarter turn away from the current heading the module
    /// is turned to the opposite heading and the speed is negated.
    ///
    /// ## Parameters
    ///
    /// * 'current_angle_degrees' - The current heading of the module.
    pub fn optimize(&self, current_angle_degrees: f64) -> Self {
        let error = smallest_distance_degrees(current_angle_degrees, self.angle_degrees);
        if error.abs() > 90.0 {
            Self::new(-self.speed_meters_per_second, self.angle_degrees + 180.0)
        } else {
            *self
        }
    }
}

/// Scales the module speeds down so that no module exceeds the given speed.
///
/// All speeds are scaled by the same factor so that the direction of travel of the chassis
/// is preserved. Nothing changes if all speeds are already within the limit.
///
/// ## Parameters
///
/// * 'states' - The module states that should be limited.
/// * 'max_speed_meters_per_second' - The largest speed any module can achieve.
pub fn desaturate_wheel_speeds(states: &mut [ModuleState; 4], max_speed_meters_per_second: f64) {
    let fastest = states
        .iter()
        .map(|s| s.speed_meters_per_second.abs())
        .fold(0.0, f64::max);

    if fastest <= max_speed_meters_per_second || max_speed_meters_per_second <= 0.0 {
        return;
    }

    let factor = max_speed_meters_per_second / fastest;
    for state in states.iter_mut() {
        state.speed_meters_per_second *= factor;
    }
}

/// The kinematic model of a four module swerve drivetrain.
///
/// The model remembers the last heading it produced for each module so that modules keep
/// their heading when the chassis comes to rest instead of snapping back to zero degrees.
#[derive(Clone, Debug)]
pub struct SwerveKinematics {
    /// The mounting locations of the modules, in role order.
    offsets: [Vector2<f64>; 4],

    /// The least squares solution of the forward kinematics, maps the stacked module
    /// velocity vectors onto the chassis speeds.
    inverse: SMatrix<f64, 3, 8>,

    /// The last heading, in degrees, that was produced for each module.
    previous_angles: [f64; 4],
}

impl SwerveKinematics {
    /// Creates a new [SwerveKinematics] instance for the given module layout.
    ///
    /// ## Parameters
    ///
    /// * 'offsets' - The mounting locations of the modules relative to the robot center, in
    ///   the order given by [ModuleRole::ALL].
    ///
    /// ## Errors
    ///
    /// * [Error::DuplicateModuleOffset] - Returned when two modules are mounted at the same location.
    /// * [Error::CollinearModuleOffsets] - Returned when all modules are mounted on a single line,
    ///   or when an offset is not a finite number.
    /// * [Error::DegenerateKinematics] - Returned when the chassis speeds cannot be recovered
    ///   from the module states.
    pub fn new(offsets: [Vector2<f64>; 4]) -> Result<Self, Error> {
        if offsets.iter().any(|o| !(o.x.is_finite() && o.y.is_finite())) {
            return Err(Error::CollinearModuleOffsets);
        }

        for i in 0..offsets.len() {
            for j in (i + 1)..offsets.len() {
                if (offsets[i] - offsets[j]).norm() < OFFSET_TOLERANCE {
                    return Err(Error::DuplicateModuleOffset {
                        first: ModuleRole::ALL[i],
                        second: ModuleRole::ALL[j],
                    });
                }
            }
        }

        let direction = offsets[1] - offsets[0];
        let is_collinear = offsets[2..]
            .iter()
            .all(|o| direction.perp(&(o - offsets[0])).abs() < OFFSET_TOLERANCE);
        if is_collinear {
            return Err(Error::CollinearModuleOffsets);
        }

        // Each module contributes two rows: vx - omega * y and vy + omega * x.
        let forward = SMatrix::<f64, 8, 3>::from_fn(|row, column| {
            let offset = &offsets[row / 2];
            match (row % 2, column) {
                (0, 0) => 1.0,
                (0, 2) => -offset.y,
                (1, 1) => 1.0,
                (1, 2) => offset.x,
                _ => 0.0,
            }
        });

        let normal = forward.transpose() * forward;
        let inverse = normal
            .try_inverse()
            .ok_or(Error::DegenerateKinematics)?
            * forward.transpose();

        Ok(Self {
            offsets,
            inverse,
            previous_angles: [0.0; 4],
        })
    }

    /// Returns the mounting locations of the modules in role order.
    pub fn offsets(&self) -> &[Vector2<f64>; 4] {
        &self.offsets
    }

    /// Returns the last heading, in degrees, produced for each module.
    pub fn previous_angles(&self) -> [f64; 4] {
        self.previous_angles
    }

    /// Replaces the remembered module headings, for instance with the measured headings
    /// after the modules were commanded by other means.
    pub fn reset_headings(&mut self, angles_degrees: [f64; 4]) {
        self.previous_angles = angles_degrees.map(normalize_degrees);
    }

    /// Recovers the chassis speeds from the states of the four modules.
    ///
    /// Uses the least squares solution so that inconsistent module states produce the
    /// chassis motion that best matches all modules.
    pub fn to_chassis_speeds(&self, states: &[ModuleState; 4]) -> ChassisSpeeds {
        let velocities = SVector::<f64, 8>::from_fn(|row, _| {
            let state = &states[row / 2];
            let angle = state.angle_degrees.to_radians();
            if row % 2 == 0 {
                state.speed_meters_per_second * angle.cos()
            } else {
                state.speed_meters_per_second * angle.sin()
            }
        });

        let chassis = self.inverse * velocities;
        ChassisSpeeds::new(chassis[0], chassis[1], chassis[2])
    }

    /// Computes the state of each module for the given chassis speeds.
    ///
    /// A module that ends up at rest keeps the heading it had in the previous call.
    ///
    /// ## Parameters
    ///
    /// * 'speeds' - The robot relative chassis speeds.
    pub fn to_module_states(&mut self, speeds: &ChassisSpeeds) -> [ModuleState; 4] {
        let offsets = self.offsets;
        let mut states = [ModuleState::default(); 4];
        for (i, offset) in offsets.iter().enumerate() {
            let velocity = Vector2::new(
                speeds.vx - speeds.omega * offset.y,
                speeds.vy + speeds.omega * offset.x,
            );
            states[i] = self.state_from_velocity(i, velocity);
        }

        states
    }

    /// Computes module states that ignore the rotational velocity, all four modules get
    /// the same heading and speed.
    ///
    /// A chassis at rest keeps the previous module headings.
    pub fn to_translation_only_module_states(&mut self, speeds: &ChassisSpeeds) -> [ModuleState; 4] {
        let velocity = Vector2::new(speeds.vx, speeds.vy);
        let mut states = [ModuleState::default(); 4];
        for (i, state) in states.iter_mut().enumerate() {
            *state = self.state_from_velocity(i, velocity);
        }

        states
    }

    fn state_from_velocity(&mut self, index: usize, velocity: Vector2<f64>) -> ModuleState {
        let speed = velocity.norm();
        if speed < REST_SPEED_TOLERANCE {
            return ModuleState::new(0.0, self.previous_angles[index]);
        }

        let state = ModuleState::new(speed, velocity.y.atan2(velocity.x).to_degrees());
        self.previous_angles[index] = state.angle_degrees;
        state
    }
}
