//! Shared builders for the unit tests.

use crate::{
    gains::{GainSet, GainSetConfig},
    hardware::simulated_actuator::SimulatedActuator,
    module_geometry::{DriveMotorConstants, ModuleGeometry, ModuleGeometryConfig, ModuleRole},
    swerve_module::{ModuleHardware, SwerveModule},
};

/// Half of the track width and wheel base of the test robot, in meters.
pub(crate) const HALF_TRACK: f64 = 0.3;

pub(crate) fn module_config(role: ModuleRole, x: f64, y: f64) -> ModuleGeometryConfig {
    let base = 10 * (role.index() as i32 + 1);
    ModuleGeometryConfig {
        role,
        name: None,
        drive_motor_id: base + 1,
        steer_motor_id: base + 2,
        encoder_id: base + 3,
        drive_inverted: false,
        steer_inverted: false,
        encoder_inverted: false,
        drive_gear_ratio: 6.75,
        steer_gear_ratio: 150.0 / 7.0,
        wheel_diameter_meters: 0.1016,
        encoder_offset_degrees: 0.0,
        mount_offset_meters: [x, y],
    }
}

/// Returns the offset of the module with the given role in a square layout.
pub(crate) fn square_offset(role: ModuleRole) -> (f64, f64) {
    match role {
        ModuleRole::FrontLeft => (HALF_TRACK, HALF_TRACK),
        ModuleRole::FrontRight => (HALF_TRACK, -HALF_TRACK),
        ModuleRole::BackRight => (-HALF_TRACK, -HALF_TRACK),
        ModuleRole::BackLeft => (-HALF_TRACK, HALF_TRACK),
    }
}

pub(crate) fn square_module_configs() -> Vec<ModuleGeometryConfig> {
    ModuleRole::ALL
        .iter()
        .map(|role| {
            let (x, y) = square_offset(*role);
            module_config(*role, x, y)
        })
        .collect()
}

pub(crate) fn drive_gains_config() -> GainSetConfig {
    GainSetConfig {
        kp: 0.0001,
        ki: 0.0,
        kd: 0.0,
        ks: 0.0,
        kv: 0.0,
        ka: 0.0,
        output_min: -1.0,
        output_max: 1.0,
    }
}

pub(crate) fn steer_gains_config() -> GainSetConfig {
    GainSetConfig {
        kp: 0.01,
        ki: 0.0,
        kd: 0.001,
        ks: 0.0,
        kv: 0.0,
        ka: 0.0,
        output_min: -1.0,
        output_max: 1.0,
    }
}

pub(crate) fn drive_gains() -> GainSet {
    GainSet::from_config(&drive_gains_config()).unwrap()
}

pub(crate) fn steer_gains() -> GainSet {
    GainSet::from_config(&steer_gains_config()).unwrap()
}

/// The simulated hardware of a single module, kept by a test to observe the module.
pub(crate) struct ModuleProbe {
    pub(crate) drive: SimulatedActuator,
    pub(crate) steer: SimulatedActuator,
}

/// Creates a module with simulated hardware and returns it with handles to that hardware.
pub(crate) fn simulated_module(config: ModuleGeometryConfig) -> (SwerveModule, ModuleProbe) {
    let geometry = ModuleGeometry::new(config).unwrap();
    let drive = SimulatedActuator::new(geometry.drive_motor_id());
    let steer = SimulatedActuator::new(geometry.steer_motor_id());
    let probe = ModuleProbe {
        drive: drive.clone(),
        steer: steer.clone(),
    };

    let module = SwerveModule::new(
        geometry,
        DriveMotorConstants::default(),
        ModuleHardware {
            drive: Box::new(drive),
            steer: Box::new(steer),
            absolute_encoder: None,
        },
    );

    (module, probe)
}

/// Creates the four modules of the square test layout.
pub(crate) fn simulated_square_modules() -> (Vec<SwerveModule>, Vec<ModuleProbe>) {
    square_module_configs()
        .into_iter()
        .map(simulated_module)
        .unzip()
}
