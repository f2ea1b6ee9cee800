/// Defines the interfaces for the motor controllers and absolute encoders
pub mod actuator_interface;

/// Provides an in-memory actuator for simulation and testing
pub mod simulated_actuator;

/// Defines the interface for the robot heading and a background updated heading source
pub mod heading_source;

/// Defines the sink that receives the controller telemetry
pub mod telemetry;
