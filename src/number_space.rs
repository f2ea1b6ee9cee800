//! Defines the number space in which all steering angles live.
//!
//! Steering angles are periodic: a module pointing at 190 degrees points in the same
//! direction as a module at -170 degrees. All angles that are compared, optimized or
//! logged are first brought into the half open range (-180, 180] by [normalize_degrees()].
//! The distance between two angles is always measured the short way around the circle,
//! see [smallest_distance_degrees()].
//!

#[cfg(test)]
#[path = "number_space_tests.rs"]
mod number_space_tests;

/// The size of the angular number space in degrees.
pub const DEGREES_PER_TURN: f64 = 360.0;

/// The upper, inclusive, boundary of the normalized number space in degrees.
pub const HALF_TURN_IN_DEGREES: f64 = 180.0;

/// Returns the angle that is equal to the given angle and lies in the range (-180, 180].
///
/// Non-finite values are returned as NaN.
///
/// ## Parameters
///
/// * `value` - The angle, in degrees, that should be normalized.
///
/// ## Example
///
/// ```
/// use swerve_drive_control::number_space::normalize_degrees;
///
/// assert_eq!(170.0, normalize_degrees(530.0));
/// assert_eq!(-170.0, normalize_degrees(190.0));
/// assert_eq!(180.0, normalize_degrees(-180.0));
/// ```
pub fn normalize_degrees(value: f64) -> f64 {
    // Bring the value into [0, 360) first. The remainder operator keeps the sign
    // of the dividend so we add a full turn before taking the remainder again.
    let wrapped = ((value % DEGREES_PER_TURN) + DEGREES_PER_TURN) % DEGREES_PER_TURN;
    if wrapped > HALF_TURN_IN_DEGREES {
        wrapped - DEGREES_PER_TURN
    } else {
        wrapped
    }
}

/// Returns the signed distance, in degrees, to go from `start` to `end` along the
/// shortest way around the circle.
///
/// The result is in the range (-180, 180]. A positive value indicates a counter
/// clockwise rotation.
///
/// ## Parameters
///
/// * `start` - The starting angle in degrees
/// * `end` - The ending angle in degrees
///
/// ## Example
///
/// ```
/// use swerve_drive_control::number_space::smallest_distance_degrees;
///
/// assert_eq!(20.0, smallest_distance_degrees(170.0, -170.0));
/// assert_eq!(-90.0, smallest_distance_degrees(45.0, -45.0));
/// ```
pub fn smallest_distance_degrees(start: f64, end: f64) -> f64 {
    normalize_degrees(end - start)
}
