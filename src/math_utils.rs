//! Mathematical helpers shared by the chunk movers and thermal code.

use glam::DVec2;
use rand::Rng;

/// Assert that the deviation between two values is less than a threshold
///
/// Calculates the percentage deviation between `actual` and `expected`, then
/// asserts that it is below `max_deviation`.
#[macro_export]
macro_rules! assert_deviation {
    ($actual:expr, $expected:expr, $max_deviation:expr) => {
        {
            let actual_val = $actual;
            let expected_val = $expected;
            let max_dev = $max_deviation;
            let actual_deviation = $crate::math_utils::deviation(actual_val, expected_val);

            if actual_deviation >= max_dev {
                panic!(
                    "assertion failed: deviation {:.2}% >= {:.2}%\n  actual: {:?},\n  expected: {:?}",
                    actual_deviation, max_dev, actual_val, expected_val
                );
            }
        }
    };
    ($actual:expr, $expected:expr, $max_deviation:expr, $($arg:tt)+) => {
        {
            let actual_val = $actual;
            let expected_val = $expected;
            let max_dev = $max_deviation;
            let actual_deviation = $crate::math_utils::deviation(actual_val, expected_val);

            if actual_deviation >= max_dev {
                panic!(
                    "assertion failed: deviation {:.2}% >= {:.2}%: {}\n  actual: {:?},\n  expected: {:?}",
                    actual_deviation, max_dev, format_args!($($arg)+), actual_val, expected_val
                );
            }
        }
    };
}

/// Percentage deviation of `actual` from `expected`.
///
/// When `expected` is zero the absolute value of `actual` (times 100) is returned
/// so that anything non-zero counts as deviating.
pub fn deviation(actual: f64, expected: f64) -> f64 {
    if expected == 0.0 {
        return actual.abs() * 100.0;
    }
    ((actual - expected) / expected).abs() * 100.0
}

/// Angle of a vector in radians, 0 = +x, counter-clockwise positive.
pub fn angle_of(v: DVec2) -> f64 {
    v.y.atan2(v.x)
}

/// Vector from polar coordinates.
pub fn polar(magnitude: f64, angle: f64) -> DVec2 {
    DVec2::new(magnitude * angle.cos(), magnitude * angle.sin())
}

/// Uniform sample in `[min, max)`; returns `min` for an empty range.
pub fn random_between<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64) -> f64 {
    if max <= min {
        return min;
    }
    rng.random_range(min..max)
}

/// Wrap an angle into `(-π, π]`.
pub fn wrap_signed_angle(mut angle: f64) -> f64 {
    use std::f64::consts::{PI, TAU};
    if angle.is_nan() {
        return 0.0;
    }
    while angle <= -PI {
        angle += TAU;
    }
    while angle > PI {
        angle -= TAU;
    }
    angle
}
