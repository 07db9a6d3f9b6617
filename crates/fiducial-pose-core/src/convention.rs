//! Axis conventions.
//!
//! ```text
//!        Robot          |        Vision
//!   Z+                  |   Y-
//!   |    X+             |   |    Z+
//!   |   /               |   |   /
//!   |  /                |   |  /
//!   | /                 |   | /
//!   O--------> Y-       |   O--------> X+
//! ```
//!
//! The solver works in the vision convention (X right, Y down, Z depth).
//! Robot-facing inputs and outputs use X forward, Y left, Z up.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Axis convention of vectors exchanged with the outside world.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisConvention {
    /// X right, Y down, Z forward (the solver's native frame).
    Vision,
    /// X forward, Y left, Z up.
    #[default]
    Robot,
}

/// `(a, b, c)` in vision axes to `(c, -a, -b)` in robot axes.
#[inline]
pub fn vision_to_robot(v: &Vector3<f64>) -> Vector3<f64> {
    Vector3::new(v.z, -v.x, -v.y)
}

/// `(x, y, z)` in robot axes to `(-y, -z, x)` in vision axes.
#[inline]
pub fn robot_to_vision(v: &Vector3<f64>) -> Vector3<f64> {
    Vector3::new(-v.y, -v.z, v.x)
}

impl AxisConvention {
    /// Express a vision-frame vector in this convention.
    #[inline]
    pub fn from_vision(self, v: &Vector3<f64>) -> Vector3<f64> {
        match self {
            AxisConvention::Vision => *v,
            AxisConvention::Robot => vision_to_robot(v),
        }
    }

    /// Express a vector given in this convention in the vision frame.
    #[inline]
    pub fn to_vision(self, v: &Vector3<f64>) -> Vector3<f64> {
        match self {
            AxisConvention::Vision => *v,
            AxisConvention::Robot => robot_to_vision(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_mapping_matches_axis_table() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(vision_to_robot(&v), Vector3::new(3.0, -1.0, -2.0));
        assert_eq!(robot_to_vision(&v), Vector3::new(-2.0, -3.0, 1.0));
    }

    #[test]
    fn round_trips_are_exact() {
        for v in [
            Vector3::new(0.1, -7.25, 1e-300),
            Vector3::new(-3.5, 0.0, 42.0),
            Vector3::new(f64::MAX, f64::MIN_POSITIVE, -0.0),
        ] {
            assert_eq!(robot_to_vision(&vision_to_robot(&v)), v);
            assert_eq!(vision_to_robot(&robot_to_vision(&v)), v);
        }
    }

    #[test]
    fn vision_convention_is_passthrough() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(AxisConvention::Vision.from_vision(&v), v);
        assert_eq!(AxisConvention::Vision.to_vision(&v), v);
        assert_eq!(
            AxisConvention::Robot.to_vision(&AxisConvention::Robot.from_vision(&v)),
            v
        );
    }
}
