//! Rotation representations: axis-angle vectors, matrices, Euler angles and
//! quaternions.

use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};

/// Quaternion in `(x, y, z, w)` order, as published with a pose.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    /// Unit quaternion of an axis-angle vector (direction = axis, norm = angle).
    ///
    /// A zero vector maps to exactly [`Quaternion::IDENTITY`].
    pub fn from_rotation_vector(v: &Vector3<f64>) -> Self {
        let angle = (v.x * v.x + v.y * v.y + v.z * v.z).sqrt();
        if angle > 0.0 {
            let s = (angle / 2.0).sin() / angle;
            Quaternion {
                x: v.x * s,
                y: v.y * s,
                z: v.z * s,
                w: (angle / 2.0).cos(),
            }
        } else {
            Self::IDENTITY
        }
    }

    #[inline]
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }

    /// Rotation angle in `[0, 2π]`.
    #[inline]
    pub fn angle(&self) -> f64 {
        2.0 * self.w.clamp(-1.0, 1.0).acos()
    }
}

/// Rotation matrix of an axis-angle vector (Rodrigues).
#[inline]
pub fn rotation_from_vector(v: &Vector3<f64>) -> Rotation3<f64> {
    Rotation3::new(*v)
}

/// Axis-angle vector of a rotation matrix (inverse Rodrigues).
#[inline]
pub fn vector_from_rotation(r: &Rotation3<f64>) -> Vector3<f64> {
    r.scaled_axis()
}

/// Rotation for Euler angles `(α, β, γ)` about x, y then z: `Rz(γ)·Ry(β)·Rx(α)`.
#[inline]
pub fn rotation_from_euler(angles: &Vector3<f64>) -> Rotation3<f64> {
    Rotation3::from_euler_angles(angles.x, angles.y, angles.z)
}

/// Invert a world-to-camera transform `(rvec, t)`.
///
/// Returns the camera orientation in world axes as an axis-angle vector and
/// the camera position in world coordinates (`-Rᵀ·t`).
pub fn invert_rigid(rvec: &Vector3<f64>, t: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let r = rotation_from_vector(rvec);
    let rt = r.transpose();
    let position = -(rt * t);
    (vector_from_rotation(&rt), position)
}
