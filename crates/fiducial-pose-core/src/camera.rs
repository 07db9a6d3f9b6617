//! Pinhole camera with Brown–Conrady distortion `(k1, k2, p1, p2, k3)`.

use nalgebra::{Matrix3, Point2, Vector3};
use serde::{Deserialize, Serialize};

const UNDISTORT_ITERS: usize = 20;

/// Errors raised when building a camera model from raw calibration data.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    #[error("camera intrinsics contain non-finite values")]
    NonFinite,
    #[error("camera intrinsics matrix is singular")]
    Singular,
}

/// Intrinsics and lens distortion of a single camera.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraModel {
    /// Row-major 3×3 intrinsics.
    pub k: [f64; 9],
    /// `[k1, k2, p1, p2, k3]`.
    pub distortion: [f64; 5],
}

impl Default for CameraModel {
    /// Calibration of the reference 640×480 test camera, no distortion.
    fn default() -> Self {
        Self {
            k: [
                570.3422241210938,
                0.0,
                319.5,
                0.0,
                570.3422241210938,
                239.5,
                0.0,
                0.0,
                1.0,
            ],
            distortion: [0.0; 5],
        }
    }
}

impl CameraModel {
    /// Validate and build a camera model.
    pub fn new(k: [f64; 9], distortion: [f64; 5]) -> Result<Self, CameraError> {
        if !k.iter().chain(distortion.iter()).all(|v| v.is_finite()) {
            return Err(CameraError::NonFinite);
        }
        let model = Self { k, distortion };
        if model.k_inverse().is_none() {
            return Err(CameraError::Singular);
        }
        Ok(model)
    }

    #[inline]
    pub fn k_matrix(&self) -> Matrix3<f64> {
        Matrix3::from_row_slice(&self.k)
    }

    fn k_inverse(&self) -> Option<Matrix3<f64>> {
        let k = self.k_matrix();
        if k.determinant().abs() < 1e-12 {
            return None;
        }
        k.try_inverse()
    }

    #[inline]
    pub fn has_distortion(&self) -> bool {
        self.distortion.iter().any(|&d| d != 0.0)
    }

    /// Apply the lens model to a normalized point `(x/z, y/z)`.
    pub fn distort_normalized(&self, p: Point2<f64>) -> Point2<f64> {
        let [k1, k2, p1, p2, k3] = self.distortion;
        let (x, y) = (p.x, p.y);
        let r2 = x * x + y * y;
        let radial = 1.0 + r2 * (k1 + r2 * (k2 + r2 * k3));
        Point2::new(
            x * radial + 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x),
            y * radial + p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y,
        )
    }

    /// Project a camera-frame point to pixels. `None` for points at or behind
    /// the optical center.
    pub fn project(&self, p_cam: &Vector3<f64>) -> Option<Point2<f64>> {
        if p_cam.z <= f64::EPSILON {
            return None;
        }
        let d = self.distort_normalized(Point2::new(p_cam.x / p_cam.z, p_cam.y / p_cam.z));
        let uv = self.k_matrix() * Vector3::new(d.x, d.y, 1.0);
        Some(Point2::new(uv.x / uv.z, uv.y / uv.z))
    }

    /// Pixel to undistorted normalized image coordinates.
    ///
    /// Inverts the distortion by fixed-point iteration.
    pub fn undistort(&self, px: Point2<f64>) -> Option<Point2<f64>> {
        let v = self.k_inverse()? * Vector3::new(px.x, px.y, 1.0);
        let (x0, y0) = (v.x / v.z, v.y / v.z);
        if !self.has_distortion() {
            return Some(Point2::new(x0, y0));
        }

        let [k1, k2, p1, p2, k3] = self.distortion;
        let (mut x, mut y) = (x0, y0);
        for _ in 0..UNDISTORT_ITERS {
            let r2 = x * x + y * y;
            let icdist = 1.0 / (1.0 + r2 * (k1 + r2 * (k2 + r2 * k3)));
            let dx = 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x);
            let dy = p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y;
            x = (x0 - dx) * icdist;
            y = (y0 - dy) * icdist;
        }
        (x.is_finite() && y.is_finite()).then(|| Point2::new(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn principal_ray_hits_principal_point() {
        let cam = CameraModel::default();
        let uv = cam.project(&Vector3::new(0.0, 0.0, 2.0)).unwrap();
        assert_relative_eq!(uv.x, 319.5);
        assert_relative_eq!(uv.y, 239.5);
        assert!(cam.project(&Vector3::new(0.0, 0.0, -1.0)).is_none());
    }

    #[test]
    fn undistort_inverts_projection() {
        let cam = CameraModel::new(
            [600.0, 0.0, 320.0, 0.0, 610.0, 240.0, 0.0, 0.0, 1.0],
            [-0.12, 0.03, 0.001, -0.0005, 0.0],
        )
        .unwrap();
        let p = Vector3::new(0.21, -0.13, 1.4);
        let uv = cam.project(&p).unwrap();
        let n = cam.undistort(uv).unwrap();
        assert_relative_eq!(n.x, p.x / p.z, epsilon = 1e-9);
        assert_relative_eq!(n.y, p.y / p.z, epsilon = 1e-9);
    }

    #[test]
    fn singular_or_non_finite_intrinsics_are_rejected() {
        assert_eq!(
            CameraModel::new([0.0; 9], [0.0; 5]),
            Err(CameraError::Singular)
        );
        let mut k = CameraModel::default().k;
        k[0] = f64::NAN;
        assert_eq!(CameraModel::new(k, [0.0; 5]), Err(CameraError::NonFinite));
    }
}
