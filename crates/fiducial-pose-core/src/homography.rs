//! Plane-to-plane homographies.
//!
//! Used by the marker decoder (canonical square -> image quad) and by the
//! planar PnP initialisation (marker plane -> normalized image plane).

use nalgebra::{DMatrix, Matrix3, Point2, SMatrix, SVector, Vector3};

/// Projective map `dst ~ H * src`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Point2<f64> {
        let v = self.h * Vector3::new(p.x, p.y, 1.0);
        Point2::new(v[0] / v[2], v[1] / v[2])
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }

    /// Exact homography from four correspondences.
    ///
    /// Corner order must agree between `src` and `dst`.
    pub fn from_4pt(src: &[Point2<f64>; 4], dst: &[Point2<f64>; 4]) -> Option<Self> {
        let (src_n, t_src) = normalize(src);
        let (dst_n, t_dst) = normalize(dst);

        // Unknowns [h11 h12 h13 h21 h22 h23 h31 h32], h33 = 1.
        let mut a = SMatrix::<f64, 8, 8>::zeros();
        let mut b = SVector::<f64, 8>::zeros();
        for k in 0..4 {
            let (x, y) = (src_n[k].x, src_n[k].y);
            let (u, v) = (dst_n[k].x, dst_n[k].y);

            let r0 = 2 * k;
            a[(r0, 0)] = x;
            a[(r0, 1)] = y;
            a[(r0, 2)] = 1.0;
            a[(r0, 6)] = -u * x;
            a[(r0, 7)] = -u * y;
            b[r0] = u;

            let r1 = r0 + 1;
            a[(r1, 3)] = x;
            a[(r1, 4)] = y;
            a[(r1, 5)] = 1.0;
            a[(r1, 6)] = -v * x;
            a[(r1, 7)] = -v * y;
            b[r1] = v;
        }

        let x = a.lu().solve(&b)?;
        let hn = Matrix3::new(
            x[0], x[1], x[2], //
            x[3], x[4], x[5], //
            x[6], x[7], 1.0,
        );
        denormalize(hn, t_src, t_dst).map(Self::new)
    }

    /// Least-squares DLT homography for `n >= 4` correspondences.
    pub fn estimate(src: &[Point2<f64>], dst: &[Point2<f64>]) -> Option<Self> {
        if src.len() != dst.len() || src.len() < 4 {
            return None;
        }
        if let (Ok(s), Ok(d)) = (
            <&[Point2<f64>; 4]>::try_from(src),
            <&[Point2<f64>; 4]>::try_from(dst),
        ) {
            return Self::from_4pt(s, d);
        }

        let (s, t_src) = normalize(src);
        let (d, t_dst) = normalize(dst);

        let n = src.len();
        let mut a = DMatrix::<f64>::zeros(2 * n, 9);
        for k in 0..n {
            let (x, y) = (s[k].x, s[k].y);
            let (u, v) = (d[k].x, d[k].y);

            a[(2 * k, 0)] = -x;
            a[(2 * k, 1)] = -y;
            a[(2 * k, 2)] = -1.0;
            a[(2 * k, 6)] = u * x;
            a[(2 * k, 7)] = u * y;
            a[(2 * k, 8)] = u;

            a[(2 * k + 1, 3)] = -x;
            a[(2 * k + 1, 4)] = -y;
            a[(2 * k + 1, 5)] = -1.0;
            a[(2 * k + 1, 6)] = v * x;
            a[(2 * k + 1, 7)] = v * y;
            a[(2 * k + 1, 8)] = v;
        }

        // Null vector of A: right singular vector of the smallest singular value.
        let svd = a.svd(false, true);
        let v_t = svd.v_t?;
        let (min_idx, _) = svd
            .singular_values
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))?;
        let h = v_t.row(min_idx);
        let hn = Matrix3::from_row_slice(&[h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]]);

        denormalize(hn, t_src, t_dst).map(Self::new)
    }
}

/// Hartley normalization: centroid to origin, mean distance `sqrt(2)`.
fn normalize(pts: &[Point2<f64>]) -> (Vec<Point2<f64>>, Matrix3<f64>) {
    let n = pts.len().max(1) as f64;
    let cx = pts.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = pts.iter().map(|p| p.y).sum::<f64>() / n;
    let mean_dist = pts
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;

    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let out = pts
        .iter()
        .map(|p| Point2::new(s * (p.x - cx), s * (p.y - cy)))
        .collect();
    (out, t)
}

fn denormalize(hn: Matrix3<f64>, t_src: Matrix3<f64>, t_dst: Matrix3<f64>) -> Option<Matrix3<f64>> {
    let h = t_dst.try_inverse()? * hn * t_src;
    let s = h[(2, 2)];
    if s.abs() < 1e-12 || !h.iter().all(|v| v.is_finite()) {
        return None;
    }
    Some(h / s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Point2<f64>, b: Point2<f64>, tol: f64) {
        assert!(
            (a.x - b.x).abs() < tol && (a.y - b.y).abs() < tol,
            "expected ({:.6},{:.6}) ~ ({:.6},{:.6}) within {}",
            a.x,
            a.y,
            b.x,
            b.y,
            tol
        );
    }

    fn ground_truth() -> Homography {
        Homography::new(Matrix3::new(
            0.8, 0.05, 120.0, //
            -0.02, 1.1, 80.0, //
            0.0009, -0.0004, 1.0,
        ))
    }

    #[test]
    fn four_point_solution_reproduces_mapping() {
        let gt = ground_truth();
        let src = [
            Point2::new(0.0, 0.0),
            Point2::new(70.0, 0.0),
            Point2::new(70.0, 70.0),
            Point2::new(0.0, 70.0),
        ];
        let dst = src.map(|p| gt.apply(p));
        let h = Homography::from_4pt(&src, &dst).expect("solvable");
        for p in [Point2::new(5.0, 5.0), Point2::new(35.0, 60.0)] {
            assert_close(h.apply(p), gt.apply(p), 1e-6);
        }
    }

    #[test]
    fn overdetermined_dlt_reproduces_mapping() {
        let gt = ground_truth();
        let src: Vec<Point2<f64>> = (0..3)
            .flat_map(|y| (0..3).map(move |x| Point2::new(x as f64 * 40.0, y as f64 * 50.0)))
            .collect();
        let dst: Vec<Point2<f64>> = src.iter().map(|&p| gt.apply(p)).collect();
        let h = Homography::estimate(&src, &dst).expect("estimate");
        assert_close(h.apply(Point2::new(60.0, 40.0)), gt.apply(Point2::new(60.0, 40.0)), 1e-6);
    }

    #[test]
    fn inverse_round_trips() {
        let gt = ground_truth();
        let inv = gt.inverse().expect("invertible");
        let p = Point2::new(320.0, 200.0);
        assert_close(inv.apply(gt.apply(p)), p, 1e-6);
    }

    #[test]
    fn collinear_points_fail() {
        let src = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(3.0, 0.0),
        ];
        assert!(Homography::from_4pt(&src, &src).is_none());
        assert!(Homography::estimate(&src[..3], &src[..3]).is_none());
    }
}
