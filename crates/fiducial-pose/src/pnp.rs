//! Iterative perspective-n-point solver.
//!
//! The initial pose comes from a plane homography (coplanar points) or a
//! linear DLT (general points, `n >= 6`), and is refined with
//! Levenberg–Marquardt on the pixel reprojection error through the full
//! lens model.

use crate::error::PoseError;
use fiducial_pose_core::{rotation_from_vector, vector_from_rotation, CameraModel, Homography};
use nalgebra::{
    DMatrix, Matrix3, Matrix3x4, Point2, Point3, Rotation3, SMatrix, SVector, Vector3, Vector6,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Refinement settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PnpOptions {
    pub max_iterations: usize,
    /// Poses with a larger RMS reprojection error (pixels) are rejected.
    pub max_reprojection_rms: f64,
}

impl Default for PnpOptions {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            max_reprojection_rms: 10.0,
        }
    }
}

/// World-to-camera transform: `X_cam = R(rvec)·X_world + tvec`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PnpSolution {
    pub rvec: Vector3<f64>,
    pub tvec: Vector3<f64>,
    /// RMS reprojection error in pixels.
    pub rms: f64,
    pub iterations: usize,
}

const PLANAR_RATIO: f64 = 1e-9;
const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_UP: f64 = 10.0;
const LAMBDA_DOWN: f64 = 0.1;
const LAMBDA_MIN: f64 = 1e-10;
const LAMBDA_MAX: f64 = 1e10;

/// Solve for the pose mapping `world` points onto their pixel observations.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all, fields(n = world.len())))]
pub fn solve_pnp(
    world: &[Point3<f64>],
    image: &[Point2<f64>],
    camera: &CameraModel,
    opts: &PnpOptions,
) -> Result<PnpSolution, PoseError> {
    if world.len() != image.len() {
        return Err(PoseError::MismatchedPoints {
            image: image.len(),
            world: world.len(),
        });
    }
    if world.len() < 4 {
        return Err(PoseError::NotEnoughPoints(world.len()));
    }

    let normalized = image
        .iter()
        .map(|&p| camera.undistort(p))
        .collect::<Option<Vec<_>>>()
        .ok_or(PoseError::NotConverged("undistortion failed"))?;

    let (r0, t0) = initial_pose(world, &normalized)
        .ok_or(PoseError::NotConverged("degenerate initial guess"))?;
    let init = params_from(&r0, &t0);

    let (params, cost, iterations) = refine(world, image, camera, init, opts.max_iterations)?;
    let rms = (cost / world.len() as f64).sqrt();
    if !rms.is_finite() || !params.iter().all(|v| v.is_finite()) {
        return Err(PoseError::NotConverged("non-finite pose"));
    }
    if rms > opts.max_reprojection_rms {
        log::debug!("pnp rejected: rms {rms:.3} px");
        return Err(PoseError::NotConverged("reprojection error above limit"));
    }

    Ok(PnpSolution {
        rvec: Vector3::new(params[0], params[1], params[2]),
        tvec: Vector3::new(params[3], params[4], params[5]),
        rms,
        iterations,
    })
}

fn params_from(r: &Rotation3<f64>, t: &Vector3<f64>) -> Vector6<f64> {
    let rv = vector_from_rotation(r);
    Vector6::new(rv.x, rv.y, rv.z, t.x, t.y, t.z)
}

fn split(p: &Vector6<f64>) -> (Rotation3<f64>, Vector3<f64>) {
    let r = rotation_from_vector(&Vector3::new(p[0], p[1], p[2]));
    (r, Vector3::new(p[3], p[4], p[5]))
}

/// Initial world-to-camera pose from normalized image coordinates.
fn initial_pose(
    world: &[Point3<f64>],
    normalized: &[Point2<f64>],
) -> Option<(Rotation3<f64>, Vector3<f64>)> {
    let frame = PlaneFrame::fit(world)?;
    if frame.is_planar || world.len() < 6 {
        return planar_pose(world, normalized, &frame);
    }
    dlt_pose(world, normalized).or_else(|| planar_pose(world, normalized, &frame))
}

/// Best-fit plane of a point set: centroid plus a right-handed basis whose
/// third axis is the plane normal.
struct PlaneFrame {
    centroid: Vector3<f64>,
    basis: Matrix3<f64>,
    is_planar: bool,
}

impl PlaneFrame {
    fn fit(world: &[Point3<f64>]) -> Option<Self> {
        let n = world.len() as f64;
        let centroid = world.iter().map(|p| p.coords).sum::<Vector3<f64>>() / n;
        let mut scatter = Matrix3::zeros();
        for p in world {
            let d = p.coords - centroid;
            scatter += d * d.transpose();
        }

        let eig = scatter.symmetric_eigen();
        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| eig.eigenvalues[b].total_cmp(&eig.eigenvalues[a]));
        let largest = eig.eigenvalues[order[0]];
        if largest.is_nan() || largest <= 0.0 {
            return None;
        }

        let e1 = eig.eigenvectors.column(order[0]).normalize();
        let e2 = eig.eigenvectors.column(order[1]).normalize();
        let normal = e1.cross(&e2);
        if normal.norm() < 0.5 {
            return None;
        }
        let basis = Matrix3::from_columns(&[e1, e2, normal]);

        Some(Self {
            centroid,
            basis,
            is_planar: eig.eigenvalues[order[2]] <= PLANAR_RATIO * largest,
        })
    }
}

/// Pose from the homography between plane coordinates and the normalized
/// image plane.
fn planar_pose(
    world: &[Point3<f64>],
    normalized: &[Point2<f64>],
    frame: &PlaneFrame,
) -> Option<(Rotation3<f64>, Vector3<f64>)> {
    let bt = frame.basis.transpose();
    let plane: Vec<Point2<f64>> = world
        .iter()
        .map(|p| {
            let q = bt * (p.coords - frame.centroid);
            Point2::new(q.x, q.y)
        })
        .collect();
    let h = Homography::estimate(&plane, normalized)?.h;

    let h1 = h.column(0).into_owned();
    let h2 = h.column(1).into_owned();
    let h3 = h.column(2).into_owned();
    let denom = 0.5 * (h1.norm() + h2.norm());
    if denom <= 1e-12 {
        return None;
    }
    let lambda = 1.0 / denom;
    let mut r1 = h1 * lambda;
    let mut r2 = h2 * lambda;
    let mut t = h3 * lambda;
    if t.z < 0.0 {
        r1 = -r1;
        r2 = -r2;
        t = -t;
    }
    let r3 = r1.cross(&r2);
    if r3.norm() <= 1e-12 {
        return None;
    }

    let r_plane = project_to_so3(&Matrix3::from_columns(&[r1, r2, r3]))?;
    // X_cam = R_p·Bᵀ·(X - c) + t_p
    let r = r_plane * bt;
    let t = t - r * frame.centroid;
    Some((Rotation3::from_matrix_unchecked(r), t))
}

/// Linear pose from the 3×4 projection matrix in normalized coordinates.
fn dlt_pose(
    world: &[Point3<f64>],
    normalized: &[Point2<f64>],
) -> Option<(Rotation3<f64>, Vector3<f64>)> {
    let n = world.len();
    let mut a = DMatrix::<f64>::zeros(2 * n, 12);
    for (i, (pw, pi)) in world.iter().zip(normalized).enumerate() {
        let (x, y, z) = (pw.x, pw.y, pw.z);
        let (u, v) = (pi.x, pi.y);
        let (r0, r1) = (2 * i, 2 * i + 1);

        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = z;
        a[(r0, 3)] = 1.0;
        a[(r0, 8)] = -u * x;
        a[(r0, 9)] = -u * y;
        a[(r0, 10)] = -u * z;
        a[(r0, 11)] = -u;

        a[(r1, 4)] = x;
        a[(r1, 5)] = y;
        a[(r1, 6)] = z;
        a[(r1, 7)] = 1.0;
        a[(r1, 8)] = -v * x;
        a[(r1, 9)] = -v * y;
        a[(r1, 10)] = -v * z;
        a[(r1, 11)] = -v;
    }

    let ata = a.transpose() * &a;
    let eig = ata.symmetric_eigen();
    let (min_idx, _) = eig
        .eigenvalues
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    let p_vec = eig.eigenvectors.column(min_idx);

    let mut p = Matrix3x4::<f64>::zeros();
    for r in 0..3 {
        for c in 0..4 {
            p[(r, c)] = p_vec[4 * r + c];
        }
    }

    // The null vector has arbitrary sign; points must end up in front.
    let in_front = world
        .iter()
        .filter(|pw| p.row(2).dot(&pw.to_homogeneous().transpose()) > 0.0)
        .count();
    if 2 * in_front < n {
        p = -p;
    }

    let m = p.fixed_view::<3, 3>(0, 0).into_owned();
    let s = (m.row(0).norm() + m.row(1).norm() + m.row(2).norm()) / 3.0;
    if s <= 1e-12 {
        return None;
    }
    let r = project_to_so3(&(m / s))?;
    let t = p.column(3).into_owned() / s;
    Some((Rotation3::from_matrix_unchecked(r), t))
}

/// Nearest rotation matrix (polar decomposition), `det = +1`.
fn project_to_so3(m: &Matrix3<f64>) -> Option<Matrix3<f64>> {
    let svd = m.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let r = u * v_t;
    if r.determinant() >= 0.0 {
        return Some(r);
    }
    let mut u_flipped = u;
    u_flipped.column_mut(2).neg_mut();
    Some(u_flipped * v_t)
}

fn residuals(
    world: &[Point3<f64>],
    image: &[Point2<f64>],
    camera: &CameraModel,
    params: &Vector6<f64>,
) -> Option<Vec<f64>> {
    let (r, t) = split(params);
    let mut out = Vec::with_capacity(2 * world.len());
    for (pw, pi) in world.iter().zip(image) {
        let pc = r * pw.coords + t;
        let uv = camera.project(&pc)?;
        out.push(uv.x - pi.x);
        out.push(uv.y - pi.y);
    }
    Some(out)
}

fn cost_of(res: &[f64]) -> f64 {
    res.iter().map(|r| r * r).sum()
}

/// Levenberg–Marquardt with a central-difference Jacobian.
///
/// Returns the refined parameters, the final sum of squared residuals and
/// the number of iterations run.
fn refine(
    world: &[Point3<f64>],
    image: &[Point2<f64>],
    camera: &CameraModel,
    init: Vector6<f64>,
    max_iterations: usize,
) -> Result<(Vector6<f64>, f64, usize), PoseError> {
    let mut params = init;
    let mut res = residuals(world, image, camera, &params)
        .ok_or(PoseError::NotConverged("initial guess puts points behind the camera"))?;
    let mut cost = cost_of(&res);
    let mut lambda = LAMBDA_INIT;
    let mut iterations = 0;

    for iter in 0..max_iterations {
        iterations = iter + 1;
        let Some(jac) = jacobian(world, image, camera, &params) else {
            break;
        };

        let mut jtj = SMatrix::<f64, 6, 6>::zeros();
        let mut gradient = SVector::<f64, 6>::zeros();
        for (row, r) in jac.iter().zip(&res) {
            jtj += row * row.transpose();
            gradient += row * *r;
        }

        let mut improved = false;
        while lambda <= LAMBDA_MAX {
            let mut damped = jtj;
            for i in 0..6 {
                damped[(i, i)] += lambda * jtj[(i, i)].max(1e-6);
            }
            let Some(delta) = damped.lu().solve(&(-gradient)) else {
                lambda *= LAMBDA_UP;
                continue;
            };

            let candidate = params + delta;
            let trial = residuals(world, image, camera, &candidate);
            match trial {
                Some(new_res) if cost_of(&new_res) < cost => {
                    let new_cost = cost_of(&new_res);
                    let step = delta.norm();
                    let gain = cost - new_cost;
                    params = candidate;
                    res = new_res;
                    cost = new_cost;
                    lambda = (lambda * LAMBDA_DOWN).max(LAMBDA_MIN);
                    improved = step > 1e-12 && gain > 1e-14 * cost.max(1e-30);
                    break;
                }
                _ => lambda *= LAMBDA_UP,
            }
        }

        if !improved {
            break;
        }
    }

    Ok((params, cost, iterations))
}

/// Rows of the residual Jacobian, one 6-vector per residual.
fn jacobian(
    world: &[Point3<f64>],
    image: &[Point2<f64>],
    camera: &CameraModel,
    params: &Vector6<f64>,
) -> Option<Vec<Vector6<f64>>> {
    let mut rows = vec![Vector6::zeros(); 2 * world.len()];
    for k in 0..6 {
        let h = 1e-7 * params[k].abs().max(1.0);
        let mut plus = *params;
        let mut minus = *params;
        plus[k] += h;
        minus[k] -= h;
        let rp = residuals(world, image, camera, &plus)?;
        let rm = residuals(world, image, camera, &minus)?;
        for (row, (a, b)) in rows.iter_mut().zip(rp.iter().zip(&rm)) {
            row[k] = (a - b) / (2.0 * h);
        }
    }
    Some(rows)
}
