//! Marker correspondences to camera-in-world pose.

use crate::error::PoseError;
use crate::pnp::{solve_pnp, PnpOptions, PnpSolution};
use crate::registry::{MarkerInfo, MarkerRegistry};
use fiducial_pose_aruco::MarkerCandidate;
use fiducial_pose_core::{invert_rigid, AxisConvention, CameraModel, Quaternion};
use nalgebra::{Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Parallel image/world point lists, four points per matched marker.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Correspondences {
    image: Vec<Point2<f64>>,
    world: Vec<Point3<f64>>,
    markers: Vec<u32>,
}

impl Correspondences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair every candidate with its registry entry; unknown ids are skipped.
    pub fn from_candidates(candidates: &[MarkerCandidate], registry: &MarkerRegistry) -> Self {
        let mut out = Self::new();
        for cand in candidates {
            match registry.lookup(cand.id) {
                Some(info) => out.push_marker(&cand.corners, info),
                None => log::trace!("marker {} is not registered", cand.id),
            }
        }
        out
    }

    /// Add the four corners of one matched marker.
    pub fn push_marker(&mut self, corners: &[Point2<f64>; 4], info: &MarkerInfo) {
        self.image.extend_from_slice(corners);
        self.world.extend_from_slice(&info.world);
        self.markers.push(info.id);
    }

    #[inline]
    pub fn image(&self) -> &[Point2<f64>] {
        &self.image
    }

    #[inline]
    pub fn world(&self) -> &[Point3<f64>] {
        &self.world
    }

    /// Ids of the matched markers, in insertion order.
    #[inline]
    pub fn markers(&self) -> &[u32] {
        &self.markers
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.image.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
    }
}

/// Camera position and orientation in world axes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: Vector3<f64>,
    /// Axis-angle vector.
    pub rotation: Vector3<f64>,
}

impl CameraPose {
    #[inline]
    pub fn quaternion(&self) -> Quaternion {
        Quaternion::from_rotation_vector(&self.rotation)
    }

    /// Express a vision-frame pose in `convention` axes.
    pub fn in_convention(&self, convention: AxisConvention) -> Self {
        Self {
            position: convention.from_vision(&self.position),
            rotation: convention.from_vision(&self.rotation),
        }
    }
}

/// Pose solver output.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolvedPose {
    /// Camera in world, in the requested convention.
    pub camera: CameraPose,
    /// World-to-camera transform in vision axes.
    pub world_to_camera: PnpSolution,
}

/// Solve the camera pose from marker correspondences.
///
/// Lists must have the same length, a multiple of 4 and at least 4.
pub fn solve_pose(
    points: &Correspondences,
    camera: &CameraModel,
    opts: &PnpOptions,
    convention: AxisConvention,
) -> Result<SolvedPose, PoseError> {
    solve_pose_raw(points.image(), points.world(), camera, opts, convention)
}

/// [`solve_pose`] on raw parallel slices.
pub fn solve_pose_raw(
    image: &[Point2<f64>],
    world: &[Point3<f64>],
    camera: &CameraModel,
    opts: &PnpOptions,
    convention: AxisConvention,
) -> Result<SolvedPose, PoseError> {
    if image.len() == world.len() && image.len() < 4 {
        return Err(PoseError::NotEnoughPoints(image.len()));
    }
    if image.len() != world.len() || image.len() % 4 != 0 {
        return Err(PoseError::MismatchedPoints {
            image: image.len(),
            world: world.len(),
        });
    }

    let sol = solve_pnp(world, image, camera, opts)?;
    let (rotation, position) = invert_rigid(&sol.rvec, &sol.tvec);
    let camera_pose = CameraPose { position, rotation }.in_convention(convention);

    Ok(SolvedPose {
        camera: camera_pose,
        world_to_camera: sol,
    })
}

/// Timestamped pose as published to consumers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseStamped {
    pub position: [f64; 3],
    pub orientation: Quaternion,
    /// Frame timestamp in seconds, when the source provided one.
    pub stamp: Option<f64>,
    pub frame_id: String,
}

impl PoseStamped {
    pub fn new(pose: &CameraPose, stamp: Option<f64>, frame_id: impl Into<String>) -> Self {
        Self {
            position: pose.position.into(),
            orientation: pose.quaternion(),
            stamp,
            frame_id: frame_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fiducial_pose_core::rotation_from_vector;
    use nalgebra::Rotation3;

    fn observe(
        cam: &CameraModel,
        r: &Rotation3<f64>,
        t: &Vector3<f64>,
        info: &MarkerInfo,
    ) -> [Point2<f64>; 4] {
        info.world.map(|p| cam.project(&(r * p.coords + t)).unwrap())
    }

    #[test]
    fn camera_in_front_of_marker() {
        let cam = CameraModel::default();
        let info = MarkerInfo::new(3, 0.1, Vector3::zeros(), Vector3::zeros());
        // Camera half a metre behind the marker plane, looking along +z.
        let r = Rotation3::identity();
        let t = Vector3::new(0.0, 0.0, 0.5);
        let mut points = Correspondences::new();
        points.push_marker(&observe(&cam, &r, &t, &info), &info);

        let opts = PnpOptions::default();
        let vision = solve_pose(&points, &cam, &opts, AxisConvention::Vision).unwrap();
        assert_relative_eq!(vision.camera.position, Vector3::new(0.0, 0.0, -0.5), epsilon = 1e-6);
        assert_relative_eq!(vision.camera.rotation.norm(), 0.0, epsilon = 1e-6);

        let robot = solve_pose(&points, &cam, &opts, AxisConvention::Robot).unwrap();
        assert_relative_eq!(robot.camera.position, Vector3::new(-0.5, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn inverted_rotation_maps_camera_axes_to_world() {
        let cam = CameraModel::default();
        let info = MarkerInfo::new(1, 0.2, Vector3::new(0.1, 0.0, 1.0), Vector3::zeros());
        let r = Rotation3::from_euler_angles(0.1, 0.2, -0.15);
        let t = Vector3::new(0.02, 0.01, 0.3);
        let mut points = Correspondences::new();
        points.push_marker(&observe(&cam, &r, &t, &info), &info);

        let solved = solve_pose(&points, &cam, &PnpOptions::default(), AxisConvention::Vision)
            .unwrap();
        let r_cw = rotation_from_vector(&solved.camera.rotation);
        assert_relative_eq!(r_cw, r.inverse(), epsilon = 1e-6);
        assert_relative_eq!(solved.camera.position, -(r.inverse() * t), epsilon = 1e-6);
    }

    #[test]
    fn point_count_rules() {
        let cam = CameraModel::default();
        let opts = PnpOptions::default();
        let conv = AxisConvention::Robot;
        let p2 = vec![Point2::origin(); 5];
        let p3 = vec![Point3::origin(); 5];
        assert_eq!(
            solve_pose_raw(&[], &[], &cam, &opts, conv),
            Err(PoseError::NotEnoughPoints(0))
        );
        assert_eq!(
            solve_pose_raw(&p2, &p3, &cam, &opts, conv),
            Err(PoseError::MismatchedPoints { image: 5, world: 5 })
        );
        assert_eq!(
            solve_pose_raw(&p2[..4], &p3, &cam, &opts, conv),
            Err(PoseError::MismatchedPoints { image: 4, world: 5 })
        );
    }

    #[test]
    fn unknown_candidates_are_skipped() {
        let mut registry = MarkerRegistry::new();
        registry.insert(MarkerInfo::new(3, 0.1, Vector3::zeros(), Vector3::zeros()));
        let cand = |id| MarkerCandidate {
            id,
            corners: [Point2::origin(); 4],
            rotation: 0,
            hamming: 0,
            border_score: 1.0,
            area: 400.0,
        };
        let points = Correspondences::from_candidates(&[cand(3), cand(4)], &registry);
        assert_eq!(points.len(), 4);
        assert_eq!(points.markers(), &[3]);
    }

    #[test]
    fn stamped_pose_carries_quaternion() {
        let pose = CameraPose {
            position: Vector3::new(1.0, 2.0, 3.0),
            rotation: Vector3::zeros(),
        };
        let stamped = PoseStamped::new(&pose, Some(12.5), "aruco");
        assert_eq!(stamped.orientation, Quaternion::IDENTITY);
        assert_eq!(stamped.position, [1.0, 2.0, 3.0]);
        assert_eq!(stamped.frame_id, "aruco");
    }
}
