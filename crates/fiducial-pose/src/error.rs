//! Error types of the localization pipeline.

use fiducial_pose_core::{CameraError, ImageError};

/// A frame that cannot be turned into a grayscale image.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    #[error(transparent)]
    Image(#[from] ImageError),
}

/// Reasons the pose solver produced no pose.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PoseError {
    #[error("need at least 4 correspondences, got {0}")]
    NotEnoughPoints(usize),
    #[error("mismatched correspondences: {image} image points, {world} world points")]
    MismatchedPoints { image: usize, world: usize },
    #[error("pose solver did not converge: {0}")]
    NotConverged(&'static str),
}

/// Errors raised while loading or applying a configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("field {index} of {field:?} is not a number: {value:?}")]
    BadNumber {
        field: &'static str,
        index: usize,
        value: String,
    },
    #[error("{field:?} needs {expected} fields, got {got}")]
    FieldCount {
        field: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("invalid marker id {0:?}")]
    BadMarkerId(String),
    #[error(transparent)]
    BlockSize(#[from] fiducial_pose_aruco::BlockSizeError),
    #[error(transparent)]
    Camera(#[from] CameraError),
}
