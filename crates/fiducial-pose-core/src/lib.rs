//! Core types for fiducial marker localization.
//!
//! This crate is small and purely geometric: grayscale buffers, homographies,
//! rotation representations, axis conventions and the camera model. It knows
//! nothing about marker dictionaries or the localization pipeline.

mod camera;
mod convention;
mod homography;
mod image;
mod logger;
mod rotation;

pub use camera::{CameraError, CameraModel};
pub use convention::{robot_to_vision, vision_to_robot, AxisConvention};
pub use homography::Homography;
pub use image::{
    gray_from_interleaved, sample_mean_3x3, GrayImage, GrayImageView, ImageError, PixelFormat,
};
pub use rotation::{
    invert_rigid, rotation_from_euler, rotation_from_vector, vector_from_rotation, Quaternion,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, parse_level, UnknownLevel};
