//! Square fiducial marker detection.
//!
//! This crate turns a grayscale frame into decoded marker candidates:
//! - adaptive mean binarization and outer contour tracing,
//! - Douglas–Peucker simplification with convexity, angle and area filters,
//! - corner refinement on the grayscale image,
//! - bit decoding against a packed-code dictionary (built-in `ARUCO_ORIGINAL`),
//! - a block-size controller that retunes the binarization when a frame
//!   yields nothing.
//!
//! It knows nothing about marker placement or camera pose; see the
//! `fiducial-pose` crate for that.

mod block_size;
pub mod builtins;
mod contour;
mod decode;
mod detector;
mod dictionary;
mod matcher;
pub mod polygon;
mod refine;
pub mod render;
pub mod threshold;

pub use block_size::{BlockSizeController, BlockSizeError};
pub use contour::find_outer_contours;
pub use decode::{DecodeConfig, DecodedMarker, DictionaryDecoder, MarkerDecoder};
pub use detector::{CandidateDetector, DetectParams, MarkerCandidate, Quad, QuadDetector};
pub use dictionary::Dictionary;
pub use matcher::{rotate_code, Match, Matcher};
pub use refine::{refine_corner, refine_corners};
