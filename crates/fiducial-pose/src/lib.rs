//! Camera localization from square fiducial markers with known placement.
//!
//! This is the facade crate of the workspace. It provides:
//! - re-exports of the detector (`fiducial_pose::aruco`) and geometry
//!   (`fiducial_pose::core`) crates,
//! - a marker registry with world-frame corners,
//! - a PnP solver and the camera-in-world pose conversion,
//! - the [`Localizer`] event dispatcher that turns frames, calibration and
//!   registry commands into result signals,
//! - (feature `image`) helpers that read frames from image files.
//!
//! ## Quickstart
//!
//! ```no_run
//! use fiducial_pose::{Frame, Localizer, LocalizerConfig, RecordingSink, RegistryCommand};
//! use fiducial_pose::core::PixelFormat;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut localizer = Localizer::new(LocalizerConfig::default())?;
//! let mut sink = RecordingSink::new();
//!
//! localizer.handle(
//!     RegistryCommand::Register {
//!         id: 3,
//!         size: 0.1,
//!         position: [1.0, 0.0, 0.0],
//!         orientation: [0.0; 3],
//!     }
//!     .into(),
//!     &mut sink,
//! );
//!
//! let frame = Frame::new(640, 480, PixelFormat::Gray8, vec![255; 640 * 480]);
//! localizer.handle(frame.into(), &mut sink);
//! println!("visible: {:?}", sink.last_visible());
//! # Ok(())
//! # }
//! ```
//!
//! ## Coordinate conventions
//!
//! The solver works in vision axes (x right, y down, z forward). Registrations
//! and published poses use robot axes (x forward, y left, z up) unless
//! `use_vision_coords` is set.

pub use fiducial_pose_aruco as aruco;
pub use fiducial_pose_core as core;

mod config;
mod error;
mod event;
mod frame;
mod localizer;
pub mod pnp;
mod pose;
mod registry;
mod sink;

#[cfg(feature = "image")]
pub mod detect;

pub use config::{parse_delimited, LocalizerConfig, StaticMarker};
pub use error::{ConfigError, FrameError, PoseError};
pub use event::{Calibration, DetectorAdjustment, Event, Tunable};
pub use frame::Frame;
pub use localizer::{FrameOutcome, LocatedPose, Localizer, NotVisibleReason};
pub use pnp::{solve_pnp, PnpOptions, PnpSolution};
pub use pose::{solve_pose, solve_pose_raw, CameraPose, Correspondences, PoseStamped, SolvedPose};
pub use registry::{marker_world_corners, MarkerInfo, MarkerRegistry, RegistryCommand};
pub use sink::{RecordingSink, ResultSink, Signal};
