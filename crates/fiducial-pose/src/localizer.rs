//! Event dispatcher: frames in, pose signals out.

use crate::config::LocalizerConfig;
use crate::error::{ConfigError, FrameError, PoseError};
use crate::event::{Calibration, DetectorAdjustment, Event, Tunable};
use crate::frame::Frame;
use crate::pose::{solve_pose, CameraPose, Correspondences, PoseStamped};
use crate::registry::{MarkerRegistry, RegistryCommand};
use crate::sink::ResultSink;
use fiducial_pose_aruco::builtins::aruco_original;
use fiducial_pose_aruco::{
    BlockSizeController, CandidateDetector, DetectParams, DictionaryDecoder, QuadDetector,
};
use fiducial_pose_core::{CameraModel, GrayImageView};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// A frame that produced a pose.
#[derive(Clone, Debug, PartialEq)]
pub struct LocatedPose {
    /// Camera in world, in the configured convention.
    pub camera: CameraPose,
    pub stamped: PoseStamped,
    /// Ids of the registered markers that contributed.
    pub markers: Vec<u32>,
    /// Reprojection RMS in pixels.
    pub rms: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NotVisibleReason {
    /// The detector returned nothing.
    NoCandidates,
    /// Markers were decoded but none is registered.
    NoKnownMarkers,
    SolverFailed(PoseError),
}

/// Result of processing one frame.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameOutcome {
    Located(LocatedPose),
    NotVisible(NotVisibleReason),
    /// The frame could not be read; nothing was published.
    Skipped(FrameError),
}

impl FrameOutcome {
    #[inline]
    pub fn is_located(&self) -> bool {
        matches!(self, FrameOutcome::Located(_))
    }
}

/// Mutable state shared by all events.
#[derive(Clone, Debug)]
struct State {
    registry: MarkerRegistry,
    camera: CameraModel,
    calibrated: bool,
    threshold: BlockSizeController,
    /// Tunable detector parameters; `block_size` is taken from `threshold`.
    params: DetectParams,
}

/// Single-threaded localization pipeline.
///
/// Every event runs to completion before the next one is handled.
pub struct Localizer<Det = QuadDetector<DictionaryDecoder>> {
    detector: Det,
    config: LocalizerConfig,
    state: State,
}

impl Localizer {
    /// Pipeline with the built-in original ArUco dictionary.
    pub fn new(config: LocalizerConfig) -> Result<Self, ConfigError> {
        let detector = QuadDetector::for_dictionary(aruco_original(), config.max_hamming);
        Self::with_detector(config, detector)
    }
}

impl<Det: CandidateDetector> Localizer<Det> {
    /// Build the pipeline state from `config`: threshold bounds, inline
    /// calibration and static markers.
    pub fn with_detector(config: LocalizerConfig, detector: Det) -> Result<Self, ConfigError> {
        let threshold = config.block_size_controller()?;
        let params = config.detect_params(threshold.current());

        let mut state = State {
            registry: MarkerRegistry::new(),
            camera: CameraModel::default(),
            calibrated: false,
            threshold,
            params,
        };

        if let Some(camera) = config.camera_model()? {
            state.camera = camera;
            state.calibrated = true;
            log::info!("using inline calibration");
        }

        let convention = config.convention();
        for m in config.static_markers()? {
            state
                .registry
                .register(m.id, m.size, m.position, m.orientation, convention);
        }

        if config.debug {
            for info in state.registry.iter() {
                log::info!(
                    "marker {}: size {} position {:?} orientation {:?}",
                    info.id,
                    info.size,
                    info.position.as_slice(),
                    info.orientation.as_slice()
                );
            }
        }

        Ok(Self {
            detector,
            config,
            state,
        })
    }

    #[inline]
    pub fn config(&self) -> &LocalizerConfig {
        &self.config
    }

    #[inline]
    pub fn registry(&self) -> &MarkerRegistry {
        &self.state.registry
    }

    #[inline]
    pub fn camera(&self) -> &CameraModel {
        &self.state.camera
    }

    #[inline]
    pub fn is_calibrated(&self) -> bool {
        self.state.calibrated
    }

    #[inline]
    pub fn block_size(&self) -> u32 {
        self.state.threshold.current()
    }

    /// Parameters the next frame will be detected with.
    pub fn detect_params(&self) -> DetectParams {
        DetectParams {
            block_size: self.state.threshold.current(),
            ..self.state.params.clone()
        }
    }

    #[inline]
    pub fn detector(&self) -> &Det {
        &self.detector
    }

    /// Dispatch one event. Returns the outcome for frame events.
    pub fn handle<S: ResultSink>(&mut self, event: Event, sink: &mut S) -> Option<FrameOutcome> {
        match event {
            Event::Frame(frame) => Some(self.process_frame(&frame, sink)),
            Event::Calibration(cal) => {
                self.calibrate(&cal);
                None
            }
            Event::Registry(cmd) => {
                self.apply_command(cmd);
                None
            }
            Event::Adjust(adj) => {
                self.adjust(adj);
                None
            }
        }
    }

    /// Latch the first valid calibration. Returns whether it was applied.
    pub fn calibrate(&mut self, cal: &Calibration) -> bool {
        if self.state.calibrated {
            log::trace!("calibration already latched, ignoring");
            return false;
        }
        match CameraModel::new(cal.k, cal.d) {
            Ok(camera) => {
                self.state.camera = camera;
                self.state.calibrated = true;
                if self.config.debug {
                    log::info!("camera calibration received: k {:?} d {:?}", cal.k, cal.d);
                } else {
                    log::debug!("camera calibration received");
                }
                true
            }
            Err(err) => {
                log::warn!("ignoring calibration: {err}");
                false
            }
        }
    }

    pub fn apply_command(&mut self, cmd: RegistryCommand) {
        self.state.registry.apply(cmd, self.config.convention());
    }

    /// Manual tuning step.
    pub fn adjust(&mut self, adj: DetectorAdjustment) {
        let delta = adj.parameter.step() * adj.steps as f64;
        let params = &mut self.state.params;
        match adj.parameter {
            Tunable::CosineLimit => {
                params.cosine_limit = (params.cosine_limit + delta).clamp(0.0, 1.0);
            }
            Tunable::BlockSize => {
                self.state.threshold.nudge(adj.steps);
            }
            Tunable::PolyError => {
                params.max_poly_error = (params.max_poly_error + delta).max(0.0);
            }
            Tunable::MinArea => {
                params.min_area = (params.min_area + delta).max(0.0);
            }
        }
        let p = self.detect_params();
        log::debug!(
            "detector tuned: cosine {:.2} block {} poly {:.3} area {}",
            p.cosine_limit,
            p.block_size,
            p.max_poly_error,
            p.min_area
        );
    }

    /// Run one frame through detection and pose solving and publish the result.
    pub fn process_frame<S: ResultSink>(&mut self, frame: &Frame, sink: &mut S) -> FrameOutcome {
        let gray = match frame.to_gray() {
            Ok(gray) => gray,
            Err(err) => {
                log::warn!("skipping frame: {err}");
                return FrameOutcome::Skipped(err);
            }
        };
        self.process_gray(&gray.view(), frame.stamp, sink)
    }

    /// [`Localizer::process_frame`] on an already converted grayscale image.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self, img, sink), fields(w = img.width, h = img.height)))]
    pub fn process_gray<S: ResultSink>(
        &mut self,
        img: &GrayImageView<'_>,
        stamp: Option<f64>,
        sink: &mut S,
    ) -> FrameOutcome {
        let outcome = self.locate(img, stamp);
        match &outcome {
            FrameOutcome::Located(located) => {
                sink.position_rotation(located.camera.position, located.camera.rotation);
                sink.pose(located.stamped.clone());
                sink.visible(true);
            }
            FrameOutcome::NotVisible(reason) => {
                log::debug!("not visible: {reason:?}");
                sink.visible(false);
            }
            FrameOutcome::Skipped(_) => {}
        }
        outcome
    }

    fn locate(&mut self, img: &GrayImageView<'_>, stamp: Option<f64>) -> FrameOutcome {
        let params = self.detect_params();
        let candidates = self.detector.detect(img, &params);
        self.state.threshold.observe(candidates.len());
        if candidates.is_empty() {
            return FrameOutcome::NotVisible(NotVisibleReason::NoCandidates);
        }

        let points = Correspondences::from_candidates(&candidates, &self.state.registry);
        if points.is_empty() {
            return FrameOutcome::NotVisible(NotVisibleReason::NoKnownMarkers);
        }

        let solved = match solve_pose(
            &points,
            &self.state.camera,
            &self.config.pnp_options(),
            self.config.convention(),
        ) {
            Ok(solved) => solved,
            Err(err) => {
                return FrameOutcome::NotVisible(NotVisibleReason::SolverFailed(err));
            }
        };

        log::debug!(
            "pose from {} marker(s), rms {:.3}px",
            points.markers().len(),
            solved.world_to_camera.rms
        );
        FrameOutcome::Located(LocatedPose {
            camera: solved.camera,
            stamped: PoseStamped::new(&solved.camera, stamp, self.config.frame_id.as_str()),
            markers: points.markers().to_vec(),
            rms: solved.world_to_camera.rms,
        })
    }
}
