//! Result signals published per processed frame.

use crate::pose::PoseStamped;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Receiver of the three per-frame outputs.
///
/// `position_rotation` and `pose` are only called for located frames;
/// `visible` is called for every frame that was not skipped.
pub trait ResultSink {
    fn visible(&mut self, visible: bool);
    fn position_rotation(&mut self, position: Vector3<f64>, rotation: Vector3<f64>);
    fn pose(&mut self, pose: PoseStamped);
}

impl<S: ResultSink + ?Sized> ResultSink for &mut S {
    fn visible(&mut self, visible: bool) {
        (**self).visible(visible);
    }

    fn position_rotation(&mut self, position: Vector3<f64>, rotation: Vector3<f64>) {
        (**self).position_rotation(position, rotation);
    }

    fn pose(&mut self, pose: PoseStamped) {
        (**self).pose(pose);
    }
}

/// One published output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum Signal {
    Visible {
        visible: bool,
    },
    PositionRotation {
        position: [f64; 3],
        rotation: [f64; 3],
    },
    Pose {
        pose: PoseStamped,
    },
}

/// Sink that keeps every signal in order.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    pub signals: Vec<Signal>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the recorded signals.
    pub fn take(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.signals)
    }

    /// Value of the most recent `visible` signal.
    pub fn last_visible(&self) -> Option<bool> {
        self.signals.iter().rev().find_map(|s| match s {
            Signal::Visible { visible } => Some(*visible),
            _ => None,
        })
    }

    pub fn poses(&self) -> impl Iterator<Item = &PoseStamped> {
        self.signals.iter().filter_map(|s| match s {
            Signal::Pose { pose } => Some(pose),
            _ => None,
        })
    }
}

impl ResultSink for RecordingSink {
    fn visible(&mut self, visible: bool) {
        self.signals.push(Signal::Visible { visible });
    }

    fn position_rotation(&mut self, position: Vector3<f64>, rotation: Vector3<f64>) {
        self.signals.push(Signal::PositionRotation {
            position: position.into(),
            rotation: rotation.into(),
        });
    }

    fn pose(&mut self, pose: PoseStamped) {
        self.signals.push(Signal::Pose { pose });
    }
}
