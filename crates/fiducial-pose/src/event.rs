//! Inputs consumed by the localizer, in arrival order.

use crate::frame::Frame;
use crate::registry::RegistryCommand;
use serde::{Deserialize, Serialize};

/// Camera calibration as delivered by the calibration source.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Row-major 3×3 intrinsics.
    pub k: [f64; 9],
    /// `[k1, k2, p1, p2, k3]`.
    pub d: [f64; 5],
}

/// Detector parameter exposed to manual tuning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tunable {
    CosineLimit,
    BlockSize,
    PolyError,
    MinArea,
}

impl Tunable {
    /// Increment applied per step.
    pub fn step(self) -> f64 {
        match self {
            Tunable::CosineLimit => 0.05,
            Tunable::BlockSize => 2.0,
            Tunable::PolyError => 0.005,
            Tunable::MinArea => 50.0,
        }
    }
}

/// Manual change of one detector parameter by a number of steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorAdjustment {
    pub parameter: Tunable,
    pub steps: i32,
}

impl DetectorAdjustment {
    pub fn new(parameter: Tunable, steps: i32) -> Self {
        Self { parameter, steps }
    }

    /// Debug-view key bindings: `q/a` cosine, `w/s` block, `r/f` poly, `e/d` area.
    pub fn from_key(key: char) -> Option<Self> {
        let (parameter, steps) = match key {
            'q' => (Tunable::CosineLimit, 1),
            'a' => (Tunable::CosineLimit, -1),
            'w' => (Tunable::BlockSize, 1),
            's' => (Tunable::BlockSize, -1),
            'r' => (Tunable::PolyError, 1),
            'f' => (Tunable::PolyError, -1),
            'e' => (Tunable::MinArea, 1),
            'd' => (Tunable::MinArea, -1),
            _ => return None,
        };
        Some(Self::new(parameter, steps))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Frame(Frame),
    Calibration(Calibration),
    Registry(RegistryCommand),
    Adjust(DetectorAdjustment),
}

impl From<Frame> for Event {
    fn from(frame: Frame) -> Self {
        Event::Frame(frame)
    }
}

impl From<Calibration> for Event {
    fn from(calibration: Calibration) -> Self {
        Event::Calibration(calibration)
    }
}

impl From<RegistryCommand> for Event {
    fn from(command: RegistryCommand) -> Self {
        Event::Registry(command)
    }
}

impl From<DetectorAdjustment> for Event {
    fn from(adjustment: DetectorAdjustment) -> Self {
        Event::Adjust(adjustment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_bindings() {
        assert_eq!(
            DetectorAdjustment::from_key('w'),
            Some(DetectorAdjustment::new(Tunable::BlockSize, 1))
        );
        assert_eq!(
            DetectorAdjustment::from_key('d'),
            Some(DetectorAdjustment::new(Tunable::MinArea, -1))
        );
        assert_eq!(DetectorAdjustment::from_key('x'), None);
    }
}
