//! Registry of known markers and their world placement.

use fiducial_pose_core::{rotation_from_euler, AxisConvention};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A marker with known size and world pose.
///
/// Position, orientation and corners are stored in the vision frame the
/// solver works in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerInfo {
    pub id: u32,
    /// Edge length, in world units.
    pub size: f64,
    pub position: Vector3<f64>,
    /// Euler angles `(α, β, γ)` about x, y, z, radians.
    pub orientation: Vector3<f64>,
    /// World corners in detector order: TL, TR, BR, BL of the pattern.
    pub world: [Point3<f64>; 4],
}

impl MarkerInfo {
    /// Build an entry from vision-frame placement.
    pub fn new(id: u32, size: f64, position: Vector3<f64>, orientation: Vector3<f64>) -> Self {
        let world = marker_world_corners(size, &position, &orientation);
        Self {
            id,
            size,
            position,
            orientation,
            world,
        }
    }
}

/// World corners of a square marker centred at `position`.
///
/// The marker lies in its local `z = 0` plane with x to the right and y down,
/// so the corners start at `(-s/2, -s/2, 0)` and run clockwise as seen from
/// the camera. They are rotated by `Rz(γ)·Ry(β)·Rx(α)` and then translated.
pub fn marker_world_corners(
    size: f64,
    position: &Vector3<f64>,
    orientation: &Vector3<f64>,
) -> [Point3<f64>; 4] {
    let h = size / 2.0;
    let r = rotation_from_euler(orientation);
    let local = [
        Point3::new(-h, -h, 0.0),
        Point3::new(h, -h, 0.0),
        Point3::new(h, h, 0.0),
        Point3::new(-h, h, 0.0),
    ];
    local.map(|p| r * p + *position)
}

/// Registry mutation delivered by a command source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum RegistryCommand {
    /// Add or replace. Coordinates are in the localizer's input convention.
    Register {
        id: u32,
        size: f64,
        position: [f64; 3],
        orientation: [f64; 3],
    },
    Remove {
        id: u32,
    },
}

/// Known markers keyed by id.
#[derive(Clone, Debug, Default)]
pub struct MarkerRegistry {
    markers: BTreeMap<u32, MarkerInfo>,
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `info`, replacing any entry with the same id.
    pub fn insert(&mut self, info: MarkerInfo) {
        let id = info.id;
        if self.markers.insert(id, info).is_some() {
            log::info!("marker {id} replaced");
        }
        log::info!("marker {id} added");
    }

    /// Register a marker whose placement is given in `convention` axes.
    ///
    /// Position and orientation are converted to the vision frame once, here.
    pub fn register(
        &mut self,
        id: u32,
        size: f64,
        position: Vector3<f64>,
        orientation: Vector3<f64>,
        convention: AxisConvention,
    ) {
        let info = MarkerInfo::new(
            id,
            size,
            convention.to_vision(&position),
            convention.to_vision(&orientation),
        );
        self.insert(info);
    }

    /// Remove `id`; unknown ids are ignored.
    pub fn remove(&mut self, id: u32) -> Option<MarkerInfo> {
        let removed = self.markers.remove(&id);
        if removed.is_some() {
            log::info!("marker {id} removed");
        }
        removed
    }

    pub fn apply(&mut self, command: RegistryCommand, convention: AxisConvention) {
        match command {
            RegistryCommand::Register {
                id,
                size,
                position,
                orientation,
            } => self.register(
                id,
                size,
                Vector3::from(position),
                Vector3::from(orientation),
                convention,
            ),
            RegistryCommand::Remove { id } => {
                self.remove(id);
            }
        }
    }

    #[inline]
    pub fn lookup(&self, id: u32) -> Option<&MarkerInfo> {
        self.markers.get(&id)
    }

    #[inline]
    pub fn contains(&self, id: u32) -> bool {
        self.markers.contains_key(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Entries in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &MarkerInfo> {
        self.markers.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn corners_follow_pattern_order() {
        let c = marker_world_corners(0.2, &Vector3::new(1.0, 2.0, 3.0), &Vector3::zeros());
        assert_relative_eq!(c[0], Point3::new(0.9, 1.9, 3.0), epsilon = 1e-12);
        assert_relative_eq!(c[2], Point3::new(1.1, 2.1, 3.0), epsilon = 1e-12);
        // Clockwise as seen along +z with y down.
        let e1 = c[1] - c[0];
        let e2 = c[3] - c[0];
        assert!(e1.cross(&e2).z > 0.0);
    }

    #[test]
    fn orientation_rotates_about_center() {
        let c = marker_world_corners(2.0, &Vector3::zeros(), &Vector3::new(0.0, 0.0, FRAC_PI_2));
        assert_relative_eq!(c[0], Point3::new(1.0, -1.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(c[1], Point3::new(1.0, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn register_twice_replaces() {
        let mut reg = MarkerRegistry::new();
        reg.register(7, 0.1, Vector3::zeros(), Vector3::zeros(), AxisConvention::Vision);
        reg.register(
            7,
            0.3,
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::zeros(),
            AxisConvention::Vision,
        );
        assert_eq!(reg.len(), 1);
        let m = reg.lookup(7).unwrap();
        assert_eq!(m.size, 0.3);
        assert_eq!(m.position, Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn remove_is_idempotent() {
        let mut reg = MarkerRegistry::new();
        reg.apply(
            RegistryCommand::Register {
                id: 5,
                size: 0.1,
                position: [0.0; 3],
                orientation: [0.0; 3],
            },
            AxisConvention::Robot,
        );
        assert!(reg.remove(5).is_some());
        assert!(reg.remove(5).is_none());
        assert!(reg.is_empty());
        reg.apply(RegistryCommand::Remove { id: 99 }, AxisConvention::Robot);
        assert!(reg.is_empty());
    }

    #[test]
    fn robot_registration_is_stored_in_vision_axes() {
        let mut reg = MarkerRegistry::new();
        // One metre forward in robot axes is +z in vision axes.
        reg.register(
            1,
            0.1,
            Vector3::new(1.0, 0.5, 0.25),
            Vector3::zeros(),
            AxisConvention::Robot,
        );
        assert_eq!(reg.lookup(1).unwrap().position, Vector3::new(-0.5, -0.25, 1.0));
    }

    #[test]
    fn commands_deserialize_from_json() {
        let cmd: RegistryCommand = serde_json::from_str(
            r#"{"op":"register","id":3,"size":0.1,"position":[0,0,0],"orientation":[0,0,0]}"#,
        )
        .unwrap();
        assert!(matches!(cmd, RegistryCommand::Register { id: 3, .. }));
        let cmd: RegistryCommand = serde_json::from_str(r#"{"op":"remove","id":3}"#).unwrap();
        assert_eq!(cmd, RegistryCommand::Remove { id: 3 });
    }
}
