//! JSON configuration of the localizer.

use crate::error::ConfigError;
use crate::pnp::PnpOptions;
use fiducial_pose_aruco::{BlockSizeController, DetectParams};
use fiducial_pose_core::{AxisConvention, CameraModel};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const DELIMITER: char = '_';

/// Localizer options, loaded from JSON. Missing fields take defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizerConfig {
    /// Verbose diagnostics: registry dump at startup, calibration latch notice.
    pub debug: bool,
    /// Keep inputs and outputs in vision axes instead of robot axes.
    pub use_vision_coords: bool,
    pub cosine_limit: f64,
    /// Polygon simplification tolerance, fraction of contour perimeter.
    pub max_error_quad: f64,
    pub threshold_block_size_min: u32,
    pub threshold_block_size_max: u32,
    pub min_area: f64,
    /// Corner refinement window side in pixels, 0 keeps contour corners.
    pub corner_refine_box: u32,
    /// Inline intrinsics `"fx_0_cx_0_fy_cy_0_0_1"`.
    pub calibration: Option<String>,
    /// Inline distortion `"k1_k2_p1_p2_k3"`.
    pub distortion: Option<String>,
    /// Static markers, id → `"size_px_py_pz_rx_ry_rz"`.
    pub markers: BTreeMap<String, String>,
    pub frame_id: String,
    pub max_reprojection_rms: f64,
    pub max_hamming: u8,
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        Self {
            debug: false,
            use_vision_coords: false,
            cosine_limit: 0.7,
            max_error_quad: 0.035,
            threshold_block_size_min: 3,
            threshold_block_size_max: 21,
            min_area: 100.0,
            corner_refine_box: 5,
            calibration: None,
            distortion: None,
            markers: BTreeMap::new(),
            frame_id: "aruco".to_string(),
            max_reprojection_rms: 10.0,
            max_hamming: 0,
        }
    }
}

/// One static marker entry, in the configured input convention.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StaticMarker {
    pub id: u32,
    pub size: f64,
    pub position: Vector3<f64>,
    pub orientation: Vector3<f64>,
}

impl LocalizerConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Axes used for registrations and published poses.
    #[inline]
    pub fn convention(&self) -> AxisConvention {
        if self.use_vision_coords {
            AxisConvention::Vision
        } else {
            AxisConvention::Robot
        }
    }

    /// Camera from the inline calibration/distortion overrides.
    ///
    /// `None` when neither is set. A missing half keeps its default.
    pub fn camera_model(&self) -> Result<Option<CameraModel>, ConfigError> {
        let k = parse_optional("calibration", self.calibration.as_deref(), 9)?;
        let d = parse_optional("distortion", self.distortion.as_deref(), 5)?;
        if k.is_none() && d.is_none() {
            return Ok(None);
        }

        let defaults = CameraModel::default();
        let mut k_arr = defaults.k;
        let mut d_arr = defaults.distortion;
        if let Some(k) = k {
            k_arr.copy_from_slice(&k);
        }
        if let Some(d) = d {
            d_arr.copy_from_slice(&d);
        }
        Ok(Some(CameraModel::new(k_arr, d_arr)?))
    }

    /// Parse the `markers` table. Keys are ids, optionally prefixed `marker`.
    pub fn static_markers(&self) -> Result<Vec<StaticMarker>, ConfigError> {
        let mut out = Vec::with_capacity(self.markers.len());
        for (key, text) in &self.markers {
            let id_text = key.strip_prefix("marker").unwrap_or(key);
            let id: u32 = id_text
                .trim()
                .parse()
                .map_err(|_| ConfigError::BadMarkerId(key.clone()))?;
            let Some(v) = parse_delimited("markers", text, 7, DELIMITER)? else {
                continue;
            };
            out.push(StaticMarker {
                id,
                size: v[0],
                position: Vector3::new(v[1], v[2], v[3]),
                orientation: Vector3::new(v[4], v[5], v[6]),
            });
        }
        Ok(out)
    }

    pub fn block_size_controller(&self) -> Result<BlockSizeController, ConfigError> {
        Ok(BlockSizeController::new(
            self.threshold_block_size_min,
            self.threshold_block_size_max,
        )?)
    }

    /// Detection parameters at the given block size.
    pub fn detect_params(&self, block_size: u32) -> DetectParams {
        DetectParams {
            cosine_limit: self.cosine_limit,
            block_size,
            min_area: self.min_area,
            max_poly_error: self.max_error_quad,
            corner_refine_box: self.corner_refine_box,
            ..DetectParams::default()
        }
    }

    pub fn pnp_options(&self) -> PnpOptions {
        PnpOptions {
            max_reprojection_rms: self.max_reprojection_rms,
            ..PnpOptions::default()
        }
    }
}

fn parse_optional(
    field: &'static str,
    text: Option<&str>,
    count: usize,
) -> Result<Option<Vec<f64>>, ConfigError> {
    match text {
        Some(t) => parse_delimited(field, t, count, DELIMITER),
        None => Ok(None),
    }
}

/// Parse exactly `count` numbers separated by `delimiter`.
///
/// Blank text yields `None`. Whitespace around fields is ignored.
pub fn parse_delimited(
    field: &'static str,
    text: &str,
    count: usize,
    delimiter: char,
) -> Result<Option<Vec<f64>>, ConfigError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let parts: Vec<&str> = text.split(delimiter).collect();
    if parts.len() != count {
        return Err(ConfigError::FieldCount {
            field,
            expected: count,
            got: parts.len(),
        });
    }

    parts
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            raw.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| ConfigError::BadNumber {
                    field,
                    index,
                    value: raw.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_field_including_the_last() {
        let v = parse_delimited("x", "1_2.5_-3", 3, '_').unwrap().unwrap();
        assert_eq!(v, vec![1.0, 2.5, -3.0]);
        assert_eq!(parse_delimited("x", "  ", 3, '_').unwrap(), None);
    }

    #[test]
    fn rejects_bad_numbers_and_counts() {
        assert!(matches!(
            parse_delimited("calibration", "1_x_3", 3, '_'),
            Err(ConfigError::BadNumber { index: 1, .. })
        ));
        assert!(matches!(
            parse_delimited("calibration", "1_2", 3, '_'),
            Err(ConfigError::FieldCount {
                expected: 3,
                got: 2,
                ..
            })
        ));
        assert!(matches!(
            parse_delimited("calibration", "1_nan_3", 3, '_'),
            Err(ConfigError::BadNumber { .. })
        ));
    }

    #[test]
    fn defaults_from_empty_json() {
        let cfg: LocalizerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, LocalizerConfig::default());
        assert_eq!(cfg.convention(), AxisConvention::Robot);
        assert_eq!(cfg.camera_model().unwrap(), None);
        assert_eq!(cfg.block_size_controller().unwrap().current(), 13);
    }

    #[test]
    fn inline_calibration_and_distortion_are_applied() {
        let cfg = LocalizerConfig {
            calibration: Some("600_0_320_0_600_240_0_0_1".into()),
            distortion: Some("0.1_-0.05_0_0_0.01".into()),
            ..LocalizerConfig::default()
        };
        let cam = cfg.camera_model().unwrap().unwrap();
        assert_eq!(cam.k, [600.0, 0.0, 320.0, 0.0, 600.0, 240.0, 0.0, 0.0, 1.0]);
        assert_eq!(cam.distortion, [0.1, -0.05, 0.0, 0.0, 0.01]);

        let only_d = LocalizerConfig {
            distortion: Some("0.1_0_0_0_0".into()),
            ..LocalizerConfig::default()
        };
        let cam = only_d.camera_model().unwrap().unwrap();
        assert_eq!(cam.k, CameraModel::default().k);
        assert_eq!(cam.distortion[0], 0.1);
    }

    #[test]
    fn blank_calibration_means_default() {
        let cfg = LocalizerConfig {
            calibration: Some(String::new()),
            ..LocalizerConfig::default()
        };
        assert_eq!(cfg.camera_model().unwrap(), None);
    }

    #[test]
    fn static_markers_parse() {
        let mut cfg = LocalizerConfig::default();
        cfg.markers.insert("3".into(), "0.1_1_2_3_0_0_0.5".into());
        cfg.markers.insert("marker12".into(), "0.2_0_0_0_0_0_0".into());
        let markers = cfg.static_markers().unwrap();
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].id, 3);
        assert_eq!(markers[0].position, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(markers[0].orientation, Vector3::new(0.0, 0.0, 0.5));
        assert_eq!(markers[1].id, 12);

        cfg.markers.insert("abc".into(), "0.2_0_0_0_0_0_0".into());
        assert!(matches!(
            cfg.static_markers(),
            Err(ConfigError::BadMarkerId(_))
        ));
    }

    #[test]
    fn invalid_block_bounds_are_rejected() {
        let cfg = LocalizerConfig {
            threshold_block_size_min: 21,
            threshold_block_size_max: 3,
            ..LocalizerConfig::default()
        };
        assert!(matches!(
            cfg.block_size_controller(),
            Err(ConfigError::BlockSize(_))
        ));
    }

    #[test]
    fn detector_options_reach_detect_params() {
        let cfg: LocalizerConfig =
            serde_json::from_str(r#"{ "cosine_limit": 0.5, "corner_refine_box": 0 }"#).unwrap();
        let params = cfg.detect_params(9);
        assert_eq!(params.block_size, 9);
        assert_eq!(params.cosine_limit, 0.5);
        assert_eq!(params.corner_refine_box, 0);
        assert_eq!(LocalizerConfig::default().detect_params(13).corner_refine_box, 5);
    }

    #[test]
    fn json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        let mut cfg = LocalizerConfig {
            use_vision_coords: true,
            ..LocalizerConfig::default()
        };
        cfg.markers.insert("1".into(), "0.1_0_0_1_0_0_0".into());
        cfg.write_json(&path).unwrap();
        assert_eq!(LocalizerConfig::load_json(&path).unwrap(), cfg);
    }
}
