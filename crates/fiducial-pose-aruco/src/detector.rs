//! Quad candidate extraction and decoding.

use crate::contour::find_outer_contours;
use crate::decode::{DecodeConfig, DictionaryDecoder, MarkerDecoder};
use crate::polygon::{
    approx_poly_closed, is_strictly_convex, max_abs_cosine, perimeter, signed_area,
};
use crate::refine::refine_corners;
use crate::threshold::adaptive_threshold_mean;
use crate::Dictionary;
use fiducial_pose_core::GrayImageView;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Per-call detection parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectParams {
    /// Upper bound on `|cos|` of every quad corner angle.
    pub cosine_limit: f64,
    /// Adaptive threshold window side (odd).
    pub block_size: u32,
    /// Minimal enclosed quad area in square pixels.
    pub min_area: f64,
    /// Douglas–Peucker tolerance as a fraction of the contour perimeter.
    pub max_poly_error: f64,
    /// Constant subtracted from the local mean.
    pub threshold_offset: i32,
    /// Contours with fewer points are skipped before simplification.
    pub min_contour_points: usize,
    /// Side of the corner refinement window in pixels, 0 disables it.
    pub corner_refine_box: u32,
}

impl Default for DetectParams {
    fn default() -> Self {
        Self {
            cosine_limit: 0.7,
            block_size: 13,
            min_area: 100.0,
            max_poly_error: 0.035,
            threshold_offset: 7,
            min_contour_points: 4,
            corner_refine_box: 5,
        }
    }
}

/// Quad that passed the shape filters, corners clockwise in the image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quad {
    pub corners: [Point2<f64>; 4],
    pub area: f64,
}

/// One decoded marker in a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkerCandidate {
    pub id: u32,
    /// TL, TR, BR, BL of the marker pattern, in pixels.
    pub corners: [Point2<f64>; 4],
    pub rotation: u8,
    pub hamming: u8,
    pub border_score: f32,
    /// Enclosed quad area in square pixels.
    pub area: f64,
}

/// Frame → marker candidates.
pub trait CandidateDetector {
    fn detect(&self, img: &GrayImageView<'_>, params: &DetectParams) -> Vec<MarkerCandidate>;
}

/// Contour-based quad detector with a pluggable bit decoder.
#[derive(Clone, Debug)]
pub struct QuadDetector<D = DictionaryDecoder> {
    decoder: D,
}

impl QuadDetector<DictionaryDecoder> {
    /// Detector decoding `dict` with the default sampling configuration.
    pub fn for_dictionary(dict: Dictionary, max_hamming: u8) -> Self {
        let cfg = DecodeConfig {
            max_hamming,
            ..DecodeConfig::default()
        };
        Self::new(DictionaryDecoder::new(dict, cfg))
    }
}

impl<D: MarkerDecoder> QuadDetector<D> {
    pub fn new(decoder: D) -> Self {
        Self { decoder }
    }

    #[inline]
    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Shape-filtered quads before decoding.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self, img, params), fields(w = img.width, h = img.height, block = params.block_size)))]
    pub fn detect_quads(&self, img: &GrayImageView<'_>, params: &DetectParams) -> Vec<Quad> {
        if !img.is_complete() {
            return Vec::new();
        }

        let mask = adaptive_threshold_mean(img, params.block_size, params.threshold_offset);
        let contours = find_outer_contours(&mask);
        let min_points = params.min_contour_points.max(4);

        let mut quads = Vec::new();
        for contour in contours.iter().filter(|c| c.len() >= min_points) {
            let pts: Vec<Point2<f64>> = contour
                .iter()
                .map(|p| Point2::new(p.x as f64, p.y as f64))
                .collect();
            let eps = params.max_poly_error * perimeter(&pts);
            let poly = approx_poly_closed(&pts, eps);
            let Ok(mut corners) = <[Point2<f64>; 4]>::try_from(poly.as_slice()) else {
                continue;
            };
            if !is_strictly_convex(&corners) {
                continue;
            }
            let mut area = signed_area(&corners);
            if area.abs() < params.min_area {
                continue;
            }
            if max_abs_cosine(&corners) > params.cosine_limit {
                continue;
            }
            if area < 0.0 {
                corners.swap(1, 3);
                area = -area;
            }
            if params.corner_refine_box > 0 {
                let refined = refine_corners(img, &corners, params.corner_refine_box);
                let refined_area = signed_area(&refined);
                if refined_area > 0.0 && is_strictly_convex(&refined) {
                    corners = refined;
                    area = refined_area;
                }
            }
            quads.push(Quad { corners, area });
        }

        log::trace!(
            "{} contours, {} quads at block size {}",
            contours.len(),
            quads.len(),
            params.block_size
        );
        quads
    }
}

impl<D: MarkerDecoder> CandidateDetector for QuadDetector<D> {
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    fn detect(&self, img: &GrayImageView<'_>, params: &DetectParams) -> Vec<MarkerCandidate> {
        let mut best: BTreeMap<u32, MarkerCandidate> = BTreeMap::new();

        for quad in self.detect_quads(img, params) {
            let Some(m) = self.decoder.decode(img, &quad.corners) else {
                continue;
            };
            let cand = MarkerCandidate {
                id: m.id,
                corners: m.corners,
                rotation: m.rotation,
                hamming: m.hamming,
                border_score: m.border_score,
                area: quad.area,
            };
            match best.get(&cand.id) {
                Some(prev) if !is_better(&cand, prev) => {}
                _ => {
                    best.insert(cand.id, cand);
                }
            }
        }

        log::debug!("{} marker candidates", best.len());
        best.into_values().collect()
    }
}

/// Fewer bit errors, then higher border score, then larger area.
fn is_better(a: &MarkerCandidate, b: &MarkerCandidate) -> bool {
    (b.hamming, a.border_score, a.area) > (a.hamming, b.border_score, b.area)
}
