//! Bit decoding of a quad candidate.
//!
//! The quad is mapped onto a canonical square with a 4-point homography, the
//! cell centres are sampled with a 3×3 mean and binarized with an Otsu level
//! computed over a denser grid, and the inner code is matched against the
//! dictionary in all four rotations.

use crate::threshold::otsu_threshold_from_samples;
use crate::{Dictionary, Matcher};
use fiducial_pose_core::{sample_mean_3x3, GrayImageView, Homography};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Anything that can turn an image quad into an id plus ordered corners.
pub trait MarkerDecoder {
    /// Decode the marker inside `quad` (clockwise in the image, TL first).
    ///
    /// Returns `None` when the quad does not hold a valid marker.
    fn decode(&self, img: &GrayImageView<'_>, quad: &[Point2<f64>; 4]) -> Option<DecodedMarker>;
}

/// Decoder output with corners in the marker pattern's own order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecodedMarker {
    pub id: u32,
    /// TL, TR, BR, BL of the marker pattern.
    pub corners: [Point2<f64>; 4],
    /// Quarter turns between the sampled grid and the dictionary pattern.
    pub rotation: u8,
    pub hamming: u8,
    /// Fraction of border cells with the expected polarity.
    pub border_score: f32,
}

/// Sampling parameters for [`DictionaryDecoder`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Border width in cells.
    pub border_bits: usize,
    /// Side of the canonical square the quad is mapped onto.
    pub sample_side_px: f64,
    /// Require border-black ratio >= this.
    pub min_border_score: f32,
    /// Also try white-on-black markers.
    pub detect_inverted: bool,
    /// Bit errors tolerated by the dictionary match.
    pub max_hamming: u8,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            border_bits: 1,
            sample_side_px: 70.0,
            min_border_score: 0.85,
            detect_inverted: false,
            max_hamming: 0,
        }
    }
}

const THRESH_SUBDIV: usize = 3;

/// Built-in decoder backed by a packed-code [`Dictionary`].
#[derive(Clone, Debug)]
pub struct DictionaryDecoder {
    cfg: DecodeConfig,
    matcher: Matcher,
    cells: usize,
    square: [Point2<f64>; 4],
    points: Vec<Point2<f64>>, // row-major: cy * cells + cx
    threshold_points: Vec<Point2<f64>>,
}

impl DictionaryDecoder {
    pub fn new(dict: Dictionary, cfg: DecodeConfig) -> Self {
        let matcher = Matcher::new(dict, cfg.max_hamming);
        let cells = dict.marker_size + 2 * cfg.border_bits;
        let side = cfg.sample_side_px.max(cells as f64);

        let points = grid_points(side, cells);
        let threshold_points = grid_points(side, cells * THRESH_SUBDIV);
        let square = [
            Point2::new(0.0, 0.0),
            Point2::new(side, 0.0),
            Point2::new(side, side),
            Point2::new(0.0, side),
        ];

        Self {
            cfg,
            matcher,
            cells,
            square,
            points,
            threshold_points,
        }
    }

    #[inline]
    pub fn config(&self) -> &DecodeConfig {
        &self.cfg
    }

    #[inline]
    pub fn dictionary(&self) -> Dictionary {
        self.matcher.dictionary()
    }

    fn read_code(&self, samples: &[u8], thr: u8, inverted: bool) -> (u64, f32) {
        let cells = self.cells;
        let border = self.cfg.border_bits;
        let bits = self.matcher.dictionary().marker_size;

        let mut border_ok = 0u32;
        let mut border_total = 0u32;
        let mut code = 0u64;
        for cy in 0..cells {
            for cx in 0..cells {
                let is_black = (samples[cy * cells + cx] < thr) != inverted;
                let is_border = cx < border
                    || cy < border
                    || cx >= cells - border
                    || cy >= cells - border;
                if is_border {
                    border_total += 1;
                    border_ok += is_black as u32;
                } else if is_black {
                    code |= 1u64 << ((cy - border) * bits + (cx - border));
                }
            }
        }

        let score = if border_total == 0 {
            1.0
        } else {
            border_ok as f32 / border_total as f32
        };
        (code, score)
    }
}

impl MarkerDecoder for DictionaryDecoder {
    fn decode(&self, img: &GrayImageView<'_>, quad: &[Point2<f64>; 4]) -> Option<DecodedMarker> {
        if self.matcher.dictionary().bit_count() > 64 {
            return None;
        }
        let h = Homography::from_4pt(&self.square, quad)?;

        let samples = self
            .points
            .iter()
            .map(|p| {
                let q = h.apply(*p);
                sample_mean_3x3(img, q.x, q.y)
            })
            .collect::<Option<Vec<u8>>>()?;
        let thr_samples: Vec<u8> = self
            .threshold_points
            .iter()
            .filter_map(|p| {
                let q = h.apply(*p);
                sample_mean_3x3(img, q.x, q.y)
            })
            .collect();
        let thr = otsu_threshold_from_samples(if thr_samples.is_empty() {
            &samples
        } else {
            &thr_samples
        });

        let polarities: &[bool] = if self.cfg.detect_inverted {
            &[false, true]
        } else {
            &[false]
        };

        let mut best: Option<DecodedMarker> = None;
        for &inverted in polarities {
            let (code, border_score) = self.read_code(&samples, thr, inverted);
            if border_score < self.cfg.min_border_score {
                continue;
            }
            let Some(m) = self.matcher.match_code(code) else {
                continue;
            };
            let better = best.is_none_or(|b| {
                (m.hamming, -border_score) < (b.hamming, -b.border_score)
            });
            if better {
                best = Some(DecodedMarker {
                    id: m.id,
                    corners: m.canonical_corners(quad),
                    rotation: m.rotation,
                    hamming: m.hamming,
                    border_score,
                });
            }
        }

        best
    }
}

fn grid_points(side: f64, n: usize) -> Vec<Point2<f64>> {
    let step = side / n as f64;
    let mut points = Vec::with_capacity(n * n);
    for cy in 0..n {
        for cx in 0..n {
            points.push(Point2::new(
                (cx as f64 + 0.5) * step,
                (cy as f64 + 0.5) * step,
            ));
        }
    }
    points
}
