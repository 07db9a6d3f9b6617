//! Synthetic marker rendering.
//!
//! Markers are drawn black-on-white with a one-cell black border. Used to
//! build test frames and benchmark inputs without fixture files.

use fiducial_pose_core::{GrayImage, Homography};
use nalgebra::Point2;

pub const BLACK: u8 = 0;
pub const WHITE: u8 = 255;

/// Draw a marker (`marker_size` inner bits, black = 1) into `quad`.
///
/// `quad` lists the marker's TL, TR, BR, BL in image coordinates, with
/// pixel `(x, y)` covering `[x, x + 1) × [y, y + 1)`. Pixels whose centre
/// falls outside the quad are left untouched. Returns `false` when the quad
/// is degenerate.
pub fn draw_marker(
    img: &mut GrayImage,
    code: u64,
    marker_size: usize,
    quad: &[Point2<f64>; 4],
) -> bool {
    let cells = marker_size + 2;
    let side = cells as f64;
    let square = [
        Point2::new(0.0, 0.0),
        Point2::new(side, 0.0),
        Point2::new(side, side),
        Point2::new(0.0, side),
    ];
    let Some(to_marker) = Homography::from_4pt(quad, &square) else {
        return false;
    };

    let (min_x, max_x) = span(quad.iter().map(|p| p.x), img.width);
    let (min_y, max_y) = span(quad.iter().map(|p| p.y), img.height);

    for y in min_y..max_y {
        for x in min_x..max_x {
            let m = to_marker.apply(Point2::new(x as f64 + 0.5, y as f64 + 0.5));
            if !(m.x >= 0.0 && m.y >= 0.0 && m.x < side && m.y < side) {
                continue;
            }
            let (cx, cy) = (m.x as usize, m.y as usize);
            let border = cx == 0 || cy == 0 || cx + 1 == cells || cy + 1 == cells;
            let black = border || (code >> ((cy - 1) * marker_size + (cx - 1))) & 1 == 1;
            img.data[y * img.width + x] = if black { BLACK } else { WHITE };
        }
    }
    true
}

/// White `width × height` frame with one axis-aligned 5×5-bit marker whose
/// top-left corner sits at `(x0, y0)` and whose cells are `cell` pixels wide.
pub fn render_marker(code: u64, width: usize, height: usize, x0: f64, y0: f64, cell: f64) -> GrayImage {
    let mut img = GrayImage::filled(width, height, WHITE);
    let s = 7.0 * cell;
    let quad = [
        Point2::new(x0, y0),
        Point2::new(x0 + s, y0),
        Point2::new(x0 + s, y0 + s),
        Point2::new(x0, y0 + s),
    ];
    draw_marker(&mut img, code, 5, &quad);
    img
}

fn span(values: impl Iterator<Item = f64>, limit: usize) -> (usize, usize) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return (0, 0);
    }
    let lo = lo.floor().max(0.0) as usize;
    let hi = (hi.ceil().max(0.0) as usize).min(limit);
    (lo.min(hi), hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::aruco_original_code;

    #[test]
    fn axis_aligned_marker_layout() {
        // id 0: every row is 10000 (white first column).
        let img = render_marker(aruco_original_code(0), 100, 100, 10.0, 10.0, 10.0);
        let at = |x: usize, y: usize| img.data[y * 100 + x];
        assert_eq!(at(5, 5), WHITE);
        assert_eq!(at(15, 15), BLACK); // border
        assert_eq!(at(25, 25), WHITE); // first inner column
        assert_eq!(at(35, 25), BLACK);
        assert_eq!(at(79, 79), BLACK);
        assert_eq!(at(80, 80), WHITE);
    }

    #[test]
    fn degenerate_quad_draws_nothing() {
        let mut img = GrayImage::filled(20, 20, WHITE);
        let p = Point2::new(5.0, 5.0);
        assert!(!draw_marker(&mut img, 0, 5, &[p, p, p, p]));
        assert!(img.data.iter().all(|&v| v == WHITE));
    }
}
