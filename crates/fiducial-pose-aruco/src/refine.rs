//! Corner refinement on the grayscale image.
//!
//! Contour vertices sit on foreground pixel centres, so a corner on the far
//! side of a marker lands a whole pixel short of the edge. The mixed second
//! derivative `∂²/∂x² ∂²/∂y²` (Sobel, 3×3 aperture) vanishes along straight
//! axis-aligned edges and peaks on the 2×2 block straddling a corner. The
//! refined corner is the response-weighted centroid of a `box × box` window
//! around the contour vertex.

use fiducial_pose_core::GrayImageView;
use nalgebra::Point2;

/// Outer product of `[1, -2, 1]` with itself.
const MIXED_SECOND: [[i32; 3]; 3] = [[1, -2, 1], [-2, 4, -2], [1, -2, 1]];

/// Refine all four corners of a quad. See [`refine_corner`].
pub fn refine_corners(
    img: &GrayImageView<'_>,
    corners: &[Point2<f64>; 4],
    box_size: u32,
) -> [Point2<f64>; 4] {
    corners.map(|c| refine_corner(img, c, box_size))
}

/// Move `corner` onto the strongest mixed second derivative response nearby.
///
/// The window is `box_size` pixels on a side, centred on the rounded corner
/// and shifted to stay inside the image. Pixel `(x, y)` is centred on
/// `(x, y)`, as for the camera intrinsics, so a sharp corner refines onto the
/// half-pixel boundary between two rows and columns. The corner is returned
/// unchanged when `box_size` is 0, the image is incomplete or the
/// window is flat.
pub fn refine_corner(img: &GrayImageView<'_>, corner: Point2<f64>, box_size: u32) -> Point2<f64> {
    if box_size == 0 || !img.is_complete() || !corner.x.is_finite() || !corner.y.is_finite() {
        return corner;
    }
    let (w, h) = (img.width as i64, img.height as i64);
    let side = i64::from(box_size);
    let x0 = window_origin(corner.x, side, w);
    let y0 = window_origin(corner.y, side, h);

    let (mut sum, mut sx, mut sy) = (0.0f64, 0.0f64, 0.0f64);
    for y in y0..(y0 + side).min(h) {
        for x in x0..(x0 + side).min(w) {
            let r = mixed_second_derivative(img, x, y).unsigned_abs() as f64;
            sum += r;
            sx += r * x as f64;
            sy += r * y as f64;
        }
    }
    if sum <= 0.0 {
        return corner;
    }

    Point2::new(sx / sum, sy / sum)
}

/// Clamp the window to `[0, len - side]`.
fn window_origin(centre: f64, side: i64, len: i64) -> i64 {
    let start = centre.round() as i64 - side / 2;
    start.min(len - side).max(0)
}

/// Kernel response with replicated borders.
fn mixed_second_derivative(img: &GrayImageView<'_>, x: i64, y: i64) -> i32 {
    let mut acc = 0i32;
    for (dy, row) in MIXED_SECOND.iter().enumerate() {
        for (dx, &k) in row.iter().enumerate() {
            acc += k * i32::from(clamped(img, x + dx as i64 - 1, y + dy as i64 - 1));
        }
    }
    acc
}

#[inline]
fn clamped(img: &GrayImageView<'_>, x: i64, y: i64) -> u8 {
    let x = x.clamp(0, img.width as i64 - 1) as usize;
    let y = y.clamp(0, img.height as i64 - 1) as usize;
    img.data[y * img.width + x]
}
