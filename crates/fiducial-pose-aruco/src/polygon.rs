//! Polygon simplification and shape tests for closed contours.

use nalgebra::Point2;

/// Closed contour length.
pub fn perimeter(points: &[Point2<f64>]) -> f64 {
    let n = points.len();
    if n < 2 {
        return 0.0;
    }
    (0..n)
        .map(|i| (points[(i + 1) % n] - points[i]).norm())
        .sum()
}

/// Shoelace area; positive when the vertices run clockwise in a y-down image.
pub fn signed_area(points: &[Point2<f64>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let (a, b) = (points[i], points[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum();
    0.5 * twice
}

/// All turn cross products share a sign and none is zero.
pub fn is_strictly_convex(points: &[Point2<f64>]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    let mut sign = 0.0f64;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let c = points[(i + 2) % n];
        let cross = (b - a).perp(&(c - b));
        if cross == 0.0 || !cross.is_finite() {
            return false;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

/// Largest `|cos|` of the interior angles.
pub fn max_abs_cosine(points: &[Point2<f64>]) -> f64 {
    let n = points.len();
    let mut worst = 0.0f64;
    for i in 0..n {
        let prev = points[(i + n - 1) % n];
        let cur = points[i];
        let next = points[(i + 1) % n];
        let u = prev - cur;
        let v = next - cur;
        let denom = u.norm() * v.norm();
        if denom <= f64::EPSILON {
            return 1.0;
        }
        worst = worst.max((u.dot(&v) / denom).abs());
    }
    worst
}

/// Douglas–Peucker simplification of a closed contour.
///
/// The contour is split at two far-apart vertices and both chains are
/// simplified with tolerance `epsilon`.
pub fn approx_poly_closed(points: &[Point2<f64>], epsilon: f64) -> Vec<Point2<f64>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let farthest_from = |origin: Point2<f64>| {
        (0..n)
            .max_by(|&i, &j| {
                let di = (points[i] - origin).norm_squared();
                let dj = (points[j] - origin).norm_squared();
                di.total_cmp(&dj)
            })
            .unwrap_or(0)
    };
    let a = farthest_from(points[0]);
    let b = farthest_from(points[a]);
    if a == b {
        return vec![points[a]];
    }

    let mut keep = vec![false; n];
    keep[a] = true;
    keep[b] = true;
    simplify_chain(points, a, b, epsilon, &mut keep);
    simplify_chain(points, b, a, epsilon, &mut keep);

    // Emit starting at `a` so the output order follows the contour.
    (0..n)
        .map(|k| (a + k) % n)
        .filter(|&i| keep[i])
        .map(|i| points[i])
        .collect()
}

/// Mark kept vertices on the cyclic chain `from → to` (exclusive ends).
fn simplify_chain(points: &[Point2<f64>], from: usize, to: usize, eps: f64, keep: &mut [bool]) {
    let n = points.len();
    let span = |s: usize, e: usize| (e + n - s) % n;

    let mut stack = vec![(from, to)];
    while let Some((s, e)) = stack.pop() {
        let len = span(s, e);
        if len < 2 {
            continue;
        }
        let (ps, pe) = (points[s], points[e]);
        let mut best = (0.0f64, s);
        for k in 1..len {
            let i = (s + k) % n;
            let d = distance_to_segment(points[i], ps, pe);
            if d > best.0 {
                best = (d, i);
            }
        }
        if best.0 > eps {
            keep[best.1] = true;
            stack.push((s, best.1));
            stack.push((best.1, e));
        }
    }
}

fn distance_to_segment(p: Point2<f64>, a: Point2<f64>, b: Point2<f64>) -> f64 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 <= f64::EPSILON {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}
