//! Outer border following on a binary mask.
//!
//! Every 8-connected foreground component contributes exactly one contour:
//! its outer border, traced with the Suzuki–Abe follower starting from the
//! component's first pixel in raster order. Holes are not traced.

use crate::threshold::Mask;
use nalgebra::Point2;

/// Neighbour offsets, clockwise in a y-down image starting at east.
const DIRS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

const WEST: usize = 4;

/// Outer border of each 8-connected foreground component.
pub fn find_outer_contours(mask: &Mask) -> Vec<Vec<Point2<i32>>> {
    let (w, h) = (mask.width, mask.height);
    let mut visited = vec![false; w * h];
    let mut stack = Vec::new();
    let mut out = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            if !mask.data[idx] || visited[idx] {
                continue;
            }
            let start = Point2::new(x as i32, y as i32);
            out.push(trace_border(mask, start));
            mark_component(mask, start, &mut visited, &mut stack);
        }
    }

    out
}

/// Follow the outer border clockwise-in-search from `start`, whose west
/// neighbour is background.
fn trace_border(mask: &Mask, start: Point2<i32>) -> Vec<Point2<i32>> {
    let step = |p: Point2<i32>, d: usize| Point2::new(p.x + DIRS[d].0, p.y + DIRS[d].1);

    let Some(p1) = (0..8)
        .map(|k| step(start, (WEST + k) % 8))
        .find(|q| mask.get(q.x, q.y))
    else {
        return vec![start];
    };

    let mut contour = vec![start];
    let mut prev = p1;
    let mut cur = start;

    loop {
        let d_prev = direction(cur, prev);
        let mut next = cur;
        for k in 1..=8 {
            let q = step(cur, (d_prev + 8 - k) % 8);
            if mask.get(q.x, q.y) {
                next = q;
                break;
            }
        }

        if next == start && cur == p1 {
            break;
        }
        if next != start {
            contour.push(next);
        }
        prev = cur;
        cur = next;

        // Every pixel is entered from at most 8 directions.
        if contour.len() > 8 * mask.width * mask.height {
            break;
        }
    }

    contour
}

fn direction(from: Point2<i32>, to: Point2<i32>) -> usize {
    let d = (to.x - from.x, to.y - from.y);
    DIRS.iter().position(|&o| o == d).unwrap_or(WEST)
}

fn mark_component(
    mask: &Mask,
    seed: Point2<i32>,
    visited: &mut [bool],
    stack: &mut Vec<Point2<i32>>,
) {
    let w = mask.width;
    stack.clear();
    stack.push(seed);
    visited[seed.y as usize * w + seed.x as usize] = true;

    while let Some(p) = stack.pop() {
        for (dx, dy) in DIRS {
            let (qx, qy) = (p.x + dx, p.y + dy);
            if !mask.get(qx, qy) {
                continue;
            }
            let qi = qy as usize * w + qx as usize;
            if !visited[qi] {
                visited[qi] = true;
                stack.push(Point2::new(qx, qy));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from(rows: &[&str]) -> Mask {
        let h = rows.len();
        let w = rows[0].len();
        let mut m = Mask::new(w, h);
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                m.set(x, y, c == '#');
            }
        }
        m
    }

    #[test]
    fn square_block_border() {
        let m = mask_from(&["......", ".##...", ".##...", "......"]);
        let contours = find_outer_contours(&m);
        assert_eq!(contours.len(), 1);
        assert_eq!(
            contours[0],
            vec![
                Point2::new(1, 1),
                Point2::new(1, 2),
                Point2::new(2, 2),
                Point2::new(2, 1)
            ]
        );
    }

    #[test]
    fn ring_yields_only_outer_border() {
        let m = mask_from(&[
            ".......", ".#####.", ".#...#.", ".#...#.", ".#####.", ".......",
        ]);
        let contours = find_outer_contours(&m);
        assert_eq!(contours.len(), 1);
        let c = &contours[0];
        assert_eq!(c.len(), 14);
        assert!(c.contains(&Point2::new(5, 4)));
        assert!(c.iter().all(|p| p.x == 1 || p.x == 5 || p.y == 1 || p.y == 4));
    }

    #[test]
    fn isolated_pixels_and_diagonals() {
        let m = mask_from(&["#....", "....#", "...#."]);
        let contours = find_outer_contours(&m);
        assert_eq!(contours.len(), 2);
        assert_eq!(contours[0], vec![Point2::new(0, 0)]);
        assert_eq!(contours[1].len(), 2);
    }

    #[test]
    fn empty_mask() {
        assert!(find_outer_contours(&Mask::new(8, 8)).is_empty());
        assert!(find_outer_contours(&Mask::new(0, 0)).is_empty());
    }
}
