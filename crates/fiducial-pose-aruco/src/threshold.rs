//! Binarization: adaptive mean threshold for candidate search and Otsu for
//! bit sampling.

use fiducial_pose_core::GrayImageView;

/// Binary image, row-major, `true` = foreground.
#[derive(Clone, Debug)]
pub struct Mask {
    pub width: usize,
    pub height: usize,
    pub data: Vec<bool>,
}

impl Mask {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![false; width * height],
        }
    }

    /// Foreground test, `false` outside the mask.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return false;
        }
        self.data[y as usize * self.width + x as usize]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: bool) {
        self.data[y * self.width + x] = v;
    }

    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }
}

/// Adaptive mean threshold with inverted output.
///
/// A pixel is foreground when `pixel <= mean(block × block) - offset`. The
/// window is clipped at the image border and the mean is taken over the
/// pixels actually covered. `block_size` is forced odd and at least 3.
///
/// An image whose buffer does not cover `width × height` yields an empty
/// mask.
pub fn adaptive_threshold_mean(img: &GrayImageView<'_>, block_size: u32, offset: i32) -> Mask {
    if !img.is_complete() {
        return Mask::new(0, 0);
    }
    let (w, h) = (img.width, img.height);
    let mut mask = Mask::new(w, h);

    let block = (block_size.max(3) | 1) as usize;
    let r = block / 2;

    // (w + 1) × (h + 1) summed-area table.
    let stride = w + 1;
    let mut integral = vec![0u64; stride * (h + 1)];
    for y in 0..h {
        let mut row = 0u64;
        for x in 0..w {
            row += img.data[y * w + x] as u64;
            integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row;
        }
    }

    let offset = offset as i64;
    for y in 0..h {
        let y0 = y.saturating_sub(r);
        let y1 = (y + r + 1).min(h);
        for x in 0..w {
            let x0 = x.saturating_sub(r);
            let x1 = (x + r + 1).min(w);
            let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
                - integral[y0 * stride + x1]
                - integral[y1 * stride + x0];
            let area = ((x1 - x0) * (y1 - y0)) as i64;
            let p = img.data[y * w + x] as i64;
            // p <= sum / area - offset, kept in integers.
            if p * area <= sum as i64 - offset * area {
                mask.set(x, y, true);
            }
        }
    }

    mask
}

/// Otsu threshold over a set of sample intensities.
///
/// Values strictly below the returned level are dark.
pub fn otsu_threshold_from_samples(samples: &[u8]) -> u8 {
    if samples.is_empty() {
        return 127;
    }

    let mut min_v = 255u8;
    let mut max_v = 0u8;
    for &v in samples {
        min_v = min_v.min(v);
        max_v = max_v.max(v);
    }
    if min_v == max_v {
        return min_v;
    }

    let mut hist = [0u32; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }
    let nonzero_bins = hist.iter().filter(|&&h| h > 0).count();
    if nonzero_bins <= 2 {
        return ((min_v as u16 + max_v as u16 + 1) / 2) as u8;
    }

    let total = samples.len() as f64;
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = 127u8;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }

        sum_b += t as f64 * h as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;

        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            // Class boundary sits just above the last dark bin.
            best_t = (t + 1).min(255) as u8;
        }
    }

    best_t
}
