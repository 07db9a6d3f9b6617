use serde::{Deserialize, Serialize};

/// Borrowed 8-bit grayscale image, row-major.
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

/// Owned 8-bit grayscale image, row-major.
#[derive(Clone, Debug)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    /// Uniform image filled with `value`.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    #[inline]
    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }
}

impl GrayImageView<'_> {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Non-empty, with a buffer covering every pixel.
    ///
    /// Dimensions whose product overflows `usize` never qualify.
    pub fn is_complete(&self) -> bool {
        !self.is_empty()
            && self
                .width
                .checked_mul(self.height)
                .is_some_and(|n| self.data.len() >= n)
    }

    /// Pixel value, `0` outside the image.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return 0;
        }
        self.data[y as usize * self.width + x as usize]
    }
}

/// Interleaved pixel layouts accepted from a frame source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    Gray8,
    Rgb8,
    Bgr8,
    Rgba8,
}

impl PixelFormat {
    #[inline]
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb8 | PixelFormat::Bgr8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// Errors raised while interpreting a raw pixel buffer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("invalid image dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },

    #[error("invalid {format:?} buffer length (expected {expected} bytes, got {got})")]
    InvalidBuffer {
        format: PixelFormat,
        expected: usize,
        got: usize,
    },
}

/// Convert an interleaved buffer into a grayscale image.
///
/// Color formats use the BT.601 luma weights in 14-bit fixed point.
pub fn gray_from_interleaved(
    width: usize,
    height: usize,
    format: PixelFormat,
    data: &[u8],
) -> Result<GrayImage, ImageError> {
    if width == 0 || height == 0 {
        return Err(ImageError::InvalidDimensions { width, height });
    }
    let expected = width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(format.channels()))
        .ok_or(ImageError::InvalidDimensions { width, height })?;
    if data.len() != expected {
        return Err(ImageError::InvalidBuffer {
            format,
            expected,
            got: data.len(),
        });
    }

    let data = match format {
        PixelFormat::Gray8 => data.to_vec(),
        PixelFormat::Rgb8 => data.chunks_exact(3).map(|p| luma(p[0], p[1], p[2])).collect(),
        PixelFormat::Bgr8 => data.chunks_exact(3).map(|p| luma(p[2], p[1], p[0])).collect(),
        PixelFormat::Rgba8 => data.chunks_exact(4).map(|p| luma(p[0], p[1], p[2])).collect(),
    };

    Ok(GrayImage {
        width,
        height,
        data,
    })
}

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = r as u32 * 4899 + g as u32 * 9617 + b as u32 * 1868 + 8192;
    (y >> 14).min(255) as u8
}

/// Mean of the 3×3 neighbourhood around `(x, y)`, or `None` near the border.
pub fn sample_mean_3x3(img: &GrayImageView<'_>, x: f64, y: f64) -> Option<u8> {
    let ix = x.floor() as i32;
    let iy = y.floor() as i32;
    if ix - 1 < 0 || iy - 1 < 0 || ix + 1 >= img.width as i32 || iy + 1 >= img.height as i32 {
        return None;
    }

    let mut sum = 0u32;
    for dy in -1..=1 {
        for dx in -1..=1 {
            sum += img.get(ix + dx, iy + dy) as u32;
        }
    }
    Some((sum / 9) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bgr_and_rgb_agree_on_swapped_channels() {
        let rgb = [200u8, 100, 50, 0, 0, 0];
        let bgr = [50u8, 100, 200, 0, 0, 0];
        let a = gray_from_interleaved(2, 1, PixelFormat::Rgb8, &rgb).unwrap();
        let b = gray_from_interleaved(2, 1, PixelFormat::Bgr8, &bgr).unwrap();
        assert_eq!(a.data, b.data);
        assert_eq!(a.data[1], 0);
    }

    #[test]
    fn white_stays_white() {
        let px = [255u8; 4];
        let g = gray_from_interleaved(1, 1, PixelFormat::Rgba8, &px).unwrap();
        assert_eq!(g.data, vec![255]);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let err = gray_from_interleaved(4, 4, PixelFormat::Rgb8, &[0u8; 10]).unwrap_err();
        assert_eq!(
            err,
            ImageError::InvalidBuffer {
                format: PixelFormat::Rgb8,
                expected: 48,
                got: 10
            }
        );
    }

    #[test]
    fn zero_sized_frame_is_rejected() {
        assert!(matches!(
            gray_from_interleaved(0, 3, PixelFormat::Gray8, &[]),
            Err(ImageError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn views_must_cover_their_dimensions() {
        let data = [7u8; 6];
        let view = |width, height| GrayImageView {
            width,
            height,
            data: &data,
        };
        assert!(view(3, 2).is_complete());
        assert!(!view(4, 2).is_complete());
        assert!(!view(0, 2).is_complete());
        assert!(!view(usize::MAX / 2 + 1, 2).is_complete());
    }

    #[test]
    fn mean_sampling_refuses_border() {
        let img = GrayImage::filled(5, 5, 90);
        let view = img.view();
        assert_eq!(sample_mean_3x3(&view, 2.5, 2.5), Some(90));
        assert_eq!(sample_mean_3x3(&view, 0.2, 2.0), None);
    }
}
