use crate::error::FrameError;
use fiducial_pose_core::{gray_from_interleaved, GrayImage, PixelFormat};
use serde::{Deserialize, Serialize};

/// A raw frame as delivered by the frame source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    pub format: PixelFormat,
    pub data: Vec<u8>,
    /// Capture time in seconds.
    #[serde(default)]
    pub stamp: Option<f64>,
}

impl Frame {
    pub fn new(width: usize, height: usize, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format,
            data,
            stamp: None,
        }
    }

    pub fn with_stamp(mut self, stamp: f64) -> Self {
        self.stamp = Some(stamp);
        self
    }

    /// Wrap an owned grayscale image.
    pub fn from_gray(img: GrayImage) -> Self {
        Self::new(img.width, img.height, PixelFormat::Gray8, img.data)
    }

    /// Convert to 8-bit grayscale.
    ///
    /// A zero-sized frame without data is an empty image, not an error.
    pub fn to_gray(&self) -> Result<GrayImage, FrameError> {
        if self.data.is_empty() && (self.width == 0 || self.height == 0) {
            return Ok(GrayImage::filled(0, 0, 0));
        }
        Ok(gray_from_interleaved(
            self.width,
            self.height,
            self.format,
            &self.data,
        )?)
    }
}
