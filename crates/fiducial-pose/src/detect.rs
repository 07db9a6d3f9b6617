use crate::aruco::builtins::aruco_original;
use crate::aruco::{CandidateDetector, DetectParams, MarkerCandidate, QuadDetector};
use crate::core::{GrayImageView, PixelFormat};
use crate::frame::Frame;
use std::path::Path;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced while reading frames from image files.
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] ::image::ImageError),
}

/// Convert an `image::GrayImage` into the lightweight core view type.
pub fn gray_view(img: &::image::GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Deliver a decoded image as an `Rgb8` frame.
pub fn frame_from_image(img: &::image::DynamicImage) -> Frame {
    let rgb = img.to_rgb8();
    Frame::new(
        rgb.width() as usize,
        rgb.height() as usize,
        PixelFormat::Rgb8,
        rgb.into_raw(),
    )
}

/// Read and decode an image file into a frame.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip(path)))]
pub fn load_frame(path: impl AsRef<Path>) -> Result<Frame, LoadError> {
    let img = ::image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?;
    Ok(frame_from_image(&img))
}

/// Detect original-ArUco markers in a grayscale image.
pub fn detect_markers(img: &::image::GrayImage, params: &DetectParams) -> Vec<MarkerCandidate> {
    let detector = QuadDetector::for_dictionary(aruco_original(), 0);
    detector.detect(&gray_view(img), params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aruco::builtins::aruco_original_code;
    use crate::aruco::render::render_marker;

    #[test]
    fn detects_marker_in_image_buffer() {
        let gray = render_marker(aruco_original_code(42), 200, 200, 50.0, 40.0, 12.0);
        let img = ::image::GrayImage::from_raw(200, 200, gray.data).unwrap();
        let found = detect_markers(&img, &DetectParams::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 42);
    }

    #[test]
    fn dynamic_image_becomes_rgb_frame() {
        let img = ::image::DynamicImage::new_luma8(3, 2);
        let frame = frame_from_image(&img);
        assert_eq!(frame.format, PixelFormat::Rgb8);
        assert_eq!(frame.data.len(), 18);
        assert_eq!(frame.to_gray().unwrap().width, 3);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_frame(dir.path().join("missing.png")).is_err());
    }
}
