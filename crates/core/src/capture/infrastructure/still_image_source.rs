use std::path::Path;

use image::imageops::FilterType;
use image::RgbaImage;

use crate::capture::domain::camera::FrameSource;
use crate::shared::capture_error::CaptureError;
use crate::shared::frame::Frame;

/// [`FrameSource`] backed by a single decoded image file.
///
/// Every read returns the same picture, scaled when the requested size
/// differs from the file's.
pub struct StillImageSource {
    image: RgbaImage,
}

impl StillImageSource {
    pub fn open(path: &Path) -> Result<Self, CaptureError> {
        let image = image::open(path)
            .map_err(|e| CaptureError::camera(format!("{}: {e}", path.display())))?
            .into_rgba8();
        Ok(Self { image })
    }

    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Reads the image at its native size.
    pub fn frame(&mut self) -> Result<Frame, CaptureError> {
        let (width, height) = self.image.dimensions();
        let mut buffer = Vec::new();
        self.read_pixels(width, height, &mut buffer)?;
        Ok(Frame::new(buffer, width, height, 0))
    }
}

impl FrameSource for StillImageSource {
    fn dimensions(&self) -> Option<(u32, u32)> {
        Some(self.image.dimensions())
    }

    fn read_pixels(
        &mut self,
        width: u32,
        height: u32,
        buffer: &mut Vec<u8>,
    ) -> Result<(), CaptureError> {
        if width == 0 || height == 0 {
            return Err(CaptureError::FrameNotReady);
        }
        buffer.clear();
        if self.image.dimensions() == (width, height) {
            buffer.extend_from_slice(self.image.as_raw());
        } else {
            let scaled = image::imageops::resize(&self.image, width, height, FilterType::Triangle);
            buffer.extend_from_slice(scaled.as_raw());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_test_image(dir: &Path, width: u32, height: u32) -> PathBuf {
        let path = dir.join("still.png");
        let mut img = image::RgbImage::new(width, height);
        for pixel in img.pixels_mut() {
            *pixel = image::Rgb([150, 90, 70]);
        }
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_open_reports_native_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), 100, 80);
        let source = StillImageSource::open(&path).unwrap();
        assert_eq!(source.dimensions(), Some((100, 80)));
    }

    #[test]
    fn test_open_nonexistent_is_camera_unavailable() {
        let result = StillImageSource::open(Path::new("/nonexistent/still.png"));
        assert!(matches!(result, Err(CaptureError::CameraUnavailable(Some(_)))));
    }

    #[test]
    fn test_frame_is_rgba_with_opaque_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), 10, 10);
        let mut source = StillImageSource::open(&path).unwrap();
        let frame = source.frame().unwrap();
        assert_eq!(frame.data().len(), 10 * 10 * 4);
        assert_eq!(&frame.data()[..4], &[150, 90, 70, 255]);
    }

    #[test]
    fn test_read_pixels_scales_to_requested_size() {
        let img = RgbaImage::from_pixel(8, 8, image::Rgba([10, 20, 30, 255]));
        let mut source = StillImageSource::from_image(img);
        let mut buffer = Vec::new();
        source.read_pixels(4, 2, &mut buffer).unwrap();
        assert_eq!(buffer.len(), 4 * 2 * 4);
        assert_eq!(&buffer[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_zero_size_read_is_not_ready() {
        let img = RgbaImage::new(2, 2);
        let mut source = StillImageSource::from_image(img);
        let mut buffer = Vec::new();
        assert_eq!(
            source.read_pixels(0, 2, &mut buffer),
            Err(CaptureError::FrameNotReady)
        );
    }
}
