use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use tracing::debug;

use crate::error::{RemovalError, Result};
use crate::video::types::{Frame, PixelOrder};

/// The background-removal collaborator
///
/// Implementations are opaque to the pipeline: given a frame and a background
/// of the same size (both in [`expected_order`](Self::expected_order)), return
/// a new frame whose background pixels come from the background image.
pub trait BackgroundRemover: Send + Sync {
    /// Returns the unique name of this remover
    fn name(&self) -> &str;

    /// Channel order the remover wants its input in
    fn expected_order(&self) -> PixelOrder {
        PixelOrder::Rgb
    }

    /// Produce a new frame with the background replaced
    ///
    /// Must not rely on any state shared with other instances; the pipeline
    /// may call one instance from several threads when the shared model
    /// policy is selected.
    fn replace_background(&self, frame: &Frame, background: &Frame) -> Result<Frame>;

    /// Load models or precompute tables
    ///
    /// Called once per instance before the instance sees its first frame.
    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }
}

/// The replacement background, loaded once per run and sized to the video
#[derive(Debug, Clone)]
pub struct Background {
    path: PathBuf,
    rgb: Frame,
    bgr: Frame,
}

impl Background {
    /// Load the image at `path` and scale it to `width` x `height`
    pub fn open<P: AsRef<Path>>(path: P, width: u32, height: u32) -> Result<Self> {
        let path = path.as_ref();
        let load_error = |reason: String| RemovalError::BackgroundLoad {
            path: path.display().to_string(),
            reason,
        };

        if !path.is_file() {
            return Err(load_error("no such file".to_string()).into());
        }

        let image = image::open(path).map_err(|e| load_error(e.to_string()))?;
        let mut background = Self::from_image(image.to_rgb8(), width, height);
        background.path = path.to_path_buf();

        debug!("Loaded background {:?} ({}x{})", path, width, height);
        Ok(background)
    }

    /// Build a background from an in-memory RGB image
    pub fn from_image(image: image::RgbImage, width: u32, height: u32) -> Self {
        let image = if image.width() != width || image.height() != height {
            image::imageops::resize(&image, width, height, FilterType::Lanczos3)
        } else {
            image
        };

        let rgb = Frame::new(0, PixelOrder::Rgb, image);
        let bgr = rgb.to_order(PixelOrder::Bgr);

        Self {
            path: PathBuf::new(),
            rgb,
            bgr,
        }
    }

    /// Where the image was loaded from (empty for in-memory backgrounds)
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    pub fn height(&self) -> u32 {
        self.rgb.height()
    }

    /// The background pixels in the requested channel order
    pub fn in_order(&self, order: PixelOrder) -> &Frame {
        match order {
            PixelOrder::Rgb => &self.rgb,
            PixelOrder::Bgr => &self.bgr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    #[test]
    fn test_background_is_resized_and_kept_in_both_orders() {
        let image = ImageBuffer::from_pixel(4, 4, Rgb([10u8, 20, 30]));
        let background = Background::from_image(image, 8, 6);

        assert_eq!(background.width(), 8);
        assert_eq!(background.height(), 6);

        // Resampling a flat image may be off by one from rounding
        let close = |a: [u8; 3], b: [u8; 3]| a.iter().zip(b).all(|(x, y)| x.abs_diff(y) <= 1);
        assert!(close(background.in_order(PixelOrder::Rgb).get_pixel(3, 3), [10, 20, 30]));
        assert!(close(background.in_order(PixelOrder::Bgr).get_pixel(3, 3), [30, 20, 10]));
    }

    #[test]
    fn test_missing_background_file() {
        let err = Background::open("/nonexistent/green-screen.png", 16, 16).unwrap_err();
        match err {
            crate::error::BackdropError::Removal(RemovalError::BackgroundLoad { path, .. }) => {
                assert!(path.ends_with("green-screen.png"));
            }
            other => panic!("expected BackgroundLoad, got {}", other),
        }
    }

    #[test]
    fn test_background_from_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bg.png");
        ImageBuffer::from_pixel(2, 2, Rgb([0u8, 0, 255])).save(&path).unwrap();

        let background = Background::open(&path, 2, 2).unwrap();
        assert_eq!(background.path(), path.as_path());
        assert_eq!(background.in_order(PixelOrder::Rgb).get_pixel(0, 0), [0, 0, 255]);
    }

    #[test]
    fn test_unreadable_background_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bg.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        assert!(Background::open(&path, 2, 2).is_err());
    }
}
