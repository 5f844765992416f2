use std::borrow::Cow;

use crate::error::{Result, VideoError};
use crate::removal::{Background, BackgroundRemover};
use crate::video::types::Frame;

/// Applies background replacement to a single frame
///
/// The processor converts the frame into the channel order its remover
/// expects and returns the remover's output in that order; converting back
/// to the encoder's order is the caller's job. The input frame is never
/// modified.
pub struct FrameProcessor<'a> {
    remover: &'a dyn BackgroundRemover,
}

impl<'a> FrameProcessor<'a> {
    pub fn new(remover: &'a dyn BackgroundRemover) -> Self {
        Self { remover }
    }

    pub fn process(&self, frame: &Frame, background: &Background) -> Result<Frame> {
        let order = self.remover.expected_order();
        let fail = |reason: String| VideoError::Processing {
            chunk_index: None,
            frame_index: frame.index(),
            reason,
        };

        let input: Cow<'_, Frame> = if frame.order() == order {
            Cow::Borrowed(frame)
        } else {
            Cow::Owned(frame.to_order(order))
        };

        let output = self
            .remover
            .replace_background(&input, background.in_order(order))
            .map_err(|e| fail(format!("{}: {}", self.remover.name(), e)))?;

        if output.width() != frame.width() || output.height() != frame.height() {
            return Err(fail(format!(
                "{} returned a {}x{} frame for a {}x{} input",
                self.remover.name(),
                output.width(),
                output.height(),
                frame.width(),
                frame.height()
            ))
            .into());
        }

        Ok(output.with_index(frame.index()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackdropError;
    use crate::video::types::PixelOrder;
    use image::{ImageBuffer, Rgb};

    /// Records the order it was handed and returns the background unchanged
    struct BackgroundOnly;

    impl BackgroundRemover for BackgroundOnly {
        fn name(&self) -> &str {
            "background-only"
        }

        fn replace_background(&self, frame: &Frame, background: &Frame) -> Result<Frame> {
            assert_eq!(frame.order(), PixelOrder::Rgb);
            assert_eq!(background.order(), PixelOrder::Rgb);
            Ok(background.clone())
        }
    }

    struct Shrinking;

    impl BackgroundRemover for Shrinking {
        fn name(&self) -> &str {
            "shrinking"
        }

        fn replace_background(&self, _frame: &Frame, _background: &Frame) -> Result<Frame> {
            Ok(Frame::new_filled(0, PixelOrder::Rgb, 1, 1, [0, 0, 0]))
        }
    }

    fn background() -> Background {
        Background::from_image(ImageBuffer::from_pixel(4, 4, Rgb([1u8, 2, 3])), 4, 4)
    }

    #[test]
    fn test_converts_to_remover_order_and_keeps_index() {
        let frame = Frame::new_filled(42, PixelOrder::Bgr, 4, 4, [9, 9, 9]);
        let processor_remover = BackgroundOnly;
        let processor = FrameProcessor::new(&processor_remover);

        let output = processor.process(&frame, &background()).unwrap();

        assert_eq!(output.index(), 42);
        assert_eq!(output.order(), PixelOrder::Rgb);
        assert_eq!(output.get_pixel(0, 0), [1, 2, 3]);
        assert_eq!(frame.order(), PixelOrder::Bgr);
        assert_eq!(frame.get_pixel(0, 0), [9, 9, 9]);
    }

    #[test]
    fn test_wrong_output_size_is_a_processing_error() {
        let frame = Frame::new_filled(7, PixelOrder::Rgb, 4, 4, [0, 0, 0]);
        let remover = Shrinking;

        match FrameProcessor::new(&remover).process(&frame, &background()) {
            Err(BackdropError::Video(VideoError::Processing { frame_index, reason, .. })) => {
                assert_eq!(frame_index, 7);
                assert!(reason.contains("1x1"));
            }
            other => panic!("expected Processing error, got {:?}", other.map(|f| f.index())),
        }
    }
}
