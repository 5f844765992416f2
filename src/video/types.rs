use std::fmt;
use std::path::PathBuf;

use image::{ImageBuffer, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

/// Channel ordering of the three bytes that make up a pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelOrder {
    Rgb,
    Bgr,
}

impl PixelOrder {
    /// Name of the matching ffmpeg rawvideo pixel format
    pub fn ffmpeg_pix_fmt(self) -> &'static str {
        match self {
            PixelOrder::Rgb => "rgb24",
            PixelOrder::Bgr => "bgr24",
        }
    }
}

/// A single decoded video frame
///
/// The pixel data lives in a three-channel image buffer; whether the channels
/// are red-green-blue or blue-green-red is recorded in [`PixelOrder`]. The
/// frame also remembers its position in the source video so that ordering can
/// be checked after parallel processing.
#[derive(Clone, Debug)]
pub struct Frame {
    index: u64,
    order: PixelOrder,
    buffer: RgbImage,
}

impl Frame {
    /// Create a new frame from a three-channel buffer in the given order
    pub fn new(index: u64, order: PixelOrder, buffer: RgbImage) -> Self {
        Self { index, order, buffer }
    }

    /// Create a new frame with the given dimensions filled with the specified color
    ///
    /// `color` is interpreted in `order`.
    pub fn new_filled(index: u64, order: PixelOrder, width: u32, height: u32, color: [u8; 3]) -> Self {
        let buffer = ImageBuffer::from_fn(width, height, |_, _| Rgb(color));
        Self { index, order, buffer }
    }

    /// Create a frame from raw interleaved bytes
    pub fn from_raw(index: u64, order: PixelOrder, width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        ImageBuffer::from_raw(width, height, data).map(|buffer| Self { index, order, buffer })
    }

    /// Position of this frame in the source video
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Re-tag the frame with a source position
    pub fn with_index(mut self, index: u64) -> Self {
        self.index = index;
        self
    }

    /// Channel order of the pixel data
    pub fn order(&self) -> PixelOrder {
        self.order
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Get a pixel at the given coordinates, in the frame's own channel order
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.buffer.get_pixel(x, y).0
    }

    /// Set a pixel at the given coordinates, in the frame's own channel order
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        self.buffer.put_pixel(x, y, Rgb(color));
    }

    /// Raw interleaved pixel bytes
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    /// Return a copy of this frame with its channels in `order`
    pub fn to_order(&self, order: PixelOrder) -> Frame {
        self.clone().into_order(order)
    }

    /// Convert this frame to `order` in place, consuming it
    pub fn into_order(mut self, order: PixelOrder) -> Frame {
        if self.order != order {
            // RGB <-> BGR is the same swap in both directions
            for pixel in self.buffer.pixels_mut() {
                pixel.0.swap(0, 2);
            }
            self.order = order;
        }
        self
    }
}

/// Rational frame rate as reported by the container, e.g. 30000/1001
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    pub fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    pub fn as_f64(&self) -> f64 {
        if self.den == 0 {
            0.0
        } else {
            self.num as f64 / self.den as f64
        }
    }

    /// Duration of a single frame in seconds
    pub fn frame_duration(&self) -> f64 {
        if self.num == 0 {
            0.0
        } else {
            self.den as f64 / self.num as f64
        }
    }

    /// Parse ffprobe's "num/den" notation (plain integers are accepted too)
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (num, den) = match text.split_once('/') {
            Some((num, den)) => (num.trim().parse().ok()?, den.trim().parse().ok()?),
            None => (text.parse().ok()?, 1),
        };

        if num == 0 || den == 0 {
            return None;
        }
        Some(Self { num, den })
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Properties read once from the source and shared by every segment of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoProperties {
    pub frame_rate: FrameRate,
    pub width: u32,
    pub height: u32,
}

impl VideoProperties {
    /// Bytes occupied by one packed 24-bit frame
    pub fn frame_size(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// An ordered, bounded batch of consecutive source frames
#[derive(Debug, Clone)]
pub struct Chunk {
    pub index: usize,
    pub frames: Vec<Frame>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// A chunk after background replacement, in the same order as its input
#[derive(Debug, Clone)]
pub struct ProcessedChunk {
    pub index: usize,
    pub frames: Vec<Frame>,
}

impl ProcessedChunk {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// An encoded intermediate segment on disk, one per chunk
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentRef {
    pub chunk_index: usize,
    pub path: PathBuf,
    pub frame_count: usize,
    /// Nominal duration derived from the frame count and frame rate
    pub duration: f64,
}
