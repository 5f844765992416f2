//! # Video Module
//!
//! Decoding, encoding and stream-level concatenation. Everything that touches
//! a container goes through the external ffmpeg/ffprobe tools; this module
//! only moves raw frames in and out of them.

pub mod concat;
pub mod encoder;
pub mod ffmpeg;
pub mod probe;
pub mod source;
pub mod synthetic;
pub mod types;

pub use concat::{ConcatManifest, ConcatenatedVideo, SegmentConcatenator};
pub use encoder::{ChunkEncoder, SegmentWriter, ENCODER_ORDER};
pub use ffmpeg::Toolkit;
pub use probe::MediaProbe;
pub use source::{FfmpegFrameSource, FrameSource, DECODER_ORDER};
pub use synthetic::SyntheticClip;
pub use types::{Chunk, Frame, FrameRate, PixelOrder, ProcessedChunk, SegmentRef, VideoProperties};
