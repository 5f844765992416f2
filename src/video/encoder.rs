use std::borrow::Cow;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::process::Stdio;

use tracing::debug;

use crate::config::EncoderConfig;
use crate::error::{Result, VideoError};
use crate::video::ffmpeg::{drain_stderr, join_stderr, Toolkit};
use crate::video::types::{Frame, PixelOrder, ProcessedChunk, SegmentRef, VideoProperties};

/// Channel order the encoder consumes
pub const ENCODER_ORDER: PixelOrder = PixelOrder::Bgr;

/// Turns a processed chunk into a segment file
pub trait SegmentWriter: Send + Sync {
    fn write_segment(
        &self,
        chunk: &ProcessedChunk,
        dest: &Path,
        properties: &VideoProperties,
    ) -> Result<SegmentRef>;
}

/// Encodes one processed chunk into an intermediate segment file
///
/// All segments of a run are written with the same codec settings and the
/// same [`VideoProperties`], which is what lets the concatenator join them
/// without re-encoding.
#[derive(Debug, Clone)]
pub struct ChunkEncoder {
    toolkit: Toolkit,
    settings: EncoderConfig,
}

impl ChunkEncoder {
    pub fn new(toolkit: Toolkit, settings: EncoderConfig) -> Self {
        Self { toolkit, settings }
    }

    /// Encode `chunk` in order into `dest`
    pub fn write_chunk(
        &self,
        chunk: &ProcessedChunk,
        dest: &Path,
        properties: &VideoProperties,
    ) -> Result<SegmentRef> {
        let fail = |reason: String| VideoError::Encode {
            chunk_index: chunk.index,
            reason,
        };

        Self::check_frames(&chunk.frames, properties).map_err(fail)?;

        let mut cmd = self.toolkit.ffmpeg();
        cmd.args(["-y", "-f", "rawvideo"])
            .args(["-pix_fmt", ENCODER_ORDER.ffmpeg_pix_fmt()])
            .args(["-s", &format!("{}x{}", properties.width, properties.height)])
            .args(["-framerate", &properties.frame_rate.to_string()])
            .args(["-i", "-", "-an"])
            .args(["-c:v", &self.settings.codec])
            .args(self.quality_args())
            .args(["-pix_fmt", &self.settings.pixel_format])
            .arg(dest)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        debug!("Encoding chunk {} ({} frames) to {:?}", chunk.index, chunk.len(), dest);

        let mut process = cmd
            .spawn()
            .map_err(|e| fail(format!("failed to start encoder: {}", e)))?;
        let stderr = drain_stderr(&mut process);

        let write_result = match process.stdin.take() {
            Some(stdin) => Self::write_frames(stdin, &chunk.frames),
            None => Err("encoder stdin not captured".to_string()),
        };

        // stdin is closed at this point, so ffmpeg sees EOF and finishes
        let status = process
            .wait()
            .map_err(|e| fail(format!("failed to wait for encoder: {}", e)))?;
        let stderr = join_stderr(stderr);

        if let Err(reason) = write_result {
            return Err(fail(format!("{}: {}", reason, stderr)).into());
        }
        if !status.success() {
            return Err(fail(format!("encoder exited with {}: {}", status, stderr)).into());
        }

        let written = std::fs::metadata(dest).map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            return Err(fail(format!("segment {:?} is empty", dest)).into());
        }

        Ok(SegmentRef {
            chunk_index: chunk.index,
            path: dest.to_path_buf(),
            frame_count: chunk.len(),
            duration: chunk.len() as f64 * properties.frame_rate.frame_duration(),
        })
    }

    /// Every frame must match the run's dimensions and follow its predecessor
    fn check_frames(frames: &[Frame], properties: &VideoProperties) -> std::result::Result<(), String> {
        if frames.is_empty() {
            return Err("chunk has no frames".to_string());
        }

        let mut previous: Option<u64> = None;
        for frame in frames {
            if frame.width() != properties.width || frame.height() != properties.height {
                return Err(format!(
                    "frame {} is {}x{}, expected {}x{}",
                    frame.index(),
                    frame.width(),
                    frame.height(),
                    properties.width,
                    properties.height
                ));
            }

            if let Some(previous) = previous {
                if frame.index() <= previous {
                    return Err(format!(
                        "frame {} follows frame {}; frames are out of order",
                        frame.index(),
                        previous
                    ));
                }
            }
            previous = Some(frame.index());
        }

        Ok(())
    }

    fn write_frames<W: Write>(sink: W, frames: &[Frame]) -> std::result::Result<(), String> {
        let mut writer = BufWriter::with_capacity(1 << 20, sink);

        for frame in frames {
            let frame: Cow<'_, Frame> = if frame.order() == ENCODER_ORDER {
                Cow::Borrowed(frame)
            } else {
                Cow::Owned(frame.to_order(ENCODER_ORDER))
            };

            writer
                .write_all(frame.as_bytes())
                .map_err(|e| format!("failed to write frame {}: {}", frame.index(), e))?;
        }

        writer
            .flush()
            .map_err(|e| format!("failed to flush frames: {}", e))
    }

    fn quality_args(&self) -> Vec<String> {
        let quality = self.settings.quality.min(100);
        match self.settings.codec.as_str() {
            "libx264" | "libx265" => vec!["-crf".to_string(), quality_to_crf(quality).to_string()],
            _ => vec!["-q:v".to_string(), quality_to_qscale(quality).to_string()],
        }
    }
}

impl SegmentWriter for ChunkEncoder {
    fn write_segment(
        &self,
        chunk: &ProcessedChunk,
        dest: &Path,
        properties: &VideoProperties,
    ) -> Result<SegmentRef> {
        self.write_chunk(chunk, dest, properties)
    }
}

fn quality_to_crf(quality: u8) -> u8 {
    (51 - ((quality as f32 / 100.0) * 51.0) as u8).clamp(0, 51)
}

/// Map 0-100 onto mpeg4's qscale, 31 (worst) to 2 (best)
fn quality_to_qscale(quality: u8) -> u8 {
    (31 - ((quality as f32 / 100.0) * 29.0) as u8).clamp(2, 31)
}
