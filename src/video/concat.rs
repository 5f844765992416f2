use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Result, VideoError};
use crate::video::ffmpeg::Toolkit;
use crate::video::types::SegmentRef;

/// Ordered list of segment files fed to ffmpeg's concat demuxer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConcatManifest {
    entries: Vec<PathBuf>,
}

impl ConcatManifest {
    /// Build a manifest from segments, which must already be in chunk order
    pub fn from_segments(segments: &[SegmentRef]) -> std::result::Result<Self, String> {
        for pair in segments.windows(2) {
            if pair[1].chunk_index <= pair[0].chunk_index {
                return Err(format!(
                    "segment for chunk {} listed after chunk {}",
                    pair[1].chunk_index, pair[0].chunk_index
                ));
            }
        }

        Ok(Self {
            entries: segments.iter().map(|segment| segment.path.clone()).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Manifest text, one `file '...'` line per segment
    pub fn render(&self) -> String {
        let mut text = String::new();
        for entry in &self.entries {
            let _ = writeln!(text, "file '{}'", escape_path(entry));
        }
        text
    }

    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.render())
    }
}

/// Single quotes end a quoted string in the concat syntax, so they are
/// closed, escaped, and reopened.
fn escape_path(path: &Path) -> String {
    path.display().to_string().replace('\'', r"'\''")
}

/// The video-only result of joining all segments
#[derive(Debug, Clone)]
pub struct ConcatenatedVideo {
    pub path: PathBuf,
    pub frame_count: usize,
    pub duration: f64,
    pub segments: usize,
}

/// Joins encoded segments at the stream level, without re-encoding
#[derive(Debug, Clone)]
pub struct SegmentConcatenator {
    toolkit: Toolkit,
}

impl SegmentConcatenator {
    pub fn new(toolkit: Toolkit) -> Self {
        Self { toolkit }
    }

    /// Concatenate `segments` in order into `dest`
    ///
    /// The manifest is written to `manifest_path`. Segments are consumed: they
    /// are deleted once the joined file exists.
    pub async fn concatenate(
        &self,
        segments: &[SegmentRef],
        manifest_path: &Path,
        dest: &Path,
    ) -> Result<ConcatenatedVideo> {
        let fail = |reason: String| VideoError::Concat { reason };

        if segments.is_empty() {
            return Err(fail("no segments to concatenate".to_string()).into());
        }

        for segment in segments {
            let size = std::fs::metadata(&segment.path).map(|m| m.len()).unwrap_or(0);
            if size == 0 {
                return Err(fail(format!(
                    "segment for chunk {} is missing or empty: {:?}",
                    segment.chunk_index, segment.path
                ))
                .into());
            }
        }

        let manifest = ConcatManifest::from_segments(segments).map_err(fail)?;
        manifest
            .write_to(manifest_path)
            .map_err(|e| fail(format!("failed to write manifest {:?}: {}", manifest_path, e)))?;

        debug!("Concat manifest {:?}:\n{}", manifest_path, manifest.render());

        let mut cmd = self.toolkit.ffmpeg();
        cmd.args(["-y", "-f", "concat", "-safe", "0", "-i"])
            .arg(manifest_path)
            .args(["-c", "copy"])
            .arg(dest);

        Toolkit::run_async(cmd).await.map_err(fail)?;

        let frame_count = segments.iter().map(|s| s.frame_count).sum();
        let duration = segments.iter().map(|s| s.duration).sum();

        for segment in segments {
            if let Err(e) = std::fs::remove_file(&segment.path) {
                warn!("Failed to remove segment {:?}: {}", segment.path, e);
            }
        }

        info!(
            "Concatenated {} segments into {:?} ({} frames, {:.2}s)",
            segments.len(),
            dest,
            frame_count,
            duration
        );

        Ok(ConcatenatedVideo {
            path: dest.to_path_buf(),
            frame_count,
            duration,
            segments: segments.len(),
        })
    }
}
