use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{AudioError, Result};
use crate::video::{ffmpeg::Toolkit, probe::MediaProbe};

/// An extracted audio track on disk
#[derive(Debug, Clone, PartialEq)]
pub struct AudioRef {
    pub path: PathBuf,
}

/// Pulls the first audio stream out of a source video without re-encoding
#[derive(Debug, Clone)]
pub struct AudioExtractor {
    toolkit: Toolkit,
    probe: MediaProbe,
}

impl AudioExtractor {
    pub fn new(toolkit: Toolkit) -> Self {
        let probe = MediaProbe::new(toolkit.clone());
        Self { toolkit, probe }
    }

    /// Whether `source` carries an audio stream at all
    pub fn has_audio(&self, source: &Path) -> Result<bool> {
        self.probe
            .has_audio(source)
            .map_err(|reason| AudioError::ExtractFailed { reason }.into())
    }

    /// Copy the first audio stream of `source` into `dest`
    ///
    /// `dest` should be a Matroska audio file (`.mka`) so any source codec can
    /// be stream-copied into it.
    pub async fn extract(&self, source: &Path, dest: &Path) -> Result<AudioRef> {
        if !self.has_audio(source)? {
            return Err(AudioError::NoAudioTrack {
                path: source.display().to_string(),
            }
            .into());
        }

        debug!("Extracting audio from {:?} to {:?}", source, dest);

        let mut cmd = self.toolkit.ffmpeg();
        cmd.arg("-y")
            .arg("-i")
            .arg(source)
            .args(["-map", "0:a:0", "-vn", "-sn", "-dn", "-c:a", "copy"])
            .arg(dest);

        Toolkit::run_async(cmd)
            .await
            .map_err(|reason| AudioError::ExtractFailed { reason })?;

        let size = std::fs::metadata(dest).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(AudioError::ExtractFailed {
                reason: format!("no audio data written to {:?}", dest),
            }
            .into());
        }

        info!("   Audio track extracted ({} bytes)", size);
        Ok(AudioRef {
            path: dest.to_path_buf(),
        })
    }
}
