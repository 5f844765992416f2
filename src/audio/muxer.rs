use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::AudioConfig;
use crate::error::{AudioError, Result};
use crate::video::ffmpeg::Toolkit;

/// Combines the processed video with the original audio into the final output
#[derive(Debug, Clone)]
pub struct AudioMuxer {
    toolkit: Toolkit,
    settings: AudioConfig,
}

impl AudioMuxer {
    pub fn new(toolkit: Toolkit, settings: AudioConfig) -> Self {
        Self { toolkit, settings }
    }

    /// Stream-copy the video of `video`, encode the audio of `audio`, write `dest`
    ///
    /// The output ends with the shorter of the two streams.
    pub async fn mux(&self, video: &Path, audio: &Path, dest: &Path) -> Result<PathBuf> {
        let mut cmd = self.toolkit.ffmpeg();
        cmd.arg("-y")
            .arg("-i")
            .arg(video)
            .arg("-i")
            .arg(audio)
            .args(["-map", "0:v:0", "-map", "1:a:0", "-c:v", "copy"])
            .args(["-c:a", &self.settings.codec, "-b:a", &self.settings.bitrate])
            .arg("-shortest")
            .arg(dest);

        Toolkit::run_async(cmd)
            .await
            .map_err(|reason| AudioError::Mux { reason })?;

        info!("   Audio muxed into {:?}", dest);
        Ok(dest.to_path_buf())
    }

    /// Write `video` to `dest` without any audio track
    pub async fn video_only(&self, video: &Path, dest: &Path) -> Result<PathBuf> {
        let mut cmd = self.toolkit.ffmpeg();
        cmd.arg("-y")
            .arg("-i")
            .arg(video)
            .args(["-map", "0:v:0", "-c:v", "copy", "-an"])
            .arg(dest);

        Toolkit::run_async(cmd)
            .await
            .map_err(|reason| AudioError::Mux { reason })?;

        info!("   Video written without audio to {:?}", dest);
        Ok(dest.to_path_buf())
    }
}
