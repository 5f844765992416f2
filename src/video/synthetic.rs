use std::path::Path;

use tracing::info;

use crate::error::{BackdropError, Result};
use crate::video::ffmpeg::Toolkit;

/// A generated test clip: a solid "screen" color with a filled box standing
/// in for the subject, and an optional sine tone on the audio track.
#[derive(Debug, Clone)]
pub struct SyntheticClip {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub duration: f64,
    pub screen_color: [u8; 3],
    pub subject_color: [u8; 3],
    pub tone_hz: Option<f64>,
}

impl Default for SyntheticClip {
    fn default() -> Self {
        Self {
            width: 160,
            height: 120,
            fps: 30,
            duration: 10.0,
            screen_color: [0, 255, 0],
            subject_color: [255, 0, 0],
            tone_hz: Some(440.0),
        }
    }
}

impl SyntheticClip {
    /// Number of frames the rendered clip will contain
    pub fn frame_count(&self) -> u64 {
        (self.duration * self.fps as f64).round() as u64
    }

    /// Render the clip to `path` with ffmpeg's lavfi sources
    pub fn render(&self, toolkit: &Toolkit, path: &Path) -> Result<()> {
        let duration = format!("{}", self.duration);

        let mut cmd = toolkit.ffmpeg();
        cmd.args(["-y", "-f", "lavfi", "-i"]).arg(format!(
            "color=c=0x{}:s={}x{}:r={}:d={}",
            hex(self.screen_color),
            self.width,
            self.height,
            self.fps,
            duration
        ));

        if let Some(tone) = self.tone_hz {
            cmd.args(["-f", "lavfi", "-i"]).arg(format!(
                "sine=frequency={}:sample_rate=44100:duration={}",
                tone, duration
            ));
        }

        cmd.arg("-vf").arg(format!(
            "drawbox=x={}:y={}:w={}:h={}:color=0x{}@1:t=fill",
            self.width / 4,
            self.height / 4,
            self.width / 2,
            self.height / 2,
            hex(self.subject_color)
        ));

        cmd.args(["-c:v", "mpeg4", "-q:v", "2", "-pix_fmt", "yuv420p"]);
        if self.tone_hz.is_some() {
            cmd.args(["-c:a", "aac", "-b:a", "128k"]);
        }
        cmd.args(["-t", &duration]).arg(path);

        Toolkit::run(&mut cmd)
            .map_err(|reason| BackdropError::generic(format!("Rendering synthetic clip {:?} failed: {}", path, reason)))?;

        info!(
            "Rendered synthetic clip {:?}: {}x{} @ {} fps, {} frames",
            path,
            self.width,
            self.height,
            self.fps,
            self.frame_count()
        );
        Ok(())
    }
}

fn hex(color: [u8; 3]) -> String {
    format!("{:02X}{:02X}{:02X}", color[0], color[1], color[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_clip_matches_reference_scenario() {
        let clip = SyntheticClip::default();
        assert_eq!(clip.frame_count(), 300);
        assert_eq!(clip.tone_hz, Some(440.0));
    }

    #[test]
    fn test_render_failure_is_not_an_encode_error() {
        let toolkit = Toolkit::new("/nonexistent/ffmpeg-xyz", "/nonexistent/ffprobe-xyz");
        let err = SyntheticClip::default().render(&toolkit, Path::new("/tmp/never-written.mp4")).unwrap_err();

        assert!(matches!(err, BackdropError::Generic(_)), "{}", err);
        assert!(err.to_string().contains("synthetic clip"));
        assert!(!err.to_string().contains("chunk"));
    }

    #[test]
    fn test_hex_color() {
        assert_eq!(hex([0, 255, 16]), "00FF10");
    }
}
