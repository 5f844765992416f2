use std::path::Path;

use serde::Deserialize;

use crate::video::ffmpeg::Toolkit;
use crate::video::types::{FrameRate, VideoProperties};

/// Stream and container inspection through ffprobe's JSON writer
///
/// Methods return the failure reason as a plain string; callers wrap it in
/// the error variant of the stage they are running.
#[derive(Debug, Clone)]
pub struct MediaProbe {
    toolkit: Toolkit,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_read_frames: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

impl MediaProbe {
    pub fn new(toolkit: Toolkit) -> Self {
        Self { toolkit }
    }

    fn probe(&self, path: &Path, args: &[&str]) -> Result<ProbeOutput, String> {
        let mut cmd = self.toolkit.ffprobe();
        cmd.args(args).args(["-of", "json"]).arg(path);

        let output = Toolkit::run(&mut cmd)?;
        parse_probe_output(&output.stdout)
    }

    /// Frame rate and dimensions of the first video stream
    pub fn video_properties(&self, path: &Path) -> Result<VideoProperties, String> {
        let output = self.probe(
            path,
            &[
                "-select_streams", "v:0",
                "-show_entries", "stream=codec_name,width,height,r_frame_rate,avg_frame_rate",
            ],
        )?;
        video_properties_from(&output)
    }

    /// Whether the container holds at least one audio stream
    pub fn has_audio(&self, path: &Path) -> Result<bool, String> {
        let output = self.probe(path, &["-select_streams", "a", "-show_entries", "stream=codec_name"])?;
        Ok(!output.streams.is_empty())
    }

    /// Exact number of frames in the first video stream (decodes the whole stream)
    pub fn count_frames(&self, path: &Path) -> Result<u64, String> {
        let output = self.probe(
            path,
            &["-select_streams", "v:0", "-count_frames", "-show_entries", "stream=nb_read_frames"],
        )?;

        output
            .streams
            .first()
            .and_then(|stream| stream.nb_read_frames.as_deref())
            .and_then(|count| count.trim().parse().ok())
            .ok_or_else(|| format!("{}: no frame count reported", path.display()))
    }

    /// Container duration in seconds
    pub fn duration(&self, path: &Path) -> Result<f64, String> {
        let output = self.probe(path, &["-show_entries", "format=duration"])?;

        output
            .format
            .and_then(|format| format.duration)
            .and_then(|duration| duration.trim().parse().ok())
            .ok_or_else(|| format!("{}: no duration reported", path.display()))
    }
}

fn parse_probe_output(stdout: &[u8]) -> Result<ProbeOutput, String> {
    serde_json::from_slice(stdout).map_err(|e| format!("unreadable ffprobe output: {}", e))
}

fn video_properties_from(output: &ProbeOutput) -> Result<VideoProperties, String> {
    let stream = output
        .streams
        .first()
        .ok_or_else(|| "no video stream".to_string())?;

    let width = stream.width.filter(|w| *w > 0).ok_or("missing width")?;
    let height = stream.height.filter(|h| *h > 0).ok_or("missing height")?;

    let frame_rate = [&stream.r_frame_rate, &stream.avg_frame_rate]
        .into_iter()
        .flatten()
        .find_map(|text| FrameRate::parse(text))
        .ok_or_else(|| {
            format!(
                "no usable frame rate for {} stream",
                stream.codec_name.as_deref().unwrap_or("unknown")
            )
        })?;

    Ok(VideoProperties {
        frame_rate,
        width,
        height,
    })
}
