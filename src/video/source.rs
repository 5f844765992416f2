use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use tracing::{debug, info};

use crate::error::{Result, VideoError};
use crate::video::ffmpeg::{drain_stderr, join_stderr, Toolkit};
use crate::video::probe::MediaProbe;
use crate::video::types::{Frame, PixelOrder, VideoProperties};

/// Forward-only supply of decoded frames
///
/// A source is finite and cannot be rewound: once `next_frame` has returned
/// `Ok(None)` it keeps doing so, and re-reading requires opening a new one.
pub trait FrameSource: Send {
    /// Properties captured when the source was opened
    fn properties(&self) -> VideoProperties;

    /// Decode the next frame, or `None` at end of stream
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Channel order the decoder emits
pub const DECODER_ORDER: PixelOrder = PixelOrder::Bgr;

/// Frame source backed by an ffmpeg process writing raw frames to a pipe
pub struct FfmpegFrameSource {
    path: PathBuf,
    properties: VideoProperties,
    process: Child,
    stdout: BufReader<ChildStdout>,
    stderr: Option<JoinHandle<String>>,
    frames_read: u64,
    finished: bool,
}

impl FfmpegFrameSource {
    /// Open `path` and read its video properties
    pub fn open<P: AsRef<Path>>(path: P, toolkit: &Toolkit) -> Result<Self> {
        let path = path.as_ref();
        let open_error = |reason: String| VideoError::SourceOpen {
            path: path.display().to_string(),
            reason,
        };

        if !path.is_file() {
            return Err(open_error("no such file".to_string()).into());
        }

        let properties = MediaProbe::new(toolkit.clone())
            .video_properties(path)
            .map_err(open_error)?;

        info!(
            "Opened {:?}: {}x{} @ {} fps",
            path, properties.width, properties.height, properties.frame_rate
        );

        // -s pins the output size so every read is exactly one frame
        let mut cmd = toolkit.ffmpeg();
        cmd.arg("-xerror")
            .arg("-i")
            .arg(path)
            .args(["-map", "0:v:0", "-f", "rawvideo"])
            .args(["-pix_fmt", DECODER_ORDER.ffmpeg_pix_fmt()])
            .args(["-s", &format!("{}x{}", properties.width, properties.height)])
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!("Starting decoder: {:?}", cmd);
        Self::spawn(path, properties, cmd)
    }

    /// Start `cmd` as the decoder; it must write raw frames matching `properties` to stdout
    fn spawn(path: &Path, properties: VideoProperties, mut cmd: Command) -> Result<Self> {
        let open_error = |reason: String| VideoError::SourceOpen {
            path: path.display().to_string(),
            reason,
        };

        let mut process = cmd
            .spawn()
            .map_err(|e| open_error(format!("failed to start decoder: {}", e)))?;

        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| open_error("decoder stdout not captured".to_string()))?;
        let stderr = drain_stderr(&mut process);

        Ok(Self {
            path: path.to_path_buf(),
            properties,
            process,
            stdout: BufReader::with_capacity(properties.frame_size() * 2, stdout),
            stderr,
            frames_read: 0,
            finished: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of frames handed out so far
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Reap the decoder at end of stream; a non-zero exit means a frame could not be decoded
    fn finish(&mut self) -> Result<()> {
        self.finished = true;

        let status = self.process.wait().map_err(|e| VideoError::Decode {
            frame_index: self.frames_read,
            reason: format!("failed to wait for decoder: {}", e),
        })?;
        let stderr = join_stderr(self.stderr.take());

        if !status.success() {
            return Err(VideoError::Decode {
                frame_index: self.frames_read,
                reason: format!("decoder exited with {}: {}", status, stderr),
            }
            .into());
        }

        debug!("Decoder finished after {} frames", self.frames_read);
        Ok(())
    }

    /// Stop the decoder mid-stream and reap it, keeping its diagnostics for `reason`
    fn abort(&mut self, reason: String) -> VideoError {
        self.finished = true;
        let _ = self.process.kill();
        let _ = self.process.wait();

        let stderr = join_stderr(self.stderr.take());
        let reason = if stderr.is_empty() {
            reason
        } else {
            format!("{}: {}", reason, stderr)
        };

        VideoError::Decode {
            frame_index: self.frames_read,
            reason,
        }
    }
}

impl FrameSource for FfmpegFrameSource {
    fn properties(&self) -> VideoProperties {
        self.properties
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.finished {
            return Ok(None);
        }

        let mut buffer = vec![0u8; self.properties.frame_size()];
        let filled = read_full(&mut self.stdout, &mut buffer).map_err(|e| VideoError::Decode {
            frame_index: self.frames_read,
            reason: format!("failed to read frame: {}", e),
        })?;

        if filled == 0 {
            self.finish()?;
            return Ok(None);
        }

        if filled < buffer.len() {
            let reason = format!("truncated frame ({} of {} bytes)", filled, buffer.len());
            return Err(self.abort(reason).into());
        }

        let frame = Frame::from_raw(
            self.frames_read,
            DECODER_ORDER,
            self.properties.width,
            self.properties.height,
            buffer,
        )
        .ok_or_else(|| VideoError::Decode {
            frame_index: self.frames_read,
            reason: "frame buffer does not match dimensions".to_string(),
        })?;

        self.frames_read += 1;
        Ok(Some(frame))
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.process.kill();
            let _ = self.process.wait();
        }
    }
}

/// Fill `buffer` from `reader`, returning how many bytes arrived before EOF
fn read_full<R: Read>(reader: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_full_reports_partial_reads() {
        let data = vec![7u8; 10];
        let mut reader = io::Cursor::new(data);

        let mut first = [0u8; 6];
        assert_eq!(read_full(&mut reader, &mut first).unwrap(), 6);

        let mut second = [0u8; 6];
        assert_eq!(read_full(&mut reader, &mut second).unwrap(), 4);

        let mut third = [0u8; 6];
        assert_eq!(read_full(&mut reader, &mut third).unwrap(), 0);
    }

    /// Source whose "decoder" is a shell script writing 2x2 BGR frames (12 bytes each)
    #[cfg(unix)]
    fn scripted_source(script: &str) -> FfmpegFrameSource {
        let properties = VideoProperties {
            frame_rate: crate::video::types::FrameRate::new(25, 1),
            width: 2,
            height: 2,
        };
        let mut cmd = Command::new("sh");
        cmd.args(["-c", script])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        FfmpegFrameSource::spawn(Path::new("scripted.mp4"), properties, cmd).unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn test_truncated_frame_reaps_decoder() {
        let mut source = scripted_source("printf abcdefghijklmnop; echo 'corrupt macroblock' >&2");

        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.index(), 0);

        match source.next_frame() {
            Err(crate::error::BackdropError::Video(VideoError::Decode { frame_index, reason })) => {
                assert_eq!(frame_index, 1);
                assert!(reason.contains("truncated frame (4 of 12 bytes)"), "{}", reason);
                assert!(reason.contains("corrupt macroblock"), "{}", reason);
            }
            Err(other) => panic!("expected Decode, got {}", other),
            Ok(_) => panic!("expected Decode"),
        }

        // Already waited on, so the exit status is cached
        assert!(source.process.try_wait().unwrap().is_some());
        assert!(source.stderr.is_none());
        assert!(source.next_frame().unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_decoder_failure_names_next_frame() {
        let mut source = scripted_source("printf abcdefghijkl; echo 'invalid data found' >&2; exit 3");

        assert!(source.next_frame().unwrap().is_some());

        match source.next_frame() {
            Err(crate::error::BackdropError::Video(VideoError::Decode { frame_index, reason })) => {
                assert_eq!(frame_index, 1);
                assert!(reason.contains("invalid data found"), "{}", reason);
            }
            Err(other) => panic!("expected Decode, got {}", other),
            Ok(_) => panic!("expected Decode"),
        }
        assert_eq!(source.frames_read(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_clean_exit_ends_stream() {
        let mut source = scripted_source("printf abcdefghijklABCDEFGHIJKL");

        assert_eq!(source.next_frame().unwrap().unwrap().index(), 0);
        assert_eq!(source.next_frame().unwrap().unwrap().index(), 1);
        assert!(source.next_frame().unwrap().is_none());
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_open_missing_file() {
        let result = FfmpegFrameSource::open("/definitely/not/here.mp4", &Toolkit::default());

        match result {
            Err(crate::error::BackdropError::Video(VideoError::SourceOpen { path, .. })) => {
                assert!(path.contains("not/here.mp4"));
            }
            Err(other) => panic!("expected SourceOpen, got {}", other),
            Ok(_) => panic!("expected SourceOpen"),
        }
    }
}
