use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread::JoinHandle;

use tokio::task;
use tracing::debug;

use crate::config::ToolkitConfig;
use crate::error::{Result, VideoError};

/// Handle on the external ffmpeg / ffprobe executables
///
/// Every container and codec concern is delegated to these two tools; this
/// type only knows how to locate them and run them with consistent flags.
#[derive(Debug, Clone)]
pub struct Toolkit {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for Toolkit {
    fn default() -> Self {
        Self::from_config(&ToolkitConfig::default())
    }
}

impl Toolkit {
    pub fn new<P: Into<PathBuf>>(ffmpeg: P, ffprobe: P) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    pub fn from_config(config: &ToolkitConfig) -> Self {
        Self::new(config.ffmpeg.clone(), config.ffprobe.clone())
    }

    /// Check that both executables can be launched
    pub fn is_available(&self) -> bool {
        Self::responds(&self.ffmpeg) && Self::responds(&self.ffprobe)
    }

    /// Like [`is_available`](Self::is_available) but names the missing program
    pub fn ensure_available(&self) -> Result<()> {
        for program in [&self.ffmpeg, &self.ffprobe] {
            if !Self::responds(program) {
                return Err(VideoError::ToolMissing {
                    program: program.display().to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn responds(program: &Path) -> bool {
        Command::new(program)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// An ffmpeg command with quiet logging; stdin is left for the caller to set
    pub fn ffmpeg(&self) -> Command {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-hide_banner", "-loglevel", "error"]);
        cmd
    }

    pub fn ffprobe(&self) -> Command {
        let mut cmd = Command::new(&self.ffprobe);
        cmd.args(["-v", "error"]);
        cmd
    }

    /// Run a command to completion and fail with its stderr if it exits non-zero
    pub fn run(cmd: &mut Command) -> std::result::Result<Output, String> {
        debug!("Running {:?}", cmd);

        let output = cmd
            .stdin(Stdio::null())
            .output()
            .map_err(|e| format!("failed to launch {:?}: {}", cmd.get_program(), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "{:?} exited with {}: {}",
                cmd.get_program(),
                output.status,
                stderr.trim()
            ));
        }

        Ok(output)
    }

    /// [`run`](Self::run) on tokio's blocking pool
    pub async fn run_async(mut cmd: Command) -> std::result::Result<Output, String> {
        task::spawn_blocking(move || Self::run(&mut cmd))
            .await
            .map_err(|e| format!("tool task failed: {}", e))?
    }
}

/// Read a child's stderr on a helper thread so a chatty process never blocks
/// on a full pipe while we are busy with its stdin/stdout.
pub(crate) fn drain_stderr(child: &mut Child) -> Option<JoinHandle<String>> {
    let mut stderr = child.stderr.take()?;
    Some(std::thread::spawn(move || {
        let mut text = String::new();
        let _ = stderr.read_to_string(&mut text);
        text
    }))
}

/// Collect what a stderr drain thread captured
pub(crate) fn join_stderr(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .map(|text| text.trim().to_string())
        .unwrap_or_default()
}
