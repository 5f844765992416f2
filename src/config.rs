use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Main configuration for Backdrop
///
/// Passed explicitly into [`PipelineOrchestrator`](crate::pipeline::PipelineOrchestrator);
/// nothing is read from global state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chunking, parallelism and run-level policies
    pub pipeline: PipelineConfig,

    /// Intermediate segment encoding
    pub encoder: EncoderConfig,

    /// Final audio mux
    pub audio: AudioConfig,

    /// Background removal method and its parameters
    pub removal: RemovalConfig,

    /// Locations of the external tools
    pub toolkit: ToolkitConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            key: "config".to_string(),
            value: e.to_string(),
        })?;
        Ok(content)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate()?;
        self.encoder.validate()?;
        self.audio.validate()?;
        self.removal.validate()?;
        Ok(())
    }
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Largest accepted `pipeline.chunk_size`; a chunk is held in memory whole
pub const MAX_CHUNK_SIZE: usize = 10_000;

/// What to do when the source video carries no audio track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingAudioPolicy {
    /// Fail the run with `NoAudioTrack`
    Abort,
    /// Emit the processed video without an audio track
    VideoOnly,
}

/// Pipeline-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Frames per chunk
    pub chunk_size: usize,

    /// Worker pool size; 0 uses one worker per CPU
    pub workers: usize,

    /// Processed chunks that may wait for the encoder; 0 processes and
    /// encodes each chunk strictly in turn
    pub encode_queue_depth: usize,

    pub missing_audio: MissingAudioPolicy,

    /// Parent directory for the per-run scratch workspace (system temp dir if unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_root: Option<PathBuf>,

    /// Replace an existing output file
    pub overwrite_output: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 100,
            workers: 0,
            encode_queue_depth: 1,
            missing_audio: MissingAudioPolicy::Abort,
            temp_root: None,
            overwrite_output: false,
        }
    }
}

impl PipelineConfig {
    /// Number of worker threads to start
    pub fn worker_threads(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }

    fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(invalid("pipeline.chunk_size", self.chunk_size).into());
        }

        if self.encode_queue_depth > 64 {
            return Err(invalid("pipeline.encode_queue_depth", self.encode_queue_depth).into());
        }

        Ok(())
    }
}

/// Segment encoding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// ffmpeg video encoder name
    pub codec: String,

    /// Quality setting (0-100, higher is better)
    pub quality: u8,

    /// Output pixel format
    pub pixel_format: String,

    /// Container extension for segments and the joined video
    pub container: String,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            codec: "mpeg4".to_string(),
            quality: 85,
            pixel_format: "yuv420p".to_string(),
            container: "mp4".to_string(),
        }
    }
}

impl EncoderConfig {
    fn validate(&self) -> Result<()> {
        if self.codec.trim().is_empty() {
            return Err(invalid("encoder.codec", &self.codec).into());
        }

        if self.quality > 100 {
            return Err(invalid("encoder.quality", self.quality).into());
        }

        if self.container.is_empty() || !self.container.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid("encoder.container", &self.container).into());
        }

        Ok(())
    }
}

/// Audio mux configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Encoder for the audio track of the final output
    pub codec: String,

    pub bitrate: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            codec: "aac".to_string(),
            bitrate: "192k".to_string(),
        }
    }
}

impl AudioConfig {
    fn validate(&self) -> Result<()> {
        if self.codec.trim().is_empty() {
            return Err(invalid("audio.codec", &self.codec).into());
        }
        Ok(())
    }
}

/// How remover instances are shared across the worker pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelPolicy {
    /// One instance, shared read-only by every worker thread
    Shared,
    /// One instance per worker thread, created once and reused for every chunk
    PerWorker,
}

/// Background removal configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemovalConfig {
    /// Registered remover name
    pub method: String,

    /// Screen color to key out; detected from the frame border when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_color: Option<[u8; 3]>,

    /// Color distance below which a pixel is fully background
    pub tolerance: f32,

    /// Width of the soft edge above `tolerance`
    pub softness: f32,

    /// Largest mean deviation of border pixels accepted when detecting the key
    pub max_border_spread: f32,

    pub model_policy: ModelPolicy,
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            method: "chroma".to_string(),
            key_color: None,
            tolerance: 60.0,
            softness: 40.0,
            max_border_spread: 40.0,
            model_policy: ModelPolicy::PerWorker,
        }
    }
}

impl RemovalConfig {
    fn validate(&self) -> Result<()> {
        if self.method.trim().is_empty() {
            return Err(invalid("removal.method", &self.method).into());
        }

        if !(self.tolerance >= 0.0) {
            return Err(invalid("removal.tolerance", self.tolerance).into());
        }

        if !(self.softness >= 0.0) {
            return Err(invalid("removal.softness", self.softness).into());
        }

        if !(self.max_border_spread > 0.0) {
            return Err(invalid("removal.max_border_spread", self.max_border_spread).into());
        }

        Ok(())
    }
}

/// External tool locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}
