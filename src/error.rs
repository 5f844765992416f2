use thiserror::Error;

/// Main error type for the Backdrop library
#[derive(Error, Debug)]
pub enum BackdropError {
    #[error("Video pipeline error: {0}")]
    Video(#[from] VideoError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Background removal error: {0}")]
    Removal(#[from] RemovalError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Errors raised while decoding, processing, encoding or concatenating video
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Failed to open source video {path}: {reason}")]
    SourceOpen { path: String, reason: String },

    #[error("Failed to decode frame {frame_index}: {reason}")]
    Decode { frame_index: u64, reason: String },

    #[error("Processing failed for frame {frame_index}{}: {reason}", chunk_suffix(.chunk_index))]
    Processing {
        chunk_index: Option<usize>,
        frame_index: u64,
        reason: String,
    },

    #[error("Encoding chunk {chunk_index} failed: {reason}")]
    Encode { chunk_index: usize, reason: String },

    #[error("Segment concatenation failed: {reason}")]
    Concat { reason: String },

    #[error("Required tool not found: {program}")]
    ToolMissing { program: String },
}

fn chunk_suffix(chunk_index: &Option<usize>) -> String {
    match chunk_index {
        Some(index) => format!(" (chunk {})", index),
        None => String::new(),
    }
}

/// Audio-specific errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Source has no audio track: {path}")]
    NoAudioTrack { path: String },

    #[error("Audio extraction failed: {reason}")]
    ExtractFailed { reason: String },

    #[error("Muxing audio onto video failed: {reason}")]
    Mux { reason: String },
}

/// Errors from the background-removal collaborator and its setup
#[derive(Error, Debug)]
pub enum RemovalError {
    #[error("Failed to load background image {path}: {reason}")]
    BackgroundLoad { path: String, reason: String },

    #[error("Could not separate foreground from background: {reason}")]
    Segmentation { reason: String },

    #[error("Unknown removal method: {name}")]
    UnknownMethod { name: String },

    #[error("Failed to initialize remover '{name}': {reason}")]
    Initialization { name: String, reason: String },

    #[error("Failed to build worker pool: {reason}")]
    WorkerPool { reason: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Output already exists: {path}")]
    OutputExists { path: String },
}

/// Convenience type alias for Results using BackdropError
pub type Result<T> = std::result::Result<T, BackdropError>;

impl BackdropError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Name of the pipeline stage this error belongs to
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Video(VideoError::SourceOpen { .. }) => "open",
            Self::Video(VideoError::Decode { .. }) => "decode",
            Self::Video(VideoError::Processing { .. }) => "process",
            Self::Video(VideoError::Encode { .. }) => "encode",
            Self::Video(VideoError::Concat { .. }) => "concatenate",
            Self::Video(VideoError::ToolMissing { .. }) => "toolkit",
            Self::Audio(AudioError::NoAudioTrack { .. }) => "extract-audio",
            Self::Audio(AudioError::ExtractFailed { .. }) => "extract-audio",
            Self::Audio(AudioError::Mux { .. }) => "mux",
            Self::Removal(_) => "process",
            Self::Config(_) => "config",
            Self::Io(_) | Self::Generic(_) => "pipeline",
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Video(VideoError::SourceOpen { path, .. }) => {
                format!("Could not open video '{}'. Please check the file exists and is a supported format.", path)
            }
            Self::Video(VideoError::ToolMissing { program }) => {
                format!("'{}' was not found. Please install FFmpeg or set its path under [toolkit].", program)
            }
            Self::Removal(RemovalError::BackgroundLoad { path, .. }) => {
                format!("Could not load background image '{}'.", path)
            }
            Self::Audio(AudioError::NoAudioTrack { path }) => {
                format!("'{}' has no audio track. Set pipeline.missing_audio = \"video_only\" to continue without audio.", path)
            }
            Self::Config(ConfigError::OutputExists { path }) => {
                format!("'{}' already exists. Pass --force to overwrite it.", path)
            }
            _ => format!("[{}] {}", self.stage(), self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_message_names_chunk_and_frame() {
        let err: BackdropError = VideoError::Processing {
            chunk_index: Some(2),
            frame_index: 217,
            reason: "no key".to_string(),
        }
        .into();

        let message = err.to_string();
        assert!(message.contains("frame 217"));
        assert!(message.contains("chunk 2"));
        assert_eq!(err.stage(), "process");
    }

    #[test]
    fn test_processing_message_without_chunk() {
        let err = VideoError::Processing {
            chunk_index: None,
            frame_index: 3,
            reason: "bad".to_string(),
        };
        assert_eq!(err.to_string(), "Processing failed for frame 3: bad");
    }

    #[test]
    fn test_stage_names() {
        let decode: BackdropError = VideoError::Decode { frame_index: 149, reason: "eof".into() }.into();
        assert_eq!(decode.stage(), "decode");

        let mux: BackdropError = AudioError::Mux { reason: "codec".into() }.into();
        assert_eq!(mux.stage(), "mux");

        let background: BackdropError = RemovalError::BackgroundLoad {
            path: "bg.png".into(),
            reason: "missing".into(),
        }
        .into();
        assert_eq!(background.stage(), "process");
        assert!(background.user_message().contains("bg.png"));
    }
}
