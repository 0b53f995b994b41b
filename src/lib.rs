//! Caption Relay - fetch YouTube captions and serve them as normalized transcripts
//!
//! This library resolves a video reference to an ordered list of caption tracks,
//! fetches the first track the provider can satisfy, and normalizes WebVTT or
//! timed-JSON payloads into one canonical [`Transcript`].

pub mod cli;
pub mod config;
pub mod output;
pub mod providers;
pub mod server;
pub mod transcript;
pub mod utils;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use providers::{ProviderError, RawCue, RawPayload, TranscriptProvider, TranscriptSource};
pub use transcript::{Cue, Transcript, TranscriptPipeline, VideoRef};

/// Result type used by application glue
pub type Result<T> = anyhow::Result<T>;

/// Failure taxonomy returned by the transcript pipeline
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TranscriptError {
    #[error("Transcripts are disabled for this video")]
    Disabled,

    #[error("No transcript could be found for this video")]
    NotFound,

    #[error("The video is unavailable")]
    VideoUnavailable,

    #[error("Upstream provider failed: {0}")]
    UpstreamFailure(String),
}

impl TranscriptError {
    /// Stable machine-readable tag for this failure
    pub fn kind(&self) -> &'static str {
        match self {
            TranscriptError::Disabled => "disabled",
            TranscriptError::NotFound => "not_found",
            TranscriptError::VideoUnavailable => "video_unavailable",
            TranscriptError::UpstreamFailure(_) => "upstream_failure",
        }
    }
}

/// Input that could not be turned into a video reference
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum InvalidVideoRef {
    #[error("Video reference is empty")]
    Empty,

    #[error("Not a recognizable YouTube URL: {0}")]
    UnsupportedUrl(String),

    #[error("Invalid video id: {0}")]
    MalformedId(String),
}
