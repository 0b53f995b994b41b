use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod youtube;

use crate::transcript::VideoRef;

/// A caption track a provider can serve for a video
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "language", rename_all = "snake_case")]
pub enum TranscriptSource {
    /// Track authored by the uploader or a human
    Manual(String),

    /// Track produced by the platform's speech recognition
    AutoGenerated(String),
}

impl TranscriptSource {
    pub fn language(&self) -> &str {
        match self {
            TranscriptSource::Manual(lang) | TranscriptSource::AutoGenerated(lang) => lang,
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, TranscriptSource::AutoGenerated(_))
    }
}

impl fmt::Display for TranscriptSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptSource::Manual(lang) => write!(f, "manual:{}", lang),
            TranscriptSource::AutoGenerated(lang) => write!(f, "auto:{}", lang),
        }
    }
}

/// A single timed caption fragment as delivered by a provider
#[derive(Debug, Clone, PartialEq)]
pub struct RawCue {
    pub text: String,

    /// Start offset in seconds
    pub start: f64,

    /// Duration in seconds
    pub duration: f64,
}

/// Raw caption payload returned by a successful fetch
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    /// Line-oriented cue markup (WebVTT)
    CueMarkup(String),

    /// Already-structured timed segments
    Segments(Vec<RawCue>),
}

/// Failures reported by a provider call
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Track not available: {0}")]
    NotFoundForSource(String),

    #[error("Transcripts are disabled")]
    Disabled,

    #[error("Video unavailable")]
    VideoUnavailable,

    #[error("{0}")]
    Upstream(String),
}

/// Capability interface to an external caption provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    /// List the caption tracks offered for a video, in provider order
    async fn list_sources(&self, video: &VideoRef) -> Result<Vec<TranscriptSource>, ProviderError>;

    /// Retrieve one caption track
    async fn fetch(
        &self,
        video: &VideoRef,
        source: &TranscriptSource,
    ) -> Result<RawPayload, ProviderError>;

    /// Get the name of this provider
    fn provider_name(&self) -> &'static str;
}
