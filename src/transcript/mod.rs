use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::providers::youtube::YtDlpProvider;
use crate::providers::{ProviderError, TranscriptProvider, TranscriptSource};
use crate::{InvalidVideoRef, TranscriptError};

pub mod fetcher;
pub mod normalizer;
pub mod sources;

/// Validated reference to a single video
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoRef(String);

impl VideoRef {
    /// Accept a bare video id or any common YouTube URL form
    pub fn parse(input: &str) -> Result<Self, InvalidVideoRef> {
        let input = input.trim();
        if input.is_empty() {
            return Err(InvalidVideoRef::Empty);
        }

        let id = if crate::utils::looks_like_url(input) {
            crate::utils::youtube_video_id(input)
                .ok_or_else(|| InvalidVideoRef::UnsupportedUrl(input.to_string()))?
        } else {
            input.to_string()
        };

        if !crate::utils::is_plausible_video_id(&id) {
            return Err(InvalidVideoRef::MalformedId(id));
        }

        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch URL handed to the provider
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One caption fragment of a normalized transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub text: String,

    /// Start offset in seconds
    pub start: f64,

    /// Duration in seconds
    pub duration: f64,
}

impl Cue {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Canonical transcript with the metadata of the track that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub video_id: String,

    /// Language of the track actually fetched
    pub language_code: String,

    pub is_generated: bool,

    /// Cues in source order
    pub cues: Vec<Cue>,
}

impl Transcript {
    /// All cue text joined with single spaces
    pub fn plain_text(&self) -> String {
        self.cues
            .iter()
            .map(|cue| cue.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The track this transcript was read from
    pub fn source(&self) -> TranscriptSource {
        if self.is_generated {
            TranscriptSource::AutoGenerated(self.language_code.clone())
        } else {
            TranscriptSource::Manual(self.language_code.clone())
        }
    }

    /// End of the last cue in seconds
    pub fn duration(&self) -> f64 {
        self.cues.last().map(Cue::end).unwrap_or(0.0)
    }
}

impl From<ProviderError> for TranscriptError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFoundForSource(_) => TranscriptError::NotFound,
            ProviderError::Disabled => TranscriptError::Disabled,
            ProviderError::VideoUnavailable => TranscriptError::VideoUnavailable,
            ProviderError::Upstream(detail) => TranscriptError::UpstreamFailure(detail),
        }
    }
}

/// Enumerate, fetch and normalize transcripts through one provider
#[derive(Clone)]
pub struct TranscriptPipeline {
    provider: Arc<dyn TranscriptProvider>,
    default_language: String,
}

impl TranscriptPipeline {
    pub fn new(provider: Arc<dyn TranscriptProvider>, default_language: impl Into<String>) -> Self {
        Self {
            provider,
            default_language: default_language.into(),
        }
    }

    /// Build a pipeline backed by yt-dlp
    pub fn from_config(config: &Config) -> Self {
        let provider = YtDlpProvider::new(
            config.provider.clone(),
            config.transcript.subtitle_format,
        );
        Self::new(Arc::new(provider), config.transcript.default_language.clone())
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Ordered candidate tracks for a video
    pub async fn candidates(
        &self,
        video: &VideoRef,
        requested_language: Option<&str>,
    ) -> Result<Vec<TranscriptSource>, TranscriptError> {
        let requested = self.resolve_language(requested_language);
        sources::enumerate(self.provider.as_ref(), video, requested, &self.default_language).await
    }

    /// Fetch the best available transcript for a video
    pub async fn get_transcript(
        &self,
        video: &VideoRef,
        requested_language: Option<&str>,
    ) -> Result<Transcript, TranscriptError> {
        let requested = self.resolve_language(requested_language);
        tracing::info!(video = %video, language = requested, "Resolving transcript");

        let candidates =
            sources::enumerate(self.provider.as_ref(), video, requested, &self.default_language)
                .await?;
        let fetched = fetcher::fetch_first(self.provider.as_ref(), video, &candidates).await?;

        normalizer::normalize(video, fetched.payload, &fetched.source)
    }

    /// Same as [`get_transcript`](Self::get_transcript) under an overall deadline
    pub async fn get_transcript_within(
        &self,
        video: &VideoRef,
        requested_language: Option<&str>,
        deadline: Duration,
    ) -> Result<Transcript, TranscriptError> {
        match tokio::time::timeout(deadline, self.get_transcript(video, requested_language)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(video = %video, "Transcript request timed out after {:?}", deadline);
                Err(TranscriptError::UpstreamFailure(format!(
                    "Request timed out after {:?}",
                    deadline
                )))
            }
        }
    }

    fn resolve_language<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .map(str::trim)
            .filter(|lang| !lang.is_empty())
            .unwrap_or(&self.default_language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{MockTranscriptProvider, RawCue, RawPayload};
    use async_trait::async_trait;
    use mockall::Sequence;
    use serde_json::json;

    fn video() -> VideoRef {
        VideoRef::parse("dQw4w9WgXcQ").unwrap()
    }

    fn pipeline(mock: MockTranscriptProvider) -> TranscriptPipeline {
        TranscriptPipeline::new(Arc::new(mock), "en")
    }

    fn segments(text: &str, start: f64, duration: f64) -> RawPayload {
        RawPayload::Segments(vec![RawCue {
            text: text.to_string(),
            start,
            duration,
        }])
    }

    #[test]
    fn test_video_ref_accepts_ids_and_urls() {
        assert_eq!(video().as_str(), "dQw4w9WgXcQ");
        assert_eq!(
            VideoRef::parse("https://youtu.be/dQw4w9WgXcQ").unwrap(),
            video()
        );
        assert_eq!(
            VideoRef::parse("  https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42 ").unwrap(),
            video()
        );
        assert_eq!(
            video().watch_url(),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_video_ref_rejects_bad_input() {
        assert_eq!(VideoRef::parse("   "), Err(InvalidVideoRef::Empty));
        assert!(matches!(
            VideoRef::parse("https://example.com/watch?v=abc"),
            Err(InvalidVideoRef::UnsupportedUrl(_))
        ));
        assert!(matches!(
            VideoRef::parse("abc def"),
            Err(InvalidVideoRef::MalformedId(_))
        ));
    }

    #[tokio::test]
    async fn test_manual_track_in_requested_language() {
        let mut mock = MockTranscriptProvider::new();
        mock.expect_list_sources().times(1).returning(|_| {
            Ok(vec![
                TranscriptSource::AutoGenerated("en".into()),
                TranscriptSource::Manual("en".into()),
            ])
        });
        mock.expect_fetch()
            .withf(|_, source| *source == TranscriptSource::Manual("en".into()))
            .times(1)
            .returning(|_, _| Ok(segments("Never gonna give you up", 0.0, 2.0)));

        let transcript = pipeline(mock)
            .get_transcript(&video(), Some("en"))
            .await
            .unwrap();

        assert!(!transcript.is_generated);
        assert_eq!(transcript.language_code, "en");

        let body = crate::output::format_as_json(&transcript).unwrap();
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            value,
            json!({
                "video_id": "dQw4w9WgXcQ",
                "language": "en",
                "transcript": [
                    {"text": "Never gonna give you up", "start": 0.0, "duration": 2.0}
                ]
            })
        );
    }

    #[tokio::test]
    async fn test_only_generated_tracks_marks_generated() {
        let mut mock = MockTranscriptProvider::new();
        mock.expect_list_sources()
            .returning(|_| Ok(vec![TranscriptSource::AutoGenerated("de".into())]));
        mock.expect_fetch()
            .times(1)
            .returning(|_, _| Ok(segments("Hallo", 0.5, 1.0)));

        let transcript = pipeline(mock)
            .get_transcript(&video(), Some("en"))
            .await
            .unwrap();

        assert!(transcript.is_generated);
        assert_eq!(transcript.language_code, "de");
        assert_eq!(
            transcript.source(),
            TranscriptSource::AutoGenerated("de".into())
        );
    }

    #[tokio::test]
    async fn test_listing_disabled_is_not_reported_as_not_found() {
        let mut mock = MockTranscriptProvider::new();
        mock.expect_list_sources()
            .returning(|_| Err(ProviderError::Disabled));
        mock.expect_fetch().never();

        let err = pipeline(mock)
            .get_transcript(&video(), None)
            .await
            .unwrap_err();
        assert_eq!(err, TranscriptError::Disabled);
    }

    #[tokio::test]
    async fn test_listing_unavailable_skips_fetch() {
        let mut mock = MockTranscriptProvider::new();
        mock.expect_list_sources()
            .times(1)
            .returning(|_| Err(ProviderError::VideoUnavailable));
        mock.expect_fetch().never();

        let err = pipeline(mock)
            .get_transcript(&video(), Some("en"))
            .await
            .unwrap_err();
        assert_eq!(err, TranscriptError::VideoUnavailable);
    }

    #[tokio::test]
    async fn test_fetch_disabled_aborts_remaining_candidates() {
        let mut mock = MockTranscriptProvider::new();
        mock.expect_list_sources().returning(|_| {
            Ok(vec![
                TranscriptSource::Manual("en".into()),
                TranscriptSource::AutoGenerated("en".into()),
            ])
        });
        mock.expect_fetch()
            .times(1)
            .returning(|_, _| Err(ProviderError::Disabled));

        let err = pipeline(mock)
            .get_transcript(&video(), Some("en"))
            .await
            .unwrap_err();
        assert_eq!(err, TranscriptError::Disabled);
    }

    #[tokio::test]
    async fn test_manual_other_language_tried_before_auto_requested() {
        let mut mock = MockTranscriptProvider::new();
        let mut seq = Sequence::new();
        mock.expect_list_sources().returning(|_| {
            Ok(vec![
                TranscriptSource::Manual("fr".into()),
                TranscriptSource::AutoGenerated("en".into()),
            ])
        });
        mock.expect_fetch()
            .withf(|_, source| *source == TranscriptSource::Manual("fr".into()))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, source| Err(ProviderError::NotFoundForSource(source.to_string())));
        mock.expect_fetch()
            .withf(|_, source| *source == TranscriptSource::AutoGenerated("en".into()))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(segments("hello", 0.0, 1.0)));

        let transcript = pipeline(mock)
            .get_transcript(&video(), Some("en"))
            .await
            .unwrap();
        assert!(transcript.is_generated);
        assert_eq!(transcript.language_code, "en");
    }

    #[tokio::test]
    async fn test_empty_listing_is_not_found() {
        let mut mock = MockTranscriptProvider::new();
        mock.expect_list_sources().returning(|_| Ok(Vec::new()));
        mock.expect_fetch().never();

        let err = pipeline(mock)
            .get_transcript(&video(), Some("en"))
            .await
            .unwrap_err();
        assert_eq!(err, TranscriptError::NotFound);
    }

    #[tokio::test]
    async fn test_repeated_calls_are_identical() {
        let mut mock = MockTranscriptProvider::new();
        mock.expect_list_sources()
            .times(2)
            .returning(|_| Ok(vec![TranscriptSource::Manual("en".into())]));
        mock.expect_fetch().times(2).returning(|_, _| {
            Ok(RawPayload::CueMarkup(
                "WEBVTT\n\n1\n00:00:01.000 --> 00:00:02.000\nHello world\n\n2\n00:00:02.000 --> 00:00:03.500\nSecond\n"
                    .to_string(),
            ))
        });

        let pipeline = pipeline(mock);
        let first = pipeline.get_transcript(&video(), Some("en")).await.unwrap();
        let second = pipeline.get_transcript(&video(), Some("en")).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(
            crate::output::format_as_json(&first).unwrap(),
            crate::output::format_as_json(&second).unwrap()
        );
        assert_eq!(first.plain_text(), "Hello world Second");
    }

    #[tokio::test]
    async fn test_missing_language_uses_default() {
        let mut mock = MockTranscriptProvider::new();
        mock.expect_list_sources().returning(|_| {
            Ok(vec![
                TranscriptSource::Manual("es".into()),
                TranscriptSource::Manual("en".into()),
            ])
        });

        let candidates = pipeline(mock).candidates(&video(), Some("  ")).await.unwrap();
        assert_eq!(candidates[0], TranscriptSource::Manual("en".into()));
        assert_eq!(candidates[1], TranscriptSource::Manual("es".into()));
    }

    struct SlowProvider;

    #[async_trait]
    impl TranscriptProvider for SlowProvider {
        async fn list_sources(
            &self,
            _video: &VideoRef,
        ) -> Result<Vec<TranscriptSource>, ProviderError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Vec::new())
        }

        async fn fetch(
            &self,
            _video: &VideoRef,
            _source: &TranscriptSource,
        ) -> Result<RawPayload, ProviderError> {
            Err(ProviderError::Upstream("unreachable".into()))
        }

        fn provider_name(&self) -> &'static str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_deadline_maps_to_upstream_failure() {
        let pipeline = TranscriptPipeline::new(Arc::new(SlowProvider), "en");
        let err = pipeline
            .get_transcript_within(&video(), None, Duration::from_millis(20))
            .await
            .unwrap_err();

        assert!(matches!(err, TranscriptError::UpstreamFailure(ref detail) if detail.contains("timed out")));
    }
}
