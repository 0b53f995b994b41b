use crate::providers::{ProviderError, RawPayload, TranscriptProvider, TranscriptSource};
use crate::transcript::VideoRef;
use crate::TranscriptError;

/// Payload of the first candidate the provider could satisfy
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPayload {
    pub source: TranscriptSource,
    pub payload: RawPayload,
}

/// Try candidates strictly in order, one provider call each.
///
/// A missing track moves on to the next candidate. Any other failure applies
/// to the whole video and ends the search.
pub async fn fetch_first(
    provider: &dyn TranscriptProvider,
    video: &VideoRef,
    candidates: &[TranscriptSource],
) -> Result<FetchedPayload, TranscriptError> {
    for (attempt, source) in candidates.iter().enumerate() {
        tracing::debug!(
            video = %video,
            source = %source,
            "Fetching caption track (attempt {}/{})",
            attempt + 1,
            candidates.len()
        );

        match provider.fetch(video, source).await {
            Ok(payload) => {
                tracing::info!(video = %video, source = %source, "Caption track fetched");
                return Ok(FetchedPayload {
                    source: source.clone(),
                    payload,
                });
            }
            Err(ProviderError::NotFoundForSource(detail)) => {
                tracing::debug!(video = %video, source = %source, "Track not available, trying next: {}", detail);
            }
            Err(err) => {
                tracing::warn!(video = %video, source = %source, "Fetching caption track failed: {}", err);
                return Err(err.into());
            }
        }
    }

    tracing::info!(video = %video, "No candidate track could be fetched");
    Err(TranscriptError::NotFound)
}
