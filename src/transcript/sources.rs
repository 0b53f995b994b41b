//! Candidate track enumeration.
//!
//! Manual tracks always come before generated ones. Within each tier the
//! requested language is tried first, then the configured default, then every
//! other language in the order the provider listed them.

use crate::providers::{TranscriptProvider, TranscriptSource};
use crate::transcript::VideoRef;
use crate::TranscriptError;

/// Query the provider listing once and order its tracks by preference
pub async fn enumerate(
    provider: &dyn TranscriptProvider,
    video: &VideoRef,
    requested_language: &str,
    default_language: &str,
) -> Result<Vec<TranscriptSource>, TranscriptError> {
    let listing = provider.list_sources(video).await.map_err(|err| {
        tracing::warn!(video = %video, "Listing caption tracks failed: {}", err);
        TranscriptError::from(err)
    })?;

    let candidates = order_candidates(&listing, requested_language, default_language);
    tracing::debug!(
        video = %video,
        "Candidate tracks: [{}]",
        candidates
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(candidates)
}

/// Order a provider listing into fetch candidates
pub fn order_candidates(
    listing: &[TranscriptSource],
    requested_language: &str,
    default_language: &str,
) -> Vec<TranscriptSource> {
    let (manual, generated): (Vec<&TranscriptSource>, Vec<&TranscriptSource>) =
        listing.iter().partition(|source| !source.is_generated());

    let mut ordered = Vec::with_capacity(listing.len());
    for tier in [manual, generated] {
        for language in [requested_language, default_language] {
            push_matching(&mut ordered, &tier, |lang| same_tag(lang, language));
            push_matching(&mut ordered, &tier, |lang| same_primary_subtag(lang, language));
        }
        push_matching(&mut ordered, &tier, |_| true);
    }

    ordered
}

fn push_matching<F>(ordered: &mut Vec<TranscriptSource>, tier: &[&TranscriptSource], accept: F)
where
    F: Fn(&str) -> bool,
{
    for source in tier {
        if accept(source.language()) && !ordered.contains(*source) {
            ordered.push((*source).clone());
        }
    }
}

fn same_tag(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

fn same_primary_subtag(a: &str, b: &str) -> bool {
    primary_subtag(a).eq_ignore_ascii_case(primary_subtag(b))
}

fn primary_subtag(tag: &str) -> &str {
    tag.split(['-', '_']).next().unwrap_or(tag)
}
