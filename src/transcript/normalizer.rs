//! Conversion of raw provider payloads into a canonical [`Transcript`].

use regex::Regex;
use std::sync::OnceLock;

use crate::providers::{RawCue, RawPayload, TranscriptSource};
use crate::transcript::{Cue, Transcript, VideoRef};
use crate::TranscriptError;

fn timing_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*((?:\d+:)?\d{1,2}:\d{2}[.,]\d{1,3})\s+-->\s+((?:\d+:)?\d{1,2}:\d{2}[.,]\d{1,3})(?:\s.*)?$")
            .expect("timing pattern is valid")
    })
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"))
}

/// Normalize a fetched payload into a transcript for the satisfying source
pub fn normalize(
    video: &VideoRef,
    payload: RawPayload,
    source: &TranscriptSource,
) -> Result<Transcript, TranscriptError> {
    let raw_cues = match payload {
        RawPayload::CueMarkup(markup) => parse_cue_markup(&markup)?,
        RawPayload::Segments(segments) => {
            validate_segments(&segments)?;
            segments
        }
    };

    let cues: Vec<Cue> = raw_cues
        .into_iter()
        .filter_map(|raw| {
            let text = raw.text.trim();
            (!text.is_empty()).then(|| Cue {
                text: text.to_string(),
                start: raw.start,
                duration: raw.duration,
            })
        })
        .collect();

    tracing::debug!(video = %video, source = %source, "Normalized {} cues", cues.len());

    Ok(Transcript {
        video_id: video.as_str().to_string(),
        language_code: source.language().to_string(),
        is_generated: source.is_generated(),
        cues,
    })
}

/// Parse WebVTT (or SRT) cue markup into raw cues
pub fn parse_cue_markup(markup: &str) -> Result<Vec<RawCue>, TranscriptError> {
    let markup = markup.trim_start_matches('\u{feff}').replace("\r\n", "\n").replace('\r', "\n");
    let mut cues = Vec::new();

    for block in split_blocks(&markup) {
        let first = block[0].trim();
        if first.starts_with("WEBVTT") || is_metadata_block(first) {
            continue;
        }

        let Some(timing_index) = block.iter().position(|line| line.contains("-->")) else {
            if block.iter().all(|line| is_cue_index(line)) {
                continue;
            }
            return Err(malformed(format!("cue text without timing line: {:?}", first)));
        };

        let (start_ms, end_ms) = parse_timing_line(block[timing_index])?;
        cues.push(RawCue {
            text: join_text_lines(&block[timing_index + 1..]),
            start: start_ms as f64 / 1000.0,
            duration: (end_ms - start_ms) as f64 / 1000.0,
        });
    }

    Ok(cues)
}

fn split_blocks(markup: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();

    for line in markup.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}

fn is_metadata_block(first_line: &str) -> bool {
    first_line == "NOTE"
        || first_line.starts_with("NOTE ")
        || first_line == "STYLE"
        || first_line == "REGION"
}

fn is_cue_index(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && line.chars().all(|c| c.is_ascii_digit())
}

fn parse_timing_line(line: &str) -> Result<(u64, u64), TranscriptError> {
    let captures = timing_pattern()
        .captures(line)
        .ok_or_else(|| malformed(format!("invalid timing line: {:?}", line.trim())))?;

    let start = parse_timestamp(&captures[1])?;
    let end = parse_timestamp(&captures[2])?;
    if end < start {
        return Err(malformed(format!("cue ends before it starts: {:?}", line.trim())));
    }

    Ok((start, end))
}

/// Parse `[HH:]MM:SS.mmm` into milliseconds
fn parse_timestamp(stamp: &str) -> Result<u64, TranscriptError> {
    let invalid = || malformed(format!("invalid timestamp: {:?}", stamp));

    let (clock, fraction) = stamp.split_once(['.', ',']).ok_or_else(invalid)?;
    let parts = clock
        .split(':')
        .map(|part| part.parse::<u64>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>, _>>()?;

    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (*h, *m, *s),
        [m, s] => (0, *m, *s),
        _ => return Err(invalid()),
    };
    if minutes >= 60 || seconds >= 60 {
        return Err(invalid());
    }

    // "5" means 500ms, "05" means 50ms
    let millis = format!("{:0<3}", fraction).parse::<u64>().map_err(|_| invalid())?;

    hours
        .checked_mul(60)
        .and_then(|total| total.checked_add(minutes))
        .and_then(|total| total.checked_mul(60))
        .and_then(|total| total.checked_add(seconds))
        .and_then(|total| total.checked_mul(1000))
        .and_then(|total| total.checked_add(millis))
        .ok_or_else(invalid)
}

fn join_text_lines(lines: &[&str]) -> String {
    lines
        .iter()
        .map(|line| {
            html_escape::decode_html_entities(&tag_pattern().replace_all(line, "")).into_owned()
        })
        .flat_map(|line| {
            line.split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn validate_segments(segments: &[RawCue]) -> Result<(), TranscriptError> {
    for (index, segment) in segments.iter().enumerate() {
        let valid = segment.start.is_finite()
            && segment.duration.is_finite()
            && segment.start >= 0.0
            && segment.duration >= 0.0;
        if !valid {
            return Err(malformed(format!(
                "segment {} has invalid timing (start {}, duration {})",
                index, segment.start, segment.duration
            )));
        }
    }
    Ok(())
}

fn malformed(detail: String) -> TranscriptError {
    TranscriptError::UpstreamFailure(format!("Malformed caption payload: {}", detail))
}
