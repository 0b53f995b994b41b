use anyhow::Result;
use serde::Serialize;

use crate::providers::TranscriptSource;
use crate::transcript::{Cue, Transcript};
use crate::utils::format_offset;

/// Wire shape of a transcript response
#[derive(Debug, Serialize)]
pub struct TranscriptBody<'a> {
    pub video_id: &'a str,
    pub language: &'a str,
    pub transcript: &'a [Cue],
}

impl<'a> From<&'a Transcript> for TranscriptBody<'a> {
    fn from(transcript: &'a Transcript) -> Self {
        Self {
            video_id: &transcript.video_id,
            language: &transcript.language_code,
            transcript: &transcript.cues,
        }
    }
}

/// Wire shape of a flattened transcript response
#[derive(Debug, Serialize)]
pub struct PlainTextBody {
    pub text: String,
    pub language: String,
    /// `subtitles` for manual tracks, `auto_cc` for generated ones
    pub source: &'static str,
}

impl From<&Transcript> for PlainTextBody {
    fn from(transcript: &Transcript) -> Self {
        Self {
            text: transcript.plain_text(),
            language: transcript.language_code.clone(),
            source: match transcript.source() {
                TranscriptSource::Manual(_) => "subtitles",
                TranscriptSource::AutoGenerated(_) => "auto_cc",
            },
        }
    }
}

pub fn format_as_json(transcript: &Transcript) -> Result<String> {
    Ok(serde_json::to_string_pretty(&TranscriptBody::from(transcript))?)
}

pub fn format_as_text(transcript: &Transcript, include_timestamps: bool) -> String {
    if !include_timestamps {
        return transcript.plain_text();
    }

    transcript
        .cues
        .iter()
        .map(|cue| format!("[{}] {}", format_offset(cue.start), cue.text))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_as_srt(transcript: &Transcript) -> String {
    transcript
        .cues
        .iter()
        .enumerate()
        .map(|(index, cue)| {
            format!(
                "{}\n{} --> {}\n{}\n",
                index + 1,
                format_timestamp(cue.start, ','),
                format_timestamp(cue.end(), ','),
                cue.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_as_vtt(transcript: &Transcript) -> String {
    let mut out = format!("WEBVTT\nLanguage: {}\n", transcript.language_code);
    for cue in &transcript.cues {
        out.push_str(&format!(
            "\n{} --> {}\n{}\n",
            format_timestamp(cue.start, '.'),
            format_timestamp(cue.end(), '.'),
            cue.text
        ));
    }
    out
}

/// Format seconds as `HH:MM:SS<sep>mmm`
fn format_timestamp(seconds: f64, separator: char) -> String {
    let total_milliseconds = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    format!("{:02}:{:02}:{:02}{}{:03}", hours, minutes, secs, separator, millis)
}
