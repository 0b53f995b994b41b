use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempDir;
use tokio::process::Command;

use super::{ProviderError, RawCue, RawPayload, TranscriptProvider, TranscriptSource};
use crate::config::{ProviderConfig, SubtitleFormat};
use crate::transcript::VideoRef;

/// stderr phrases yt-dlp uses when the video itself cannot be served
const UNAVAILABLE_MARKERS: &[&str] = &[
    "video unavailable",
    "this video is unavailable",
    "this video is not available",
    "private video",
    "has been removed",
    "not available in your country",
    "sign in to confirm your age",
    "members-only content",
    "account associated with this video has been terminated",
    "incomplete youtube id",
];

const DISABLED_MARKERS: &[&str] = &[
    "subtitles are disabled",
    "transcripts are disabled",
    "captions are disabled",
];

/// Caption provider backed by the yt-dlp binary
pub struct YtDlpProvider {
    config: ProviderConfig,
    format: SubtitleFormat,
}

impl YtDlpProvider {
    pub fn new(config: ProviderConfig, format: SubtitleFormat) -> Self {
        Self { config, format }
    }

    /// Check if yt-dlp is available
    pub async fn check_availability(&self) -> bool {
        Command::new(&self.config.yt_dlp_path)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Run yt-dlp and return stdout, classifying failures from stderr
    async fn run(&self, args: Vec<String>) -> Result<Vec<u8>, ProviderError> {
        let mut command = Command::new(&self.config.yt_dlp_path);
        if let Some(cookies) = &self.config.cookies_file {
            command.arg("--cookies").arg(cookies);
        }
        command.args(&self.config.extra_args).args(&args);

        tracing::debug!("Running {} {}", self.config.yt_dlp_path, args.join(" "));

        let output = command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                ProviderError::Upstream(format!(
                    "Failed to run {}: {}",
                    self.config.yt_dlp_path, e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!("yt-dlp failed ({}): {}", output.status, stderr.trim());
            return Err(classify_failure(&stderr, output.status.code()));
        }

        Ok(output.stdout)
    }

    /// Get video information using yt-dlp
    async fn get_video_info(&self, video: &VideoRef) -> Result<Value, ProviderError> {
        let stdout = self
            .run(vec![
                "--dump-json".to_string(),
                "--skip-download".to_string(),
                "--no-playlist".to_string(),
                "--no-warnings".to_string(),
                video.watch_url(),
            ])
            .await?;

        serde_json::from_slice(&stdout)
            .map_err(|e| ProviderError::Upstream(format!("Invalid yt-dlp metadata: {}", e)))
    }

    fn scratch_dir(&self) -> Result<TempDir, ProviderError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("caption-relay-");
        let dir = match &self.config.temp_dir {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        };
        dir.map_err(|e| ProviderError::Upstream(format!("Failed to create temporary directory: {}", e)))
    }

    fn fetch_args(&self, video: &VideoRef, source: &TranscriptSource, output_template: &Path) -> Vec<String> {
        let (write_flag, skip_flag) = match source {
            TranscriptSource::Manual(_) => ("--write-subs", "--no-write-auto-subs"),
            TranscriptSource::AutoGenerated(_) => ("--write-auto-subs", "--no-write-subs"),
        };
        let format_preference = match self.format {
            SubtitleFormat::Vtt => "vtt/best",
            SubtitleFormat::Json3 => "json3/vtt/best",
        };

        vec![
            "--skip-download".to_string(),
            write_flag.to_string(),
            skip_flag.to_string(),
            "--sub-langs".to_string(),
            source.language().to_string(),
            "--sub-format".to_string(),
            format_preference.to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--output".to_string(),
            output_template.to_string_lossy().to_string(),
            video.watch_url(),
        ]
    }
}

#[async_trait]
impl TranscriptProvider for YtDlpProvider {
    async fn list_sources(&self, video: &VideoRef) -> Result<Vec<TranscriptSource>, ProviderError> {
        let info = self.get_video_info(video).await?;
        let sources = listing_sources(&info)?;
        tracing::debug!(video = %video, "yt-dlp lists {} caption tracks", sources.len());
        Ok(sources)
    }

    async fn fetch(
        &self,
        video: &VideoRef,
        source: &TranscriptSource,
    ) -> Result<RawPayload, ProviderError> {
        let scratch = self.scratch_dir()?;
        let template = scratch.path().join("%(id)s");

        self.run(self.fetch_args(video, source, &template)).await?;

        let Some(path) = locate_caption_file(scratch.path(), video, source.language()).await else {
            return Err(ProviderError::NotFoundForSource(source.to_string()));
        };

        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            ProviderError::Upstream(format!("Failed to read {}: {}", path.display(), e))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("vtt") | Some("srt") => Ok(RawPayload::CueMarkup(content)),
            Some("json3") => Ok(RawPayload::Segments(parse_json3(&content)?)),
            other => Err(ProviderError::Upstream(format!(
                "Unsupported caption format: {}",
                other.unwrap_or("unknown")
            ))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "yt-dlp"
    }
}

/// Caption tracks of a listing, or `Disabled` when the video carries no
/// caption tracks of any kind
///
/// yt-dlp exits successfully for videos with captions turned off and simply
/// reports empty track maps.
pub fn listing_sources(info: &Value) -> Result<Vec<TranscriptSource>, ProviderError> {
    let track_count = ["subtitles", "automatic_captions"]
        .iter()
        .filter_map(|key| info.get(*key).and_then(Value::as_object))
        .map(|tracks| tracks.len())
        .sum::<usize>();
    if track_count == 0 {
        return Err(ProviderError::Disabled);
    }

    Ok(parse_listing(info))
}

/// Caption tracks from yt-dlp metadata: manual tracks first, then automatic ones
pub fn parse_listing(info: &Value) -> Vec<TranscriptSource> {
    let manual = track_languages(info, "subtitles")
        .into_iter()
        .map(TranscriptSource::Manual);
    let automatic = track_languages(info, "automatic_captions")
        .into_iter()
        .map(TranscriptSource::AutoGenerated);

    manual.chain(automatic).collect()
}

fn track_languages(info: &Value, key: &str) -> Vec<String> {
    let Some(tracks) = info.get(key).and_then(Value::as_object) else {
        return Vec::new();
    };

    tracks
        .iter()
        .filter(|(lang, formats)| {
            lang.as_str() != "live_chat"
                && formats.as_array().map_or(true, |formats| !formats.is_empty())
        })
        .map(|(lang, _)| lang.clone())
        .collect()
}

/// Map a failed yt-dlp run onto the provider error taxonomy
pub fn classify_failure(stderr: &str, exit_code: Option<i32>) -> ProviderError {
    let lowered = stderr.to_lowercase();

    if DISABLED_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        return ProviderError::Disabled;
    }
    if UNAVAILABLE_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        return ProviderError::VideoUnavailable;
    }

    let detail = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(|line| line.trim_start_matches("ERROR:").trim().to_string());

    match (detail, exit_code) {
        (Some(detail), _) => ProviderError::Upstream(detail),
        (None, Some(code)) => ProviderError::Upstream(format!("yt-dlp exited with status {}", code)),
        (None, None) => ProviderError::Upstream("yt-dlp was terminated by a signal".to_string()),
    }
}

/// Find `<id>.<lang>.<ext>` written by yt-dlp
async fn locate_caption_file(dir: &Path, video: &VideoRef, language: &str) -> Option<PathBuf> {
    let prefix = format!("{}.{}.", video.as_str(), language);
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;

    let mut matches = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let is_match = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(&prefix));
        if is_match {
            matches.push(path);
        }
    }

    matches.sort();
    matches.into_iter().next()
}

#[derive(Debug, Deserialize)]
struct Json3Document {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
struct Json3Event {
    #[serde(rename = "tStartMs", default)]
    start_ms: u64,
    #[serde(rename = "dDurationMs", default)]
    duration_ms: u64,
    segs: Option<Vec<Json3Segment>>,
}

#[derive(Debug, Deserialize)]
struct Json3Segment {
    #[serde(default)]
    utf8: String,
}

/// Parse YouTube timed-text JSON into raw cues
pub fn parse_json3(content: &str) -> Result<Vec<RawCue>, ProviderError> {
    let document: Json3Document = serde_json::from_str(content)
        .map_err(|e| ProviderError::Upstream(format!("Malformed json3 payload: {}", e)))?;

    let cues = document
        .events
        .into_iter()
        .filter_map(|event| {
            let segs = event.segs?;
            let text: String = segs.iter().map(|seg| seg.utf8.as_str()).collect();
            Some(RawCue {
                text: html_escape::decode_html_entities(&text).replace('\n', " "),
                start: event.start_ms as f64 / 1000.0,
                duration: event.duration_ms as f64 / 1000.0,
            })
        })
        .collect();

    Ok(cues)
}
