use url::Url;

/// Check whether input should be treated as a URL rather than a bare id
pub fn looks_like_url(input: &str) -> bool {
    let lower = input.to_lowercase();
    lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.contains("youtube.com/")
        || lower.contains("youtu.be/")
}

/// Check if a host belongs to YouTube
pub fn is_youtube_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == "youtube.com"
        || host == "youtu.be"
        || host.ends_with(".youtube.com")
        || host == "youtube-nocookie.com"
        || host.ends_with(".youtube-nocookie.com")
}

/// Extract the video id from any common YouTube URL form
pub fn youtube_video_id(input: &str) -> Option<String> {
    let with_scheme = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    };
    let url = Url::parse(&with_scheme).ok()?;
    let host = url.host_str()?;
    if !is_youtube_host(host) {
        return None;
    }

    let non_empty = |value: &str| {
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    };

    // youtu.be/<id>
    if host.eq_ignore_ascii_case("youtu.be") {
        return url.path_segments()?.next().and_then(non_empty);
    }

    // youtube.com/watch?v=<id>
    if url.path().starts_with("/watch") {
        return url
            .query_pairs()
            .find(|(key, _)| key == "v")
            .and_then(|(_, value)| non_empty(&value));
    }

    // youtube.com/{shorts,embed,v,live}/<id>
    let mut segments = url.path_segments()?;
    let kind = segments.next().unwrap_or("");
    let id = segments.next().unwrap_or("");
    if matches!(kind, "shorts" | "embed" | "v" | "live") {
        return non_empty(id);
    }

    None
}

/// Local sanity check on a video id; the provider has the final say
pub fn is_plausible_video_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Normalize a caller-supplied language code (`pt_BR` becomes `pt-BR`)
pub fn normalize_language_code(lang: &str) -> Option<String> {
    let lang = lang.trim().replace('_', "-");
    if lang.is_empty() {
        None
    } else {
        Some(lang)
    }
}

/// Format a cue offset as `MM:SS` or `H:MM:SS`
pub fn format_offset(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}
