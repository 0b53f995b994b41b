use anyhow::Result;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::transcript::Transcript;

pub mod formatters;

pub use formatters::*;

/// Render a transcript in the requested format
pub fn render(transcript: &Transcript, format: &OutputFormat, include_timestamps: bool) -> Result<String> {
    let content = match format {
        OutputFormat::Json => format_as_json(transcript)?,
        OutputFormat::Text => format_as_text(transcript, include_timestamps),
        OutputFormat::Srt => format_as_srt(transcript),
        OutputFormat::Vtt => format_as_vtt(transcript),
    };
    Ok(content)
}

/// Save transcript to file
pub async fn save_to_file(
    transcript: &Transcript,
    path: &Path,
    format: &OutputFormat,
    include_timestamps: bool,
) -> Result<()> {
    let content = render(transcript, format, include_timestamps)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print transcript to console
pub fn print_to_console(
    transcript: &Transcript,
    format: &OutputFormat,
    include_timestamps: bool,
) -> Result<()> {
    let content = render(transcript, format, include_timestamps)?;
    println!("{}", content);
    Ok(())
}
