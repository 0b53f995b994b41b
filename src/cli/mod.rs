use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "caption-relay",
    about = "Caption Relay - Fetch YouTube captions as normalized JSON transcripts",
    version,
    long_about = "Fetches caption tracks for YouTube videos through yt-dlp, trying manual captions before auto-generated ones, and serves them as one canonical transcript shape over HTTP or on the command line."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to ./config.yaml or the user config directory)
    #[arg(short, long, global = true, value_name = "FILE", env = "CAPTION_RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP transcript service
    Serve {
        /// Interface to bind (overrides config)
        #[arg(long, env = "CAPTION_RELAY_HOST")]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long, env = "CAPTION_RELAY_PORT")]
        port: Option<u16>,
    },

    /// Fetch the transcript of one video
    Fetch {
        /// Video id or YouTube URL
        #[arg(value_name = "VIDEO")]
        video: String,

        /// Preferred caption language (defaults to the configured language)
        #[arg(short, long, value_name = "LANG", env = "CAPTION_RELAY_LANG")]
        lang: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Include cue offsets in text output
        #[arg(long)]
        timestamps: bool,
    },

    /// Show the caption tracks of a video in the order they would be tried
    Sources {
        /// Video id or YouTube URL
        #[arg(value_name = "VIDEO")]
        video: String,

        /// Preferred caption language (defaults to the configured language)
        #[arg(short, long, value_name = "LANG", env = "CAPTION_RELAY_LANG")]
        lang: Option<String>,
    },

    /// Show or create the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Write a default configuration file
        #[arg(long, conflicts_with = "show")]
        init: bool,
    },
}

#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum OutputFormat {
    /// JSON transcript
    Json,
    /// Plain text
    Text,
    /// SRT subtitle format
    Srt,
    /// WebVTT format
    Vtt,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Srt => write!(f, "srt"),
            OutputFormat::Vtt => write!(f, "vtt"),
        }
    }
}
