use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use caption_relay::cli::{Cli, Commands};
use caption_relay::config::Config;
use caption_relay::output;
use caption_relay::providers::youtube::YtDlpProvider;
use caption_relay::server::{self, AppState};
use caption_relay::transcript::{TranscriptPipeline, VideoRef};
use caption_relay::utils::normalize_language_code;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.json_logs);

    // `config --init` writes defaults, so it must not require an existing file
    let config = if matches!(cli.command, Commands::Config { init: true, .. }) {
        Config::default()
    } else {
        Config::load(cli.config.as_deref()).await?
    };

    match cli.command {
        Commands::Serve { host, port } => {
            let provider = YtDlpProvider::new(config.provider.clone(), config.transcript.subtitle_format);
            if !provider.check_availability().await {
                tracing::warn!(
                    "{} is not available; requests will fail until it is installed: https://github.com/yt-dlp/yt-dlp",
                    config.provider.yt_dlp_path
                );
            }

            let pipeline = TranscriptPipeline::from_config(&config);
            let state = AppState::new(pipeline, config.request_timeout());
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            server::serve(state, &host, port).await?;
        }
        Commands::Fetch {
            video,
            lang,
            format,
            output: output_path,
            timestamps,
        } => {
            let video = VideoRef::parse(&video)?;
            let lang = lang.as_deref().and_then(normalize_language_code);
            let pipeline = TranscriptPipeline::from_config(&config);

            let progress = spinner(cli.quiet)?;
            progress.set_message(format!("Fetching captions for {}...", video));

            let result = pipeline
                .get_transcript_within(&video, lang.as_deref(), config.request_timeout())
                .await;
            progress.finish_and_clear();

            let transcript = result.with_context(|| format!("Could not fetch transcript for {}", video))?;
            tracing::info!(
                "Fetched {} cues from {} ({})",
                transcript.cues.len(),
                transcript.source(),
                caption_relay::utils::format_duration(transcript.duration())
            );

            match output_path {
                Some(path) => {
                    output::save_to_file(&transcript, &path, &format, timestamps).await?;
                    println!("Transcript saved to: {}", path.display());
                }
                None => {
                    output::print_to_console(&transcript, &format, timestamps)?;
                }
            }
        }
        Commands::Sources { video, lang } => {
            let video = VideoRef::parse(&video)?;
            let lang = lang.as_deref().and_then(normalize_language_code);
            let pipeline = TranscriptPipeline::from_config(&config);

            let progress = spinner(cli.quiet)?;
            progress.set_message(format!("Listing caption tracks for {}...", video));
            let result = pipeline.candidates(&video, lang.as_deref()).await;
            progress.finish_and_clear();

            let candidates = result.with_context(|| format!("Could not list caption tracks for {}", video))?;
            if candidates.is_empty() {
                println!("No caption tracks available for {}", video);
            } else {
                println!("Caption tracks for {} (in fetch order):", video);
                for (index, source) in candidates.iter().enumerate() {
                    println!("  {}. {}", index + 1, source);
                }
            }
        }
        Commands::Config { init, .. } => {
            if init {
                let path = config.save(cli.config.as_deref()).await?;
                println!("Configuration written to: {}", path.display());
            } else {
                config.display();
            }
        }
    }

    Ok(())
}

/// Logs go to stderr so transcript output on stdout stays machine-readable
fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose { "caption_relay=debug" } else { "caption_relay=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn spinner(quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }

    let progress = ProgressBar::new_spinner();
    progress.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    progress.enable_steady_tick(Duration::from_millis(120));
    Ok(progress)
}
