use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Transcript selection settings
    pub transcript: TranscriptConfig,

    /// yt-dlp provider settings
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Overall deadline for one transcript request
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    /// Language tried when the caller does not request one, and as the
    /// second choice when the requested one is missing
    pub default_language: String,

    /// Caption format requested from the provider
    pub subtitle_format: SubtitleFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Path or name of the yt-dlp binary
    pub yt_dlp_path: String,

    /// Netscape cookies file passed to yt-dlp
    pub cookies_file: Option<PathBuf>,

    /// Additional arguments appended to every yt-dlp call
    pub extra_args: Vec<String>,

    /// Parent directory for per-fetch scratch directories
    pub temp_dir: Option<PathBuf>,
}

/// Caption formats the provider can be asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    Vtt,
    Json3,
}

impl SubtitleFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubtitleFormat::Vtt => "vtt",
            SubtitleFormat::Json3 => "json3",
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            request_timeout_secs: 60,
        }
    }
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            default_language: "en".to_string(),
            subtitle_format: SubtitleFormat::Vtt,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            cookies_file: None,
            extra_args: Vec::new(),
            temp_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from the first file found, or fall back to defaults
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match Self::config_path() {
            Ok(config_path) if config_path.exists() => {
                tracing::debug!("Loading configuration from {}", config_path.display());
                Self::from_file(&config_path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Read and validate a YAML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;

        let config: Config =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file, returning the path written
    pub async fn save(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        let config_path = match explicit {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(&config_path, content).context("Failed to write config file")?;

        Ok(config_path)
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("caption-relay").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.transcript.default_language.trim().is_empty() {
            anyhow::bail!("transcript.default_language must not be empty");
        }

        if self.server.request_timeout_secs == 0 {
            anyhow::bail!("server.request_timeout_secs must be greater than zero");
        }

        if self.provider.yt_dlp_path.trim().is_empty() {
            anyhow::bail!("provider.yt_dlp_path must not be empty");
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Listen: {}:{}", self.server.host, self.server.port);
        println!("  Request Timeout: {}s", self.server.request_timeout_secs);
        println!("  Default Language: {}", self.transcript.default_language);
        println!("  Subtitle Format: {}", self.transcript.subtitle_format.as_str());
        println!("  yt-dlp: {}", self.provider.yt_dlp_path);
        if let Some(cookies) = &self.provider.cookies_file {
            println!("  Cookies: {}", cookies.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.transcript.default_language, "en");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs_err::write(
            &path,
            "transcript:\n  default_language: pl\n  subtitle_format: json3\nserver:\n  port: 9090\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.transcript.default_language, "pl");
        assert_eq!(config.transcript.subtitle_format, SubtitleFormat::Json3);
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.provider.yt_dlp_path, "yt-dlp");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs_err::write(&path, "server:\n  request_timeout_secs: 0\n").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("request_timeout_secs"));
    }

    #[tokio::test]
    async fn test_save_then_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = Config::default();
        config.provider.extra_args = vec!["--force-ipv4".to_string()];
        let written = config.save(Some(&path)).await.unwrap();
        assert_eq!(written, path);

        let loaded = Config::load(Some(&path)).await.unwrap();
        assert_eq!(loaded.provider.extra_args, vec!["--force-ipv4".to_string()]);
    }
}
