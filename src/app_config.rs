use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Script parsing settings
    #[serde(default)]
    pub parser: ParserConfig,

    /// Batch synthesis settings
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Synthesis backend connection
    #[serde(default)]
    pub backend: BackendConfig,

    /// Where audio and archives are written
    #[serde(default)]
    pub output: OutputConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Script parsing configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ParserConfig {
    /// Treat a blank line as the end of a dialogue block.
    /// When false, any mixed-case line after a cue or dialogue is dialogue.
    #[serde(default)]
    pub blank_line_ends_dialogue: bool,

    /// Cleaned dialogue shorter than this is dropped
    #[serde(default = "default_min_dialogue_chars")]
    pub min_dialogue_chars: usize,

    /// Longest character name accepted as a cue
    #[serde(default = "default_max_cue_chars")]
    pub max_cue_chars: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            blank_line_ends_dialogue: false,
            min_dialogue_chars: default_min_dialogue_chars(),
            max_cue_chars: default_max_cue_chars(),
        }
    }
}

/// Batch synthesis configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SynthesisConfig {
    /// Size of the global worker pool shared by all batches
    #[serde(default = "default_concurrent_jobs")]
    pub concurrent_jobs: usize,

    /// Attempts per line, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff before a retry, doubled on each further attempt
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Extension of the audio files produced by the backend
    #[serde(default = "default_audio_extension")]
    pub audio_extension: String,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            concurrent_jobs: default_concurrent_jobs(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            audio_extension: default_audio_extension(),
        }
    }
}

/// Synthesis backend configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BackendConfig {
    // @field: Service URL
    #[serde(default = "default_backend_endpoint")]
    pub endpoint: String,

    // @field: API key, sent as a bearer token when set
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Timeout seconds per request
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: default_backend_endpoint(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Output configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OutputConfig {
    /// Root directory for staged audio and archives
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,

    /// Number of dialogue lines shown per character in previews
    #[serde(default = "default_preview_lines")]
    pub preview_lines: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            preview_lines: default_preview_lines(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching filter for the `log` facade
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_min_dialogue_chars() -> usize {
    1
}

fn default_max_cue_chars() -> usize {
    30
}

fn default_concurrent_jobs() -> usize {
    4
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_audio_extension() -> String {
    "wav".to_string()
}

fn default_backend_endpoint() -> String {
    "http://localhost:7860".to_string()
}

fn default_timeout_secs() -> u64 {
    120 // voice cloning is slow, one line can take a while
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("scriptvox_output")
}

fn default_preview_lines() -> usize {
    3
}

impl Config {
    /// Load the configuration from a JSON file, writing a default one if it is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write default config to file: {}", path.display()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.synthesis.concurrent_jobs == 0 {
            return Err(anyhow!("synthesis.concurrent_jobs must be at least 1"));
        }

        if self.synthesis.max_attempts == 0 {
            return Err(anyhow!("synthesis.max_attempts must be at least 1"));
        }

        let extension = &self.synthesis.audio_extension;
        if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(anyhow!("Invalid audio extension: '{}'", extension));
        }

        if self.parser.max_cue_chars < 2 {
            return Err(anyhow!("parser.max_cue_chars must be at least 2"));
        }

        let endpoint = url::Url::parse(&self.backend.endpoint)
            .with_context(|| format!("Invalid backend endpoint: {}", self.backend.endpoint))?;
        if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
            return Err(anyhow!("Backend endpoint must use http or https: {}", endpoint));
        }

        if self.backend.timeout_secs == 0 {
            return Err(anyhow!("backend.timeout_secs must be at least 1"));
        }

        Ok(())
    }
}
