use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, SeoError};
use crate::record::Language;

/// Default environment variable holding the API credential
pub const DEFAULT_API_KEY_ENV: &str = "GOOGLE_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub output: OutputConfig,
    pub client: ClientConfig,
    pub generation: GenerationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Directory containing the media files
    pub media_dir: PathBuf,
    /// Directory containing the transcript files
    pub transcript_dir: PathBuf,
    /// Extension of media files (without dot)
    pub media_extension: String,
    /// Extension of transcript files (without dot)
    pub transcript_extension: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for result snapshots and run reports
    pub dir: PathBuf,
    /// Name fragment embedded in every result file name
    pub file_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the generation API
    pub endpoint: String,
    /// Model used for generation
    pub model: String,
    /// Environment variable the API key is read from
    pub api_key_env: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Source text longer than this (in characters) is truncated before prompting
    pub max_source_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Languages generated for each item, in processing order
    pub languages: Vec<Language>,
    /// Regenerate items already present in every language store
    pub force_reprocess: bool,
    /// Regenerate items whose stored record has empty fields
    pub reprocess_degraded: bool,
    /// Process at most this many matched items
    pub max_items: Option<usize>,
    /// Write an intermediate snapshot every N processed items
    pub checkpoint_interval: usize,
    /// Pause between two languages of the same item (milliseconds)
    pub language_delay_ms: u64,
    /// Pause between two items (milliseconds)
    pub item_delay_ms: u64,
    /// Show a progress bar while processing
    pub show_progress: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: debug, info, warn, error
    pub level: String,
    /// Directory for rolling log files
    pub dir: PathBuf,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            media_dir: PathBuf::new(),
            transcript_dir: PathBuf::new(),
            media_extension: "mp4".to_string(),
            transcript_extension: "md".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            file_prefix: "video".to_string(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            temperature: 0.7,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
            timeout_secs: 300,
            max_source_chars: 15000,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            languages: vec![Language::Chinese, Language::English],
            force_reprocess: false,
            reprocess_degraded: false,
            max_items: None,
            checkpoint_interval: 5,
            language_delay_ms: 1000,
            item_delay_ms: 2000,
            show_progress: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: PathBuf::from("logs"),
        }
    }
}

impl GenerationConfig {
    pub fn language_delay(&self) -> Duration {
        Duration::from_millis(self.language_delay_ms)
    }

    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.item_delay_ms)
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SeoError::Configuration(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| SeoError::Configuration(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SeoError::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SeoError::Configuration(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Check everything a run needs before any item is touched
    pub fn validate(&self) -> Result<()> {
        if self.input.media_dir.as_os_str().is_empty() {
            return Err(SeoError::Configuration("Media directory is not set".to_string()));
        }
        if self.input.transcript_dir.as_os_str().is_empty() {
            return Err(SeoError::Configuration("Transcript directory is not set".to_string()));
        }
        if self.output.dir.as_os_str().is_empty() {
            return Err(SeoError::Configuration("Output directory is not set".to_string()));
        }
        if self.generation.languages.is_empty() {
            return Err(SeoError::Configuration("At least one language is required".to_string()));
        }
        let languages = &self.generation.languages;
        if let Some(duplicate) = languages
            .iter()
            .enumerate()
            .find_map(|(idx, lang)| languages[..idx].contains(lang).then_some(lang))
        {
            return Err(SeoError::Configuration(format!(
                "Language '{}' is listed more than once",
                duplicate
            )));
        }
        if self.generation.checkpoint_interval == 0 {
            return Err(SeoError::Configuration(
                "Checkpoint interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the API key from an explicit override or the configured environment variable
    pub fn resolve_api_key(&self, explicit: Option<&str>) -> Result<String> {
        let from_env = std::env::var(&self.client.api_key_env).ok();
        pick_api_key(explicit, from_env, &self.client.api_key_env)
    }
}

fn pick_api_key(explicit: Option<&str>, from_env: Option<String>, env_name: &str) -> Result<String> {
    explicit
        .map(str::to_string)
        .or(from_env)
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .ok_or_else(|| {
            SeoError::Configuration(format!(
                "No API key provided. Set the {} environment variable or pass --api-key",
                env_name
            ))
        })
}

/// Mask a credential for display, keeping only its edges
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() > 12 {
        let head: String = chars[..8].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "***".to_string()
    }
}
