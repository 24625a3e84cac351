//! Configuration management for vodframes
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use crate::frames::Region;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding cached playlists and resolved URLs
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// HTTP client configuration
    #[serde(default)]
    pub http: HttpConfig,

    /// Playable-URL resolver configuration
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Frame decoder configuration
    #[serde(default)]
    pub decoder: DecoderConfig,

    /// OCR engine configuration
    #[serde(default)]
    pub ocr: OcrConfig,

    /// Drift correction thresholds
    #[serde(default)]
    pub drift: DriftConfig,

    /// Screen layout regions
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Relational store table names
    #[serde(default)]
    pub store: StoreConfig,

    /// Path the config was loaded from (internal)
    #[serde(skip)]
    pub config_file: PathBuf,
}

/// HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User agent string
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Segment download statuses that mean the fragment has no media
    #[serde(default = "default_absent_statuses")]
    pub absent_statuses: Vec<u16>,
}

/// Playable-URL resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Resolver executable
    #[serde(default = "default_resolver_program")]
    pub program: String,

    /// Arguments placed before the broadcast address
    #[serde(default = "default_resolver_args")]
    pub args: Vec<String>,

    /// Broadcast address passed to the resolver (`{id}` is substituted)
    #[serde(default = "default_address_template")]
    pub address_template: String,

    /// Shareable web URL (`{id}` and `{offset}` are substituted)
    #[serde(default = "default_web_url_template")]
    pub web_url_template: String,
}

/// Frame decoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Decoder executable (ffmpeg-compatible command line)
    #[serde(default = "default_decoder_program")]
    pub program: String,
}

/// OCR engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// OCR executable (tesseract-compatible command line)
    #[serde(default = "default_ocr_program")]
    pub program: String,

    /// Trained data directory
    #[serde(default = "default_ocr_data_dir")]
    pub data_dir: String,

    /// Language / model name
    #[serde(default = "default_ocr_language")]
    pub language: String,

    /// Config file restricting recognition to digits and separators
    #[serde(default = "default_ocr_digits_config")]
    pub digits_config: String,
}

/// Drift correction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftConfig {
    /// Seconds added to the logged time to get the expected capture time
    #[serde(default = "default_countdown_offset")]
    pub countdown_offset_secs: i64,

    /// Larger drift is rejected as implausible
    #[serde(default = "default_max_drift")]
    pub max_drift_secs: f64,

    /// Smaller drift reuses the uncorrected segment
    #[serde(default = "default_correction_threshold")]
    pub correction_threshold_secs: f64,
}

/// Output geometry used from `first_frame` onwards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputLayout {
    pub first_frame: i64,
    pub region: Region,
}

/// Screen layout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Region holding the on-screen clock
    #[serde(default = "default_clock_region")]
    pub clock_region: Region,

    /// Output regions keyed by the first frame id they apply to
    #[serde(default = "default_output_layouts")]
    pub output_regions: Vec<OutputLayout>,
}

/// Relational store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Event log table (`id`, `date`)
    #[serde(default = "default_input_table")]
    pub input_table: String,

    /// Broadcast index table (`id`, `recorded_at`, `length`)
    #[serde(default = "default_broadcast_table")]
    pub broadcast_table: String,
}

fn default_output_layouts() -> Vec<OutputLayout> {
    vec![
        OutputLayout {
            first_frame: 0,
            region: default_output_region(),
        },
        OutputLayout {
            first_frame: default_layout_change_frame(),
            region: default_late_output_region(),
        },
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            http: HttpConfig::default(),
            resolver: ResolverConfig::default(),
            decoder: DecoderConfig::default(),
            ocr: OcrConfig::default(),
            drift: DriftConfig::default(),
            layout: LayoutConfig::default(),
            store: StoreConfig::default(),
            config_file: PathBuf::new(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout(),
            absent_statuses: default_absent_statuses(),
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            program: default_resolver_program(),
            args: default_resolver_args(),
            address_template: default_address_template(),
            web_url_template: default_web_url_template(),
        }
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            program: default_decoder_program(),
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            program: default_ocr_program(),
            data_dir: default_ocr_data_dir(),
            language: default_ocr_language(),
            digits_config: default_ocr_digits_config(),
        }
    }
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            countdown_offset_secs: default_countdown_offset(),
            max_drift_secs: default_max_drift(),
            correction_threshold_secs: default_correction_threshold(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            clock_region: default_clock_region(),
            output_regions: default_output_layouts(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            input_table: default_input_table(),
            broadcast_table: default_broadcast_table(),
        }
    }
}

impl LayoutConfig {
    /// Output region for a frame: the last layout whose `first_frame` is not after it
    pub fn output_region(&self, frame_id: i64) -> Option<&Region> {
        self.output_regions
            .iter()
            .filter(|layout| layout.first_frame <= frame_id)
            .max_by_key(|layout| layout.first_frame)
            .map(|layout| &layout.region)
    }
}

impl Config {
    /// Get the default base directory for vodframes (~/.vodframes)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".vodframes")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.config_file = config_path.to_path_buf();

        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path, or from the default location when present
    ///
    /// A missing default config file means "use defaults"; a missing explicit
    /// path is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Self::default_config_path();
                if default_path.exists() {
                    Self::load(&default_path)
                } else {
                    debug!("No config file found, using defaults");
                    let mut config = Config::default();
                    config.config_file = default_path;
                    Ok(config)
                }
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.config_file, content)?;
        info!("Saved config to {:?}", self.config_file);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("drift.max_drift_secs", self.drift.max_drift_secs),
            ("drift.correction_threshold_secs", self.drift.correction_threshold_secs),
        ] {
            if !value.is_finite() {
                return Err(Error::Config(format!("{} must be a finite number", key)));
            }
        }

        if self.drift.correction_threshold_secs <= 0.0 {
            return Err(Error::Config(
                "drift.correction_threshold_secs must be positive".to_string(),
            ));
        }

        if self.drift.max_drift_secs <= self.drift.correction_threshold_secs {
            return Err(Error::Config(
                "drift.max_drift_secs must be > drift.correction_threshold_secs".to_string(),
            ));
        }

        if self.drift.countdown_offset_secs < 0 {
            return Err(Error::Config(
                "drift.countdown_offset_secs must not be negative".to_string(),
            ));
        }

        if self.http.timeout_secs == 0 {
            return Err(Error::Config(
                "http.timeout_secs must be positive".to_string(),
            ));
        }

        self.layout
            .clock_region
            .validate()
            .map_err(|e| Error::Config(format!("layout.clock_region: {}", e)))?;

        if self.layout.output_regions.is_empty() {
            return Err(Error::Config(
                "layout.output_regions must not be empty".to_string(),
            ));
        }

        for layout in &self.layout.output_regions {
            layout.region.validate().map_err(|e| {
                Error::Config(format!(
                    "layout.output_regions (first_frame {}): {}",
                    layout.first_frame, e
                ))
            })?;
        }

        for (key, table) in [
            ("store.input_table", &self.store.input_table),
            ("store.broadcast_table", &self.store.broadcast_table),
        ] {
            if !is_sql_identifier(table) {
                return Err(Error::Config(format!(
                    "{} must be a plain SQL identifier, got '{}'",
                    key, table
                )));
            }
        }

        Ok(())
    }
}

fn is_sql_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
