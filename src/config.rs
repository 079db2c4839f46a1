use crate::censor::CensorMode;
use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub engine: EngineSection,
    pub asr: AsrConfig,
    pub censor: CensorConfig,
}

/// Audio device configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub input_device: Option<String>,
    pub output_device: Option<String>,
    pub sample_rate: u32,
    pub channels: usize,
}

/// Delay and chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineSection {
    pub initial_delay_secs: f32,
    pub chunk_secs: f32,
}

/// Speech recognition configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AsrConfig {
    pub model: PathBuf,
    pub language: String,
    pub threads: Option<usize>,
    pub use_gpu: bool,
    pub vocal_filter: bool,
    pub timestamp_refiner: bool,
}

/// Censorship configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CensorConfig {
    pub lexicon: PathBuf,
    pub mode: CensorMode,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_device: None,
            output_device: None,
            sample_rate: defaults::SAMPLE_RATE,
            channels: defaults::CHANNELS,
        }
    }
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            initial_delay_secs: defaults::INITIAL_DELAY_SECONDS,
            chunk_secs: defaults::CHUNK_SECONDS,
        }
    }
}

impl Default for AsrConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from(defaults::DEFAULT_MODEL),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            threads: None,
            use_gpu: true,
            vocal_filter: true,
            timestamp_refiner: true,
        }
    }
}

impl Default for CensorConfig {
    fn default() -> Self {
        Self {
            lexicon: PathBuf::from(defaults::DEFAULT_LEXICON),
            mode: CensorMode::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing; invalid TOML is still
    /// an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - BLEEPD_MODEL → asr.model
    /// - BLEEPD_LEXICON → censor.lexicon
    /// - BLEEPD_INPUT_DEVICE → audio.input_device
    /// - BLEEPD_OUTPUT_DEVICE → audio.output_device
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("BLEEPD_MODEL")
            && !model.is_empty()
        {
            self.asr.model = PathBuf::from(model);
        }

        if let Ok(lexicon) = std::env::var("BLEEPD_LEXICON")
            && !lexicon.is_empty()
        {
            self.censor.lexicon = PathBuf::from(lexicon);
        }

        if let Ok(device) = std::env::var("BLEEPD_INPUT_DEVICE")
            && !device.is_empty()
        {
            self.audio.input_device = Some(device);
        }

        if let Ok(device) = std::env::var("BLEEPD_OUTPUT_DEVICE")
            && !device.is_empty()
        {
            self.audio.output_device = Some(device);
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/bleepd/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .expect("Could not determine config directory")
            .join("bleepd")
            .join("config.toml")
    }
}
