use std::fmt;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cue::validation::{time_seconds, MAX_TIME_SECONDS};

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Loads the bridge configuration from a YAML file.
///
/// The same file carries the input/output settings (read once at startup) and the
/// cue mapping (rebuilt into a fresh cue table whenever the file changes).
pub struct ConfigManager {
    config_path: PathBuf,
    config: BridgeConfig,
}

/// Top-level configuration file format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BridgeConfig {
    /// Substring of the MIDI input port carrying MSC sysex from the console.
    pub midi_in: Option<String>,
    pub osc_in: Option<OscInputConfig>,
    pub outputs: OutputsConfig,
    pub lights: LightsConfig,
    pub cue_mapping: Vec<CueMappingEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OscInputConfig {
    pub bind: SocketAddr,
    #[serde(default = "default_osc_address")]
    pub address: String,
}

fn default_osc_address() -> String {
    "/cue/fire".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OutputsConfig {
    pub osc: Option<OscOutputConfig>,
    pub midi_pc: Option<MidiOutputConfig>,
    pub qlab: Option<MidiOutputConfig>,
    pub keyboard_commands: bool,
    pub audio_files: bool,
    pub homeassistant: Option<HomeAssistantConfig>,
    pub sink_timeout_ms: u64,
}

impl OutputsConfig {
    pub fn sink_timeout(&self) -> Duration {
        Duration::from_millis(self.sink_timeout_ms)
    }
}

impl Default for OutputsConfig {
    fn default() -> Self {
        Self {
            osc: None,
            midi_pc: None,
            qlab: None,
            keyboard_commands: false,
            audio_files: false,
            homeassistant: None,
            sink_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OscOutputConfig {
    #[serde(default = "default_osc_ip")]
    pub ip: IpAddr,
    #[serde(default = "default_osc_port")]
    pub port: u16,
}

impl OscOutputConfig {
    pub fn target(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

fn default_osc_ip() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_osc_port() -> u16 {
    8765
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MidiOutputConfig {
    /// Substring of the MIDI output port name.
    pub name: String,
    /// 0-based MIDI channel.
    #[serde(default)]
    pub channel: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HomeAssistantConfig {
    pub url: String,
    /// Environment variable holding the long-lived access token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_entity_prefix")]
    pub entity_prefix: String,
}

fn default_token_env() -> String {
    "HAKEY".to_string()
}

fn default_entity_prefix() -> String {
    "light.house_light_".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LightsConfig {
    pub count: usize,
    /// Hold time per rainbow step. Defaults to the cue transition plus 0.1s.
    pub rainbow_dwell_seconds: Option<f64>,
}

impl LightsConfig {
    /// The configured rainbow hold time, if set and usable.
    pub fn rainbow_dwell(&self) -> Option<Duration> {
        self.rainbow_dwell_seconds
            .and_then(|seconds| time_seconds(seconds).ok())
            .filter(|dwell| !dwell.is_zero())
    }
}

impl Default for LightsConfig {
    fn default() -> Self {
        Self {
            count: 15,
            rainbow_dwell_seconds: None,
        }
    }
}

/// One `cue-mapping` entry. Every output is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CueMappingEntry {
    #[serde(alias = "light", deserialize_with = "deserialize_cue_key")]
    pub cue: String,
    /// 1-based sound desk scene; 0 means none.
    pub sound: u8,
    pub mute: Vec<u8>,
    pub unmute: Vec<u8>,
    pub fader: Vec<u8>,
    pub value: Vec<u8>,
    pub keyboard: Option<String>,
    pub file: Option<PathBuf>,
    #[serde(alias = "houselight")]
    pub houselights: Vec<u8>,
    pub rgbws: Vec<Vec<i64>>,
    pub transitions: Vec<f64>,
    pub effects: Vec<String>,
}

/// Accepts cue identifiers written as strings or numbers (`cue: 5`, `cue: "5.5"`).
fn deserialize_cue_key<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct CueKeyVisitor;

    impl Visitor<'_> for CueKeyVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a cue number or name")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.trim().to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(CueKeyVisitor)
}

impl BridgeConfig {
    /// Compare everything except the cue mapping.
    pub fn same_settings(&self, other: &BridgeConfig) -> bool {
        self.midi_in == other.midi_in
            && self.osc_in == other.osc_in
            && self.outputs == other.outputs
            && self.lights == other.lights
    }
}

impl ConfigManager {
    /// Create a new configuration manager.
    /// If no path is provided, defaults to `config.yaml` in the current working directory.
    pub fn new(config_path: Option<PathBuf>) -> Self {
        let config_path = config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        Self {
            config_path,
            config: BridgeConfig::default(),
        }
    }

    /// Load and validate the configuration file.
    pub fn load(&mut self) -> Result<BridgeConfig, ConfigError> {
        let config = Self::read(&self.config_path)?;
        Self::validate(&config).map_err(ConfigError::ValidationError)?;
        self.config = config;
        Ok(self.config.clone())
    }

    /// Read and parse a configuration file without touching any manager state.
    pub fn read(path: &Path) -> Result<BridgeConfig, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<BridgeConfig, ConfigError> {
        let config: BridgeConfig = serde_yaml::from_str(content)?;
        log::debug!("parsed config: {:?}", config);
        Ok(config)
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Validate the startup-only settings.
    pub fn validate(config: &BridgeConfig) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (name, output) in [
            ("midi-pc", &config.outputs.midi_pc),
            ("qlab", &config.outputs.qlab),
        ] {
            if let Some(output) = output {
                if output.channel > 15 {
                    errors.push(format!("{} channel must be between 0 and 15", name));
                }
                if output.name.is_empty() {
                    errors.push(format!("{} name must not be empty", name));
                }
            }
        }

        if config.lights.count == 0 || config.lights.count > u8::MAX as usize {
            errors.push(format!(
                "lights count must be between 1 and {}",
                u8::MAX
            ));
        }

        if let Some(dwell) = config.lights.rainbow_dwell_seconds {
            if dwell == 0.0 || time_seconds(dwell).is_err() {
                errors.push(format!(
                    "rainbow-dwell-seconds must be a positive number up to {}",
                    MAX_TIME_SECONDS
                ));
            }
        }

        if config.outputs.sink_timeout_ms == 0 {
            errors.push("sink-timeout-ms must be greater than zero".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("config path {0} does not name a file")]
    NotAFile(PathBuf),

    #[error("config validation errors: {}", .0.join(", "))]
    ValidationError(Vec<String>),

    #[error("failed to watch config file: {0}")]
    WatchError(#[from] notify::Error),
}
