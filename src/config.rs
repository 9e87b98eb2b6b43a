// config.rs

use crate::cli::Args;
use crate::error::ConfigError;
use config::{Config, Environment, File};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "solfa-bridge";
pub const DEFAULT_PORT_FILE: &str = "serialconfig.txt";
pub const ENV_PREFIX: &str = "SOLFA";

/// Every delay used by the link core. Tests shrink these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTimings {
    pub heartbeat_timeout: Duration,
    pub handshake_retries: u32,
    pub handshake_poll: Duration,
    pub settle: Duration,
    pub note_hold: Duration,
    pub frame: Duration,
}

impl Default for LinkTimings {
    fn default() -> Self {
        Self {
            heartbeat_timeout: crate::session::HEARTBEAT_TIMEOUT,
            handshake_retries: 5,
            handshake_poll: Duration::from_millis(200),
            settle: Duration::from_millis(200),
            note_hold: crate::dispatcher::NOTE_HOLD,
            frame: Duration::from_millis(16),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub root_note: u8,
    pub baud_rate: u32,
    pub timings: LinkTimings,
    pub midi_output: Option<String>,
    pub preferred_port: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            root_note: 60,
            baud_rate: crate::serial::DEFAULT_BAUD,
            timings: LinkTimings::default(),
            midi_output: None,
            preferred_port: None,
        }
    }
}

fn settings(file: Option<&Path>) -> Result<Config, ConfigError> {
    let defaults = BridgeConfig::default();
    let timings = defaults.timings;
    let file_source = match file {
        Some(path) => File::from(path.to_path_buf()).required(true),
        None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    Ok(Config::builder()
        .set_default("root_note", i64::from(defaults.root_note))?
        .set_default("baud_rate", i64::from(defaults.baud_rate))?
        .set_default("heartbeat_timeout_ms", timings.heartbeat_timeout.as_millis() as i64)?
        .set_default("handshake_retries", i64::from(timings.handshake_retries))?
        .set_default("handshake_poll_ms", timings.handshake_poll.as_millis() as i64)?
        .set_default("settle_ms", timings.settle.as_millis() as i64)?
        .set_default("note_hold_ms", timings.note_hold.as_millis() as i64)?
        .set_default("frame_ms", timings.frame.as_millis() as i64)?
        .set_default("port_file", DEFAULT_PORT_FILE)?
        .add_source(file_source)
        .add_source(Environment::with_prefix(ENV_PREFIX))
        .build()?)
}

fn get_ranged(settings: &Config, key: &str, min: i64, max: i64) -> Result<i64, ConfigError> {
    let value = settings.get_int(key)?;
    if value < min || value > max {
        return Err(ConfigError::Invalid(format!(
            "{} must be between {} and {}, got {}",
            key, min, max, value
        )));
    }
    Ok(value)
}

fn get_millis(settings: &Config, key: &str) -> Result<Duration, ConfigError> {
    let ms = get_ranged(settings, key, 0, i64::from(u32::MAX))?;
    Ok(Duration::from_millis(ms as u64))
}

fn get_optional_string(settings: &Config, key: &str) -> Option<String> {
    settings
        .get_string(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// First line of the preferred-port file, if the file exists and the line is not blank.
pub fn read_port_file(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(contents) => {
            let port = contents.lines().next().map(str::trim).unwrap_or_default();
            if port.is_empty() {
                debug!("Port file {} is empty", path.display());
                None
            } else {
                Some(port.to_string())
            }
        }
        Err(e) => {
            debug!("No port file at {}: {}", path.display(), e);
            None
        }
    }
}

impl BridgeConfig {
    /// Loads defaults, then the config file, then `SOLFA_*` environment variables.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let settings = settings(file)?;

        let root_note = get_ranged(&settings, "root_note", 0, 127 - 11)? as u8;
        let baud_rate = get_ranged(&settings, "baud_rate", 1, i64::from(u32::MAX))? as u32;
        let handshake_retries =
            get_ranged(&settings, "handshake_retries", 1, i64::from(u32::MAX))? as u32;

        let timings = LinkTimings {
            heartbeat_timeout: get_millis(&settings, "heartbeat_timeout_ms")?,
            handshake_retries,
            handshake_poll: get_millis(&settings, "handshake_poll_ms")?,
            settle: get_millis(&settings, "settle_ms")?,
            note_hold: get_millis(&settings, "note_hold_ms")?,
            frame: get_millis(&settings, "frame_ms")?,
        };

        let preferred_port = get_optional_string(&settings, "port_file")
            .map(PathBuf::from)
            .and_then(|path| read_port_file(&path));

        let config = BridgeConfig {
            root_note,
            baud_rate,
            timings,
            midi_output: get_optional_string(&settings, "midi_output"),
            preferred_port,
        };
        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Command-line flags win over every other source.
    pub fn apply_args(mut self, args: &Args) -> Result<Self, ConfigError> {
        if let Some(root) = args.root {
            if root > 127 - 11 {
                return Err(ConfigError::Invalid(format!(
                    "root note {} leaves no room for the scale",
                    root
                )));
            }
            self.root_note = root;
        }
        if let Some(port) = &args.port {
            info!("Preferred port from command line: {}", port);
            self.preferred_port = Some(port.clone());
        }
        if let Some(output) = &args.midi_output {
            self.midi_output = Some(output.clone());
        }
        if self.preferred_port.is_none() {
            warn!("No preferred port configured, scanning every serial port");
        }
        Ok(self)
    }
}
