//! Process-wide configuration for zone dispatch.
//!
//! Configuration is resolved once, at the first call to [`get`], from three
//! layers in priority order:
//!
//! 1. A config installed programmatically via [`install`].
//! 2. `ZONAL_*` environment variables.
//! 3. Built-in defaults.
//!
//! With the `config-file` feature enabled, [`load_config_file`] parses a
//! TOML file into a [`ZoneConfig`] which can then be passed to [`install`].
//!
//! Individual zones can override the panic response locally by setting the
//! [`PANIC_RESPONSE`](crate::zone::PANIC_RESPONSE) extension; the process
//! config only supplies the default.

use crate::tracing_compat::warn;
use std::sync::OnceLock;

/// Environment variable controlling the default panic response.
///
/// Accepted values: `log`, `silent`, `propagate`.
pub const ENV_PANIC_RESPONSE: &str = "ZONAL_PANIC_RESPONSE";

/// Environment variable enabling debug-level logs for every zone
/// enter/leave transition.
pub const ENV_TRACE_TRANSITIONS: &str = "ZONAL_TRACE_TRANSITIONS";

/// Environment variable controlling the warning emitted when a patched
/// method finds no delegate on the active zone chain.
pub const ENV_WARN_MISSING_DELEGATE: &str = "ZONAL_WARN_MISSING_DELEGATE";

/// What a zone run does with a caught callback or hook panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanicResponse {
    /// Log the failure at error level and discard the result.
    #[default]
    Log,
    /// Discard the result without logging.
    Silent,
    /// Resume unwinding after the current zone has been restored.
    Propagate,
}

impl PanicResponse {
    /// Returns the lowercase name used in config files and env vars.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Silent => "silent",
            Self::Propagate => "propagate",
        }
    }

    /// Parses a config-file or env-var spelling, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "log" => Some(Self::Log),
            "silent" => Some(Self::Silent),
            "propagate" => Some(Self::Propagate),
            _ => None,
        }
    }
}

/// Process-wide defaults for zone dispatch behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneConfig {
    /// Default response to a panic caught during a zone run.
    pub panic_response: PanicResponse,
    /// Emit a debug-level log line for every zone enter and leave.
    pub trace_transitions: bool,
    /// Warn when a patched method is invoked but no zone on the active
    /// chain carries a delegate for it.
    pub warn_missing_delegate: bool,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            panic_response: PanicResponse::Log,
            trace_transitions: false,
            warn_missing_delegate: true,
        }
    }
}

impl ZoneConfig {
    /// Creates a config with the built-in defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default panic response.
    #[must_use]
    pub const fn with_panic_response(mut self, response: PanicResponse) -> Self {
        self.panic_response = response;
        self
    }

    /// Enables or disables transition logging.
    #[must_use]
    pub const fn with_trace_transitions(mut self, enabled: bool) -> Self {
        self.trace_transitions = enabled;
        self
    }

    /// Enables or disables the missing-delegate warning.
    #[must_use]
    pub const fn with_warn_missing_delegate(mut self, enabled: bool) -> Self {
        self.warn_missing_delegate = enabled;
        self
    }
}

/// Errors from configuration parsing or installation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable or config-file field held an unusable value.
    #[error("invalid value for {source_name}: expected {expected}, got {value:?}")]
    InvalidValue {
        /// The env var or config field that held the bad value.
        source_name: String,
        /// What the parser would have accepted.
        expected: &'static str,
        /// The offending value.
        value: String,
    },
    /// [`install`] was called after the config had already been resolved.
    #[error("configuration already installed")]
    AlreadyInstalled,
    /// The config file could not be read.
    #[cfg(feature = "config-file")]
    #[error("failed to read config file {path}")]
    Io {
        /// Path of the file that could not be read.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The config file could not be parsed as TOML.
    #[cfg(feature = "config-file")]
    #[error("failed to parse config file {path}")]
    Parse {
        /// Path of the file that could not be parsed.
        path: String,
        /// The underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
}

/// Applies `ZONAL_*` environment overrides to `config`.
///
/// Unset variables leave the corresponding field untouched. The first
/// malformed value aborts with [`ConfigError::InvalidValue`].
pub fn apply_env_overrides(config: &mut ZoneConfig) -> Result<(), ConfigError> {
    if let Some(value) = read_env(ENV_PANIC_RESPONSE) {
        config.panic_response = parse_panic_response(ENV_PANIC_RESPONSE, &value)?;
    }
    if let Some(value) = read_env(ENV_TRACE_TRANSITIONS) {
        config.trace_transitions = parse_bool(ENV_TRACE_TRANSITIONS, &value)?;
    }
    if let Some(value) = read_env(ENV_WARN_MISSING_DELEGATE) {
        config.warn_missing_delegate = parse_bool(ENV_WARN_MISSING_DELEGATE, &value)?;
    }
    Ok(())
}

fn read_env(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

fn parse_bool(source_name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            source_name: source_name.to_string(),
            expected: "a boolean (true/false, 1/0, yes/no, on/off)",
            value: value.to_string(),
        }),
    }
}

fn parse_panic_response(source_name: &str, value: &str) -> Result<PanicResponse, ConfigError> {
    PanicResponse::parse(value.trim()).ok_or_else(|| ConfigError::InvalidValue {
        source_name: source_name.to_string(),
        expected: "one of log, silent, propagate",
        value: value.to_string(),
    })
}

static CONFIG: OnceLock<ZoneConfig> = OnceLock::new();

/// Installs `config` as the process-wide configuration.
///
/// Must be called before the first zone run (or any other call to
/// [`get`]); once the config has been resolved it is frozen for the life
/// of the process.
pub fn install(config: ZoneConfig) -> Result<(), ConfigError> {
    CONFIG.set(config).map_err(|_| ConfigError::AlreadyInstalled)
}

/// Returns the process-wide configuration, resolving it on first use.
///
/// Resolution applies environment overrides on top of the defaults. A
/// malformed environment value is logged and ignored rather than failing
/// the run that happened to touch the config first.
pub fn get() -> &'static ZoneConfig {
    CONFIG.get_or_init(|| {
        let mut config = ZoneConfig::default();
        if let Err(err) = apply_env_overrides(&mut config) {
            warn!(error = %err, "ignoring invalid environment override");
            let _ = &err;
        }
        config
    })
}

#[cfg(feature = "config-file")]
mod file {
    use super::{ConfigError, PanicResponse, ZoneConfig};
    use std::path::Path;

    /// TOML mirror of [`ZoneConfig`]. All fields are optional; missing
    /// fields keep their defaults.
    ///
    /// ```toml
    /// [zone]
    /// panic_response = "log"
    /// trace_transitions = false
    /// warn_missing_delegate = true
    /// ```
    #[derive(Debug, Default, serde::Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct ZoneTomlConfig {
        /// The `[zone]` table.
        #[serde(default)]
        pub zone: ZoneTable,
    }

    /// The `[zone]` table of a config file.
    #[derive(Debug, Default, serde::Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct ZoneTable {
        /// Mirrors [`ZoneConfig::panic_response`].
        #[serde(default)]
        pub panic_response: Option<String>,
        /// Mirrors [`ZoneConfig::trace_transitions`].
        #[serde(default)]
        pub trace_transitions: Option<bool>,
        /// Mirrors [`ZoneConfig::warn_missing_delegate`].
        #[serde(default)]
        pub warn_missing_delegate: Option<bool>,
    }

    impl ZoneTomlConfig {
        /// Parses a TOML document.
        pub fn from_toml_str(text: &str, origin: &str) -> Result<Self, ConfigError> {
            toml::from_str(text).map_err(|source| ConfigError::Parse {
                path: origin.to_string(),
                source,
            })
        }

        /// Merges the parsed fields over `base`.
        pub fn merge_into(self, base: &mut ZoneConfig) -> Result<(), ConfigError> {
            if let Some(value) = self.zone.panic_response {
                base.panic_response = PanicResponse::parse(&value).ok_or_else(|| {
                    ConfigError::InvalidValue {
                        source_name: "zone.panic_response".to_string(),
                        expected: "one of log, silent, propagate",
                        value,
                    }
                })?;
            }
            if let Some(value) = self.zone.trace_transitions {
                base.trace_transitions = value;
            }
            if let Some(value) = self.zone.warn_missing_delegate {
                base.warn_missing_delegate = value;
            }
            Ok(())
        }
    }

    /// Reads and parses `path`, returning the defaults overlaid with the
    /// file's fields.
    pub fn load_config_file(path: &Path) -> Result<ZoneConfig, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let parsed = ZoneTomlConfig::from_toml_str(&text, &path.display().to_string())?;
        let mut config = ZoneConfig::default();
        parsed.merge_into(&mut config)?;
        Ok(config)
    }
}

#[cfg(feature = "config-file")]
pub use file::{load_config_file, ZoneTable, ZoneTomlConfig};
