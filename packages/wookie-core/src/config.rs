//! Process-wide gateway configuration.
//!
//! The configuration is a flat YAML mapping of string keys to scalar values,
//! loaded once at startup. Every key can be overridden by an environment
//! variable named `TURBO_WOOKIE_<KEY>` (upper-cased key).
//!
//! ```yaml
//! mpd_domain: localhost
//! mpd_control_port: 6600
//! mpd_http_port: 8000
//! server_port: 9000
//! turbo_wookie_directory: /opt/turbo-wookie
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::protocol_constants::{DEFAULT_CONTROL_TIMEOUT, WEB_ROOT_SUFFIX};

/// Daemon host name or address.
pub const KEY_MPD_DOMAIN: &str = "mpd_domain";
/// Daemon control protocol port.
pub const KEY_MPD_CONTROL_PORT: &str = "mpd_control_port";
/// Daemon HTTP audio stream port.
pub const KEY_MPD_HTTP_PORT: &str = "mpd_http_port";
/// Local port the gateway listens on.
pub const KEY_SERVER_PORT: &str = "server_port";
/// Install directory containing the web frontend.
pub const KEY_INSTALL_DIR: &str = "turbo_wookie_directory";
/// Optional explicit static asset root (overrides the install-relative default).
pub const KEY_WEB_ROOT: &str = "web_root";
/// Optional per-request control call deadline in seconds.
pub const KEY_CONTROL_TIMEOUT_SECS: &str = "control_timeout_secs";

const REQUIRED_KEYS: [&str; 5] = [
    KEY_MPD_DOMAIN,
    KEY_MPD_CONTROL_PORT,
    KEY_MPD_HTTP_PORT,
    KEY_SERVER_PORT,
    KEY_INSTALL_DIR,
];

const OPTIONAL_KEYS: [&str; 2] = [KEY_WEB_ROOT, KEY_CONTROL_TIMEOUT_SECS];

/// Prefix for environment variable overrides.
const ENV_PREFIX: &str = "TURBO_WOOKIE_";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not a valid YAML mapping.
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A required key is absent or empty.
    #[error("Missing required config key: {0}")]
    MissingKey(&'static str),

    /// A key holds a value of the wrong shape.
    #[error("Invalid value for config key {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Convenient Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Immutable key/value configuration shared by every component.
///
/// Construction validates that all required keys are present, non-empty and
/// well-formed, so the typed accessors never fail.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    values: BTreeMap<String, String>,
    mpd_control_port: u16,
    mpd_http_port: u16,
    server_port: u16,
    control_timeout: Duration,
}

impl ConfigStore {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let values = parse_yaml(&content).map_err(|e| match e {
            ParseFailure::Yaml(source) => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            ParseFailure::Value(err) => err,
        })?;

        let store = Self::from_values(apply_overrides(values, |name| std::env::var(name).ok()))?;
        log::info!("[Config] Loaded configuration from {}", path.display());
        Ok(store)
    }

    /// Builds a configuration from a YAML document without environment overrides.
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let values = parse_yaml(yaml).map_err(|e| match e {
            ParseFailure::Yaml(source) => ConfigError::Parse {
                path: PathBuf::from("<inline>"),
                source,
            },
            ParseFailure::Value(err) => err,
        })?;
        Self::from_values(values)
    }

    /// Builds a configuration from key/value pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> ConfigResult<Self>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let values = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::from_values(values)
    }

    /// Returns a copy of this configuration with one key replaced.
    ///
    /// Used for command-line overrides before the gateway is constructed.
    pub fn with_override(&self, key: &str, value: impl Into<String>) -> ConfigResult<Self> {
        let mut values = self.values.clone();
        values.insert(key.to_string(), value.into());
        Self::from_values(values)
    }

    fn from_values(values: BTreeMap<String, String>) -> ConfigResult<Self> {
        for key in REQUIRED_KEYS {
            match values.get(key) {
                Some(v) if !v.trim().is_empty() => {}
                _ => return Err(ConfigError::MissingKey(key)),
            }
        }

        let control_timeout = match values.get(KEY_CONTROL_TIMEOUT_SECS) {
            Some(raw) => Duration::from_secs(parse_value(KEY_CONTROL_TIMEOUT_SECS, raw)?),
            None => DEFAULT_CONTROL_TIMEOUT,
        };

        Ok(Self {
            mpd_control_port: parse_port(&values, KEY_MPD_CONTROL_PORT)?,
            mpd_http_port: parse_port(&values, KEY_MPD_HTTP_PORT)?,
            server_port: parse_port(&values, KEY_SERVER_PORT)?,
            control_timeout,
            values,
        })
    }

    /// Returns the raw value for a key, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Daemon host name.
    pub fn mpd_host(&self) -> &str {
        self.values
            .get(KEY_MPD_DOMAIN)
            .map(|s| s.trim())
            .unwrap_or_default()
    }

    /// `host:port` address of the daemon's control port.
    pub fn control_addr(&self) -> String {
        format!("{}:{}", self.mpd_host(), self.mpd_control_port)
    }

    /// Upstream URL the audio stream is proxied to.
    pub fn stream_url(&self) -> String {
        format!("http://{}:{}/", self.mpd_host(), self.mpd_http_port)
    }

    /// Local port the gateway listens on.
    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    /// Directory the static frontend is served from.
    pub fn web_root(&self) -> PathBuf {
        match self.get(KEY_WEB_ROOT) {
            Some(root) if !root.trim().is_empty() => PathBuf::from(root.trim()),
            _ => Path::new(self.get(KEY_INSTALL_DIR).unwrap_or_default().trim())
                .join(WEB_ROOT_SUFFIX),
        }
    }

    /// Deadline applied to each control call made on behalf of a request.
    pub fn control_timeout(&self) -> Duration {
        self.control_timeout
    }
}

enum ParseFailure {
    Yaml(serde_yaml::Error),
    Value(ConfigError),
}

/// Parses a flat YAML mapping, stringifying scalar values.
fn parse_yaml(content: &str) -> Result<BTreeMap<String, String>, ParseFailure> {
    let raw: BTreeMap<String, serde_yaml::Value> =
        serde_yaml::from_str(content).map_err(ParseFailure::Yaml)?;

    raw.into_iter()
        .map(|(key, value)| {
            let text = match value {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                serde_yaml::Value::Null => String::new(),
                other => {
                    return Err(ParseFailure::Value(ConfigError::InvalidValue {
                        key,
                        value: format!("{:?}", other),
                    }))
                }
            };
            Ok((key, text))
        })
        .collect()
}

/// Applies `TURBO_WOOKIE_<KEY>` overrides for every known key.
fn apply_overrides(
    mut values: BTreeMap<String, String>,
    lookup: impl Fn(&str) -> Option<String>,
) -> BTreeMap<String, String> {
    for key in REQUIRED_KEYS.iter().chain(OPTIONAL_KEYS.iter()) {
        let name = format!("{}{}", ENV_PREFIX, key.to_uppercase());
        if let Some(value) = lookup(&name) {
            log::debug!("[Config] {} overridden by {}", key, name);
            values.insert((*key).to_string(), value);
        }
    }
    values
}

fn parse_port(values: &BTreeMap<String, String>, key: &'static str) -> ConfigResult<u16> {
    let raw = values.get(key).ok_or(ConfigError::MissingKey(key))?;
    parse_value(key, raw)
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> ConfigResult<T> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
    })
}
