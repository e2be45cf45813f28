//! Server configuration — raw flag/environment values resolved once at
//! start-up into an immutable [`ResolvedConfig`].

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::catalog::{self, MODELS_YML_URL};
use crate::ssml::{BreakStrength, BreakTime, InvalidKeyword, ProsodyPitch, ProsodyRate, SsmlOverlay};

// ─── Environment variables ─────────────────────────────────────────────────

pub const ENV_LANGUAGE: &str = "SILERO_LANGUAGE";
pub const ENV_MODEL: &str = "SILERO_MODEL";
pub const ENV_SPEAKER: &str = "SILERO_SPEAKER";
pub const ENV_SAMPLE_RATE: &str = "SILERO_SAMPLE_RATE";
pub const ENV_PROSODY_RATE: &str = "SILERO_PROSODY_RATE";
pub const ENV_PROSODY_PITCH: &str = "SILERO_PROSODY_PITCH";
pub const ENV_BREAK_TIME: &str = "SILERO_BREAK_TIME";
pub const ENV_BREAK_STRENGTH: &str = "SILERO_BREAK_STRENGTH";
pub const ENV_CACHE_DIR: &str = "SILERO_CACHE_DIR";
pub const ENV_ENGINE_URL: &str = "SILERO_ENGINE_URL";
pub const ENV_REGISTRY_URL: &str = "SILERO_REGISTRY_URL";
pub const ENV_HOST: &str = "WYOMING_HOST";
pub const ENV_PORT: &str = "WYOMING_PORT";
pub const ENV_URI: &str = "WYOMING_URI";
pub const ENV_DEBUG: &str = "WYOMING_DEBUG";

// ─── Defaults ──────────────────────────────────────────────────────────────

pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_MODEL: &str = "v3_en";
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 10200;
pub const DEFAULT_CACHE_DIR: &str = "silero/model";
pub const DEFAULT_ENGINE_URL: &str = "http://127.0.0.1:8013";

/// Configuration error, reported before the server binds anything.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}: {source}")]
    InvalidValue {
        var: &'static str,
        #[source]
        source: InvalidKeyword,
    },

    #[error("{var}: '{value}' is not a valid {expected}")]
    InvalidNumber {
        var: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("WYOMING_URI: {reason} in '{value}'")]
    InvalidUri { value: String, reason: &'static str },
}

/// Unvalidated settings, one optional string per variable. Flags and the
/// environment both land here.
#[derive(Debug, Clone, Default)]
pub struct RawSettings {
    pub language: Option<String>,
    pub model: Option<String>,
    pub speaker: Option<String>,
    pub sample_rate: Option<String>,
    pub prosody_rate: Option<String>,
    pub prosody_pitch: Option<String>,
    pub break_time: Option<String>,
    pub break_strength: Option<String>,
    pub host: Option<String>,
    pub port: Option<String>,
    pub uri: Option<String>,
    pub debug: Option<String>,
    pub cache_dir: Option<String>,
    pub engine_url: Option<String>,
    pub registry_url: Option<String>,
}

/// Where the Wyoming listener binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp { host: String, port: u16 },
    Unix(PathBuf),
}

impl Endpoint {
    /// Parse a `tcp://host:port` or `unix://path` URI.
    pub fn parse(uri: &str) -> Result<Self, ConfigError> {
        let uri = uri.trim();
        let invalid = |reason| ConfigError::InvalidUri {
            value: uri.to_string(),
            reason,
        };

        let (scheme, rest) = uri.split_once("://").ok_or_else(|| invalid("missing scheme"))?;
        match scheme.to_ascii_lowercase().as_str() {
            "tcp" => {
                let (host, port) = rest.rsplit_once(':').ok_or_else(|| invalid("missing port"))?;
                let host = host
                    .strip_prefix('[')
                    .and_then(|h| h.strip_suffix(']'))
                    .unwrap_or(host);
                if host.is_empty() {
                    return Err(invalid("missing host"));
                }
                let port = port.parse().map_err(|_| invalid("invalid port"))?;
                Ok(Self::Tcp {
                    host: host.to_string(),
                    port,
                })
            }
            "unix" if rest.is_empty() => Err(invalid("missing socket path")),
            "unix" => Ok(Self::Unix(PathBuf::from(rest))),
            _ => Err(invalid("unsupported scheme (expected tcp:// or unix://)")),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp { host, port } if host.contains(':') => write!(f, "tcp://[{host}]:{port}"),
            Self::Tcp { host, port } => write!(f, "tcp://{host}:{port}"),
            Self::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

/// Immutable server configuration.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub language: String,
    pub model: String,
    pub speaker: Option<String>,
    pub sample_rate: u32,
    pub prosody_rate: Option<ProsodyRate>,
    pub prosody_pitch: Option<ProsodyPitch>,
    pub break_time: Option<BreakTime>,
    pub break_strength: Option<BreakStrength>,
    pub endpoint: Endpoint,
    pub uri: String,
    /// `WYOMING_URI` was set together with a non-default host or port.
    pub host_port_ignored: bool,
    pub debug: bool,
    pub cache_dir: PathBuf,
    pub engine_url: String,
    pub registry_url: String,
}

impl ResolvedConfig {
    /// Apply defaults and validate every setting.
    pub fn resolve(raw: RawSettings) -> Result<Self, ConfigError> {
        let language = non_empty(raw.language)
            .map(|l| l.to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        let model = non_empty(raw.model).unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let speaker = non_empty(raw.speaker);

        let sample_rate = parse_number::<u32>(ENV_SAMPLE_RATE, raw.sample_rate, "sample rate")?
            .unwrap_or(DEFAULT_SAMPLE_RATE);
        if sample_rate == 0 {
            return Err(ConfigError::InvalidNumber {
                var: ENV_SAMPLE_RATE,
                value: "0".into(),
                expected: "sample rate",
            });
        }

        let prosody_rate = parse_keyword(ENV_PROSODY_RATE, raw.prosody_rate)?;
        let prosody_pitch = parse_keyword(ENV_PROSODY_PITCH, raw.prosody_pitch)?;
        let break_time = parse_keyword(ENV_BREAK_TIME, raw.break_time)?;
        let break_strength = parse_keyword(ENV_BREAK_STRENGTH, raw.break_strength)?;

        let host = non_empty(raw.host);
        let port = parse_number::<u16>(ENV_PORT, raw.port, "port")?;
        let (endpoint, uri, host_port_ignored) = match non_empty(raw.uri) {
            Some(uri) => {
                let endpoint = Endpoint::parse(&uri)?;
                let ignored = host.as_deref().is_some_and(|h| h != DEFAULT_HOST)
                    || port.is_some_and(|p| p != DEFAULT_PORT);
                (endpoint, uri, ignored)
            }
            None => {
                let endpoint = Endpoint::Tcp {
                    host: host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
                    port: port.unwrap_or(DEFAULT_PORT),
                };
                let uri = endpoint.to_string();
                (endpoint, uri, false)
            }
        };

        let debug = parse_flag(ENV_DEBUG, raw.debug)?.unwrap_or(false);

        Ok(Self {
            language,
            model,
            speaker,
            sample_rate,
            prosody_rate,
            prosody_pitch,
            break_time,
            break_strength,
            endpoint,
            uri,
            host_port_ignored,
            debug,
            cache_dir: non_empty(raw.cache_dir)
                .unwrap_or_else(|| DEFAULT_CACHE_DIR.to_string())
                .into(),
            engine_url: non_empty(raw.engine_url)
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_ENGINE_URL.to_string()),
            registry_url: non_empty(raw.registry_url).unwrap_or_else(|| MODELS_YML_URL.to_string()),
        })
    }

    /// The global SSML overlay. Break strength is dropped when a break time is set.
    pub fn overlay(&self) -> SsmlOverlay {
        SsmlOverlay::new(
            self.prosody_rate,
            self.prosody_pitch,
            self.break_time.clone(),
            self.break_strength,
        )
    }

    /// Language code advertised to clients (ISO-639-1).
    pub fn advertised_language(&self) -> String {
        catalog::advertised_language(&self.language)
    }

    /// Both break settings were given; the strength will not be used.
    pub fn break_strength_dropped(&self) -> bool {
        self.break_time.is_some() && self.break_strength.is_some()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_keyword<T>(var: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: FromStr<Err = InvalidKeyword>,
{
    non_empty(value)
        .map(|v| v.parse().map_err(|source| ConfigError::InvalidValue { var, source }))
        .transpose()
}

fn parse_number<T: FromStr>(
    var: &'static str,
    value: Option<String>,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    non_empty(value)
        .map(|v| {
            v.parse().map_err(|_| ConfigError::InvalidNumber {
                var,
                value: v.clone(),
                expected,
            })
        })
        .transpose()
}

fn parse_flag(var: &'static str, value: Option<String>) -> Result<Option<bool>, ConfigError> {
    non_empty(value)
        .map(|v| match v.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                var,
                source: InvalidKeyword {
                    value: v.clone(),
                    expected: "true, false",
                },
            }),
        })
        .transpose()
}
