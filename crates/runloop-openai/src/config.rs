//! Connection settings for the OpenAI transport.
//!
//! The API key is looked up in order: an explicitly supplied value, the
//! `OPENAI_API_KEY` environment variable, then `openai.api_key` in the TOML
//! file named by `RUNLOOP_CONFIG` (or `./runloop.toml` when present).
//!
//! Other environment variables:
//! - `OPENAI_BASE_URL`: API root (default `https://api.openai.com/v1/`)
//! - `RUNLOOP_TRACE_HTTP`: log request and response bodies at debug level
//! - `RUNLOOP_REQUEST_TIMEOUT_MS`: per-request HTTP timeout (default 30000)

use runloop_core::config::{get_env_bool, get_env_string, get_env_u64};
use runloop_core::{ConfigError, EnvSource, ProcessEnv, TransportError};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONFIG_FILE: &str = "runloop.toml";

/// Secret API key. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key; blank values are treated as absent
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// `[openai]` table of the runloop TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiSection {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub trace_http: Option<bool>,
    pub request_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiFile {
    #[serde(default)]
    openai: Option<OpenAiSection>,
}

/// Read the `[openai]` table of a TOML file, ignoring other tables
pub fn load_section(path: &Path) -> Result<Option<OpenAiSection>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: OpenAiFile = toml::from_str(&text).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(file.openai)
}

/// Config file to consult: `RUNLOOP_CONFIG` if set, else `runloop.toml` if it exists
pub fn config_file_path<E: EnvSource + ?Sized>(source: &E) -> Option<PathBuf> {
    match get_env_string(source, "RUNLOOP_CONFIG") {
        Some(path) => Some(PathBuf::from(path)),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.is_file().then_some(default)
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<ApiKey>,
    pub base_url: Url,
    pub trace_http: bool,
    pub request_timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            trace_http: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid")
}

impl OpenAiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this key regardless of environment or file
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = ApiKey::new(key);
        self
    }

    pub fn base_url(mut self, url: Url) -> Self {
        self.base_url = with_trailing_slash(url);
        self
    }

    pub fn trace_http(mut self, enabled: bool) -> Self {
        self.trace_http = enabled;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Load from the process environment and the runloop config file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for malformed variables or an unreadable config
    /// file. A missing API key is not an error here; it surfaces as
    /// `TransportError::MissingApiKey` when a client is built.
    pub fn from_env() -> Result<Self, ConfigError> {
        let section = match config_file_path(&ProcessEnv) {
            Some(path) => load_section(&path)?,
            None => None,
        };
        Self::from_sources(&ProcessEnv, section.as_ref())
    }

    /// Resolve from an environment source and an optional file section.
    ///
    /// The environment wins over the file for every setting.
    pub fn from_sources<E: EnvSource + ?Sized>(
        source: &E,
        file: Option<&OpenAiSection>,
    ) -> Result<Self, ConfigError> {
        let file = file.cloned().unwrap_or_default();
        let mut config = Self::default();

        config.api_key = get_env_string(source, "OPENAI_API_KEY")
            .and_then(ApiKey::new)
            .or_else(|| file.api_key.and_then(ApiKey::new));

        let base_url = get_env_string(source, "OPENAI_BASE_URL").or(file.base_url);
        if let Some(raw) = base_url {
            let url = Url::parse(&raw).map_err(|e| ConfigError::InvalidEnvVar {
                key: "OPENAI_BASE_URL".to_string(),
                message: format!("invalid URL '{raw}': {e}"),
            })?;
            config = config.base_url(url);
        }

        if let Some(trace) = get_env_bool(source, "RUNLOOP_TRACE_HTTP")?.or(file.trace_http) {
            config.trace_http = trace;
        }

        let timeout_ms = get_env_u64(source, "RUNLOOP_REQUEST_TIMEOUT_MS")?.or(file.request_timeout_ms);
        if let Some(ms) = timeout_ms {
            if ms == 0 {
                return Err(ConfigError::Validation(
                    "request timeout must be greater than 0".to_string(),
                ));
            }
            config.request_timeout = Duration::from_millis(ms);
        }

        Ok(config)
    }

    /// The configured key, or `MissingApiKey`
    pub fn require_api_key(&self) -> Result<&ApiKey, TransportError> {
        self.api_key.as_ref().ok_or(TransportError::MissingApiKey)
    }
}

/// `Url::join` drops the last segment of a base without a trailing slash
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
