//! Process-wide configuration, built once at startup and handed to
//! [`Runloop::new`](crate::Runloop::new).
//!
//! Settings are layered: defaults, then the TOML file, then the environment.
//!
//! ```toml
//! [poll]
//! interval_ms = 3000
//! max_attempts = 10
//!
//! [dispatch]
//! call_timeout_ms = 30000
//!
//! [logging]
//! format = "json"
//!
//! [openai]
//! api_key = "sk-..."
//! ```
//!
//! Environment variables: `RUNLOOP_POLL_INTERVAL_MS`, `RUNLOOP_POLL_MAX_ATTEMPTS`,
//! `RUNLOOP_TOOL_TIMEOUT_MS`, `RUNLOOP_LOG_FORMAT`, `RUNLOOP_CONFIG` and the
//! OpenAI variables read by [`OpenAiConfig`].

use crate::telemetry::LogFormat;
use runloop_core::config::get_env_string;
use runloop_core::{ConfigError, DispatchConfig, EnvSource, PollPolicy, ProcessEnv};
use runloop_openai::OpenAiConfig;
use runloop_openai::config::{OpenAiSection, config_file_path};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    poll: PollSection,
    dispatch: DispatchSection,
    logging: LoggingSection,
    openai: Option<OpenAiSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PollSection {
    interval_ms: Option<u64>,
    max_attempts: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DispatchSection {
    call_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoggingSection {
    format: Option<LogFormat>,
}

fn load_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Everything a [`Runloop`](crate::Runloop) needs.
#[derive(Debug, Clone, Default)]
pub struct RunloopConfig {
    pub poll: PollPolicy,
    pub dispatch: DispatchConfig,
    pub openai: OpenAiConfig,
    pub log_format: LogFormat,
}

impl RunloopConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn poll(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn openai(mut self, openai: OpenAiConfig) -> Self {
        self.openai = openai;
        self
    }

    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Load from the environment and, when present, the runloop config file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for malformed variables, an unreadable or
    /// malformed config file, or values that fail validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let file = match config_file_path(&ProcessEnv) {
            Some(path) => load_file(&path)?,
            None => FileConfig::default(),
        };
        Self::resolve(&ProcessEnv, file)
    }

    /// Load the given TOML file; environment variables still take precedence.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = load_file(path.as_ref())?;
        Self::resolve(&ProcessEnv, file)
    }

    fn resolve<E: EnvSource + ?Sized>(env: &E, file: FileConfig) -> Result<Self, ConfigError> {
        let mut poll = PollPolicy::default();
        if let Some(ms) = file.poll.interval_ms {
            poll = poll.interval(Duration::from_millis(ms));
        }
        if let Some(attempts) = file.poll.max_attempts {
            poll = poll.max_attempts(attempts);
        }
        let poll = poll.with_env(env)?;

        let mut dispatch = DispatchConfig::default();
        if let Some(ms) = file.dispatch.call_timeout_ms {
            if ms == 0 {
                return Err(ConfigError::Validation(
                    "dispatch.call_timeout_ms must be greater than 0".to_string(),
                ));
            }
            dispatch = dispatch.call_timeout(Duration::from_millis(ms));
        }
        let dispatch = dispatch.with_env(env)?;

        let log_format = match get_env_string(env, "RUNLOOP_LOG_FORMAT") {
            Some(raw) => raw.parse::<LogFormat>().map_err(|message| ConfigError::InvalidEnvVar {
                key: "RUNLOOP_LOG_FORMAT".to_string(),
                message,
            })?,
            None => file.logging.format.unwrap_or_default(),
        };

        let openai = OpenAiConfig::from_sources(env, file.openai.as_ref())?;

        Ok(Self {
            poll,
            dispatch,
            openai,
            log_format,
        })
    }
}
