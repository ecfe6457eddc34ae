//! Polling and dispatch configuration with environment variable support.
//!
//! Environment variables:
//! - `RUNLOOP_POLL_INTERVAL_MS`: delay between status polls (default 3000)
//! - `RUNLOOP_POLL_MAX_ATTEMPTS`: attempt budget per run (default 10)
//! - `RUNLOOP_TOOL_TIMEOUT_MS`: per-call handler timeout (default: none)

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable '{key}': {message}")]
    InvalidEnvVar { key: String, message: String },

    #[error("Configuration validation failed: {0}")]
    Validation(String),

    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

/// Source of environment-style key/value pairs.
///
/// `from_env` constructors read the process environment; tests pass a map.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

impl<S: std::hash::BuildHasher> EnvSource for std::collections::HashMap<String, String, S> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl EnvSource for [(&str, &str)] {
    fn var(&self, key: &str) -> Option<String> {
        self.iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| (*v).to_string())
    }
}

/// How often and how many times a run's status is polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl PollPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Load from the process environment, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is malformed or the result is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source<E: EnvSource + ?Sized>(source: &E) -> Result<Self, ConfigError> {
        Self::default().with_env(source)
    }

    /// Apply the variables present in `source` on top of `self`, then validate
    pub fn with_env<E: EnvSource + ?Sized>(mut self, source: &E) -> Result<Self, ConfigError> {
        if let Some(ms) = get_env_u64(source, "RUNLOOP_POLL_INTERVAL_MS")? {
            self = self.interval(Duration::from_millis(ms));
        }
        if let Some(attempts) = get_env_u32(source, "RUNLOOP_POLL_MAX_ATTEMPTS")? {
            self = self.max_attempts(attempts);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "poll.max_attempts must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Dispatch executor settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Upper bound for a single handler invocation; `None` waits indefinitely
    pub call_timeout: Option<Duration>,
}

impl DispatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&ProcessEnv)
    }

    pub fn from_source<E: EnvSource + ?Sized>(source: &E) -> Result<Self, ConfigError> {
        Self::default().with_env(source)
    }

    /// Apply `RUNLOOP_TOOL_TIMEOUT_MS` from `source` on top of `self`
    pub fn with_env<E: EnvSource + ?Sized>(mut self, source: &E) -> Result<Self, ConfigError> {
        if let Some(ms) = get_env_u64(source, "RUNLOOP_TOOL_TIMEOUT_MS")? {
            if ms == 0 {
                return Err(ConfigError::Validation(
                    "RUNLOOP_TOOL_TIMEOUT_MS must be greater than 0".to_string(),
                ));
            }
            self = self.call_timeout(Duration::from_millis(ms));
        }
        Ok(self)
    }
}

// Environment variable helper functions

pub fn get_env_string<E: EnvSource + ?Sized>(source: &E, key: &str) -> Option<String> {
    source.var(key).filter(|v| !v.trim().is_empty())
}

pub fn get_env_bool<E: EnvSource + ?Sized>(
    source: &E,
    key: &str,
) -> Result<Option<bool>, ConfigError> {
    match source.var(key) {
        Some(val) => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!(
                    "invalid boolean value '{val}', expected true/false/1/0/yes/no/on/off"
                ),
            }),
        },
        None => Ok(None),
    }
}

pub fn get_env_u64<E: EnvSource + ?Sized>(
    source: &E,
    key: &str,
) -> Result<Option<u64>, ConfigError> {
    match source.var(key) {
        Some(val) => val
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid u64 value '{val}': {e}"),
            }),
        None => Ok(None),
    }
}

pub fn get_env_u32<E: EnvSource + ?Sized>(
    source: &E,
    key: &str,
) -> Result<Option<u32>, ConfigError> {
    match source.var(key) {
        Some(val) => val
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid u32 value '{val}': {e}"),
            }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_poll_policy() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(3));
        assert_eq!(policy.max_attempts, 10);
    }

    #[test]
    fn test_poll_policy_from_source() {
        let env: &[(&str, &str)] = &[
            ("RUNLOOP_POLL_INTERVAL_MS", "250"),
            ("RUNLOOP_POLL_MAX_ATTEMPTS", "4"),
        ];
        let policy = PollPolicy::from_source(env).unwrap();
        assert_eq!(policy.interval, Duration::from_millis(250));
        assert_eq!(policy.max_attempts, 4);
    }

    #[test]
    fn test_zero_attempt_budget_rejected() {
        let env: &[(&str, &str)] = &[("RUNLOOP_POLL_MAX_ATTEMPTS", "0")];
        let err = PollPolicy::from_source(env).unwrap_err();
        assert!(err.to_string().contains("max_attempts must be greater than 0"));
    }

    #[test]
    fn test_malformed_env_var_names_key() {
        let env: &[(&str, &str)] = &[("RUNLOOP_POLL_INTERVAL_MS", "soon")];
        match PollPolicy::from_source(env) {
            Err(ConfigError::InvalidEnvVar { key, .. }) => {
                assert_eq!(key, "RUNLOOP_POLL_INTERVAL_MS")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_dispatch_timeout_from_source() {
        let env: &[(&str, &str)] = &[("RUNLOOP_TOOL_TIMEOUT_MS", "1500")];
        let config = DispatchConfig::from_source(env).unwrap();
        assert_eq!(config.call_timeout, Some(Duration::from_millis(1500)));

        let empty: &[(&str, &str)] = &[];
        assert_eq!(DispatchConfig::from_source(empty).unwrap().call_timeout, None);
    }

    #[test]
    fn test_env_bool_parsing() {
        let env: &[(&str, &str)] = &[("A", "on"), ("B", "No"), ("C", "maybe")];
        assert_eq!(get_env_bool(env, "A").unwrap(), Some(true));
        assert_eq!(get_env_bool(env, "B").unwrap(), Some(false));
        assert!(get_env_bool(env, "C").is_err());
        assert_eq!(get_env_bool(env, "D").unwrap(), None);
    }
}
