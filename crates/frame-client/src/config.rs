use std::env;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_SERVER: &str = "http://127.0.0.1:8080";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5_000);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid server url '{value}': {reason}")]
    InvalidServer { value: String, reason: String },
    #[error("invalid value '{value}' for {name}")]
    InvalidValue { name: &'static str, value: String },
}

/// Connection settings for the frame backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base url; always ends with `/` so api paths join beneath it.
    pub server: Url,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(server: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            server: parse_server(server)?,
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Load configuration from `FRAME_SERVER`, `FRAME_POLL_INTERVAL_MS` and
    /// `FRAME_REQUEST_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let server = env::var("FRAME_SERVER")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SERVER.to_string());
        let mut config = Self::new(&server)?;

        if let Some(ms) = positive_from_env("FRAME_POLL_INTERVAL_MS")? {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = positive_from_env("FRAME_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Result<Self, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "poll interval",
                value: "0".into(),
            });
        }
        self.poll_interval = interval;
        Ok(self)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

fn parse_server(value: &str) -> Result<Url, ConfigError> {
    let trimmed = value.trim();
    let mut url = Url::parse(trimmed).map_err(|err| ConfigError::InvalidServer {
        value: trimmed.to_string(),
        reason: err.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidServer {
            value: trimmed.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn positive_from_env(name: &'static str) -> Result<Option<u64>, ConfigError> {
    let Ok(raw) = env::var(name) else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(Some(value)),
        _ => Err(ConfigError::InvalidValue { name, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{LazyLock, Mutex};

    // Environment variables are process-wide.
    static ENV_MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

    fn clear_env() {
        unsafe {
            env::remove_var("FRAME_SERVER");
            env::remove_var("FRAME_POLL_INTERVAL_MS");
            env::remove_var("FRAME_REQUEST_TIMEOUT_SECS");
        }
    }

    #[test]
    fn defaults_when_env_is_empty() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.server.as_str(), "http://127.0.0.1:8080/");
        assert_eq!(config.poll_interval, Duration::from_millis(5_000));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn reads_overrides_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var("FRAME_SERVER", "http://frame.local:5000/viewer");
            env::set_var("FRAME_POLL_INTERVAL_MS", "250");
            env::set_var("FRAME_REQUEST_TIMEOUT_SECS", "3");
        }
        let config = ClientConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.server.as_str(), "http://frame.local:5000/viewer/");
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.request_timeout, Duration::from_secs(3));
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var("FRAME_POLL_INTERVAL_MS", "0");
        }
        let err = ClientConfig::from_env().unwrap_err();
        clear_env();
        assert!(matches!(err, ConfigError::InvalidValue { name: "FRAME_POLL_INTERVAL_MS", .. }));

        let err = ClientConfig::new(DEFAULT_SERVER)
            .unwrap()
            .with_poll_interval(Duration::ZERO)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn rejects_non_http_servers() {
        assert!(ClientConfig::new("ftp://frame.local").is_err());
        assert!(ClientConfig::new("not a url").is_err());
    }
}
