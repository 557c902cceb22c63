//! Process configuration, read from the environment once at startup and
//! treated as read-only afterwards.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const INTERNAL_CODE_KEY: &str = "INTERNAL_CODE";
pub const PORT_KEY: &str = "HTTP_PORT";
pub const ENGINE_BINARY_KEY: &str = "ENGINE_BINARY";
pub const ENGINE_TIMEOUT_KEY: &str = "ENGINE_TIMEOUT_SECS";
pub const ASSETS_DIR_KEY: &str = "FORM_ASSETS_DIR";
pub const REPORTS_DIR_KEY: &str = "REPORTS_DIR";

const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Shared secret callers must present in the `x-internalcode` header.
    pub internal_code: String,
    pub engine_binary: PathBuf,
    /// `None` renders without a deadline.
    pub engine_timeout: Option<Duration>,
    pub assets_dir: PathBuf,
    /// Destination for debug generation reports.
    pub reports_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let internal_code =
            env::var(INTERNAL_CODE_KEY).map_err(|_| ConfigError::Missing(INTERNAL_CODE_KEY))?;

        let port = match env::var(PORT_KEY) {
            Ok(value) => value.parse().map_err(|_| ConfigError::Invalid {
                key: PORT_KEY,
                value,
            })?,
            Err(_) => DEFAULT_PORT,
        };

        let engine_timeout = match env::var(ENGINE_TIMEOUT_KEY) {
            Ok(value) => {
                let secs: u64 = value.parse().map_err(|_| ConfigError::Invalid {
                    key: ENGINE_TIMEOUT_KEY,
                    value,
                })?;
                Some(Duration::from_secs(secs))
            }
            Err(_) => None,
        };

        Ok(Self {
            port,
            internal_code,
            engine_binary: env::var_os(ENGINE_BINARY_KEY)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(crate::engine::DEFAULT_EXECUTABLE)),
            engine_timeout,
            assets_dir: env::var_os(ASSETS_DIR_KEY)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./assets")),
            reports_dir: env::var_os(REPORTS_DIR_KEY)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment variables are process-global, so this is a single test that
    // covers required, defaulted, and parsed values together.
    #[test]
    fn from_env_reads_the_full_configuration() {
        env::remove_var(INTERNAL_CODE_KEY);
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Missing(INTERNAL_CODE_KEY))
        ));

        env::set_var(INTERNAL_CODE_KEY, "s3cret");
        env::remove_var(PORT_KEY);
        env::remove_var(ENGINE_BINARY_KEY);
        env::remove_var(ENGINE_TIMEOUT_KEY);
        env::remove_var(ASSETS_DIR_KEY);
        env::remove_var(REPORTS_DIR_KEY);

        let config = Config::from_env().expect("config");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.internal_code, "s3cret");
        assert_eq!(
            config.engine_binary,
            PathBuf::from(crate::engine::DEFAULT_EXECUTABLE)
        );
        assert!(config.engine_timeout.is_none());

        env::set_var(PORT_KEY, "9090");
        env::set_var(ENGINE_TIMEOUT_KEY, "30");
        let config = Config::from_env().expect("config");
        assert_eq!(config.port, 9090);
        assert_eq!(config.engine_timeout, Some(Duration::from_secs(30)));

        env::set_var(PORT_KEY, "not-a-port");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid { key: PORT_KEY, .. })
        ));

        env::remove_var(INTERNAL_CODE_KEY);
        env::remove_var(PORT_KEY);
        env::remove_var(ENGINE_TIMEOUT_KEY);
    }
}
