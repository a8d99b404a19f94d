//! Configuration loading: optional JSON file, then environment overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{
    DEFAULT_LOG_LEVEL, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_TIMEOUT_SECS, RelayConfig,
    RelayConfigFile,
};

/// Environment variable naming the optional JSON configuration file.
pub const ENV_CONFIG_FILE: &str = "SIGRELAY_CONFIG";
/// Environment variable for the shared-storage root.
pub const ENV_SHARED_DIR: &str = "SIGRELAY_SHARED_DIR";
/// Environment variable for the Builder reply timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "SIGRELAY_TIMEOUT_SECS";
/// Environment variable for the poll interval in seconds.
pub const ENV_POLL_INTERVAL_SECS: &str = "SIGRELAY_POLL_INTERVAL_SECS";
/// Environment variable for the log level.
pub const ENV_LOG_LEVEL: &str = "SIGRELAY_LOG_LEVEL";

/// Source of environment lookups, injectable so tests never mutate the
/// process environment.
pub struct EnvSource {
    lookup: Box<dyn Fn(&str) -> Option<String> + Send + Sync>,
}

impl EnvSource {
    /// Read from the real process environment.
    #[must_use]
    pub fn process() -> Self {
        Self {
            lookup: Box::new(|name| std::env::var(name).ok()),
        }
    }

    /// Read from a fixed set of key/value pairs.
    #[must_use]
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let owned: Vec<(String, String)> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        Self {
            lookup: Box::new(move |name| {
                owned
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| value.clone())
            }),
        }
    }

    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
    }
}

impl std::fmt::Debug for EnvSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvSource").finish_non_exhaustive()
    }
}

/// Load relay configuration.
///
/// Precedence: defaults, then the JSON file named by `SIGRELAY_CONFIG` (when
/// set), then individual environment overrides.
///
/// # Errors
///
/// Returns an error when the file cannot be read or parsed, when the shared
/// storage directory ends up unset, or when a timing field is zero or
/// inconsistent.
pub fn load_config(env: &EnvSource) -> ConfigResult<RelayConfig> {
    let file = match env.get(ENV_CONFIG_FILE) {
        Some(path) => read_config_file(Path::new(&path))?,
        None => RelayConfigFile::default(),
    };

    let shared_storage_dir = env
        .get(ENV_SHARED_DIR)
        .map(PathBuf::from)
        .or(file.shared_storage_dir)
        .filter(|dir| !dir.as_os_str().is_empty())
        .ok_or(ConfigError::MissingSharedDir)?;

    let timeout_secs = resolve_seconds(env, ENV_TIMEOUT_SECS, file.timeout_secs)?
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    let poll_interval_secs = resolve_seconds(env, ENV_POLL_INTERVAL_SECS, file.poll_interval_secs)?
        .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);

    if timeout_secs == 0 {
        return Err(ConfigError::invalid(
            "timeout_secs",
            Some(timeout_secs.to_string()),
            "must be non-zero",
        ));
    }
    if poll_interval_secs == 0 {
        return Err(ConfigError::invalid(
            "poll_interval_secs",
            Some(poll_interval_secs.to_string()),
            "must be non-zero",
        ));
    }
    if poll_interval_secs > timeout_secs {
        return Err(ConfigError::invalid(
            "poll_interval_secs",
            Some(poll_interval_secs.to_string()),
            "must not exceed timeout_secs",
        ));
    }

    let log_level = env
        .get(ENV_LOG_LEVEL)
        .or(file.log_level)
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

    Ok(RelayConfig {
        shared_storage_dir,
        timeout: Duration::from_secs(timeout_secs),
        poll_interval: Duration::from_secs(poll_interval_secs),
        log_level,
    })
}

fn read_config_file(path: &Path) -> ConfigResult<RelayConfigFile> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn resolve_seconds(
    env: &EnvSource,
    name: &'static str,
    from_file: Option<u64>,
) -> ConfigResult<Option<u64>> {
    match env.get(name) {
        Some(raw) => raw
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::invalid(name, Some(raw), "must be an unsigned integer")),
        None => Ok(from_file),
    }
}
