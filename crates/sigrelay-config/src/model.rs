//! Typed configuration models and defaults.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Default Builder wait before giving up on a signed reply.
pub const DEFAULT_TIMEOUT_SECS: u64 = 180;

/// Default interval between mailbox polls on both roles.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;

/// Default log level when nothing else is configured.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Relay configuration consumed by the Builder and Signer pipelines.
///
/// Passed explicitly into the pipeline entry points; there is no ambient
/// global settings object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Shared-storage root holding the `unsigned/` and `signed/` mailboxes.
    pub shared_storage_dir: PathBuf,
    /// How long a Builder waits for a signed reply before failing.
    pub timeout: Duration,
    /// Sleep between mailbox polls.
    pub poll_interval: Duration,
    /// Log level applied when the process installs its subscriber.
    pub log_level: String,
}

impl RelayConfig {
    /// Construct a configuration with default timing for a shared root.
    #[must_use]
    pub fn new(shared_storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            shared_storage_dir: shared_storage_dir.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// On-disk configuration file shape; every field optional so a file can
/// override just one setting.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RelayConfigFile {
    pub(crate) shared_storage_dir: Option<PathBuf>,
    pub(crate) timeout_secs: Option<u64>,
    pub(crate) poll_interval_secs: Option<u64>,
    pub(crate) log_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_applies_default_timing() {
        let config = RelayConfig::new("/srv/signing");
        assert_eq!(config.shared_storage_dir, PathBuf::from("/srv/signing"));
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(
            config.poll_interval,
            Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS)
        );
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn config_file_rejects_unknown_fields() {
        let parsed: Result<RelayConfigFile, _> =
            serde_json::from_str(r#"{"unexpected": true}"#);
        assert!(parsed.is_err());
    }
}
