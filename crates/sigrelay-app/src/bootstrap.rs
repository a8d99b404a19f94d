//! Environment loading and signing-server wiring.

use std::sync::Arc;

use sigrelay_config::{EnvSource, RelayConfig, load_config};
use sigrelay_exec::Platform;
use sigrelay_pipeline::{ServerPipeline, Signer};
use sigrelay_telemetry::{LoggingConfig, Metrics};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::signer::CommandSigner;

/// Environment variable holding the whitespace-separated signing command.
pub const ENV_SIGN_COMMAND: &str = "SIGRELAY_SIGN_COMMAND";
/// Environment variable naming the platform the signing command targets.
pub const ENV_SIGN_PLATFORM: &str = "SIGRELAY_SIGN_PLATFORM";

/// Dependencies required to run the signing server.
pub(crate) struct BootstrapDependencies {
    config: RelayConfig,
    signer: Arc<dyn Signer>,
    metrics: Metrics,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment.
    pub(crate) fn from_env() -> AppResult<Self> {
        let config = load_config(&EnvSource::process())
            .map_err(|err| AppError::config("load_config", err))?;

        let raw_command = std::env::var(ENV_SIGN_COMMAND).map_err(|_| AppError::MissingEnv {
            name: ENV_SIGN_COMMAND,
        })?;
        let command = parse_command(&raw_command).ok_or(AppError::InvalidEnv {
            name: ENV_SIGN_COMMAND,
            value: raw_command.clone(),
        })?;

        let platform = match std::env::var(ENV_SIGN_PLATFORM) {
            Ok(raw) => Platform::parse(&raw).ok_or(AppError::InvalidEnv {
                name: ENV_SIGN_PLATFORM,
                value: raw,
            })?,
            Err(_) => Platform::current(),
        };

        let metrics = Metrics::new().map_err(|err| AppError::telemetry("metrics.new", err))?;
        Ok(Self {
            config,
            signer: Arc::new(CommandSigner::new(command, platform)),
            metrics,
        })
    }
}

/// Entry point for the signing-server boot sequence.
///
/// # Errors
///
/// Returns an error if dependency construction or server startup fails.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    run_app_with(dependencies).await
}

/// Boot sequence that relies entirely on injected dependencies to simplify
/// testing.
pub(crate) async fn run_app_with(dependencies: BootstrapDependencies) -> AppResult<()> {
    let BootstrapDependencies {
        config,
        signer,
        metrics,
    } = dependencies;

    let logging = LoggingConfig {
        level: &config.log_level,
        ..LoggingConfig::default()
    };
    if let Err(err) = sigrelay_telemetry::init_logging(&logging) {
        // A pre-installed subscriber (tests, embedding) is not fatal.
        warn!(error = %err, "logging already initialised");
    }

    info!(
        shared_dir = %config.shared_storage_dir.display(),
        "signing server bootstrap starting"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    let server = ServerPipeline::new(config, signer, metrics.clone());
    let result = server
        .run_signing_server(shutdown_rx)
        .await
        .map_err(|err| AppError::pipeline("run_signing_server", err));

    let snapshot = metrics.snapshot();
    info!(
        signed = snapshot.signer_signed_total,
        failed = snapshot.signer_failed_total,
        "signing server stopped"
    );
    result
}

fn parse_command(raw: &str) -> Option<Vec<String>> {
    let words: Vec<String> = raw.split_whitespace().map(str::to_string).collect();
    if words.is_empty() { None } else { Some(words) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_command_splits_on_whitespace() {
        assert_eq!(
            parse_command("codesign  --sign identity"),
            Some(vec![
                "codesign".to_string(),
                "--sign".to_string(),
                "identity".to_string()
            ])
        );
        assert_eq!(parse_command("   "), None);
        assert_eq!(parse_command(""), None);
    }
}
