//! Signer role: the long-lived server that answers signing requests.

use std::sync::Arc;
use std::time::Instant;

use sigrelay_archive::{FileDescriptor, Mailbox, MailboxKind, RequestId, extract_files, pack_files};
use sigrelay_config::RelayConfig;
use sigrelay_telemetry::{Metrics, ROLE_SIGNER};
use tokio::sync::watch;
use tracing::{error, info};

use crate::error::{PipelineError, PipelineResult};
use crate::signer::Signer;

/// Long-lived server pipeline that answers signing requests.
pub struct ServerPipeline {
    config: RelayConfig,
    signer: Arc<dyn Signer>,
    metrics: Metrics,
}

impl ServerPipeline {
    /// Assemble a server from explicit dependencies.
    #[must_use]
    pub fn new(config: RelayConfig, signer: Arc<dyn Signer>, metrics: Metrics) -> Self {
        Self {
            config,
            signer,
            metrics,
        }
    }

    /// Block until a request can be claimed or shutdown is signalled.
    ///
    /// Polls the `unsigned/` mailbox for ready markers, sleeping the
    /// configured interval between scans. A found slot is re-checked through
    /// the structured accessor and then claimed by atomically renaming its
    /// marker, so a second server instance scanning the same mailbox can
    /// never pick up the same request. Returns `None` once `shutdown` flips,
    /// which is only observed between polls, never mid-claim.
    ///
    /// # Errors
    ///
    /// Returns an error when the mailbox cannot be scanned or the claim
    /// rename fails.
    pub async fn wait_for_sign_request(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> PipelineResult<Option<RequestId>> {
        let unsigned = Mailbox::new(&self.config.shared_storage_dir, MailboxKind::Unsigned);
        loop {
            if *shutdown.borrow() {
                return Ok(None);
            }

            if let Some(request_id) = unsigned
                .scan_ready()
                .map_err(|source| PipelineError::archive("scan_unsigned_mailbox", source))?
            {
                let slot = unsigned.slot(request_id);
                if slot.is_ready()
                    && slot
                        .claim()
                        .map_err(|source| PipelineError::archive("claim_request", source))?
                {
                    info!(%request_id, "claimed signing request");
                    return Ok(Some(request_id));
                }
                // Another instance won the claim; rescan straight away.
                continue;
            }

            tokio::select! {
                () = tokio::time::sleep(self.config.poll_interval) => {}
                changed = shutdown.changed() => {
                    // A dropped sender means shutdown can never arrive; stop
                    // rather than spin.
                    if changed.is_err() {
                        return Ok(None);
                    }
                }
            }
        }
    }

    /// Sign one claimed request and publish the reply.
    ///
    /// Extracts the unsigned archive into a scratch directory, hands every
    /// file to the injected signer for in-place mutation, packs the result
    /// into the `signed/` mailbox, and finally removes the request from
    /// `unsigned/`. When the signer fails no reply is published and the
    /// unsigned archive stays in place for operator diagnosis; the Builder
    /// sees the failure as its own timeout.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Signing`] when the signer capability fails
    /// and IO or archive errors for filesystem failures.
    pub async fn run_signing_pipeline(&self, request_id: RequestId) -> PipelineResult<()> {
        let started = Instant::now();
        let unsigned = Mailbox::new(&self.config.shared_storage_dir, MailboxKind::Unsigned);
        let signed = Mailbox::new(&self.config.shared_storage_dir, MailboxKind::Signed);
        signed
            .ensure_exists()
            .map_err(|source| PipelineError::archive("ensure_signed_mailbox", source))?;

        let request_slot = unsigned.slot(request_id);
        let scratch = tempfile::tempdir().map_err(|source| {
            PipelineError::io("create_scratch_dir", std::env::temp_dir(), source)
        })?;
        extract_files(request_slot.archive_path(), scratch.path())
            .map_err(|source| PipelineError::archive("extract_request", source))?;

        let files = FileDescriptor::collect_directory(scratch.path())
            .map_err(|source| PipelineError::archive("enumerate_request", source))?;
        info!(%request_id, files = files.len(), "signing files");

        self.signer
            .sign_all_files(&files)
            .await
            .map_err(|source| PipelineError::Signing { request_id, source })?;

        let reply_slot = signed.slot(request_id);
        if let Err(source) = pack_files(&files, reply_slot.archive_path()) {
            // Never leave a half-written reply behind a future marker.
            let _ = reply_slot.clean();
            return Err(PipelineError::archive("pack_reply", source));
        }
        reply_slot
            .tag_ready()
            .map_err(|source| PipelineError::archive("tag_reply_ready", source))?;

        request_slot
            .clean()
            .map_err(|source| PipelineError::archive("clean_request_slot", source))?;

        self.metrics.inc_request(ROLE_SIGNER, "signed");
        self.metrics.observe_duration(ROLE_SIGNER, started.elapsed());
        info!(%request_id, files = files.len(), "published signed reply");
        Ok(())
    }

    /// Serve requests until shutdown is signalled.
    ///
    /// A failure on one request is logged and counted but does not stop the
    /// loop; the next request is served normally. Shutdown is honoured only
    /// between requests so an in-flight request always runs to completion or
    /// explicit failure.
    ///
    /// # Errors
    ///
    /// Returns an error only when the mailbox itself becomes unusable (for
    /// example, the shared mount disappears).
    pub async fn run_signing_server(
        &self,
        mut shutdown: watch::Receiver<bool>,
    ) -> PipelineResult<()> {
        info!(
            shared_dir = %self.config.shared_storage_dir.display(),
            "signing server started"
        );
        loop {
            let Some(request_id) = self.wait_for_sign_request(&mut shutdown).await? else {
                info!("signing server shutting down");
                return Ok(());
            };
            if let Err(err) = self.run_signing_pipeline(request_id).await {
                error!(%request_id, error = %err, "signing request failed");
                self.metrics.inc_request(ROLE_SIGNER, "failed");
            }
        }
    }
}
