//! Builder role: package files, ship a request, install the signed reply.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use sigrelay_archive::{
    ArchiveWithIndicator, FileDescriptor, Mailbox, MailboxKind, RequestId, extract_files,
    pack_files,
};
use sigrelay_config::RelayConfig;
use sigrelay_telemetry::{Metrics, ROLE_BUILDER};
use tracing::{info, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::signer::Signer;

/// Result of one Builder invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignOutcome {
    /// A request travelled the full round-trip and the signed files were
    /// installed over the originals.
    Signed {
        /// Identifier of the completed request.
        request_id: RequestId,
        /// Number of files that were signed.
        file_count: usize,
    },
    /// Nothing under the given path needed signing; no request was sent.
    NothingToSign,
}

/// Short-lived client pipeline that requests signing of a path.
pub struct BuilderPipeline {
    config: RelayConfig,
    signer: Arc<dyn Signer>,
    metrics: Metrics,
}

impl BuilderPipeline {
    /// Assemble a Builder from explicit dependencies.
    #[must_use]
    pub fn new(config: RelayConfig, signer: Arc<dyn Signer>, metrics: Metrics) -> Self {
        Self {
            config,
            signer,
            metrics,
        }
    }

    /// Sign every signable file at or beneath `path`, in place.
    ///
    /// Packs the signable files into the `unsigned/` mailbox, waits for the
    /// signing server's reply in `signed/` (bounded by the configured
    /// timeout), and copies the signed results over the originals. "Nothing
    /// to sign" is a successful no-op, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Timeout`] when no reply arrives in time (the
    /// request's mailbox entry is cleaned up first) and IO or archive errors
    /// for filesystem failures.
    pub async fn sign_path(&self, path: &Path) -> PipelineResult<SignOutcome> {
        let started = Instant::now();
        let unsigned = Mailbox::new(&self.config.shared_storage_dir, MailboxKind::Unsigned);
        unsigned
            .ensure_exists()
            .map_err(|source| PipelineError::archive("ensure_unsigned_mailbox", source))?;

        let (files, install_root) = self.collect_signable(path)?;
        if files.is_empty() {
            info!(path = %path.display(), "nothing to sign");
            self.metrics.inc_request(ROLE_BUILDER, "nothing_to_sign");
            return Ok(SignOutcome::NothingToSign);
        }

        let request_id = RequestId::new();
        let request_slot = unsigned.slot(request_id);
        info!(
            %request_id,
            files = files.len(),
            path = %path.display(),
            "publishing signing request"
        );

        // Archive first, marker second: the marker must never be visible
        // over an incomplete archive.
        if let Err(source) = pack_files(&files, request_slot.archive_path()) {
            discard_slot(&request_slot);
            self.metrics.inc_request(ROLE_BUILDER, "failed");
            return Err(PipelineError::archive("pack_request", source));
        }
        if let Err(source) = request_slot.tag_ready() {
            discard_slot(&request_slot);
            self.metrics.inc_request(ROLE_BUILDER, "failed");
            return Err(PipelineError::archive("tag_request_ready", source));
        }

        let reply_slot = match self.wait_for_reply(request_id).await {
            Ok(slot) => slot,
            Err(error) => {
                // No server will answer this request any more; remove it so
                // the mailbox does not accumulate orphans.
                discard_slot(&request_slot);
                self.metrics.inc_request(ROLE_BUILDER, "failed");
                return Err(error);
            }
        };

        let result = install_reply(request_id, &reply_slot, &install_root);
        match result {
            Ok(()) => {
                self.metrics.inc_request(ROLE_BUILDER, "signed");
                self.metrics
                    .observe_duration(ROLE_BUILDER, started.elapsed());
                info!(%request_id, files = files.len(), "signed files installed");
                Ok(SignOutcome::Signed {
                    request_id,
                    file_count: files.len(),
                })
            }
            Err(error) => {
                self.metrics.inc_request(ROLE_BUILDER, "failed");
                Err(error)
            }
        }
    }

    fn collect_signable(&self, path: &Path) -> PipelineResult<(Vec<FileDescriptor>, PathBuf)> {
        let metadata = fs::metadata(path)
            .map_err(|source| PipelineError::io("stat_sign_path", path.to_path_buf(), source))?;

        if metadata.is_file() {
            let descriptor = FileDescriptor::from_file(path)
                .map_err(|source| PipelineError::archive("describe_file", source))?;
            let install_root = descriptor
                .absolute_path()
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| {
                    PipelineError::io(
                        "resolve_install_root",
                        path.to_path_buf(),
                        std::io::Error::other("file has no parent directory"),
                    )
                })?;
            let files = if self.signer.should_sign(&descriptor) {
                vec![descriptor]
            } else {
                Vec::new()
            };
            return Ok((files, install_root));
        }

        let install_root = path
            .canonicalize()
            .map_err(|source| PipelineError::io("resolve_sign_path", path.to_path_buf(), source))?;
        let files = FileDescriptor::collect_directory(path)
            .map_err(|source| PipelineError::archive("collect_directory", source))?
            .into_iter()
            .filter(|file| self.signer.should_sign(file))
            .collect();
        Ok((files, install_root))
    }

    async fn wait_for_reply(&self, request_id: RequestId) -> PipelineResult<ArchiveWithIndicator> {
        let signed = Mailbox::new(&self.config.shared_storage_dir, MailboxKind::Signed);
        let deadline = Instant::now() + self.config.timeout;
        loop {
            let slot = signed.slot(request_id);
            if slot.is_ready() {
                return Ok(slot);
            }
            let now = Instant::now();
            if now >= deadline {
                let waited = self.config.timeout + (now - deadline);
                warn!(%request_id, ?waited, "gave up waiting for signed reply");
                return Err(PipelineError::Timeout { request_id, waited });
            }
            let remaining = deadline - now;
            tokio::time::sleep(self.config.poll_interval.min(remaining)).await;
        }
    }
}

fn install_reply(
    request_id: RequestId,
    reply_slot: &ArchiveWithIndicator,
    install_root: &Path,
) -> PipelineResult<()> {
    let scratch = tempfile::tempdir()
        .map_err(|source| PipelineError::io("create_scratch_dir", std::env::temp_dir(), source))?;
    extract_files(reply_slot.archive_path(), scratch.path())
        .map_err(|source| PipelineError::archive("extract_reply", source))?;

    let extracted = FileDescriptor::collect_directory(scratch.path())
        .map_err(|source| PipelineError::archive("enumerate_reply", source))?;
    for file in &extracted {
        let destination = install_root.join(file.relative_path());
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|source| {
                PipelineError::io("create_install_parent", parent.to_path_buf(), source)
            })?;
        }
        fs::copy(file.absolute_path(), &destination)
            .map_err(|source| PipelineError::io("install_signed_file", destination.clone(), source))?;
    }
    info!(%request_id, files = extracted.len(), "extracted signed reply");

    reply_slot
        .clean()
        .map_err(|source| PipelineError::archive("clean_reply_slot", source))
}

fn discard_slot(slot: &ArchiveWithIndicator) {
    if let Err(error) = slot.clean() {
        warn!(request_id = %slot.request_id(), error = %error, "failed to clean mailbox slot");
    }
}
