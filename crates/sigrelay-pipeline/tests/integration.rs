//! End-to-end round-trips between the Builder and server pipelines over a
//! shared temporary directory.

use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sigrelay_archive::{FileDescriptor, Mailbox, MailboxKind, pack_files};
use sigrelay_pipeline::{
    BuilderPipeline, PipelineError, ServerPipeline, SignError, SignOutcome, Signer,
};
use sigrelay_telemetry::Metrics;
use sigrelay_test_support::fixtures::{write_executable, write_file};
use sigrelay_test_support::SharedRootFixture;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Signs `.bin` files by appending one byte, mimicking a real signer's
/// in-place mutation.
struct AppendByteSigner {
    signed_files: AtomicUsize,
}

impl AppendByteSigner {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            signed_files: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Signer for AppendByteSigner {
    fn should_sign(&self, file: &FileDescriptor) -> bool {
        file.relative_path()
            .extension()
            .is_some_and(|ext| ext == "bin")
    }

    async fn sign_all_files(&self, files: &[FileDescriptor]) -> Result<(), SignError> {
        for file in files {
            let mut contents = fs::read(file.absolute_path())
                .map_err(|source| SignError::with_source("failed to read file", source))?;
            contents.push(0xAB);
            fs::write(file.absolute_path(), contents)
                .map_err(|source| SignError::with_source("failed to write file", source))?;
            self.signed_files.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Always refuses to sign anything.
struct BrokenSigner;

#[async_trait]
impl Signer for BrokenSigner {
    fn should_sign(&self, _file: &FileDescriptor) -> bool {
        true
    }

    async fn sign_all_files(&self, _files: &[FileDescriptor]) -> Result<(), SignError> {
        Err(SignError::new("signing tool rejected the files"))
    }
}

fn spawn_server(
    fixture: &SharedRootFixture,
    signer: Arc<dyn Signer>,
) -> (watch::Sender<bool>, JoinHandle<Result<(), PipelineError>>) {
    let metrics = Metrics::new().expect("metrics registry");
    let server = ServerPipeline::new(fixture.config(), signer, metrics);
    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(async move { server.run_signing_server(rx).await });
    (tx, handle)
}

fn mailbox_entries(shared_dir: &Path, kind: MailboxKind) -> Vec<String> {
    let mailbox = Mailbox::new(shared_dir, kind);
    match fs::read_dir(mailbox.directory()) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[tokio::test]
async fn single_file_round_trip_signs_in_place() -> Result<(), Box<dyn Error>> {
    let fixture = SharedRootFixture::new()?;
    let workspace = tempfile::tempdir()?;
    let target = write_executable(workspace.path(), "foo.bin", b"binary contents")?;

    let signer = AppendByteSigner::new();
    let (shutdown, server) = spawn_server(&fixture, signer.clone());

    let builder = BuilderPipeline::new(fixture.config(), signer.clone(), Metrics::new()?);
    let outcome = builder.sign_path(&target).await?;
    assert!(matches!(
        outcome,
        SignOutcome::Signed { file_count: 1, .. }
    ));

    let signed = fs::read(&target)?;
    assert_eq!(signed, b"binary contents\xAB");
    #[cfg(unix)]
    assert_eq!(sigrelay_test_support::fixtures::read_mode(&target)?, 0o755);

    assert!(mailbox_entries(fixture.shared_dir(), MailboxKind::Unsigned).is_empty());
    assert!(mailbox_entries(fixture.shared_dir(), MailboxKind::Signed).is_empty());

    shutdown.send(true)?;
    server.await??;
    Ok(())
}

#[tokio::test]
async fn directory_round_trip_filters_unsignable_files() -> Result<(), Box<dyn Error>> {
    let fixture = SharedRootFixture::new()?;
    let workspace = tempfile::tempdir()?;
    write_file(workspace.path(), "a.bin", b"a")?;
    write_file(workspace.path(), "nested/b.bin", b"b")?;
    write_file(workspace.path(), "nested/deep/c.bin", b"c")?;
    write_file(workspace.path(), "readme.txt", b"docs")?;
    write_file(workspace.path(), "nested/notes.txt", b"notes")?;

    let signer = AppendByteSigner::new();
    let (shutdown, server) = spawn_server(&fixture, signer.clone());

    let builder = BuilderPipeline::new(fixture.config(), signer.clone(), Metrics::new()?);
    let outcome = builder.sign_path(workspace.path()).await?;
    assert!(matches!(
        outcome,
        SignOutcome::Signed { file_count: 3, .. }
    ));
    assert_eq!(signer.signed_files.load(Ordering::SeqCst), 3);

    assert_eq!(fs::read(workspace.path().join("a.bin"))?, b"a\xAB");
    assert_eq!(fs::read(workspace.path().join("nested/b.bin"))?, b"b\xAB");
    assert_eq!(
        fs::read(workspace.path().join("nested/deep/c.bin"))?,
        b"c\xAB"
    );
    // Files the predicate rejected never travelled and are untouched.
    assert_eq!(fs::read(workspace.path().join("readme.txt"))?, b"docs");
    assert_eq!(fs::read(workspace.path().join("nested/notes.txt"))?, b"notes");

    shutdown.send(true)?;
    server.await??;
    Ok(())
}

#[tokio::test]
async fn unsignable_single_file_is_a_successful_noop() -> Result<(), Box<dyn Error>> {
    let fixture = SharedRootFixture::new()?;
    let workspace = tempfile::tempdir()?;
    let target = write_file(workspace.path(), "readme.txt", b"docs")?;

    let builder = BuilderPipeline::new(
        fixture.config(),
        AppendByteSigner::new(),
        Metrics::new()?,
    );
    let outcome = builder.sign_path(&target).await?;
    assert_eq!(outcome, SignOutcome::NothingToSign);
    assert!(mailbox_entries(fixture.shared_dir(), MailboxKind::Unsigned).is_empty());
    Ok(())
}

#[tokio::test]
async fn builder_times_out_without_a_server_and_cleans_up() -> Result<(), Box<dyn Error>> {
    let fixture = SharedRootFixture::new()?;
    let workspace = tempfile::tempdir()?;
    let target = write_file(workspace.path(), "foo.bin", b"binary contents")?;

    let builder = BuilderPipeline::new(
        fixture.config_with_timeout(Duration::from_secs(1)),
        AppendByteSigner::new(),
        Metrics::new()?,
    );

    let started = std::time::Instant::now();
    let result = builder.sign_path(&target).await;
    let elapsed = started.elapsed();

    assert!(matches!(result, Err(PipelineError::Timeout { .. })));
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(3), "poll slack exceeded");

    // The request no longer waits for a server that will never answer.
    assert!(mailbox_entries(fixture.shared_dir(), MailboxKind::Unsigned).is_empty());
    assert_eq!(fs::read(&target)?, b"binary contents");
    Ok(())
}

#[tokio::test]
async fn concurrent_builders_do_not_cross_contaminate() -> Result<(), Box<dyn Error>> {
    let fixture = SharedRootFixture::new()?;
    let workspace_one = tempfile::tempdir()?;
    let workspace_two = tempfile::tempdir()?;
    let target_one = write_file(workspace_one.path(), "first.bin", b"first payload")?;
    let target_two = write_file(workspace_two.path(), "second.bin", b"second payload")?;

    let signer = AppendByteSigner::new();
    let (shutdown, server) = spawn_server(&fixture, signer.clone());

    let builder_one = BuilderPipeline::new(fixture.config(), signer.clone(), Metrics::new()?);
    let builder_two = BuilderPipeline::new(fixture.config(), signer.clone(), Metrics::new()?);

    let (one, two) = tokio::join!(
        builder_one.sign_path(&target_one),
        builder_two.sign_path(&target_two)
    );
    one?;
    two?;

    assert_eq!(fs::read(&target_one)?, b"first payload\xAB");
    assert_eq!(fs::read(&target_two)?, b"second payload\xAB");
    assert!(mailbox_entries(fixture.shared_dir(), MailboxKind::Unsigned).is_empty());
    assert!(mailbox_entries(fixture.shared_dir(), MailboxKind::Signed).is_empty());

    shutdown.send(true)?;
    server.await??;
    Ok(())
}

#[tokio::test]
async fn signer_failure_publishes_no_reply_and_keeps_the_request() -> Result<(), Box<dyn Error>> {
    let fixture = SharedRootFixture::new()?;
    let workspace = tempfile::tempdir()?;
    let source = write_file(workspace.path(), "foo.bin", b"binary contents")?;

    // Stage a ready request by hand so the server side can be driven
    // directly without a Builder waiting on the other end.
    let unsigned = Mailbox::new(fixture.shared_dir(), MailboxKind::Unsigned);
    unsigned.ensure_exists()?;
    let descriptor = FileDescriptor::from_file(&source)?;
    let files = vec![descriptor];
    let slot = unsigned.slot(sigrelay_archive::RequestId::new());
    pack_files(&files, slot.archive_path())?;
    slot.tag_ready()?;

    let server = ServerPipeline::new(fixture.config(), Arc::new(BrokenSigner), Metrics::new()?);
    let (_tx, mut rx) = watch::channel(false);
    let request_id = server
        .wait_for_sign_request(&mut rx)
        .await?
        .expect("request should be claimed");

    let result = server.run_signing_pipeline(request_id).await;
    assert!(matches!(result, Err(PipelineError::Signing { .. })));

    // No signed reply, and the claimed request stays for diagnosis.
    assert!(mailbox_entries(fixture.shared_dir(), MailboxKind::Signed)
        .iter()
        .all(|name| !name.ends_with(".ready")));
    let unsigned_entries = mailbox_entries(fixture.shared_dir(), MailboxKind::Unsigned);
    assert!(unsigned_entries.iter().any(|name| name.ends_with(".tar")));
    assert!(unsigned_entries.iter().any(|name| name.ends_with(".claimed")));
    Ok(())
}

#[tokio::test]
async fn server_shuts_down_between_requests() -> Result<(), Box<dyn Error>> {
    let fixture = SharedRootFixture::new()?;
    let (shutdown, server) = spawn_server(&fixture, AppendByteSigner::new());

    // Let the loop reach its poll sleep at least once.
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.send(true)?;
    server.await??;
    Ok(())
}
