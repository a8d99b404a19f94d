#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

//! Archive and mailbox layer for the signing relay.
//!
//! Layout: `model.rs` (request ids and file descriptors), `bundle.rs`
//! (tar pack/extract with entry sanitisation), `mailbox.rs` (mailbox
//! directories and the archive/ready-marker slot protocol).

pub mod bundle;
pub mod error;
pub mod mailbox;
pub mod model;

pub use bundle::{extract_files, pack_files};
pub use error::{ArchiveError, ArchiveResult};
pub use mailbox::{ArchiveWithIndicator, Mailbox, MailboxKind};
pub use model::{FileDescriptor, RequestId};
