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

//! Builder and Signer pipelines coordinating code-signing through a shared
//! directory.
//!
//! A Builder packs the files needing signature into a tar archive, drops it
//! with a ready marker into the `unsigned/` mailbox, and polls `signed/` for
//! the reply. The long-lived signing server polls the opposite direction,
//! invoking an injected [`Signer`] capability to mutate the files in place.
//!
//! Layout: `signer.rs` (the injected capability), `builder.rs` (client
//! role), `server.rs` (server role and its poll loop).

pub mod builder;
pub mod error;
pub mod server;
pub mod signer;

pub use builder::{BuilderPipeline, SignOutcome};
pub use error::{PipelineError, PipelineResult};
pub use server::ServerPipeline;
pub use signer::{SignError, Signer};
