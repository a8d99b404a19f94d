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

//! Signing-server bootstrap wiring.
//!
//! Layout: `bootstrap.rs` (environment loading and server wiring),
//! `signer.rs` (command-template signer plugged into the pipeline).

pub mod bootstrap;
pub mod error;
pub mod signer;

pub use bootstrap::run_app;
pub use error::{AppError, AppResult};
pub use signer::CommandSigner;
