//! Orchestration for the three arkdata tools.
//!
//! `sync` diffs hot-update lists and downloads changed bundles on a small
//! worker pool, `installer` resolves and downloads the installer package, and
//! `prober` decodes staged data tables, walking the schema repository's
//! history forward until a schema revision decodes cleanly. Every network and
//! subprocess collaborator is reached through a trait so the flows can be
//! exercised with in-memory fakes.

pub mod concurrency;
pub mod filter;
pub mod installer;
pub mod prereq;
pub mod prober;
pub mod sync;

pub use concurrency::{install_signal_handler, shutdown_requested};
pub use filter::{Decision, DownloadFilter};
pub use installer::{fetch_installer, InstallerOptions, InstallerOutcome};
pub use prereq::{check_gamedata_prereqs, format_missing, MissingPrereq};
pub use prober::{
    run_extraction, validate_output, ExtractReport, FlatcDecoder, PayloadDecoder, ProbeOptions,
    ProbeOutcome, SchemaProber,
};
pub use sync::{
    plan_downloads, run_asset_sync, sync_bundles, BundleFailure, BundlePool, BundleResults,
    NoProgress, SyncOptions, SyncOutcome, SyncProgress, SyncReport,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("manifest error: {0}")]
    Manifest(#[from] arkdata_schema::ManifestError),
    #[error("store error: {0}")]
    Store(#[from] arkdata_store::StoreError),
    #[error("remote error: {0}")]
    Remote(#[from] arkdata_remote::RemoteError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("decoder error: {0}")]
    Decoder(String),
}
