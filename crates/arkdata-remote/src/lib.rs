//! Remote endpoints consumed by arkdata.
//!
//! This crate wraps every network collaborator behind a small trait so the
//! orchestration in `arkdata-core` can be tested against in-memory fakes:
//! the vendor CDN (`AssetBackend`), the schema repository's commit history and
//! raw files (`SchemaHistory`), and installer download pages (`InstallerSource`).
//! It also provides the shared HTTP client, the retry policy, and endpoint
//! configuration.

pub mod cdn;
pub mod config;
pub mod history;
pub mod http;
pub mod installer;
pub mod retry;

pub use cdn::{AssetVersion, CdnBackend};
pub use config::{InstallerKind, RemoteConfig, SchemaRepoConfig, Server, ServerConfig};
pub use history::{CommitInfo, CommitPageCache, GitHubHistory, ParentRef};
pub use http::HttpClient;
pub use installer::HttpInstallerSource;
pub use retry::{RetryExhausted, RetryPolicy};

use arkdata_schema::{CommitSha, HotUpdateList, SchemaName};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("HTTP {code} for {url}")]
    Status { code: u16, url: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("remote config error: {0}")]
    Config(String),
    #[error("could not resolve download URL: {0}")]
    Resolve(String),
    #[error("{what} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        what: String,
        attempts: u32,
        last: Box<RemoteError>,
    },
}

impl From<serde_json::Error> for RemoteError {
    fn from(e: serde_json::Error) -> Self {
        RemoteError::Serialization(e.to_string())
    }
}

/// Trait for the vendor's hot-update CDN.
pub trait AssetBackend: Send + Sync {
    /// Look up the current resource version and the asset base URL for it.
    fn resolve_version(&self) -> Result<AssetVersion, RemoteError>;

    /// Download the hot-update list for a resource version.
    fn fetch_list(&self, version: &AssetVersion) -> Result<HotUpdateList, RemoteError>;

    /// Download one bundle archive to `dest`. Returns the number of bytes written.
    fn download_bundle(
        &self,
        version: &AssetVersion,
        file_name: &str,
        dest: &Path,
    ) -> Result<u64, RemoteError>;
}

/// Trait for the repository holding versioned schema sources.
pub trait SchemaHistory {
    /// One page (1-based) of the branch's commit listing, newest first.
    /// An empty page means history is exhausted.
    fn commits_page(&self, page: u32) -> Result<Vec<CommitInfo>, RemoteError>;

    /// Source text of `schema` as of `commit`.
    fn schema_at(&self, commit: &CommitSha, schema: &SchemaName) -> Result<String, RemoteError>;
}

/// Trait for installer package download pages.
pub trait InstallerSource {
    /// Resolve the current installer download URL for a server.
    fn resolve_url(&self, server: Server) -> Result<String, RemoteError>;

    /// Download `url` to `dest`. Returns the number of bytes written.
    fn download(&self, url: &str, dest: &Path) -> Result<u64, RemoteError>;
}
