//! Local file handling for arkdata.
//!
//! `WorkspaceLayout` names the directories the data-table extractor works in,
//! `payload` discovers raw data files and stages them with their fixed header
//! removed, and `archive` unpacks downloaded bundle archives.

pub mod archive;
pub mod layout;
pub mod payload;

pub use archive::extract_archive;
pub use layout::WorkspaceLayout;
pub use payload::{
    discover_payloads, list_staged, stage_payloads, trim_header, DiscoveredPayload,
    StagedPayload, PAYLOAD_HEADER_LEN,
};

use std::path::Path;
use thiserror::Error;

/// Fsync a directory so a preceding `rename()` into it is durable.
pub(crate) fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = std::fs::File::open(dir)?;
    f.sync_all()
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid archive '{path}': {message}")]
    Archive { path: String, message: String },
    #[error("archive '{path}' has unsafe entry '{entry}'")]
    UnsafeEntry { path: String, entry: String },
    #[error("cannot walk '{path}': {message}")]
    Walk { path: String, message: String },
}
