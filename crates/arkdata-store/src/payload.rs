use crate::StoreError;
use arkdata_schema::SchemaCatalog;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Bytes of vendor header preceding the payload proper.
pub const PAYLOAD_HEADER_LEN: usize = 128;

const PAYLOAD_EXT: &str = ".bytes";

/// `input` without its header; empty when `input` is shorter than the header.
pub fn trim_header(input: &[u8]) -> &[u8] {
    input.get(PAYLOAD_HEADER_LEN..).unwrap_or_default()
}

/// A raw payload found in a source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPayload {
    /// Base name with any hash suffix removed.
    pub core: String,
    pub source: PathBuf,
    /// Staging path relative to the merge directory.
    pub relative: PathBuf,
}

/// A header-trimmed payload under the merge directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedPayload {
    pub path: PathBuf,
    /// Path relative to the merge directory.
    pub relative: PathBuf,
    /// File name without the `.bytes` extension.
    pub base: String,
}

fn walk_error(root: &Path, e: &walkdir::Error) -> StoreError {
    StoreError::Walk {
        path: root.display().to_string(),
        message: e.to_string(),
    }
}

/// Payload files under `root` in a stable order, as `(path, base name)`.
/// A missing root yields nothing.
fn payload_files(root: &Path) -> Result<Vec<(PathBuf, String)>, StoreError> {
    if !root.is_dir() {
        tracing::debug!("{} does not exist, skipping", root.display());
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| walk_error(root, &e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(base) = entry
            .file_name()
            .to_str()
            .and_then(|n| n.strip_suffix(PAYLOAD_EXT))
        else {
            continue;
        };
        files.push((entry.path().to_path_buf(), base.to_owned()));
    }
    Ok(files)
}

/// Find decodable payloads under `roots`, in order.
///
/// A file's core name is its base name if the catalog knows it, else the base
/// name minus a hash suffix. Files with no known core are skipped with a
/// warning. The first file seen for a core wins.
pub fn discover_payloads(
    roots: &[&Path],
    catalog: &SchemaCatalog,
) -> Result<Vec<DiscoveredPayload>, StoreError> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    for root in roots {
        for (path, base) in payload_files(root)? {
            let Some(core) = catalog.payload_core(&base) else {
                tracing::warn!("Unknown FBS schema '{base}{PAYLOAD_EXT}'");
                continue;
            };
            if !seen.insert(core.to_owned()) {
                tracing::debug!("{} duplicates '{core}', ignoring", path.display());
                continue;
            }
            let rel_dir = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .unwrap_or_else(|| Path::new(""));
            found.push(DiscoveredPayload {
                core: core.to_owned(),
                relative: rel_dir.join(format!("{core}{PAYLOAD_EXT}")),
                source: path,
            });
        }
    }
    Ok(found)
}

/// Copy each payload into `merge_dir` with its header removed.
pub fn stage_payloads(
    payloads: &[DiscoveredPayload],
    merge_dir: &Path,
) -> Result<Vec<PathBuf>, StoreError> {
    let mut staged = Vec::with_capacity(payloads.len());
    for payload in payloads {
        let dest = merge_dir.join(&payload.relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = fs::read(&payload.source)?;
        let body = trim_header(&raw);
        fs::write(&dest, body)?;
        tracing::debug!(
            "staged {} -> {} ({} bytes)",
            payload.source.display(),
            dest.display(),
            body.len()
        );
        staged.push(dest);
    }
    Ok(staged)
}

/// Every staged payload under `merge_dir`, in a stable order.
pub fn list_staged(merge_dir: &Path) -> Result<Vec<StagedPayload>, StoreError> {
    payload_files(merge_dir)?
        .into_iter()
        .map(|(path, base)| {
            let relative = path
                .strip_prefix(merge_dir)
                .map(Path::to_path_buf)
                .map_err(|e| StoreError::Walk {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
            Ok(StagedPayload {
                path,
                relative,
                base,
            })
        })
        .collect()
}
