use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest: {0}")]
    ParseJson(#[from] serde_json::Error),
}

/// The vendor's hot-update list for one resource version.
///
/// Fields the tools do not interpret (`packInfos`, counters, ...) are kept in
/// `extra` so a rewritten list is byte-for-byte what the CDN served, modulo
/// formatting.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct HotUpdateList {
    #[serde(rename = "versionId", default)]
    pub version_id: String,
    #[serde(rename = "abInfos", default)]
    pub ab_infos: Vec<AbInfo>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One asset bundle entry of a [`HotUpdateList`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AbInfo {
    pub name: String,
    pub hash: String,
    #[serde(rename = "totalSize", default)]
    pub total_size: u64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl AbInfo {
    pub fn new(name: &str, hash: &str, total_size: u64) -> Self {
        Self {
            name: name.to_owned(),
            hash: hash.to_owned(),
            total_size,
            extra: BTreeMap::new(),
        }
    }

    /// Size in megabytes, rounded to one decimal place, as shown in progress output.
    pub fn size_mb(&self) -> f64 {
        (self.total_size as f64 / 100_000.0).round() / 10.0
    }

    /// Name of the compressed archive on the CDN for this entry.
    pub fn remote_file_name(&self) -> String {
        bundle_file_name(&self.name)
    }
}

impl HotUpdateList {
    pub fn new(version_id: &str) -> Self {
        Self {
            version_id: version_id.to_owned(),
            ..Self::default()
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, ManifestError> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Load a previously persisted list. A missing or empty file yields an
    /// empty list with an empty `versionId`.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read(path)?;
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        Self::from_bytes(&data)
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), ManifestError> {
        let content = serde_json::to_vec(self)?;
        crate::write_atomic(path.as_ref(), &content)?;
        Ok(())
    }

    /// Whether an entry with exactly this `(name, hash)` pair is listed.
    pub fn contains(&self, name: &str, hash: &str) -> bool {
        self.ab_infos
            .iter()
            .any(|e| e.name == name && e.hash == hash)
    }

    /// Set of `(name, hash)` pairs, for diffing large lists.
    pub fn index(&self) -> HashSet<(&str, &str)> {
        self.ab_infos
            .iter()
            .map(|e| (e.name.as_str(), e.hash.as_str()))
            .collect()
    }

    /// Total size in bytes of all listed entries.
    pub fn total_size(&self) -> u64 {
        self.ab_infos.iter().map(|e| e.total_size).sum()
    }
}

/// Map a bundle name to its archive name on the CDN.
///
/// `/` becomes `_`, `#` becomes `__`, everything from the first `.` is dropped,
/// and `.dat` is appended: `ui/[uc]lobby#2.ab` → `ui_[uc]lobby__2.dat`.
pub fn bundle_file_name(name: &str) -> String {
    let flat = name.replace('/', "_").replace('#', "__");
    let stem = flat.split('.').next().unwrap_or_default();
    format!("{stem}.dat")
}
