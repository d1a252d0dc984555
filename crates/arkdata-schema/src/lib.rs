//! Data model for arkdata: hot-update manifests, the schema registry, and the schema catalog.
//!
//! This crate defines the persisted formats shared by the other crates: the
//! vendor's hot-update list (`HotUpdateList`) with its `(name, hash)` diffing,
//! the schema registry (`SchemaRegistry`) recording the known-good source
//! commit per schema file, the catalog of known schema names
//! (`SchemaCatalog`), and string newtypes for identifiers.

pub mod catalog;
pub mod manifest;
pub mod registry;
pub mod types;

pub use catalog::{SchemaCatalog, BUILTIN_MAPPINGS, BUILTIN_SCHEMAS, HASH_SUFFIX_LEN};
pub use manifest::{bundle_file_name, AbInfo, HotUpdateList, ManifestError};
pub use registry::{RegistryEntry, SchemaRegistry, REGISTRY_FILE};
pub use types::{CommitSha, SchemaName};

use std::fs;
use std::path::Path;

/// Write `content` to `path` via a temp file in the same directory and a rename.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<(), std::io::Error> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    std::io::Write::write_all(&mut tmp, content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    // Fsync parent directory to ensure rename durability on power loss.
    if let Ok(f) = fs::File::open(dir) {
        let _ = f.sync_all();
    }
    Ok(())
}
