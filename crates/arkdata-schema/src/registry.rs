use crate::manifest::ManifestError;
use crate::types::CommitSha;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// File name of the registry inside the schema directory.
pub const REGISTRY_FILE: &str = "_flatbuffers.json";

/// Known-good source commit for one schema file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistryEntry {
    pub commit: CommitSha,
}

/// The schema registry: maps schema file names (`character_table.fbs`) to the
/// commit of the schema repository whose version last decoded successfully.
/// Example: `{"skill_table.fbs": {"commit": "1f0c..."}}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaRegistry {
    #[serde(flatten)]
    pub entries: BTreeMap<String, RegistryEntry>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, ManifestError> {
        Ok(serde_json::from_slice(data)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let data = fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Serialize with 4-space indentation, the layout the registry is kept in upstream.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ManifestError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        Ok(buf)
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), ManifestError> {
        let content = self.to_bytes()?;
        crate::write_atomic(path.as_ref(), &content)?;
        Ok(())
    }

    /// Recorded commit for a schema file name.
    pub fn commit(&self, schema_file: &str) -> Option<&CommitSha> {
        self.entries.get(schema_file).map(|e| &e.commit)
    }

    /// Record `commit` for `schema_file`. Returns `true` if the registry changed.
    pub fn record(&mut self, schema_file: &str, commit: &CommitSha) -> bool {
        match self.entries.get_mut(schema_file) {
            Some(entry) if entry.commit == *commit => false,
            Some(entry) => {
                entry.commit = commit.clone();
                true
            }
            None => {
                self.entries.insert(
                    schema_file.to_owned(),
                    RegistryEntry {
                        commit: commit.clone(),
                    },
                );
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
