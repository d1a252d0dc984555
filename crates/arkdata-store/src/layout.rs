use crate::payload::StagedPayload;
use arkdata_schema::{SchemaName, REGISTRY_FILE};
use std::path::{Path, PathBuf};

/// Directories used by one data-table extraction run.
///
/// Raw payloads are read from `anon_dir` and `obb_dir`, staged with their
/// header trimmed under `merge_dir`, and decoded into `out_dir`, mirroring the
/// staged relative paths. `schema_dir` holds the `.fbs` sources and the
/// schema registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    pub schema_dir: PathBuf,
    pub anon_dir: PathBuf,
    pub obb_dir: PathBuf,
    pub merge_dir: PathBuf,
    pub out_dir: PathBuf,
}

impl Default for WorkspaceLayout {
    fn default() -> Self {
        Self {
            schema_dir: PathBuf::from("./flatbuffers"),
            anon_dir: PathBuf::from("./temp/extract/anon"),
            obb_dir: PathBuf::from("./temp/extract/obb"),
            merge_dir: PathBuf::from("./temp/merge"),
            out_dir: PathBuf::from("./gamedata"),
        }
    }
}

impl WorkspaceLayout {
    /// Source directories in discovery order; earlier roots win.
    pub fn source_dirs(&self) -> [&Path; 2] {
        [&self.anon_dir, &self.obb_dir]
    }

    #[inline]
    pub fn registry_path(&self) -> PathBuf {
        self.schema_dir.join(REGISTRY_FILE)
    }

    #[inline]
    pub fn schema_path(&self, schema: &SchemaName) -> PathBuf {
        self.schema_dir.join(schema.file_name())
    }

    /// Directory the decoder writes `payload`'s JSON into.
    pub fn output_dir_for(&self, payload: &StagedPayload) -> PathBuf {
        match payload.relative.parent() {
            Some(rel) => self.out_dir.join(rel),
            None => self.out_dir.clone(),
        }
    }

    /// Expected decoded output for `payload`.
    pub fn output_json_for(&self, payload: &StagedPayload) -> PathBuf {
        self.output_dir_for(payload)
            .join(format!("{}.json", payload.base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staged(relative: &str, base: &str) -> StagedPayload {
        StagedPayload {
            path: PathBuf::from("/m").join(relative),
            relative: PathBuf::from(relative),
            base: base.to_owned(),
        }
    }

    #[test]
    fn defaults_match_cli_defaults() {
        let layout = WorkspaceLayout::default();
        assert_eq!(layout.schema_dir, PathBuf::from("./flatbuffers"));
        assert_eq!(layout.out_dir, PathBuf::from("./gamedata"));
        assert_eq!(layout.source_dirs()[0], Path::new("./temp/extract/anon"));
    }

    #[test]
    fn registry_and_schema_paths() {
        let layout = WorkspaceLayout {
            schema_dir: PathBuf::from("/s"),
            ..WorkspaceLayout::default()
        };
        assert_eq!(layout.registry_path(), PathBuf::from("/s/_flatbuffers.json"));
        assert_eq!(
            layout.schema_path(&SchemaName::new("skill_table")),
            PathBuf::from("/s/skill_table.fbs")
        );
    }

    #[test]
    fn output_mirrors_relative_dir() {
        let layout = WorkspaceLayout {
            out_dir: PathBuf::from("/out"),
            ..WorkspaceLayout::default()
        };
        let nested = staged("excel/skill_table.bytes", "skill_table");
        assert_eq!(layout.output_dir_for(&nested), PathBuf::from("/out/excel"));
        assert_eq!(
            layout.output_json_for(&nested),
            PathBuf::from("/out/excel/skill_table.json")
        );
        let flat = staged("base.bytes", "base");
        assert_eq!(layout.output_dir_for(&flat), PathBuf::from("/out"));
    }
}
