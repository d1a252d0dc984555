//! Data-table decoding with schema-version fallback.
//!
//! Each staged payload is decoded with the local copy of its schema. When the
//! output does not validate, the schema repository's history is walked
//! forward from the commit recorded in the registry: the next commit's
//! revision of the schema replaces the local file and decoding is retried.
//! The walk ends when a revision validates, history runs out, a commit would
//! repeat, or the attempt limit is hit.

use crate::CoreError;
use arkdata_remote::{CommitPageCache, RetryPolicy, SchemaHistory};
use arkdata_schema::{write_atomic, CommitSha, SchemaCatalog, SchemaName, SchemaRegistry};
use arkdata_store::{
    discover_payloads, list_staged, stage_payloads, StagedPayload, WorkspaceLayout,
};
use serde::de::IgnoredAny;
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

/// Turns a payload into JSON under an output directory.
pub trait PayloadDecoder {
    /// Decode `payload` with `schema` into `out_dir`. A decoder that runs but
    /// produces bad output is not an error; validation catches it.
    fn decode(&self, schema: &Path, payload: &Path, out_dir: &Path) -> Result<(), CoreError>;
}

/// [`PayloadDecoder`] running the FlatBuffers compiler.
#[derive(Debug, Clone)]
pub struct FlatcDecoder {
    program: PathBuf,
}

impl Default for FlatcDecoder {
    fn default() -> Self {
        Self {
            program: PathBuf::from("flatc"),
        }
    }
}

impl FlatcDecoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn args(schema: &Path, payload: &Path, out_dir: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-o".into(), out_dir.into()];
        args.extend(
            [
                "--no-warnings",
                "--json",
                "--strict-json",
                "--natural-utf8",
                "--defaults-json",
                "--raw-binary",
            ]
            .map(OsString::from),
        );
        args.push(schema.into());
        args.push("--".into());
        args.push(payload.into());
        args
    }
}

impl PayloadDecoder for FlatcDecoder {
    fn decode(&self, schema: &Path, payload: &Path, out_dir: &Path) -> Result<(), CoreError> {
        let output = Command::new(&self.program)
            .args(Self::args(schema, payload, out_dir))
            .output()
            .map_err(|e| {
                CoreError::Decoder(format!("failed to run {}: {e}", self.program.display()))
            })?;
        if !output.status.success() {
            debug!(
                "{} exited with {} for {}: {}",
                self.program.display(),
                output.status,
                payload.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

/// `true` when `path` exists and holds a single well-formed JSON document.
pub fn validate_output(path: &Path) -> bool {
    match fs::read(path) {
        Ok(data) => serde_json::from_slice::<IgnoredAny>(&data).is_ok(),
        Err(_) => false,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProbeOptions {
    /// Decode attempts per payload, counting the one with the local schema.
    pub max_attempts: u32,
    pub retry: RetryPolicy,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            max_attempts: 64,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Output validated. `commit` is the schema revision in effect, if known.
    Validated {
        schema: SchemaName,
        commit: Option<CommitSha>,
        changed: bool,
        attempts: u32,
    },
    /// File name does not map to any schema.
    UnknownSchema,
    /// Local schema failed and the registry has no commit to search from.
    NoStartingCommit { schema: SchemaName },
    /// No revision up to `last_commit` validated.
    Exhausted {
        schema: SchemaName,
        last_commit: CommitSha,
        attempts: u32,
    },
    /// History or schema fetch failed after retries.
    Failed { schema: SchemaName, reason: String },
}

impl ProbeOutcome {
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            ProbeOutcome::Validated { .. } | ProbeOutcome::UnknownSchema => None,
            ProbeOutcome::NoStartingCommit { schema } => Some(format!(
                "{} has no recorded commit to fall back from",
                schema.file_name()
            )),
            ProbeOutcome::Exhausted {
                schema,
                last_commit,
                attempts,
            } => Some(format!(
                "no revision of {} decodes it ({attempts} attempts, last {})",
                schema.file_name(),
                last_commit.short()
            )),
            ProbeOutcome::Failed { schema, reason } => {
                Some(format!("{}: {reason}", schema.file_name()))
            }
        }
    }
}

fn remove_stale(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Decodes staged payloads for one run, sharing the commit page cache and the
/// registry across payloads.
pub struct SchemaProber<'a> {
    layout: &'a WorkspaceLayout,
    catalog: &'a SchemaCatalog,
    decoder: &'a dyn PayloadDecoder,
    history: &'a dyn SchemaHistory,
    pages: CommitPageCache<'a>,
    registry: SchemaRegistry,
    /// Revision written to the local schema file during this run, which may
    /// differ from the registry after a failed walk.
    installed: HashMap<SchemaName, CommitSha>,
    opts: ProbeOptions,
}

impl<'a> SchemaProber<'a> {
    pub fn new(
        layout: &'a WorkspaceLayout,
        catalog: &'a SchemaCatalog,
        decoder: &'a dyn PayloadDecoder,
        history: &'a dyn SchemaHistory,
        registry: SchemaRegistry,
        opts: ProbeOptions,
    ) -> Self {
        Self {
            layout,
            catalog,
            decoder,
            history,
            pages: CommitPageCache::new(history, opts.retry),
            registry,
            installed: HashMap::new(),
            opts,
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    fn decode_once(
        &self,
        schema_path: &Path,
        payload: &StagedPayload,
        out_json: &Path,
    ) -> Result<bool, CoreError> {
        remove_stale(out_json)?;
        let out_dir = self.layout.output_dir_for(payload);
        self.decoder.decode(schema_path, &payload.path, &out_dir)?;
        Ok(validate_output(out_json))
    }

    /// Fetch `schema` as of `commit` and install it as the local schema file.
    fn install_revision(
        &mut self,
        schema: &SchemaName,
        commit: &CommitSha,
        schema_path: &Path,
    ) -> Result<(), String> {
        let what = format!("fetch {} at {}", schema.file_name(), commit.short());
        let text = self
            .opts
            .retry
            .run(&what, |_| self.history.schema_at(commit, schema))
            .map_err(|e| e.into_remote(&what).to_string())?;
        write_atomic(schema_path, text.as_bytes())
            .map_err(|e| format!("cannot write {}: {e}", schema_path.display()))?;
        self.installed.insert(schema.clone(), commit.clone());
        Ok(())
    }

    /// Decode one staged payload, falling back through schema history.
    pub fn probe(&mut self, payload: &StagedPayload) -> Result<ProbeOutcome, CoreError> {
        let Some(schema) = self.catalog.resolve(&payload.base) else {
            warn!(
                "Unknown schema for {}, skipping",
                payload.relative.display()
            );
            return Ok(ProbeOutcome::UnknownSchema);
        };
        let schema_file = schema.file_name();
        let schema_path = self.layout.schema_path(&schema);
        fs::create_dir_all(self.layout.output_dir_for(payload))?;
        let out_json = self.layout.output_json_for(payload);

        let mut current = self
            .installed
            .get(&schema)
            .or_else(|| self.registry.commit(&schema_file))
            .cloned();
        let mut visited: HashSet<CommitSha> = current.iter().cloned().collect();
        let mut attempts = 0;

        loop {
            attempts += 1;
            if self.decode_once(&schema_path, payload, &out_json)? {
                let changed = match &current {
                    Some(commit) => self.registry.record(&schema_file, commit),
                    None => false,
                };
                if let (true, Some(commit)) = (changed, &current) {
                    info!("Validated {schema_file} at {commit}");
                } else {
                    debug!("{} decoded with {schema_file}", payload.relative.display());
                }
                return Ok(ProbeOutcome::Validated {
                    schema,
                    commit: current,
                    changed,
                    attempts,
                });
            }

            let Some(commit) = current.clone() else {
                warn!("{schema_file} failed to decode and has no recorded commit");
                return Ok(ProbeOutcome::NoStartingCommit { schema });
            };
            if attempts >= self.opts.max_attempts {
                warn!("giving up on {schema_file} after {attempts} attempts");
                return Ok(ProbeOutcome::Exhausted {
                    schema,
                    last_commit: commit,
                    attempts,
                });
            }

            let next = match self.pages.child_of(&commit) {
                Ok(Some(next)) => next,
                Ok(None) => {
                    warn!("Error finding next commit at {commit}");
                    return Ok(ProbeOutcome::Exhausted {
                        schema,
                        last_commit: commit,
                        attempts,
                    });
                }
                Err(e) => {
                    return Ok(ProbeOutcome::Failed {
                        schema,
                        reason: e.to_string(),
                    });
                }
            };
            if !visited.insert(next.clone()) {
                warn!("commit {next} already tried for {schema_file}; history loops");
                return Ok(ProbeOutcome::Exhausted {
                    schema,
                    last_commit: commit,
                    attempts,
                });
            }

            debug!("retrying {schema_file} at {}", next.short());
            if let Err(reason) = self.install_revision(&schema, &next, &schema_path) {
                warn!("{reason}");
                return Ok(ProbeOutcome::Failed { schema, reason });
            }
            current = Some(next);
        }
    }
}

/// Summary of one extraction run.
#[derive(Debug, Default)]
pub struct ExtractReport {
    pub staged: usize,
    pub validated: usize,
    /// Registry entries moved to a new commit, as `(schema file, commit)`.
    pub updated: Vec<(String, CommitSha)>,
    pub skipped: Vec<String>,
    /// Payloads no schema revision decoded, as `(payload, reason)`.
    pub failed: Vec<(String, String)>,
}

impl ExtractReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

fn load_registry(path: &Path) -> Result<SchemaRegistry, CoreError> {
    if !path.exists() {
        warn!("{} not found; starting with an empty registry", path.display());
        return Ok(SchemaRegistry::new());
    }
    Ok(SchemaRegistry::load(path)?)
}

/// Stage raw payloads, decode everything under the merge directory, and save
/// the registry if any entry moved.
pub fn run_extraction(
    layout: &WorkspaceLayout,
    catalog: &SchemaCatalog,
    decoder: &dyn PayloadDecoder,
    history: &dyn SchemaHistory,
    opts: ProbeOptions,
) -> Result<ExtractReport, CoreError> {
    let found = discover_payloads(&layout.source_dirs(), catalog)?;
    let staged = stage_payloads(&found, &layout.merge_dir)?;
    info!("staged {} payloads into {}", staged.len(), layout.merge_dir.display());

    let registry_path = layout.registry_path();
    let registry = load_registry(&registry_path)?;
    let mut prober = SchemaProber::new(layout, catalog, decoder, history, registry, opts);

    let mut report = ExtractReport {
        staged: staged.len(),
        ..ExtractReport::default()
    };
    for payload in list_staged(&layout.merge_dir)? {
        let name = payload.relative.display().to_string();
        let outcome = prober.probe(&payload)?;
        match &outcome {
            ProbeOutcome::Validated {
                schema,
                commit,
                changed,
                ..
            } => {
                report.validated += 1;
                if let (true, Some(commit)) = (*changed, commit) {
                    report.updated.push((schema.file_name(), commit.clone()));
                }
            }
            ProbeOutcome::UnknownSchema => report.skipped.push(name),
            other => {
                let reason = other.failure_reason().unwrap_or_default();
                report.failed.push((name, reason));
            }
        }
    }

    if !report.updated.is_empty() {
        prober.registry().write_to_file(&registry_path)?;
        debug!("wrote {}", registry_path.display());
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arkdata_remote::{CommitInfo, ParentRef, RemoteError};
    use std::cell::RefCell;

    /// Writes valid JSON only when the schema text equals `good`.
    struct ScriptedDecoder {
        good: String,
        seen: RefCell<Vec<String>>,
    }

    impl ScriptedDecoder {
        fn new(good: &str) -> Self {
            Self {
                good: good.to_owned(),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl PayloadDecoder for ScriptedDecoder {
        fn decode(&self, schema: &Path, payload: &Path, out_dir: &Path) -> Result<(), CoreError> {
            let text = fs::read_to_string(schema)?;
            self.seen.borrow_mut().push(text.clone());
            let stem = payload.file_stem().unwrap().to_str().unwrap();
            let out = out_dir.join(format!("{stem}.json"));
            if text == self.good {
                fs::write(out, br#"{"decoded": true}"#)?;
            } else {
                fs::write(out, b"{\"decoded\": ")?;
            }
            Ok(())
        }
    }

    /// Linear history `c0 <- c1 <- ... <- c{n-1}`; schema text at `cK` is `rev-cK`.
    struct ChainHistory {
        commits: Vec<CommitInfo>,
        fetched: RefCell<Vec<String>>,
    }

    impl ChainHistory {
        fn linear(n: usize) -> Self {
            let mut commits: Vec<CommitInfo> = (0..n)
                .map(|i| CommitInfo {
                    sha: CommitSha::new(format!("c{i}")),
                    parents: i
                        .checked_sub(1)
                        .map(|p| {
                            vec![ParentRef {
                                sha: CommitSha::new(format!("c{p}")),
                            }]
                        })
                        .unwrap_or_default(),
                })
                .collect();
            commits.reverse();
            Self {
                commits,
                fetched: RefCell::new(Vec::new()),
            }
        }

        fn fetched(&self) -> Vec<String> {
            self.fetched.borrow().clone()
        }
    }

    impl SchemaHistory for ChainHistory {
        fn commits_page(&self, page: u32) -> Result<Vec<CommitInfo>, RemoteError> {
            // Three commits per page to exercise paging.
            let start = (page as usize - 1) * 3;
            Ok(self.commits.iter().skip(start).take(3).cloned().collect())
        }

        fn schema_at(&self, commit: &CommitSha, _: &SchemaName) -> Result<String, RemoteError> {
            self.fetched.borrow_mut().push(commit.to_string());
            Ok(format!("rev-{commit}"))
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        layout: WorkspaceLayout,
        catalog: SchemaCatalog,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path();
            let layout = WorkspaceLayout {
                schema_dir: root.join("flatbuffers"),
                anon_dir: root.join("anon"),
                obb_dir: root.join("obb"),
                merge_dir: root.join("merge"),
                out_dir: root.join("gamedata"),
            };
            fs::create_dir_all(&layout.schema_dir).unwrap();
            Self {
                _dir: dir,
                layout,
                catalog: SchemaCatalog::default(),
            }
        }

        fn schema(&self, name: &str, text: &str, commit: Option<&str>) {
            fs::write(self.layout.schema_dir.join(format!("{name}.fbs")), text).unwrap();
            if let Some(commit) = commit {
                let path = self.layout.registry_path();
                let mut reg = if path.exists() {
                    SchemaRegistry::load(&path).unwrap()
                } else {
                    SchemaRegistry::new()
                };
                reg.record(&format!("{name}.fbs"), &CommitSha::new(commit));
                reg.write_to_file(&path).unwrap();
            }
        }

        fn staged(&self, relative: &str) -> StagedPayload {
            let path = self.layout.merge_dir.join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, b"payload").unwrap();
            let base = Path::new(relative)
                .file_stem()
                .unwrap()
                .to_str()
                .unwrap()
                .to_owned();
            StagedPayload {
                path,
                relative: PathBuf::from(relative),
                base,
            }
        }

        fn registry(&self) -> SchemaRegistry {
            SchemaRegistry::load(self.layout.registry_path()).unwrap()
        }

        fn prober<'a>(
            &'a self,
            decoder: &'a dyn PayloadDecoder,
            history: &'a dyn SchemaHistory,
            opts: ProbeOptions,
        ) -> SchemaProber<'a> {
            SchemaProber::new(
                &self.layout,
                &self.catalog,
                decoder,
                history,
                self.registry(),
                opts,
            )
        }
    }

    fn opts() -> ProbeOptions {
        ProbeOptions {
            max_attempts: 64,
            retry: RetryPolicy::immediate(1),
        }
    }

    #[test]
    fn flatc_arguments_are_fixed() {
        let args = FlatcDecoder::args(
            Path::new("fb/skill_table.fbs"),
            Path::new("merge/skill_table.bytes"),
            Path::new("out/excel"),
        );
        let args: Vec<&str> = args.iter().map(|a| a.to_str().unwrap()).collect();
        assert_eq!(
            args,
            vec![
                "-o",
                "out/excel",
                "--no-warnings",
                "--json",
                "--strict-json",
                "--natural-utf8",
                "--defaults-json",
                "--raw-binary",
                "fb/skill_table.fbs",
                "--",
                "merge/skill_table.bytes",
            ]
        );
    }

    #[test]
    fn missing_decoder_program_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let decoder = FlatcDecoder::new(dir.path().join("no-such-flatc"));
        let err = decoder
            .decode(Path::new("a.fbs"), Path::new("a.bytes"), dir.path())
            .unwrap_err();
        assert!(matches!(err, CoreError::Decoder(_)));
    }

    #[test]
    fn validate_requires_complete_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.json");
        assert!(!validate_output(&path));
        fs::write(&path, b"").unwrap();
        assert!(!validate_output(&path));
        fs::write(&path, b"{\"a\": [1, 2").unwrap();
        assert!(!validate_output(&path));
        fs::write(&path, b"{\"a\": [1, 2]}").unwrap();
        assert!(validate_output(&path));
    }

    #[test]
    fn current_schema_validates_without_history() {
        let fx = Fixture::new();
        fx.schema("skill_table", "rev-c3", Some("c3"));
        let payload = fx.staged("excel/skill_table.bytes");
        let decoder = ScriptedDecoder::new("rev-c3");
        let history = ChainHistory::linear(6);

        let mut prober = fx.prober(&decoder, &history, opts());
        let outcome = prober.probe(&payload).unwrap();
        assert_eq!(
            outcome,
            ProbeOutcome::Validated {
                schema: SchemaName::new("skill_table"),
                commit: Some(CommitSha::new("c3")),
                changed: false,
                attempts: 1,
            }
        );
        assert!(history.fetched().is_empty());
        assert!(validate_output(
            &fx.layout.out_dir.join("excel/skill_table.json")
        ));
    }

    #[test]
    fn fallback_converges_on_first_valid_commit() {
        let fx = Fixture::new();
        fx.schema("skill_table", "rev-c1", Some("c1"));
        let payload = fx.staged("excel/skill_table.bytes");
        let decoder = ScriptedDecoder::new("rev-c5");
        let history = ChainHistory::linear(9);

        let mut prober = fx.prober(&decoder, &history, opts());
        let outcome = prober.probe(&payload).unwrap();
        assert!(matches!(
            outcome,
            ProbeOutcome::Validated { changed: true, attempts: 5, .. }
        ));
        assert_eq!(history.fetched(), vec!["c2", "c3", "c4", "c5"]);
        assert_eq!(
            *decoder.seen.borrow(),
            vec!["rev-c1", "rev-c2", "rev-c3", "rev-c4", "rev-c5"]
        );
        assert_eq!(
            prober.registry().commit("skill_table.fbs"),
            Some(&CommitSha::new("c5"))
        );
        assert_eq!(
            fs::read_to_string(fx.layout.schema_path(&SchemaName::new("skill_table"))).unwrap(),
            "rev-c5"
        );
    }

    #[test]
    fn exhausted_history_keeps_last_revision() {
        let fx = Fixture::new();
        fx.schema("item_table", "rev-c0", Some("c0"));
        let payload = fx.staged("item_table.bytes");
        let decoder = ScriptedDecoder::new("never");
        let history = ChainHistory::linear(4);

        let mut prober = fx.prober(&decoder, &history, opts());
        let outcome = prober.probe(&payload).unwrap();
        assert_eq!(
            outcome,
            ProbeOutcome::Exhausted {
                schema: SchemaName::new("item_table"),
                last_commit: CommitSha::new("c3"),
                attempts: 4,
            }
        );
        assert_eq!(
            fs::read_to_string(fx.layout.schema_path(&SchemaName::new("item_table"))).unwrap(),
            "rev-c3"
        );
        assert_eq!(
            prober.registry().commit("item_table.fbs"),
            Some(&CommitSha::new("c0"))
        );
    }

    /// Writes valid JSON when the schema text equals the entry for the
    /// payload's stem.
    struct PerPayloadDecoder {
        good: HashMap<String, String>,
    }

    impl PayloadDecoder for PerPayloadDecoder {
        fn decode(&self, schema: &Path, payload: &Path, out_dir: &Path) -> Result<(), CoreError> {
            let text = fs::read_to_string(schema)?;
            let stem = payload.file_stem().unwrap().to_str().unwrap();
            let body: &[u8] = if self.good.get(stem) == Some(&text) {
                b"{}"
            } else {
                b"{"
            };
            fs::write(out_dir.join(format!("{stem}.json")), body)?;
            Ok(())
        }
    }

    #[test]
    fn shared_schema_continues_from_installed_revision() {
        let fx = Fixture::new();
        fx.schema("prts___levels", "rev-c0", Some("c0"));
        let first = fx.staged("levels/level_main_01-01.bytes");
        let second = fx.staged("levels/level_main_01-02.bytes");
        let decoder = PerPayloadDecoder {
            good: [("level_main_01-02".to_owned(), "rev-c3".to_owned())]
                .into_iter()
                .collect(),
        };
        let history = ChainHistory::linear(4);

        let mut prober = fx.prober(&decoder, &history, opts());
        let outcome = prober.probe(&first).unwrap();
        assert!(matches!(outcome, ProbeOutcome::Exhausted { .. }));

        let outcome = prober.probe(&second).unwrap();
        assert_eq!(
            outcome,
            ProbeOutcome::Validated {
                schema: SchemaName::new("prts___levels"),
                commit: Some(CommitSha::new("c3")),
                changed: true,
                attempts: 1,
            }
        );
        assert_eq!(
            prober.registry().commit("prts___levels.fbs"),
            Some(&CommitSha::new("c3"))
        );
        assert_eq!(history.fetched(), vec!["c1", "c2", "c3"]);
    }

    #[test]
    fn attempt_limit_stops_the_walk() {
        let fx = Fixture::new();
        fx.schema("item_table", "rev-c0", Some("c0"));
        let payload = fx.staged("item_table.bytes");
        let decoder = ScriptedDecoder::new("rev-c8");
        let history = ChainHistory::linear(9);

        let limited = ProbeOptions {
            max_attempts: 3,
            ..opts()
        };
        let mut prober = fx.prober(&decoder, &history, limited);
        let outcome = prober.probe(&payload).unwrap();
        assert!(matches!(outcome, ProbeOutcome::Exhausted { attempts: 3, .. }));
        assert_eq!(history.fetched(), vec!["c1", "c2"]);
    }

    /// Two commits that each list the other as first parent.
    struct LoopingHistory;

    impl SchemaHistory for LoopingHistory {
        fn commits_page(&self, page: u32) -> Result<Vec<CommitInfo>, RemoteError> {
            if page > 1 {
                return Ok(Vec::new());
            }
            let info = |sha: &str, parent: &str| CommitInfo {
                sha: CommitSha::new(sha),
                parents: vec![ParentRef {
                    sha: CommitSha::new(parent),
                }],
            };
            Ok(vec![info("a", "b"), info("b", "a")])
        }

        fn schema_at(&self, commit: &CommitSha, _: &SchemaName) -> Result<String, RemoteError> {
            Ok(format!("rev-{commit}"))
        }
    }

    #[test]
    fn revisited_commit_ends_the_walk() {
        let fx = Fixture::new();
        fx.schema("item_table", "rev-a", Some("a"));
        let payload = fx.staged("item_table.bytes");
        let decoder = ScriptedDecoder::new("never");

        let mut prober = fx.prober(&decoder, &LoopingHistory, opts());
        let outcome = prober.probe(&payload).unwrap();
        assert!(matches!(outcome, ProbeOutcome::Exhausted { attempts: 2, .. }));
        assert_eq!(decoder.seen.borrow().len(), 2);
    }

    #[test]
    fn no_registry_entry_cannot_fall_back() {
        let fx = Fixture::new();
        fx.schema("skill_table", "rev-c0", Some("c0"));
        fx.schema("item_table", "local", None);
        let payload = fx.staged("item_table.bytes");
        let decoder = ScriptedDecoder::new("rev-c0");
        let history = ChainHistory::linear(3);

        let mut prober = fx.prober(&decoder, &history, opts());
        let outcome = prober.probe(&payload).unwrap();
        assert_eq!(
            outcome,
            ProbeOutcome::NoStartingCommit {
                schema: SchemaName::new("item_table")
            }
        );
        assert!(history.fetched().is_empty());
    }

    #[test]
    fn unknown_payload_is_skipped() {
        let fx = Fixture::new();
        fx.schema("skill_table", "rev-c0", Some("c0"));
        let payload = fx.staged("mystery.bytes");
        let decoder = ScriptedDecoder::new("rev-c0");
        let history = ChainHistory::linear(3);

        let mut prober = fx.prober(&decoder, &history, opts());
        assert_eq!(prober.probe(&payload).unwrap(), ProbeOutcome::UnknownSchema);
        assert!(decoder.seen.borrow().is_empty());
    }

    #[test]
    fn stale_output_does_not_validate() {
        let fx = Fixture::new();
        fx.schema("item_table", "rev-c2", Some("c2"));
        let payload = fx.staged("item_table.bytes");
        let stale = fx.layout.out_dir.join("item_table.json");
        fs::create_dir_all(&fx.layout.out_dir).unwrap();
        fs::write(&stale, b"{}").unwrap();

        /// Runs but never writes output.
        struct SilentDecoder;
        impl PayloadDecoder for SilentDecoder {
            fn decode(&self, _: &Path, _: &Path, _: &Path) -> Result<(), CoreError> {
                Ok(())
            }
        }

        let history = ChainHistory::linear(3);
        let mut prober = fx.prober(&SilentDecoder, &history, opts());
        let outcome = prober.probe(&payload).unwrap();
        assert!(matches!(outcome, ProbeOutcome::Exhausted { .. }));
        assert!(!stale.exists());
    }

    /// History whose listing always fails.
    struct DownHistory;

    impl SchemaHistory for DownHistory {
        fn commits_page(&self, _: u32) -> Result<Vec<CommitInfo>, RemoteError> {
            Err(RemoteError::Status {
                code: 403,
                url: "api".to_owned(),
            })
        }

        fn schema_at(&self, _: &CommitSha, _: &SchemaName) -> Result<String, RemoteError> {
            Err(RemoteError::NotFound("raw".to_owned()))
        }
    }

    #[test]
    fn history_failure_is_reported_per_payload() {
        let fx = Fixture::new();
        fx.schema("item_table", "rev-c0", Some("c0"));
        let payload = fx.staged("item_table.bytes");
        let decoder = ScriptedDecoder::new("never");

        let mut prober = fx.prober(&decoder, &DownHistory, opts());
        let outcome = prober.probe(&payload).unwrap();
        let ProbeOutcome::Failed { reason, .. } = outcome else {
            panic!("expected failure, got {outcome:?}");
        };
        assert!(reason.contains("403"));
    }

    #[test]
    fn extraction_stages_decodes_and_saves_registry() {
        let fx = Fixture::new();
        fx.schema("skill_table", "rev-c0", Some("c0"));
        fx.schema("item_table", "rev-c2", Some("c2"));

        let mut raw = vec![0u8; arkdata_store::PAYLOAD_HEADER_LEN];
        raw.extend_from_slice(b"body");
        let anon_excel = fx.layout.anon_dir.join("gamedata/excel");
        fs::create_dir_all(&anon_excel).unwrap();
        fs::write(anon_excel.join("skill_table9f8e7d.bytes"), &raw).unwrap();
        fs::write(anon_excel.join("item_table.bytes"), &raw).unwrap();
        fs::write(anon_excel.join("unknown_blob.bytes"), &raw).unwrap();

        // Valid output for `rev-c2` only.
        let decoder = ScriptedDecoder::new("rev-c2");
        let history = ChainHistory::linear(5);
        let report = run_extraction(
            &fx.layout,
            &fx.catalog,
            &decoder,
            &history,
            opts(),
        )
        .unwrap();

        assert_eq!(report.staged, 2);
        assert_eq!(report.validated, 2);
        assert!(report.is_complete());
        assert_eq!(
            report.updated,
            vec![("skill_table.fbs".to_owned(), CommitSha::new("c2"))]
        );
        assert_eq!(
            fs::read(fx.layout.merge_dir.join("gamedata/excel/skill_table.bytes")).unwrap(),
            b"body"
        );
        assert!(validate_output(
            &fx.layout.out_dir.join("gamedata/excel/item_table.json")
        ));
        assert_eq!(
            fx.registry().commit("skill_table.fbs"),
            Some(&CommitSha::new("c2"))
        );
        assert_eq!(fx.registry().commit("item_table.fbs"), Some(&CommitSha::new("c2")));
    }

    #[test]
    fn extraction_without_registry_file() {
        let fx = Fixture::new();
        fx.schema("item_table", "rev-x", None);
        let _ = fx.staged("item_table.bytes");
        let decoder = ScriptedDecoder::new("rev-x");
        let report = run_extraction(
            &fx.layout,
            &fx.catalog,
            &decoder,
            &ChainHistory::linear(1),
            opts(),
        )
        .unwrap();
        assert_eq!(report.validated, 1);
        assert!(report.updated.is_empty());
        assert!(!fx.layout.registry_path().exists());
    }
}
