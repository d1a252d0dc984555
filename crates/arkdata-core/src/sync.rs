//! Hot-update bundle synchronization.
//!
//! A run resolves the server's current resource version, diffs its
//! hot-update list against the list saved by the previous run, downloads and
//! unpacks the changed bundles on a fixed-size worker pool, and saves the new
//! list. Entries that did not complete are left out of the saved list so the
//! next run plans them again.

use crate::filter::DownloadFilter;
use crate::CoreError;
use arkdata_remote::{AssetBackend, AssetVersion, RetryPolicy};
use arkdata_schema::{AbInfo, HotUpdateList};
use arkdata_store::extract_archive;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, error, info};

/// Inputs of one asset sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub dest: PathBuf,
    pub old_list: PathBuf,
    pub filter: DownloadFilter,
    pub workers: usize,
    pub retry: RetryPolicy,
}

/// Progress callbacks from the download pool. Called from worker threads.
pub trait SyncProgress: Sync {
    fn planned(&self, _count: usize, _bytes: u64) {}
    fn started(&self, _entry: &AbInfo) {}
    fn finished(&self, _entry: &AbInfo, _ok: bool) {}
}

/// Ignores every progress event.
pub struct NoProgress;

impl SyncProgress for NoProgress {}

/// A bundle that could not be downloaded and unpacked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleFailure {
    pub name: String,
    pub error: String,
}

/// What the worker pool got through.
#[derive(Debug, Default)]
pub struct BundleResults {
    pub completed: Vec<String>,
    pub failed: Vec<BundleFailure>,
    /// Planned entries never picked up because shutdown was requested.
    pub not_started: Vec<String>,
    pub bytes: u64,
}

/// Shared, read-only state of the download pool.
pub struct BundlePool<'a> {
    pub backend: &'a dyn AssetBackend,
    pub version: &'a AssetVersion,
    pub dest: &'a Path,
    pub workers: usize,
    pub retry: RetryPolicy,
}

#[derive(Debug)]
pub struct SyncReport {
    pub old_version: String,
    pub new_version: String,
    /// `versionId` written to the saved list.
    pub saved_version: String,
    pub total_entries: usize,
    pub planned: usize,
    pub downloaded: Vec<String>,
    pub failed: Vec<BundleFailure>,
    pub not_started: Vec<String>,
    pub bytes: u64,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.not_started.is_empty()
    }
}

#[derive(Debug)]
pub enum SyncOutcome {
    /// The saved list already has the current version and nothing is forced.
    UpToDate { version: String },
    Synced(SyncReport),
}

/// Entries of `new` to download, in list order.
pub fn plan_downloads<'a>(
    old: &HotUpdateList,
    new: &'a HotUpdateList,
    filter: &DownloadFilter,
) -> Vec<&'a AbInfo> {
    let index = old.index();
    new.ab_infos
        .iter()
        .filter(|e| filter.decide(e, &index).downloads())
        .collect()
}

/// Download `<file>.dat` into the destination, unpack it there, and delete
/// the archive, retrying the whole step.
fn fetch_bundle(pool: &BundlePool<'_>, entry: &AbInfo) -> Result<u64, String> {
    let file_name = entry.remote_file_name();
    let archive = pool.dest.join(&file_name);
    let result = pool.retry.run(&format!("download {file_name}"), |_| {
        let bytes = pool
            .backend
            .download_bundle(pool.version, &file_name, &archive)?;
        let files = extract_archive(&archive, pool.dest)?;
        debug!("{file_name}: {bytes} bytes, {files} files");
        Ok::<u64, CoreError>(bytes)
    });
    result.map_err(|e| {
        let _ = std::fs::remove_file(&archive);
        e.to_string()
    })
}

/// Run `plan` on the pool. Workers stop taking new entries once
/// `should_stop` returns true; entries in flight still finish.
pub fn sync_bundles(
    pool: &BundlePool<'_>,
    plan: &[&AbInfo],
    progress: &dyn SyncProgress,
    should_stop: &(dyn Fn() -> bool + Sync),
) -> BundleResults {
    let next = AtomicUsize::new(0);
    let results = Mutex::new(BundleResults::default());
    let workers = pool.workers.clamp(1, plan.len().max(1));

    std::thread::scope(|s| {
        for _ in 0..workers {
            s.spawn(|| loop {
                if should_stop() {
                    break;
                }
                let i = next.fetch_add(1, Ordering::SeqCst);
                let Some(entry) = plan.get(i) else {
                    break;
                };
                info!("{:.1} MB {}", entry.size_mb(), entry.name);
                progress.started(entry);
                let outcome = fetch_bundle(pool, entry);
                progress.finished(entry, outcome.is_ok());

                let mut r = results.lock().unwrap_or_else(PoisonError::into_inner);
                match outcome {
                    Ok(bytes) => {
                        r.bytes += bytes;
                        r.completed.push(entry.name.clone());
                    }
                    Err(e) => {
                        error!("failed to download {}: {e}", entry.name);
                        r.failed.push(BundleFailure {
                            name: entry.name.clone(),
                            error: e,
                        });
                    }
                }
            });
        }
    });

    let mut results = results.into_inner().unwrap_or_else(PoisonError::into_inner);
    let claimed = next.load(Ordering::SeqCst).min(plan.len());
    results.not_started = plan[claimed..].iter().map(|e| e.name.clone()).collect();
    results
}

/// The list to save after a run: `new` minus incomplete entries. If anything
/// is incomplete the old `versionId` is kept so the next run is not skipped
/// as up to date.
fn list_to_save(
    old: &HotUpdateList,
    new: &HotUpdateList,
    results: &BundleResults,
) -> HotUpdateList {
    let incomplete: HashSet<&str> = results
        .failed
        .iter()
        .map(|f| f.name.as_str())
        .chain(results.not_started.iter().map(String::as_str))
        .collect();
    let mut saved = new.clone();
    if !incomplete.is_empty() {
        saved
            .ab_infos
            .retain(|e| !incomplete.contains(e.name.as_str()));
        saved.version_id.clone_from(&old.version_id);
    }
    saved
}

/// Run a full sync against `backend`. Shutdown is polled via
/// [`crate::shutdown_requested`].
pub fn run_asset_sync(
    backend: &dyn AssetBackend,
    opts: &SyncOptions,
    progress: &dyn SyncProgress,
) -> Result<SyncOutcome, CoreError> {
    run_asset_sync_with(backend, opts, progress, &crate::shutdown_requested)
}

fn run_asset_sync_with(
    backend: &dyn AssetBackend,
    opts: &SyncOptions,
    progress: &dyn SyncProgress,
    should_stop: &(dyn Fn() -> bool + Sync),
) -> Result<SyncOutcome, CoreError> {
    let old = HotUpdateList::load_or_default(&opts.old_list)?;
    let version = opts
        .retry
        .run("resolve resource version", |_| backend.resolve_version())
        .map_err(|e| e.into_remote("resolve resource version"))?;
    info!("resource version {}", version.res_version);

    if old.version_id == version.res_version && !opts.filter.has_always() {
        return Ok(SyncOutcome::UpToDate {
            version: version.res_version,
        });
    }

    let new = opts
        .retry
        .run("fetch hot-update list", |_| backend.fetch_list(&version))
        .map_err(|e| e.into_remote("fetch hot-update list"))?;
    let plan = plan_downloads(&old, &new, &opts.filter);
    info!(
        "{} of {} bundles to download",
        plan.len(),
        new.ab_infos.len()
    );

    std::fs::create_dir_all(&opts.dest)?;
    progress.planned(plan.len(), plan.iter().map(|e| e.total_size).sum());
    let pool = BundlePool {
        backend,
        version: &version,
        dest: &opts.dest,
        workers: opts.workers,
        retry: opts.retry,
    };
    let results = sync_bundles(&pool, &plan, progress, should_stop);
    let planned = plan.len();
    let total_entries = new.ab_infos.len();

    let saved = list_to_save(&old, &new, &results);
    saved.write_to_file(&opts.old_list)?;
    debug!(
        "saved {} with {} entries",
        opts.old_list.display(),
        saved.ab_infos.len()
    );

    Ok(SyncOutcome::Synced(SyncReport {
        old_version: old.version_id,
        new_version: new.version_id,
        saved_version: saved.version_id,
        total_entries,
        planned,
        downloaded: results.completed,
        failed: results.failed,
        not_started: results.not_started,
        bytes: results.bytes,
    }))
}
