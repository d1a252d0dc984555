use super::{colorize_count, load_config, spin_fail, spin_ok, spinner, EXIT_FAILURE, EXIT_SUCCESS};
use arkdata_core::{run_asset_sync, DownloadFilter, SyncOptions, SyncOutcome, SyncProgress};
use arkdata_remote::{CdnBackend, Server};
use arkdata_schema::AbInfo;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

pub struct AssetArgs {
    pub dest: PathBuf,
    pub old_list: PathBuf,
    pub always: String,
    pub skip: String,
    pub strict: bool,
}

/// Spinner while the version is resolved, then a byte-based bar over the
/// planned downloads.
struct BarProgress {
    bar: ProgressBar,
}

impl SyncProgress for BarProgress {
    fn planned(&self, _count: usize, bytes: u64) {
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}",
            )
            .expect("valid template")
            .progress_chars("=> "),
        );
        self.bar.set_length(bytes);
        self.bar.set_position(0);
    }

    fn started(&self, entry: &AbInfo) {
        self.bar.set_message(entry.name.clone());
    }

    fn finished(&self, entry: &AbInfo, ok: bool) {
        if !ok {
            self.bar.println(format!("✗ {}", entry.name));
        }
        self.bar.inc(entry.total_size);
    }
}

pub fn run(config: Option<&Path>, server: Server, args: AssetArgs) -> Result<u8, String> {
    let config = load_config(config)?;
    let backend = CdnBackend::new(&config, server);
    let opts = SyncOptions {
        dest: args.dest,
        old_list: args.old_list,
        filter: DownloadFilter::parse(&args.always, &args.skip),
        workers: config.sync.workers,
        retry: config.retry,
    };

    let progress = BarProgress {
        bar: spinner(&format!("checking {server} resource version…")),
    };
    let outcome = run_asset_sync(&backend, &opts, &progress).map_err(|e| {
        spin_fail(&progress.bar, "asset sync failed");
        e.to_string()
    })?;

    let report = match outcome {
        SyncOutcome::UpToDate { version } => {
            progress.bar.finish_and_clear();
            tracing::debug!("saved list already at {version}");
            println!("Up to date.");
            return Ok(EXIT_SUCCESS);
        }
        SyncOutcome::Synced(report) => report,
    };

    if report.is_complete() {
        spin_ok(&progress.bar, "bundles synced");
    } else {
        spin_fail(&progress.bar, "bundles synced with failures");
    }
    println!(
        "Updated {}: {} -> {}",
        opts.old_list.display(),
        if report.old_version.is_empty() {
            "(none)"
        } else {
            report.old_version.as_str()
        },
        report.saved_version,
    );
    println!(
        "{} of {} bundles planned, {} downloaded ({} bytes), {} failed, {} not started",
        report.planned,
        report.total_entries,
        colorize_count(report.downloaded.len(), false),
        report.bytes,
        colorize_count(report.failed.len(), true),
        colorize_count(report.not_started.len(), true),
    );
    for failure in &report.failed {
        println!("  {}: {}", failure.name, failure.error);
    }
    if !report.is_complete() && report.saved_version != report.new_version {
        println!(
            "{} kept at {}; rerun to retry the remaining bundles",
            opts.old_list.display(),
            report.saved_version
        );
    }

    if args.strict && !report.is_complete() {
        return Ok(EXIT_FAILURE);
    }
    Ok(EXIT_SUCCESS)
}
