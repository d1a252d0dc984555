use crate::CoreError;
use arkdata_remote::{InstallerSource, RetryPolicy, Server};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct InstallerOptions {
    pub server: Server,
    pub dest: PathBuf,
    /// URL downloaded by a previous run; an equal resolved URL skips the download.
    pub old_url: Option<String>,
    pub retry: RetryPolicy,
}

impl InstallerOptions {
    /// `<dest>/<server>.apk`
    pub fn target(&self) -> PathBuf {
        self.dest.join(format!("{}.apk", self.server))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallerOutcome {
    UpToDate { url: String },
    Downloaded { url: String, path: PathBuf, bytes: u64 },
}

/// Resolve the installer URL, report it through `on_resolved`, and download
/// it unless it matches `old_url`. Exhausted retries on either step are
/// returned as errors.
pub fn fetch_installer(
    source: &dyn InstallerSource,
    opts: &InstallerOptions,
    on_resolved: &mut dyn FnMut(&str),
) -> Result<InstallerOutcome, CoreError> {
    let what = format!("resolve {} installer URL", opts.server);
    let url = opts
        .retry
        .run(&what, |_| source.resolve_url(opts.server))
        .map_err(|e| e.into_remote(&what))?;
    on_resolved(&url);

    if opts.old_url.as_deref().is_some_and(|old| !old.is_empty() && old == url) {
        return Ok(InstallerOutcome::UpToDate { url });
    }

    let path = opts.target();
    info!("downloading {url} -> {}", path.display());
    let what = format!("download {}", path.display());
    let bytes = opts
        .retry
        .run(&what, |_| source.download(&url, &path))
        .map_err(|e| e.into_remote(&what))?;
    Ok(InstallerOutcome::Downloaded { url, path, bytes })
}
