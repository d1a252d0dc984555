use super::{load_config, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use arkdata_core::{fetch_installer, InstallerOptions, InstallerOutcome};
use arkdata_remote::{HttpInstallerSource, Server};
use std::path::{Path, PathBuf};

pub fn run(
    config: Option<&Path>,
    server: Server,
    dest: PathBuf,
    old_url: &str,
) -> Result<u8, String> {
    let config = load_config(config)?;
    let source = HttpInstallerSource::new(&config);
    let opts = InstallerOptions {
        server,
        dest,
        old_url: Some(old_url.to_owned()).filter(|u| !u.is_empty()),
        retry: config.retry,
    };

    let pb = spinner(&format!("resolving {server} installer URL…"));
    // Exhausted retries exit 1, not the remote-error code.
    let outcome = fetch_installer(&source, &opts, &mut |url| {
        pb.suspend(|| println!("{url}"));
        pb.set_message("downloading installer…");
    })
    .map_err(|e| {
        spin_fail(&pb, "installer fetch failed");
        format!("installer fetch failed: {e}")
    })?;

    match outcome {
        InstallerOutcome::UpToDate { .. } => {
            pb.finish_and_clear();
            println!("Up to date.");
        }
        InstallerOutcome::Downloaded { path, bytes, .. } => {
            spin_ok(&pb, "installer downloaded");
            println!("{} ({bytes} bytes)", path.display());
        }
    }
    Ok(EXIT_SUCCESS)
}
