use super::{colorize_count, load_config, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use arkdata_core::{run_extraction, FlatcDecoder, ProbeOptions};
use arkdata_remote::GitHubHistory;
use arkdata_schema::SchemaCatalog;
use arkdata_store::WorkspaceLayout;
use std::path::Path;

pub fn run(config: Option<&Path>, layout: &WorkspaceLayout) -> Result<u8, String> {
    let config = load_config(config)?;
    let history = GitHubHistory::new(&config);
    let catalog = SchemaCatalog::default();
    let decoder = FlatcDecoder::default();
    let opts = ProbeOptions {
        retry: config.retry,
        ..ProbeOptions::default()
    };

    let pb = spinner("decoding data tables…");
    let report = run_extraction(layout, &catalog, &decoder, &history, opts).map_err(|e| {
        spin_fail(&pb, "extraction failed");
        e.to_string()
    })?;
    if report.is_complete() {
        spin_ok(&pb, "data tables decoded");
    } else {
        spin_fail(&pb, "data tables decoded with failures");
    }

    for (schema, commit) in &report.updated {
        println!("{schema} -> {}", commit.short());
    }
    for (payload, reason) in &report.failed {
        println!("  {payload}: {reason}");
    }
    println!(
        "{} staged, {} validated, {} schemas updated, {} skipped, {} failed",
        report.staged,
        colorize_count(report.validated, false),
        colorize_count(report.updated.len(), false),
        colorize_count(report.skipped.len(), true),
        colorize_count(report.failed.len(), true),
    );
    println!("JSON written to {}", layout.out_dir.display());
    Ok(EXIT_SUCCESS)
}
