pub mod apk;
pub mod assets;
pub mod completions;
pub mod gamedata;
pub mod man_pages;

use arkdata_remote::{RemoteConfig, RemoteError};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_REMOTE_ERROR: u8 = 3;

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

/// Color a count by whether it represents a problem.
pub fn colorize_count(count: usize, bad: bool) -> String {
    use console::Style;
    let style = match (count, bad) {
        (0, _) => Style::new().dim(),
        (_, true) => Style::new().red().bold(),
        (_, false) => Style::new().green(),
    };
    style.apply_to(count).to_string()
}

pub fn load_config(explicit: Option<&Path>) -> Result<RemoteConfig, String> {
    RemoteConfig::load_default(explicit).map_err(|e| match e {
        RemoteError::Config(msg) => format!("config error: {msg}"),
        other => format!("config error: {other}"),
    })
}
