use std::fmt;
use std::process::Command;

/// Environment variable that disables the prerequisite check.
pub const SKIP_PREREQS_ENV: &str = "ARKDATA_SKIP_PREREQS";

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: &'static str,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

fn command_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn skip_requested() -> bool {
    std::env::var(SKIP_PREREQS_ENV).is_ok_and(|v| v == "1")
}

/// Check the tools `gamedata` shells out to. Empty means all present.
pub fn check_gamedata_prereqs() -> Vec<MissingPrereq> {
    let mut missing = Vec::new();
    if skip_requested() {
        return missing;
    }

    if !command_exists("flatc") {
        missing.push(MissingPrereq {
            name: "flatc",
            purpose: "decoding binary data tables against FlatBuffers schemas",
            install_hint: "apt install flatbuffers-compiler | brew install flatbuffers | pacman -S flatbuffers",
        });
    }

    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    let _ = write!(msg, "\nSet {SKIP_PREREQS_ENV}=1 to skip this check.");
    msg
}
