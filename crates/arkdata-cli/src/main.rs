mod commands;

use arkdata_core::{check_gamedata_prereqs, format_missing, install_signal_handler};
use arkdata_remote::Server;
use arkdata_store::WorkspaceLayout;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_CONFIG_ERROR, EXIT_FAILURE, EXIT_REMOTE_ERROR};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "arkdata",
    version,
    about = "Hot-update asset syncer, installer fetcher, and data-table extractor"
)]
struct Cli {
    /// TOML file overriding endpoints, retry policy, and worker count
    /// (defaults to $ARKDATA_CONFIG when set).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download and unpack the hot-update bundles that changed since the last run.
    Assets {
        /// Game server region (cn or en).
        #[arg(long)]
        server: Server,
        /// Directory bundles are unpacked into.
        #[arg(long, default_value = "download")]
        dest: PathBuf,
        /// Hot-update list saved by the previous run; rewritten on completion.
        #[arg(long, default_value = "hot_update_list.json")]
        old_list: PathBuf,
        /// `;`-separated substrings; matching bundles are always downloaded.
        #[arg(long, default_value = "")]
        always: String,
        /// `;`-separated substrings; matching bundles are never downloaded.
        #[arg(long, default_value = "")]
        skip: String,
        /// Exit non-zero if any bundle failed or was not attempted.
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
    /// Resolve and download the latest game installer.
    Apk {
        /// Game server region (cn or en).
        #[arg(long)]
        server: Server,
        /// Directory the installer is written to as `<server>.apk`.
        #[arg(long, default_value = "download")]
        dest: PathBuf,
        /// URL downloaded by a previous run; an unchanged URL skips the download.
        #[arg(long, default_value = "")]
        old_url: String,
    },
    /// Decode data-table payloads to JSON, walking schema history when decoding fails.
    Gamedata {
        /// Directory holding the `.fbs` schemas and the schema registry.
        #[arg(long, default_value = "./flatbuffers")]
        schema_dir: PathBuf,
        /// Extracted anonymous bundle contents.
        #[arg(long, default_value = "./temp/extract/anon")]
        anon_dir: PathBuf,
        /// Extracted OBB contents.
        #[arg(long, default_value = "./temp/extract/obb")]
        obb_dir: PathBuf,
        /// Staging directory for header-trimmed payloads.
        #[arg(long, default_value = "./temp/merge")]
        merge_dir: PathBuf,
        /// Directory decoded JSON is written to.
        #[arg(long, default_value = "./gamedata")]
        out_dir: PathBuf,
    },
    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("ARKDATA_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    install_signal_handler();

    if matches!(cli.command, Commands::Gamedata { .. }) {
        let missing = check_gamedata_prereqs();
        if !missing.is_empty() {
            eprintln!("error: {}", format_missing(&missing));
            return ExitCode::from(EXIT_FAILURE);
        }
    }

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Assets {
            server,
            dest,
            old_list,
            always,
            skip,
            strict,
        } => commands::assets::run(
            config,
            server,
            commands::assets::AssetArgs {
                dest,
                old_list,
                always,
                skip,
                strict,
            },
        ),
        Commands::Apk {
            server,
            dest,
            old_url,
        } => commands::apk::run(config, server, dest, &old_url),
        Commands::Gamedata {
            schema_dir,
            anon_dir,
            obb_dir,
            merge_dir,
            out_dir,
        } => commands::gamedata::run(
            config,
            &WorkspaceLayout {
                schema_dir,
                anon_dir,
                obb_dir,
                merge_dir,
                out_dir,
            },
        ),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("config error:") {
                EXIT_CONFIG_ERROR
            } else if msg.starts_with("remote error:") {
                EXIT_REMOTE_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}
