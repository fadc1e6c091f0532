use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

/// Check that native libraries inside an APK are aligned for 16KB page sizes.
#[derive(Parser, Debug)]
#[command(name = "pagecheck", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output format for all subcommands.
    #[arg(long, value_enum, default_value = "human", global = true)]
    pub output: OutputFormat,

    /// TOML config file with `[check]` and `[zipalign]` tables.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check every native library inside an APK.
    Check(CheckArgs),

    /// Show the program headers of a single shared library.
    Inspect(InspectArgs),
}

// ── check ────────────────────────────────────────────────────────────

#[derive(clap::Args, Debug, Default)]
pub struct CheckArgs {
    /// Path to the APK.
    pub apk: PathBuf,

    /// Target page size in bytes.
    #[arg(long)]
    pub page_size: Option<u64>,

    /// Scanner worker threads.
    #[arg(long, short = 'j')]
    pub jobs: Option<usize>,

    /// Largest decompressed library size in bytes.
    #[arg(long)]
    pub max_entry_size: Option<u64>,

    /// Also run `zipalign -c` against the APK.
    #[arg(long, default_value_t = false)]
    pub zipalign: bool,

    /// Path to the zipalign binary (implies --zipalign).
    #[arg(long)]
    pub zipalign_path: Option<PathBuf>,

    /// zipalign timeout in seconds.
    #[arg(long)]
    pub zipalign_timeout: Option<u64>,

    /// Accept input files that do not end in `.apk`.
    #[arg(long, default_value_t = false)]
    pub allow_any_extension: bool,
}

// ── inspect ──────────────────────────────────────────────────────────

#[derive(clap::Args, Debug, Default)]
pub struct InspectArgs {
    /// Path to the shared library.
    pub library: PathBuf,

    /// Target page size in bytes.
    #[arg(long)]
    pub page_size: Option<u64>,
}
