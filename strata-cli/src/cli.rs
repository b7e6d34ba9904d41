//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// strata -- container layer walking, cache keys and OS package vulnerability detection.
///
/// Use `strata <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "strata", version, about, long_about = None)]
pub struct Cli {
    /// Path to the strata.toml configuration file.
    #[arg(short, long, default_value = "strata.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Walk image layers and print the merged filesystem view.
    Layers(LayersArgs),

    /// Derive the artifact cache key from the configuration.
    CacheKey(CacheKeyArgs),

    /// Detect OS package vulnerabilities from an installed package list.
    Detect(DetectArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- layers ----

/// Walk layer archives (oldest first) and resolve the visible file set.
#[derive(Args, Debug)]
pub struct LayersArgs {
    /// Layer archives (tar or tar.gz), oldest first.
    #[arg(required = true, num_args = 1..)]
    pub layers: Vec<PathBuf>,

    /// Force the low-memory mode regardless of configuration.
    #[arg(long)]
    pub slow: bool,

    /// Walk layers one after another instead of concurrently.
    #[arg(long)]
    pub sequential: bool,

    /// Walk every layer even if its result is in the blob cache.
    #[arg(long)]
    pub no_cache: bool,

    /// Cancel the walk after this many seconds.
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

// ---- cache-key ----

/// Derive the artifact cache key.
#[derive(Args, Debug)]
pub struct CacheKeyArgs {
    /// Artifact identifier mixed into the key (image ID or layer digest).
    #[arg(long, default_value = "")]
    pub id: String,

    /// Also report whether a blob for the key exists under `general.cache_dir`.
    #[arg(long)]
    pub check_cache: bool,
}

// ---- detect ----

/// Match installed OS packages against the local advisory database.
#[derive(Args, Debug)]
pub struct DetectArgs {
    /// Distribution family (alma, amazon).
    #[arg(long)]
    pub family: String,

    /// Distribution version as reported by the OS release file (e.g. 8.5, 2).
    #[arg(long)]
    pub os_version: String,

    /// JSON file holding the installed package list.
    #[arg(long)]
    pub packages: PathBuf,
}

// ---- config ----

/// Manage strata configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, walker, cache, detector).
        #[arg(long)]
        section: Option<String>,
    },
}
