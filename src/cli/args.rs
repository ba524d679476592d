//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// stagecache - versioned offline asset cache
///
/// Stages, activates and serves the assets of a browser-delivered
/// application bundle from a local cache.
#[derive(Parser, Debug)]
#[command(name = "stagecache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "STAGECACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Read assets from this build directory instead of the origin
    #[arg(long, global = true)]
    pub from_dir: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fingerprint a build directory into a resource table
    Scan(ScanArgs),

    /// Stage the shell files of the current bundle
    Install,

    /// Make the staged bundle current
    Activate,

    /// Install and immediately activate
    Update,

    /// Route a GET request through the cache
    Fetch(FetchArgs),

    /// Download every resource not cached yet
    Sync,

    /// Show cache and lifecycle state
    Status,

    /// Show configuration
    Config(ConfigArgs),
}

/// Arguments for the scan command
#[derive(Parser, Debug)]
pub struct ScanArgs {
    /// Build output directory
    pub build_dir: PathBuf,

    /// Shell file (repeatable); defaults to the conventional entry files
    #[arg(short, long = "shell")]
    pub shell: Vec<String>,

    /// Path to leave out of the table (repeatable)
    #[arg(short, long = "exclude")]
    pub exclude: Vec<String>,

    /// Output file (defaults to the configured resource table)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Request URL or origin-relative path (e.g. /main.dart.js?v=3)
    pub url: String,

    /// Write the response body to this file
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Config action
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
