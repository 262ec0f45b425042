//! CLI argument parsing

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Generate blueprints of a codebase for tools and AI agents
#[derive(Parser, Debug)]
#[command(name = "architectum")]
#[command(about = "Generate structured blueprints of a codebase")]
#[command(version)]
pub struct Args {
    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (defaults to architectum.toml in the scanned directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// File discovery options shared by every command that scans
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct ScanOptions {
    /// Glob patterns to include (can be repeated, replaces the configured list)
    #[arg(long)]
    pub include: Vec<String>,

    /// Glob patterns to exclude (can be repeated, added to the configured list)
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Extract files on a single thread
    #[arg(long)]
    pub sequential: bool,
}

/// What to put in a blueprint
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct SelectionOptions {
    /// YAML blueprint definition
    #[arg(short, long, conflicts_with_all = ["kind", "file", "element"])]
    pub definition: Option<PathBuf>,

    /// Blueprint type (file, method, feature)
    #[arg(short = 't', long = "type")]
    pub kind: Option<String>,

    /// File to include, relative to the scanned directory (can be repeated)
    #[arg(short, long)]
    pub file: Vec<String>,

    /// Element to include as <file>:<qualified name> (can be repeated)
    #[arg(short, long)]
    pub element: Vec<String>,

    /// Detail level (minimal, standard, detailed)
    #[arg(long)]
    pub detail: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan a codebase and report what was extracted
    Scan {
        /// Path to the codebase to scan
        path: PathBuf,

        #[command(flatten)]
        scan: ScanOptions,
    },

    /// Compose a blueprint and write it out
    Blueprint {
        /// Path to the codebase to scan
        path: PathBuf,

        #[command(flatten)]
        selection: SelectionOptions,

        /// Blueprint name
        #[arg(long)]
        name: Option<String>,

        /// Output format (json, xml)
        #[arg(long)]
        format: Option<String>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        scan: ScanOptions,
    },

    /// Manage versioned feature blueprints
    Feature {
        /// Storage directory (overrides the configured one)
        #[arg(long, global = true)]
        store: Option<PathBuf>,

        #[command(subcommand)]
        action: FeatureCommand,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand, Debug)]
pub enum FeatureCommand {
    /// Store a new feature as version 1
    Create {
        /// Feature name
        name: String,

        /// Path to the codebase to scan
        path: PathBuf,

        #[command(flatten)]
        selection: SelectionOptions,

        #[command(flatten)]
        scan: ScanOptions,
    },

    /// Store the next version of an existing feature
    Update {
        /// Feature name
        name: String,

        /// Path to the codebase to scan
        path: PathBuf,

        #[command(flatten)]
        selection: SelectionOptions,

        #[command(flatten)]
        scan: ScanOptions,
    },

    /// Print a stored version (latest by default)
    Show {
        /// Feature name
        name: String,

        /// Version to show
        #[arg(long = "at")]
        version: Option<u32>,

        /// Output format (json, xml)
        #[arg(long)]
        format: Option<String>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare two stored versions
    Diff {
        /// Feature name
        name: String,

        /// Older version
        from: u32,

        /// Newer version
        to: u32,
    },

    /// List stored features and their versions
    List,
}
