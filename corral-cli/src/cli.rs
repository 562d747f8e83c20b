//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Corral - bounded pools, concurrent batches, measured
#[derive(Parser, Debug)]
#[command(name = "corral")]
#[command(version)]
#[command(about = "Corral - run task batches on bounded pools and compare latencies", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the config file
    #[arg(short, long, global = true, default_value = crate::config::CONFIG_FILE_NAME)]
    pub config: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Count to each number on a pool of worker threads
    Count(CountArgs),

    /// Product database setup
    Db(DbArgs),

    /// Compare sequential and concurrent product queries
    Bench(BenchArgs),

    /// Display version information
    Version,
}

// =============================================================================
// Count Command
// =============================================================================

/// How results of a concurrent batch are collected.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DrainMode {
    /// Print each result as soon as it finishes
    #[default]
    AsCompleted,
    /// Wait for every result, print in submission order
    WaitAll,
}

impl std::fmt::Display for DrainMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DrainMode::AsCompleted => write!(f, "as-completed"),
            DrainMode::WaitAll => write!(f, "wait-all"),
        }
    }
}

/// Arguments for the `count` command
#[derive(Args, Debug)]
pub struct CountArgs {
    /// Numbers to count to
    #[arg(default_values_t = [100_000_001u64, 1, 3, 5, 22, 100_000_000])]
    pub numbers: Vec<u64>,

    /// Worker threads (defaults to the number of CPUs)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Result collection mode
    #[arg(short, long, default_value_t = DrainMode::AsCompleted)]
    pub mode: DrainMode,
}

// =============================================================================
// Db Command
// =============================================================================

/// Arguments for the `db` command
#[derive(Args, Debug)]
pub struct DbArgs {
    #[command(subcommand)]
    pub command: DbSubcommand,
}

/// Db subcommands
#[derive(Subcommand, Debug)]
pub enum DbSubcommand {
    /// Create the product tables and reference rows
    Init(DbInitArgs),

    /// Load random brands, products and SKUs
    Seed(DbSeedArgs),

    /// Show row counts of the product tables
    Status(ConnectionArgs),
}

/// Connection override shared by database commands
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Database URL (overrides config file and environment)
    #[arg(short, long, env = "DATABASE_URL")]
    pub url: Option<String>,
}

/// Arguments for `db init`
#[derive(Args, Debug)]
pub struct DbInitArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Drop existing product tables first
    #[arg(long)]
    pub reset: bool,
}

/// Arguments for `db seed`
#[derive(Args, Debug)]
pub struct DbSeedArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Number of brands
    #[arg(long)]
    pub brands: Option<usize>,

    /// Number of products
    #[arg(long)]
    pub products: Option<usize>,

    /// Number of SKUs
    #[arg(long)]
    pub skus: Option<usize>,
}

// =============================================================================
// Bench Command
// =============================================================================

/// Arguments for the `bench` command
#[derive(Args, Debug)]
pub struct BenchArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Number of queries per run
    #[arg(short, long)]
    pub queries: Option<usize>,

    /// Connections in the pool
    #[arg(short = 'n', long)]
    pub connections: Option<usize>,

    /// Product to look up
    #[arg(short, long)]
    pub product_id: Option<i32>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Only run the concurrent batch
    #[arg(long)]
    pub skip_sequential: bool,
}
