//! Corral CLI - Command-line interface for the corral workloads.
//!
//! Runs the CPU counting workload on a worker-thread pool, prepares the
//! product database, and compares sequential against concurrent product
//! queries over a connection pool.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
