//! CLI command implementations.

pub mod bench;
pub mod count;
pub mod db;
pub mod version;
