//! `corral version` command - Display version information.

use crate::error::CliResult;
use crate::output::{self, kv};

/// Package version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Binary name
const NAME: &str = "corral";

/// Run the version command
pub async fn run() -> CliResult<()> {
    output::header("Corral");

    kv("Version", VERSION);
    kv("Binary", NAME);

    #[cfg(debug_assertions)]
    let build_mode = "debug";
    #[cfg(not(debug_assertions))]
    let build_mode = "release";

    kv("Build", build_mode);
    kv("CPUs", &cpu_count().to_string());

    output::newline();

    output::section("Components");
    kv("corral-core", VERSION);
    kv("corral-postgres", VERSION);
    kv("corral-cli", VERSION);

    output::newline();
    output::dim("Run `corral --help` for available commands");

    Ok(())
}

fn cpu_count() -> usize {
    corral_core::PoolConfig::for_cpu_work().capacity
}
