//! CLI configuration handling.
//!
//! Settings come from `corral.toml` when it exists. Command-line flags
//! override the file; anything unset falls back to the defaults below.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use corral_core::PoolConfig;
use corral_postgres::{PgConfig, SeedConfig};

use crate::error::CliResult;

/// Default config file name
pub const CONFIG_FILE_NAME: &str = "corral.toml";

/// Corral CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Pool sizes
    pub pool: PoolSection,

    /// Seed row counts
    pub seed: SeedSection,

    /// Benchmark settings
    pub bench: BenchSection,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise use defaults
    pub fn load_or_default(path: &Path) -> CliResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> CliResult<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolve the database connection.
    ///
    /// `url_override` wins, then `database.url` from the file (with `${VAR}`
    /// expansion), then the `CORRAL_PG_*` environment variables.
    pub fn pg_config(&self, url_override: Option<&str>) -> CliResult<PgConfig> {
        let config = match url_override.or(self.database.url.as_deref()) {
            Some(url) => PgConfig::from_template(url)?,
            None => PgConfig::from_env()?,
        };
        Ok(config)
    }

    /// Pool settings for worker threads
    pub fn worker_pool(&self, workers: Option<usize>) -> PoolConfig {
        let mut config = PoolConfig::for_cpu_work();
        if let Some(n) = workers.or(self.pool.workers) {
            config = config.with_capacity(n);
        }
        config
    }

    /// Pool settings for database connections
    pub fn connection_pool(&self, connections: Option<usize>) -> PoolConfig {
        let config = PoolConfig::for_queries()
            .with_capacity(connections.unwrap_or(self.pool.connections));
        match self.pool.acquire_timeout_secs {
            Some(0) | None => config.without_acquire_timeout(),
            Some(secs) => config.with_acquire_timeout(Duration::from_secs(secs)),
        }
    }

    /// Seed row counts, with overrides
    pub fn seed_config(
        &self,
        brands: Option<usize>,
        products: Option<usize>,
        skus: Option<usize>,
    ) -> SeedConfig {
        SeedConfig {
            brands: brands.unwrap_or(self.seed.brands),
            products: products.unwrap_or(self.seed.products),
            skus: skus.unwrap_or(self.seed.skus),
            ..SeedConfig::default()
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL; `${VAR}` references are expanded
    pub url: Option<String>,
}

/// Pool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSection {
    /// Worker threads for `count` (defaults to the number of CPUs)
    pub workers: Option<usize>,

    /// Database connections for `bench`
    pub connections: usize,

    /// Seconds a query may wait for a connection; 0 waits forever
    pub acquire_timeout_secs: Option<u64>,
}

impl Default for PoolSection {
    fn default() -> Self {
        Self {
            workers: None,
            connections: 6,
            acquire_timeout_secs: Some(30),
        }
    }
}

/// Seed configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedSection {
    /// Number of brands
    pub brands: usize,

    /// Number of products
    pub products: usize,

    /// Number of SKUs
    pub skus: usize,
}

impl Default for SeedSection {
    fn default() -> Self {
        let defaults = SeedConfig::default();
        Self {
            brands: defaults.brands,
            products: defaults.products,
            skus: defaults.skus,
        }
    }
}

/// Benchmark configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchSection {
    /// Queries per run
    pub queries: usize,

    /// Product to look up
    pub product_id: i32,

    /// Only run the concurrent batch
    pub skip_sequential: bool,
}

impl Default for BenchSection {
    fn default() -> Self {
        Self {
            queries: 10_000,
            product_id: corral_postgres::DEFAULT_PRODUCT_ID,
            skip_sequential: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_or_default(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.bench.queries, 10_000);
        assert_eq!(config.pool.connections, 6);
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "[database]\nurl = \"postgresql://tom@localhost:6000/products\"\n\n[pool]\nconnections = 12\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.pool.connections, 12);
        assert_eq!(config.pool.acquire_timeout_secs, Some(30));
        assert_eq!(config.seed, SeedSection::default());

        let pg = config.pg_config(None).unwrap();
        assert_eq!(pg.port, 6000);
        let pg = config.pg_config(Some("postgresql://other/db")).unwrap();
        assert_eq!(pg.host, "other");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        let mut config = Config::default();
        config.bench.product_id = 7;
        config.pool.workers = Some(3);
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[pool\nconnections = ").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_pool_overrides() {
        let mut config = Config::default();
        assert_eq!(config.worker_pool(Some(2)).capacity, 2);
        assert_eq!(config.connection_pool(None).capacity, 6);
        assert_eq!(config.connection_pool(Some(1)).capacity, 1);
        assert_eq!(
            config.connection_pool(None).acquire_timeout,
            Some(Duration::from_secs(30))
        );

        config.pool.workers = Some(5);
        config.pool.acquire_timeout_secs = Some(0);
        assert_eq!(config.worker_pool(None).capacity, 5);
        assert_eq!(config.connection_pool(None).acquire_timeout, None);

        let seed = config.seed_config(Some(3), None, Some(9));
        assert_eq!((seed.brands, seed.products, seed.skus), (3, 1_000, 9));
    }
}
