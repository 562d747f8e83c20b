//! # corral-postgres
//!
//! PostgreSQL resources for the corral dispatcher.
//!
//! This crate provides:
//! - [`PgPool`]: a fixed number of connections opened up front, lent out
//!   through `corral_core::ResourcePool`
//! - The product catalogue schema and a random data seeder
//! - [`ProductQuery`]: the query task used by the latency benchmark
//!
//! ## Example
//!
//! ```rust,ignore
//! use corral_core::Discipline;
//! use corral_postgres::{PgPool, ProductQuery};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = PgPool::builder()
//!         .url("postgresql://tom@localhost:6000/products")
//!         .max_connections(6)
//!         .build()
//!         .await?;
//!
//!     let skus = pool
//!         .dispatcher()
//!         .gather(ProductQuery::batch(100, 10_000), Discipline::Concurrent)
//!         .await?;
//!
//!     pool.close().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod env;
pub mod error;
pub mod pool;
pub mod query;
pub mod schema;
pub mod seed;

pub use config::{PgConfig, PgConfigBuilder};
pub use connection::PgConnection;
pub use env::{EnvExpander, EnvSource, MapEnvSource, StdEnvSource, expand_env};
pub use error::{PgError, PgResult};
pub use pool::{PgPool, PgPoolBuilder};
pub use query::{DEFAULT_PRODUCT_ID, PRODUCT_QUERY, ProductQuery, ProductSku};
pub use schema::{TableCounts, drop_schema, init_schema, table_counts};
pub use seed::{SeedConfig, SeedData, SeedReport};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::PgConfig;
    pub use crate::connection::PgConnection;
    pub use crate::error::{PgError, PgResult};
    pub use crate::pool::{PgPool, PgPoolBuilder};
    pub use crate::query::{ProductQuery, ProductSku};
}
