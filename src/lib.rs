//! # Corral
//!
//! Bounded resource pools and a batch dispatcher for comparing sequential
//! against concurrent execution.
//!
//! Corral provides:
//! - A fixed-size pool that never hands out more than `capacity` resources
//! - Sequential and concurrent dispatch of task batches over that pool
//! - Result collection in submission order or in completion order
//! - A worker-thread pool for CPU-bound work and a PostgreSQL connection pool
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use corral::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = worker_pool(&PoolConfig::new(4))?;
//!     let dispatcher = Dispatcher::new(pool);
//!
//!     let batch: Batch<CountTask> = [100_000_001, 1, 3, 5, 22, 100_000_000]
//!         .into_iter()
//!         .map(CountTask::new)
//!         .collect();
//!
//!     let counts = dispatcher.gather(batch, Discipline::Concurrent).await?;
//!     assert_eq!(counts[1], 1);
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use corral_core::*;

/// PostgreSQL connections, schema, seeding and the product query.
pub mod postgres {
    pub use corral_postgres::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use corral_core::prelude::*;
    pub use corral_postgres::{PgConfig, PgPool, ProductQuery};
}
