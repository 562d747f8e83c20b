//! Fixed-size PostgreSQL connection pool.
//!
//! All connections are opened up front, in parallel, and live until the
//! pool is closed. The pool never grows, shrinks or reconnects, so its
//! capacity is exactly the concurrency bound for query batches.

use std::sync::Arc;
use std::time::Duration;

use corral_core::{
    DispatchConfig, Dispatcher, PoolConfig, PoolError, PoolStatus, PooledResource, ResourcePool,
};
use futures::future::try_join_all;
use tracing::{info, warn};

use crate::config::PgConfig;
use crate::connection::PgConnection;
use crate::error::{PgError, PgResult};

/// A pool of open PostgreSQL connections.
#[derive(Clone)]
pub struct PgPool {
    inner: ResourcePool<PgConnection>,
    config: Arc<PgConfig>,
}

impl PgPool {
    /// Open a pool with the default query pool settings.
    pub async fn connect(config: PgConfig) -> PgResult<Self> {
        Self::with_pool_config(config, PoolConfig::for_queries()).await
    }

    /// Open `pool_config.capacity` connections.
    pub async fn with_pool_config(config: PgConfig, pool_config: PoolConfig) -> PgResult<Self> {
        if pool_config.capacity == 0 {
            return Err(PoolError::InvalidCapacity.into());
        }

        let connections = try_join_all(
            (0..pool_config.capacity).map(|id| PgConnection::connect(&config, id)),
        )
        .await
        .map_err(|e| PgError::connection(format!("failed to open pool connections: {e}")))?;

        let inner = ResourcePool::from_resources(connections, &pool_config)?;

        info!(
            host = %config.host,
            port = %config.port,
            database = %config.database,
            connections = pool_config.capacity,
            "PostgreSQL connection pool created"
        );

        Ok(Self {
            inner,
            config: Arc::new(config),
        })
    }

    /// Create a builder for configuring the pool.
    pub fn builder() -> PgPoolBuilder {
        PgPoolBuilder::new()
    }

    /// Borrow a connection until the guard is dropped.
    pub async fn get(&self) -> PgResult<PooledResource<PgConnection>> {
        Ok(self.inner.acquire().await?)
    }

    /// The underlying resource pool.
    pub fn resources(&self) -> &ResourcePool<PgConnection> {
        &self.inner
    }

    /// A dispatcher that runs query tasks on this pool.
    pub fn dispatcher(&self) -> Dispatcher<PgConnection> {
        Dispatcher::new(self.inner.clone())
    }

    /// A dispatcher with custom settings.
    pub fn dispatcher_with(&self, config: DispatchConfig) -> Dispatcher<PgConnection> {
        Dispatcher::with_config(self.inner.clone(), config)
    }

    /// Current pool status.
    pub fn status(&self) -> PoolStatus {
        self.inner.status()
    }

    /// Get the connection configuration.
    pub fn config(&self) -> &PgConfig {
        &self.config
    }

    /// Check a connection with a trivial query.
    pub async fn is_healthy(&self) -> bool {
        match self.inner.acquire().await {
            Ok(conn) => conn.ping().await,
            Err(_) => false,
        }
    }

    /// Stop handing out connections, wait for every borrowed one to come
    /// back, then close them all.
    pub async fn close(&self) {
        let connections = self.inner.shutdown().await;
        let count = connections.len();
        for conn in connections {
            if conn.is_closed() {
                warn!(connection = conn.id(), "Connection was already closed");
            }
            conn.close().await;
        }
        info!(closed = count, "PostgreSQL connection pool closed");
    }
}

impl std::fmt::Debug for PgPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgPool")
            .field("url", &self.config.redacted_url())
            .field("status", &self.status())
            .finish()
    }
}

/// Builder for creating a connection pool.
#[derive(Debug)]
pub struct PgPoolBuilder {
    config: Option<PgConfig>,
    url: Option<String>,
    pool_config: PoolConfig,
}

impl Default for PgPoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PgPoolBuilder {
    /// Create a new pool builder.
    pub fn new() -> Self {
        Self {
            config: None,
            url: None,
            pool_config: PoolConfig::for_queries(),
        }
    }

    /// Set the database URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the configuration.
    pub fn config(mut self, config: PgConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the number of connections.
    pub fn max_connections(mut self, n: usize) -> Self {
        self.pool_config.capacity = n;
        self
    }

    /// Set how long a task may wait for a connection.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.pool_config.acquire_timeout = Some(timeout);
        self
    }

    /// Wait for a connection as long as it takes.
    pub fn no_acquire_timeout(mut self) -> Self {
        self.pool_config.acquire_timeout = None;
        self
    }

    /// Build the pool, opening every connection.
    pub async fn build(self) -> PgResult<PgPool> {
        let config = if let Some(config) = self.config {
            config
        } else if let Some(url) = self.url {
            PgConfig::from_url(&url)?
        } else {
            return Err(PgError::config("no database URL or config provided"));
        };

        PgPool::with_pool_config(config, self.pool_config).await
    }
}
