//! A single PostgreSQL connection, used as a pool resource.

use std::collections::HashMap;

use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Row, Statement, Transaction};
use tracing::{debug, warn};

use crate::config::PgConfig;
use crate::error::PgResult;

/// An open connection with its own prepared statement cache.
///
/// A connection is only ever used by one holder at a time, so the cache
/// needs no locking.
pub struct PgConnection {
    id: usize,
    client: Client,
    driver: JoinHandle<()>,
    statements: HashMap<String, Statement>,
}

impl PgConnection {
    /// Open a connection and spawn its I/O driver onto the runtime.
    pub async fn connect(config: &PgConfig, id: usize) -> PgResult<Self> {
        let (client, connection) = config.to_pg_config().connect(NoTls).await?;

        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(connection = id, error = %e, "PostgreSQL connection terminated");
            }
        });

        debug!(connection = id, host = %config.host, database = %config.database, "Connected");
        Ok(Self {
            id,
            client,
            driver,
            statements: HashMap::new(),
        })
    }

    /// Index of this connection within its pool.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Check if the server side has gone away.
    pub fn is_closed(&self) -> bool {
        self.client.is_closed()
    }

    /// Number of statements prepared on this connection.
    pub fn cached_statements(&self) -> usize {
        self.statements.len()
    }

    /// Prepare `sql`, reusing an earlier preparation on this connection.
    pub async fn prepare(&mut self, sql: &str) -> PgResult<Statement> {
        if let Some(statement) = self.statements.get(sql) {
            return Ok(statement.clone());
        }

        debug!(connection = self.id, sql = %sql, "Preparing statement");
        let statement = self.client.prepare(sql).await?;
        self.statements.insert(sql.to_string(), statement.clone());
        Ok(statement)
    }

    /// Execute a query and return all rows.
    pub async fn query(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> PgResult<Vec<Row>> {
        let statement = self.prepare(sql).await?;
        Ok(self.client.query(&statement, params).await?)
    }

    /// Execute a query and return exactly one row.
    pub async fn query_one(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> PgResult<Row> {
        let statement = self.prepare(sql).await?;
        Ok(self.client.query_one(&statement, params).await?)
    }

    /// Execute a statement and return the number of affected rows.
    pub async fn execute(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> PgResult<u64> {
        let statement = self.prepare(sql).await?;
        Ok(self.client.execute(&statement, params).await?)
    }

    /// Run one or more statements without parameters.
    pub async fn batch_execute(&self, sql: &str) -> PgResult<()> {
        Ok(self.client.batch_execute(sql).await?)
    }

    /// Start a transaction.
    ///
    /// Statements prepared inside it are not added to the connection cache.
    pub async fn transaction(&mut self) -> PgResult<Transaction<'_>> {
        Ok(self.client.transaction().await?)
    }

    /// The server version string, e.g. `16.2`.
    pub async fn server_version(&self) -> PgResult<String> {
        let row = self.client.query_one("SHOW server_version", &[]).await?;
        Ok(row.try_get(0)?)
    }

    /// Check the connection with a trivial round trip.
    pub async fn ping(&self) -> bool {
        self.client.simple_query("SELECT 1").await.is_ok()
    }

    /// Close the connection and wait for its driver to finish.
    pub async fn close(self) {
        let Self { id, client, driver, .. } = self;
        drop(client);
        if driver.await.is_err() {
            warn!(connection = id, "Connection driver task failed");
        }
        debug!(connection = id, "Connection closed");
    }
}

impl std::fmt::Debug for PgConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgConnection")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .field("cached_statements", &self.statements.len())
            .finish()
    }
}
