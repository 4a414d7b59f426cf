//! Connection pooling and the `?`-dialect query interface.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use deadpool::managed::{self, Metrics, PoolError, RecycleError, RecycleResult};
use serde::Serialize;

use super::driver::{Connection, Driver, Flavor, QueryOutput};
use super::placeholder::rewrite_placeholders;
use crate::error::{Error, Result};
use crate::value::{FromRow, Row, Value};

/// Pool sizing and timeouts.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_size: usize,
    /// Connections unused for longer than this are closed instead of reused.
    pub idle_timeout: Duration,
    /// Bound on opening a connection and on waiting for a free one.
    pub connect_timeout: Duration,
}

impl PoolConfig {
    pub fn new() -> Self {
        Self {
            max_size: 10,
            idle_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(2),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle of a [`Pool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PoolState {
    Uninitialized = 0,
    Connecting = 1,
    Ready = 2,
    Draining = 3,
    Closed = 4,
}

impl PoolState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Uninitialized,
            1 => Self::Connecting,
            2 => Self::Ready,
            3 => Self::Draining,
            _ => Self::Closed,
        }
    }
}

/// Statement metadata returned next to the rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResultMeta {
    /// Rows written, or rows returned for a query. 0 when the engine reports nothing.
    pub affected_rows: u64,
    /// Rowid of the last insert, when the engine exposes one.
    pub insert_id: Option<i64>,
}

/// Rows plus metadata, the two-part result of every query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<R = Row> {
    pub rows: Vec<R>,
    pub meta: ResultMeta,
}

impl<R> QueryResult<R> {
    pub fn into_parts(self) -> (Vec<R>, ResultMeta) {
        (self.rows, self.meta)
    }
}

/// A bounded set of connections to one database.
///
/// Cloning is cheap and every clone shares the same connections and state.
#[derive(Debug, Clone)]
pub struct Pool {
    inner: managed::Pool<Manager>,
    state: Arc<AtomicU8>,
    flavor: Flavor,
    target: String,
    config: PoolConfig,
}

impl Pool {
    /// Build an uninitialized pool. No connection is opened until [`Pool::init`].
    pub fn new(driver: Box<dyn Driver>, config: PoolConfig) -> Result<Self> {
        let flavor = driver.flavor();
        let target = driver.target();
        let max_size = driver
            .max_connections()
            .map_or(config.max_size, |limit| limit.min(config.max_size))
            .max(1);
        let idle_timeout = driver.evictable().then_some(config.idle_timeout);

        let inner = managed::Pool::builder(Manager {
            driver,
            idle_timeout,
        })
        .max_size(max_size)
        .runtime(deadpool::Runtime::Tokio1)
        .wait_timeout(Some(config.connect_timeout))
        .create_timeout(Some(config.connect_timeout))
        .build()
        .map_err(|e| Error::Pool(e.to_string()))?;

        Ok(Self {
            inner,
            state: Arc::new(AtomicU8::new(PoolState::Uninitialized as u8)),
            flavor,
            target,
            config,
        })
    }

    /// Build the pool and run the start-up probe.
    pub async fn connect(driver: Box<dyn Driver>, config: PoolConfig) -> Result<Self> {
        let pool = Self::new(driver, config)?;
        pool.init().await?;
        Ok(pool)
    }

    /// Open one connection to prove the database is reachable, then mark the
    /// pool ready. A failed probe leaves the pool uninitialized.
    pub async fn init(&self) -> Result<()> {
        match self.state() {
            PoolState::Ready => return Ok(()),
            PoolState::Draining | PoolState::Closed => return Err(Error::PoolClosed),
            PoolState::Uninitialized | PoolState::Connecting => {}
        }

        self.set_state(PoolState::Connecting);
        match self.inner.get().await {
            Ok(conn) => {
                drop(conn);
                self.set_state(PoolState::Ready);
                tracing::info!(target_db = %self.target, max_size = self.inner.status().max_size, "connection pool ready");
                Ok(())
            }
            Err(e) => {
                self.set_state(PoolState::Uninitialized);
                Err(self.map_pool_error(e))
            }
        }
    }

    #[must_use]
    pub fn state(&self) -> PoolState {
        PoolState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[must_use]
    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// `host:port/database` of the backing database, without credentials.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Acquire a connection. It goes back to the pool when dropped or released.
    pub async fn get_connection(&self) -> Result<PoolConnection> {
        match self.state() {
            PoolState::Ready => {}
            PoolState::Draining | PoolState::Closed => return Err(Error::PoolClosed),
            state @ (PoolState::Uninitialized | PoolState::Connecting) => {
                return Err(Error::NotReady(state));
            }
        }

        let inner = self.inner.get().await.map_err(|e| self.map_pool_error(e))?;
        Ok(PoolConnection { inner })
    }

    pub async fn query(&self, sql: &str, values: &[Value]) -> Result<QueryResult> {
        self.query_as(sql, values).await
    }

    pub async fn query_as<R: FromRow>(&self, sql: &str, values: &[Value]) -> Result<QueryResult<R>> {
        let mut conn = self.get_connection().await?;
        conn.query_as(sql, values).await
    }

    /// First row of the result, if any.
    pub async fn query_one<R: FromRow>(&self, sql: &str, values: &[Value]) -> Result<Option<R>> {
        let mut conn = self.get_connection().await?;
        conn.query_one(sql, values).await
    }

    pub async fn execute(&self, sql: &str, values: &[Value]) -> Result<ResultMeta> {
        let mut conn = self.get_connection().await?;
        conn.execute(sql, values).await
    }

    /// Stop handing out connections and close them all.
    ///
    /// Connections already checked out keep working and are closed as they
    /// come back; this waits for them. Calling `end` again is a no-op.
    pub async fn end(&self) {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if matches!(
                PoolState::from_u8(current),
                PoolState::Draining | PoolState::Closed
            ) {
                return;
            }
            match self.state.compare_exchange(
                current,
                PoolState::Draining as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        tracing::debug!(target_db = %self.target, "draining connection pool");
        self.inner.close();
        while self.inner.status().size > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.set_state(PoolState::Closed);
        tracing::info!(target_db = %self.target, "connection pool closed");
    }

    fn set_state(&self, state: PoolState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn map_pool_error(&self, err: PoolError<Error>) -> Error {
        match err {
            PoolError::Timeout(kind) => {
                tracing::debug!(?kind, target_db = %self.target, "connection acquisition timed out");
                Error::ConnectionTimeout {
                    target: self.target.clone(),
                    waited: self.config.connect_timeout,
                }
            }
            PoolError::Backend(e) => e,
            PoolError::Closed => Error::PoolClosed,
            other => Error::Pool(other.to_string()),
        }
    }
}

#[derive(Debug)]
struct Manager {
    driver: Box<dyn Driver>,
    idle_timeout: Option<Duration>,
}

impl managed::Manager for Manager {
    type Type = Box<dyn Connection>;
    type Error = Error;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        self.driver.connect().await
    }

    async fn recycle(&self, conn: &mut Self::Type, metrics: &Metrics) -> RecycleResult<Self::Error> {
        if conn.is_closed() {
            return Err(RecycleError::Backend(Error::ConnectionLost));
        }
        if let Some(idle) = self.idle_timeout {
            if metrics.last_used() > idle {
                tracing::debug!(idle_for = ?metrics.last_used(), "evicting idle connection");
                return Err(RecycleError::Backend(Error::Pool(
                    "connection idle past timeout".to_string(),
                )));
            }
        }
        Ok(())
    }
}

/// A connection checked out of a [`Pool`].
#[derive(Debug)]
pub struct PoolConnection {
    inner: managed::Object<Manager>,
}

impl PoolConnection {
    pub async fn query(&mut self, sql: &str, values: &[Value]) -> Result<QueryResult> {
        self.query_as(sql, values).await
    }

    pub async fn query_as<R: FromRow>(
        &mut self,
        sql: &str,
        values: &[Value],
    ) -> Result<QueryResult<R>> {
        let QueryOutput {
            rows,
            affected_rows,
            insert_id,
        } = self.exec(sql, values).await?;
        let rows = rows.into_iter().map(R::from_row).collect::<Result<Vec<_>>>()?;
        Ok(QueryResult {
            rows,
            meta: ResultMeta {
                affected_rows,
                insert_id,
            },
        })
    }

    pub async fn query_one<R: FromRow>(&mut self, sql: &str, values: &[Value]) -> Result<Option<R>> {
        let output = self.exec(sql, values).await?;
        output.rows.into_iter().next().map(R::from_row).transpose()
    }

    pub async fn execute(&mut self, sql: &str, values: &[Value]) -> Result<ResultMeta> {
        let output = self.exec(sql, values).await?;
        Ok(ResultMeta {
            affected_rows: output.affected_rows,
            insert_id: output.insert_id,
        })
    }

    /// Hand the connection back to the pool.
    pub fn release(self) {
        drop(self);
    }

    async fn exec(&mut self, sql: &str, values: &[Value]) -> Result<QueryOutput> {
        let (sql, placeholders) = rewrite_placeholders(sql);
        tracing::debug!(%sql, placeholders, values = values.len(), "executing statement");
        self.inner.exec(&sql, values).await
    }
}
