//! Bounded connection pool for the registrant store
//!
//! Diesel's r2d2 pool holds the connections; an async semaphore in front of it
//! forms the wait queue. Callers beyond `max_size` park on the semaphore (FIFO,
//! unbounded) instead of blocking a runtime thread inside r2d2. Each checkout
//! runs on tokio's blocking pool and returns its connection and permit when the
//! closure finishes, whatever the outcome.
//!
//! The operation timeout starts once a slot is granted, so queueing only
//! delays a caller. Writes run in an IMMEDIATE transaction that commits only
//! while the caller is still waiting; a write that outlives its deadline is
//! rolled back and the caller sees [`WaitlistError::Timeout`].

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::SqliteConnection;
use tokio::sync::OwnedSemaphorePermit;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::error::{Result, WaitlistError};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type PooledConn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Pool sizing and deadlines
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of open connections (default: 10)
    pub max_size: u32,
    /// Deadline for one store operation, queueing included (default: 30s)
    pub operation_timeout: Duration,
    /// SQLite busy timeout applied to every connection (default: 5s)
    pub busy_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            operation_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Per-connection SQLite settings
#[derive(Debug)]
struct SqlitePragmas {
    busy_timeout_ms: u128,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA busy_timeout={}; PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;",
            self.busy_timeout_ms
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

// Write handshake states. The blocking task moves RUNNING -> COMMITTING right
// before commit; the caller moves RUNNING -> ABANDONED when its deadline fires.
// Whichever transition wins decides the outcome.
const RUNNING: u8 = 0;
const COMMITTING: u8 = 1;
const ABANDONED: u8 = 2;

/// Shared handle to the store connection pool
#[derive(Clone)]
pub struct ConnectionPool {
    pool: DbPool,
    permits: Arc<Semaphore>,
    operation_timeout: Duration,
}

impl ConnectionPool {
    /// Open the pool. Connections are established eagerly, so an unreachable
    /// database fails here rather than on the first request.
    pub fn open(database_url: &str, config: &PoolConfig) -> Result<Self> {
        let manager = ConnectionManager::<SqliteConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.operation_timeout)
            .connection_customizer(Box::new(SqlitePragmas {
                busy_timeout_ms: config.busy_timeout.as_millis(),
            }))
            .build(manager)?;

        info!(
            database_url = %database_url,
            max_size = config.max_size,
            "Connection pool opened"
        );

        Ok(Self {
            pool,
            permits: Arc::new(Semaphore::new(config.max_size as usize)),
            operation_timeout: config.operation_timeout,
        })
    }

    /// Run one read-only store operation on a pooled connection.
    ///
    /// Waits for a free slot if the pool is exhausted. Once the slot is
    /// granted, checkout and the operation are bounded by the operation timeout.
    pub async fn run<F, T>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self.acquire().await?;
        let pool = self.pool.clone();

        let task = tokio::task::spawn_blocking(move || {
            // Dropped with the connection at the end of this closure
            let _permit = permit;
            let mut conn: PooledConn = pool.get()?;
            op(&mut conn)
        });

        match tokio::time::timeout(self.operation_timeout, task).await {
            Ok(joined) => joined.map_err(task_failed)?,
            Err(_) => Err(self.timeout_error()),
        }
    }

    /// Run one mutating store operation inside an IMMEDIATE transaction.
    ///
    /// Same queueing and deadline as [`ConnectionPool::run`]. If the deadline
    /// fires before the transaction reaches commit, it is rolled back and the
    /// store is left unchanged. If commit already started, the caller waits
    /// for it and gets the real result.
    pub async fn run_write<F, T>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self.acquire().await?;
        let pool = self.pool.clone();
        let state = Arc::new(AtomicU8::new(RUNNING));
        let task_state = Arc::clone(&state);
        let timeout_ms = self.timeout_ms();

        let mut task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let mut conn: PooledConn = pool.get()?;
            conn.immediate_transaction(|conn| {
                let value = op(conn)?;
                match task_state.compare_exchange(
                    RUNNING,
                    COMMITTING,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => Ok(value),
                    Err(_) => {
                        debug!("Write outlived its deadline, rolling back");
                        Err(WaitlistError::Timeout(timeout_ms))
                    }
                }
            })
        });

        match tokio::time::timeout(self.operation_timeout, &mut task).await {
            Ok(joined) => joined.map_err(task_failed)?,
            Err(_) => {
                let abandoned = state
                    .compare_exchange(RUNNING, ABANDONED, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok();
                if abandoned {
                    Err(self.timeout_error())
                } else {
                    // Commit is in progress
                    task.await.map_err(task_failed)?
                }
            }
        }
    }

    /// Wait in the FIFO queue for a free slot
    async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| WaitlistError::Pool("connection pool is closed".to_string()))
    }

    fn timeout_ms(&self) -> u64 {
        self.operation_timeout.as_millis() as u64
    }

    fn timeout_error(&self) -> WaitlistError {
        WaitlistError::Timeout(self.timeout_ms())
    }

    /// Slots not currently checked out
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Stop handing out connections. Waiting and future callers get a pool error.
    pub fn close(&self) {
        self.permits.close();
        debug!("Connection pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }
}

fn task_failed(e: tokio::task::JoinError) -> WaitlistError {
    WaitlistError::Storage(format!("store task failed: {}", e))
}
