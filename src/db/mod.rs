//! SQLite store for waitlist registrants
//!
//! ## Architecture
//!
//! - `schema` - table definition and idempotent creation
//! - `models` - row, input and changeset types
//! - `registrants` - synchronous CRUD over a single connection
//! - `pool` - bounded connection pool with an async wait queue
//!
//! [`Store`] ties them together. Every async method checks out one pooled
//! connection, runs exactly one store operation on it, and gives it back.
//! Mutations go through the pool's write path, so one that times out leaves
//! the store untouched.

pub mod models;
pub mod pool;
pub mod registrants;
pub mod schema;

use tracing::{info, warn};

use crate::error::Result;

pub use models::{NewRegistrant, Registrant, RegistrantFields, RegistrantPatch};
pub use pool::{ConnectionPool, PoolConfig};

/// Outcome of [`Store::initialize`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapReport {
    /// True when this run inserted the admin record
    pub admin_created: bool,
    pub registrant_count: i64,
}

/// Registrant store service
pub struct Store {
    pool: ConnectionPool,
}

impl Store {
    /// Open the store. Does not touch the schema; call [`Store::initialize`]
    /// before serving requests.
    pub fn open(database_url: &str, config: &PoolConfig) -> Result<Self> {
        info!("Opening SQLite store at {}", database_url);
        let pool = ConnectionPool::open(database_url, config)?;
        Ok(Self { pool })
    }

    /// Bootstrap: ensure the schema and the single admin record exist
    pub async fn initialize(&self) -> Result<BootstrapReport> {
        self.ensure_schema().await?;
        let admin_created = self.ensure_admin().await?;
        let registrant_count = self.count().await?;
        Ok(BootstrapReport {
            admin_created,
            registrant_count,
        })
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        self.pool.run_write(schema::ensure_schema).await
    }

    /// Returns true when the admin record was inserted by this call
    pub async fn ensure_admin(&self) -> Result<bool> {
        self.pool.run_write(registrants::ensure_admin).await
    }

    /// Release the pool. Subsequent operations fail with a pool error.
    pub async fn shutdown(&self) {
        match self.count().await {
            Ok(count) => info!(registrants = count, "Store shutting down"),
            Err(e) => warn!(error = %e, "Store shutting down, final count unavailable"),
        }
        self.pool.close();
    }

    // =========================================================================
    // Registrant Operations
    // =========================================================================

    pub async fn list(&self) -> Result<Vec<Registrant>> {
        self.pool.run(registrants::list_registrants).await
    }

    pub async fn get(&self, id: i64) -> Result<Option<Registrant>> {
        self.pool
            .run(move |conn| registrants::get_registrant(conn, id))
            .await
    }

    pub async fn count(&self) -> Result<i64> {
        self.pool.run(registrants::count_registrants).await
    }

    pub async fn count_admins(&self) -> Result<i64> {
        self.pool.run(registrants::count_admins).await
    }

    pub async fn insert(&self, new: NewRegistrant) -> Result<i64> {
        self.pool
            .run_write(move |conn| registrants::insert_registrant(conn, &new))
            .await
    }

    pub async fn patch(&self, id: i64, patch: RegistrantPatch) -> Result<usize> {
        self.pool
            .run_write(move |conn| registrants::patch_registrant(conn, id, &patch))
            .await
    }

    pub async fn replace(&self, id: i64, values: NewRegistrant) -> Result<usize> {
        self.pool
            .run_write(move |conn| registrants::replace_registrant(conn, id, &values))
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<usize> {
        self.pool
            .run_write(move |conn| registrants::delete_registrant(conn, id))
            .await
    }
}
