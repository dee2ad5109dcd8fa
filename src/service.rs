//! Waitlist operations behind the REST API
//!
//! Each operation validates its input before touching the store, performs one
//! store operation, and on a successful mutation asks the hub to signal every
//! subscriber exactly once. Failed operations never signal.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::AdminCredentials;
use crate::db::{Registrant, RegistrantFields, RegistrantPatch, Store};
use crate::error::{Result, WaitlistError};
use crate::hub::BroadcastHub;
use crate::policy::StatusPolicy;

/// Login request body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Health check payload
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub registrants: i64,
    pub subscribers: usize,
}

pub struct WaitlistService {
    store: Arc<Store>,
    hub: Arc<BroadcastHub>,
    policy: StatusPolicy,
    credentials: AdminCredentials,
}

impl WaitlistService {
    pub fn new(
        store: Arc<Store>,
        hub: Arc<BroadcastHub>,
        policy: StatusPolicy,
        credentials: AdminCredentials,
    ) -> Self {
        Self {
            store,
            hub,
            policy,
            credentials,
        }
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    /// Exact comparison against the configured admin credentials
    pub fn login(&self, request: &LoginRequest) -> Result<()> {
        let username = request.username.as_deref().unwrap_or_default();
        let password = request.password.as_deref().unwrap_or_default();

        if username == self.credentials.username && password == self.credentials.password {
            info!(username = %username, "Login succeeded");
            Ok(())
        } else {
            warn!(username = %username, "Login failed");
            Err(WaitlistError::Auth("Invalid username or password".to_string()))
        }
    }

    pub async fn list(&self) -> Result<Vec<Registrant>> {
        self.store.list().await
    }

    pub async fn get(&self, id: i64) -> Result<Registrant> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Create a registrant with the status policy applied. Returns the new id.
    pub async fn create(&self, fields: RegistrantFields) -> Result<i64> {
        let mut new = fields.validate()?;
        let requested = std::mem::take(&mut new.status);
        new.status = self.policy.derive_status(&new.phone, &requested).to_string();

        let status = new.status.clone();
        let id = self.store.insert(new).await?;
        info!(id = id, status = %status, requested = %requested, "Registrant created");

        self.hub.notify_data_updated("create");
        Ok(id)
    }

    /// Update only the supplied fields; status is stored verbatim
    pub async fn patch(&self, id: i64, patch: RegistrantPatch) -> Result<()> {
        patch.validate()?;

        if self.store.patch(id, patch).await? == 0 {
            return Err(not_found(id));
        }
        info!(id = id, "Registrant patched");

        self.hub.notify_data_updated("patch");
        Ok(())
    }

    /// Replace every field; status is stored verbatim
    pub async fn replace(&self, id: i64, fields: RegistrantFields) -> Result<()> {
        let values = fields.validate()?;

        if self.store.replace(id, values).await? == 0 {
            return Err(not_found(id));
        }
        info!(id = id, "Registrant replaced");

        self.hub.notify_data_updated("replace");
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if self.store.delete(id).await? == 0 {
            return Err(not_found(id));
        }
        info!(id = id, "Registrant deleted");

        self.hub.notify_data_updated("delete");
        Ok(())
    }

    pub async fn health(&self) -> Result<HealthReport> {
        Ok(HealthReport {
            status: "ok",
            registrants: self.store.count().await?,
            subscribers: self.hub.subscriber_count(),
        })
    }
}

fn not_found(id: i64) -> WaitlistError {
    WaitlistError::NotFound(format!("Registrant {} not found", id))
}
