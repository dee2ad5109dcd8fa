//! Status policy applied when a registrant is created
//!
//! Registrations from the designated country-code prefix keep the status the
//! caller asked for; everything else is parked as [`PENDING_STATUS`]. Updates
//! never go through this policy.

/// Status stored for registrations outside the designated prefix
pub const PENDING_STATUS: &str = "pending";

/// Default international prefix (Indonesia)
pub const DEFAULT_STATUS_PREFIX: &str = "62";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPolicy {
    prefix: String,
}

impl StatusPolicy {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Effective status for a new registrant
    pub fn derive_status<'a>(&self, phone: &str, requested: &'a str) -> &'a str {
        if phone.starts_with(&self.prefix) {
            requested
        } else {
            PENDING_STATUS
        }
    }
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_PREFIX)
    }
}
