//! Error types for the waitlist service

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WaitlistError {
    /// Missing or malformed caller input
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Store operation timed out after {0} ms")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<diesel::result::Error> for WaitlistError {
    fn from(e: diesel::result::Error) -> Self {
        WaitlistError::Storage(e.to_string())
    }
}

impl From<diesel::r2d2::PoolError> for WaitlistError {
    fn from(e: diesel::r2d2::PoolError) -> Self {
        WaitlistError::Pool(e.to_string())
    }
}

impl WaitlistError {
    /// True for failures that originate in the store layer rather than the caller
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            WaitlistError::Storage(_) | WaitlistError::Pool(_) | WaitlistError::Timeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, WaitlistError>;
