//! Configuration for the waitlist server
//!
//! CLI arguments with environment variable fallbacks using clap. A `.env`
//! file is loaded by the binary before parsing.

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::WaitlistError;
use crate::policy::DEFAULT_STATUS_PREFIX;

/// Waitlist registry server
#[derive(Parser, Debug, Clone)]
#[command(name = "waitlist")]
#[command(about = "Waitlist registry with an admin dashboard API and live change notifications")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:3003")]
    pub listen: SocketAddr,

    /// SQLite database location
    #[arg(long, env = "DATABASE_URL", default_value = "waitlist.db")]
    pub database_url: String,

    /// Maximum number of pooled store connections
    #[arg(long, env = "DB_POOL_SIZE", default_value = "10")]
    pub pool_size: u32,

    /// Upper bound for a single store operation, including pool checkout
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,

    /// Dashboard admin username (required)
    #[arg(long, env = "ADMIN_USERNAME")]
    pub admin_username: Option<String>,

    /// Dashboard admin password (required)
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Comma-separated list of allowed CORS origins ("*" allows any)
    #[arg(long, env = "ALLOWED_ORIGINS", default_value = "")]
    pub allowed_origins: String,

    /// Phone prefix whose registrations keep their requested status
    #[arg(long, env = "STATUS_PREFIX", default_value = DEFAULT_STATUS_PREFIX)]
    pub status_prefix: String,

    /// WebSocket ping interval in seconds
    #[arg(long, env = "WS_HEARTBEAT_SECS", default_value = "30")]
    pub heartbeat_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Admin credentials compared against login attempts
#[derive(Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Args {
    /// Validate configuration. Startup aborts on any error.
    pub fn validate(&self) -> Result<(), WaitlistError> {
        match self.admin_username.as_deref() {
            Some(u) if !u.trim().is_empty() => {}
            _ => return Err(WaitlistError::Config("ADMIN_USERNAME is required".to_string())),
        }
        match self.admin_password.as_deref() {
            Some(p) if !p.is_empty() => {}
            _ => return Err(WaitlistError::Config("ADMIN_PASSWORD is required".to_string())),
        }
        if self.database_url.trim().is_empty() {
            return Err(WaitlistError::Config("DATABASE_URL must not be empty".to_string()));
        }
        if self.pool_size == 0 {
            return Err(WaitlistError::Config("DB_POOL_SIZE must be at least 1".to_string()));
        }
        if self.request_timeout_ms == 0 {
            return Err(WaitlistError::Config(
                "REQUEST_TIMEOUT_MS must be greater than 0".to_string(),
            ));
        }
        if self.status_prefix.is_empty() {
            return Err(WaitlistError::Config("STATUS_PREFIX must not be empty".to_string()));
        }
        if self.heartbeat_secs == 0 {
            return Err(WaitlistError::Config(
                "WS_HEARTBEAT_SECS must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Admin credentials. Only meaningful after `validate()` succeeded.
    pub fn admin_credentials(&self) -> Result<AdminCredentials, WaitlistError> {
        match (&self.admin_username, &self.admin_password) {
            (Some(username), Some(password)) => Ok(AdminCredentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => Err(WaitlistError::Config("admin credentials are not configured".to_string())),
        }
    }

    /// Parsed CORS origin allow-list
    pub fn allowed_origin_list(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["waitlist"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).expect("args should parse")
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["--admin-username", "admin", "--admin-password", "pw"]);
        assert_eq!(args.pool_size, 10);
        assert_eq!(args.status_prefix, "62");
        assert_eq!(args.listen.port(), 3003);
        assert!(args.allowed_origin_list().is_empty());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let args = parse(&["--admin-username", "admin"]);
        let err = args.validate().unwrap_err();
        assert!(err.to_string().contains("ADMIN_PASSWORD"));

        let args = parse(&["--admin-username", "  ", "--admin-password", "pw"]);
        assert!(matches!(args.validate(), Err(WaitlistError::Config(_))));
    }

    #[test]
    fn test_zero_pool_size_rejected() {
        let args = parse(&[
            "--admin-username",
            "admin",
            "--admin-password",
            "pw",
            "--pool-size",
            "0",
        ]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_origin_list_parsing() {
        let args = parse(&[
            "--admin-username",
            "admin",
            "--admin-password",
            "pw",
            "--allowed-origins",
            "http://localhost:3003, http://localhost:8080,,",
        ]);
        assert_eq!(
            args.allowed_origin_list(),
            vec!["http://localhost:3003".to_string(), "http://localhost:8080".to_string()]
        );
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let args = parse(&["--admin-username", "admin", "--admin-password", "hunter2"]);
        let creds = args.admin_credentials().unwrap();
        let dbg = format!("{:?}", creds);
        assert!(dbg.contains("admin"));
        assert!(!dbg.contains("hunter2"));
    }
}
