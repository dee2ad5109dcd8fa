//! Waitlist - registrant registry with an admin dashboard API
//!
//! Serves a REST API over a SQLite store of waitlist registrants and pushes a
//! content-free `data_updated` signal to every WebSocket subscriber whenever
//! the registrant set changes.
//!
//! ## Architecture
//!
//! ```text
//! HTTP (hyper) ──► HttpServer ──► WaitlistService ──► Store ──► ConnectionPool ──► SQLite
//!                      │                 │
//!                      └── /ws ──────────┴──► BroadcastHub ──► WebSocket subscribers
//! ```
//!
//! ## Startup
//!
//! 1. Configuration is validated; missing admin credentials abort startup
//! 2. The schema is created if absent
//! 3. Exactly one admin record is ensured
//! 4. The listener starts accepting

pub mod config;
pub mod cors;
pub mod db;
pub mod error;
pub mod http;
pub mod hub;
pub mod policy;
pub mod response;
pub mod service;
pub mod ws;

pub use config::{AdminCredentials, Args};
pub use cors::CorsPolicy;
pub use db::{BootstrapReport, PoolConfig, Registrant, Store};
pub use error::{Result, WaitlistError};
pub use http::HttpServer;
pub use hub::{BroadcastHub, BroadcastHubConfig, ClientMessage, ServerMessage};
pub use policy::StatusPolicy;
pub use service::WaitlistService;
