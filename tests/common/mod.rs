//! Shared harness: a live server on an ephemeral port backed by a temp database

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

use waitlist::{
    AdminCredentials, BroadcastHub, BroadcastHubConfig, CorsPolicy, HttpServer, PoolConfig,
    StatusPolicy, Store, WaitlistService,
};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "s3cret";
pub const ALLOWED_ORIGIN: &str = "http://localhost:8080";

pub struct TestServer {
    pub addr: SocketAddr,
    pub store: Arc<Store>,
    pub hub: Arc<BroadcastHub>,
    _temp: TempDir,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Wait until the hub reports `n` subscribers
    pub async fn wait_for_subscribers(&self, n: usize) {
        for _ in 0..200 {
            if self.hub.subscriber_count() == n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {} subscribers, have {}",
            n,
            self.hub.subscriber_count()
        );
    }
}

pub async fn spawn_server() -> TestServer {
    spawn_server_with(BroadcastHubConfig::default()).await
}

pub async fn spawn_server_with(hub_config: BroadcastHubConfig) -> TestServer {
    let temp = TempDir::new().unwrap();
    let url = temp.path().join("waitlist.db").to_string_lossy().to_string();

    let store = Arc::new(Store::open(&url, &PoolConfig::default()).unwrap());
    store.initialize().await.unwrap();

    let hub = Arc::new(BroadcastHub::new(hub_config));
    let service = Arc::new(WaitlistService::new(
        Arc::clone(&store),
        Arc::clone(&hub),
        StatusPolicy::default(),
        AdminCredentials {
            username: ADMIN_USERNAME.to_string(),
            password: ADMIN_PASSWORD.to_string(),
        },
    ));
    let server = Arc::new(HttpServer::new(
        service,
        CorsPolicy::new(vec![ALLOWED_ORIGIN.to_string()]),
    ));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server.run(listener));

    TestServer {
        addr,
        store,
        hub,
        _temp: temp,
    }
}

pub fn registrant(name: &str, phone: &str, status: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "phone": phone,
        "status": status,
        "channel": "web",
        "registeredAt": "2024-01-01T00:00:00Z",
    })
}
