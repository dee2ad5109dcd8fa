//! HTTP API server
//!
//! ## Endpoints
//!
//! - `POST /login` - Admin credential check
//! - `GET /registrants` - List every registrant, ascending id
//! - `POST /registrants` - Create a registrant (status policy applies)
//! - `GET /registrants/{id}` - Fetch one registrant
//! - `PATCH /registrants/{id}` - Update supplied fields only
//! - `PUT /registrants/{id}` - Replace every field
//! - `DELETE /registrants/{id}` - Remove a registrant
//! - `GET /ws` - WebSocket change notifications
//! - `GET /health` - Health check
//!
//! `OPTIONS` on any path answers a CORS preflight with 204. Request bodies
//! must be a single JSON object of at most [`MAX_BODY_BYTES`]; larger bodies
//! get 413.

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::cors::CorsPolicy;
use crate::error::{Result, WaitlistError};
use crate::response;
use crate::service::{LoginRequest, WaitlistService};
use crate::ws;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 100 * 1024;

/// Resource addressed by a request path
#[derive(Debug, Clone, PartialEq, Eq)]
enum Route {
    Health,
    Login,
    Registrants,
    Registrant(i64),
    InvalidId(String),
    WebSocket,
    Unknown,
}

impl Route {
    fn parse(path: &str) -> Self {
        let path = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };
        match path {
            "/health" => Route::Health,
            "/login" => Route::Login,
            "/registrants" => Route::Registrants,
            "/ws" => Route::WebSocket,
            p => match p.strip_prefix("/registrants/") {
                Some(raw) if !raw.contains('/') => match raw.parse::<i64>() {
                    Ok(id) if id > 0 => Route::Registrant(id),
                    _ => Route::InvalidId(raw.to_string()),
                },
                _ => Route::Unknown,
            },
        }
    }
}

pub struct HttpServer {
    service: Arc<WaitlistService>,
    cors: CorsPolicy,
}

impl HttpServer {
    pub fn new(service: Arc<WaitlistService>, cors: CorsPolicy) -> Self {
        Self { service, cors }
    }

    /// Accept connections until the listener fails
    pub async fn run(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        info!(addr = %listener.local_addr()?, "HTTP server listening");

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let server = self.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let server = server.clone();
                    async move { server.handle_request(req, remote_addr).await }
                });

                if let Err(err) = http1::Builder::new()
                    .serve_connection(io, service)
                    .with_upgrades()
                    .await
                {
                    warn!(addr = %remote_addr, error = %err, "Connection error");
                }
            });
        }
    }

    async fn handle_request(
        &self,
        req: Request<Incoming>,
        remote_addr: SocketAddr,
    ) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
        let method = req.method().clone();
        let route = Route::parse(req.uri().path());
        let request_headers = req.headers().clone();

        debug!(method = %method, path = %req.uri().path(), "Incoming request");

        let mut response = if method == Method::OPTIONS {
            response::no_content()
        } else {
            self.dispatch(req, method, route, remote_addr).await
        };

        self.cors.apply(&request_headers, &mut response);
        Ok(response)
    }

    async fn dispatch(
        &self,
        req: Request<Incoming>,
        method: Method,
        route: Route,
        remote_addr: SocketAddr,
    ) -> Response<Full<Bytes>> {
        let result = match (&method, route) {
            (&Method::GET, Route::Health) => self.handle_health().await,
            (&Method::POST, Route::Login) => self.handle_login(req).await,

            (&Method::GET, Route::Registrants) => self.handle_list().await,
            (&Method::POST, Route::Registrants) => self.handle_create(req).await,

            (_, Route::InvalidId(raw)) => Err(WaitlistError::Validation(format!(
                "Invalid registrant id: {}",
                raw
            ))),
            (&Method::GET, Route::Registrant(id)) => self.handle_get(id).await,
            (&Method::PATCH, Route::Registrant(id)) => self.handle_patch(req, id).await,
            (&Method::PUT, Route::Registrant(id)) => self.handle_replace(req, id).await,
            (&Method::DELETE, Route::Registrant(id)) => self.handle_delete(id).await,

            (&Method::GET, Route::WebSocket) if hyper_tungstenite::is_upgrade_request(&req) => {
                Ok(ws::handle_upgrade(req, Arc::clone(self.service.hub()), remote_addr))
            }
            (&Method::GET, Route::WebSocket) => {
                Ok(response::bad_request("Expected a WebSocket upgrade"))
            }

            (_, Route::Unknown) => Ok(response::not_found("Not found")),
            _ => Ok(response::method_not_allowed()),
        };

        match result {
            Ok(response) => response,
            Err(e) => {
                debug!(method = %method, error = %e, "Request rejected");
                response::error_response(&e)
            }
        }
    }

    async fn handle_health(&self) -> Result<Response<Full<Bytes>>> {
        let report = self.service.health().await?;
        Ok(response::ok(&report))
    }

    /// POST /login
    async fn handle_login(&self, req: Request<Incoming>) -> Result<Response<Full<Bytes>>> {
        // An empty body is a failed login, not a malformed request
        let body = read_body(req).await?;
        let request: LoginRequest = if body.is_empty() {
            LoginRequest::default()
        } else {
            parse_object(&body)?
        };
        match self.service.login(&request) {
            Ok(()) => Ok(response::ok(&json!({
                "success": true,
                "message": "Login successful",
            }))),
            Err(WaitlistError::Auth(msg)) => Ok(response::json_response(
                StatusCode::UNAUTHORIZED,
                &json!({ "success": false, "message": msg }),
            )),
            Err(e) => Err(e),
        }
    }

    /// GET /registrants
    async fn handle_list(&self) -> Result<Response<Full<Bytes>>> {
        let registrants = self.service.list().await?;
        Ok(response::ok(&registrants))
    }

    /// POST /registrants
    async fn handle_create(&self, req: Request<Incoming>) -> Result<Response<Full<Bytes>>> {
        let fields = read_json(req).await?;
        let id = self.service.create(fields).await?;
        Ok(response::created(&json!({
            "id": id,
            "message": "Registrant created",
        })))
    }

    /// GET /registrants/{id}
    async fn handle_get(&self, id: i64) -> Result<Response<Full<Bytes>>> {
        let registrant = self.service.get(id).await?;
        Ok(response::ok(&registrant))
    }

    /// PATCH /registrants/{id}
    async fn handle_patch(&self, req: Request<Incoming>, id: i64) -> Result<Response<Full<Bytes>>> {
        let patch = read_json(req).await?;
        self.service.patch(id, patch).await?;
        Ok(response::message(StatusCode::OK, "Registrant updated"))
    }

    /// PUT /registrants/{id}
    async fn handle_replace(
        &self,
        req: Request<Incoming>,
        id: i64,
    ) -> Result<Response<Full<Bytes>>> {
        let fields = read_json(req).await?;
        self.service.replace(id, fields).await?;
        Ok(response::message(StatusCode::OK, "Registrant updated"))
    }

    /// DELETE /registrants/{id}
    async fn handle_delete(&self, id: i64) -> Result<Response<Full<Bytes>>> {
        self.service.delete(id).await?;
        Ok(response::message(StatusCode::OK, "Registrant deleted"))
    }
}

/// Collect the request body, refusing anything over [`MAX_BODY_BYTES`]
async fn read_body(req: Request<Incoming>) -> Result<Bytes> {
    let collected = Limited::new(req.into_body(), MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                WaitlistError::PayloadTooLarge(MAX_BODY_BYTES)
            } else {
                WaitlistError::Validation(format!("Failed to read body: {}", e))
            }
        })?;
    Ok(collected.to_bytes())
}

/// Parse a body that must be a single JSON object
fn parse_object<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    if body.is_empty() {
        return Err(WaitlistError::Validation("Request body is empty".to_string()));
    }
    let value: Value = serde_json::from_slice(body)?;
    if !value.is_object() {
        return Err(WaitlistError::Validation(
            "Request body must be a JSON object".to_string(),
        ));
    }
    Ok(serde_json::from_value(value)?)
}

async fn read_json<T: DeserializeOwned>(req: Request<Incoming>) -> Result<T> {
    parse_object(&read_body(req).await?)
}
