//! CORS origin allow-list

use hyper::header::{self, HeaderValue};
use hyper::{HeaderMap, Response};

const ALLOWED_METHODS: &str = "GET, POST, PATCH, PUT, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type";

#[derive(Debug, Clone, Default)]
pub struct CorsPolicy {
    origins: Vec<String>,
    allow_any: bool,
}

impl CorsPolicy {
    pub fn new(origins: Vec<String>) -> Self {
        let allow_any = origins.iter().any(|o| o == "*");
        Self { origins, allow_any }
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        self.allow_any || self.origins.iter().any(|o| o == origin)
    }

    /// Add CORS headers when the request origin is on the allow-list
    pub fn apply<B>(&self, request_headers: &HeaderMap, response: &mut Response<B>) {
        let Some(origin) = request_headers
            .get(header::ORIGIN)
            .and_then(|v| v.to_str().ok())
        else {
            return;
        };
        if !self.is_allowed(origin) {
            return;
        }
        let Ok(value) = HeaderValue::from_str(origin) else {
            return;
        };

        let headers = response.headers_mut();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        headers.insert(header::VARY, HeaderValue::from_static("Origin"));
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_from(origin: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, HeaderValue::from_str(origin).unwrap());
        headers
    }

    #[test]
    fn test_listed_origin_gets_headers() {
        let cors = CorsPolicy::new(vec!["http://localhost:8080".to_string()]);
        let mut response = Response::new(());
        cors.apply(&request_from("http://localhost:8080"), &mut response);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:8080"
        );
    }

    #[test]
    fn test_unlisted_origin_gets_nothing() {
        let cors = CorsPolicy::new(vec!["http://localhost:8080".to_string()]);
        let mut response = Response::new(());
        cors.apply(&request_from("http://evil.example"), &mut response);
        assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());

        let mut response = Response::new(());
        cors.apply(&HeaderMap::new(), &mut response);
        assert!(response.headers().is_empty());
    }

    #[test]
    fn test_wildcard() {
        let cors = CorsPolicy::new(vec!["*".to_string()]);
        assert!(cors.is_allowed("null"));
        assert!(cors.is_allowed("https://anywhere.example"));
        assert!(!CorsPolicy::default().is_allowed("https://anywhere.example"));
    }
}
