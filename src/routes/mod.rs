//! HTTP route handlers
//!
//! Handlers parse the request, call exactly one engine operation and
//! translate the outcome. Every failure leaves as `{ error, code, kind }`
//! with the status mapped from its `CivicError`.
//!
//! Handlers are generic over the request body so tests can drive them with
//! in-memory bodies.

pub mod governance;
pub mod health;
pub mod issues;
pub mod petitions;
pub mod polls;
pub mod reports;
pub mod views;

pub use health::health_check;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};

use crate::auth::Principal;
use crate::server::AppState;
use crate::types::{CivicError, ErrorKind, Result};

pub type FullBody = Full<Bytes>;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: String,
    code: &'a str,
    kind: &'a str,
}

#[derive(Serialize)]
pub(crate) struct MessageResponse {
    pub message: &'static str,
}

pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<FullBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(json)))
        .unwrap()
}

pub(crate) fn error_response(err: &CivicError) -> Response<FullBody> {
    match err.kind() {
        ErrorKind::Unavailable | ErrorKind::Internal => error!(error = %err, "Request failed"),
        _ => debug!(error = %err, "Request rejected"),
    }
    json_response(
        err.status_code(),
        &ErrorResponse {
            error: err.public_message(),
            code: err.code(),
            kind: err.kind().as_str(),
        },
    )
}

pub(crate) fn not_found_response(path: &str) -> Response<FullBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &serde_json::json!({ "error": "Not Found", "path": path }),
    )
}

fn auth_header<B>(req: &Request<B>) -> Option<&str> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
}

/// Verified principal for the request
pub(crate) fn principal<B>(req: &Request<B>, state: &AppState) -> Result<Principal> {
    state.jwt.principal_from_header(auth_header(req))
}

/// Decode the query string; an absent query decodes as all-defaults
pub(crate) fn parse_query<B, T: DeserializeOwned>(req: &Request<B>) -> Result<T> {
    serde_urlencoded::from_str(req.uri().query().unwrap_or(""))
        .map_err(|e| CivicError::invalid(format!("Invalid query string: {e}")))
}

/// Read and decode a JSON body no larger than `limit` bytes.
/// An empty body decodes as `{}`.
pub(crate) async fn read_json<B, T>(req: Request<B>, limit: usize) -> Result<T>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
    T: DeserializeOwned,
{
    let bytes = Limited::new(req.into_body(), limit)
        .collect()
        .await
        .map_err(|e| CivicError::invalid(format!("Could not read request body: {e}")))?
        .to_bytes();

    let bytes: &[u8] = if bytes.is_empty() { b"{}" } else { &bytes };
    Ok(serde_json::from_slice(bytes)?)
}

/// Route an `/api/*` request
pub async fn handle_api_request<B>(req: Request<B>, state: Arc<AppState>) -> Response<FullBody>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let method = req.method().clone();
    let path = req.uri().path().trim_end_matches('/').to_string();
    let segments: Vec<&str> = path
        .trim_start_matches("/api/")
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    let result = match segments.as_slice() {
        ["petitions", rest @ ..] => petitions::handle(req, &state, &method, rest).await,
        ["polls", rest @ ..] => polls::handle(req, &state, &method, rest).await,
        ["governance", "petitions", rest @ ..] => governance::handle(req, &state, &method, rest).await,
        ["issues", rest @ ..] => issues::handle(req, &state, &method, rest).await,
        ["reports"] if method == Method::GET => reports::handle(req, &state).await,
        _ => None,
    };

    match result {
        Some(Ok(response)) => response,
        Some(Err(err)) => error_response(&err),
        None => not_found_response(&path),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::Args;
    use crate::store::MemoryStore;
    use clap::Parser;

    pub struct TestApp {
        pub state: Arc<AppState>,
        pub store: Arc<MemoryStore>,
    }

    impl TestApp {
        pub fn new() -> Self {
            let args = Args::try_parse_from(["townhall", "--dev-mode", "--memory-store"]).unwrap();
            let store = Arc::new(MemoryStore::new());
            let state = Arc::new(AppState::new(args, store.clone()).unwrap());
            Self { state, store }
        }

        pub fn token(&self, principal: &Principal) -> String {
            self.state.jwt.generate_token(principal).unwrap()
        }

        pub async fn call(
            &self,
            method: Method,
            uri: &str,
            who: Option<&Principal>,
            body: Option<serde_json::Value>,
        ) -> (StatusCode, serde_json::Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(p) = who {
                builder = builder.header("Authorization", format!("Bearer {}", self.token(p)));
            }
            let body = body.map(|b| b.to_string()).unwrap_or_default();
            let req = builder.body(Full::new(Bytes::from(body))).unwrap();

            let response = handle_api_request(req, self.state.clone()).await;
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
            (status, json)
        }
    }
}
