//! Liveness endpoint
//!
//! `/health` returns 200 whenever the process is serving requests. It does
//! not touch the record store.

use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use super::{json_response, FullBody};
use crate::server::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub status: &'static str,
    pub version: &'static str,
    /// Short git commit the binary was built from
    pub commit: &'static str,
    pub built_at: &'static str,
    /// Uptime in seconds
    pub uptime: u64,
    pub timestamp: String,
    /// "development" or "production"
    pub mode: &'static str,
    pub node_id: String,
    /// "mongodb" or "memory"
    pub store: &'static str,
}

pub fn health_check(state: Arc<AppState>) -> Response<FullBody> {
    let response = HealthResponse {
        healthy: true,
        status: "online",
        version: env!("CARGO_PKG_VERSION"),
        commit: env!("GIT_COMMIT_SHORT"),
        built_at: env!("BUILD_TIMESTAMP"),
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        mode: if state.args.dev_mode { "development" } else { "production" },
        node_id: state.args.node_id.to_string(),
        store: if state.args.memory_store { "memory" } else { "mongodb" },
    };
    json_response(StatusCode::OK, &response)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::TestApp;
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new();
        let response = health_check(app.state.clone());
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["healthy"], true);
        assert_eq!(body["mode"], "development");
        assert_eq!(body["store"], "memory");
    }
}
