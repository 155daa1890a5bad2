//! Issue routes
//!
//! - `POST /api/issues/create`  report an issue (signed in)
//! - `GET  /api/issues`         feed, public

use bytes::Bytes;
use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};

use super::views::IssueView;
use super::{json_response, principal, read_json, BoxError, FullBody};
use crate::server::AppState;
use crate::services::NewIssue;
use crate::types::Result;

pub(crate) async fn handle<B>(
    req: Request<B>,
    state: &AppState,
    method: &Method,
    rest: &[&str],
) -> Option<Result<Response<FullBody>>>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let result = match (method.clone(), rest) {
        (Method::POST, ["create"]) => create(req, state).await,
        (Method::GET, []) => list(state).await,
        _ => return None,
    };
    Some(result)
}

async fn create<B>(req: Request<B>, state: &AppState) -> Result<Response<FullBody>>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let who = principal(&req, state)?;
    let fields: NewIssue = read_json(req, state.args.max_body_bytes).await?;
    let issue = state.services.issues.create(&who, fields).await?;
    Ok(json_response(StatusCode::CREATED, &IssueView::from(issue)))
}

async fn list(state: &AppState) -> Result<Response<FullBody>> {
    let issues = state.services.issues.list().await?;
    let views: Vec<IssueView> = issues.into_iter().map(Into::into).collect();
    Ok(json_response(StatusCode::OK, &views))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::TestApp;
    use crate::auth::Principal;
    use hyper::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_report_and_list() {
        let app = TestApp::new();
        let c1 = Principal::citizen("c1", "Austin");

        let (status, created) = app
            .call(
                Method::POST,
                "/api/issues/create",
                Some(&c1),
                Some(json!({
                    "title": "Burst main",
                    "description": "Water on Elm St",
                    "category": "water",
                    "priority": "high"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["category"], "water");
        assert_eq!(created["priority"], "high");
        assert_eq!(created["status"], "pending");
        assert_eq!(created["reporter"], "c1");

        let (status, body) = app.call(Method::GET, "/api/issues", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let listed = body.as_array().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["id"], created["id"]);
    }

    #[tokio::test]
    async fn test_report_requires_sign_in_and_valid_fields() {
        let app = TestApp::new();
        let fields = json!({ "title": "Pothole", "description": "Deep one" });

        let (status, _) = app
            .call(Method::POST, "/api/issues/create", None, Some(fields.clone()))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let c1 = Principal::citizen("c1", "Austin");
        let (status, body) = app
            .call(
                Method::POST,
                "/api/issues/create",
                Some(&c1),
                Some(json!({ "title": "Pothole", "description": "Deep one", "category": "roads" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_INPUT");

        let (status, body) = app.call(Method::POST, "/api/issues/create", Some(&c1), Some(fields)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["category"], "other");
        assert_eq!(body["priority"], "medium");
    }
}
