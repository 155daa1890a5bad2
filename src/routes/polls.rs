//! Poll routes
//!
//! - `POST /api/polls`             create (official)
//! - `GET  /api/polls`             list, `?location=`
//! - `GET  /api/polls/{id}`        fetch
//! - `POST /api/polls/{id}/vote`   vote (citizen), `{ optionIndex }`
//! - `POST /api/polls/{id}/close`  close (creating official)

use bytes::Bytes;
use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use super::views::PollView;
use super::{json_response, parse_query, principal, read_json, BoxError, FullBody};
use crate::server::AppState;
use crate::services::NewPoll;
use crate::types::Result;

#[derive(Deserialize, Default)]
#[serde(default)]
struct LocationQuery {
    location: Option<String>,
}

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
        (Method::POST, []) => create(req, state).await,
        (Method::GET, []) => list(req, state).await,
        (Method::GET, [id]) => get(req, state, id).await,
        (Method::POST, [id, "vote"]) => vote(req, state, id).await,
        (Method::POST, [id, "close"]) => close(req, state, id).await,
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
    let fields: NewPoll = read_json(req, state.args.max_body_bytes).await?;
    let poll = state.services.polls.create(&who, fields).await?;
    Ok(json_response(StatusCode::CREATED, &PollView::from(poll)))
}

async fn list<B>(req: Request<B>, state: &AppState) -> Result<Response<FullBody>> {
    principal(&req, state)?;
    let query: LocationQuery = parse_query(&req)?;
    let polls = state.services.polls.list(query.location.as_deref()).await?;
    let views: Vec<PollView> = polls.into_iter().map(Into::into).collect();
    Ok(json_response(StatusCode::OK, &views))
}

async fn get<B>(req: Request<B>, state: &AppState, id: &str) -> Result<Response<FullBody>> {
    principal(&req, state)?;
    let poll = state.services.polls.get(id).await?;
    Ok(json_response(StatusCode::OK, &PollView::from(poll)))
}

async fn vote<B>(req: Request<B>, state: &AppState, id: &str) -> Result<Response<FullBody>>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let who = principal(&req, state)?;
    let body: Value = read_json(req, state.args.max_body_bytes).await?;
    // Anything but a JSON integer is passed on as "no index"
    let option_index = body.get("optionIndex").and_then(Value::as_i64);
    let poll = state.services.polls.vote(&who, id, option_index).await?;
    Ok(json_response(StatusCode::OK, &PollView::from(poll)))
}

async fn close<B>(req: Request<B>, state: &AppState, id: &str) -> Result<Response<FullBody>> {
    let who = principal(&req, state)?;
    let poll = state.services.polls.close(&who, id).await?;
    Ok(json_response(StatusCode::OK, &PollView::from(poll)))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::TestApp;
    use crate::auth::Principal;
    use hyper::{Method, StatusCode};
    use serde_json::json;

    async fn create_poll(app: &TestApp) -> String {
        let o1 = Principal::official("o1", "Austin");
        let (status, body) = app
            .call(
                Method::POST,
                "/api/polls",
                Some(&o1),
                Some(json!({ "title": "New park?", "targetLocation": "Austin", "options": ["Yes", "No"] })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_vote_flow() {
        let app = TestApp::new();
        let id = create_poll(&app).await;
        let c1 = Principal::citizen("c1", "Austin");
        let uri = format!("/api/polls/{id}/vote");

        let (status, body) = app.call(Method::POST, &uri, Some(&c1), Some(json!({ "optionIndex": 0 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["options"][0]["votes"], 1);
        assert_eq!(body["totalVotes"], 1);

        let (status, body) = app.call(Method::POST, &uri, Some(&c1), Some(json!({ "optionIndex": 1 }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "ALREADY_VOTED");
    }

    #[tokio::test]
    async fn test_bad_option_index() {
        let app = TestApp::new();
        let id = create_poll(&app).await;
        let c1 = Principal::citizen("c1", "Austin");
        let uri = format!("/api/polls/{id}/vote");

        for bad in [json!({ "optionIndex": 2 }), json!({ "optionIndex": "1" }), json!({ "optionIndex": 0.5 }), json!({})] {
            let (status, body) = app.call(Method::POST, &uri, Some(&c1), Some(bad)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["kind"], "invalid_input");
        }

        // Authorization is decided before the index is looked at
        let o1 = Principal::official("o1", "Austin");
        let (status, _) = app.call(Method::POST, &uri, Some(&o1), Some(json!({ "optionIndex": 9 }))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, body) = app.call(Method::GET, &format!("/api/polls/{id}"), Some(&c1), None).await;
        assert_eq!(body["totalVotes"], 0);
    }

    #[tokio::test]
    async fn test_close_then_vote() {
        let app = TestApp::new();
        let id = create_poll(&app).await;
        let o1 = Principal::official("o1", "Austin");

        let (status, body) = app.call(Method::POST, &format!("/api/polls/{id}/close"), Some(&o1), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "closed");

        let (status, body) = app
            .call(
                Method::POST,
                &format!("/api/polls/{id}/vote"),
                Some(&Principal::citizen("c1", "Austin")),
                Some(json!({ "optionIndex": 0 })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "state_error");
    }

    #[tokio::test]
    async fn test_list_requires_auth() {
        let app = TestApp::new();
        create_poll(&app).await;

        let (status, _) = app.call(Method::GET, "/api/polls", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let c1 = Principal::citizen("c1", "Austin");
        let (status, body) = app.call(Method::GET, "/api/polls?location=AUSTIN", Some(&c1), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
    }
}
