//! Governance routes (officials)
//!
//! - `GET  /api/governance/petitions`              jurisdiction queue, `?status=`
//! - `POST /api/governance/petitions/{id}/respond` `{ comment, status }`

use bytes::Bytes;
use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;

use super::petitions::StatusQuery;
use super::views::PetitionView;
use super::{json_response, parse_query, principal, read_json, BoxError, FullBody};
use crate::server::AppState;
use crate::types::Result;

#[derive(Deserialize, Default)]
#[serde(default)]
struct RespondBody {
    comment: Option<String>,
    status: Option<String>,
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
        (Method::GET, []) => queue(req, state).await,
        (Method::POST, [id, "respond"]) => respond(req, state, id).await,
        _ => return None,
    };
    Some(result)
}

async fn queue<B>(req: Request<B>, state: &AppState) -> Result<Response<FullBody>> {
    let who = principal(&req, state)?;
    let query: StatusQuery = parse_query(&req)?;
    let petitions = state
        .services
        .governance
        .jurisdiction_petitions(&who, query.status.as_deref())
        .await?;
    let views: Vec<PetitionView> = petitions.into_iter().map(Into::into).collect();
    Ok(json_response(StatusCode::OK, &views))
}

async fn respond<B>(req: Request<B>, state: &AppState, id: &str) -> Result<Response<FullBody>>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let who = principal(&req, state)?;
    let body: RespondBody = read_json(req, state.args.max_body_bytes).await?;
    let petition = state
        .services
        .governance
        .respond(&who, id, body.comment.as_deref().unwrap_or(""), body.status.as_deref())
        .await?;
    Ok(json_response(StatusCode::OK, &PetitionView::from(petition)))
}
