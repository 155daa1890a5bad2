//! Petition routes
//!
//! - `POST   /api/petitions`            create (citizen)
//! - `GET    /api/petitions`            list, public
//! - `GET    /api/petitions/local`      jurisdiction queue (official)
//! - `GET    /api/petitions/{id}`       fetch, public
//! - `PUT    /api/petitions/{id}`       owner edit
//! - `DELETE /api/petitions/{id}`       owner delete
//! - `POST   /api/petitions/{id}/sign`  sign (citizen)
//! - `PATCH  /api/petitions/{id}/status` status change (official)

use bytes::Bytes;
use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::views::PetitionView;
use super::{json_response, parse_query, principal, read_json, BoxError, FullBody, MessageResponse};
use crate::server::AppState;
use crate::services::{NewPetition, PetitionQuery, PetitionUpdate};
use crate::types::Result;

#[derive(Deserialize, Default)]
#[serde(default)]
pub(crate) struct StatusQuery {
    pub status: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct StatusBody {
    status: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignResponse {
    message: &'static str,
    signature_count: u64,
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
        (Method::GET, ["local"]) => local(req, state).await,
        (Method::GET, [id]) => get(state, id).await,
        (Method::PUT, [id]) => edit(req, state, id).await,
        (Method::DELETE, [id]) => delete(req, state, id).await,
        (Method::POST, [id, "sign"]) => sign(req, state, id).await,
        (Method::PATCH, [id, "status"]) => change_status(req, state, id).await,
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
    let fields: NewPetition = read_json(req, state.args.max_body_bytes).await?;
    let petition = state.services.petitions.create(&who, fields).await?;
    Ok(json_response(StatusCode::CREATED, &PetitionView::from(petition)))
}

async fn list<B>(req: Request<B>, state: &AppState) -> Result<Response<FullBody>> {
    let query: PetitionQuery = parse_query(&req)?;
    let page = state.services.petitions.list(&query).await?;
    Ok(json_response(StatusCode::OK, &page.map(PetitionView::from)))
}

async fn local<B>(req: Request<B>, state: &AppState) -> Result<Response<FullBody>> {
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

async fn get(state: &AppState, id: &str) -> Result<Response<FullBody>> {
    let petition = state.services.petitions.get(id).await?;
    Ok(json_response(StatusCode::OK, &PetitionView::from(petition)))
}

async fn edit<B>(req: Request<B>, state: &AppState, id: &str) -> Result<Response<FullBody>>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let who = principal(&req, state)?;
    let fields: PetitionUpdate = read_json(req, state.args.max_body_bytes).await?;
    let petition = state.services.petitions.edit(&who, id, fields).await?;
    Ok(json_response(StatusCode::OK, &PetitionView::from(petition)))
}

async fn delete<B>(req: Request<B>, state: &AppState, id: &str) -> Result<Response<FullBody>> {
    let who = principal(&req, state)?;
    state.services.petitions.delete(&who, id).await?;
    Ok(json_response(
        StatusCode::OK,
        &MessageResponse { message: "Petition deleted successfully" },
    ))
}

async fn sign<B>(req: Request<B>, state: &AppState, id: &str) -> Result<Response<FullBody>> {
    let who = principal(&req, state)?;
    let signature_count = state.services.petitions.sign(&who, id).await?;
    Ok(json_response(
        StatusCode::OK,
        &SignResponse {
            message: "Petition signed successfully",
            signature_count,
        },
    ))
}

async fn change_status<B>(req: Request<B>, state: &AppState, id: &str) -> Result<Response<FullBody>>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let who = principal(&req, state)?;
    let body: StatusBody = read_json(req, state.args.max_body_bytes).await?;
    let petition = state
        .services
        .petitions
        .change_status(&who, id, body.status.as_deref())
        .await?;
    Ok(json_response(StatusCode::OK, &PetitionView::from(petition)))
}
