//! Report route
//!
//! `GET /api/reports?location=&startDate=&endDate=` (officials). Without a
//! `location` the official's own jurisdiction is reported.

use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::{json_response, parse_query, principal, FullBody};
use crate::server::AppState;
use crate::services::Report;
use crate::store::DateWindow;
use crate::types::Result;

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct ReportQuery {
    location: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Serialize)]
struct ReportResponse {
    success: bool,
    data: Report,
}

pub(crate) async fn handle<B>(req: Request<B>, state: &AppState) -> Option<Result<Response<FullBody>>> {
    Some(report(req, state).await)
}

async fn report<B>(req: Request<B>, state: &AppState) -> Result<Response<FullBody>> {
    let who = principal(&req, state)?;
    let query: ReportQuery = parse_query(&req)?;
    let window = DateWindow::parse(query.start_date.as_deref(), query.end_date.as_deref())?;
    let data = state
        .services
        .reports
        .report_for(&who, query.location.as_deref(), &window)
        .await?;
    Ok(json_response(StatusCode::OK, &ReportResponse { success: true, data }))
}
