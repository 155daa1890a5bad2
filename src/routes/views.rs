//! JSON shapes returned to clients

use bson::DateTime;
use serde::Serialize;

use crate::db::schemas::{
    IssueCategory, IssueDoc, IssuePriority, IssueStatus, OfficialResponse, PetitionDoc,
    PetitionStatus, PollDoc, PollOption, PollStatus,
};

fn timestamp(at: Option<DateTime>) -> Option<String> {
    at.map(|t| t.to_chrono().to_rfc3339())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficialResponseView {
    pub comment: String,
    pub responded_by: String,
    pub responded_at: String,
}

impl From<OfficialResponse> for OfficialResponseView {
    fn from(r: OfficialResponse) -> Self {
        Self {
            comment: r.comment,
            responded_by: r.responded_by,
            responded_at: r.responded_at.to_chrono().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PetitionView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub goal: i64,
    pub signature_count: i64,
    pub status: PetitionStatus,
    pub creator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub official_response: Option<OfficialResponseView>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<PetitionDoc> for PetitionView {
    fn from(p: PetitionDoc) -> Self {
        Self {
            id: p.id_hex(),
            title: p.title,
            description: p.description,
            category: p.category,
            location: p.location,
            goal: p.goal,
            signature_count: p.signature_count,
            status: p.status,
            creator: p.creator,
            official_response: p.official_response.map(Into::into),
            created_at: timestamp(p.metadata.created_at),
            updated_at: timestamp(p.metadata.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollView {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub target_location: String,
    pub created_by: String,
    pub options: Vec<PollOption>,
    pub total_votes: i64,
    pub voters: Vec<String>,
    pub status: PollStatus,
    pub created_at: Option<String>,
}

impl From<PollDoc> for PollView {
    fn from(p: PollDoc) -> Self {
        Self {
            id: p.id_hex(),
            total_votes: p.total_votes(),
            title: p.title,
            description: p.description,
            target_location: p.target_location,
            created_by: p.created_by,
            options: p.options,
            voters: p.voters,
            status: p.status,
            created_at: timestamp(p.metadata.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: IssueCategory,
    pub priority: IssuePriority,
    pub status: IssueStatus,
    pub reporter: String,
    pub created_at: Option<String>,
}

impl From<IssueDoc> for IssueView {
    fn from(i: IssueDoc) -> Self {
        Self {
            id: i.id_hex(),
            title: i.title,
            description: i.description,
            category: i.category,
            priority: i.priority,
            status: i.status,
            reporter: i.reporter,
            created_at: timestamp(i.metadata.created_at),
        }
    }
}
