//! Petition document schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::auth::normalize_location;
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::types::CivicError;

/// Collection name for petitions
pub const PETITION_COLLECTION: &str = "petitions";

/// Signature target used when none (or a non-positive one) is given
pub const DEFAULT_PETITION_GOAL: i64 = 100;

/// Petition lifecycle status
///
/// `active -> under_review -> closed`, or `active -> closed`. Nothing
/// leaves `closed`, and nothing returns to `active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PetitionStatus {
    #[default]
    Active,
    UnderReview,
    Closed,
}

impl PetitionStatus {
    pub const ALL: [PetitionStatus; 3] = [
        PetitionStatus::Active,
        PetitionStatus::UnderReview,
        PetitionStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PetitionStatus::Active => "active",
            PetitionStatus::UnderReview => "under_review",
            PetitionStatus::Closed => "closed",
        }
    }

    /// Whether `next` is reachable from `self` in one step
    pub fn can_transition_to(&self, next: PetitionStatus) -> bool {
        matches!(
            (self, next),
            (PetitionStatus::Active, PetitionStatus::UnderReview)
                | (PetitionStatus::Active, PetitionStatus::Closed)
                | (PetitionStatus::UnderReview, PetitionStatus::Closed)
        )
    }
}

impl fmt::Display for PetitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PetitionStatus {
    type Err = CivicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "active" => Ok(PetitionStatus::Active),
            "under_review" => Ok(PetitionStatus::UnderReview),
            "closed" => Ok(PetitionStatus::Closed),
            other => Err(CivicError::invalid(format!("Invalid status value '{other}'"))),
        }
    }
}

/// Structured response left by an official
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OfficialResponse {
    pub comment: String,
    pub responded_by: String,
    pub responded_at: DateTime,
}

/// Petition document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PetitionDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    pub title: String,
    pub description: String,
    pub category: String,

    /// Location as entered
    pub location: String,

    /// Normalized location used for every comparison
    pub location_key: String,

    /// Target signature count
    pub goal: i64,

    /// Cached number of signature documents for this petition
    #[serde(default)]
    pub signature_count: i64,

    #[serde(default)]
    pub status: PetitionStatus,

    /// Principal id of the citizen who created the petition
    pub creator: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub official_response: Option<OfficialResponse>,
}

impl PetitionDoc {
    /// Create a new active petition with no signatures
    pub fn new(
        title: String,
        description: String,
        category: String,
        location: String,
        goal: i64,
        creator: String,
    ) -> Self {
        let location_key = normalize_location(&location);
        Self {
            _id: None,
            metadata: Metadata::new(),
            title,
            description,
            category,
            location,
            location_key,
            goal,
            signature_count: 0,
            status: PetitionStatus::Active,
            creator,
            official_response: None,
        }
    }

    pub fn id_hex(&self) -> String {
        self._id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

impl IntoIndexes for PetitionDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Jurisdiction queue and report counts
            (
                doc! { "location_key": 1, "status": 1 },
                Some(
                    IndexOptions::builder()
                        .name("location_status_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "creator": 1 },
                Some(IndexOptions::builder().name("creator_index".to_string()).build()),
            ),
            // Newest-first listings
            (
                doc! { "metadata.created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("created_at_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for PetitionDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
