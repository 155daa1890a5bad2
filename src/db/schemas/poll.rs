//! Poll document schema
//!
//! Options and the voter set are embedded. The option index is the stable
//! option identifier, so `options` never changes length after creation.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::auth::normalize_location;
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for polls
pub const POLL_COLLECTION: &str = "polls";

/// Poll lifecycle status (`active -> closed`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollStatus {
    #[default]
    Active,
    Closed,
}

impl PollStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PollStatus::Active => "active",
            PollStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for PollStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PollOption {
    pub text: String,
    #[serde(default)]
    pub votes: i64,
}

impl PollOption {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            votes: 0,
        }
    }
}

/// Poll document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PollDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Target location as entered
    pub target_location: String,

    /// Normalized target location used for every comparison
    pub location_key: String,

    /// Principal id of the creating official
    pub created_by: String,

    pub options: Vec<PollOption>,

    /// Principal ids that have voted
    #[serde(default)]
    pub voters: Vec<String>,

    #[serde(default)]
    pub status: PollStatus,
}

impl PollDoc {
    pub fn new(
        title: String,
        description: Option<String>,
        target_location: String,
        options: Vec<PollOption>,
        created_by: String,
    ) -> Self {
        let location_key = normalize_location(&target_location);
        Self {
            _id: None,
            metadata: Metadata::new(),
            title,
            description,
            target_location,
            location_key,
            created_by,
            options,
            voters: Vec::new(),
            status: PollStatus::Active,
        }
    }

    pub fn id_hex(&self) -> String {
        self._id.map(|id| id.to_hex()).unwrap_or_default()
    }

    /// Sum of votes across all options; always equals `voters.len()`
    pub fn total_votes(&self) -> i64 {
        self.options.iter().map(|o| o.votes).sum()
    }

    pub fn has_voted(&self, user: &str) -> bool {
        self.voters.iter().any(|v| v == user)
    }
}

impl IntoIndexes for PollDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "location_key": 1 },
                Some(
                    IndexOptions::builder()
                        .name("location_key_index".to_string())
                        .build(),
                ),
            ),
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

impl MutMetadata for PollDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
