//! Vote document schema
//!
//! Companion to the `voters` set embedded on each poll. The unique
//! (poll, user) index serializes concurrent votes by the same principal.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for votes
pub const VOTE_COLLECTION: &str = "votes";

/// Vote document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct VoteDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub poll: ObjectId,

    /// Principal id of the voter
    pub user: String,

    /// Index into the poll's options
    pub option_index: i64,
}

impl VoteDoc {
    pub fn new(poll: ObjectId, user: String, option_index: i64) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            poll,
            user,
            option_index,
        }
    }
}

impl IntoIndexes for VoteDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "poll": 1, "user": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("poll_user_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for VoteDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
