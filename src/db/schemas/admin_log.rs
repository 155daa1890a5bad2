//! Admin audit log schema
//!
//! Append-only. Written when an official responds to a petition; never
//! read, updated, or deleted by the engines.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::{Metadata, PetitionStatus};

/// Collection name for audit entries
pub const ADMIN_LOG_COLLECTION: &str = "admin_logs";

/// Audit entry stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AdminLogDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Human-readable description of the action
    pub action: String,

    /// Principal id of the acting official
    pub user: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub petition: Option<ObjectId>,

    /// Petition status after the action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PetitionStatus>,

    pub timestamp: DateTime,
}

impl AdminLogDoc {
    pub fn new(action: String, user: String, petition: Option<ObjectId>) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            action,
            user,
            petition,
            status: None,
            timestamp: DateTime::now(),
        }
    }

    pub fn with_status(mut self, status: PetitionStatus) -> Self {
        self.status = Some(status);
        self
    }
}

impl IntoIndexes for AdminLogDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "petition": 1, "timestamp": -1 },
            Some(
                IndexOptions::builder()
                    .name("petition_timestamp_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for AdminLogDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
