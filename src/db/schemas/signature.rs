//! Signature document schema
//!
//! One row per (petition, user). The unique compound index is what makes
//! signing at-most-once under concurrency.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for signatures
pub const SIGNATURE_COLLECTION: &str = "signatures";

/// Signature document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SignatureDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Signed petition
    pub petition: ObjectId,

    /// Principal id of the signer
    pub user: String,
}

impl SignatureDoc {
    pub fn new(petition: ObjectId, user: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            petition,
            user,
        }
    }
}

impl IntoIndexes for SignatureDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "petition": 1, "user": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("petition_user_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for SignatureDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
