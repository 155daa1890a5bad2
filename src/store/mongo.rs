//! MongoDB record store
//!
//! Guarded writes are single `find_one_and_update` calls whose filter
//! carries the precondition; uniqueness comes from the compound unique
//! indexes declared on the signature and vote schemas.

use bson::{doc, oid::ObjectId, Bson, Document};
use tracing::debug;

use super::{DateWindow, Insert, Page, PetitionEdit, PetitionFilter, PollFilter, RecordStore};
use crate::db::mongo::{MongoClient, MongoCollection};
use crate::db::schemas::{
    AdminLogDoc, IssueDoc, OfficialResponse, PetitionDoc, PetitionStatus, PollDoc, PollStatus,
    SignatureDoc, VoteDoc, ADMIN_LOG_COLLECTION, ISSUE_COLLECTION, PETITION_COLLECTION,
    POLL_COLLECTION, SIGNATURE_COLLECTION, VOTE_COLLECTION,
};
use crate::types::{CivicError, Result};

pub struct MongoStore {
    petitions: MongoCollection<PetitionDoc>,
    signatures: MongoCollection<SignatureDoc>,
    polls: MongoCollection<PollDoc>,
    votes: MongoCollection<VoteDoc>,
    issues: MongoCollection<IssueDoc>,
    admin_logs: MongoCollection<AdminLogDoc>,
}

impl MongoStore {
    /// Open every collection, creating indexes as needed
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            petitions: client.collection(PETITION_COLLECTION).await?,
            signatures: client.collection(SIGNATURE_COLLECTION).await?,
            polls: client.collection(POLL_COLLECTION).await?,
            votes: client.collection(VOTE_COLLECTION).await?,
            issues: client.collection(ISSUE_COLLECTION).await?,
            admin_logs: client.collection(ADMIN_LOG_COLLECTION).await?,
        })
    }
}

fn newest_first() -> Document {
    doc! { "metadata.created_at": -1, "_id": -1 }
}

/// Read a numeric aggregation field regardless of the width the server chose
fn read_count(doc: &Document, key: &str) -> u64 {
    match doc.get(key) {
        Some(Bson::Int32(n)) => (*n).max(0) as u64,
        Some(Bson::Int64(n)) => (*n).max(0) as u64,
        Some(Bson::Double(n)) => n.max(0.0) as u64,
        _ => 0,
    }
}

/// Count rows in `child` whose parent (via `local_field`) is in a jurisdiction
fn jurisdiction_count_pipeline(
    parent_collection: &str,
    local_field: &str,
    location_key: &str,
    window: &DateWindow,
) -> Vec<Document> {
    let mut matcher = doc! { "parent.location_key": location_key };
    if let Some(range) = window.to_range() {
        matcher.insert("metadata.created_at", range);
    }

    vec![
        doc! {
            "$lookup": {
                "from": parent_collection,
                "localField": local_field,
                "foreignField": "_id",
                "as": "parent",
            }
        },
        doc! { "$unwind": "$parent" },
        doc! { "$match": matcher },
        doc! { "$count": "total" },
    ]
}

#[async_trait::async_trait]
impl RecordStore for MongoStore {
    async fn insert_petition(&self, mut petition: PetitionDoc) -> Result<PetitionDoc> {
        let id = self.petitions.insert_one(petition.clone()).await?;
        petition._id = Some(id);
        // Read back so the caller sees the stored timestamps
        Ok(self.petitions.find_one(doc! { "_id": id }).await?.unwrap_or(petition))
    }

    async fn find_petition(&self, id: &ObjectId) -> Result<Option<PetitionDoc>> {
        self.petitions.find_one(doc! { "_id": id }).await
    }

    async fn find_petitions(&self, filter: &PetitionFilter, page: Option<Page>) -> Result<Vec<PetitionDoc>> {
        let (skip, limit) = match page {
            Some(page) => (Some(page.skip), Some(page.limit as i64)),
            None => (None, None),
        };
        self.petitions
            .find_many(filter.to_document(), Some(newest_first()), skip, limit)
            .await
    }

    async fn count_petitions(&self, filter: &PetitionFilter) -> Result<u64> {
        self.petitions.count(filter.to_document()).await
    }

    async fn count_petitions_by_status(&self, filter: &PetitionFilter) -> Result<Vec<(PetitionStatus, u64)>> {
        let pipeline = vec![
            doc! { "$match": filter.to_document() },
            doc! { "$group": { "_id": "$status", "count": { "$sum": 1 } } },
        ];

        let mut counts = Vec::new();
        for row in self.petitions.aggregate(pipeline).await? {
            let status = row
                .get_str("_id")
                .map_err(|e| CivicError::Database(format!("Malformed status group: {}", e)))?;
            match status.parse::<PetitionStatus>() {
                Ok(status) => counts.push((status, read_count(&row, "count"))),
                Err(_) => debug!(status, "Ignoring petitions with unknown status"),
            }
        }
        Ok(counts)
    }

    async fn update_petition_fields(
        &self,
        id: &ObjectId,
        creator: &str,
        edit: &PetitionEdit,
    ) -> Result<Option<PetitionDoc>> {
        self.petitions
            .find_one_and_update(
                doc! {
                    "_id": id,
                    "creator": creator,
                    "status": { "$ne": PetitionStatus::Closed.as_str() },
                },
                doc! { "$set": edit.to_set_document() },
            )
            .await
    }

    async fn transition_petition_status(
        &self,
        id: &ObjectId,
        from: PetitionStatus,
        to: PetitionStatus,
    ) -> Result<Option<PetitionDoc>> {
        self.petitions
            .find_one_and_update(
                doc! { "_id": id, "status": from.as_str() },
                doc! { "$set": { "status": to.as_str() } },
            )
            .await
    }

    async fn record_official_response(
        &self,
        id: &ObjectId,
        response: OfficialResponse,
        status: PetitionStatus,
    ) -> Result<Option<PetitionDoc>> {
        let response = bson::to_bson(&response)?;
        self.petitions
            .find_one_and_update(
                doc! { "_id": id, "status": { "$ne": PetitionStatus::Closed.as_str() } },
                doc! { "$set": { "official_response": response, "status": status.as_str() } },
            )
            .await
    }

    async fn increment_signature_count(&self, id: &ObjectId) -> Result<Option<i64>> {
        Ok(self
            .petitions
            .find_one_and_update(
                doc! { "_id": id, "status": PetitionStatus::Active.as_str() },
                doc! { "$inc": { "signature_count": 1_i64 } },
            )
            .await?
            .map(|p| p.signature_count))
    }

    async fn delete_petition(&self, id: &ObjectId) -> Result<bool> {
        self.petitions.delete_one(doc! { "_id": id }).await
    }

    async fn insert_signature(&self, signature: SignatureDoc) -> Result<Insert> {
        Ok(match self.signatures.insert_unique(signature).await? {
            Some(_) => Insert::Created,
            None => Insert::Duplicate,
        })
    }

    async fn has_signature(&self, petition: &ObjectId, user: &str) -> Result<bool> {
        Ok(self
            .signatures
            .find_one(doc! { "petition": petition, "user": user })
            .await?
            .is_some())
    }

    async fn count_signatures(&self, petition: &ObjectId) -> Result<u64> {
        self.signatures.count(doc! { "petition": petition }).await
    }

    async fn remove_signature(&self, petition: &ObjectId, user: &str) -> Result<()> {
        self.signatures
            .delete_one(doc! { "petition": petition, "user": user })
            .await?;
        Ok(())
    }

    async fn delete_signatures(&self, petition: &ObjectId) -> Result<u64> {
        self.signatures.delete_many(doc! { "petition": petition }).await
    }

    async fn count_signatures_in(&self, location_key: &str, window: &DateWindow) -> Result<u64> {
        let pipeline = jurisdiction_count_pipeline(PETITION_COLLECTION, "petition", location_key, window);
        let rows = self.signatures.aggregate(pipeline).await?;
        Ok(rows.first().map(|row| read_count(row, "total")).unwrap_or(0))
    }

    async fn insert_poll(&self, mut poll: PollDoc) -> Result<PollDoc> {
        let id = self.polls.insert_one(poll.clone()).await?;
        poll._id = Some(id);
        Ok(self.polls.find_one(doc! { "_id": id }).await?.unwrap_or(poll))
    }

    async fn find_poll(&self, id: &ObjectId) -> Result<Option<PollDoc>> {
        self.polls.find_one(doc! { "_id": id }).await
    }

    async fn find_polls(&self, filter: &PollFilter) -> Result<Vec<PollDoc>> {
        self.polls
            .find_many(filter.to_document(), Some(newest_first()), None, None)
            .await
    }

    async fn count_polls(&self, filter: &PollFilter) -> Result<u64> {
        self.polls.count(filter.to_document()).await
    }

    async fn close_poll(&self, id: &ObjectId) -> Result<Option<PollDoc>> {
        self.polls
            .find_one_and_update(
                doc! { "_id": id, "status": PollStatus::Active.as_str() },
                doc! { "$set": { "status": PollStatus::Closed.as_str() } },
            )
            .await
    }

    async fn insert_vote(&self, vote: VoteDoc) -> Result<Insert> {
        Ok(match self.votes.insert_unique(vote).await? {
            Some(_) => Insert::Created,
            None => Insert::Duplicate,
        })
    }

    async fn remove_vote(&self, poll: &ObjectId, user: &str) -> Result<()> {
        self.votes.delete_one(doc! { "poll": poll, "user": user }).await?;
        Ok(())
    }

    async fn apply_vote(&self, poll: &ObjectId, user: &str, option_index: usize) -> Result<Option<PollDoc>> {
        let option_path = format!("options.{}", option_index);
        let votes_path = format!("options.{}.votes", option_index);

        self.polls
            .find_one_and_update(
                doc! {
                    "_id": poll,
                    "status": PollStatus::Active.as_str(),
                    "voters": { "$ne": user },
                    option_path: { "$exists": true },
                },
                doc! {
                    "$push": { "voters": user },
                    "$inc": { votes_path: 1_i64 },
                },
            )
            .await
    }

    async fn count_votes_in(&self, location_key: &str, window: &DateWindow) -> Result<u64> {
        let pipeline = jurisdiction_count_pipeline(POLL_COLLECTION, "poll", location_key, window);
        let rows = self.votes.aggregate(pipeline).await?;
        Ok(rows.first().map(|row| read_count(row, "total")).unwrap_or(0))
    }

    async fn insert_issue(&self, mut issue: IssueDoc) -> Result<IssueDoc> {
        let id = self.issues.insert_one(issue.clone()).await?;
        issue._id = Some(id);
        Ok(self.issues.find_one(doc! { "_id": id }).await?.unwrap_or(issue))
    }

    async fn find_issues(&self) -> Result<Vec<IssueDoc>> {
        self.issues.find_many(doc! {}, Some(newest_first()), None, None).await
    }

    async fn append_admin_log(&self, entry: AdminLogDoc) -> Result<()> {
        self.admin_logs.insert_one(entry).await?;
        Ok(())
    }
}
