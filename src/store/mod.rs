//! Record store seam
//!
//! The engines reach the document store only through [`RecordStore`].
//! Every method is a single store-side operation; preconditions that must
//! hold at write time (owner, status, not-yet-voted) are part of the
//! operation's filter rather than a separate read, so concurrent callers
//! can't slip between check and write.
//!
//! Implementations:
//! - [`MongoStore`] for production
//! - [`MemoryStore`] for dev mode and tests

pub mod memory;
pub mod mongo;
pub mod query;

pub use memory::{FailPoint, MemoryStore};
pub use mongo::MongoStore;
pub use query::{DateWindow, Page, PetitionEdit, PetitionFilter, PollFilter};

use bson::oid::ObjectId;

use crate::db::schemas::{
    AdminLogDoc, IssueDoc, OfficialResponse, PetitionDoc, PetitionStatus, PollDoc, SignatureDoc, VoteDoc,
};
use crate::types::Result;

/// Outcome of an insert guarded by a uniqueness constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insert {
    Created,
    Duplicate,
}

#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    // -- petitions --------------------------------------------------------

    /// Insert a petition and return it with its assigned id
    async fn insert_petition(&self, petition: PetitionDoc) -> Result<PetitionDoc>;
    async fn find_petition(&self, id: &ObjectId) -> Result<Option<PetitionDoc>>;
    /// Newest first
    async fn find_petitions(&self, filter: &PetitionFilter, page: Option<Page>) -> Result<Vec<PetitionDoc>>;
    async fn count_petitions(&self, filter: &PetitionFilter) -> Result<u64>;
    /// Group matching petitions by status; statuses with no petitions may be omitted
    async fn count_petitions_by_status(&self, filter: &PetitionFilter) -> Result<Vec<(PetitionStatus, u64)>>;
    /// Apply an owner edit if `creator` still owns the petition and it is not closed
    async fn update_petition_fields(
        &self,
        id: &ObjectId,
        creator: &str,
        edit: &PetitionEdit,
    ) -> Result<Option<PetitionDoc>>;
    /// Compare-and-set the status
    async fn transition_petition_status(
        &self,
        id: &ObjectId,
        from: PetitionStatus,
        to: PetitionStatus,
    ) -> Result<Option<PetitionDoc>>;
    /// Set the official response and status if the petition is not closed
    async fn record_official_response(
        &self,
        id: &ObjectId,
        response: OfficialResponse,
        status: PetitionStatus,
    ) -> Result<Option<PetitionDoc>>;
    /// Atomic `+1` on `signature_count` of an active petition; returns the
    /// new value, or `None` if the petition is gone or no longer active
    async fn increment_signature_count(&self, id: &ObjectId) -> Result<Option<i64>>;
    async fn delete_petition(&self, id: &ObjectId) -> Result<bool>;

    // -- signatures -------------------------------------------------------

    async fn insert_signature(&self, signature: SignatureDoc) -> Result<Insert>;
    async fn has_signature(&self, petition: &ObjectId, user: &str) -> Result<bool>;
    async fn count_signatures(&self, petition: &ObjectId) -> Result<u64>;
    async fn remove_signature(&self, petition: &ObjectId, user: &str) -> Result<()>;
    async fn delete_signatures(&self, petition: &ObjectId) -> Result<u64>;
    /// Signatures on petitions in a jurisdiction, created inside `window`
    async fn count_signatures_in(&self, location_key: &str, window: &DateWindow) -> Result<u64>;

    // -- polls ------------------------------------------------------------

    async fn insert_poll(&self, poll: PollDoc) -> Result<PollDoc>;
    async fn find_poll(&self, id: &ObjectId) -> Result<Option<PollDoc>>;
    /// Newest first
    async fn find_polls(&self, filter: &PollFilter) -> Result<Vec<PollDoc>>;
    async fn count_polls(&self, filter: &PollFilter) -> Result<u64>;
    /// `active -> closed`; `None` if the poll is missing or already closed
    async fn close_poll(&self, id: &ObjectId) -> Result<Option<PollDoc>>;

    // -- votes ------------------------------------------------------------

    async fn insert_vote(&self, vote: VoteDoc) -> Result<Insert>;
    async fn remove_vote(&self, poll: &ObjectId, user: &str) -> Result<()>;
    /// Add `user` to `voters` and `+1` the option, together, only if the poll
    /// is active, the user has not voted, and the option exists
    async fn apply_vote(&self, poll: &ObjectId, user: &str, option_index: usize) -> Result<Option<PollDoc>>;
    /// Votes on polls targeting a jurisdiction, created inside `window`
    async fn count_votes_in(&self, location_key: &str, window: &DateWindow) -> Result<u64>;

    // -- issues -----------------------------------------------------------

    async fn insert_issue(&self, issue: IssueDoc) -> Result<IssueDoc>;
    /// Newest first
    async fn find_issues(&self) -> Result<Vec<IssueDoc>>;

    // -- audit ------------------------------------------------------------

    async fn append_admin_log(&self, entry: AdminLogDoc) -> Result<()>;
}
