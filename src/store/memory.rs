//! In-process record store on `DashMap`
//!
//! Used in dev mode and by the test suites. Uniqueness goes through the
//! map's entry API and every guarded update happens under the shard write
//! lock of a single `get_mut`, giving the same at-most-once guarantees as
//! the MongoDB filters.

use std::cmp::Reverse;

use bson::{oid::ObjectId, DateTime};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use tokio::sync::Mutex;

use super::{DateWindow, Insert, Page, PetitionEdit, PetitionFilter, PollFilter, RecordStore};
use crate::db::schemas::{
    AdminLogDoc, IssueDoc, OfficialResponse, PetitionDoc, PetitionStatus, PollDoc, PollStatus,
    SignatureDoc, VoteDoc,
};
use crate::types::{CivicError, Result};

type Membership = (ObjectId, String);

/// Store operations that can be made to fail on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    AdminLog,
    SignatureCount,
    ApplyVote,
}

#[derive(Default)]
pub struct MemoryStore {
    petitions: DashMap<ObjectId, PetitionDoc>,
    signatures: DashMap<Membership, SignatureDoc>,
    polls: DashMap<ObjectId, PollDoc>,
    votes: DashMap<Membership, VoteDoc>,
    issues: DashMap<ObjectId, IssueDoc>,
    admin_logs: Mutex<Vec<AdminLogDoc>>,
    fail_points: DashSet<FailPoint>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the audit log in append order
    pub async fn admin_logs(&self) -> Vec<AdminLogDoc> {
        self.admin_logs.lock().await.clone()
    }

    /// Signature rows currently held for a petition
    pub fn signature_rows(&self, petition: &ObjectId) -> usize {
        self.signatures.iter().filter(|s| &s.petition == petition).count()
    }

    /// Vote rows currently held for a poll
    pub fn vote_rows(&self, poll: &ObjectId) -> usize {
        self.votes.iter().filter(|v| &v.poll == poll).count()
    }

    /// Make every subsequent call of `point` fail with a database error
    pub fn fail(&self, point: FailPoint) {
        self.fail_points.insert(point);
    }

    pub fn heal(&self, point: FailPoint) {
        self.fail_points.remove(&point);
    }

    fn check(&self, point: FailPoint) -> Result<()> {
        if self.fail_points.contains(&point) {
            return Err(CivicError::Database(format!("{point:?} unavailable")));
        }
        Ok(())
    }
}

fn stamp_new(metadata: &mut crate::db::schemas::Metadata) {
    let now = DateTime::now();
    metadata.created_at = Some(now);
    metadata.updated_at = Some(now);
}

fn touch(metadata: &mut crate::db::schemas::Metadata) {
    metadata.updated_at = Some(DateTime::now());
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (Option<DateTime>, Option<ObjectId>)) {
    items.sort_by_key(|item| Reverse(key(item)));
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    async fn insert_petition(&self, mut petition: PetitionDoc) -> Result<PetitionDoc> {
        let id = petition._id.unwrap_or_else(ObjectId::new);
        petition._id = Some(id);
        stamp_new(&mut petition.metadata);
        self.petitions.insert(id, petition.clone());
        Ok(petition)
    }

    async fn find_petition(&self, id: &ObjectId) -> Result<Option<PetitionDoc>> {
        Ok(self.petitions.get(id).map(|p| p.value().clone()))
    }

    async fn find_petitions(&self, filter: &PetitionFilter, page: Option<Page>) -> Result<Vec<PetitionDoc>> {
        let mut found: Vec<PetitionDoc> = self
            .petitions
            .iter()
            .filter(|p| filter.matches(p.value()))
            .map(|p| p.value().clone())
            .collect();
        newest_first(&mut found, |p| (p.metadata.created_at, p._id));

        Ok(match page {
            Some(page) => found
                .into_iter()
                .skip(page.skip as usize)
                .take(page.limit as usize)
                .collect(),
            None => found,
        })
    }

    async fn count_petitions(&self, filter: &PetitionFilter) -> Result<u64> {
        Ok(self.petitions.iter().filter(|p| filter.matches(p.value())).count() as u64)
    }

    async fn count_petitions_by_status(&self, filter: &PetitionFilter) -> Result<Vec<(PetitionStatus, u64)>> {
        let mut counts = Vec::with_capacity(PetitionStatus::ALL.len());
        for status in PetitionStatus::ALL {
            let n = self
                .petitions
                .iter()
                .filter(|p| p.status == status && filter.matches(p.value()))
                .count() as u64;
            counts.push((status, n));
        }
        Ok(counts)
    }

    async fn update_petition_fields(
        &self,
        id: &ObjectId,
        creator: &str,
        edit: &PetitionEdit,
    ) -> Result<Option<PetitionDoc>> {
        let Some(mut petition) = self.petitions.get_mut(id) else {
            return Ok(None);
        };
        if petition.creator != creator || petition.status == PetitionStatus::Closed {
            return Ok(None);
        }
        edit.apply(&mut petition);
        touch(&mut petition.metadata);
        Ok(Some(petition.clone()))
    }

    async fn transition_petition_status(
        &self,
        id: &ObjectId,
        from: PetitionStatus,
        to: PetitionStatus,
    ) -> Result<Option<PetitionDoc>> {
        let Some(mut petition) = self.petitions.get_mut(id) else {
            return Ok(None);
        };
        if petition.status != from {
            return Ok(None);
        }
        petition.status = to;
        touch(&mut petition.metadata);
        Ok(Some(petition.clone()))
    }

    async fn record_official_response(
        &self,
        id: &ObjectId,
        response: OfficialResponse,
        status: PetitionStatus,
    ) -> Result<Option<PetitionDoc>> {
        let Some(mut petition) = self.petitions.get_mut(id) else {
            return Ok(None);
        };
        if petition.status == PetitionStatus::Closed {
            return Ok(None);
        }
        petition.official_response = Some(response);
        petition.status = status;
        touch(&mut petition.metadata);
        Ok(Some(petition.clone()))
    }

    async fn increment_signature_count(&self, id: &ObjectId) -> Result<Option<i64>> {
        self.check(FailPoint::SignatureCount)?;
        let Some(mut petition) = self.petitions.get_mut(id) else {
            return Ok(None);
        };
        if petition.status != PetitionStatus::Active {
            return Ok(None);
        }
        petition.signature_count += 1;
        touch(&mut petition.metadata);
        Ok(Some(petition.signature_count))
    }

    async fn delete_petition(&self, id: &ObjectId) -> Result<bool> {
        Ok(self.petitions.remove(id).is_some())
    }

    async fn insert_signature(&self, mut signature: SignatureDoc) -> Result<Insert> {
        match self.signatures.entry((signature.petition, signature.user.clone())) {
            Entry::Occupied(_) => Ok(Insert::Duplicate),
            Entry::Vacant(slot) => {
                signature._id = Some(ObjectId::new());
                stamp_new(&mut signature.metadata);
                slot.insert(signature);
                Ok(Insert::Created)
            }
        }
    }

    async fn has_signature(&self, petition: &ObjectId, user: &str) -> Result<bool> {
        Ok(self.signatures.contains_key(&(*petition, user.to_string())))
    }

    async fn count_signatures(&self, petition: &ObjectId) -> Result<u64> {
        Ok(self.signature_rows(petition) as u64)
    }

    async fn remove_signature(&self, petition: &ObjectId, user: &str) -> Result<()> {
        self.signatures.remove(&(*petition, user.to_string()));
        Ok(())
    }

    async fn delete_signatures(&self, petition: &ObjectId) -> Result<u64> {
        let before = self.signatures.len();
        self.signatures.retain(|(p, _), _| p != petition);
        Ok((before - self.signatures.len()) as u64)
    }

    async fn count_signatures_in(&self, location_key: &str, window: &DateWindow) -> Result<u64> {
        let in_jurisdiction: Vec<ObjectId> = self
            .petitions
            .iter()
            .filter(|p| p.location_key == location_key)
            .map(|p| *p.key())
            .collect();

        Ok(self
            .signatures
            .iter()
            .filter(|s| in_jurisdiction.contains(&s.petition) && window.contains(s.metadata.created_at))
            .count() as u64)
    }

    async fn insert_poll(&self, mut poll: PollDoc) -> Result<PollDoc> {
        let id = poll._id.unwrap_or_else(ObjectId::new);
        poll._id = Some(id);
        stamp_new(&mut poll.metadata);
        self.polls.insert(id, poll.clone());
        Ok(poll)
    }

    async fn find_poll(&self, id: &ObjectId) -> Result<Option<PollDoc>> {
        Ok(self.polls.get(id).map(|p| p.value().clone()))
    }

    async fn find_polls(&self, filter: &PollFilter) -> Result<Vec<PollDoc>> {
        let mut found: Vec<PollDoc> = self
            .polls
            .iter()
            .filter(|p| filter.matches(p.value()))
            .map(|p| p.value().clone())
            .collect();
        newest_first(&mut found, |p| (p.metadata.created_at, p._id));
        Ok(found)
    }

    async fn count_polls(&self, filter: &PollFilter) -> Result<u64> {
        Ok(self.polls.iter().filter(|p| filter.matches(p.value())).count() as u64)
    }

    async fn close_poll(&self, id: &ObjectId) -> Result<Option<PollDoc>> {
        let Some(mut poll) = self.polls.get_mut(id) else {
            return Ok(None);
        };
        if poll.status != PollStatus::Active {
            return Ok(None);
        }
        poll.status = PollStatus::Closed;
        touch(&mut poll.metadata);
        Ok(Some(poll.clone()))
    }

    async fn insert_vote(&self, mut vote: VoteDoc) -> Result<Insert> {
        match self.votes.entry((vote.poll, vote.user.clone())) {
            Entry::Occupied(_) => Ok(Insert::Duplicate),
            Entry::Vacant(slot) => {
                vote._id = Some(ObjectId::new());
                stamp_new(&mut vote.metadata);
                slot.insert(vote);
                Ok(Insert::Created)
            }
        }
    }

    async fn remove_vote(&self, poll: &ObjectId, user: &str) -> Result<()> {
        self.votes.remove(&(*poll, user.to_string()));
        Ok(())
    }

    async fn apply_vote(&self, poll: &ObjectId, user: &str, option_index: usize) -> Result<Option<PollDoc>> {
        self.check(FailPoint::ApplyVote)?;
        let Some(mut doc) = self.polls.get_mut(poll) else {
            return Ok(None);
        };
        if doc.status != PollStatus::Active || doc.has_voted(user) || option_index >= doc.options.len() {
            return Ok(None);
        }
        doc.voters.push(user.to_string());
        doc.options[option_index].votes += 1;
        touch(&mut doc.metadata);
        Ok(Some(doc.clone()))
    }

    async fn count_votes_in(&self, location_key: &str, window: &DateWindow) -> Result<u64> {
        let in_jurisdiction: Vec<ObjectId> = self
            .polls
            .iter()
            .filter(|p| p.location_key == location_key)
            .map(|p| *p.key())
            .collect();

        Ok(self
            .votes
            .iter()
            .filter(|v| in_jurisdiction.contains(&v.poll) && window.contains(v.metadata.created_at))
            .count() as u64)
    }

    async fn insert_issue(&self, mut issue: IssueDoc) -> Result<IssueDoc> {
        let id = issue._id.unwrap_or_else(ObjectId::new);
        issue._id = Some(id);
        stamp_new(&mut issue.metadata);
        self.issues.insert(id, issue.clone());
        Ok(issue)
    }

    async fn find_issues(&self) -> Result<Vec<IssueDoc>> {
        let mut found: Vec<IssueDoc> = self.issues.iter().map(|i| i.value().clone()).collect();
        newest_first(&mut found, |i| (i.metadata.created_at, i._id));
        Ok(found)
    }

    async fn append_admin_log(&self, mut entry: AdminLogDoc) -> Result<()> {
        self.check(FailPoint::AdminLog)?;
        entry._id = Some(ObjectId::new());
        stamp_new(&mut entry.metadata);
        self.admin_logs.lock().await.push(entry);
        Ok(())
    }
}
