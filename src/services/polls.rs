//! Poll lifecycle engine
//!
//! A vote lands in two places: a `(poll, user)` row whose unique index is
//! the serialization point, then a guarded update on the poll that adds the
//! voter and bumps the option together. If the guarded update does not
//! apply, the row is removed again so the two never disagree.

use std::sync::Arc;

use bson::oid::ObjectId;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::auth::guard::{self, DenyReason};
use crate::auth::{normalize_location, Principal};
use crate::db::schemas::{PollDoc, PollOption, PollStatus, VoteDoc};
use crate::services::{optional_text, required_text};
use crate::store::{Insert, PollFilter, RecordStore};
use crate::types::{parse_record_id, CivicError, ConflictKind, Result};

const ENTITY: &str = "Poll";

/// Minimum number of non-blank options
pub const MIN_POLL_OPTIONS: usize = 2;

/// Fields for a new poll, as submitted
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewPoll {
    pub title: Option<String>,
    pub description: Option<String>,
    pub target_location: Option<String>,
    pub options: Vec<String>,
}

#[derive(Clone)]
pub struct PollService {
    store: Arc<dyn RecordStore>,
}

impl PollService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    async fn load(&self, id: &ObjectId) -> Result<PollDoc> {
        self.store
            .find_poll(id)
            .await?
            .ok_or_else(|| CivicError::not_found(ENTITY))
    }

    pub async fn create(&self, principal: &Principal, fields: NewPoll) -> Result<PollDoc> {
        guard::can_create_poll(principal).into_result()?;

        let title = required_text("title", fields.title.as_deref())?;
        let target_location = required_text("targetLocation", fields.target_location.as_deref())?;
        let options: Vec<PollOption> = fields
            .options
            .iter()
            .filter_map(|text| optional_text(Some(text.as_str())))
            .map(PollOption::new)
            .collect();
        if options.len() < MIN_POLL_OPTIONS {
            return Err(CivicError::invalid(format!(
                "At least {MIN_POLL_OPTIONS} non-empty options are required"
            )));
        }

        let poll = self
            .store
            .insert_poll(PollDoc::new(
                title,
                optional_text(fields.description.as_deref()),
                target_location,
                options,
                principal.id.clone(),
            ))
            .await?;

        info!(
            poll_id = %poll.id_hex(),
            created_by = %principal.id,
            location = %poll.location_key,
            options = poll.options.len(),
            "Poll created"
        );
        Ok(poll)
    }

    pub async fn get(&self, id: &str) -> Result<PollDoc> {
        let id = parse_record_id(ENTITY, id)?;
        self.load(&id).await
    }

    /// Newest first, optionally scoped to a target location
    pub async fn list(&self, location: Option<&str>) -> Result<Vec<PollDoc>> {
        let filter = PollFilter {
            location_key: optional_text(location).map(|l| normalize_location(&l)),
            ..PollFilter::default()
        };
        self.store.find_polls(&filter).await
    }

    /// Cast a vote.
    ///
    /// `option_index` is `None` when the caller supplied something that is
    /// not an integer; like an out-of-range index that is only reported
    /// once the principal has been authorized.
    pub async fn vote(&self, principal: &Principal, id: &str, option_index: Option<i64>) -> Result<PollDoc> {
        let id = parse_record_id(ENTITY, id)?;
        let poll = self.load(&id).await?;

        if let Err(reason) = guard::can_vote_poll(principal, &poll).into_result() {
            debug!(poll_id = %id, user = %principal.id, %reason, "Vote denied");
            return Err(reason.into());
        }

        let index = option_index
            .and_then(|i| usize::try_from(i).ok())
            .filter(|i| *i < poll.options.len())
            .ok_or_else(|| CivicError::invalid("Invalid option index"))?;

        match self
            .store
            .insert_vote(VoteDoc::new(id, principal.id.clone(), index as i64))
            .await?
        {
            Insert::Created => {}
            Insert::Duplicate => {
                debug!(poll_id = %id, user = %principal.id, "Concurrent duplicate vote");
                return Err(CivicError::Conflict(ConflictKind::AlreadyVoted));
            }
        }

        match self.store.apply_vote(&id, &principal.id, index).await {
            Ok(Some(updated)) => {
                info!(poll_id = %id, user = %principal.id, option = index, "Vote recorded");
                return Ok(updated);
            }
            Ok(None) => {}
            Err(err) => {
                if let Err(undo) = self.store.remove_vote(&id, &principal.id).await {
                    warn!(poll_id = %id, user = %principal.id, error = %undo, "Failed to roll back vote row");
                }
                return Err(err);
            }
        }

        // Guarded update refused: undo the row, then report why
        self.store.remove_vote(&id, &principal.id).await?;
        match self.store.find_poll(&id).await? {
            None => Err(CivicError::not_found(ENTITY)),
            Some(current) if current.status != PollStatus::Active => Err(DenyReason::NotActive.into()),
            Some(current) if current.has_voted(&principal.id) => {
                Err(CivicError::Conflict(ConflictKind::AlreadyVoted))
            }
            Some(_) => {
                warn!(poll_id = %id, user = %principal.id, "Vote update did not apply");
                Err(CivicError::Internal("vote could not be applied".into()))
            }
        }
    }

    /// The creating official closes an active poll
    pub async fn close(&self, principal: &Principal, id: &str) -> Result<PollDoc> {
        let id = parse_record_id(ENTITY, id)?;
        let poll = self.load(&id).await?;
        guard::can_close_poll(principal, &poll).into_result()?;

        match self.store.close_poll(&id).await? {
            Some(closed) => {
                info!(poll_id = %id, official = %principal.id, votes = closed.total_votes(), "Poll closed");
                Ok(closed)
            }
            None => match self.store.find_poll(&id).await? {
                None => Err(CivicError::not_found(ENTITY)),
                Some(_) => Err(DenyReason::NotActive.into()),
            },
        }
    }
}
