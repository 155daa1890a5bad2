//! Petition lifecycle engine
//!
//! `active -> under_review -> closed` or `active -> closed`; nothing leaves
//! `closed`. Signing is at-most-once per citizen: the unique signature row
//! is written first and the counter is only incremented after it lands.

use std::sync::Arc;

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::guard::{self, DenyReason, OwnerAction};
use crate::auth::{normalize_location, Principal};
use crate::db::schemas::{PetitionDoc, PetitionStatus, SignatureDoc, DEFAULT_PETITION_GOAL};
use crate::services::{optional_status, optional_text, required_status, required_text};
use crate::store::{Insert, Page, PetitionEdit, PetitionFilter, RecordStore};
use crate::types::{parse_record_id, CivicError, ConflictKind, Result};

const ENTITY: &str = "Petition";

/// Listing page sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default: u64,
    pub max: u64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self { default: 10, max: 100 }
    }
}

/// Fields for a new petition, as submitted
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewPetition {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub goal: Option<i64>,
}

/// Owner edit, as submitted; absent fields are left alone
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PetitionUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub goal: Option<i64>,
}

impl PetitionUpdate {
    fn validate(&self) -> Result<PetitionEdit> {
        fn non_empty(field: &str, value: &Option<String>) -> Result<Option<String>> {
            match value {
                None => Ok(None),
                Some(v) if v.trim().is_empty() => {
                    Err(CivicError::invalid(format!("{field} cannot be empty")))
                }
                Some(v) => Ok(Some(v.trim().to_string())),
            }
        }

        if let Some(goal) = self.goal {
            if goal <= 0 {
                return Err(CivicError::invalid("goal must be a positive number"));
            }
        }

        let edit = PetitionEdit {
            title: non_empty("title", &self.title)?,
            description: non_empty("description", &self.description)?,
            category: non_empty("category", &self.category)?,
            location: non_empty("location", &self.location)?,
            goal: self.goal,
        };
        if edit.is_empty() {
            return Err(CivicError::invalid("No fields to update"));
        }
        Ok(edit)
    }
}

/// Listing query
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PetitionQuery {
    pub category: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// One page of a petition listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PetitionPage<T> {
    pub petitions: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> PetitionPage<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PetitionPage<U> {
        PetitionPage {
            petitions: self.petitions.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
            total_pages: self.total_pages,
        }
    }
}

#[derive(Clone)]
pub struct PetitionService {
    store: Arc<dyn RecordStore>,
    limits: PageLimits,
}

impl PetitionService {
    pub fn new(store: Arc<dyn RecordStore>, limits: PageLimits) -> Self {
        Self { store, limits }
    }

    async fn load(&self, id: &ObjectId) -> Result<PetitionDoc> {
        self.store
            .find_petition(id)
            .await?
            .ok_or_else(|| CivicError::not_found(ENTITY))
    }

    pub async fn create(&self, principal: &Principal, fields: NewPetition) -> Result<PetitionDoc> {
        guard::can_create_petition(principal).into_result()?;

        let title = required_text("title", fields.title.as_deref())?;
        let description = required_text("description", fields.description.as_deref())?;
        let category = required_text("category", fields.category.as_deref())?;
        let location = required_text("location", fields.location.as_deref())?;
        let goal = match fields.goal {
            Some(goal) if goal > 0 => goal,
            _ => DEFAULT_PETITION_GOAL,
        };

        let petition = self
            .store
            .insert_petition(PetitionDoc::new(
                title,
                description,
                category,
                location,
                goal,
                principal.id.clone(),
            ))
            .await?;

        info!(
            petition_id = %petition.id_hex(),
            creator = %principal.id,
            location = %petition.location_key,
            "Petition created"
        );
        Ok(petition)
    }

    pub async fn get(&self, id: &str) -> Result<PetitionDoc> {
        let id = parse_record_id(ENTITY, id)?;
        self.load(&id).await
    }

    pub async fn list(&self, query: &PetitionQuery) -> Result<PetitionPage<PetitionDoc>> {
        let status = optional_status(query.status.as_deref())?;
        let filter = PetitionFilter {
            location_key: optional_text(query.location.as_deref()).map(|l| normalize_location(&l)),
            category: optional_text(query.category.as_deref()),
            status,
            ..PetitionFilter::default()
        };

        let page = query.page.filter(|p| *p > 0).unwrap_or(1);
        let limit = query
            .limit
            .filter(|l| *l > 0)
            .unwrap_or(self.limits.default)
            .min(self.limits.max);

        let total = self.store.count_petitions(&filter).await?;
        let petitions = self
            .store
            .find_petitions(
                &filter,
                Some(Page {
                    skip: (page - 1).saturating_mul(limit),
                    limit,
                }),
            )
            .await?;

        Ok(PetitionPage {
            petitions,
            total,
            page,
            limit,
            total_pages: total.div_ceil(limit),
        })
    }

    /// Sign a petition; returns the new signature count
    pub async fn sign(&self, principal: &Principal, id: &str) -> Result<u64> {
        let id = parse_record_id(ENTITY, id)?;
        let petition = self.load(&id).await?;
        let already_signed = self.store.has_signature(&id, &principal.id).await?;

        if let Err(reason) = guard::can_sign_petition(principal, &petition, already_signed).into_result() {
            debug!(petition_id = %id, user = %principal.id, %reason, "Sign denied");
            return Err(reason.into());
        }

        match self
            .store
            .insert_signature(SignatureDoc::new(id, principal.id.clone()))
            .await?
        {
            Insert::Created => {}
            Insert::Duplicate => {
                debug!(petition_id = %id, user = %principal.id, "Concurrent duplicate signature");
                return Err(CivicError::Conflict(ConflictKind::AlreadySigned));
            }
        }

        let count = match self.store.increment_signature_count(&id).await {
            Ok(Some(count)) => count,
            Ok(None) => {
                // Deleted or moved out of active after the guard ran
                self.store.remove_signature(&id, &principal.id).await?;
                return match self.store.find_petition(&id).await? {
                    None => Err(CivicError::not_found(ENTITY)),
                    Some(_) => Err(DenyReason::NotActive.into()),
                };
            }
            Err(err) => {
                if let Err(undo) = self.store.remove_signature(&id, &principal.id).await {
                    warn!(petition_id = %id, user = %principal.id, error = %undo, "Failed to roll back signature");
                }
                return Err(err);
            }
        };

        info!(petition_id = %id, user = %principal.id, signature_count = count, "Petition signed");
        Ok(count.max(0) as u64)
    }

    pub async fn edit(&self, principal: &Principal, id: &str, fields: PetitionUpdate) -> Result<PetitionDoc> {
        let id = parse_record_id(ENTITY, id)?;
        let petition = self.load(&id).await?;
        guard::can_edit_or_delete_petition(principal, &petition, OwnerAction::Edit).into_result()?;

        let edit = fields.validate()?;

        match self
            .store
            .update_petition_fields(&id, &principal.id, &edit)
            .await?
        {
            Some(updated) => {
                info!(petition_id = %id, "Petition updated");
                Ok(updated)
            }
            None => match self.store.find_petition(&id).await? {
                None => Err(CivicError::not_found(ENTITY)),
                Some(_) => Err(DenyReason::PetitionClosed.into()),
            },
        }
    }

    /// Delete a petition and every signature on it
    pub async fn delete(&self, principal: &Principal, id: &str) -> Result<()> {
        let id = parse_record_id(ENTITY, id)?;
        let petition = self.load(&id).await?;
        guard::can_edit_or_delete_petition(principal, &petition, OwnerAction::Delete).into_result()?;

        if petition.status == PetitionStatus::Closed {
            return Err(DenyReason::PetitionClosed.into());
        }

        // Signatures first so a failed petition delete can't orphan them
        let mut removed = self.store.delete_signatures(&id).await?;
        if !self.store.delete_petition(&id).await? {
            return Err(CivicError::not_found(ENTITY));
        }
        // A sign that landed between the cascade and the delete
        removed += self.store.delete_signatures(&id).await?;

        info!(petition_id = %id, signatures_removed = removed, "Petition deleted");
        Ok(())
    }

    /// `status` is the requested target as submitted
    pub async fn change_status(
        &self,
        principal: &Principal,
        id: &str,
        status: Option<&str>,
    ) -> Result<PetitionDoc> {
        let id = parse_record_id(ENTITY, id)?;
        let petition = self.load(&id).await?;
        guard::can_change_petition_status(principal, &petition).into_result()?;

        let status = required_status(status)?;

        if status == PetitionStatus::Active {
            return Err(CivicError::state("Petitions cannot be returned to active"));
        }
        if !petition.status.can_transition_to(status) {
            return Err(CivicError::state(format!(
                "Cannot change status from {} to {}",
                petition.status, status
            )));
        }

        match self
            .store
            .transition_petition_status(&id, petition.status, status)
            .await?
        {
            Some(updated) => {
                info!(
                    petition_id = %id,
                    official = %principal.id,
                    from = %petition.status,
                    to = %status,
                    "Petition status changed"
                );
                Ok(updated)
            }
            None => match self.store.find_petition(&id).await? {
                None => Err(CivicError::not_found(ENTITY)),
                Some(current) => Err(CivicError::state(format!(
                    "Cannot change status from {} to {}",
                    current.status, status
                ))),
            },
        }
    }
}
