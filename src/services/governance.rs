//! Governance response engine
//!
//! An official in the petition's jurisdiction records a response and moves
//! the petition forward. The audit entry is appended afterwards; if that
//! append fails the response still stands.

use std::sync::Arc;

use bson::DateTime;
use tracing::{info, warn};

use crate::auth::guard::{self, DenyReason};
use crate::auth::{normalize_location, Principal};
use crate::db::schemas::{AdminLogDoc, OfficialResponse, PetitionDoc, PetitionStatus};
use crate::services::{optional_status, required_status, required_text};
use crate::store::{PetitionFilter, RecordStore};
use crate::types::{parse_record_id, CivicError, Result};

const ENTITY: &str = "Petition";

#[derive(Clone)]
pub struct GovernanceService {
    store: Arc<dyn RecordStore>,
}

impl GovernanceService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn respond(
        &self,
        principal: &Principal,
        id: &str,
        comment: &str,
        status: Option<&str>,
    ) -> Result<PetitionDoc> {
        let id = parse_record_id(ENTITY, id)?;
        let petition = self
            .store
            .find_petition(&id)
            .await?
            .ok_or_else(|| CivicError::not_found(ENTITY))?;
        guard::can_respond_to_petition(principal, &petition).into_result()?;

        let comment = required_text("comment", Some(comment))?;
        let status = required_status(status)?;
        if status == PetitionStatus::Active {
            return Err(CivicError::state("Officials cannot set a petition back to active"));
        }

        let response = OfficialResponse {
            comment,
            responded_by: principal.id.clone(),
            responded_at: DateTime::now(),
        };
        let updated = match self
            .store
            .record_official_response(&id, response, status)
            .await?
        {
            Some(updated) => updated,
            None => {
                return match self.store.find_petition(&id).await? {
                    None => Err(CivicError::not_found(ENTITY)),
                    Some(_) => Err(DenyReason::PetitionClosed.into()),
                }
            }
        };

        info!(
            petition_id = %id,
            official = %principal.id,
            status = %status,
            "Official response recorded"
        );

        let entry = AdminLogDoc::new(
            format!("Official responded to petition (status: {status})"),
            principal.id.clone(),
            Some(id),
        )
        .with_status(status);
        if let Err(e) = self.store.append_admin_log(entry).await {
            warn!(petition_id = %id, error = %e, "Failed to append admin log entry");
        }

        Ok(updated)
    }

    /// Every petition in the official's jurisdiction, newest first
    pub async fn jurisdiction_petitions(
        &self,
        principal: &Principal,
        status: Option<&str>,
    ) -> Result<Vec<PetitionDoc>> {
        guard::can_view_jurisdiction(principal).into_result()?;
        let status = optional_status(status)?;

        let location_key = normalize_location(&principal.location);
        if location_key.is_empty() {
            return Err(CivicError::LocationRequired);
        }

        let filter = PetitionFilter {
            status,
            ..PetitionFilter::for_location(location_key)
        };
        self.store.find_petitions(&filter, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{NewPetition, PageLimits, PetitionService};
    use crate::store::{FailPoint, MemoryStore};
    use crate::types::ErrorKind;

    struct Fixture {
        store: Arc<MemoryStore>,
        petitions: PetitionService,
        governance: GovernanceService,
    }

    fn setup() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        Fixture {
            petitions: PetitionService::new(store.clone(), PageLimits::default()),
            governance: GovernanceService::new(store.clone()),
            store,
        }
    }

    async fn petition_in(fx: &Fixture, location: &str) -> String {
        fx.petitions
            .create(
                &Principal::citizen("c1", location),
                NewPetition {
                    title: Some("Fix Road".into()),
                    description: Some("Potholes".into()),
                    category: Some("Infrastructure".into()),
                    location: Some(location.into()),
                    goal: None,
                },
            )
            .await
            .unwrap()
            .id_hex()
    }

    #[tokio::test]
    async fn test_respond_is_case_insensitive_on_location() {
        let fx = setup();
        let id = petition_in(&fx, "springfield").await;
        let official = Principal::official("o1", "Springfield");

        let p = fx
            .governance
            .respond(&official, &id, "Looking into it", Some("under_review"))
            .await
            .unwrap();
        assert_eq!(p.status, PetitionStatus::UnderReview);
        let response = p.official_response.unwrap();
        assert_eq!(response.comment, "Looking into it");
        assert_eq!(response.responded_by, "o1");

        let logs = fx.store.admin_logs().await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].user, "o1");
        assert_eq!(logs[0].status, Some(PetitionStatus::UnderReview));
        assert_eq!(logs[0].petition.map(|p| p.to_hex()), Some(id));
    }

    #[tokio::test]
    async fn test_respond_outside_jurisdiction() {
        let fx = setup();
        let id = petition_in(&fx, "Shelbyville").await;

        let err = fx
            .governance
            .respond(&Principal::official("o1", "Springfield"), &id, "No", Some("closed"))
            .await
            .unwrap_err();
        assert!(matches!(err, CivicError::Forbidden(DenyReason::WrongLocation)));
        assert!(fx.store.admin_logs().await.is_empty());
    }

    #[tokio::test]
    async fn test_respond_validation() {
        let fx = setup();
        let id = petition_in(&fx, "Austin").await;
        let o1 = Principal::official("o1", "Austin");

        let err = fx
            .governance
            .respond(&o1, &id, "   ", Some("closed"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = fx
            .governance
            .respond(&o1, &id, "Reopening", Some("active"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateError);

        fx.governance
            .respond(&o1, &id, "Done", Some("closed"))
            .await
            .unwrap();
        let err = fx
            .governance
            .respond(&o1, &id, "Again", Some("closed"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateError);
    }

    #[tokio::test]
    async fn test_admin_log_failure_is_not_fatal() {
        let fx = setup();
        let id = petition_in(&fx, "Austin").await;
        fx.store.fail(FailPoint::AdminLog);

        let p = fx
            .governance
            .respond(&Principal::official("o1", "Austin"), &id, "Noted", Some("closed"))
            .await
            .unwrap();
        assert_eq!(p.status, PetitionStatus::Closed);
        assert!(fx.store.admin_logs().await.is_empty());
    }

    #[tokio::test]
    async fn test_jurisdiction_petitions() {
        let fx = setup();
        let first = petition_in(&fx, "Austin").await;
        petition_in(&fx, " austin").await;
        petition_in(&fx, "North Austin").await;
        let o1 = Principal::official("o1", "AUSTIN");

        let all = fx.governance.jurisdiction_petitions(&o1, None).await.unwrap();
        assert_eq!(all.len(), 2);

        fx.governance
            .respond(&o1, &first, "Reviewing", Some("under_review"))
            .await
            .unwrap();
        let reviewing = fx
            .governance
            .jurisdiction_petitions(&o1, Some("under_review"))
            .await
            .unwrap();
        assert_eq!(reviewing.len(), 1);
        assert_eq!(reviewing[0].id_hex(), first);

        let err = fx
            .governance
            .jurisdiction_petitions(&Principal::citizen("c1", "Austin"), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = fx
            .governance
            .jurisdiction_petitions(&Principal::official("o2", "  "), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CivicError::LocationRequired));
    }
}
