//! Reporting aggregator
//!
//! Read-only, recomputed on every call. Petitions and polls are matched on
//! their normalized location key; signatures and votes are joined to their
//! parent to find the jurisdiction.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::auth::guard;
use crate::auth::{normalize_location, Principal};
use crate::db::schemas::PetitionStatus;
use crate::services::optional_text;
use crate::store::{DateWindow, PetitionFilter, PollFilter, RecordStore};
use crate::types::{CivicError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PetitionCounts {
    pub total: u64,
    pub active: u64,
    pub under_review: u64,
    pub closed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub total_signatures: u64,
    pub total_votes: u64,
    pub total_polls: u64,
}

/// Per-location snapshot consumed by dashboards
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub petitions: PetitionCounts,
    pub totals: Totals,
}

#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn RecordStore>,
}

impl ReportService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn report(&self, location: &str, window: &DateWindow) -> Result<Report> {
        let location_key = normalize_location(location);
        if location_key.is_empty() {
            return Err(CivicError::LocationRequired);
        }

        let petition_filter = PetitionFilter {
            window: *window,
            ..PetitionFilter::for_location(location_key.clone())
        };
        let poll_filter = PollFilter {
            location_key: Some(location_key.clone()),
            window: *window,
        };

        let mut petitions = PetitionCounts::default();
        for (status, count) in self.store.count_petitions_by_status(&petition_filter).await? {
            match status {
                PetitionStatus::Active => petitions.active += count,
                PetitionStatus::UnderReview => petitions.under_review += count,
                PetitionStatus::Closed => petitions.closed += count,
            }
        }
        petitions.total = petitions.active + petitions.under_review + petitions.closed;

        let totals = Totals {
            total_signatures: self.store.count_signatures_in(&location_key, window).await?,
            total_votes: self.store.count_votes_in(&location_key, window).await?,
            total_polls: self.store.count_polls(&poll_filter).await?,
        };

        debug!(location = %location_key, petitions = petitions.total, "Report computed");
        Ok(Report { petitions, totals })
    }

    /// Officials only; an explicit location wins over the official's own
    pub async fn report_for(
        &self,
        principal: &Principal,
        location: Option<&str>,
        window: &DateWindow,
    ) -> Result<Report> {
        guard::can_view_jurisdiction(principal).into_result()?;
        let location = optional_text(location).unwrap_or_else(|| principal.location.clone());
        self.report(&location, window).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{PetitionDoc, PollDoc, PollOption, SignatureDoc, VoteDoc};
    use crate::store::MemoryStore;
    use crate::types::ErrorKind;

    async fn seed(store: &MemoryStore, location: &str, status: PetitionStatus, signers: &[&str]) {
        let mut p = PetitionDoc::new(
            "t".into(),
            "d".into(),
            "c".into(),
            location.into(),
            100,
            "c1".into(),
        );
        p.status = status;
        let id = store.insert_petition(p).await.unwrap()._id.unwrap();
        for signer in signers {
            store.insert_signature(SignatureDoc::new(id, signer.to_string())).await.unwrap();
        }
    }

    async fn seed_poll(store: &MemoryStore, location: &str, voters: &[&str]) {
        let poll = PollDoc::new(
            "p".into(),
            None,
            location.into(),
            vec![PollOption::new("Yes"), PollOption::new("No")],
            "o1".into(),
        );
        let id = store.insert_poll(poll).await.unwrap()._id.unwrap();
        for voter in voters {
            store.insert_vote(VoteDoc::new(id, voter.to_string(), 0)).await.unwrap();
            store.apply_vote(&id, voter, 0).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_report_is_isolated_per_location() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "Austin", PetitionStatus::Active, &["a", "b"]).await;
        seed(&store, "austin ", PetitionStatus::UnderReview, &["a"]).await;
        seed(&store, "Austin", PetitionStatus::Closed, &[]).await;
        seed(&store, "Dallas", PetitionStatus::Active, &["x", "y", "z"]).await;
        seed_poll(&store, "Austin", &["a", "b", "c"]).await;
        seed_poll(&store, "Dallas", &["x"]).await;

        let service = ReportService::new(store.clone());
        let report = service.report("AUSTIN", &DateWindow::unbounded()).await.unwrap();

        assert_eq!(
            report.petitions,
            PetitionCounts { total: 3, active: 1, under_review: 1, closed: 1 }
        );
        assert_eq!(
            report.totals,
            Totals { total_signatures: 3, total_votes: 3, total_polls: 1 }
        );
    }

    #[tokio::test]
    async fn test_report_window_excludes_everything_outside() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "Austin", PetitionStatus::Active, &["a"]).await;
        seed_poll(&store, "Austin", &["a"]).await;

        let service = ReportService::new(store.clone());
        let past = DateWindow::parse(Some("2001-01-01"), Some("2001-12-31")).unwrap();
        let report = service.report("Austin", &past).await.unwrap();
        assert_eq!(report, Report::default());
    }

    #[tokio::test]
    async fn test_report_requires_location() {
        let service = ReportService::new(Arc::new(MemoryStore::new()));
        let err = service.report("  ", &DateWindow::unbounded()).await.unwrap_err();
        assert!(matches!(err, CivicError::LocationRequired));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = service
            .report_for(&Principal::official("o1", ""), None, &DateWindow::unbounded())
            .await
            .unwrap_err();
        assert!(matches!(err, CivicError::LocationRequired));
    }

    #[tokio::test]
    async fn test_report_for_officials_only() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "Dallas", PetitionStatus::Active, &[]).await;
        let service = ReportService::new(store);

        let err = service
            .report_for(&Principal::citizen("c1", "Austin"), None, &DateWindow::unbounded())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let own = service
            .report_for(&Principal::official("o1", "Austin"), None, &DateWindow::unbounded())
            .await
            .unwrap();
        assert_eq!(own.petitions.total, 0);

        let other = service
            .report_for(&Principal::official("o1", "Austin"), Some("dallas"), &DateWindow::unbounded())
            .await
            .unwrap();
        assert_eq!(other.petitions.total, 1);
    }

    #[test]
    fn test_report_shape() {
        let json = serde_json::to_value(Report::default()).unwrap();
        assert!(json["petitions"]["under_review"].is_number());
        assert!(json["totals"]["totalSignatures"].is_number());
        assert!(json["totals"]["totalVotes"].is_number());
        assert!(json["totals"]["totalPolls"].is_number());
    }
}
