//! Engines for townhall
//!
//! Each engine consults the authorization guard first, then validates the
//! payload, then applies its mutation through the record store. Nothing
//! else writes petitions, signatures, polls or votes.
//!
//! ## Services
//!
//! - **Petitions**: create, edit, delete, sign, status changes, listings
//! - **Polls**: create, vote, close, listings
//! - **Governance**: official responses and the jurisdiction queue
//! - **Reports**: read-only per-location counts
//! - **Issues**: the community issue feed

pub mod governance;
pub mod issues;
pub mod petitions;
pub mod polls;
pub mod reports;

pub use governance::GovernanceService;
pub use issues::{IssueService, NewIssue};
pub use petitions::{NewPetition, PageLimits, PetitionPage, PetitionQuery, PetitionService, PetitionUpdate};
pub use polls::{NewPoll, PollService};
pub use reports::{PetitionCounts, Report, ReportService, Totals};

use std::sync::Arc;

use crate::db::schemas::PetitionStatus;
use crate::store::RecordStore;
use crate::types::{CivicError, Result};

/// All engines over one shared store
#[derive(Clone)]
pub struct Services {
    pub petitions: PetitionService,
    pub polls: PollService,
    pub governance: GovernanceService,
    pub reports: ReportService,
    pub issues: IssueService,
}

impl Services {
    pub fn new(store: Arc<dyn RecordStore>, limits: PageLimits) -> Self {
        Self {
            petitions: PetitionService::new(store.clone(), limits),
            polls: PollService::new(store.clone()),
            governance: GovernanceService::new(store.clone()),
            reports: ReportService::new(store.clone()),
            issues: IssueService::new(store),
        }
    }
}

/// Trimmed value of a required text field
pub(crate) fn required_text(field: &str, value: Option<&str>) -> Result<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(CivicError::invalid(format!("{field} is required"))),
    }
}

/// Trimmed value of an optional text field, `None` if blank
pub(crate) fn optional_text(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Requested petition status, as submitted.
///
/// Engines parse it only after the guard has allowed the principal, so an
/// unauthorized caller learns nothing about what a valid status looks like.
pub(crate) fn required_status(value: Option<&str>) -> Result<PetitionStatus> {
    required_text("status", value)?.parse()
}

/// Optional status filter; blank means no filter
pub(crate) fn optional_status(value: Option<&str>) -> Result<Option<PetitionStatus>> {
    optional_text(value).map(|s| s.parse()).transpose()
}
