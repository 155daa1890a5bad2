//! Authorization guard for petition and poll actions
//!
//! Pure predicates over `(principal, resource)`: no I/O, no side effects.
//! Each returns a [`Decision`]; a denial carries a [`DenyReason`] that the
//! caller converts into a `CivicError` through the single `From` mapping.
//!
//! Checks run in a fixed order (role, ownership/jurisdiction, state,
//! uniqueness) so the reported reason is deterministic.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::auth::{same_jurisdiction, Principal, Role};
use crate::db::schemas::{PetitionDoc, PetitionStatus, PollDoc, PollStatus};

/// Why an action was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenyReason {
    NotCitizen,
    NotOfficial,
    NotOwner,
    OwnPetition,
    WrongLocation,
    NotActive,
    PetitionClosed,
    AlreadySigned,
    AlreadyVoted,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::NotCitizen => "NOT_CITIZEN",
            DenyReason::NotOfficial => "NOT_OFFICIAL",
            DenyReason::NotOwner => "NOT_OWNER",
            DenyReason::OwnPetition => "OWN_PETITION",
            DenyReason::WrongLocation => "WRONG_LOCATION",
            DenyReason::NotActive => "NOT_ACTIVE",
            DenyReason::PetitionClosed => "PETITION_CLOSED",
            DenyReason::AlreadySigned => "ALREADY_SIGNED",
            DenyReason::AlreadyVoted => "ALREADY_VOTED",
        }
    }

    /// User-facing message; identical for every route that hits this reason
    pub fn message(&self) -> &'static str {
        match self {
            DenyReason::NotCitizen => "Access denied. Citizens only.",
            DenyReason::NotOfficial => "Access denied. Officials only.",
            DenyReason::NotOwner => "You can only modify your own petitions",
            DenyReason::OwnPetition => "You cannot sign your own petition",
            DenyReason::WrongLocation => "Access denied. Outside your jurisdiction.",
            DenyReason::NotActive => "This item is no longer active",
            DenyReason::PetitionClosed => "Closed petitions cannot be modified",
            DenyReason::AlreadySigned => "You already signed this petition",
            DenyReason::AlreadyVoted => "You have already voted on this poll",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a guard predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn reason(&self) -> Option<DenyReason> {
        match self {
            Decision::Allow => None,
            Decision::Deny(reason) => Some(*reason),
        }
    }

    /// Convert into a `Result` so callers can use `?`
    pub fn into_result(self) -> Result<(), DenyReason> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(reason),
        }
    }
}

/// Owner actions share one predicate; only editing is barred on closed petitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerAction {
    Edit,
    Delete,
}

fn require_role(principal: &Principal, role: Role) -> Decision {
    match (principal.role == role, role) {
        (true, _) => Decision::Allow,
        (false, Role::Citizen) => Decision::Deny(DenyReason::NotCitizen),
        (false, Role::Official) => Decision::Deny(DenyReason::NotOfficial),
    }
}

macro_rules! check {
    ($decision:expr) => {
        if let Decision::Deny(reason) = $decision {
            return Decision::Deny(reason);
        }
    };
}

pub fn can_create_petition(principal: &Principal) -> Decision {
    require_role(principal, Role::Citizen)
}

pub fn can_edit_or_delete_petition(
    principal: &Principal,
    petition: &PetitionDoc,
    action: OwnerAction,
) -> Decision {
    check!(require_role(principal, Role::Citizen));
    if petition.creator != principal.id {
        return Decision::Deny(DenyReason::NotOwner);
    }
    if action == OwnerAction::Edit && petition.status == PetitionStatus::Closed {
        return Decision::Deny(DenyReason::PetitionClosed);
    }
    Decision::Allow
}

/// `already_signed` is looked up by the caller; the predicate stays pure.
pub fn can_sign_petition(principal: &Principal, petition: &PetitionDoc, already_signed: bool) -> Decision {
    check!(require_role(principal, Role::Citizen));
    if petition.creator == principal.id {
        return Decision::Deny(DenyReason::OwnPetition);
    }
    if petition.status != PetitionStatus::Active {
        return Decision::Deny(DenyReason::NotActive);
    }
    if already_signed {
        return Decision::Deny(DenyReason::AlreadySigned);
    }
    Decision::Allow
}

pub fn can_change_petition_status(principal: &Principal, petition: &PetitionDoc) -> Decision {
    check!(require_role(principal, Role::Official));
    if !same_jurisdiction(&principal.location, &petition.location) {
        return Decision::Deny(DenyReason::WrongLocation);
    }
    Decision::Allow
}

pub fn can_respond_to_petition(principal: &Principal, petition: &PetitionDoc) -> Decision {
    check!(can_change_petition_status(principal, petition));
    if petition.status == PetitionStatus::Closed {
        return Decision::Deny(DenyReason::PetitionClosed);
    }
    Decision::Allow
}

pub fn can_create_poll(principal: &Principal) -> Decision {
    require_role(principal, Role::Official)
}

pub fn can_vote_poll(principal: &Principal, poll: &PollDoc) -> Decision {
    check!(require_role(principal, Role::Citizen));
    if poll.status != PollStatus::Active {
        return Decision::Deny(DenyReason::NotActive);
    }
    if poll.voters.iter().any(|v| v == &principal.id) {
        return Decision::Deny(DenyReason::AlreadyVoted);
    }
    Decision::Allow
}

pub fn can_close_poll(principal: &Principal, poll: &PollDoc) -> Decision {
    check!(require_role(principal, Role::Official));
    if poll.created_by != principal.id {
        return Decision::Deny(DenyReason::NotOwner);
    }
    if poll.status != PollStatus::Active {
        return Decision::Deny(DenyReason::NotActive);
    }
    Decision::Allow
}

/// Jurisdiction-wide reads (local petition queue, reports) are for officials
pub fn can_view_jurisdiction(principal: &Principal) -> Decision {
    require_role(principal, Role::Official)
}
