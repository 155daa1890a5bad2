//! Database schemas for townhall
//!
//! Defines MongoDB document structures for petitions, signatures, polls,
//! votes, community issues, and the admin audit log.

mod admin_log;
mod issue;
mod metadata;
mod petition;
mod poll;
mod signature;
mod vote;

pub use admin_log::{AdminLogDoc, ADMIN_LOG_COLLECTION};
pub use issue::{IssueCategory, IssueDoc, IssuePriority, IssueStatus, ISSUE_COLLECTION};
pub use metadata::Metadata;
pub use petition::{
    OfficialResponse, PetitionDoc, PetitionStatus, DEFAULT_PETITION_GOAL, PETITION_COLLECTION,
};
pub use poll::{PollDoc, PollOption, PollStatus, POLL_COLLECTION};
pub use signature::{SignatureDoc, SIGNATURE_COLLECTION};
pub use vote::{VoteDoc, VOTE_COLLECTION};
