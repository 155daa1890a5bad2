//! Database layer for townhall
//!
//! Provides MongoDB storage for petitions, signatures, polls, votes, and
//! issues, and the admin audit log.

pub mod mongo;
pub mod schemas;

pub use mongo::{MongoClient, MongoCollection};
pub use schemas::{AdminLogDoc, IssueDoc, Metadata, PetitionDoc, PollDoc, SignatureDoc, VoteDoc};
