//! Shared types for townhall

pub mod error;

pub use error::{CivicError, ConflictKind, ErrorKind, Result};

use bson::oid::ObjectId;

/// Parse a record id supplied by a caller.
///
/// An id that is not a valid ObjectId can never resolve to a record, so it
/// is reported the same way as a missing one.
pub fn parse_record_id(entity: &'static str, id: &str) -> Result<ObjectId> {
    ObjectId::parse_str(id.trim()).map_err(|_| CivicError::NotFound(format!("{entity} not found")))
}
