//! The authenticated actor behind an action

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::CivicError;

/// Role of a principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Citizen,
    Official,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Citizen => "citizen",
            Role::Official => "official",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CivicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "citizen" => Ok(Role::Citizen),
            "official" => Ok(Role::Official),
            other => Err(CivicError::invalid(format!("Unknown role '{other}'"))),
        }
    }
}

/// Whether an account with this role starts out verified.
///
/// Citizens are verified on registration; officials wait for manual
/// verification. Derived from the role on every call, never stored apart
/// from it.
pub fn initial_verification_status(role: Role) -> bool {
    matches!(role, Role::Citizen)
}

/// Verified identity for one action, produced by the identity assertion
/// layer and trusted as-is by the engines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub role: Role,
    pub location: String,
}

impl Principal {
    pub fn new(id: impl Into<String>, role: Role, location: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            location: location.into(),
        }
    }

    pub fn citizen(id: impl Into<String>, location: impl Into<String>) -> Self {
        Self::new(id, Role::Citizen, location)
    }

    pub fn official(id: impl Into<String>, location: impl Into<String>) -> Self {
        Self::new(id, Role::Official, location)
    }
}
