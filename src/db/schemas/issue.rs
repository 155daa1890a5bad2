//! Community issue report schema
//!
//! Issues are a lightweight feed of reported problems. Any signed-in
//! principal may post one; nothing in the petition or poll lifecycles
//! reads them.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::types::CivicError;

/// Collection name for issues
pub const ISSUE_COLLECTION: &str = "issues";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Infrastructure,
    Sanitation,
    Electricity,
    Water,
    #[default]
    Other,
}

impl IssueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::Infrastructure => "infrastructure",
            IssueCategory::Sanitation => "sanitation",
            IssueCategory::Electricity => "electricity",
            IssueCategory::Water => "water",
            IssueCategory::Other => "other",
        }
    }
}

impl FromStr for IssueCategory {
    type Err = CivicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "infrastructure" => Ok(IssueCategory::Infrastructure),
            "sanitation" => Ok(IssueCategory::Sanitation),
            "electricity" => Ok(IssueCategory::Electricity),
            "water" => Ok(IssueCategory::Water),
            "other" => Ok(IssueCategory::Other),
            other => Err(CivicError::invalid(format!("Invalid category value '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssuePriority {
    Low,
    #[default]
    Medium,
    High,
}

impl IssuePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssuePriority::Low => "low",
            IssuePriority::Medium => "medium",
            IssuePriority::High => "high",
        }
    }
}

impl FromStr for IssuePriority {
    type Err = CivicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "low" => Ok(IssuePriority::Low),
            "medium" => Ok(IssuePriority::Medium),
            "high" => Ok(IssuePriority::High),
            other => Err(CivicError::invalid(format!("Invalid priority value '{other}'"))),
        }
    }
}

/// Triage state; new issues start `pending`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueStatus {
    #[default]
    Pending,
    InProgress,
    Resolved,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Pending => "pending",
            IssueStatus::InProgress => "in-progress",
            IssueStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issue document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct IssueDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub title: String,
    pub description: String,

    #[serde(default)]
    pub category: IssueCategory,

    #[serde(default)]
    pub priority: IssuePriority,

    #[serde(default)]
    pub status: IssueStatus,

    /// Principal id of the reporter
    pub reporter: String,
}

impl IssueDoc {
    pub fn new(
        title: String,
        description: String,
        category: IssueCategory,
        priority: IssuePriority,
        reporter: String,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            title,
            description,
            category,
            priority,
            status: IssueStatus::Pending,
            reporter,
        }
    }

    pub fn id_hex(&self) -> String {
        self._id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

impl IntoIndexes for IssueDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "metadata.created_at": -1 },
            Some(
                IndexOptions::builder()
                    .name("created_at_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for IssueDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        let doc = bson::to_document(&IssueDoc::new(
            "Broken light".into(),
            "Out since Monday".into(),
            IssueCategory::Electricity,
            IssuePriority::High,
            "c1".into(),
        ))
        .unwrap();
        assert_eq!(doc.get_str("status").unwrap(), "pending");
        assert_eq!(doc.get_str("category").unwrap(), "electricity");

        let wire = serde_json::to_string(&IssueStatus::InProgress).unwrap();
        assert_eq!(wire, "\"in-progress\"");
    }

    #[test]
    fn test_parse_rejects_unknown_values() {
        assert_eq!("water".parse::<IssueCategory>().unwrap(), IssueCategory::Water);
        assert_eq!(" low ".parse::<IssuePriority>().unwrap(), IssuePriority::Low);
        assert!("roads".parse::<IssueCategory>().is_err());
        assert!("urgent".parse::<IssuePriority>().is_err());
    }
}
