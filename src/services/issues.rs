//! Community issue feed
//!
//! Any signed-in principal may report an issue. Reports carry a category
//! and priority from fixed sets; omitted values fall back to `other` and
//! `medium`.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::auth::Principal;
use crate::db::schemas::{IssueCategory, IssueDoc, IssuePriority};
use crate::services::{optional_text, required_text};
use crate::store::RecordStore;
use crate::types::Result;

/// Fields for a new issue, as submitted
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewIssue {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
}

#[derive(Clone)]
pub struct IssueService {
    store: Arc<dyn RecordStore>,
}

impl IssueService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, principal: &Principal, fields: NewIssue) -> Result<IssueDoc> {
        let title = required_text("title", fields.title.as_deref())?;
        let description = required_text("description", fields.description.as_deref())?;
        let category: IssueCategory = optional_text(fields.category.as_deref())
            .map(|c| c.parse())
            .transpose()?
            .unwrap_or_default();
        let priority: IssuePriority = optional_text(fields.priority.as_deref())
            .map(|p| p.parse())
            .transpose()?
            .unwrap_or_default();

        let issue = self
            .store
            .insert_issue(IssueDoc::new(title, description, category, priority, principal.id.clone()))
            .await?;

        info!(
            issue_id = %issue.id_hex(),
            reporter = %principal.id,
            category = issue.category.as_str(),
            priority = issue.priority.as_str(),
            "Issue reported"
        );
        Ok(issue)
    }

    /// Every issue, newest first
    pub async fn list(&self) -> Result<Vec<IssueDoc>> {
        self.store.find_issues().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::IssueStatus;
    use crate::store::MemoryStore;
    use crate::types::ErrorKind;
    use tokio_test::{assert_err, assert_ok};

    fn setup() -> IssueService {
        IssueService::new(Arc::new(MemoryStore::new()))
    }

    fn streetlight() -> NewIssue {
        NewIssue {
            title: Some("Streetlight out".into()),
            description: Some("Corner of 5th and Main".into()),
            ..NewIssue::default()
        }
    }

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let service = setup();
        let issue = assert_ok!(service.create(&Principal::citizen("c1", "Austin"), streetlight()).await);
        assert_eq!(issue.category, IssueCategory::Other);
        assert_eq!(issue.priority, IssuePriority::Medium);
        assert_eq!(issue.status, IssueStatus::Pending);
        assert_eq!(issue.reporter, "c1");
        assert!(issue._id.is_some());
    }

    #[tokio::test]
    async fn test_officials_may_report_too() {
        let service = setup();
        let fields = NewIssue {
            category: Some("water".into()),
            priority: Some("high".into()),
            ..streetlight()
        };
        let issue = assert_ok!(service.create(&Principal::official("o1", "Austin"), fields).await);
        assert_eq!(issue.category, IssueCategory::Water);
        assert_eq!(issue.priority, IssuePriority::High);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let service = setup();
        let c1 = Principal::citizen("c1", "Austin");

        let err = assert_err!(
            service
                .create(&c1, NewIssue { description: Some(" ".into()), ..streetlight() })
                .await
        );
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = assert_err!(
            service
                .create(&c1, NewIssue { category: Some("roads".into()), ..streetlight() })
                .await
        );
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = assert_err!(
            service
                .create(&c1, NewIssue { priority: Some("urgent".into()), ..streetlight() })
                .await
        );
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        assert!(assert_ok!(service.list().await).is_empty());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let service = setup();
        let c1 = Principal::citizen("c1", "Austin");
        let first = assert_ok!(service.create(&c1, streetlight()).await);
        let second = assert_ok!(
            service
                .create(&c1, NewIssue { title: Some("Overflowing bins".into()), ..streetlight() })
                .await
        );

        let listed = assert_ok!(service.list().await);
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0]._id, second._id);
        assert_eq!(listed[1]._id, first._id);
    }
}
