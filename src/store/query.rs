//! Filters shared by every `RecordStore` implementation
//!
//! Each filter renders itself both as a MongoDB query document and as an
//! in-process predicate, so the two stores cannot drift apart.

use bson::{doc, DateTime, Document};
use chrono::{NaiveDate, Utc};

use crate::db::schemas::{PetitionDoc, PetitionStatus, PollDoc};
use crate::types::{CivicError, Result};

/// Inclusive creation-time window; either bound may be open
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DateWindow {
    pub start: Option<DateTime>,
    pub end: Option<DateTime>,
}

impl DateWindow {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Parse optional `YYYY-MM-DD` or RFC 3339 bounds.
    ///
    /// A date-only end bound covers the whole day (through 23:59:59.999 UTC).
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        let start = match non_blank(start) {
            Some(s) => Some(parse_bound(s, false)?),
            None => None,
        };
        let end = match non_blank(end) {
            Some(s) => Some(parse_bound(s, true)?),
            None => None,
        };

        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(CivicError::invalid("startDate must not be after endDate"));
            }
        }

        Ok(Self { start, end })
    }

    /// Whether a creation time falls inside the window.
    /// Records without a timestamp only match an unbounded window.
    pub fn contains(&self, at: Option<DateTime>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let Some(at) = at else {
            return false;
        };
        self.start.map_or(true, |s| at >= s) && self.end.map_or(true, |e| at <= e)
    }

    /// `$gte`/`$lte` range document, or `None` when unbounded
    pub fn to_range(&self) -> Option<Document> {
        if self.is_unbounded() {
            return None;
        }
        let mut range = Document::new();
        if let Some(start) = self.start {
            range.insert("$gte", start);
        }
        if let Some(end) = self.end {
            range.insert("$lte", end);
        }
        Some(range)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_bound(value: &str, end_of_day: bool) -> Result<DateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
        return Ok(DateTime::from_chrono(dt.with_timezone(&Utc)));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| CivicError::invalid(format!("Invalid date '{value}'")))?;
    let time = if end_of_day {
        date.and_hms_milli_opt(23, 59, 59, 999)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    let time = time.ok_or_else(|| CivicError::invalid(format!("Invalid date '{value}'")))?;

    Ok(DateTime::from_chrono(time.and_utc()))
}

/// Offset pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: u64,
    pub limit: u64,
}

/// Petition selection; every field is optional
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PetitionFilter {
    /// Normalized location key
    pub location_key: Option<String>,
    pub category: Option<String>,
    pub status: Option<PetitionStatus>,
    pub window: DateWindow,
}

impl PetitionFilter {
    pub fn for_location(location_key: impl Into<String>) -> Self {
        Self {
            location_key: Some(location_key.into()),
            ..Self::default()
        }
    }

    pub fn to_document(&self) -> Document {
        let mut filter = Document::new();
        if let Some(ref key) = self.location_key {
            filter.insert("location_key", key.clone());
        }
        if let Some(ref category) = self.category {
            filter.insert("category", category.clone());
        }
        if let Some(status) = self.status {
            filter.insert("status", status.as_str());
        }
        if let Some(range) = self.window.to_range() {
            filter.insert("metadata.created_at", range);
        }
        filter
    }

    pub fn matches(&self, petition: &PetitionDoc) -> bool {
        self.location_key
            .as_ref()
            .map_or(true, |key| &petition.location_key == key)
            && self
                .category
                .as_ref()
                .map_or(true, |category| &petition.category == category)
            && self.status.map_or(true, |status| petition.status == status)
            && self.window.contains(petition.metadata.created_at)
    }
}

/// Poll selection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollFilter {
    /// Normalized target location key
    pub location_key: Option<String>,
    pub window: DateWindow,
}

impl PollFilter {
    pub fn to_document(&self) -> Document {
        let mut filter = Document::new();
        if let Some(ref key) = self.location_key {
            filter.insert("location_key", key.clone());
        }
        if let Some(range) = self.window.to_range() {
            filter.insert("metadata.created_at", range);
        }
        filter
    }

    pub fn matches(&self, poll: &PollDoc) -> bool {
        self.location_key
            .as_ref()
            .map_or(true, |key| &poll.location_key == key)
            && self.window.contains(poll.metadata.created_at)
    }
}

/// Validated owner edit; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PetitionEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub goal: Option<i64>,
}

impl PetitionEdit {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.location.is_none()
            && self.goal.is_none()
    }

    /// Apply to an in-memory document
    pub fn apply(&self, petition: &mut PetitionDoc) {
        if let Some(ref title) = self.title {
            petition.title = title.clone();
        }
        if let Some(ref description) = self.description {
            petition.description = description.clone();
        }
        if let Some(ref category) = self.category {
            petition.category = category.clone();
        }
        if let Some(ref location) = self.location {
            petition.location = location.clone();
            petition.location_key = crate::auth::normalize_location(location);
        }
        if let Some(goal) = self.goal {
            petition.goal = goal;
        }
    }

    /// `$set` body for MongoDB
    pub fn to_set_document(&self) -> Document {
        let mut set = doc! {};
        if let Some(ref title) = self.title {
            set.insert("title", title.clone());
        }
        if let Some(ref description) = self.description {
            set.insert("description", description.clone());
        }
        if let Some(ref category) = self.category {
            set.insert("category", category.clone());
        }
        if let Some(ref location) = self.location {
            set.insert("location", location.clone());
            set.insert("location_key", crate::auth::normalize_location(location));
        }
        if let Some(goal) = self.goal {
            set.insert("goal", goal);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_only_bounds() {
        let window = DateWindow::parse(Some("2024-03-01"), Some("2024-03-31")).unwrap();
        let start = window.start.unwrap().to_chrono();
        let end = window.end.unwrap().to_chrono();
        assert_eq!(start.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(end.format("%H:%M:%S%.3f").to_string(), "23:59:59.999");
    }

    #[test]
    fn test_parse_rfc3339_and_blank() {
        let window = DateWindow::parse(Some("2024-03-01T12:00:00Z"), Some("  ")).unwrap();
        assert!(window.start.is_some());
        assert!(window.end.is_none());
        assert!(DateWindow::parse(None, None).unwrap().is_unbounded());
    }

    #[test]
    fn test_parse_rejects_garbage_and_inverted() {
        assert!(matches!(
            DateWindow::parse(Some("yesterday"), None),
            Err(CivicError::InvalidInput(_))
        ));
        assert!(matches!(
            DateWindow::parse(Some("2024-04-01"), Some("2024-03-01")),
            Err(CivicError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_window_contains_inclusive() {
        let window = DateWindow::parse(Some("2024-03-01"), Some("2024-03-01")).unwrap();
        assert!(window.contains(window.start));
        assert!(window.contains(window.end));
        assert!(!window.contains(Some(DateTime::from_millis(0))));
        assert!(!window.contains(None));
        assert!(DateWindow::unbounded().contains(None));
    }

    #[test]
    fn test_petition_filter_document() {
        let filter = PetitionFilter {
            location_key: Some("austin".into()),
            status: Some(PetitionStatus::UnderReview),
            ..PetitionFilter::default()
        };
        let d = filter.to_document();
        assert_eq!(d.get_str("location_key").unwrap(), "austin");
        assert_eq!(d.get_str("status").unwrap(), "under_review");
        assert!(!d.contains_key("metadata.created_at"));
    }

    #[test]
    fn test_edit_apply_renormalizes_location() {
        let mut p = PetitionDoc::new(
            "t".into(),
            "d".into(),
            "c".into(),
            "Austin".into(),
            100,
            "c1".into(),
        );
        let edit = PetitionEdit {
            location: Some(" Round Rock".into()),
            goal: Some(250),
            ..PetitionEdit::default()
        };
        edit.apply(&mut p);
        assert_eq!(p.location_key, "round rock");
        assert_eq!(p.goal, 250);
        assert_eq!(p.title, "t");
        assert_eq!(edit.to_set_document().get_str("location_key").unwrap(), "round rock");
    }
}
