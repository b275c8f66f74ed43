//! Synchronized records and the shapes used to read them back.

use crate::types::{RecordId, RecordKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Typed attributes of a property card.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyAttributes {
    /// Location (Arabic).
    pub location_ar: String,
    /// Location (English).
    pub location_en: String,
    /// Lot number.
    pub lot: String,
    /// Property type.
    pub property_type: String,
    /// Workflow status.
    pub status: String,
    /// Owner name.
    pub owner: String,
    /// Area in square meters.
    pub area: f64,
    /// Share count.
    pub shares: f64,
    /// Whether the property is organized.
    pub organized: bool,
    /// Whether the property has effects.
    pub effects: bool,
}

/// Typed attributes of an inheritance confinement card.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfinementAttributes {
    /// Title, falling back to the card name.
    pub title: String,
    /// Generation number.
    pub generation: i64,
}

/// Typed attributes of a supportive document card.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupportiveDocAttributes {
    /// Title, falling back to the card name.
    pub title: String,
    /// Document category.
    pub category: String,
}

/// Kind-specific scalar attributes. The variant determines the record kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordAttributes {
    /// Property attributes.
    Property(PropertyAttributes),
    /// Inheritance confinement attributes.
    InheritanceConfinement(ConfinementAttributes),
    /// Supportive document attributes.
    SupportiveDoc(SupportiveDocAttributes),
}

impl RecordAttributes {
    /// The record kind these attributes belong to.
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        match self {
            RecordAttributes::Property(_) => RecordKind::Property,
            RecordAttributes::InheritanceConfinement(_) => RecordKind::InheritanceConfinement,
            RecordAttributes::SupportiveDoc(_) => RecordKind::SupportiveDoc,
        }
    }

    /// Words that describe the record when naming its mirrored attachments.
    #[must_use]
    pub fn context(&self) -> &str {
        match self {
            RecordAttributes::Property(p) => &p.location_en,
            RecordAttributes::InheritanceConfinement(c) => &c.title,
            RecordAttributes::SupportiveDoc(d) => &d.title,
        }
    }
}

/// A record synchronized from a board card.
///
/// `(board_id, card_id)` is the natural key. Updates replace every field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncedRecord {
    /// Board the card belongs to.
    pub board_id: String,
    /// Source-assigned card identifier.
    pub card_id: String,
    /// Card name.
    pub name: String,
    /// Kind-specific attributes.
    pub attributes: RecordAttributes,
    /// Label names.
    pub labels: Vec<String>,
    /// Source attachment URLs, in card order.
    pub attachments: Vec<String>,
    /// Comment texts, in card order.
    pub comments: Vec<String>,
    /// Last activity on the card.
    pub updated_at: DateTime<Utc>,
}

impl SyncedRecord {
    /// The kind of this record.
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        self.attributes.kind()
    }
}

/// A record together with its store-assigned identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Row identifier, stable across updates.
    pub id: RecordId,
    /// The record as last written.
    pub record: SyncedRecord,
}

/// Result of an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// True when a new row was created.
    pub inserted: bool,
    /// Row identifier.
    pub id: RecordId,
}

/// Column a record listing is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOrder {
    /// Last activity.
    #[default]
    UpdatedAt,
    /// Card name.
    Name,
    /// Number of comments.
    Comments,
    /// Number of attachments.
    Attachments,
}

impl RecordOrder {
    fn compare(self, a: &StoredRecord, b: &StoredRecord) -> Ordering {
        let primary = match self {
            RecordOrder::UpdatedAt => a.record.updated_at.cmp(&b.record.updated_at),
            RecordOrder::Name => a.record.name.cmp(&b.record.name),
            RecordOrder::Comments => a.record.comments.len().cmp(&b.record.comments.len()),
            RecordOrder::Attachments => {
                a.record.attachments.len().cmp(&b.record.attachments.len())
            }
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

impl FromStr for RecordOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "updated_at" => Ok(RecordOrder::UpdatedAt),
            "name" => Ok(RecordOrder::Name),
            "comments" => Ok(RecordOrder::Comments),
            "attachments" => Ok(RecordOrder::Attachments),
            other => Err(format!("unknown order column: {other}")),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending.
    Asc,
    /// Descending.
    #[default]
    Desc,
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction: {other}")),
        }
    }
}

/// A page of a record listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u32,
    /// Records per page.
    pub page_size: u32,
    /// Sort column.
    pub order: RecordOrder,
    /// Sort direction.
    pub direction: SortDirection,
}

impl PageRequest {
    /// Default page size.
    pub const DEFAULT_PAGE_SIZE: u32 = 50;

    /// Creates a request for `page` with the default size and ordering.
    #[must_use]
    pub fn new(page: u32) -> Self {
        Self {
            page: page.max(1),
            ..Self::default()
        }
    }

    /// Sets the page size. Zero is raised to one.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Sets the ordering.
    #[must_use]
    pub fn with_order(mut self, order: RecordOrder, direction: SortDirection) -> Self {
        self.order = order;
        self.direction = direction;
        self
    }

    /// Sorts `records` and returns the requested page.
    pub(crate) fn apply(&self, mut records: Vec<StoredRecord>) -> RecordPage {
        records.sort_by(|a, b| {
            let ord = self.order.compare(a, b);
            match self.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
        let total = records.len();
        let size = self.page_size.max(1) as usize;
        let skip = (self.page.max(1) as usize - 1).saturating_mul(size);
        let records = records.into_iter().skip(skip).take(size).collect();
        RecordPage {
            records,
            total,
            page: self.page.max(1),
            page_size: self.page_size.max(1),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: Self::DEFAULT_PAGE_SIZE,
            order: RecordOrder::default(),
            direction: SortDirection::default(),
        }
    }
}

/// One page of records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordPage {
    /// Records on this page.
    pub records: Vec<StoredRecord>,
    /// Total matching records.
    pub total: usize,
    /// Page number.
    pub page: u32,
    /// Page size used.
    pub page_size: u32,
}

impl fmt::Display for RecordOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordOrder::UpdatedAt => "updated_at",
            RecordOrder::Name => "name",
            RecordOrder::Comments => "comments",
            RecordOrder::Attachments => "attachments",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stored(id: u64, name: &str, minute: u32, comments: usize) -> StoredRecord {
        StoredRecord {
            id: RecordId::new(id),
            record: SyncedRecord {
                board_id: "b".into(),
                card_id: format!("c{id}"),
                name: name.into(),
                attributes: RecordAttributes::SupportiveDoc(SupportiveDocAttributes::default()),
                labels: vec![],
                attachments: vec![],
                comments: vec!["x".into(); comments],
                updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, minute, 0).unwrap(),
            },
        }
    }

    #[test]
    fn attributes_determine_kind() {
        let attrs = RecordAttributes::Property(PropertyAttributes::default());
        assert_eq!(attrs.kind(), RecordKind::Property);
    }

    #[test]
    fn default_page_is_newest_first() {
        let records = vec![stored(1, "a", 1, 0), stored(2, "b", 3, 0), stored(3, "c", 2, 0)];
        let page = PageRequest::default().apply(records);
        let ids: Vec<u64> = page.records.iter().map(|r| r.id.as_u64()).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert_eq!(page.total, 3);
    }

    #[test]
    fn paging_skips_earlier_pages() {
        let records = (1..=5).map(|i| stored(i, "n", i as u32, 0)).collect();
        let page = PageRequest::new(2)
            .with_page_size(2)
            .with_order(RecordOrder::UpdatedAt, SortDirection::Asc)
            .apply(records);
        let ids: Vec<u64> = page.records.iter().map(|r| r.id.as_u64()).collect();
        assert_eq!(ids, vec![3, 4]);
        assert_eq!(page.total, 5);
    }

    #[test]
    fn page_past_end_is_empty() {
        let records = vec![stored(1, "a", 1, 0)];
        let page = PageRequest::new(3).apply(records);
        assert!(page.records.is_empty());
        assert_eq!(page.total, 1);
    }

    #[test]
    fn order_by_comment_count() {
        let records = vec![stored(1, "a", 1, 2), stored(2, "b", 1, 0), stored(3, "c", 1, 5)];
        let page = PageRequest::default()
            .with_order(RecordOrder::Comments, SortDirection::Asc)
            .apply(records);
        let ids: Vec<u64> = page.records.iter().map(|r| r.id.as_u64()).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn parse_order_and_direction() {
        assert_eq!("name".parse::<RecordOrder>().unwrap(), RecordOrder::Name);
        assert_eq!("asc".parse::<SortDirection>().unwrap(), SortDirection::Asc);
        assert!("area".parse::<RecordOrder>().is_err());
        assert!("up".parse::<SortDirection>().is_err());
    }
}
