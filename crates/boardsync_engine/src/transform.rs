//! Raw entity to record transformation.

use crate::source::RawEntity;
use boardsync_core::{RecordAttributes, SyncedRecord};
use chrono::{DateTime, Utc};

/// Builds the record stored for `raw` on `board_id`.
///
/// `updated_at` is the source's last activity when it reported one, else
/// `now`. Entities without activity data therefore get a fresh timestamp on
/// every run. Empty titles fall back to the card name.
pub fn to_record(board_id: &str, raw: RawEntity, now: DateTime<Utc>) -> SyncedRecord {
    let updated_at = raw
        .last_activity
        .filter(|at| at.timestamp() != 0)
        .unwrap_or(now);

    let mut attributes = raw.fields;
    match &mut attributes {
        RecordAttributes::InheritanceConfinement(c) if c.title.trim().is_empty() => {
            c.title.clone_from(&raw.name);
        }
        RecordAttributes::SupportiveDoc(d) if d.title.trim().is_empty() => {
            d.title.clone_from(&raw.name);
        }
        _ => {}
    }

    SyncedRecord {
        board_id: board_id.to_string(),
        card_id: raw.id,
        name: raw.name,
        attributes,
        labels: raw.labels.into_iter().map(|l| l.name).collect(),
        attachments: raw.attachments.into_iter().map(|a| a.url).collect(),
        comments: raw.comments.into_iter().map(|c| c.text).collect(),
        updated_at,
    }
}
