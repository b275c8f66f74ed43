//! Property-based test generators using proptest.
//!
//! Provides strategies for generating records and attachment references
//! that satisfy the store's input rules.

use boardsync_core::{
    AttachmentRef, ConfinementAttributes, JobKind, PropertyAttributes, RecordAttributes,
    SupportiveDocAttributes, SyncedRecord,
};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

/// Strategy for card identifiers (24 hex characters, like Trello ids).
pub fn card_id_strategy() -> impl Strategy<Value = String> {
    "[0-9a-f]{24}"
}

/// Strategy for short human-readable names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 ]{0,23}"
}

/// Strategy for job kinds.
pub fn job_kind_strategy() -> impl Strategy<Value = JobKind> {
    prop::sample::select(JobKind::ALL.to_vec())
}

/// Strategy for attributes of any record kind.
pub fn attributes_strategy() -> impl Strategy<Value = RecordAttributes> {
    prop_oneof![
        (name_strategy(), name_strategy(), 0.0f64..10_000.0, any::<bool>()).prop_map(
            |(location_en, owner, area, organized)| {
                RecordAttributes::Property(PropertyAttributes {
                    location_en,
                    owner,
                    area,
                    organized,
                    ..PropertyAttributes::default()
                })
            }
        ),
        (name_strategy(), 0i64..10).prop_map(|(title, generation)| {
            RecordAttributes::InheritanceConfinement(ConfinementAttributes { title, generation })
        }),
        (name_strategy(), name_strategy()).prop_map(|(title, category)| {
            RecordAttributes::SupportiveDoc(SupportiveDocAttributes { title, category })
        }),
    ]
}

/// Strategy for attachment source URLs.
pub fn attachment_url_strategy() -> impl Strategy<Value = String> {
    ("[a-z]{3,8}", "[a-z0-9]{1,12}", prop::sample::select(vec!["pdf", "png", "jpg"]))
        .prop_map(|(host, file, ext)| format!("https://{host}.example.com/{file}.{ext}"))
}

/// Strategy for attachment references with an optional label.
pub fn attachment_ref_strategy() -> impl Strategy<Value = AttachmentRef> {
    (
        attachment_url_strategy(),
        "[a-z_]{1,12}",
        prop::option::of("[a-z0-9_]{1,16}"),
    )
        .prop_map(|(url, folder, label)| {
            let reference = AttachmentRef::new(url, folder);
            match label {
                Some(label) => reference.with_label(label),
                None => reference,
            }
        })
}

/// Strategy for records on `board_id`.
pub fn synced_record_strategy(board_id: &'static str) -> impl Strategy<Value = SyncedRecord> {
    (
        card_id_strategy(),
        name_strategy(),
        attributes_strategy(),
        prop::collection::vec(attachment_url_strategy(), 0..3),
        prop::collection::vec(name_strategy(), 0..3),
        0i64..1_000_000,
    )
        .prop_map(move |(card_id, name, attributes, attachments, comments, minutes)| {
            SyncedRecord {
                board_id: board_id.to_string(),
                card_id,
                name,
                attributes,
                labels: Vec::new(),
                attachments,
                comments,
                updated_at: Utc
                    .timestamp_opt(1_700_000_000 + minutes * 60, 0)
                    .single()
                    .unwrap_or_else(Utc::now),
            }
        })
}
