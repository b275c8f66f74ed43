//! Attachment references and the source-to-destination mapping table.

use crate::record::SyncedRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Separator of the textual `url|folder|label` form.
pub const REF_SEPARATOR: char = '|';

/// Reasons a textual attachment reference is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachmentRefError {
    /// Fewer than the two required parts (url and folder).
    #[error("attachment reference has {found} part(s), expected url|folder[|label]")]
    MissingParts {
        /// Parts found.
        found: usize,
    },

    /// The folder part is empty.
    #[error("attachment reference has an empty folder")]
    EmptyFolder,
}

/// An attachment to mirror, with the context needed to name its copy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttachmentRef {
    /// URL of the attachment in the source system.
    pub source_url: String,
    /// Destination folder in the blob store.
    pub folder: String,
    /// Optional suffix that disambiguates the destination name.
    pub label: Option<String>,
}

impl AttachmentRef {
    /// Creates a reference without a label.
    pub fn new(source_url: impl Into<String>, folder: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            folder: folder.into(),
            label: None,
        }
    }

    /// Sets the label. An empty label is treated as none.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        self.label = (!label.is_empty()).then_some(label);
        self
    }

    /// Builds the reference for one attachment of `record`.
    ///
    /// The label joins the normalized record context and name with `_`.
    pub fn for_record(
        source_url: impl Into<String>,
        folder: impl Into<String>,
        record: &SyncedRecord,
    ) -> Self {
        let label = [record.attributes.context(), record.name.as_str()]
            .iter()
            .map(|part| normalize_label(part))
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_");
        Self::new(source_url, folder).with_label(label)
    }

    /// Returns true if there is nothing to mirror.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.source_url.trim().is_empty()
    }

    /// Composes the destination object name from the source identifier and extension.
    #[must_use]
    pub fn object_name(&self, identifier: &str, extension: &str) -> String {
        match &self.label {
            Some(label) => format!("{identifier}-{label}{extension}"),
            None => format!("{identifier}{extension}"),
        }
    }
}

impl FromStr for AttachmentRef {
    type Err = AttachmentRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Everything after the second separator belongs to the label.
        let parts: Vec<&str> = s.splitn(3, REF_SEPARATOR).collect();
        match parts.as_slice() {
            [_, folder, ..] if folder.trim().is_empty() => Err(AttachmentRefError::EmptyFolder),
            [url, folder] => Ok(AttachmentRef::new(*url, *folder)),
            [url, folder, label] => Ok(AttachmentRef::new(*url, *folder).with_label(*label)),
            short => Err(AttachmentRefError::MissingParts { found: short.len() }),
        }
    }
}

impl fmt::Display for AttachmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{REF_SEPARATOR}{}", self.source_url, self.folder)?;
        if let Some(label) = &self.label {
            write!(f, "{REF_SEPARATOR}{label}")?;
        }
        Ok(())
    }
}

/// Lowercases `text` and replaces characters unsafe in object names with `_`.
#[must_use]
pub fn normalize_label(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_whitespace() || c == '/' || c == '\\' || c == REF_SEPARATOR {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// A mirrored attachment. Never updated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMapping {
    /// Source URL (unique).
    pub source_url: String,
    /// Where the copy lives.
    pub destination_url: String,
    /// When the copy was recorded.
    pub mapped_at: DateTime<Utc>,
}
