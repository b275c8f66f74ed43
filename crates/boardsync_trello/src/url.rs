//! Attachment download URL parsing.

/// Identifiers extracted from a Trello attachment download URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    /// Card identifier.
    pub card_id: String,
    /// Attachment identifier.
    pub attachment_id: String,
    /// File extension including the leading dot.
    pub extension: String,
}

/// Parses `.../cards/{card}/attachments/{attachment}/download/{file}.{ext}`.
///
/// Identifiers are lowercase hex. The file name must carry an alphanumeric
/// extension. Returns `None` for any other shape.
pub fn parse_download_url(url: &str) -> Option<DownloadTarget> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segments: Vec<&str> = path.split('/').collect();
    let cards = segments.iter().rposition(|s| *s == "cards")?;
    let rest = &segments[cards + 1..];
    let [card_id, "attachments", attachment_id, "download", file_name] = rest else {
        return None;
    };
    if !is_hex_id(card_id) || !is_hex_id(attachment_id) {
        return None;
    }
    let dot = file_name.rfind('.')?;
    let ext = &file_name[dot + 1..];
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(DownloadTarget {
        card_id: (*card_id).to_string(),
        attachment_id: (*attachment_id).to_string(),
        extension: format!(".{ext}"),
    })
}

fn is_hex_id(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}
