//! Trello REST payloads.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Card {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub date_last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Label {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CustomFieldDef {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default)]
    pub options: Vec<CustomFieldOption>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CustomFieldOption {
    pub id: String,
    #[serde(default)]
    pub value: OptionValue,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OptionValue {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CustomFieldItem {
    pub id_custom_field: String,
    #[serde(default)]
    pub value: Option<HashMap<String, Value>>,
    #[serde(default)]
    pub id_value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Attachment {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentAction {
    #[serde(default)]
    pub data: CommentData,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CommentData {
    #[serde(default)]
    pub text: String,
}
