//! Custom field resolution.
//!
//! Trello stores typed card data as custom field items that point at board
//! level definitions. Items are resolved to `name → text` pairs first, then
//! mapped onto the attributes of the board's record kind by field name.

use crate::model::{CustomFieldDef, CustomFieldItem};
use boardsync_core::{
    ConfinementAttributes, PropertyAttributes, RecordAttributes, RecordKind,
    SupportiveDocAttributes,
};
use serde_json::Value;
use std::collections::HashMap;

/// Custom field values of one card, keyed by field name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CardFields {
    values: HashMap<String, String>,
}

impl CardFields {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Text of a field, empty if absent.
    pub fn text(&self, name: &str) -> String {
        self.values.get(name).cloned().unwrap_or_default()
    }

    /// Numeric value of a field. Absent or unparsable values read as zero.
    pub fn number(&self, name: &str) -> f64 {
        self.values
            .get(name)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .unwrap_or(0.0)
    }

    /// Integer value of a field. Fractional input is truncated.
    pub fn integer(&self, name: &str) -> i64 {
        let Some(raw) = self.values.get(name) else {
            return 0;
        };
        let raw = raw.trim();
        raw.parse::<i64>()
            .ok()
            .or_else(|| raw.parse::<f64>().ok().map(|f| f.trunc() as i64))
            .unwrap_or(0)
    }

    /// Checkbox value of a field. Anything but `true` reads as false.
    pub fn flag(&self, name: &str) -> bool {
        self.values
            .get(name)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }

    /// Number of resolved fields.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no field resolved.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Maps the fields onto the attributes of `kind`.
    ///
    /// Titles fall back to `card_name` when the field is empty.
    pub fn into_attributes(self, kind: RecordKind, card_name: &str) -> RecordAttributes {
        let title = || {
            let title = self.text("Title");
            if title.trim().is_empty() {
                card_name.to_string()
            } else {
                title
            }
        };
        match kind {
            RecordKind::Property => RecordAttributes::Property(PropertyAttributes {
                location_ar: self.text("Location AR"),
                location_en: self.text("Location EN"),
                lot: self.text("Lot"),
                property_type: self.text("Type"),
                status: self.text("Status"),
                owner: self.text("Owner"),
                area: self.number("Area"),
                shares: self.number("Shares"),
                organized: self.flag("Organized"),
                effects: self.flag("Effects"),
            }),
            RecordKind::InheritanceConfinement => {
                RecordAttributes::InheritanceConfinement(ConfinementAttributes {
                    title: title(),
                    generation: self.integer("Generation"),
                })
            }
            RecordKind::SupportiveDoc => RecordAttributes::SupportiveDoc(SupportiveDocAttributes {
                title: title(),
                category: self.text("Category"),
            }),
        }
    }
}

/// Resolves a card's custom field items against the board's definitions.
///
/// Items whose definition is unknown are dropped. List fields resolve to the
/// text of the selected option; other fields take their single typed value.
pub(crate) fn resolve(
    definitions: &HashMap<String, CustomFieldDef>,
    items: &[CustomFieldItem],
) -> CardFields {
    let mut fields = CardFields::new();
    for item in items {
        let Some(def) = definitions.get(&item.id_custom_field) else {
            tracing::debug!(field = %item.id_custom_field, "custom field without definition");
            continue;
        };
        if let Some(value) = resolve_item(def, item) {
            fields.insert(def.name.clone(), value);
        }
    }
    fields
}

fn resolve_item(def: &CustomFieldDef, item: &CustomFieldItem) -> Option<String> {
    if def.field_type == "list" {
        let selected = item.id_value.as_deref()?;
        return def
            .options
            .iter()
            .find(|option| option.id == selected)
            .map(|option| option.value.text.clone());
    }
    let value = item.value.as_ref()?.values().next()?;
    Some(scalar_text(value))
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CustomFieldOption, OptionValue};

    fn def(id: &str, name: &str, field_type: &str) -> CustomFieldDef {
        CustomFieldDef {
            id: id.to_string(),
            name: name.to_string(),
            field_type: field_type.to_string(),
            options: Vec::new(),
        }
    }

    fn item(field: &str, key: &str, value: Value) -> CustomFieldItem {
        CustomFieldItem {
            id_custom_field: field.to_string(),
            value: Some(HashMap::from([(key.to_string(), value)])),
            id_value: None,
        }
    }

    #[test]
    fn resolves_scalar_and_list_fields() {
        let mut status = def("f-status", "Status", "list");
        status.options.push(CustomFieldOption {
            id: "opt-1".to_string(),
            value: OptionValue {
                text: "Registered".to_string(),
            },
        });
        let definitions = HashMap::from([
            ("f-status".to_string(), status),
            ("f-area".to_string(), def("f-area", "Area", "number")),
            ("f-org".to_string(), def("f-org", "Organized", "checkbox")),
        ]);
        let items = vec![
            CustomFieldItem {
                id_custom_field: "f-status".to_string(),
                value: None,
                id_value: Some("opt-1".to_string()),
            },
            item("f-area", "number", Value::String("120.5".to_string())),
            item("f-org", "checked", Value::String("true".to_string())),
            item("f-unknown", "text", Value::String("ignored".to_string())),
        ];

        let fields = resolve(&definitions, &items);
        assert_eq!(fields.len(), 3);
        assert_eq!(fields.text("Status"), "Registered");
        assert_eq!(fields.number("Area"), 120.5);
        assert!(fields.flag("Organized"));
    }

    #[test]
    fn list_field_with_unknown_option_is_dropped() {
        let definitions = HashMap::from([("f".to_string(), def("f", "Category", "list"))]);
        let items = vec![CustomFieldItem {
            id_custom_field: "f".to_string(),
            value: None,
            id_value: Some("missing".to_string()),
        }];
        assert!(resolve(&definitions, &items).is_empty());
    }

    #[test]
    fn defaults_for_missing_or_bad_values() {
        let mut fields = CardFields::new();
        fields.insert("Area", "n/a");
        fields.insert("Generation", "3.7");
        assert_eq!(fields.number("Area"), 0.0);
        assert_eq!(fields.number("Shares"), 0.0);
        assert_eq!(fields.integer("Generation"), 3);
        assert!(!fields.flag("Effects"));
    }

    #[test]
    fn title_falls_back_to_card_name() {
        let mut fields = CardFields::new();
        fields.insert("Category", "deeds");
        match fields.into_attributes(RecordKind::SupportiveDoc, "Deed 12") {
            RecordAttributes::SupportiveDoc(doc) => {
                assert_eq!(doc.title, "Deed 12");
                assert_eq!(doc.category, "deeds");
            }
            other => panic!("unexpected attributes: {other:?}"),
        }
    }
}
