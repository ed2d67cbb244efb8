// Field values held by the form store

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// One element of a repeatable section (team member, person involved, attachment, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubRecord {
    pub id: String,
    pub fields: BTreeMap<String, String>,
}

impl SubRecord {
    /// A record with every listed field present and empty.
    pub fn blank(id: impl Into<String>, field_names: &[&str]) -> Self {
        Self {
            id: id.into(),
            fields: field_names
                .iter()
                .map(|n| (n.to_string(), String::new()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.fields.insert(name.to_string(), value.into());
    }

    /// Trimmed value, `None` when blank.
    pub fn non_empty(&self, name: &str) -> Option<String> {
        let v = self.get(name).trim();
        if v.is_empty() {
            None
        } else {
            Some(v.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Date(Option<NaiveDate>),
    List(Vec<SubRecord>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// Empty for the purposes of a required-field check.
    /// Lists are never "empty"; list minimums are checked separately.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Date(d) => d.is_none(),
            FieldValue::List(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => *d,
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SubRecord]> {
        match self {
            FieldValue::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }
}

/// All field values of one wizard, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldMap(BTreeMap<String, FieldValue>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: FieldValue) -> Self {
        self.0.insert(name.to_string(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldValue> {
        self.0.get_mut(name)
    }

    pub fn insert(&mut self, name: &str, value: FieldValue) {
        self.0.insert(name.to_string(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    /// Trimmed text value; empty string when missing or not text.
    pub fn text(&self, name: &str) -> String {
        self.get(name)
            .and_then(FieldValue::as_text)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }

    /// Trimmed text value, `None` when blank.
    pub fn opt_text(&self, name: &str) -> Option<String> {
        let v = self.text(name);
        if v.is_empty() {
            None
        } else {
            Some(v)
        }
    }

    pub fn date(&self, name: &str) -> Option<NaiveDate> {
        self.get(name).and_then(FieldValue::as_date)
    }

    /// ISO `YYYY-MM-DD`, empty string when unset.
    pub fn date_string(&self, name: &str) -> String {
        self.date(name)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }

    pub fn list(&self, name: &str) -> &[SubRecord] {
        self.get(name).and_then(FieldValue::as_list).unwrap_or(&[])
    }
}
