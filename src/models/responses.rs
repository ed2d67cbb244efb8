// API response models

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =========================
// Generic wrapper (matches the backend's { success, data, error } convention)
// =========================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "text_or_none"
    )]
    pub error: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "text_or_none"
    )]
    pub message: Option<String>,
}

/// Keeps string values; objects, numbers and nulls become `None`.
fn text_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            message: None,
        }
    }

    /// `error`, else `message`, else nothing.
    pub fn failure_text(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

// =========================
// Submit
// =========================

/// What a successful create/register call hands back to the controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    /// Server-assigned reference; the controller generates a fallback when absent.
    pub reference_number: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl SubmitReceipt {
    /// Build a receipt from a created record, picking up `referenceNumber` when present.
    pub fn from_record(record: Option<Value>) -> Self {
        let reference_number = record.as_ref().and_then(|r| {
            ["referenceNumber", "reference_number", "reference"]
                .iter()
                .find_map(|k| r.get(*k).and_then(Value::as_str))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        });
        Self {
            reference_number,
            data: record,
        }
    }
}
