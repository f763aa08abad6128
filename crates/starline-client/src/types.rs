//! Request and response types for the vendor wire format
//!
//! The vendor is loose with scalar types (numeric ids arrive as numbers or
//! strings depending on the endpoint), so id-bearing fields deserialize
//! tolerantly and the rest of each record is carried as opaque JSON.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Render a JSON scalar as a string; `None` for anything non-scalar
pub(crate) fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_to_string(&value).ok_or_else(|| D::Error::custom("expected string or number"))
}

/// A vendor-tracked alarm/telemetry unit.
///
/// Only `device_id` is interpreted by this client; everything else the
/// vendor sends rides along in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    #[serde(deserialize_with = "string_or_number")]
    pub device_id: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// `user_info` response body
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub devices: Vec<Device>,
}

/// An asynchronous command to dispatch to a device
#[derive(Debug, Clone, Serialize)]
pub struct CommandRequest {
    #[serde(rename = "type")]
    pub command_type: String,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<serde_json::Map<String, Value>>,
}

impl CommandRequest {
    pub fn new(command_type: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            command_type: command_type.into(),
            value: value.into(),
            variables: None,
        }
    }

    /// Attach the optional per-command variables map
    pub fn with_variables(mut self, variables: serde_json::Map<String, Value>) -> Self {
        self.variables = Some(variables);
        self
    }
}

/// Body of a track fetch.
///
/// The flags are fixed by the vendor contract: one undivided way per day,
/// device-local timezone, server-side point filtering.
#[derive(Debug, Clone, Serialize)]
pub struct TrackQuery {
    pub begin: i64,
    pub end: i64,
    pub split_way: bool,
    pub div_days: bool,
    pub time_zone: bool,
    pub filtering: bool,
}

impl TrackQuery {
    /// Query the interval `[begin, end]`, both unix timestamps in seconds
    pub fn new(begin: i64, end: i64) -> Self {
        Self {
            begin,
            end,
            split_way: false,
            div_days: true,
            time_zone: true,
            filtering: true,
        }
    }
}
