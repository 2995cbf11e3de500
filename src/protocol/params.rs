//! Request body decoding.
//!
//! The body is read twice: once into a loose JSON object so fields the
//! gateway does not know about pass through harmlessly, and once strictly
//! into [`GenerationOptions`] so a mistyped sampling knob is rejected.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    error::ServiceError,
    protocol::{ChatMessage, GenerationOptions},
};

pub const DEFAULT_MODEL: &str = "default";

#[derive(Deserialize)]
struct OptionsEnvelope {
    #[serde(flatten)]
    top_level: GenerationOptions,
    #[serde(default)]
    options: Option<GenerationOptions>,
}

/// A request body split into loose fields and typed generation options.
#[derive(Debug, Clone)]
pub struct RequestParams {
    fields: Map<String, Value>,
    pub options: GenerationOptions,
}

impl RequestParams {
    pub fn decode(body: &[u8]) -> Result<Self, ServiceError> {
        let fields = match serde_json::from_slice::<Value>(body)? {
            Value::Object(fields) => fields,
            other => {
                return Err(ServiceError::Decode(format!(
                    "expected a JSON object, found {}",
                    json_kind(&other)
                )));
            }
        };

        let envelope: OptionsEnvelope = serde_json::from_slice(body)?;
        let options = match envelope.options {
            Some(nested) => envelope.top_level.merged(nested),
            None => envelope.top_level,
        };

        Ok(Self { fields, options })
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    pub fn bool_field(&self, name: &str) -> Option<bool> {
        self.field(name).and_then(Value::as_bool)
    }

    /// Falls back to [`DEFAULT_MODEL`] when absent, blank, or not a string.
    pub fn model(&self) -> &str {
        self.str_field("model")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(DEFAULT_MODEL)
    }

    pub fn prompt(&self) -> &str {
        self.str_field("prompt").unwrap_or("")
    }

    pub fn stream(&self) -> bool {
        self.bool_field("stream").unwrap_or(false)
    }

    /// Non-object entries are skipped; missing roles read as `user` and
    /// missing content as empty text.
    pub fn messages(&self) -> Vec<ChatMessage> {
        let Some(items) = self.field("messages").and_then(Value::as_array) else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(Value::as_object)
            .map(|item| {
                let role = item.get("role").and_then(Value::as_str).unwrap_or("user");
                let content = item.get("content").and_then(Value::as_str).unwrap_or("");
                ChatMessage::new(role, content)
            })
            .collect()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
