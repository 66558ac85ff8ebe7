//! Callback kinds and the normalized response envelope
//!
//! The workflow engine posts loosely shaped JSON. Every field the wizard may
//! read is copied out with an explicit fallback, so a rendered envelope never
//! contains an undefined value. A recognized field carrying the wrong JSON type
//! is treated as absent; unrecognized fields are dropped.
//!
//! Normalization is idempotent: feeding a serialized envelope back through
//! [`Envelope::normalize`] yields the same envelope. Stores and clients rely on
//! this to rebuild typed envelopes from stored or received JSON.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

// ========================================
// Callback Kinds
// ========================================

/// Which wizard screen a callback belongs to
///
/// Each kind has its own route and its own key space in the mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackKind {
    /// Guidance/content pair for the topic ideation step
    Content,
    /// Worked example for a selected formula
    Example,
    /// Drafted post
    Generation,
    /// Free-form copilot ("Marcus") message
    Assistant,
}

impl CallbackKind {
    pub const ALL: [CallbackKind; 4] = [
        CallbackKind::Content,
        CallbackKind::Example,
        CallbackKind::Generation,
        CallbackKind::Assistant,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CallbackKind::Content => "content",
            CallbackKind::Example => "example",
            CallbackKind::Generation => "generation",
            CallbackKind::Assistant => "assistant",
        }
    }

    /// HTTP route serving both submission (POST) and retrieval (GET)
    pub fn route_path(self) -> &'static str {
        match self {
            CallbackKind::Content => "/api/content-callback",
            CallbackKind::Example => "/api/example-callback",
            CallbackKind::Generation => "/api/generation-callback",
            CallbackKind::Assistant => "/api/marcus-callback",
        }
    }
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallbackKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "content" => Ok(CallbackKind::Content),
            "example" => Ok(CallbackKind::Example),
            "generation" => Ok(CallbackKind::Generation),
            "assistant" | "marcus" => Ok(CallbackKind::Assistant),
            other => Err(Error::UnknownKind(other.to_string())),
        }
    }
}

// ========================================
// Envelope Variants
// ========================================

/// Content/guidance pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentEnvelope {
    pub response_type: String,
    pub processing_status: String,
    /// RFC 3339; arrival time when the workflow omits it
    pub timestamp: String,
    pub conversation_stage: String,
    pub guidance: Map<String, Value>,
    pub content: Map<String, Value>,
}

/// Formula example with writing guidance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExampleEnvelope {
    pub formula_id: String,
    pub formula_name: String,
    pub writing_guidance_sections: Vec<Value>,
    /// Section count; defaults to `writing_guidance_sections.len()`
    pub total_sections: u64,
    pub template_variables: Map<String, Value>,
    pub example_post: String,
    /// Epoch milliseconds
    pub timestamp: i64,
}

/// Generated post
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationEnvelope {
    pub generated_content: String,
    /// Falls back to `generated_content`
    pub full_post: String,
    /// Falls back to `generated_content`
    pub linkedin_ready: String,
    /// Epoch milliseconds
    pub timestamp: i64,
}

/// Generic copilot message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssistantEnvelope {
    pub message: String,
    pub topics: Vec<String>,
    pub content_category: String,
    pub questions: Vec<String>,
    /// Epoch milliseconds
    pub timestamp: i64,
}

/// Normalized, fully defaulted callback payload
///
/// Serializes without a tag: the `data` object handed to the wizard holds only
/// the kind's own fields. The kind travels with the route.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    Content(ContentEnvelope),
    Example(ExampleEnvelope),
    Generation(GenerationEnvelope),
    Assistant(AssistantEnvelope),
}

impl Envelope {
    /// Build the envelope for `kind` from a callback body
    ///
    /// `received_at` fills any timestamp the body does not carry.
    pub fn normalize(kind: CallbackKind, body: &Map<String, Value>, received_at: DateTime<Utc>) -> Self {
        let arrival_millis = received_at.timestamp_millis();

        match kind {
            CallbackKind::Content => Envelope::Content(ContentEnvelope {
                response_type: string_field(body, "response_type").unwrap_or_default(),
                processing_status: string_field(body, "processing_status").unwrap_or_default(),
                timestamp: string_field(body, "timestamp").unwrap_or_else(|| {
                    received_at.to_rfc3339_opts(SecondsFormat::Millis, true)
                }),
                conversation_stage: string_field(body, "conversation_stage").unwrap_or_default(),
                guidance: object_field(body, "guidance").unwrap_or_default(),
                content: object_field(body, "content").unwrap_or_default(),
            }),
            CallbackKind::Example => {
                let sections = array_field(body, "writing_guidance_sections").unwrap_or_default();
                let total_sections =
                    u64_field(body, "total_sections").unwrap_or(sections.len() as u64);
                Envelope::Example(ExampleEnvelope {
                    formula_id: string_field(body, "formula_id").unwrap_or_default(),
                    formula_name: string_field(body, "formula_name").unwrap_or_default(),
                    writing_guidance_sections: sections,
                    total_sections,
                    template_variables: object_field(body, "template_variables").unwrap_or_default(),
                    example_post: string_field(body, "example_post").unwrap_or_default(),
                    timestamp: i64_field(body, "timestamp").unwrap_or(arrival_millis),
                })
            }
            CallbackKind::Generation => {
                let generated_content = string_field(body, "generated_content").unwrap_or_default();
                Envelope::Generation(GenerationEnvelope {
                    full_post: string_field(body, "full_post")
                        .unwrap_or_else(|| generated_content.clone()),
                    linkedin_ready: string_field(body, "linkedin_ready")
                        .unwrap_or_else(|| generated_content.clone()),
                    generated_content,
                    timestamp: i64_field(body, "timestamp").unwrap_or(arrival_millis),
                })
            }
            CallbackKind::Assistant => Envelope::Assistant(AssistantEnvelope {
                message: string_field(body, "message").unwrap_or_default(),
                topics: string_list_field(body, "topics").unwrap_or_default(),
                content_category: string_field(body, "content_category").unwrap_or_default(),
                questions: string_list_field(body, "questions").unwrap_or_default(),
                timestamp: i64_field(body, "timestamp").unwrap_or(arrival_millis),
            }),
        }
    }

    /// Rebuild a typed envelope from JSON previously produced by [`Envelope::to_value`]
    pub fn from_value(kind: CallbackKind, value: Value, received_at: DateTime<Utc>) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self::normalize(kind, &map, received_at)),
            other => Err(Error::Envelope(format!(
                "expected a JSON object for {} envelope, got {}",
                kind,
                json_type_name(&other)
            ))),
        }
    }

    pub fn kind(&self) -> CallbackKind {
        match self {
            Envelope::Content(_) => CallbackKind::Content,
            Envelope::Example(_) => CallbackKind::Example,
            Envelope::Generation(_) => CallbackKind::Generation,
            Envelope::Assistant(_) => CallbackKind::Assistant,
        }
    }

    pub fn to_value(&self) -> Value {
        // Every variant is plain strings, numbers, arrays and maps
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// ========================================
// Field Extraction
// ========================================

fn string_field(body: &Map<String, Value>, key: &str) -> Option<String> {
    body.get(key).and_then(Value::as_str).map(str::to_string)
}

fn object_field(body: &Map<String, Value>, key: &str) -> Option<Map<String, Value>> {
    body.get(key).and_then(Value::as_object).cloned()
}

fn array_field(body: &Map<String, Value>, key: &str) -> Option<Vec<Value>> {
    body.get(key).and_then(Value::as_array).cloned()
}

/// Array of strings; non-string elements are skipped
fn string_list_field(body: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    body.get(key).and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    })
}

fn u64_field(body: &Map<String, Value>, key: &str) -> Option<u64> {
    body.get(key).and_then(Value::as_u64)
}

fn i64_field(body: &Map<String, Value>, key: &str) -> Option<i64> {
    body.get(key).and_then(Value::as_i64)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ========================================
// Tests
// ========================================
