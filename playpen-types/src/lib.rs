//! Shared types for playpen
//!
//! This crate provides the types exchanged between the host and the isolated
//! execution context: fragment identifiers, run identifiers, diagnostic events
//! and the wire protocol that carries them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One of the three fixed source fragments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FragmentKind {
    Markup,
    Style,
    Script,
}

impl FragmentKind {
    /// Every kind, in display order
    pub const ALL: [FragmentKind; 3] = [FragmentKind::Markup, FragmentKind::Style, FragmentKind::Script];

    /// Editor language id for this fragment
    pub fn id(&self) -> &'static str {
        match self {
            FragmentKind::Markup => "html",
            FragmentKind::Style => "css",
            FragmentKind::Script => "javascript",
        }
    }

    /// Position of this kind in [`FragmentKind::ALL`]
    pub fn index(&self) -> usize {
        match self {
            FragmentKind::Markup => 0,
            FragmentKind::Style => 1,
            FragmentKind::Script => 2,
        }
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A fragment id outside the closed set was requested
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown fragment kind: {0}")]
pub struct UnknownFragmentKind(pub String);

impl FromStr for FragmentKind {
    type Err = UnknownFragmentKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "html" | "markup" => Ok(FragmentKind::Markup),
            "css" | "style" => Ok(FragmentKind::Style),
            "javascript" | "js" | "script" => Ok(FragmentKind::Script),
            other => Err(UnknownFragmentKind(other.to_string())),
        }
    }
}

/// A named source fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeFragment {
    pub id: FragmentKind,
    pub value: String,
}

impl CodeFragment {
    pub fn new(id: FragmentKind, value: impl Into<String>) -> Self {
        Self {
            id,
            value: value.into(),
        }
    }

    pub fn empty(id: FragmentKind) -> Self {
        Self::new(id, String::new())
    }
}

/// Identifier of one load of the isolated context
///
/// Every message posted by a run carries its id as the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(pub u64);

impl RunId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for RunId {
    fn from(id: u64) -> Self {
        RunId(id)
    }
}

impl From<RunId> for u64 {
    fn from(id: RunId) -> Self {
        id.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run#{}", self.0)
    }
}

/// A complete, self-contained executable document
///
/// Produced by the composer and consumed by the isolated context. The text is
/// opaque to everything in between.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComposedDocument(String);

impl ComposedDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for ComposedDocument {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl AsRef<str> for ComposedDocument {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Which console entry point produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    #[serde(rename = "console")]
    Log,
    #[serde(rename = "console_error")]
    Error,
}

impl DiagnosticKind {
    /// Value of the `type` field on the wire
    pub fn wire_type(&self) -> &'static str {
        match self {
            DiagnosticKind::Log => "console",
            DiagnosticKind::Error => "console_error",
        }
    }
}

/// One intercepted console call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEvent {
    pub kind: DiagnosticKind,
    /// Serialized call arguments, in call order
    pub payload: Vec<String>,
}

impl DiagnosticEvent {
    pub fn log(payload: Vec<String>) -> Self {
        Self {
            kind: DiagnosticKind::Log,
            payload,
        }
    }

    pub fn error(payload: Vec<String>) -> Self {
        Self {
            kind: DiagnosticKind::Error,
            payload,
        }
    }
}

/// Wire shape of a message posted by the isolated context
///
/// `{ "type": "console" | "console_error", "data": [string] }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    #[serde(rename = "type")]
    pub kind: DiagnosticKind,
    pub data: Vec<String>,
}

impl From<DiagnosticEvent> for OutboundMessage {
    fn from(event: DiagnosticEvent) -> Self {
        Self {
            kind: event.kind,
            data: event.payload,
        }
    }
}

/// A message received on the host side, decoded defensively
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    Log(Vec<String>),
    Error(Vec<String>),
    /// Anything that is not a recognized diagnostic message
    Unknown,
}

impl InboundMessage {
    /// Classify an arbitrary posted value
    ///
    /// Malformed shapes are not errors; they decode as [`InboundMessage::Unknown`].
    pub fn decode(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return InboundMessage::Unknown;
        };

        let payload = || match obj.get("data") {
            Some(Value::Array(items)) => items.iter().map(stringify_item).collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => vec![stringify_item(other)],
        };

        match obj.get("type").and_then(Value::as_str) {
            Some("console") => InboundMessage::Log(payload()),
            Some("console_error") => InboundMessage::Error(payload()),
            _ => InboundMessage::Unknown,
        }
    }

    pub fn into_event(self) -> Option<DiagnosticEvent> {
        match self {
            InboundMessage::Log(payload) => Some(DiagnosticEvent::log(payload)),
            InboundMessage::Error(payload) => Some(DiagnosticEvent::error(payload)),
            InboundMessage::Unknown => None,
        }
    }
}

/// A posted message as it arrives at the host
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Run that posted the message
    pub origin: RunId,
    pub data: Value,
}

impl Envelope {
    pub fn new(origin: RunId, data: Value) -> Self {
        Self { origin, data }
    }
}

/// Render a payload item the way a template literal would
pub fn stringify_item(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        },
        // Array.prototype.toString: elements joined by commas, null rendered empty
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => stringify_item(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}
