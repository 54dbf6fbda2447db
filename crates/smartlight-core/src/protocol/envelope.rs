//! Two-level single-key JSON envelope wrapping every command and result.
//!
//! ```text
//! request:  {"system": {"get_sysinfo": null}}
//! response: {"system": {"get_sysinfo": {"err_code": 0, "model": "LB130(US)", ...}}}
//!            ^^^^^^^^   ^^^^^^^^^^^^^  ^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^
//!            namespace  command        parameters (request) / result object (response)
//! ```
//!
//! [`wrap`] builds the structure; [`unwrap`] descends both levels and hands
//! back the innermost value.  Validating the `err_code` inside the result is
//! the caller's job, because the cloud relay delivers the envelope inside an
//! extra JSON string layer and local transports do not.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::trace;

use crate::protocol::error::ProtocolError;

/// Result field carrying the device status code.
pub const ERR_CODE: &str = "err_code";
/// Result field carrying the device status message.
pub const ERR_MSG: &str = "err_msg";

/// A command addressed to one namespace of a device.
///
/// # Examples
///
/// ```rust
/// use serde_json::json;
/// use smartlight_core::Request;
///
/// let req = Request::new("system", "get_sysinfo");
/// assert_eq!(req.to_value(), json!({"system": {"get_sysinfo": null}}));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    namespace: String,
    command: String,
    params: Option<Value>,
}

impl Request {
    /// Creates a request with no parameters (`null` on the wire).
    pub fn new(namespace: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            command: command.into(),
            params: None,
        }
    }

    /// Attaches a typed parameter object.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Json`] if `params` cannot be represented as JSON.
    pub fn with_params<P: Serialize>(self, params: &P) -> Result<Self, ProtocolError> {
        let value = serde_json::to_value(params)?;
        Ok(self.with_value(value))
    }

    /// Attaches an already-built JSON parameter value.
    pub fn with_value(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Builds the envelope for this request.
    pub fn to_value(&self) -> Value {
        wrap(&self.namespace, &self.command, self.params.clone())
    }

    /// Serializes the envelope to compact, ASCII-only JSON text.
    pub fn to_json(&self) -> String {
        to_wire_json(&self.to_value())
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Builds `{namespace: {command: params}}`.
///
/// `None` becomes `null`.  Top-level `null` fields of an object are dropped so
/// that unset optional parameters are never sent.
pub fn wrap(namespace: &str, command: &str, params: Option<Value>) -> Value {
    let params = match params {
        Some(Value::Object(map)) => Value::Object(compact(map)),
        Some(other) => other,
        None => Value::Null,
    };

    let mut inner = Map::with_capacity(1);
    inner.insert(command.to_string(), params);
    let mut outer = Map::with_capacity(1);
    outer.insert(namespace.to_string(), Value::Object(inner));
    Value::Object(outer)
}

/// Serializes `value` to compact JSON with every non-ASCII character written
/// as a `\uXXXX` escape (UTF-16 surrogate pairs above U+FFFF).
///
/// The cipher works on single bytes per character, so text handed to it must
/// be ASCII.
pub fn to_wire_json(value: &Value) -> String {
    let text = value.to_string();
    if text.is_ascii() {
        return text;
    }

    // Non-ASCII can only occur inside string literals, where an escape is
    // always valid.
    let mut out = String::with_capacity(text.len() + 16);
    let mut units = [0u16; 2];
    for ch in text.chars() {
        if ch.is_ascii() {
            out.push(ch);
        } else {
            for unit in ch.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    out
}

/// Descends the namespace and command levels and returns the innermost value.
///
/// If the namespace level itself carries an `err_code` (the device rejected
/// the whole namespace) that object is returned as the result instead.
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedEnvelope`] if either level is not an
/// object with exactly one key.
pub fn unwrap(envelope: Value) -> Result<Value, ProtocolError> {
    let (namespace, body) = single_entry(envelope, "namespace")?;

    if body.get(ERR_CODE).is_some() {
        trace!("namespace-level status in {namespace} response");
        return Ok(body);
    }

    let (_command, result) = single_entry(body, "command")?;
    Ok(result)
}

/// Returns the first top-level key of an envelope, if any.
pub fn namespace_of(envelope: &Value) -> Option<&str> {
    envelope
        .as_object()
        .and_then(|map| map.keys().next())
        .map(String::as_str)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn compact(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter().filter(|(_, v)| !v.is_null()).collect()
}

fn single_entry(value: Value, level: &str) -> Result<(String, Value), ProtocolError> {
    match value {
        Value::Object(map) => {
            let count = map.len();
            match (count, map.into_iter().next()) {
                (1, Some(entry)) => Ok(entry),
                _ => Err(ProtocolError::MalformedEnvelope(format!(
                    "expected one {level} key, found {count}"
                ))),
            }
        }
        other => Err(ProtocolError::MalformedEnvelope(format!(
            "expected {level} object, found {}",
            kind_of(&other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
