//! JSON payload shapes exchanged with the server.
//!
//! ```text
//! heartbeat  → {"status":"online","ts":<ms>}
//! push       → {"name":..,"value":..,"type":"int"|"float"|"bool"|"string"}
//! ack        ← {"success":bool}          (optional)
//! pull       ← {"variables":[{"name":..,"type":..,"value":..}, ...]}
//! ```
//!
//! Pull bodies are decoded completely before anything touches the cache,
//! so a single malformed entry rejects the whole body.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::app::variable::{VarType, Variable};
use crate::error::SyncError;

// ── Outbound ──────────────────────────────────────────────────

#[derive(Serialize)]
struct Heartbeat<'a> {
    status: &'a str,
    ts: u64,
}

#[derive(Serialize)]
struct Push<'a> {
    name: &'a str,
    value: &'a str,
    #[serde(rename = "type")]
    type_label: &'a str,
}

#[derive(Serialize)]
struct VariableList<'a> {
    variables: Vec<Push<'a>>,
}

// Serialising plain strings and integers cannot fail, hence the defaults.

pub fn encode_heartbeat(ts_ms: u64) -> String {
    serde_json::to_string(&Heartbeat {
        status: "online",
        ts: ts_ms,
    })
    .unwrap_or_default()
}

pub fn encode_push(name: &str, var_type: VarType, value: &str) -> String {
    serde_json::to_string(&Push {
        name,
        value,
        type_label: var_type.label(),
    })
    .unwrap_or_default()
}

/// Encode variables in the pull-response shape, sorted by name.
pub fn encode_variables<'a>(vars: impl Iterator<Item = &'a Variable>) -> String {
    let mut variables: Vec<Push<'a>> = vars
        .map(|v| Push {
            name: &v.name,
            value: &v.value,
            type_label: v.var_type.label(),
        })
        .collect();
    variables.sort_by(|a, b| a.name.cmp(b.name));
    serde_json::to_string(&VariableList { variables }).unwrap_or_default()
}

// ── Inbound ───────────────────────────────────────────────────

/// Lenient acknowledgement check.
///
/// Only a JSON object carrying `"success": false` counts as a rejection.
/// A missing flag, a non-boolean flag or an unparseable body all count as
/// acknowledged: the request reached the server.
pub fn is_acknowledged(body: &str) -> bool {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => {
            !matches!(map.get("success"), Some(serde_json::Value::Bool(false)))
        }
        _ => true,
    }
}

/// One decoded pull entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PulledVariable {
    pub name: String,
    pub var_type: VarType,
    pub value: String,
}

#[derive(Deserialize)]
struct PullBody {
    variables: Vec<PullEntry>,
}

#[derive(Deserialize)]
struct PullEntry {
    name: String,
    #[serde(rename = "type", default)]
    type_label: Option<String>,
    value: ScalarValue,
}

/// Values are normally strings; scalar JSON values are tolerated and
/// rendered as text.  `null`, objects and arrays are rejected.
#[derive(Deserialize)]
#[serde(untagged)]
enum ScalarValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl ScalarValue {
    fn into_text(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }
}

/// Decode a pull response body.  All-or-nothing.
pub fn decode_variables(body: &str) -> Result<Vec<PulledVariable>, SyncError> {
    let parsed: PullBody = serde_json::from_str(body).map_err(|e| {
        debug!("Wire: pull body rejected: {}", e);
        SyncError::ParseFailed("malformed variable list")
    })?;

    parsed
        .variables
        .into_iter()
        .map(|entry| {
            if entry.name.is_empty() {
                return Err(SyncError::ParseFailed("empty variable name"));
            }
            Ok(PulledVariable {
                var_type: VarType::from_label(entry.type_label.as_deref().unwrap_or("")),
                name: entry.name,
                value: entry.value.into_text(),
            })
        })
        .collect()
}
