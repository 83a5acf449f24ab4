//! Dynamic field typing (§9 design notes): input documents arrive as open key/value bags;
//! coercion is schema-driven at ingest time. Values are represented as a tagged sum of scalar
//! kinds rather than a dynamic type, so the rest of the core never touches `serde_json::Value`
//! once a document has passed through `Schema::coerce`.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// The open key/value bag a caller submits, before schema coercion.
pub type RawDoc = serde_json::Map<String, Value>;

/// Stringifies a caller-submitted ID the way `Indexer::build_doc`'s PK join does (§4.9
/// "stringify docID"): a client may submit `{"id": 7}` for an integer PK field just as
/// naturally as `{"id": "7"}`, so both must produce the same `docID`.
pub fn stringify_id(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(Error::BadRequest(format!("id must be a string, number, or bool, got {other}"))),
    }
}

/// A single coerced field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl DocValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DocValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for DocValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocValue::Str(s) => f.write_str(s),
            DocValue::Int(i) => write!(f, "{i}"),
            DocValue::Float(v) => write!(f, "{v}"),
            DocValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// The materialized field-value mapping retained verbatim by the backend (§3 `StoredDoc`).
pub type StoredDoc = HashMap<String, DocValue>;
