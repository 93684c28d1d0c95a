//! Bolt v1 response messages (server to client).

use std::collections::HashMap;

use super::tag;
use crate::bolt::packstream::{PackStreamError, Structure, Value};

/// All Bolt v1 response messages.
#[derive(Debug, Clone)]
pub enum Response {
    /// SUCCESS - request completed, with metadata
    Success(Success),
    /// RECORD - one row of a result stream
    Record(Record),
    /// FAILURE - request failed, with code and message
    Failure(Failure),
    /// IGNORED - request skipped because an earlier one failed
    Ignored,
}

impl Response {
    /// The message signature byte.
    pub fn tag(&self) -> u8 {
        match self {
            Response::Success(_) => tag::SUCCESS,
            Response::Record(_) => tag::RECORD,
            Response::Failure(_) => tag::FAILURE,
            Response::Ignored => tag::IGNORED,
        }
    }

    /// Message name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Response::Success(_) => "SUCCESS",
            Response::Record(_) => "RECORD",
            Response::Failure(_) => "FAILURE",
            Response::Ignored => "IGNORED",
        }
    }

    /// Whether this is a SUCCESS.
    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success(_))
    }

    /// Convert to a PackStream structure.
    pub fn to_structure(&self) -> Structure {
        match self {
            Response::Success(msg) => Structure::new(
                tag::SUCCESS,
                vec![Value::Map(msg.metadata.clone())],
            ),
            Response::Record(msg) => Structure::new(
                tag::RECORD,
                vec![Value::List(msg.values.clone())],
            ),
            Response::Failure(msg) => Structure::new(
                tag::FAILURE,
                vec![Value::Map(msg.metadata.clone())],
            ),
            Response::Ignored => Structure::new(tag::IGNORED, vec![]),
        }
    }

    /// Parse from a PackStream structure.
    pub fn from_structure(s: &Structure) -> Result<Self, PackStreamError> {
        match s.tag {
            tag::SUCCESS => Ok(Response::Success(Success {
                metadata: single_map_field(s, "SUCCESS")?,
            })),
            tag::RECORD => {
                let values = s
                    .fields
                    .first()
                    .and_then(|v| v.as_list())
                    .ok_or_else(|| {
                        PackStreamError::InvalidStructure("RECORD fields must be list".into())
                    })?
                    .to_vec();
                Ok(Response::Record(Record { values }))
            }
            tag::FAILURE => Ok(Response::Failure(Failure {
                metadata: single_map_field(s, "FAILURE")?,
            })),
            tag::IGNORED => Ok(Response::Ignored),
            other => Err(PackStreamError::UnknownSignature(other)),
        }
    }
}

fn single_map_field(
    s: &Structure,
    name: &str,
) -> Result<HashMap<String, Value>, PackStreamError> {
    s.fields
        .first()
        .and_then(|v| v.as_map())
        .cloned()
        .ok_or_else(|| {
            PackStreamError::InvalidStructure(format!("{} metadata must be map", name))
        })
}

/// SUCCESS message metadata.
#[derive(Debug, Clone, Default)]
pub struct Success {
    /// Server-supplied metadata
    pub metadata: HashMap<String, Value>,
}

impl Success {
    /// Create a SUCCESS with the given metadata.
    pub fn with_metadata(metadata: HashMap<String, Value>) -> Self {
        Self { metadata }
    }

    /// Get a metadata entry.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Column names from a RUN header SUCCESS. Absent or malformed `fields`
    /// yields `None`.
    pub fn fields(&self) -> Option<Vec<String>> {
        let list = self.metadata.get("fields")?.as_list()?;
        list.iter()
            .map(|v| v.as_str().map(|s| s.to_string()))
            .collect()
    }
}

/// RECORD message: the values of one row.
#[derive(Debug, Clone, Default)]
pub struct Record {
    /// Row values, positionally matching the header's column names
    pub values: Vec<Value>,
}

impl Record {
    /// Create a record from values.
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }
}

/// FAILURE message metadata. The server reports a structured `code` and a
/// human-readable `message`.
#[derive(Debug, Clone, Default)]
pub struct Failure {
    /// Server-supplied metadata
    pub metadata: HashMap<String, Value>,
}

impl Failure {
    /// Create a FAILURE with the given code and message.
    pub fn new(code: &str, message: &str) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("code".to_string(), Value::String(code.to_string()));
        metadata.insert("message".to_string(), Value::String(message.to_string()));
        Self { metadata }
    }

    /// The failure code, e.g. `Neo.ClientError.Statement.SyntaxError`.
    pub fn code(&self) -> &str {
        self.metadata
            .get("code")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
    }

    /// The failure message.
    pub fn message(&self) -> &str {
        self.metadata
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
    }
}
