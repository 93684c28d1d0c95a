//! Bolt v1 request messages (client to server).

use std::collections::HashMap;

use super::tag;
use crate::bolt::packstream::{PackStreamError, Structure, Value};

/// Authentication token for the INIT message.
///
/// Version 1 knows two schemes: `"none"` when no principal is given, and
/// `"basic"` with a principal and credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthToken {
    /// Principal (username); empty means anonymous
    pub principal: String,
    /// Credentials (password)
    pub credentials: String,
}

impl AuthToken {
    /// Basic authentication.
    pub fn basic(principal: &str, credentials: &str) -> Self {
        Self {
            principal: principal.to_string(),
            credentials: credentials.to_string(),
        }
    }

    /// Anonymous authentication.
    pub fn none() -> Self {
        Self::default()
    }

    /// Convert to the wire map. An empty principal selects the `"none"`
    /// scheme and omits the credential fields entirely.
    pub fn to_map(&self) -> HashMap<String, Value> {
        let mut map = HashMap::new();
        if self.principal.is_empty() {
            map.insert("scheme".to_string(), Value::String("none".to_string()));
        } else {
            map.insert("scheme".to_string(), Value::String("basic".to_string()));
            map.insert(
                "principal".to_string(),
                Value::String(self.principal.clone()),
            );
            map.insert(
                "credentials".to_string(),
                Value::String(self.credentials.clone()),
            );
        }
        map
    }
}

/// INIT message: identifies the client and authenticates.
#[derive(Debug, Clone)]
pub struct Init {
    /// Client agent string
    pub client_agent: String,
    /// Authentication token
    pub auth: AuthToken,
}

impl Init {
    /// Create a new INIT message.
    pub fn new(client_agent: &str, auth: AuthToken) -> Self {
        Self {
            client_agent: client_agent.to_string(),
            auth,
        }
    }

    /// Convert to a PackStream structure.
    pub fn to_structure(&self) -> Structure {
        Structure::new(
            tag::INIT,
            vec![
                Value::String(self.client_agent.clone()),
                Value::Map(self.auth.to_map()),
            ],
        )
    }
}

/// RUN message: submits a statement with named parameters.
#[derive(Debug, Clone)]
pub struct Run {
    /// The statement text, forwarded opaquely
    pub statement: String,
    /// Named parameters
    pub parameters: HashMap<String, Value>,
}

impl Run {
    /// Create a new RUN message.
    pub fn new(statement: &str, parameters: HashMap<String, Value>) -> Self {
        Self {
            statement: statement.to_string(),
            parameters,
        }
    }

    /// Convert to a PackStream structure.
    pub fn to_structure(&self) -> Structure {
        Structure::new(
            tag::RUN,
            vec![
                Value::String(self.statement.clone()),
                Value::Map(self.parameters.clone()),
            ],
        )
    }
}

/// All Bolt v1 request messages.
#[derive(Debug, Clone)]
pub enum Request {
    /// INIT - identify and authenticate
    Init(Init),
    /// RUN - submit a statement
    Run(Run),
    /// PULL_ALL - stream all pending records
    PullAll,
    /// DISCARD_ALL - drop all pending records
    DiscardAll,
    /// ACK_FAILURE - acknowledge a FAILURE response
    AckFailure,
    /// RESET - return the server to a clean session state
    Reset,
}

impl Request {
    /// The message signature byte.
    pub fn tag(&self) -> u8 {
        match self {
            Request::Init(_) => tag::INIT,
            Request::Run(_) => tag::RUN,
            Request::PullAll => tag::PULL_ALL,
            Request::DiscardAll => tag::DISCARD_ALL,
            Request::AckFailure => tag::ACK_FAILURE,
            Request::Reset => tag::RESET,
        }
    }

    /// Message name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Request::Init(_) => "INIT",
            Request::Run(_) => "RUN",
            Request::PullAll => "PULL_ALL",
            Request::DiscardAll => "DISCARD_ALL",
            Request::AckFailure => "ACK_FAILURE",
            Request::Reset => "RESET",
        }
    }

    /// Convert to a PackStream structure.
    pub fn to_structure(&self) -> Structure {
        match self {
            Request::Init(msg) => msg.to_structure(),
            Request::Run(msg) => msg.to_structure(),
            Request::PullAll => Structure::new(tag::PULL_ALL, vec![]),
            Request::DiscardAll => Structure::new(tag::DISCARD_ALL, vec![]),
            Request::AckFailure => Structure::new(tag::ACK_FAILURE, vec![]),
            Request::Reset => Structure::new(tag::RESET, vec![]),
        }
    }

    /// Parse from a PackStream structure.
    pub fn from_structure(s: &Structure) -> Result<Self, PackStreamError> {
        match s.tag {
            tag::INIT => {
                if s.fields.len() != 2 {
                    return Err(PackStreamError::InvalidStructure(
                        "INIT requires client agent and auth token".into(),
                    ));
                }
                let client_agent = s.fields[0]
                    .as_str()
                    .ok_or_else(|| {
                        PackStreamError::InvalidStructure("INIT client agent must be string".into())
                    })?
                    .to_string();
                let auth_map = s.fields[1].as_map().ok_or_else(|| {
                    PackStreamError::InvalidStructure("INIT auth token must be map".into())
                })?;
                let auth = AuthToken {
                    principal: auth_map
                        .get("principal")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    credentials: auth_map
                        .get("credentials")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                };
                Ok(Request::Init(Init { client_agent, auth }))
            }
            tag::RUN => {
                if s.fields.len() != 2 {
                    return Err(PackStreamError::InvalidStructure(
                        "RUN requires statement and parameters".into(),
                    ));
                }
                let statement = s.fields[0]
                    .as_str()
                    .ok_or_else(|| {
                        PackStreamError::InvalidStructure("RUN statement must be string".into())
                    })?
                    .to_string();
                let parameters = s.fields[1]
                    .as_map()
                    .ok_or_else(|| {
                        PackStreamError::InvalidStructure("RUN parameters must be map".into())
                    })?
                    .clone();
                Ok(Request::Run(Run {
                    statement,
                    parameters,
                }))
            }
            tag::PULL_ALL => Ok(Request::PullAll),
            tag::DISCARD_ALL => Ok(Request::DiscardAll),
            tag::ACK_FAILURE => Ok(Request::AckFailure),
            tag::RESET => Ok(Request::Reset),
            other => Err(PackStreamError::UnknownSignature(other)),
        }
    }
}
