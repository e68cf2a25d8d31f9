//! Request parsing for the fixture protocol.
//!
//! A request is a JSON value carried in a frame (see `frame`). Only the
//! `command` field is inspected, matched case-sensitively:
//!
//! | Token               | Meaning                          |
//! |---------------------|----------------------------------|
//! | `LOOKUP`            | per-URL path statistics          |
//! | `LIST`              | currently tracked URLs           |
//! | `TOPO`              | topology graph                   |
//! | `LOCATIONS`         | AS locations                     |
//! | `ISD_WHITELIST`     | set the ISD whitelist            |
//! | `GET_ISD_WHITELIST` | read the ISD whitelist           |
//! | `GET_ISD_ENDPOINTS` | ISD endpoint addresses           |
//! | `CLEAR`             | clear the URL list               |

use serde_json::Value;
use std::fmt;

/// Parsed request command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `LOOKUP`
    Lookup,
    /// `LIST`
    List,
    /// `TOPO`
    Topology,
    /// `LOCATIONS`
    Locations,
    /// `ISD_WHITELIST`
    SetIsdWhitelist,
    /// `GET_ISD_WHITELIST`
    GetIsdWhitelist,
    /// `GET_ISD_ENDPOINTS`
    GetIsdEndpoints,
    /// `CLEAR`
    Clear,
    /// Missing, non-string or unrecognized command
    Unknown(Option<String>),
}

impl Command {
    /// Match a command token. Matching is case-sensitive.
    pub fn from_token(token: &str) -> Self {
        match token {
            "LOOKUP" => Command::Lookup,
            "LIST" => Command::List,
            "TOPO" => Command::Topology,
            "LOCATIONS" => Command::Locations,
            "ISD_WHITELIST" => Command::SetIsdWhitelist,
            "GET_ISD_WHITELIST" => Command::GetIsdWhitelist,
            "GET_ISD_ENDPOINTS" => Command::GetIsdEndpoints,
            "CLEAR" => Command::Clear,
            other => Command::Unknown(Some(other.to_string())),
        }
    }
}

/// Request parsing errors
#[derive(Debug)]
pub enum ParseError {
    /// Payload is not valid JSON
    InvalidJson(serde_json::Error),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidJson(e) => write!(f, "Invalid JSON: {}", e),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse a request payload into a command.
///
/// Only malformed JSON is an error. Well-formed JSON without a string
/// `command` field maps to `Command::Unknown(None)`.
pub fn parse_request(payload: &str) -> Result<Command, ParseError> {
    let request: Value = serde_json::from_str(payload).map_err(ParseError::InvalidJson)?;

    Ok(match request.get("command").and_then(Value::as_str) {
        Some(token) => Command::from_token(token),
        None => Command::Unknown(None),
    })
}
