//! Wire protocol.
//!
//! Messages are JSON objects discriminated by an upper-case `type` field:
//! ```json
//! { "type": "INIT", "data": [ { "x": 0, "y": 0, "color": "#000", "owner": "a", "timestamp": 0 } ] }
//! { "type": "DRAW", "x": 5, "y": 5, "color": "#ff0000", "owner": "alice" }
//! { "type": "UPDATE", "data": { "x": 5, "y": 5, "color": "#ff0000", "owner": "alice", "timestamp": 0 } }
//! { "type": "ERROR", "message": "Pixel is on cooldown" }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::cell::Cell;
use crate::engine::{InvalidReason, PaintRequest};

/// Messages sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// Full canvas, sent once to a newly connected client.
    Init { data: Vec<Cell> },
    /// An accepted paint, sent to every open connection.
    Update { data: Cell },
    /// A refusal, sent to the originating connection only.
    Error {
        message: String,
        /// Current holder of the cell, on cooldown refusals.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        owner: Option<String>,
        #[serde(
            default,
            rename = "remainingSeconds",
            skip_serializing_if = "Option::is_none"
        )]
        remaining_seconds: Option<u64>,
    },
}

impl ServerMessage {
    pub fn cooldown(owner: impl Into<String>, remaining_seconds: u64) -> Self {
        let owner = owner.into();
        ServerMessage::Error {
            message: format!(
                "Pixel is on cooldown: painted by {owner}, {remaining_seconds}s remaining"
            ),
            owner: Some(owner),
            remaining_seconds: Some(remaining_seconds),
        }
    }

    pub fn malformed(reason: InvalidReason) -> Self {
        ServerMessage::Error {
            message: format!("Malformed DRAW message: {reason}"),
            owner: None,
            remaining_seconds: None,
        }
    }

    pub fn internal() -> Self {
        ServerMessage::Error {
            message: "Internal server error".to_string(),
            owner: None,
            remaining_seconds: None,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Messages sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    Draw {
        x: i64,
        y: i64,
        color: String,
        owner: String,
    },
}

impl ClientMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A decoded client frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A paint request. Its fields have not been checked yet.
    Draw(PaintRequest),
    /// A well-formed envelope of some other type, carried for logging.
    Ignored(String),
}

/// Frames that cannot be understood at all.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message is not a JSON object")]
    NotObject,
    #[error("message has no string `type` field")]
    MissingType,
}

/// Decode a text frame from a client.
///
/// Only structural problems are errors. A `DRAW` with bad fields still
/// decodes; the engine reports it as invalid.
pub fn decode_client(text: &str) -> Result<Inbound, DecodeError> {
    let value: Value = serde_json::from_str(text)?;
    let Some(object) = value.as_object() else {
        return Err(DecodeError::NotObject);
    };
    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingType)?
        .to_string();

    if kind == "DRAW" {
        Ok(Inbound::Draw(serde_json::from_value(value)?))
    } else {
        Ok(Inbound::Ignored(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cell() -> Cell {
        Cell {
            x: 5,
            y: 5,
            color: "#ff0000".to_string(),
            owner: "alice".to_string(),
            painted_at: 1_000,
        }
    }

    #[test]
    fn test_init_serialize() {
        let msg = ServerMessage::Init { data: vec![cell()] };
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "INIT",
                "data": [
                    { "x": 5, "y": 5, "color": "#ff0000", "owner": "alice", "timestamp": 1000 }
                ],
            })
        );
    }

    #[test]
    fn test_update_serialize() {
        let msg = ServerMessage::Update { data: cell() };
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "UPDATE");
        assert_eq!(value["data"]["owner"], "alice");
        assert_eq!(value["data"]["timestamp"], 1000);
    }

    #[test]
    fn test_error_shapes() {
        let value = serde_json::to_value(ServerMessage::cooldown("alice", 200)).unwrap();
        assert_eq!(value["type"], "ERROR");
        assert_eq!(value["owner"], "alice");
        assert_eq!(value["remainingSeconds"], 200);
        assert!(value["message"].as_str().unwrap().contains("cooldown"));

        let value =
            serde_json::to_value(ServerMessage::malformed(InvalidReason::EmptyColor)).unwrap();
        assert_eq!(
            value,
            json!({ "type": "ERROR", "message": "Malformed DRAW message: color must not be empty" })
        );
    }

    #[test]
    fn test_server_message_deserialize() {
        let msg: ServerMessage =
            serde_json::from_str(r#"{"type":"ERROR","message":"nope"}"#).unwrap();
        assert_eq!(
            msg,
            ServerMessage::Error {
                message: "nope".to_string(),
                owner: None,
                remaining_seconds: None,
            }
        );
    }

    #[test]
    fn test_client_message_serialize() {
        let msg = ClientMessage::Draw {
            x: 1,
            y: 2,
            color: "#000000".to_string(),
            owner: "bob".to_string(),
        };
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({ "type": "DRAW", "x": 1, "y": 2, "color": "#000000", "owner": "bob" })
        );
    }

    #[test]
    fn test_decode_draw() {
        let text = r##"{"type":"DRAW","x":5,"y":5,"color":"#ff0000","owner":"alice"}"##;
        let inbound = decode_client(text).unwrap();
        assert_eq!(inbound, Inbound::Draw(PaintRequest::new(5, 5, "#ff0000", "alice")));
    }

    #[test]
    fn test_decode_draw_with_bad_fields_still_decodes() {
        let inbound = decode_client(r#"{"type":"DRAW","x":"five","color":""}"#).unwrap();
        let Inbound::Draw(request) = inbound else {
            panic!("Expected DRAW");
        };
        assert_eq!(request.x, None);
        assert_eq!(request.y, None);
        assert_eq!(request.color.as_deref(), Some(""));
        assert_eq!(request.owner, None);
    }

    #[test]
    fn test_decode_other_types_ignored() {
        assert_eq!(
            decode_client(r#"{"type":"PING"}"#).unwrap(),
            Inbound::Ignored("PING".to_string())
        );
        assert_eq!(
            decode_client(r#"{"type":"draw","x":1,"y":1}"#).unwrap(),
            Inbound::Ignored("draw".to_string())
        );
    }

    #[test]
    fn test_decode_failures() {
        assert!(matches!(decode_client("not json"), Err(DecodeError::Json(_))));
        assert!(matches!(decode_client("[1,2]"), Err(DecodeError::NotObject)));
        assert!(matches!(decode_client(r#"{"x":1}"#), Err(DecodeError::MissingType)));
        assert!(matches!(decode_client(r#"{"type":3}"#), Err(DecodeError::MissingType)));
    }
}
