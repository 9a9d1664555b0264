//! Commands answered by the background context

use serde::Deserialize;
use serde_json::Value;
use xmsg_bridge::{HandlerError, SenderMetadata};

use crate::constants::PONG;

/// Requests the background understands, tagged by `cmd`
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Liveness check, answered with `"pong"`
    Ping,
    /// Reply with the payload as sent (absent when omitted)
    Echo {
        #[serde(default)]
        payload: Option<Value>,
    },
}

/// Background message handler.
///
/// Anything that is not a known command is a handler failure, which the
/// responder logs and answers with nothing.
pub fn handle(message: Value, _sender: SenderMetadata) -> Result<Option<Value>, HandlerError> {
    let command: Command = serde_json::from_value(message)?;

    match command {
        Command::Ping => Ok(Some(Value::from(PONG))),
        Command::Echo { payload } => Ok(payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(message: Value) -> Result<Option<Value>, HandlerError> {
        handle(message, SenderMetadata::default())
    }

    #[test]
    fn test_ping() {
        assert_eq!(run(json!({ "cmd": "ping" })), Ok(Some(json!("pong"))));
    }

    #[test]
    fn test_echo() {
        let payload = json!({ "user_id": "tourist", "ids": [1, 2, 3] });
        assert_eq!(
            run(json!({ "cmd": "echo", "payload": payload.clone() })),
            Ok(Some(payload))
        );
        assert_eq!(run(json!({ "cmd": "echo" })), Ok(None));
    }

    #[test]
    fn test_unknown_command_fails() {
        let err = run(json!({ "cmd": "reboot" })).unwrap_err();
        assert!(matches!(err, HandlerError::Decode(_)));

        assert!(run(json!("ping")).is_err());
        assert!(run(Value::Null).is_err());
    }
}
