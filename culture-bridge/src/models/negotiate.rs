use serde_json::{Map, Value};

use super::correlation::ConnectionToken;
use crate::utils::{ApiError, ApiResult};

/// Body of a successful negotiate response
///
/// Only the two members the bridge needs are read; any other members the hub
/// emits (available transports, connection id, ...) are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct NegotiateBody {
    pub negotiate_version: i64,
    connection_token: Option<Value>,
}

impl NegotiateBody {
    /// Read the negotiate members of a decoded JSON object
    pub fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            negotiate_version: object
                .get("negotiateVersion")
                .and_then(Value::as_i64)
                .unwrap_or_default(),
            connection_token: object.get("connectionToken").cloned(),
        }
    }

    /// Token minted by the hub; a missing, null, empty or non-string token breaks the handshake
    pub fn require_token(&self) -> ApiResult<ConnectionToken> {
        match &self.connection_token {
            Some(Value::String(token)) if !token.is_empty() => {
                Ok(ConnectionToken::new(token.as_str()))
            },
            Some(Value::String(_)) => Err(ApiError::protocol_violation(
                "negotiate response carries an empty connectionToken",
            )),
            None | Some(Value::Null) => {
                Err(ApiError::protocol_violation("negotiate response has no connectionToken"))
            },
            Some(other) => Err(ApiError::protocol_violation(format!(
                "negotiate response connectionToken is not a string: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> NegotiateBody {
        match serde_json::from_str::<Value>(raw).unwrap() {
            Value::Object(object) => NegotiateBody::from_object(&object),
            other => panic!("not an object: {}", other),
        }
    }

    #[test]
    fn test_parse_negotiate_body() {
        let body =
            parse(r#"{"negotiateVersion":1,"connectionToken":"T1","availableTransports":[]}"#);
        assert_eq!(body.negotiate_version, 1);
        assert_eq!(body.require_token().unwrap().as_str(), "T1");
    }

    #[test]
    fn test_unusable_token_is_protocol_violation() {
        for raw in [
            r#"{"negotiateVersion":1}"#,
            r#"{"negotiateVersion":1,"connectionToken":null}"#,
            r#"{"negotiateVersion":1,"connectionToken":""}"#,
            r#"{"negotiateVersion":1,"connectionToken":5}"#,
            r#"{"negotiateVersion":"1","connectionToken":["T1"]}"#,
        ] {
            let body = parse(raw);
            assert!(matches!(body.require_token(), Err(ApiError::ProtocolViolation(_))), "{}", raw);
        }
    }
}
