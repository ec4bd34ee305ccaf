//! JSON bodies exchanged with the `/chat` endpoint.

use chaitr_core::{ChaitrError, Result};
use serde::{Deserialize, Serialize};

use crate::ChatOutcome;

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Turn a raw response into an outcome.
///
/// A reply only counts on a 2xx status; an `error` field counts on any status.
/// Everything else is a transport failure.
pub fn interpret(status: u16, body: &str) -> Result<ChatOutcome> {
    let success = (200..300).contains(&status);

    let response: ChatResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(e) => {
            return Err(ChaitrError::TransportFailure(format!(
                "HTTP {}: malformed response body: {}",
                status, e
            )))
        }
    };

    match response {
        ChatResponse { reply: Some(reply), .. } if success && !reply.is_empty() => {
            Ok(ChatOutcome::Reply(reply))
        }
        ChatResponse { error: Some(error), .. } if !error.is_empty() => {
            Ok(ChatOutcome::ServerError(error))
        }
        _ => Err(ChaitrError::TransportFailure(format!(
            "HTTP {}: response has neither a reply nor an error",
            status
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body() {
        let body = serde_json::to_string(&ChatRequest { message: "hello" }).unwrap();
        assert_eq!(body, r#"{"message":"hello"}"#);
    }

    #[test]
    fn test_reply() {
        let outcome = interpret(200, r#"{"reply":"hi"}"#).unwrap();
        assert_eq!(outcome, ChatOutcome::Reply("hi".to_string()));
    }

    #[test]
    fn test_reply_wins_over_error() {
        let outcome = interpret(200, r#"{"reply":"hi","error":"ignored"}"#).unwrap();
        assert_eq!(outcome, ChatOutcome::Reply("hi".to_string()));
    }

    #[test]
    fn test_server_error_on_any_status() {
        for status in [200, 500] {
            let outcome = interpret(status, r#"{"error":"model offline"}"#).unwrap();
            assert_eq!(outcome, ChatOutcome::ServerError("model offline".to_string()));
        }
    }

    #[test]
    fn test_empty_reply_is_unusable() {
        let err = interpret(200, r#"{"reply":""}"#).unwrap_err();
        assert!(matches!(err, ChaitrError::TransportFailure(_)));
    }

    #[test]
    fn test_reply_on_failure_status_is_unusable() {
        let err = interpret(502, r#"{"reply":"stale"}"#).unwrap_err();
        assert!(matches!(err, ChaitrError::TransportFailure(_)));
    }

    #[test]
    fn test_malformed_body() {
        for body in ["", "<html>Bad Gateway</html>", "[1,2]"] {
            let err = interpret(200, body).unwrap_err();
            assert!(matches!(err, ChaitrError::TransportFailure(_)), "body {body:?}");
        }
    }
}
