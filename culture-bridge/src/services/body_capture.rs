//! Body interception for the negotiate exchange
//!
//! The downstream handler writes its response as usual; [`CapturedResponse`]
//! drains it into memory so the token can be read, then [`CapturedResponse::replay`]
//! hands the exact same bytes to the real caller. The buffer is owned by the
//! capture value, so it is released on every exit path including cancellation.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{HeaderMap, StatusCode, header::CONTENT_LENGTH, header::CONTENT_TYPE, response::Parts},
    response::Response,
};
use futures::StreamExt;
use serde_json::Value;

use crate::models::NegotiateBody;
use crate::utils::{ApiError, ApiResult};

/// Inbound request body kept in memory so downstream can read it more than once
///
/// Inserted into the request extensions by [`buffer_request`].
#[derive(Debug, Clone)]
pub struct BufferedRequestBody(pub Bytes);

/// Make the request body re-readable
///
/// The body is read up to `limit` bytes, re-attached to the request, and exposed as
/// a [`BufferedRequestBody`] extension.
pub async fn buffer_request(req: Request, limit: usize) -> ApiResult<Request> {
    let (mut parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, limit).await.map_err(ApiError::body_read)?;

    parts.extensions.insert(BufferedRequestBody(bytes.clone()));
    Ok(Request::from_parts(parts, Body::from(bytes)))
}

/// A downstream response held in memory
#[derive(Debug)]
pub struct CapturedResponse {
    parts: Parts,
    body: Bytes,
    complete: bool,
}

impl CapturedResponse {
    /// Drain `response` into a buffer
    ///
    /// A body stream that fails midway keeps whatever arrived before the failure;
    /// the capture is then marked incomplete and still replayable.
    pub async fn capture(response: Response) -> Self {
        let (parts, body) = response.into_parts();
        let mut stream = body.into_data_stream();
        let mut buffer = Vec::new();
        let mut complete = true;

        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => buffer.extend_from_slice(&bytes),
                Err(err) => {
                    tracing::warn!(
                        "Downstream body failed after {} bytes, flushing what was buffered: {}",
                        buffer.len(),
                        err
                    );
                    complete = false;
                    break;
                },
            }
        }

        Self { parts, body: Bytes::from(buffer), complete }
    }

    pub fn status(&self) -> StatusCode {
        self.parts.status
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.parts.headers
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Declared media type is `application/json` (parameters ignored)
    pub fn is_json(&self) -> bool {
        self.parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("application/json"))
    }

    /// Decode the negotiate payload
    ///
    /// `None` when the body is not declared as JSON, is truncated, is not valid
    /// JSON, or is not a JSON object. Any object is a negotiate payload; whether it
    /// carries a usable token is checked by the caller.
    pub fn negotiate_body(&self) -> Option<NegotiateBody> {
        if !self.complete || !self.is_json() {
            return None;
        }

        match serde_json::from_slice::<Value>(&self.body) {
            Ok(Value::Object(object)) => Some(NegotiateBody::from_object(&object)),
            Ok(_) => {
                tracing::warn!("Negotiate response is JSON but not an object");
                None
            },
            Err(err) => {
                tracing::warn!("Negotiate response is not valid JSON: {}", err);
                None
            },
        }
    }

    /// Hand the buffered bytes to the real caller, unchanged
    pub fn replay(self) -> Response {
        let Self { mut parts, body, complete } = self;
        if !complete {
            parts.headers.remove(CONTENT_LENGTH);
        }
        Response::from_parts(parts, Body::from(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn json_response(body: &'static str, content_type: &'static str) -> Response {
        let mut response = Response::new(Body::from(body));
        response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        response
    }

    #[tokio::test]
    async fn test_replay_is_byte_identical() {
        let raw = r#"{"negotiateVersion":1,"connectionToken":"T1","availableTransports":[]}"#;
        let captured = CapturedResponse::capture(json_response(raw, "application/json")).await;

        assert!(captured.is_complete());
        let token = captured.negotiate_body().and_then(|b| b.require_token().ok());
        assert_eq!(token.map(|t| t.as_str().to_string()), Some("T1".to_string()));

        let replayed = captured.replay();
        assert_eq!(replayed.headers().get(CONTENT_TYPE).unwrap(), "application/json");
        let bytes = axum::body::to_bytes(replayed.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], raw.as_bytes());
    }

    #[tokio::test]
    async fn test_content_type_gates_decoding() {
        let raw = r#"{"negotiateVersion":1,"connectionToken":"T1"}"#;

        let charset =
            CapturedResponse::capture(json_response(raw, "Application/JSON; charset=utf-8")).await;
        assert!(charset.negotiate_body().is_some());

        let text = CapturedResponse::capture(json_response(raw, "text/plain")).await;
        assert!(text.negotiate_body().is_none());

        let array = CapturedResponse::capture(json_response(r#"["T1"]"#, "application/json")).await;
        assert!(array.negotiate_body().is_none());

        let wrong_type =
            CapturedResponse::capture(json_response(r#"{"connectionToken":5}"#, "application/json"))
                .await;
        assert!(wrong_type.negotiate_body().is_some_and(|b| b.require_token().is_err()));

        let garbage = CapturedResponse::capture(json_response("<html>", "application/json")).await;
        assert!(garbage.negotiate_body().is_none());
        let bytes = axum::body::to_bytes(garbage.replay().into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"<html>");
    }

    #[tokio::test]
    async fn test_failed_stream_flushes_partial_buffer() {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"{\"negotiate")),
            Err(std::io::Error::other("connection reset")),
        ];
        let mut response = Response::new(Body::from_stream(futures::stream::iter(chunks)));
        response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from_static("46"));

        let captured = CapturedResponse::capture(response).await;
        assert!(!captured.is_complete());
        assert!(captured.negotiate_body().is_none());

        let replayed = captured.replay();
        assert!(replayed.headers().get(CONTENT_LENGTH).is_none());
        let bytes = axum::body::to_bytes(replayed.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"{\"negotiate");
    }

    #[tokio::test]
    async fn test_buffer_request_is_rereadable() {
        let req = axum::http::Request::builder()
            .uri("/_blazor/negotiate")
            .body(Body::from("payload"))
            .unwrap();
        let req = buffer_request(req, 1024).await.unwrap();

        let extension = req.extensions().get::<BufferedRequestBody>().cloned().unwrap();
        assert_eq!(&extension.0[..], b"payload");

        let bytes = axum::body::to_bytes(req.into_body(), 1024).await.unwrap();
        assert_eq!(&bytes[..], b"payload");
    }

    #[tokio::test]
    async fn test_buffer_request_enforces_limit() {
        let req = axum::http::Request::builder().body(Body::from("0123456789")).unwrap();
        assert!(matches!(buffer_request(req, 4).await, Err(ApiError::BodyRead(_))));
    }
}
