//! HTTP Response with body access.

use crate::base::neterror::NetError;
use crate::http::ResponseBody;
use encoding_rs::Encoding;
use http::{HeaderMap, StatusCode, Version};
use hyper::body::Incoming;
use tokio::time::Instant;

/// HTTP Response with accessible body.
/// This is the user-facing response type that owns the body.
#[derive(Debug)]
pub struct HttpResponse {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    body: Option<ResponseBody>,
}

impl HttpResponse {
    /// Build from a response whose body is already wrapped.
    pub fn new(resp: http::Response<ResponseBody>) -> Self {
        let (parts, body) = resp.into_parts();
        Self {
            status: parts.status,
            version: parts.version,
            headers: parts.headers,
            body: Some(body),
        }
    }

    /// Create from hyper Response<Incoming>; body reads stop at `deadline`.
    pub fn from_hyper(resp: http::Response<Incoming>, deadline: Option<Instant>) -> Self {
        Self::new(resp.map(|body| {
            let body = ResponseBody::from_incoming(body);
            match deadline {
                Some(d) => body.with_deadline(d),
                None => body,
            }
        }))
    }

    /// Get the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the HTTP version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Get a reference to the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Take the response body for consumption.
    /// Can only be called once - subsequent calls return None.
    pub fn take_body(&mut self) -> Option<ResponseBody> {
        self.body.take()
    }

    /// Convenience method to consume body as bytes.
    pub async fn bytes(mut self) -> Result<bytes::Bytes, NetError> {
        self.body.take().ok_or(NetError::HttpBodyError)?.bytes().await
    }

    /// Convenience method to consume body as UTF-8 text.
    pub async fn text(self) -> Result<String, NetError> {
        self.text_with_encoding(encoding_rs::UTF_8).await
    }

    /// Consume body as text in `encoding`.
    pub async fn text_with_encoding(
        mut self,
        encoding: &'static Encoding,
    ) -> Result<String, NetError> {
        self.body
            .take()
            .ok_or(NetError::HttpBodyError)?
            .text_with_encoding(encoding)
            .await
    }

    /// Convenience method to consume body as JSON.
    #[cfg(feature = "json")]
    pub async fn json<T: serde::de::DeserializeOwned>(mut self) -> Result<T, NetError> {
        self.body.take().ok_or(NetError::HttpBodyError)?.json().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &'static str) -> HttpResponse {
        HttpResponse::new(
            http::Response::builder()
                .status(status)
                .header("X-Test", "1")
                .body(ResponseBody::from_bytes(body))
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_accessors_and_text() {
        let resp = response(201, "created");
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(resp.headers()["x-test"], "1");
        assert_eq!(resp.text().await.unwrap(), "created");
    }

    #[tokio::test]
    async fn test_body_taken_once() {
        let mut resp = response(200, "x");
        assert!(resp.take_body().is_some());
        assert!(resp.take_body().is_none());
        assert_eq!(resp.bytes().await.unwrap_err(), NetError::HttpBodyError);
    }

    #[cfg(feature = "json")]
    #[tokio::test]
    async fn test_json() {
        #[derive(serde::Deserialize)]
        struct Token {
            access_token: String,
            expires_in: u32,
        }

        let resp = response(200, r#"{"access_token":"abc","expires_in":7200}"#);
        let token: Token = resp.json().await.unwrap();
        assert_eq!(token.access_token, "abc");
        assert_eq!(token.expires_in, 7200);
    }
}
