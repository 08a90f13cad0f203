//! Response body collection and text decoding.

use crate::base::neterror::NetError;
use bytes::Bytes;
use encoding_rs::Encoding;
use http_body::Body;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use std::borrow::Cow;
use tokio::time::Instant;

/// Response body wrapper.
///
/// Collection is bounded by the request deadline when the transport sets
/// one.
pub struct ResponseBody {
    inner: UnsyncBoxBody<Bytes, NetError>,
    deadline: Option<Instant>,
}

impl std::fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseBody")
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

impl ResponseBody {
    /// Wrap any body that yields `Bytes`.
    pub fn new<B>(body: B) -> Self
    where
        B: Body<Data = Bytes, Error = NetError> + Send + 'static,
    {
        Self {
            inner: UnsyncBoxBody::new(body),
            deadline: None,
        }
    }

    /// Wrap a hyper body.
    pub fn from_incoming(body: Incoming) -> Self {
        Self::new(body.map_err(|e| {
            tracing::debug!(error = %e, "response body read failed");
            NetError::HttpBodyError
        }))
    }

    /// A fully buffered body.
    pub fn from_bytes<B: Into<Bytes>>(data: B) -> Self {
        Self::new(Full::new(data.into()).map_err(|never| match never {}))
    }

    /// Fail collection with `ConnectionTimedOut` once `deadline` passes.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Read entire body as bytes.
    pub async fn bytes(self) -> Result<Bytes, NetError> {
        let collect = self.inner.collect();
        let collected = match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, collect)
                .await
                .map_err(|_| NetError::ConnectionTimedOut)??,
            None => collect.await?,
        };
        Ok(collected.to_bytes())
    }

    /// Read body as UTF-8 text.
    pub async fn text(self) -> Result<String, NetError> {
        self.text_with_encoding(encoding_rs::UTF_8).await
    }

    /// Read body as text in `encoding`.
    pub async fn text_with_encoding(self, encoding: &'static Encoding) -> Result<String, NetError> {
        let bytes = self.bytes().await?;
        decode_text(&bytes, encoding)
    }

    /// Read body as JSON, deserializing to type T.
    #[cfg(feature = "json")]
    pub async fn json<T: serde::de::DeserializeOwned>(self) -> Result<T, NetError> {
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::debug!(error = %e, "response is not valid JSON");
            NetError::ResponseDecodeFailed
        })
    }
}

/// Decode `bytes` as text.
///
/// A byte order mark takes precedence over `encoding` and is stripped.
/// Malformed input is an error, never replaced.
pub fn decode_text(bytes: &[u8], encoding: &'static Encoding) -> Result<String, NetError> {
    let (encoding, bom_len) = Encoding::for_bom(bytes).unwrap_or((encoding, 0));
    encoding
        .decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
        .map(Cow::into_owned)
        .ok_or_else(|| {
            tracing::debug!(encoding = encoding.name(), len = bytes.len(), "response decode failed");
            NetError::ResponseDecodeFailed
        })
}

/// Look up an encoding by WHATWG label, e.g. `"utf-8"` or `"gbk"`.
pub fn encoding_for_label(label: &str) -> Result<&'static Encoding, NetError> {
    Encoding::for_label(label.trim().as_bytes()).ok_or(NetError::UnknownEncoding)
}
