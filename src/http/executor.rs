//! Runs one request end to end: body out, response text back.

use crate::base::neterror::NetError;
use crate::http::multipart::{MultipartWriter, Part};
use crate::http::transport::{Transport, TransportRequest};
use crate::http::RequestBody;
use crate::socket::tls::ClientCertificate;
use encoding_rs::Encoding;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderValue, Method, Request};
use std::time::Duration;
use url::Url;

/// Timeout for GET, raw POST and form POST when none is given.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);
/// Timeout for multipart uploads when none is given.
pub const DEFAULT_MULTIPART_TIMEOUT: Duration = Duration::from_millis(10000);
/// Content type of URL-encoded form submissions.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Everything about a request except its body.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    method: Method,
    url: String,
    content_type: Option<String>,
    timeout: Duration,
    client_cert: Option<ClientCertificate>,
    encoding: &'static Encoding,
}

impl RequestSpec {
    pub fn new<U: Into<String>>(method: Method, url: U) -> Self {
        Self {
            method,
            url: url.into(),
            content_type: None,
            timeout: DEFAULT_TIMEOUT,
            client_cert: None,
            encoding: encoding_rs::UTF_8,
        }
    }

    pub fn get<U: Into<String>>(url: U) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post<U: Into<String>>(url: U) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn client_cert(mut self, cert: Option<ClientCertificate>) -> Self {
        self.client_cert = cert;
        self
    }

    /// Encoding used to decode the response text.
    pub fn encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn get_timeout(&self) -> Duration {
        self.timeout
    }

    pub fn get_encoding(&self) -> &'static Encoding {
        self.encoding
    }

    fn into_transport_request(self, body: RequestBody) -> Result<TransportRequest, NetError> {
        let url = Url::parse(&self.url).map_err(|_| NetError::InvalidUrl)?;

        let mut builder = Request::builder()
            .method(self.method.clone())
            .uri(url.as_str());

        if let Some(content_type) = &self.content_type {
            let value =
                HeaderValue::from_str(content_type).map_err(|_| NetError::InvalidHeaderValue)?;
            builder = builder.header(CONTENT_TYPE, value);
        }
        if self.method != Method::GET {
            if let Some(len) = body.content_length() {
                builder = builder.header(CONTENT_LENGTH, len);
            }
        }

        let request = builder.body(body).map_err(NetError::from)?;
        Ok(TransportRequest {
            request,
            timeout: self.timeout,
            client_cert: self.client_cert,
        })
    }
}

/// Streams prepared bodies to a [`Transport`] and decodes the answer.
///
/// Holds no state between calls.
pub struct RequestExecutor<'t, T> {
    transport: &'t T,
}

impl<'t, T: Transport> RequestExecutor<'t, T> {
    pub fn new(transport: &'t T) -> Self {
        Self { transport }
    }

    /// Send a buffered (or empty) body.
    pub async fn execute(&self, spec: RequestSpec, body: RequestBody) -> Result<String, NetError> {
        let encoding = spec.encoding;
        let request = spec.into_transport_request(body)?;
        let response = self.transport.send(request).await?;
        response.text_with_encoding(encoding).await
    }

    /// Send a multipart body, streamed while the request is in flight.
    ///
    /// The content type of `spec` is replaced with the multipart one.
    pub async fn execute_multipart<'a>(
        &self,
        spec: RequestSpec,
        parts: Vec<Part<'a>>,
    ) -> Result<String, NetError> {
        let writer = MultipartWriter::new();
        let spec = spec.content_type(writer.content_type());
        let encoding = spec.encoding;
        let url = spec.url.clone();

        let (mut sink, body) = RequestBody::pipe();
        let request = spec.into_transport_request(body)?;

        // The sink is dropped when writing ends, which ends the body.
        let write = async move { writer.write_body(parts, &mut sink).await };
        let send = self.transport.send(request);
        tokio::pin!(write);
        tokio::pin!(send);

        let mut write_done = false;
        let response = loop {
            tokio::select! {
                res = &mut write, if !write_done => match res {
                    // A closed sink means the transport gave up; its own error wins.
                    Ok(()) | Err(NetError::BodySinkClosed) => write_done = true,
                    Err(e) => {
                        tracing::warn!(url = %url, error = %e, "multipart upload aborted");
                        return Err(e);
                    }
                },
                res = &mut send => break res?,
            }
        };

        response.text_with_encoding(encoding).await
    }
}
