//! HTTP client with builder pattern.
//!
//! [`Client`] holds defaults (timeouts, response encoding, client
//! certificate) and a [`Transport`]. Every call can override the defaults
//! through [`RequestOptions`].
//!
//! # Example
//!
//! ```rust,no_run
//! use formpost::{Client, Part, RequestOptions};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), formpost::NetError> {
//! let client = Client::builder()
//!     .timeout(Duration::from_secs(3))
//!     .build();
//!
//! let token = client
//!     .http_get("https://api.example.com/token?grant=client", RequestOptions::new())
//!     .await?;
//!
//! let mut file = tokio::fs::File::open("photo.jpg").await.map_err(|_| formpost::NetError::BodySourceFailed)?;
//! let parts = vec![
//!     Part::text("type", "image"),
//!     formpost::FilePart::builder("media")
//!         .source(&mut file)
//!         .file_name("photo.jpg")
//!         .mime_type("image/jpeg")
//!         .build()?
//!         .into(),
//! ];
//! let reply = client
//!     .http_post_multipart("https://api.example.com/upload", parts, RequestOptions::new())
//!     .await?;
//! # let _ = (token, reply);
//! # Ok(())
//! # }
//! ```

use crate::base::neterror::NetError;
use crate::http::executor::{
    RequestExecutor, RequestSpec, DEFAULT_MULTIPART_TIMEOUT, DEFAULT_TIMEOUT, FORM_CONTENT_TYPE,
};
use crate::http::multipart::Part;
use crate::http::query::{append_query, build_form_string};
use crate::http::responsebody::encoding_for_label;
use crate::http::transport::{NetworkTransport, Transport, TransportConfig};
use crate::http::RequestBody;
use crate::socket::tls::{ClientCertificate, TlsConfig};
use bytes::Bytes;
use encoding_rs::Encoding;
use http::Method;
use std::sync::Arc;
use std::time::Duration;

/// Per-call overrides. Unset fields fall back to the client defaults.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    timeout: Option<Duration>,
    encoding: Option<&'static Encoding>,
    client_cert: Option<ClientCertificate>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout_ms(self, millis: u64) -> Self {
        self.timeout(Duration::from_millis(millis))
    }

    /// Encoding used to decode the response (and to encode form bodies).
    pub fn encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Like [`encoding`](Self::encoding) but by WHATWG label, e.g. `"gbk"`.
    pub fn encoding_label(self, label: &str) -> Result<Self, NetError> {
        Ok(self.encoding(encoding_for_label(label)?))
    }

    pub fn client_cert(mut self, cert: ClientCertificate) -> Self {
        self.client_cert = Some(cert);
        self
    }
}

#[derive(Debug)]
struct ClientConfig {
    timeout: Duration,
    multipart_timeout: Duration,
    encoding: &'static Encoding,
    client_cert: Option<ClientCertificate>,
}

/// HTTP client for GET, POST, form and multipart requests.
///
/// Use [`Client::builder()`] to configure and create a client. Cloning is
/// cheap and clones share the transport.
#[derive(Debug)]
pub struct Client<T = NetworkTransport> {
    transport: Arc<T>,
    config: Arc<ClientConfig>,
}

impl<T> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            config: self.config.clone(),
        }
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Create a new client with default settings.
    pub fn new() -> Self {
        ClientBuilder::default().build()
    }

    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }
}

impl<T: Transport> Client<T> {
    /// Create a client with default settings over a custom transport.
    pub fn with_transport(transport: T) -> Self {
        ClientBuilder::default().build_with_transport(transport)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn spec(
        &self,
        method: Method,
        url: String,
        options: RequestOptions,
        default_timeout: Duration,
    ) -> RequestSpec {
        RequestSpec::new(method, url)
            .timeout(options.timeout.unwrap_or(default_timeout))
            .encoding(options.encoding.unwrap_or(self.config.encoding))
            .client_cert(
                options
                    .client_cert
                    .or_else(|| self.config.client_cert.clone()),
            )
    }

    /// GET `url` and return the decoded response text.
    pub async fn http_get(&self, url: &str, options: RequestOptions) -> Result<String, NetError> {
        let spec = self.spec(Method::GET, url.to_string(), options, self.config.timeout);
        RequestExecutor::new(&*self.transport)
            .execute(spec, RequestBody::Empty)
            .await
    }

    /// GET `url` with `pairs` appended as a query string.
    pub async fn http_get_with_query<I, K, V>(
        &self,
        url: &str,
        pairs: I,
        options: RequestOptions,
    ) -> Result<String, NetError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.http_get(&append_query(url, pairs), options).await
    }

    /// POST a raw body with an explicit content type.
    pub async fn http_post<B: Into<Bytes>>(
        &self,
        url: &str,
        body: B,
        content_type: &str,
        options: RequestOptions,
    ) -> Result<String, NetError> {
        let spec = self
            .spec(Method::POST, url.to_string(), options, self.config.timeout)
            .content_type(content_type);
        RequestExecutor::new(&*self.transport)
            .execute(spec, RequestBody::Bytes(body.into()))
            .await
    }

    /// POST `fields` as `application/x-www-form-urlencoded`.
    ///
    /// The form string is encoded with the request's encoding before sending.
    pub async fn http_post_form<I, K, V>(
        &self,
        url: &str,
        fields: I,
        options: RequestOptions,
    ) -> Result<String, NetError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let spec = self
            .spec(Method::POST, url.to_string(), options, self.config.timeout)
            .content_type(FORM_CONTENT_TYPE);
        let form = build_form_string(fields);
        let (body, _, _) = spec.get_encoding().encode(&form);
        let body = Bytes::from(body.into_owned());

        RequestExecutor::new(&*self.transport)
            .execute(spec, RequestBody::Bytes(body))
            .await
    }

    /// POST `parts` as `multipart/form-data`, streaming file contents.
    pub async fn http_post_multipart<'a>(
        &self,
        url: &str,
        parts: Vec<Part<'a>>,
        options: RequestOptions,
    ) -> Result<String, NetError> {
        tracing::debug!(url = %url, parts = parts.len(), "multipart upload");
        let spec = self.spec(
            Method::POST,
            url.to_string(),
            options,
            self.config.multipart_timeout,
        );
        RequestExecutor::new(&*self.transport)
            .execute_multipart(spec, parts)
            .await
    }

    /// GET with the fields of `query` as the query string.
    #[cfg(feature = "json")]
    pub async fn get_with_object<Q: serde::Serialize>(
        &self,
        url: &str,
        query: &Q,
        options: RequestOptions,
    ) -> Result<String, NetError> {
        let pairs = crate::http::query::pairs_from_object(query)?;
        self.http_get_with_query(url, pairs, options).await
    }

    /// POST the fields of `form` as a URL-encoded form.
    #[cfg(feature = "json")]
    pub async fn post_form_object<F: serde::Serialize>(
        &self,
        url: &str,
        form: &F,
        options: RequestOptions,
    ) -> Result<String, NetError> {
        let pairs = crate::http::query::pairs_from_object(form)?;
        self.http_post_form(url, pairs, options).await
    }
}

/// Builder for creating a [`Client`].
#[derive(Debug, Default)]
pub struct ClientBuilder {
    timeout: Option<Duration>,
    multipart_timeout: Option<Duration>,
    encoding: Option<&'static Encoding>,
    client_cert: Option<ClientCertificate>,
    transport: TransportConfig,
}

impl ClientBuilder {
    /// Default timeout for GET, POST and form requests (5 s if unset).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Default timeout for multipart uploads (10 s if unset).
    pub fn multipart_timeout(mut self, timeout: Duration) -> Self {
        self.multipart_timeout = Some(timeout);
        self
    }

    /// Default response encoding (UTF-8 if unset).
    pub fn encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn encoding_label(self, label: &str) -> Result<Self, NetError> {
        Ok(self.encoding(encoding_for_label(label)?))
    }

    /// Certificate presented on every TLS handshake unless overridden.
    pub fn client_cert(mut self, cert: ClientCertificate) -> Self {
        self.client_cert = Some(cert);
        self
    }

    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.transport.user_agent = Some(user_agent.into());
        self
    }

    pub fn no_user_agent(mut self) -> Self {
        self.transport.user_agent = None;
        self
    }

    pub fn redirect_limit(mut self, limit: u8) -> Self {
        self.transport.redirect_limit = limit;
        self
    }

    /// Whether 4xx and 5xx responses fail with [`NetError::HttpStatus`].
    /// On by default.
    pub fn error_for_status(mut self, enabled: bool) -> Self {
        self.transport.error_for_status = enabled;
        self
    }

    pub fn tls_config(mut self, tls: TlsConfig) -> Self {
        self.transport.tls = tls;
        self
    }

    /// Skip server certificate verification. Local testing only.
    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.transport.tls.verify_peer = !accept;
        self
    }

    /// Build the client over [`NetworkTransport`].
    pub fn build(mut self) -> Client {
        let transport = NetworkTransport::new(std::mem::take(&mut self.transport));
        self.build_with_transport(transport)
    }

    /// Build the client over a custom transport. Transport settings made
    /// on this builder are ignored.
    pub fn build_with_transport<T: Transport>(self, transport: T) -> Client<T> {
        Client {
            transport: Arc::new(transport),
            config: Arc::new(ClientConfig {
                timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
                multipart_timeout: self.multipart_timeout.unwrap_or(DEFAULT_MULTIPART_TIMEOUT),
                encoding: self.encoding.unwrap_or(encoding_rs::UTF_8),
                client_cert: self.client_cert,
            }),
        }
    }
}

/// [`Client::http_get`] on a default client.
pub async fn http_get(url: &str, options: RequestOptions) -> Result<String, NetError> {
    Client::new().http_get(url, options).await
}

/// [`Client::http_post`] on a default client.
pub async fn http_post<B: Into<Bytes>>(
    url: &str,
    body: B,
    content_type: &str,
    options: RequestOptions,
) -> Result<String, NetError> {
    Client::new()
        .http_post(url, body, content_type, options)
        .await
}

/// [`Client::http_post_form`] on a default client.
pub async fn http_post_form<I, K, V>(
    url: &str,
    fields: I,
    options: RequestOptions,
) -> Result<String, NetError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    Client::new().http_post_form(url, fields, options).await
}

/// [`Client::http_post_multipart`] on a default client.
pub async fn http_post_multipart<'a>(
    url: &str,
    parts: Vec<Part<'a>>,
    options: RequestOptions,
) -> Result<String, NetError> {
    Client::new().http_post_multipart(url, parts, options).await
}
