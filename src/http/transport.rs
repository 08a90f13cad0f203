//! The transport seam.
//!
//! [`Transport`] is everything the executor needs from the network: take a
//! request with its body, a timeout and an optional client certificate,
//! and hand back a response whose body can still be read.
//!
//! [`NetworkTransport`] is the default implementation: one fresh HTTP/1.1
//! connection per hop, redirects followed up to a limit, and a single
//! deadline covering connect, TLS, every redirect hop and the response body.

use crate::base::neterror::NetError;
use crate::http::streamfactory::HttpStreamFactory;
use crate::http::{HttpResponse, RequestBody};
use crate::socket::tls::{ClientCertificate, TlsConfig};
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HOST, LOCATION, USER_AGENT};
use http::{HeaderValue, Method, Request, Response, StatusCode, Version};
use hyper::body::Incoming;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use url::{Position, Url};

/// Chromium default.
pub const DEFAULT_REDIRECT_LIMIT: u8 = 20;

/// One outbound request as handed to a [`Transport`].
#[derive(Debug)]
pub struct TransportRequest {
    pub request: Request<RequestBody>,
    pub timeout: Duration,
    pub client_cert: Option<ClientCertificate>,
}

/// Sends requests. Implementations own connection setup, TLS, redirects
/// and timeout enforcement.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = Result<HttpResponse, NetError>> + Send;
}

/// Settings for [`NetworkTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsConfig,
    pub redirect_limit: u8,
    /// Turn 4xx and 5xx responses into [`NetError::HttpStatus`].
    pub error_for_status: bool,
    pub user_agent: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsConfig::default(),
            redirect_limit: DEFAULT_REDIRECT_LIMIT,
            error_for_status: true,
            user_agent: Some(concat!("formpost/", env!("CARGO_PKG_VERSION")).to_string()),
        }
    }
}

/// Default transport over tokio, hyper and BoringSSL.
#[derive(Debug, Clone, Default)]
pub struct NetworkTransport {
    config: TransportConfig,
}

impl NetworkTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    async fn execute(
        &self,
        request: Request<RequestBody>,
        client_cert: Option<&ClientCertificate>,
    ) -> Result<Response<Incoming>, NetError> {
        let factory = HttpStreamFactory::new(&self.config.tls);
        let (mut parts, mut body) = request.into_parts();
        let mut url = Url::parse(&parts.uri.to_string()).map_err(|_| NetError::InvalidUrl)?;
        let mut redirect_limit = self.config.redirect_limit;

        loop {
            let replay = body.try_clone();
            let req = self.build_request(&parts, &url, body)?;

            tracing::debug!(method = %parts.method, url = %url, "sending request");
            let mut stream = factory.create_stream(&url, client_cert).await?;
            let resp = stream.send_request(req).await?;
            let status = resp.status();
            tracing::debug!(url = %url, status = status.as_u16(), "response headers received");

            let next = if status.is_redirection() {
                resp.headers()
                    .get(LOCATION)
                    .and_then(|loc| loc.to_str().ok())
                    .and_then(|loc| url.join(loc).ok())
            } else {
                None
            };

            let Some(next) = next else {
                return Ok(resp);
            };

            if redirect_limit == 0 {
                return Err(NetError::TooManyRedirects);
            }
            redirect_limit -= 1;

            // 307/308 resend method and body; the rest fall back to a bodiless GET.
            let keep_method = matches!(
                status,
                StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT
            ) || parts.method == Method::GET
                || parts.method == Method::HEAD;

            if keep_method {
                body = replay.ok_or(NetError::RedirectBodyNotReplayable)?;
            } else {
                parts.method = Method::GET;
                parts.headers.remove(CONTENT_TYPE);
                parts.headers.remove(CONTENT_LENGTH);
                body = RequestBody::Empty;
            }

            if next.origin() != url.origin() {
                parts.headers.remove(http::header::AUTHORIZATION);
            }
            parts.headers.remove(HOST);

            tracing::debug!(from = %url, to = %next, status = status.as_u16(), "following redirect");
            url = next;
        }
    }

    fn build_request(
        &self,
        parts: &http::request::Parts,
        url: &Url,
        body: RequestBody,
    ) -> Result<Request<RequestBody>, NetError> {
        let mut headers = parts.headers.clone();

        if !headers.contains_key(HOST) {
            let host = url.host_str().ok_or(NetError::InvalidUrl)?;
            let host = match url.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            };
            headers.insert(
                HOST,
                HeaderValue::from_str(&host).map_err(|_| NetError::InvalidUrl)?,
            );
        }

        if let Some(ua) = &self.config.user_agent {
            if !headers.contains_key(USER_AGENT) {
                headers.insert(
                    USER_AGENT,
                    HeaderValue::from_str(ua).map_err(|_| NetError::InvalidHeaderValue)?,
                );
            }
        }

        let mut req = Request::builder()
            .method(parts.method.clone())
            .uri(request_target(url))
            .version(Version::HTTP_11)
            .body(body)
            .map_err(NetError::from)?;
        *req.headers_mut() = headers;
        Ok(req)
    }
}

impl Transport for NetworkTransport {
    async fn send(&self, request: TransportRequest) -> Result<HttpResponse, NetError> {
        let TransportRequest {
            request,
            timeout,
            client_cert,
        } = request;
        // A timeout too large to represent as an instant means no deadline.
        let deadline = Instant::now().checked_add(timeout);
        let exchange = self.execute(request, client_cert.as_ref());

        let resp = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, exchange)
                .await
                .map_err(|_| {
                    tracing::debug!(timeout_ms = timeout.as_millis() as u64, "request timed out");
                    NetError::ConnectionTimedOut
                })??,
            None => exchange.await?,
        };

        let status = resp.status();
        if self.config.error_for_status && (status.is_client_error() || status.is_server_error())
        {
            return Err(NetError::HttpStatus(status.as_u16()));
        }

        Ok(HttpResponse::from_hyper(resp, deadline))
    }
}

/// Origin-form request target: path plus query.
fn request_target(url: &Url) -> &str {
    &url[Position::BeforePath..Position::AfterQuery]
}
