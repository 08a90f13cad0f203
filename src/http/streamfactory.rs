use crate::base::neterror::NetError;
use crate::http::RequestBody;
use crate::socket::client::SocketType;
use crate::socket::connectjob::ConnectJob;
use crate::socket::tls::{ClientCertificate, TlsConfig};
use http::{Request, Response};
use hyper::body::Incoming;
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use tokio::spawn;
use url::Url;

/// Wraps one HTTP/1.1 connection.
/// Equivalent to net::HttpStream.
pub struct HttpStream {
    sender: http1::SendRequest<RequestBody>,
}

impl HttpStream {
    /// Perform the HTTP/1.1 handshake over `socket` and spawn the
    /// connection driver.
    pub async fn handshake(socket: SocketType) -> Result<Self, NetError> {
        let io = TokioIo::new(socket);
        let (sender, conn) = http1::handshake(io).await.map_err(|e| {
            tracing::debug!(error = %e, "HTTP/1.1 handshake failed");
            NetError::ConnectionFailed
        })?;

        spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(error = %e, "connection closed with error");
            }
        });

        Ok(Self { sender })
    }

    pub async fn send_request(
        &mut self,
        req: Request<RequestBody>,
    ) -> Result<Response<Incoming>, NetError> {
        self.sender.send_request(req).await.map_err(|e| {
            tracing::debug!(error = %e, "request failed");
            if e.is_canceled() || e.is_closed() || e.is_incomplete_message() {
                NetError::ConnectionClosed
            } else if e.is_user() {
                NetError::BodySourceFailed
            } else {
                NetError::ConnectionFailed
            }
        })
    }
}

/// Opens a fresh connection per request. No pooling.
pub struct HttpStreamFactory<'a> {
    tls: &'a TlsConfig,
}

impl<'a> HttpStreamFactory<'a> {
    pub fn new(tls: &'a TlsConfig) -> Self {
        Self { tls }
    }

    pub async fn create_stream(
        &self,
        url: &Url,
        client_cert: Option<&ClientCertificate>,
    ) -> Result<HttpStream, NetError> {
        let socket = ConnectJob::new(self.tls, client_cert).connect(url).await?;
        HttpStream::handshake(socket).await
    }
}
