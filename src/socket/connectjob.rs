use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use crate::socket::client::SocketType;
use crate::socket::tls::{ClientCertificate, TlsConfig};
use boring::ssl::{SslConnector, SslMethod};
use tokio::net::TcpStream;
use url::Url;

/// Manages the connection process: DNS -> TCP -> SSL.
/// Roughly equivalent to net::ConnectJob.
pub struct ConnectJob<'a> {
    tls: &'a TlsConfig,
    client_cert: Option<&'a ClientCertificate>,
}

impl<'a> ConnectJob<'a> {
    pub fn new(tls: &'a TlsConfig, client_cert: Option<&'a ClientCertificate>) -> Self {
        Self { tls, client_cert }
    }

    pub async fn connect(&self, url: &Url) -> Result<SocketType, NetError> {
        let https = match url.scheme() {
            "http" => false,
            "https" => true,
            _ => return Err(NetError::UnknownUrlScheme),
        };
        let host = url.host_str().ok_or(NetError::InvalidUrl)?;
        let port = url.port_or_known_default().ok_or(NetError::InvalidUrl)?;

        // 1. DNS Resolution
        let lookup_host = host.trim_start_matches('[').trim_end_matches(']');
        let addrs: Vec<_> = tokio::net::lookup_host((lookup_host, port))
            .await
            .dns_context(host)?
            .collect();
        if addrs.is_empty() {
            return Err(NetError::NameNotResolved);
        }
        tracing::debug!(host = %host, count = addrs.len(), "resolved");

        // 2. TCP Connect, first address that answers wins
        let mut last = Err(NetError::ConnectionFailed);
        for addr in addrs {
            last = TcpStream::connect(addr).await.connection_context(host, port);
            if last.is_ok() {
                break;
            }
        }
        let stream = last?;
        let _ = stream.set_nodelay(true);

        if !https {
            return Ok(SocketType::Tcp(stream));
        }

        // 3. SSL Handshake
        let mut builder =
            SslConnector::builder(SslMethod::tls()).map_err(|_| NetError::SslProtocolError)?;
        self.tls.apply_to_builder(&mut builder)?;
        if let Some(cert) = self.client_cert {
            cert.apply_to_builder(&mut builder)?;
        }

        let connector = builder.build();
        let mut config = connector
            .configure()
            .map_err(|_| NetError::SslProtocolError)?;
        if !TlsConfig::should_set_sni(host) {
            config.set_use_server_name_indication(false);
        }
        if !self.tls.verify_peer {
            config.set_verify_hostname(false);
        }

        let tls_stream = tokio_boring::connect(config, lookup_host, stream)
            .await
            .map_err(|e| {
                tracing::debug!(host = %host, error = ?e, "SSL handshake failed");
                NetError::SslProtocolError
            })?;

        tracing::debug!(host = %host, client_cert = self.client_cert.is_some(), "TLS established");
        Ok(SocketType::Ssl(tls_stream))
    }
}
