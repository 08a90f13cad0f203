//! TLS configuration and client certificates, backed by BoringSSL.

use crate::base::neterror::NetError;
use boring::pkcs12::Pkcs12;
use boring::pkey::{PKey, Private};
use boring::ssl::{SslConnectorBuilder, SslVerifyMode, SslVersion};
use boring::x509::{X509Ref, X509};
use std::fmt;
use std::path::Path;
use zeroize::Zeroizing;

/// TLS settings applied to every handshake.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub min_version: Option<SslVersion>,
    pub max_version: Option<SslVersion>,
    pub alpn_protos: Vec<String>,
    /// Verify the server certificate chain. Disable only for local testing.
    pub verify_peer: bool,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            min_version: Some(SslVersion::TLS1_2),
            max_version: Some(SslVersion::TLS1_3),
            alpn_protos: vec!["http/1.1".to_string()],
            verify_peer: true,
        }
    }
}

impl TlsConfig {
    /// Apply this configuration to an SSL connector builder.
    pub fn apply_to_builder(&self, builder: &mut SslConnectorBuilder) -> Result<(), NetError> {
        if let Some(min) = self.min_version {
            builder
                .set_min_proto_version(Some(min))
                .map_err(|_| NetError::SslProtocolError)?;
        }
        if let Some(max) = self.max_version {
            builder
                .set_max_proto_version(Some(max))
                .map_err(|_| NetError::SslProtocolError)?;
        }

        if !self.alpn_protos.is_empty() {
            let mut alpn_wire = Vec::new();
            for proto in &self.alpn_protos {
                if proto.len() > 255 {
                    return Err(NetError::SslProtocolError);
                }
                alpn_wire.push(proto.len() as u8);
                alpn_wire.extend_from_slice(proto.as_bytes());
            }
            builder
                .set_alpn_protos(&alpn_wire)
                .map_err(|_| NetError::SslProtocolError)?;
        }

        builder.set_verify(if self.verify_peer {
            SslVerifyMode::PEER
        } else {
            SslVerifyMode::NONE
        });

        Ok(())
    }

    /// Check if SNI (Server Name Indication) should be set for this host.
    /// Per RFC 6066, SNI MUST NOT be set for raw IP addresses.
    pub fn should_set_sni(host: &str) -> bool {
        host.trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<std::net::IpAddr>()
            .is_err()
    }
}

/// A client certificate with its private key, presented for mutual TLS.
#[derive(Clone)]
pub struct ClientCertificate {
    cert: X509,
    key: PKey<Private>,
    chain: Vec<X509>,
}

impl fmt::Debug for ClientCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCertificate")
            .field("chain_len", &self.chain.len())
            .finish_non_exhaustive()
    }
}

impl ClientCertificate {
    /// Load from PEM. `cert_pem` holds the leaf first, optionally followed
    /// by intermediates.
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self, NetError> {
        let mut certs = X509::stack_from_pem(cert_pem).map_err(|e| {
            tracing::debug!(error = %e, "client certificate PEM rejected");
            NetError::BadClientCertificate
        })?;
        if certs.is_empty() {
            return Err(NetError::BadClientCertificate);
        }
        let cert = certs.remove(0);
        let key = PKey::private_key_from_pem(key_pem).map_err(|e| {
            tracing::debug!(error = %e, "client key PEM rejected");
            NetError::BadClientCertificate
        })?;

        Ok(Self {
            cert,
            key,
            chain: certs,
        })
    }

    /// Load from a PKCS#12 archive. The password is borrowed for the parse
    /// and never stored.
    pub fn from_pkcs12(der: &[u8], password: &str) -> Result<Self, NetError> {
        let parsed = Pkcs12::from_der(der)
            .and_then(|p12| p12.parse(password))
            .map_err(|e| {
                tracing::debug!(error = %e, "PKCS#12 archive rejected");
                NetError::BadClientCertificate
            })?;

        Ok(Self {
            cert: parsed.cert,
            key: parsed.pkey,
            chain: parsed.chain.map(|s| s.into_iter().collect()).unwrap_or_default(),
        })
    }

    /// Read and load a PKCS#12 file. The raw archive is wiped from memory
    /// after parsing.
    pub async fn from_pkcs12_file<P: AsRef<Path>>(
        path: P,
        password: &str,
    ) -> Result<Self, NetError> {
        let der = Zeroizing::new(tokio::fs::read(path.as_ref()).await.map_err(|e| {
            tracing::debug!(path = %path.as_ref().display(), error = %e, "cannot read PKCS#12 file");
            NetError::BadClientCertificate
        })?);
        Self::from_pkcs12(&der, password)
    }

    /// Read and load PEM certificate and key files.
    pub async fn from_pem_files<C, K>(cert_path: C, key_path: K) -> Result<Self, NetError>
    where
        C: AsRef<Path>,
        K: AsRef<Path>,
    {
        let read = |path: &Path| {
            let path = path.to_path_buf();
            async move {
                tokio::fs::read(&path).await.map_err(|e| {
                    tracing::debug!(path = %path.display(), error = %e, "cannot read PEM file");
                    NetError::BadClientCertificate
                })
            }
        };
        let cert = read(cert_path.as_ref()).await?;
        let key = Zeroizing::new(read(key_path.as_ref()).await?);
        Self::from_pem(&cert, &key)
    }

    /// The leaf certificate.
    pub fn certificate(&self) -> &X509Ref {
        &self.cert
    }

    /// Install the certificate, chain and key on a connector.
    pub fn apply_to_builder(&self, builder: &mut SslConnectorBuilder) -> Result<(), NetError> {
        builder
            .set_certificate(&self.cert)
            .map_err(|_| NetError::BadClientCertificate)?;
        for extra in &self.chain {
            builder
                .add_extra_chain_cert(extra.clone())
                .map_err(|_| NetError::BadClientCertificate)?;
        }
        builder
            .set_private_key(&self.key)
            .map_err(|_| NetError::BadClientCertificate)?;
        builder
            .check_private_key()
            .map_err(|_| NetError::BadClientCertificate)
    }
}
