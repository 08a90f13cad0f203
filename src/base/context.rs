//! Error context helpers.
//!
//! Extension trait that turns `std::io` failures into `NetError` values and
//! logs the underlying cause, since `NetError` itself carries no payload.

use crate::base::neterror::NetError;
use std::io;

/// Extension trait for adding context to IO Results.
pub trait IoResultExt<T> {
    /// Map a failed TCP connect to the matching connection error.
    ///
    /// # Example
    /// ```ignore
    /// use formpost::base::context::IoResultExt;
    ///
    /// let stream = TcpStream::connect(addr).await
    ///     .connection_context("example.com", 443)?;
    /// ```
    fn connection_context(self, host: &str, port: u16) -> Result<T, NetError>;

    /// Map a failed DNS lookup.
    fn dns_context(self, domain: &str) -> Result<T, NetError>;

    /// Map a failed read from a caller-supplied upload source.
    fn body_source_context(self, part: &str) -> Result<T, NetError>;

    /// Map a failed write into the outgoing request body.
    fn body_sink_context(self) -> Result<T, NetError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn connection_context(self, host: &str, port: u16) -> Result<T, NetError> {
        self.map_err(|e| {
            tracing::debug!(host = %host, port, error = %e, "connect failed");
            match e.kind() {
                io::ErrorKind::ConnectionRefused => NetError::ConnectionRefused,
                io::ErrorKind::TimedOut => NetError::ConnectionTimedOut,
                _ => NetError::ConnectionFailed,
            }
        })
    }

    fn dns_context(self, domain: &str) -> Result<T, NetError> {
        self.map_err(|e| {
            tracing::debug!(domain = %domain, error = %e, "DNS resolution failed");
            NetError::NameNotResolved
        })
    }

    fn body_source_context(self, part: &str) -> Result<T, NetError> {
        self.map_err(|e| {
            tracing::warn!(part = %part, error = %e, "reading upload source failed");
            NetError::BodySourceFailed
        })
    }

    fn body_sink_context(self) -> Result<T, NetError> {
        self.map_err(|e| {
            tracing::debug!(error = %e, "request body sink closed");
            NetError::BodySinkClosed
        })
    }
}
