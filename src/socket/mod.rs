//! Socket and connection setup.
//!
//! - [`connectjob`]: DNS → TCP → TLS connection flow
//! - [`client`]: plain or TLS socket behind one type
//! - [`tls`]: TLS configuration and client certificates with BoringSSL

pub mod client;
pub mod connectjob;
pub mod tls;
