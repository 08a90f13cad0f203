//! # formpost
//!
//! HTTP GET and POST helpers for talking to web APIs: plain requests,
//! URL-encoded forms and multipart/form-data file uploads, each returning the
//! decoded response text.
//!
//! ## Features
//!
//! - **Multipart uploads**: parts are written straight into the request as it
//!   is sent; file contents are never buffered whole
//! - **Forms and query strings**: RFC 3986 percent-encoding
//! - **Charsets**: responses decoded with any WHATWG encoding (UTF-8, GBK, ...)
//! - **TLS**: BoringSSL, with optional client certificates (PEM or PKCS#12)
//! - **Pluggable transport**: swap the network layer through [`Transport`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use formpost::{http_get, http_post_form, RequestOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), formpost::NetError> {
//!     let token = http_get("https://api.example.com/token", RequestOptions::new()).await?;
//!     let reply = http_post_form(
//!         "https://api.example.com/submit",
//!         [("token", token.as_str()), ("msg", "hello world")],
//!         RequestOptions::new().timeout_ms(3000),
//!     )
//!     .await?;
//!     println!("{reply}");
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error definitions
//! - [`http`] - Encoding, request execution, transport and responses
//! - [`socket`] - Connection setup and TLS

pub mod base;
pub mod client;
pub mod http;
pub mod socket;

pub use base::{ErrorKind, NetError};
pub use client::{
    http_get, http_post, http_post_form, http_post_multipart, Client, ClientBuilder,
    RequestOptions,
};
pub use http::multipart::{FilePart, FilePartBuilder, FormPart, MultipartWriter, Part};
pub use http::query::{append_query, build_form_string, build_query_string};
#[cfg(feature = "json")]
pub use http::query::pairs_from_object;
pub use http::transport::{NetworkTransport, Transport, TransportConfig, TransportRequest};
pub use http::{HttpResponse, RequestBody, ResponseBody};
pub use socket::tls::{ClientCertificate, TlsConfig};

/// Re-exported so callers can name encodings without a direct dependency.
pub use encoding_rs::Encoding;
