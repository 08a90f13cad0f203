//! Request encoding, execution and response decoding.
//!
//! - [`query`]: query strings and URL-encoded form bodies
//! - [`multipart`]: multipart/form-data parts and body writer
//! - [`executor`]: runs one request against a [`transport::Transport`]
//! - [`transport`]: the transport seam and the default network transport

pub mod executor;
pub mod multipart;
pub mod query;
pub mod requestbody;
pub mod response;
pub mod responsebody;
pub mod streamfactory;
pub mod transport;

// Re-exports for convenience
pub use requestbody::RequestBody;
pub use response::HttpResponse;
pub use responsebody::ResponseBody;
