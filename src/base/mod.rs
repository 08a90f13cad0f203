//! Base types and error handling.
//!
//! - [`NetError`](neterror::NetError): every failure a request can end with
//! - [`ErrorKind`](neterror::ErrorKind): the caller-facing classification

pub mod context;
pub mod neterror;

pub use neterror::{ErrorKind, NetError};
