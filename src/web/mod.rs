//! Minimal HTTP file service over the hierarchical store.
//!
//! Pure request/response logic; the socket side lives in
//! [`adapters::http_listener`](crate::adapters::http_listener).

pub mod codec;
pub mod page;
pub mod routes;
