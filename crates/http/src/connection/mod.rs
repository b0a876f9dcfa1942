//! Per-connection request lifecycle.
//!
//! [`HttpConnection`] reads exactly one request from a byte stream, hands it to a
//! [`Handler`](crate::handler::Handler), writes the response and closes the stream.
//! Persistent connections are not supported.

mod http_connection;

pub use http_connection::HttpConnection;
