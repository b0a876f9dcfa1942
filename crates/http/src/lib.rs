//! The HTTP/1.x plumbing underneath `ember`.
//!
//! This crate turns a raw byte stream into a request, hands the request to a
//! [`handler::Handler`] and writes the response back. It knows nothing about routing,
//! cookies or forms; that lives in `ember-web`.
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use ember_http::connection::HttpConnection;
//! use ember_http::handler::{make_handler, Request};
//! use http::Response;
//! use std::convert::Infallible;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use tracing::{error, info, warn};
//!
//! #[tokio::main]
//! async fn main() {
//!     let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
//!         Ok(tcp_listener) => tcp_listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     let handler = Arc::new(make_handler(hello_world));
//!
//!     loop {
//!         let (tcp_stream, _remote_addr) = match tcp_listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let handler = handler.clone();
//!         tokio::spawn(async move {
//!             let (reader, writer) = tcp_stream.into_split();
//!             if let Err(e) = HttpConnection::new(reader, writer).process(handler).await {
//!                 info!(cause = %e, "request rejected");
//!             }
//!         });
//!     }
//! }
//!
//! async fn hello_world(_request: Request) -> Result<Response<Bytes>, Infallible> {
//!     Ok(Response::new(Bytes::from_static(b"Hello World")))
//! }
//! ```
//!
//! # Modules
//!
//! - [`codec`]: incremental request decoding and response encoding
//! - [`connection`]: the one-request-per-stream lifecycle
//! - [`handler`]: the application boundary
//! - [`protocol`]: request head, parse states and errors
//!
//! # Limitations
//!
//! - HTTP/1.0 and HTTP/1.1 only, one request per connection
//! - No TLS
//! - Maximum header size: 8KB
//! - Maximum number of headers: 64

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
