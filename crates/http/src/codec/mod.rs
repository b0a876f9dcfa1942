//! Wire format of requests and responses.
//!
//! - [`RequestDecoder`] incrementally turns raw bytes into a request head and body chunks.
//! - [`ResponseEncoder`] serializes a complete `http::Response<Bytes>`.
//!
//! Both plug into `tokio_util::codec::{FramedRead, FramedWrite}`.
//!
//! ```
//! use bytes::{Bytes, BytesMut};
//! use ember_http::codec::ResponseEncoder;
//! use http::Response;
//! use tokio_util::codec::Encoder;
//!
//! let mut encoder = ResponseEncoder::new();
//! let mut buffer = BytesMut::new();
//! encoder.encode(Response::new(Bytes::from_static(b"hi")), &mut buffer).unwrap();
//! assert!(buffer.ends_with(b"Content-Length: 2\r\n\r\nhi"));
//! ```

mod body;
mod header;
mod request_decoder;
mod response_encoder;

pub use header::{HeaderDecoder, HeaderEncoder};
pub(crate) use header::{MAX_HEADER_BYTES, MAX_HEADER_NUM};
pub use request_decoder::{ParserState, RequestDecoder};
pub use response_encoder::ResponseEncoder;
