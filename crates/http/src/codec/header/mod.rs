//! Start line and header block handling.
//!
//! - [`HeaderDecoder`] turns the raw request head into a [`RequestHeader`](crate::protocol::RequestHeader)
//!   and decides how the body is framed, enforcing the header count and size limits.
//! - [`HeaderEncoder`] writes the response status line and headers, fixing up `Content-Length`.

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub use header_encoder::HeaderEncoder;
pub(crate) use header_decoder::{MAX_HEADER_BYTES, MAX_HEADER_NUM};
