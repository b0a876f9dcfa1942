//! Serializes the status line and header block of a response.
//!
//! `Content-Length` is always rewritten to the real body length so a handler can never
//! announce a size it does not send. Header names go out in canonical casing
//! (`Content-Type`, `Set-Cookie`) even though `http` stores them lowercased.

use crate::protocol::{ResponseHead, SendError};

use bytes::{BufMut, BytesMut};

use http::{header, HeaderValue, Version};
use std::io;
use std::io::Write;
use tokio_util::codec::Encoder;

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 1024;

/// Encodes a [`ResponseHead`] together with the length of the body that follows it.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderEncoder;

impl Encoder<(ResponseHead, u64)> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (ResponseHead, u64), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut header, body_len) = item;

        dst.reserve(INIT_HEADER_SIZE);

        let version = match header.version() {
            Version::HTTP_10 => "HTTP/1.0",
            _ => "HTTP/1.1",
        };
        let status = header.status();
        write!(FastWrite(dst), "{version} {} {}\r\n", status.as_str(), status.canonical_reason().unwrap_or("Unknown"))?;

        header.headers_mut().insert(header::CONTENT_LENGTH, HeaderValue::from(body_len));

        for (header_name, header_value) in header.headers() {
            let value = header_value.as_bytes();
            if value.iter().any(|b| matches!(b, b'\r' | b'\n' | b'\0')) {
                return Err(SendError::invalid_header(format!("value of {header_name} contains a control character")));
            }

            put_canonical_name(dst, header_name.as_str());
            dst.put_slice(b": ");
            dst.put_slice(value);
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// Writes `name` with the first letter and every letter after a `-` upper-cased.
fn put_canonical_name(dst: &mut BytesMut, name: &str) {
    let mut upper = true;
    for b in name.bytes() {
        dst.put_u8(if upper { b.to_ascii_uppercase() } else { b });
        upper = b == b'-';
    }
}

struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Response, StatusCode};

    fn encode(head: ResponseHead, len: u64) -> Result<String, SendError> {
        let mut dst = BytesMut::new();
        HeaderEncoder.encode((head, len), &mut dst)?;
        Ok(String::from_utf8(dst.to_vec()).unwrap())
    }

    #[test]
    fn writes_status_line_and_canonical_names() {
        let head = Response::builder()
            .status(StatusCode::NOT_FOUND)
            .header("content-type", "text/html")
            .header("x-request-id", "abc")
            .body(())
            .unwrap();

        let text = encode(head, 5).unwrap();
        assert_eq!(text, "HTTP/1.1 404 Not Found\r\nContent-Type: text/html\r\nX-Request-Id: abc\r\nContent-Length: 5\r\n\r\n");
    }

    #[test]
    fn content_length_is_overwritten() {
        let head = Response::builder().header(header::CONTENT_LENGTH, "999").body(()).unwrap();
        let text = encode(head, 0).unwrap();
        assert_eq!(text, "HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
    }

    #[test]
    fn echoes_http_10() {
        let head = Response::builder().version(Version::HTTP_10).status(StatusCode::FOUND).body(()).unwrap();
        assert!(encode(head, 0).unwrap().starts_with("HTTP/1.0 302 Found\r\n"));
    }

    #[test]
    fn unknown_status_reason() {
        let head = Response::builder().status(599).body(()).unwrap();
        assert!(encode(head, 0).unwrap().starts_with("HTTP/1.1 599 Unknown\r\n"));
    }

    #[test]
    fn keeps_every_set_cookie_line() {
        let head = Response::builder().header("set-cookie", "a=1").header("set-cookie", "b=2").body(()).unwrap();
        let text = encode(head, 0).unwrap();
        assert!(text.contains("Set-Cookie: a=1\r\nSet-Cookie: b=2\r\n"));
    }
}
