//! Decoder for the request start line and header block.
//!
//! Parsing is delegated to `httparse`, which tolerates partial input: the decoder is simply
//! re-run as more bytes arrive until the blank line terminating the header block is seen.
//! Duplicate header fields are kept in arrival order.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum size of start line plus headers: 8KB
//! - Only HTTP/1.0 and HTTP/1.1

use bytes::{Buf, BytesMut};
use http::{HeaderName, HeaderValue, Method, Request, Uri, Version};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;

use crate::protocol::{ParseError, PayloadSize, RequestHeader};

/// Maximum number of headers allowed in a request
pub(crate) const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the start line and header section
pub(crate) const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Decodes a [`RequestHeader`] and works out how the body that follows is framed.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderDecoder;

impl Decoder for HeaderDecoder {
    type Item = (RequestHeader, PayloadSize);
    type Error = ParseError;

    /// Returns `Ok(None)` until the whole header block is buffered; on success the header
    /// bytes are consumed from `src` and anything left over belongs to the body.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut req = httparse::Request::new(&mut headers);

        let status = req.parse(src).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            Error::HeaderName | Error::HeaderValue => ParseError::invalid_header(e),
            Error::Version => ParseError::InvalidVersion(None),
            e => ParseError::invalid_start_line(e),
        })?;

        let body_offset = match status {
            Status::Complete(body_offset) => body_offset,
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                return Ok(None);
            }
        };

        trace!(header_size = body_offset, "parsed request header");
        ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));

        let version = match req.version {
            Some(0) => Version::HTTP_10,
            Some(1) => Version::HTTP_11,
            other => return Err(ParseError::InvalidVersion(other)),
        };

        let method = req
            .method
            .ok_or(ParseError::InvalidMethod)
            .and_then(|m| Method::from_bytes(m.as_bytes()).map_err(|_e| ParseError::InvalidMethod))?;

        let uri = req.path.ok_or(ParseError::InvalidUri).and_then(|p| Uri::try_from(p).map_err(|_e| ParseError::InvalidUri))?;

        let mut request = Request::new(());
        *request.method_mut() = method;
        *request.uri_mut() = uri;
        *request.version_mut() = version;

        let header_map = request.headers_mut();
        header_map.reserve(req.headers.len());
        for header in req.headers.iter() {
            let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(ParseError::invalid_header)?;
            let value = HeaderValue::from_bytes(header.value).map_err(ParseError::invalid_header)?;
            header_map.append(name, value);
        }

        src.advance(body_offset);

        let header = RequestHeader::from(request);
        let payload_size = parse_payload(&header)?;

        Ok(Some((header, payload_size)))
    }
}

/// Picks the body framing from `Content-Length` and `Transfer-Encoding`.
///
/// refer: <https://www.rfc-editor.org/rfc/rfc9112.html#name-message-body-length>
fn parse_payload(header: &RequestHeader) -> Result<PayloadSize, ParseError> {
    let te_header = header.headers().get(http::header::TRANSFER_ENCODING);
    let mut cl_values = header.headers().get_all(http::header::CONTENT_LENGTH).iter();

    match (te_header, cl_values.next()) {
        (None, None) => Ok(PayloadSize::new_empty()),

        (Some(te_value), None) => {
            if is_chunked(te_value) {
                Ok(PayloadSize::new_chunked())
            } else {
                Err(ParseError::invalid_header("transfer-encoding must end with chunked"))
            }
        }

        (None, Some(cl_value)) => {
            let length = parse_content_length(cl_value)?;
            for other in cl_values {
                ensure!(parse_content_length(other)? == length, ParseError::invalid_content_length("conflicting values"));
            }
            Ok(PayloadSize::new_length(length))
        }

        (Some(_), Some(_)) => Err(ParseError::invalid_content_length("transfer_encoding and content_length both present in headers")),
    }
}

fn parse_content_length(value: &HeaderValue) -> Result<u64, ParseError> {
    let cl_str = value.to_str().map_err(|_e| ParseError::invalid_content_length("value can't to_str"))?;
    cl_str.trim().parse::<u64>().map_err(|_e| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))
}

/// `chunked` must be the final coding when present.
fn is_chunked(value: &HeaderValue) -> bool {
    value.as_bytes().rsplit(|b| *b == b',').next().is_some_and(|last| last.trim_ascii().eq_ignore_ascii_case(b"chunked"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, Method, Version};
    use indoc::indoc;

    fn crlf(str: &str) -> BytesMut {
        BytesMut::from(str.replace('\n', "\r\n").as_str())
    }

    #[test]
    fn check_is_chunked() {
        let mut headers = HeaderMap::new();
        headers.insert("Transfer-Encoding", "gzip, chunked".parse().unwrap());
        assert!(is_chunked(&headers["Transfer-Encoding"]));

        headers.insert("Transfer-Encoding", "chunked, gzip".parse().unwrap());
        assert!(!is_chunked(&headers["Transfer-Encoding"]));

        headers.insert("Transfer-Encoding", "Chunked".parse().unwrap());
        assert!(is_chunked(&headers["Transfer-Encoding"]));
    }

    #[test]
    fn leaves_body_bytes_in_buffer() {
        let mut bytes = crlf(indoc! {r"
        POST /index.html HTTP/1.1
        Host: 127.0.0.1:8080
        Content-Length: 3

        123"});

        let (header, payload_size) = HeaderDecoder.decode(&mut bytes).unwrap().unwrap();

        assert_eq!(header.method(), &Method::POST);
        assert_eq!(payload_size, PayloadSize::Length(3));
        assert_eq!(&bytes[..], &b"123"[..]);
    }

    #[test]
    fn from_curl() {
        let mut buf = crlf(indoc! {r"
        GET /index/?a=1&b=2&a=3 HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*

        "});

        let (header, payload_size) = HeaderDecoder.decode(&mut buf).unwrap().unwrap();

        assert!(payload_size.is_empty());
        assert!(buf.is_empty());

        assert_eq!(header.method(), &Method::GET);
        assert_eq!(header.version(), Version::HTTP_11);
        assert_eq!(header.uri().path(), "/index/");
        assert_eq!(header.uri().query(), Some("a=1&b=2&a=3"));
        assert_eq!(header.headers().len(), 3);
        assert_eq!(header.headers().get(http::header::USER_AGENT).unwrap(), "curl/7.79.1");
    }

    #[test]
    fn keeps_duplicate_headers_in_order() {
        let mut buf = crlf(indoc! {r"
        GET / HTTP/1.0
        Cookie: a=1
        cookie: b=2

        "});

        let (header, _) = HeaderDecoder.decode(&mut buf).unwrap().unwrap();

        assert_eq!(header.version(), Version::HTTP_10);
        let cookies: Vec<_> = header.headers().get_all(http::header::COOKIE).iter().collect();
        assert_eq!(cookies, ["a=1", "b=2"]);
    }

    #[test]
    fn partial_input_needs_more_data() {
        let mut buf = BytesMut::from("GET /index.html HTTP/1.1\r\nHost: loc");
        assert!(HeaderDecoder.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 35);
    }

    #[test]
    fn malformed_start_line() {
        let mut buf = BytesMut::from("GET\t/ HTTP/1.1\r\n\r\n");
        let err = HeaderDecoder.decode(&mut buf).unwrap_err();
        assert!(matches!(err, ParseError::InvalidStartLine { .. }), "{err}");
    }

    #[test]
    fn malformed_header_line() {
        let mut buf = BytesMut::from("GET / HTTP/1.1\r\nBad Header: x\r\n\r\n");
        let err = HeaderDecoder.decode(&mut buf).unwrap_err();
        assert!(matches!(err, ParseError::InvalidHeader { .. }), "{err}");
    }

    #[test]
    fn unsupported_version_is_a_client_error() {
        for start_line in ["GET / HTTP/2.0\r\n\r\n", "GET / FOO/1.1\r\n\r\n"] {
            let err = HeaderDecoder.decode(&mut BytesMut::from(start_line)).unwrap_err();
            assert!(matches!(err, ParseError::InvalidVersion(_)), "{err}");
            assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST, "{start_line:?}");
        }
    }

    #[test]
    fn oversized_header_block() {
        let mut buf = BytesMut::from(format!("GET / HTTP/1.1\r\nX-Big: {}", "a".repeat(MAX_HEADER_BYTES)).as_str());
        let err = HeaderDecoder.decode(&mut buf).unwrap_err();
        assert!(matches!(err, ParseError::TooLargeHeader { .. }), "{err}");
    }

    #[test]
    fn too_many_headers() {
        let mut raw = String::from("GET / HTTP/1.1\r\n");
        for i in 0..=MAX_HEADER_NUM {
            raw.push_str(&format!("X-{i}: v\r\n"));
        }
        raw.push_str("\r\n");
        let err = HeaderDecoder.decode(&mut BytesMut::from(raw.as_str())).unwrap_err();
        assert!(matches!(err, ParseError::TooManyHeaders { .. }), "{err}");
    }

    #[test]
    fn body_framing() {
        let mut chunked = BytesMut::from("POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n");
        assert_eq!(HeaderDecoder.decode(&mut chunked).unwrap().unwrap().1, PayloadSize::Chunked);

        let mut both = BytesMut::from("POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\nContent-Length: 3\r\n\r\n");
        assert!(HeaderDecoder.decode(&mut both).is_err());

        let mut conflicting = BytesMut::from("POST / HTTP/1.1\r\nContent-Length: 3\r\nContent-Length: 4\r\n\r\n");
        assert!(HeaderDecoder.decode(&mut conflicting).is_err());

        let mut not_a_number = BytesMut::from("POST / HTTP/1.1\r\nContent-Length: abc\r\n\r\n");
        assert!(matches!(
            HeaderDecoder.decode(&mut not_a_number).unwrap_err(),
            ParseError::InvalidContentLength { .. }
        ));
    }
}
