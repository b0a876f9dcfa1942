//! Incremental request decoder.
//!
//! [`RequestDecoder`] is fed whatever bytes the connection happened to read, with arbitrary
//! chunk boundaries, and emits one [`Message::Header`] followed by the body as a series of
//! [`PayloadItem::Chunk`] and a closing [`PayloadItem::Eof`]. Nothing beyond the current
//! section is buffered: body chunks are handed out as soon as they arrive.
//!
//! Two pieces of state are exposed:
//!
//! - [`ParserState`] is where the decoder stands on the wire.
//! - [`RequestState`] is what the connection must do about the request: answer an
//!   `Expect: 100-continue`, keep reading, or route the finished request.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use ember_http::codec::{ParserState, RequestDecoder};
//! use ember_http::protocol::Message;
//! use tokio_util::codec::Decoder;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::from("GET /index.html HT");
//! assert!(decoder.decode(&mut buffer).unwrap().is_none());
//! assert_eq!(decoder.parser_state(), ParserState::AwaitingStartLine);
//!
//! buffer.extend_from_slice(b"TP/1.1\r\nHost: localhost\r\n\r\n");
//! let message = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert!(matches!(message, Message::Header(_)));
//! assert_eq!(decoder.parser_state(), ParserState::AwaitingBody);
//! ```

use crate::codec::body::PayloadDecoder;
use crate::codec::header::HeaderDecoder;
use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, RequestHeader, RequestState};
use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::trace;

/// Position of the decoder within the current request.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum ParserState {
    /// Nothing or only part of the request line has arrived
    #[default]
    AwaitingStartLine,
    /// The request line is complete, the header block is not
    AwaitingHeaders,
    /// Headers were emitted, body bytes are being consumed
    AwaitingBody,
    /// The whole message has been emitted
    Done,
}

#[derive(Debug, Default)]
pub struct RequestDecoder {
    header_decoder: HeaderDecoder,
    payload_decoder: Option<PayloadDecoder>,
    parser_state: ParserState,
    request_state: RequestState,
}

impl RequestDecoder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn parser_state(&self) -> ParserState {
        self.parser_state
    }

    pub fn request_state(&self) -> RequestState {
        self.request_state
    }

    /// Clears the pending continue flag once the interim response has been written.
    pub fn reset_continue(&mut self) {
        if self.request_state.needs_write_continue() {
            self.request_state = RequestState::Processing;
        }
    }

    fn decode_payload(&mut self, src: &mut BytesMut) -> Result<Option<PayloadItem>, ParseError> {
        let Some(payload_decoder) = &mut self.payload_decoder else {
            return Ok(None);
        };

        let item = payload_decoder.decode(src)?;
        if let Some(PayloadItem::Eof) = item {
            self.payload_decoder.take();
            self.parser_state = ParserState::Done;
            self.request_state = RequestState::Complete;
            trace!("request message complete");
        }
        Ok(item)
    }

    fn decode_header(&mut self, src: &mut BytesMut) -> Result<Option<(RequestHeader, PayloadSize)>, ParseError> {
        if self.parser_state == ParserState::Done {
            self.parser_state = ParserState::AwaitingStartLine;
            self.request_state = RequestState::Processing;
        }

        if self.parser_state == ParserState::AwaitingStartLine && src.contains(&b'\n') {
            self.parser_state = ParserState::AwaitingHeaders;
        }

        let Some((header, payload_size)) = self.header_decoder.decode(src)? else {
            return Ok(None);
        };

        self.request_state = if header.expects_continue() { RequestState::ExpectContinue } else { RequestState::Processing };
        self.parser_state = ParserState::AwaitingBody;
        self.payload_decoder = Some(payload_size.into());

        Ok(Some((header, payload_size)))
    }
}

impl Decoder for RequestDecoder {
    type Item = Message<(RequestHeader, PayloadSize)>;
    type Error = ParseError;

    /// Returns `Ok(None)` whenever more bytes are needed to make progress.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.payload_decoder.is_some() {
            return Ok(self.decode_payload(src)?.map(Message::Payload));
        }

        Ok(self.decode_header(src)?.map(Message::Header))
    }

    /// A peer that hangs up in the middle of a request is not a protocol error: whatever can
    /// still be decoded is returned and the partial remainder is dropped.
    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let item = self.decode(buf)?;
        if item.is_none() && !buf.is_empty() {
            trace!(remaining = buf.len(), parser_state = ?self.parser_state, "stream closed before request completed");
            buf.clear();
        }
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use indoc::indoc;

    fn crlf(str: &str) -> String {
        str.replace('\n', "\r\n")
    }

    /// Feeds `raw` in pieces of `step` bytes and collects the header and body.
    fn decode_in_steps(raw: &[u8], step: usize) -> (RequestHeader, Vec<u8>) {
        let mut decoder = RequestDecoder::new();
        let mut buffer = BytesMut::new();
        let mut header = None;
        let mut body = Vec::new();

        for piece in raw.chunks(step) {
            buffer.extend_from_slice(piece);
            while let Some(message) = decoder.decode(&mut buffer).unwrap() {
                match message {
                    Message::Header((h, _)) => header = Some(h),
                    Message::Payload(PayloadItem::Chunk(bytes)) => body.extend_from_slice(&bytes),
                    Message::Payload(PayloadItem::Eof) => {
                        assert!(decoder.request_state().is_complete());
                        return (header.unwrap(), body);
                    }
                }
            }
        }
        panic!("request never completed");
    }

    #[test]
    fn chunk_boundaries_do_not_matter() {
        let raw = crlf(indoc! {r"
        POST /product?x=1 HTTP/1.1
        Host: 127.0.0.1:8080
        Content-Type: application/x-www-form-urlencoded
        Content-Length: 19

        a=22&b=33&a=1&c=100"});

        for step in [1, 2, 3, 7, 64, raw.len()] {
            let (header, body) = decode_in_steps(raw.as_bytes(), step);
            assert_eq!(header.method(), &Method::POST);
            assert_eq!(header.uri().path(), "/product");
            assert_eq!(body, b"a=22&b=33&a=1&c=100", "step {step}");
        }
    }

    #[test]
    fn chunked_request_body() {
        let raw = crlf(indoc! {r"
        PUT /upload HTTP/1.1
        Transfer-Encoding: chunked

        5
        hello
        6
         world
        0

        "});

        let (header, body) = decode_in_steps(raw.as_bytes(), 5);
        assert_eq!(header.method(), &Method::PUT);
        assert_eq!(body, b"hello world");
    }

    #[test]
    fn tracks_parser_state() {
        let mut decoder = RequestDecoder::new();
        let mut buffer = BytesMut::from("GET / HTTP/1.1\r\nHost: a");

        assert!(decoder.decode(&mut buffer).unwrap().is_none());
        assert_eq!(decoder.parser_state(), ParserState::AwaitingHeaders);

        buffer.extend_from_slice(b"\r\n\r\n");
        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_header());
        assert_eq!(decoder.parser_state(), ParserState::AwaitingBody);
        assert!(!decoder.request_state().is_complete());

        let message = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(message.into_payload_item(), Some(PayloadItem::Eof));
        assert_eq!(decoder.parser_state(), ParserState::Done);
        assert!(decoder.request_state().is_complete());
    }

    #[test]
    fn expect_continue_state() {
        let mut decoder = RequestDecoder::new();
        let mut buffer = BytesMut::from("POST /upload HTTP/1.1\r\nExpect: 100-continue\r\nContent-Length: 2\r\n\r\n");

        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_header());
        assert!(decoder.request_state().needs_write_continue());

        decoder.reset_continue();
        assert_eq!(decoder.request_state(), RequestState::Processing);

        assert!(decoder.decode(&mut buffer).unwrap().is_none());
        buffer.extend_from_slice(b"ok");
        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_payload());
        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_payload());
        assert!(decoder.request_state().is_complete());
    }

    #[test]
    fn early_close_is_not_an_error() {
        let mut decoder = RequestDecoder::new();
        let mut buffer = BytesMut::from("GET /index.ht");
        assert!(decoder.decode_eof(&mut buffer).unwrap().is_none());
        assert!(buffer.is_empty());

        let mut decoder = RequestDecoder::new();
        let mut buffer = BytesMut::from("POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc");
        assert!(decoder.decode_eof(&mut buffer).unwrap().unwrap().is_header());
        assert!(decoder.decode_eof(&mut buffer).unwrap().unwrap().is_payload());
        assert!(decoder.decode_eof(&mut buffer).unwrap().is_none());
        assert!(!decoder.request_state().is_complete());
    }

    #[test]
    fn malformed_request_fails() {
        let mut decoder = RequestDecoder::new();
        let mut buffer = BytesMut::from("GET / HTTP/1.1\r\n: no-name\r\n\r\n");
        assert!(decoder.decode(&mut buffer).is_err());
    }
}
