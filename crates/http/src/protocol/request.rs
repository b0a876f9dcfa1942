//! Parsed request head and the request-level parse state.
//!
//! [`RequestHeader`] wraps `http::Request<()>` so the start line and header block can be
//! handed around before the body has arrived. [`RequestState`] tracks where the request
//! stands between the header block and the end of the message.

use http::header::EXPECT;
use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri, Version};

/// The start line and header block of a request.
#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
}

impl AsRef<Request<()>> for RequestHeader {
    fn as_ref(&self) -> &Request<()> {
        &self.inner
    }
}

impl AsMut<Request<()>> for RequestHeader {
    fn as_mut(&mut self) -> &mut Request<()> {
        &mut self.inner
    }
}

impl RequestHeader {
    pub fn into_inner(self) -> Request<()> {
        self.inner
    }

    /// Attaches a body to this header, converting it into a full `Request<T>`.
    pub fn body<T>(self, body: T) -> Request<T> {
        self.inner.map(|()| body)
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    pub fn version(&self) -> Version {
        self.inner.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Returns true when the client sent `Expect: 100-continue` and is waiting for the
    /// interim response before it transmits the body.
    pub fn expects_continue(&self) -> bool {
        self.headers()
            .get_all(EXPECT)
            .iter()
            .any(|value| value.as_bytes().trim_ascii().eq_ignore_ascii_case(b"100-continue"))
    }
}

impl From<Parts> for RequestHeader {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Request::from_parts(parts, ()) }
    }
}

impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}

/// Progress of a single request through the parser.
///
/// The connection must answer `ExpectContinue` with an interim `100 Continue` line and then
/// reset the state back to `Processing` before more body bytes are consumed. Routing only
/// happens once the state is `Complete`.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum RequestState {
    #[default]
    Processing,
    ExpectContinue,
    Complete,
}

impl RequestState {
    #[inline]
    pub fn is_complete(self) -> bool {
        matches!(self, RequestState::Complete)
    }

    #[inline]
    pub fn needs_write_continue(self) -> bool {
        matches!(self, RequestState::ExpectContinue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(expect: Option<&str>) -> RequestHeader {
        let mut builder = Request::builder().method(Method::POST).uri("/upload");
        if let Some(value) = expect {
            builder = builder.header(EXPECT, value);
        }
        builder.body(()).unwrap().into()
    }

    #[test]
    fn detects_expect_continue() {
        assert!(header(Some("100-continue")).expects_continue());
        assert!(header(Some("100-Continue ")).expects_continue());
        assert!(!header(Some("something-else")).expects_continue());
        assert!(!header(None).expects_continue());
    }

    #[test]
    fn attaches_body() {
        let request = header(None).body("payload");
        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.uri().path(), "/upload");
        assert_eq!(*request.body(), "payload");
    }

    #[test]
    fn state_flags() {
        assert_eq!(RequestState::default(), RequestState::Processing);
        assert!(RequestState::ExpectContinue.needs_write_continue());
        assert!(RequestState::Complete.is_complete());
        assert!(!RequestState::Processing.is_complete());
    }
}
