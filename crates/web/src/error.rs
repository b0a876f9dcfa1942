//! Errors raised by handler code.
//!
//! A handler fails either deliberately, with an [`HttpError`] carrying the status the
//! client should see, or because something else went wrong. Any `std::error::Error` turns
//! into the second kind with `?`:
//!
//! ```
//! use ember_web::{HandlerResult, HttpError};
//!
//! fn parse_id(raw: &str) -> HandlerResult<u64> {
//!     if raw.is_empty() {
//!         return Err(HttpError::bad_request("missing id").into());
//!     }
//!     Ok(raw.parse::<u64>()?)
//! }
//!
//! assert!(parse_id("42").is_ok());
//! assert_eq!(parse_id("").unwrap_err().status().as_u16(), 400);
//! assert_eq!(parse_id("x").unwrap_err().status().as_u16(), 500);
//! ```

use std::error::Error;
use std::fmt;

use http::StatusCode;
use thiserror::Error;

pub type HandlerResult<T = ()> = Result<T, HandlerError>;

/// An error deliberately raised with the status and body the client should receive.
///
/// `HttpError` does not implement `std::error::Error` so that the blanket conversion into
/// [`HandlerError::Fault`] never swallows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    status: StatusCode,
    message: Option<String>,
}

impl HttpError {
    pub fn new(status: StatusCode) -> Self {
        Self { status, message: None }
    }

    pub fn with_message(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: Some(message.into()) }
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_message(StatusCode::BAD_REQUEST, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = self.status.canonical_reason().unwrap_or("Unknown");
        write!(f, "[status {}] {}", self.status.as_u16(), self.message.as_deref().unwrap_or(reason))
    }
}

impl From<StatusCode> for HttpError {
    fn from(status: StatusCode) -> Self {
        Self::new(status)
    }
}

#[derive(Debug)]
pub enum HandlerError {
    Http(HttpError),
    Fault(Box<dyn Error + Send + Sync>),
}

impl HandlerError {
    pub fn status(&self) -> StatusCode {
        match self {
            HandlerError::Http(e) => e.status(),
            HandlerError::Fault(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn fault(message: impl Into<String>) -> Self {
        let message: String = message.into();
        HandlerError::Fault(message.into())
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Http(e) => e.fmt(f),
            HandlerError::Fault(e) => e.fmt(f),
        }
    }
}

impl From<HttpError> for HandlerError {
    fn from(e: HttpError) -> Self {
        HandlerError::Http(e)
    }
}

impl<E: Error + Send + Sync + 'static> From<E> for HandlerError {
    fn from(e: E) -> Self {
        HandlerError::Fault(Box::new(e))
    }
}

/// Failure of [`Response::write_json`](crate::Response::write_json).
#[derive(Error, Debug)]
pub enum WriteJsonError {
    #[error("json body must be a mapping or a record, got {kind}")]
    NotAMapping { kind: &'static str },

    #[error("can't serialize json body: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
}

/// A response header or cookie that can't be put on the wire.
#[derive(Error, Debug)]
pub enum HeaderError {
    #[error("invalid header name: {name:?}")]
    InvalidName { name: String },

    #[error("invalid value for header {name}")]
    InvalidValue { name: String },

    #[error("invalid cookie: {reason}")]
    InvalidCookie { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fails_with_parse() -> HandlerResult<u32> {
        let n = "x".parse::<u32>()?;
        Ok(n)
    }

    #[test]
    fn any_error_becomes_fault() {
        let err = fails_with_parse().unwrap_err();
        assert!(matches!(err, HandlerError::Fault(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "invalid digit found in string");
    }

    #[test]
    fn http_error_keeps_status() {
        let err: HandlerError = HttpError::with_message(StatusCode::NOT_FOUND, "no such user").into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "[status 404] no such user");
        assert_eq!(HttpError::method_not_allowed().to_string(), "[status 405] Method Not Allowed");
    }
}
