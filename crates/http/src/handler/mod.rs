//! The boundary between the connection driver and application code.
//!
//! A [`Handler`] receives a fully read request and produces a complete response. Plain
//! async functions can be used through [`make_handler`].

use std::error::Error;
use std::future::Future;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Response, StatusCode};

use crate::protocol::{ParseError, RequestHeader};

pub type Request = http::Request<Bytes>;

#[async_trait]
pub trait Handler: Send + Sync {
    type Error: Into<Box<dyn Error + Send + Sync>>;

    async fn call(&self, req: Request) -> Result<Response<Bytes>, Self::Error>;

    /// Builds the response sent when the request could not be parsed. `header` is present
    /// when the failure happened while reading the body.
    fn on_parse_error(&self, header: Option<&RequestHeader>, error: &ParseError) -> Response<Bytes> {
        let _ = header;
        status_response(error.status_code())
    }
}

/// A response with the given status and no body.
pub fn status_response(status: StatusCode) -> Response<Bytes> {
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = status;
    response
}

#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<Err, F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Err: Into<Box<dyn Error + Send + Sync>>,
    Fut: Future<Output = Result<Response<Bytes>, Err>> + Send,
{
    type Error = Err;

    async fn call(&self, req: Request) -> Result<Response<Bytes>, Self::Error> {
        (self.f)(req).await
    }
}

pub fn make_handler<F, Err, Ret>(f: F) -> HandlerFn<F>
where
    Err: Into<Box<dyn Error + Send + Sync>>,
    Ret: Future<Output = Result<Response<Bytes>, Err>>,
    F: Fn(Request) -> Ret,
{
    HandlerFn { f }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    async fn echo_path(req: Request) -> Result<Response<Bytes>, Infallible> {
        Ok(Response::new(Bytes::from(req.uri().path().to_owned())))
    }

    #[tokio::test]
    async fn function_handler() {
        let handler = make_handler(echo_path);
        let request = http::Request::builder().uri("/echo").body(Bytes::new()).unwrap();

        let response = handler.call(request).await.unwrap();
        assert_eq!(response.body(), "/echo");

        let rejected = handler.on_parse_error(None, &ParseError::InvalidMethod);
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
        assert!(rejected.body().is_empty());
    }
}
