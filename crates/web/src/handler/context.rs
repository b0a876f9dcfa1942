use http::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::app::AppConfig;
use crate::cookie::Cookie;
use crate::error::{HandlerError, HandlerResult, HttpError};
use crate::form::FilePart;
use crate::request::Request;
use crate::response::Response;
use crate::router::{PathArgs, RouteSettings};
use crate::secure;

/// Everything a [`RequestHandler`](super::RequestHandler) method works with: the request,
/// the response being built, the captured path arguments and the route settings.
///
/// Readers borrow from the request for `'a`, so their results stay usable while the
/// response is written.
#[derive(Debug)]
pub struct Context<'a> {
    config: &'a AppConfig,
    request: &'a Request,
    response: &'a mut Response,
    args: &'a PathArgs,
    settings: &'a RouteSettings,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        config: &'a AppConfig,
        request: &'a Request,
        response: &'a mut Response,
        args: &'a PathArgs,
        settings: &'a RouteSettings,
    ) -> Self {
        Self { config, request, response, args, settings }
    }

    pub(crate) fn parts(&mut self) -> (&Request, &mut Response, &PathArgs) {
        (self.request, &mut *self.response, self.args)
    }

    pub fn request(&self) -> &'a Request {
        self.request
    }

    pub fn response(&mut self) -> &mut Response {
        &mut *self.response
    }

    pub fn settings(&self) -> &'a RouteSettings {
        self.settings
    }

    /// Whether the application runs in debug mode.
    pub fn debug(&self) -> bool {
        self.config.debug
    }

    pub fn path_args(&self) -> &'a PathArgs {
        self.args
    }

    pub fn path_arg(&self, name: &str) -> Option<&'a str> {
        self.args.get(name)
    }

    pub fn path_nth(&self, index: usize) -> Option<&'a str> {
        self.args.nth(index)
    }

    pub fn header(&self, name: &str) -> Option<&'a str> {
        self.request.header(name)
    }

    pub fn cookie(&self, name: &str) -> Option<&'a str> {
        self.request.cookie(name)
    }

    pub fn query_argument(&self, name: &str) -> Option<&'a str> {
        self.request.query_argument(name)
    }

    pub fn query_arguments(&self, name: &str) -> Vec<&'a str> {
        self.request.query_arguments(name)
    }

    pub fn body_argument(&self, name: &str) -> Option<String> {
        self.request.body_argument(name)
    }

    pub fn body_arguments(&self, name: &str) -> Vec<String> {
        self.request.body_arguments(name)
    }

    /// A body argument if present, otherwise a query argument.
    pub fn argument(&self, name: &str) -> Option<String> {
        self.request.argument(name)
    }

    pub fn file(&self, name: &str) -> Option<&'a FilePart> {
        self.request.file(name)
    }

    /// Like [`query_argument`](Self::query_argument), failing with `400` when absent.
    pub fn require_query_argument(&self, name: &str) -> HandlerResult<&'a str> {
        self.query_argument(name).ok_or_else(|| missing(name))
    }

    pub fn require_body_argument(&self, name: &str) -> HandlerResult<String> {
        self.body_argument(name).ok_or_else(|| missing(name))
    }

    pub fn require_argument(&self, name: &str) -> HandlerResult<String> {
        self.argument(name).ok_or_else(|| missing(name))
    }

    /// Deserializes the query into `T`. A query that doesn't fit is a `400`.
    pub fn query_as<T: DeserializeOwned>(&self) -> HandlerResult<T> {
        self.request.query_as().map_err(|e| HttpError::bad_request(e.to_string()).into())
    }

    pub fn write(&mut self, text: impl AsRef<str>) {
        self.response.write(text);
    }

    pub fn write_bytes(&mut self, bytes: impl Into<bytes::Bytes>) {
        self.response.write_bytes(bytes);
    }

    pub fn write_json<T: Serialize + ?Sized>(&mut self, data: &T) -> HandlerResult {
        Ok(self.response.write_json(data)?)
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.response.set_status(status);
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> HandlerResult {
        Ok(self.response.set_header(name, value)?)
    }

    pub fn add_header(&mut self, name: &str, value: &str) -> HandlerResult {
        Ok(self.response.add_header(name, value)?)
    }

    pub fn redirect(&mut self, url: &str, permanent: bool) -> HandlerResult {
        Ok(self.response.redirect(url, permanent)?)
    }

    pub fn set_cookie(&mut self, cookie: Cookie) -> HandlerResult {
        Ok(self.response.set_cookie(cookie)?)
    }

    pub fn clear_cookie(&mut self, name: &str) -> HandlerResult {
        Ok(self.response.clear_cookie(name)?)
    }

    /// Sets `cookie` with its value signed by the application's cookie secret.
    pub fn set_secure_cookie(&mut self, cookie: Cookie) -> HandlerResult {
        let secret = self.cookie_secret()?;
        let token = secure::sign(cookie.name(), cookie.value(), secret);
        self.set_cookie(cookie.with_value(token))
    }

    /// The verified value of a signed cookie. A missing or tampered cookie reads as `None`.
    pub fn secure_cookie(&self, name: &str) -> HandlerResult<Option<String>> {
        let secret = self.cookie_secret()?;
        Ok(self.cookie(name).and_then(|token| secure::verify(name, token, secret)))
    }

    fn cookie_secret(&self) -> HandlerResult<&'a str> {
        self.config.cookie_secret.as_deref().ok_or_else(|| HandlerError::fault("cookie_secret is not configured"))
    }
}

fn missing(name: &str) -> HandlerError {
    HttpError::bad_request(format!("missing argument {name}")).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::header::{CONTENT_TYPE, COOKIE};
    use serde::Deserialize;

    fn request(uri: &str, cookie: Option<&str>) -> Request {
        let mut builder = http::Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        Request::from_http(builder.body(Bytes::from_static(b"b=from-body&shared=body")).unwrap()).unwrap()
    }

    fn config(secret: Option<&str>) -> AppConfig {
        AppConfig { debug: false, cookie_secret: secret.map(str::to_owned) }
    }

    #[test]
    fn argument_accessors() {
        let config = config(None);
        let request = request("/?a=1&shared=query", None);
        let mut response = Response::new();
        let args = PathArgs::Positional(vec![Some("7".to_owned())]);
        let settings = RouteSettings::new();
        let cx = Context::new(&config, &request, &mut response, &args, &settings);

        assert_eq!(cx.query_argument("a"), Some("1"));
        assert_eq!(cx.body_argument("b").as_deref(), Some("from-body"));
        assert_eq!(cx.argument("shared").as_deref(), Some("body"));
        assert_eq!(cx.path_nth(0), Some("7"));
        assert_eq!(cx.path_arg("id"), None);

        assert_eq!(cx.require_query_argument("a").unwrap(), "1");
        let error = cx.require_argument("nope").unwrap_err();
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.to_string(), "[status 400] missing argument nope");
    }

    #[test]
    fn typed_query_failure_is_bad_request() {
        #[derive(Debug, Deserialize)]
        struct Page {
            #[allow(dead_code)]
            page: u32,
        }

        let config = config(None);
        let request = request("/?page=abc", None);
        let mut response = Response::new();
        let settings = RouteSettings::new();
        let cx = Context::new(&config, &request, &mut response, &PathArgs::None, &settings);

        assert_eq!(cx.query_as::<Page>().unwrap_err().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn invalid_header_is_a_fault() {
        let config = config(None);
        let request = request("/", None);
        let mut response = Response::new();
        let settings = RouteSettings::new();
        let mut cx = Context::new(&config, &request, &mut response, &PathArgs::None, &settings);

        assert!(cx.set_header("X-Ok", "fine").is_ok());
        let error = cx.set_header("X-Bad", "a\r\nb").unwrap_err();
        assert!(matches!(error, HandlerError::Fault(_)));
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn secure_cookie_round_trip() {
        let config = config(Some("s3cret"));
        let token = secure::sign("user", "alice", "s3cret");
        let request = request("/", Some(&format!("user={token}; forged=x|1|00")));
        let mut response = Response::new();
        let settings = RouteSettings::new();
        let mut cx = Context::new(&config, &request, &mut response, &PathArgs::None, &settings);

        assert_eq!(cx.secure_cookie("user").unwrap().as_deref(), Some("alice"));
        assert_eq!(cx.secure_cookie("forged").unwrap(), None);
        assert_eq!(cx.secure_cookie("absent").unwrap(), None);

        cx.set_secure_cookie(Cookie::new("user", "bob").path("/")).unwrap();
        let set = response.cookies()[0].clone();
        assert_eq!(secure::verify("user", set.value(), "s3cret").as_deref(), Some("bob"));
    }

    #[test]
    fn secure_cookie_needs_a_secret() {
        let config = config(None);
        let request = request("/", None);
        let mut response = Response::new();
        let settings = RouteSettings::new();
        let mut cx = Context::new(&config, &request, &mut response, &PathArgs::None, &settings);

        assert!(matches!(cx.set_secure_cookie(Cookie::new("a", "b")), Err(HandlerError::Fault(_))));
    }
}
