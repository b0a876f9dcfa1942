//! The request as seen by handler code.
//!
//! Built once the whole message has been received: the path is percent-decoded, cookies
//! are split out of the `Cookie` headers and the body is decoded into a [`Form`] when its
//! content type asks for it. Query parameters are parsed on first access.

use std::borrow::Cow;

use bytes::Bytes;
use http::{HeaderMap, Method, Version};
use once_cell::sync::OnceCell;
use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;

use crate::cookie::parse_cookies;
use crate::form::{FilePart, Form, FormError, parse_urlencoded};
use crate::multimap::MultiMap;

#[derive(Debug)]
pub struct Request {
    method: Method,
    version: Version,
    path: String,
    query_string: String,
    query: OnceCell<MultiMap>,
    headers: HeaderMap,
    cookies: MultiMap,
    form: Option<Form>,
    body: Bytes,
}

impl Request {
    /// Builds the request model, decoding the body according to its content type.
    pub fn from_http(request: http::Request<Bytes>) -> Result<Self, FormError> {
        let (parts, body) = request.into_parts();

        let path = match percent_decode_str(parts.uri.path()).decode_utf8_lossy() {
            Cow::Borrowed(path) => path.to_owned(),
            Cow::Owned(path) => path,
        };
        let query_string = parts.uri.query().unwrap_or_default().to_owned();
        let cookies = parse_cookies(&parts.headers);
        let form = Form::decode(&parts.headers, &body)?;

        Ok(Self {
            method: parts.method,
            version: parts.version,
            path,
            query_string,
            query: OnceCell::new(),
            headers: parts.headers,
            cookies,
            form,
            body,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// The percent-decoded path, without the query.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw query, without the leading `?`. Empty when there is none.
    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    pub fn query(&self) -> &MultiMap {
        self.query.get_or_init(|| parse_urlencoded(self.query_string.as_bytes()).unwrap_or_default())
    }

    /// Deserializes the whole query into `T`.
    pub fn query_as<T: DeserializeOwned>(&self) -> Result<T, serde_qs::Error> {
        serde_qs::from_str(&self.query_string)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The latest value of a header, if it is valid text. Names are case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get_all(name).iter().filter_map(|v| v.to_str().ok()).last()
    }

    pub fn cookies(&self) -> &MultiMap {
        &self.cookies
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn form(&self) -> Option<&Form> {
        self.form.as_ref()
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn query_argument(&self, name: &str) -> Option<&str> {
        self.query().get(name).map(String::as_str)
    }

    pub fn query_arguments(&self, name: &str) -> Vec<&str> {
        self.query().get_all(name).map(String::as_str).collect()
    }

    pub fn body_argument(&self, name: &str) -> Option<String> {
        self.form.as_ref().and_then(|form| form.get(name))
    }

    pub fn body_arguments(&self, name: &str) -> Vec<String> {
        self.form.as_ref().map(|form| form.get_all(name)).unwrap_or_default()
    }

    /// A body argument if present, otherwise a query argument.
    pub fn argument(&self, name: &str) -> Option<String> {
        self.body_argument(name).or_else(|| self.query_argument(name).map(str::to_owned))
    }

    pub fn file(&self, name: &str) -> Option<&FilePart> {
        self.form.as_ref().and_then(|form| form.file(name))
    }
}
