//! The response handler code writes into.
//!
//! A fresh response is `200 OK` with `Content-Type: text/html` and no body. Writes append
//! chunks; the final body is their concatenation and `Content-Length` is computed when the
//! response is put on the wire.

use bytes::{Bytes, BytesMut};
use http::header::{CONTENT_TYPE, LOCATION, SET_COOKIE};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::cookie::Cookie;
use crate::error::{HeaderError, WriteJsonError};

#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    cookies: Vec<Cookie>,
    chunks: Vec<Bytes>,
}

impl Default for Response {
    fn default() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));
        Self { status: StatusCode::OK, headers, cookies: Vec::new(), chunks: Vec::new() }
    }
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Replaces every value of the header `name`.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), HeaderError> {
        let (name, value) = header_pair(name, value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Adds a value to the header `name`, keeping existing ones.
    pub fn add_header(&mut self, name: &str, value: &str) -> Result<(), HeaderError> {
        let (name, value) = header_pair(name, value)?;
        self.headers.append(name, value);
        Ok(())
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers.remove(name);
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// Queues a `Set-Cookie` line. A later cookie with the same name replaces an earlier one.
    pub fn set_cookie(&mut self, cookie: Cookie) -> Result<(), HeaderError> {
        cookie.validate()?;
        self.cookies.retain(|c| c.name() != cookie.name());
        self.cookies.push(cookie);
        Ok(())
    }

    /// Tells the client to drop the cookie `name`.
    pub fn clear_cookie(&mut self, name: &str) -> Result<(), HeaderError> {
        self.set_cookie(Cookie::removal(name))
    }

    pub fn write(&mut self, text: impl AsRef<str>) {
        self.chunks.push(Bytes::copy_from_slice(text.as_ref().as_bytes()));
    }

    pub fn write_bytes(&mut self, bytes: impl Into<Bytes>) {
        self.chunks.push(bytes.into());
    }

    /// Serializes `data` as the body chunk and switches the content type to JSON.
    ///
    /// Only values that serialize to a JSON object are accepted: maps and structs.
    pub fn write_json<T: Serialize + ?Sized>(&mut self, data: &T) -> Result<(), WriteJsonError> {
        let value = serde_json::to_value(data)?;
        let kind = match &value {
            Value::Object(_) => None,
            Value::Null => Some("null"),
            Value::Bool(_) => Some("bool"),
            Value::Number(_) => Some("number"),
            Value::String(_) => Some("string"),
            Value::Array(_) => Some("array"),
        };
        if let Some(kind) = kind {
            return Err(WriteJsonError::NotAMapping { kind });
        }

        self.chunks.push(Bytes::from(serde_json::to_vec(&value)?));
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(())
    }

    /// Sets `Location` and a `302`, or a `301` when `permanent`.
    pub fn redirect(&mut self, url: &str, permanent: bool) -> Result<(), HeaderError> {
        self.set_header(LOCATION.as_str(), url)?;
        self.status = if permanent { StatusCode::MOVED_PERMANENTLY } else { StatusCode::FOUND };
        Ok(())
    }

    /// Drops everything written so far.
    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    pub fn body_len(&self) -> usize {
        self.chunks.iter().map(Bytes::len).sum()
    }

    pub fn body(&self) -> Bytes {
        match self.chunks.as_slice() {
            [] => Bytes::new(),
            [only] => only.clone(),
            chunks => {
                let mut body = BytesMut::with_capacity(self.body_len());
                for chunk in chunks {
                    body.extend_from_slice(chunk);
                }
                body.freeze()
            }
        }
    }

    pub fn into_http(self) -> http::Response<Bytes> {
        let body = self.body();
        let mut response = http::Response::new(body);
        *response.status_mut() = self.status;

        let mut headers = self.headers;
        for cookie in &self.cookies {
            match HeaderValue::try_from(cookie.to_string()) {
                Ok(value) => {
                    headers.append(SET_COOKIE, value);
                }
                Err(e) => warn!(cookie = cookie.name(), cause = %e, "dropping unencodable cookie"),
            }
        }
        *response.headers_mut() = headers;
        response
    }
}

fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), HeaderError> {
    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_e| HeaderError::InvalidName { name: name.to_owned() })?;
    let header_value = HeaderValue::from_str(value).map_err(|_e| HeaderError::InvalidValue { name: name.to_owned() })?;
    Ok((header_name, header_value))
}
