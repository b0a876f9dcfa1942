//! Response cookie directives and request `Cookie` header parsing.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use http::HeaderMap;
use http::header::COOKIE;

use crate::error::HeaderError;
use crate::multimap::MultiMap;

/// One `Set-Cookie` directive.
///
/// ```
/// use ember_web::Cookie;
///
/// let cookie = Cookie::new("session", "abc").path("/").max_age(3600).http_only(true);
/// assert_eq!(cookie.to_string(), "session=abc; Max-Age=3600; Path=/; HttpOnly");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
    max_age: Option<u64>,
    expires: Option<SystemTime>,
    domain: Option<String>,
    path: Option<String>,
    secure: bool,
    http_only: bool,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age: None,
            expires: None,
            domain: None,
            path: None,
            secure: false,
            http_only: false,
        }
    }

    /// A directive telling the client to drop `name` right away.
    pub fn removal(name: impl Into<String>) -> Self {
        Self::new(name, "").max_age(0).expires(UNIX_EPOCH)
    }

    #[must_use]
    pub fn max_age(mut self, seconds: u64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    #[must_use]
    pub fn expires(mut self, at: SystemTime) -> Self {
        self.expires = Some(at);
        self
    }

    /// Expires `days` from now.
    #[must_use]
    pub fn expires_in_days(self, days: u64) -> Self {
        self.expires(SystemTime::now() + Duration::from_secs(days * 24 * 60 * 60))
    }

    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub(crate) fn with_value(mut self, value: String) -> Self {
        self.value = value;
        self
    }

    /// Checks that the directive can be sent as a single header line.
    pub(crate) fn validate(&self) -> Result<(), HeaderError> {
        let token = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b));
        if !token(&self.name) {
            return Err(HeaderError::InvalidCookie { reason: format!("bad name {:?}", self.name) });
        }
        if !self.value.bytes().all(|b| b.is_ascii_graphic() && !b",;\\\"".contains(&b)) {
            return Err(HeaderError::InvalidCookie { reason: format!("bad value for {}", self.name) });
        }
        let attribute = |s: &Option<String>| s.as_deref().is_none_or(|s| s.bytes().all(|b| (b' '..=b'~').contains(&b) && b != b';'));
        if !attribute(&self.domain) || !attribute(&self.path) {
            return Err(HeaderError::InvalidCookie { reason: format!("bad attribute for {}", self.name) });
        }
        Ok(())
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={max_age}")?;
        }
        if let Some(expires) = self.expires {
            write!(f, "; Expires={}", httpdate::fmt_http_date(expires))?;
        }
        if let Some(domain) = &self.domain {
            write!(f, "; Domain={domain}")?;
        }
        if let Some(path) = &self.path {
            write!(f, "; Path={path}")?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        Ok(())
    }
}

/// Collects `name=value` pairs from every `Cookie` header, trimming names and values.
/// Pairs without `=` are skipped.
pub fn parse_cookies(headers: &HeaderMap) -> MultiMap {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.split_once('='))
        .map(|(name, value)| (name.trim(), value.trim().trim_matches('"').to_owned()))
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn formats_every_attribute() {
        let cookie = Cookie::new("id", "42")
            .max_age(60)
            .expires(UNIX_EPOCH + Duration::from_secs(784_111_777))
            .domain("example.com")
            .path("/app")
            .secure(true)
            .http_only(true);

        assert_eq!(
            cookie.to_string(),
            "id=42; Max-Age=60; Expires=Sun, 06 Nov 1994 08:49:37 GMT; Domain=example.com; Path=/app; Secure; HttpOnly"
        );
    }

    #[test]
    fn removal_directive() {
        assert_eq!(Cookie::removal("id").to_string(), "id=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT");
    }

    #[test]
    fn rejects_header_injection() {
        assert!(Cookie::new("id", "1\r\nX-Evil: 1").validate().is_err());
        assert!(Cookie::new("bad name", "1").validate().is_err());
        assert!(Cookie::new("id", "1").path("/;x").validate().is_err());
        assert!(Cookie::new("id", "MjMzMzM=|1497854241|d1bc").validate().is_ok());
    }

    #[test]
    fn parses_request_cookies() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("a=1;  b = 2 ; junk"));
        headers.append(COOKIE, HeaderValue::from_static("a=3"));

        let cookies = parse_cookies(&headers);
        assert_eq!(cookies.get("a").map(String::as_str), Some("3"));
        assert_eq!(cookies.get("b").map(String::as_str), Some("2"));
        assert_eq!(cookies.get_all("a").count(), 2);
        assert!(!cookies.contains_key("junk"));
    }
}
