//! Request body decoding, chosen by `Content-Type`.
//!
//! | content type                        | result                 |
//! |-------------------------------------|------------------------|
//! | `application/json`                  | [`Form::Json`]         |
//! | `application/x-www-form-urlencoded` | [`Form::UrlEncoded`]   |
//! | `multipart/form-data`               | [`Form::Multipart`]    |
//!
//! Any other or missing content type leaves the request without a form.

mod multipart;

use bytes::Bytes;
use http::HeaderMap;
use http::header::CONTENT_TYPE;
use mime::Mime;
use serde_json::Value;
use thiserror::Error;

use crate::multimap::MultiMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Form {
    Json(Value),
    UrlEncoded(MultiMap),
    Multipart(MultiMap<FormValue>),
}

/// A single multipart field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File(FilePart),
}

/// An uploaded file: the client supplied name and the raw content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub filename: String,
    pub content_type: Option<String>,
    pub content: Bytes,
}

#[derive(Error, Debug)]
pub enum FormError {
    #[error("invalid json body: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("invalid urlencoded body: {source}")]
    UrlEncoded {
        #[from]
        source: serde_urlencoded::de::Error,
    },

    #[error("multipart body without boundary")]
    MissingBoundary,

    #[error("invalid multipart body: {reason}")]
    Multipart { reason: String },
}

impl FormError {
    pub(crate) fn multipart<S: ToString>(reason: S) -> Self {
        Self::Multipart { reason: reason.to_string() }
    }
}

impl Form {
    /// Decodes `body` according to the request's `Content-Type`, `Ok(None)` when the type is
    /// not a form type.
    pub fn decode(headers: &HeaderMap, body: &Bytes) -> Result<Option<Form>, FormError> {
        let Some(mime) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).and_then(|v| v.parse::<Mime>().ok()) else {
            return Ok(None);
        };

        let form = match mime.essence_str() {
            "application/json" => Form::Json(serde_json::from_slice(body)?),
            "application/x-www-form-urlencoded" => Form::UrlEncoded(parse_urlencoded(body)?),
            "multipart/form-data" => {
                let boundary = mime.get_param(mime::BOUNDARY).ok_or(FormError::MissingBoundary)?;
                Form::Multipart(multipart::parse(body, boundary.as_str())?)
            }
            _ => return Ok(None),
        };
        Ok(Some(form))
    }

    /// The latest value of a text field. JSON scalars are rendered as text.
    pub fn get(&self, name: &str) -> Option<String> {
        match self {
            Form::UrlEncoded(fields) => fields.get(name).cloned(),
            Form::Multipart(fields) => fields.get_all(name).filter_map(FormValue::as_text).last().map(str::to_owned),
            Form::Json(value) => value.get(name).and_then(json_text),
        }
    }

    /// Every text value of a field in arrival order. A JSON array yields its scalar items.
    pub fn get_all(&self, name: &str) -> Vec<String> {
        match self {
            Form::UrlEncoded(fields) => fields.get_all(name).cloned().collect(),
            Form::Multipart(fields) => fields.get_all(name).filter_map(FormValue::as_text).map(str::to_owned).collect(),
            Form::Json(value) => match value.get(name) {
                Some(Value::Array(items)) => items.iter().filter_map(json_text).collect(),
                Some(item) => json_text(item).into_iter().collect(),
                None => Vec::new(),
            },
        }
    }

    /// The latest uploaded file for a multipart field.
    pub fn file(&self, name: &str) -> Option<&FilePart> {
        match self {
            Form::Multipart(fields) => fields.get_all(name).filter_map(FormValue::as_file).last(),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Form::Json(value) => Some(value),
            _ => None,
        }
    }
}

impl FormValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormValue::Text(text) => Some(text),
            FormValue::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&FilePart> {
        match self {
            FormValue::File(file) => Some(file),
            FormValue::Text(_) => None,
        }
    }
}

pub(crate) fn parse_urlencoded(raw: &[u8]) -> Result<MultiMap, serde_urlencoded::de::Error> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(raw)?;
    Ok(pairs.into_iter().collect())
}

fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
