//! `multipart/form-data` decoding.
//!
//! refer: <https://www.rfc-editor.org/rfc/rfc7578>
//!
//! The whole body is already buffered, so parts are sliced out of it without copying.
//! Each part carries its own header block, parsed with `httparse`.

use bytes::Bytes;
use httparse::Status;

use super::{FilePart, FormError, FormValue};
use crate::multimap::MultiMap;

const MAX_PART_HEADERS: usize = 16;

pub(super) fn parse(body: &Bytes, boundary: &str) -> Result<MultiMap<FormValue>, FormError> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();
    let part_terminator = [&b"\r\n"[..], delimiter].concat();
    let mut fields = MultiMap::new();

    let mut pos = find(body, delimiter, 0).ok_or_else(|| FormError::multipart("boundary not found"))? + delimiter.len();

    loop {
        let rest = &body[pos..];
        if rest.starts_with(b"--") {
            return Ok(fields);
        }
        if !rest.starts_with(b"\r\n") {
            return Err(FormError::multipart("boundary must be followed by CRLF"));
        }
        let part_start = pos + 2;

        let part_end = find(body, &part_terminator, part_start).ok_or_else(|| FormError::multipart("unterminated part"))?;

        let (name, value) = parse_part(&body.slice(part_start..part_end))?;
        fields.append(name, value);

        pos = part_end + 2 + delimiter.len();
    }
}

fn parse_part(part: &Bytes) -> Result<(String, FormValue), FormError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_PART_HEADERS];
    let (offset, headers) = match httparse::parse_headers(part, &mut headers).map_err(FormError::multipart)? {
        Status::Complete((offset, headers)) => (offset, headers),
        Status::Partial => return Err(FormError::multipart("incomplete part headers")),
    };

    let header = |name: &str| {
        headers.iter().find(|h| h.name.eq_ignore_ascii_case(name)).map(|h| String::from_utf8_lossy(h.value).into_owned())
    };

    let disposition = header("Content-Disposition").ok_or_else(|| FormError::multipart("part without content-disposition"))?;
    let (name, filename) = parse_disposition(&disposition);
    let name = name.ok_or_else(|| FormError::multipart("part without a name"))?;

    let content = part.slice(offset..);
    let value = match filename {
        Some(filename) => FormValue::File(FilePart { filename, content_type: header("Content-Type"), content }),
        None => FormValue::Text(String::from_utf8_lossy(&content).into_owned()),
    };
    Ok((name, value))
}

/// Extracts `name` and `filename` from `form-data; name="field"; filename="a.txt"`.
fn parse_disposition(value: &str) -> (Option<String>, Option<String>) {
    let mut name = None;
    let mut filename = None;
    for param in value.split(';').skip(1) {
        let Some((key, val)) = param.split_once('=') else {
            continue;
        };
        let val = val.trim().trim_matches('"').to_owned();
        match key.trim().to_ascii_lowercase().as_str() {
            "name" => name = Some(val),
            "filename" => filename = Some(val),
            _ => {}
        }
    }
    (name, filename)
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack.get(from..)?.windows(needle.len()).position(|w| w == needle).map(|i| i + from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn body(raw: &str) -> Bytes {
        Bytes::from(raw.replace('\n', "\r\n"))
    }

    #[test]
    fn text_and_file_fields() {
        let body = body(indoc! {r#"
        preamble
        --XyZ
        Content-Disposition: form-data; name="title"

        hello
        --XyZ
        Content-Disposition: form-data; name="upload"; filename="notes.txt"
        Content-Type: text/plain

        line one
        line two
        --XyZ
        Content-Disposition: form-data; name="title"

        again
        --XyZ--
        "#});

        let fields = parse(&body, "XyZ").unwrap();

        assert_eq!(fields.get_all("title").filter_map(FormValue::as_text).collect::<Vec<_>>(), ["hello", "again"]);

        let file = fields.get("upload").and_then(FormValue::as_file).unwrap();
        assert_eq!(file.filename, "notes.txt");
        assert_eq!(file.content_type.as_deref(), Some("text/plain"));
        assert_eq!(&file.content[..], b"line one\r\nline two");
    }

    #[test]
    fn empty_multipart() {
        let fields = parse(&body("--b--\n"), "b").unwrap();
        assert!(fields.is_empty());
    }

    #[test]
    fn malformed_bodies() {
        assert!(parse(&body("no boundary here"), "b").is_err());
        assert!(parse(&body("--b\nContent-Disposition: form-data; name=\"x\"\n\nunterminated"), "b").is_err());
        assert!(parse(&body("--b\nContent-Type: text/plain\n\nx\n--b--"), "b").is_err());
    }

    #[test]
    fn disposition_params() {
        assert_eq!(
            parse_disposition(r#"form-data; name="a"; filename="b c.png""#),
            (Some("a".to_owned()), Some("b c.png".to_owned()))
        );
        assert_eq!(parse_disposition("form-data; name=plain"), (Some("plain".to_owned()), None));
    }
}
