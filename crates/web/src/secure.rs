//! Tamper-evident values, used for signed cookies.
//!
//! A token has the form `base64(value)|timestamp|signature` where the signature is the
//! hex encoded HMAC-SHA1 of `name + base64(value) + timestamp` keyed with the secret.
//!
//! ```
//! use ember_web::secure::{sign, verify};
//!
//! let token = sign("user", "alice", "s3cret");
//! assert_eq!(verify("user", &token, "s3cret").as_deref(), Some("alice"));
//! assert_eq!(verify("admin", &token, "s3cret"), None);
//! ```

use std::fmt::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Signs `value` under `name` with the current time as timestamp.
pub fn sign(name: &str, value: &str, secret: &str) -> String {
    let timestamp = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs());
    sign_at(name, value, secret, timestamp)
}

pub(crate) fn sign_at(name: &str, value: &str, secret: &str, timestamp: u64) -> String {
    let encoded = STANDARD.encode(value);
    let timestamp = timestamp.to_string();
    let signature = mac(secret, name, &encoded, &timestamp).finalize().into_bytes();

    let mut token = String::with_capacity(encoded.len() + timestamp.len() + 42);
    token.push_str(&encoded);
    token.push('|');
    token.push_str(&timestamp);
    token.push('|');
    for b in signature {
        let _ = write!(token, "{b:02x}");
    }
    token
}

/// Returns the original value if `token` was produced by [`sign`] for the same name and secret.
pub fn verify(name: &str, token: &str, secret: &str) -> Option<String> {
    let mut parts = token.split('|');
    let (encoded, timestamp, signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || timestamp.is_empty() || !timestamp.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let signature = decode_hex(signature)?;
    mac(secret, name, encoded, timestamp).verify_slice(&signature).ok()?;

    let value = STANDARD.decode(encoded).ok()?;
    String::from_utf8(value).ok()
}

fn mac(secret: &str, name: &str, encoded: &str, timestamp: &str) -> HmacSha1 {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(name.as_bytes());
    mac.update(encoded.as_bytes());
    mac.update(timestamp.as_bytes());
    mac
}

fn decode_hex(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len()).step_by(2).map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_token() {
        let token = sign_at("test", "23333", "root", 1_497_854_241);
        assert_eq!(token, "MjMzMzM=|1497854241|d1bc51b38323add85ae80a9f130d3b5440026cca");
        assert_eq!(verify("test", &token, "root").as_deref(), Some("23333"));
    }

    #[test]
    fn round_trip() {
        for (value, secret) in [("", "k"), ("hello world", "secret"), ("a|b|c", "another key"), ("~!@#$%^&*()", "")] {
            let token = sign("name", value, secret);
            assert_eq!(verify("name", &token, secret).as_deref(), Some(value));
        }
    }

    #[test]
    fn rejects_tampering() {
        let token = sign_at("test", "23333", "root", 1_497_854_241);

        let mut flipped = token.clone().into_bytes();
        let last = flipped.len() - 1;
        flipped[last] = if flipped[last] == b'a' { b'b' } else { b'a' };
        let flipped = String::from_utf8(flipped).unwrap();

        assert_eq!(verify("test", &flipped, "root"), None);
        assert_eq!(verify("test", &token, "wrong"), None);
        assert_eq!(verify("other", &token, "root"), None);
        assert_eq!(verify("test", "MjMzMzM=|1497854241", "root"), None);
        assert_eq!(verify("test", "garbage", "root"), None);
    }
}
