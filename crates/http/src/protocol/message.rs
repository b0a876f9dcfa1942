use bytes::Bytes;

/// One event emitted by the request parser.
///
/// A request is always reported as exactly one `Header` followed by zero or more
/// `Payload(PayloadItem::Chunk(_))` and a final `Payload(PayloadItem::Eof)`.
#[derive(Debug)]
pub enum Message<T> {
    /// The start line and header block have been received
    Header(T),
    /// A chunk of body data or the end-of-message marker
    Payload(PayloadItem),
}

/// Represents an item in the HTTP message payload stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem {
    /// A chunk of payload data
    Chunk(Bytes),
    /// Marks the end of the payload stream
    Eof,
}

/// How the body of a message is framed on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// Payload with known length in bytes
    Length(u64),
    /// Payload using chunked transfer encoding
    Chunked,
    /// Empty payload (no body)
    Empty,
}

impl PayloadSize {
    #[inline]
    pub fn new_length(length: u64) -> Self {
        if length == 0 { PayloadSize::Empty } else { PayloadSize::Length(length) }
    }

    #[inline]
    pub fn new_chunked() -> Self {
        PayloadSize::Chunked
    }

    #[inline]
    pub fn new_empty() -> Self {
        PayloadSize::Empty
    }

    /// Returns true if the payload uses chunked transfer encoding
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    /// Returns true if the payload is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }
}

impl<T> Message<T> {
    #[inline]
    pub fn is_payload(&self) -> bool {
        matches!(self, Message::Payload(_))
    }

    #[inline]
    pub fn is_header(&self) -> bool {
        matches!(self, Message::Header(_))
    }

    /// Converts the message into a PayloadItem if it contains payload data
    pub fn into_payload_item(self) -> Option<PayloadItem> {
        match self {
            Message::Header(_) => None,
            Message::Payload(payload_item) => Some(payload_item),
        }
    }
}

impl PayloadItem {
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }

    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_length_is_empty() {
        assert!(PayloadSize::new_length(0).is_empty());
        assert_eq!(PayloadSize::new_length(9), PayloadSize::Length(9));
        assert!(PayloadSize::new_chunked().is_chunked());
    }

    #[test]
    fn payload_accessors() {
        let chunk = PayloadItem::Chunk(Bytes::from_static(b"abc"));
        assert!(chunk.is_chunk());
        assert_eq!(chunk.as_bytes().map(|b| &b[..]), Some(&b"abc"[..]));
        assert!(PayloadItem::Eof.is_eof());
        assert!(PayloadItem::Eof.into_bytes().is_none());

        let message: Message<()> = Message::Payload(PayloadItem::Eof);
        assert!(message.is_payload());
        assert_eq!(message.into_payload_item(), Some(PayloadItem::Eof));
    }
}
