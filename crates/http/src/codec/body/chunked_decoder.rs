//! Decoder for `Transfer-Encoding: chunked` bodies.
//!
//! refer: <https://www.rfc-editor.org/rfc/rfc9112.html#name-chunked-transfer-coding>
//!
//! The decoder works line by line: a size line, `size` bytes of data, a CRLF, repeated until
//! a zero size line, then optional trailer fields up to an empty line. Chunk extensions are
//! ignored and trailer fields are discarded.

use crate::ensure;
use crate::protocol::{ParseError, PayloadItem};
use bytes::{Buf, BytesMut};
use std::cmp;
use tokio_util::codec::Decoder;
use tracing::trace;

/// Longest size or trailer line accepted, CRLF included.
const MAX_LINE_SIZE: usize = 4 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: ChunkedState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// Waiting for a hex size line
    Size,
    /// Reading the remaining bytes of a chunk
    Data(u64),
    /// Waiting for the CRLF that closes a chunk
    DataEnd,
    /// Reading trailer fields after the last chunk
    Trailer,
    /// The terminating empty line was seen
    End,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: ChunkedState::Size }
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                ChunkedState::Size => {
                    let Some(line) = take_line(src)? else {
                        return Ok(None);
                    };
                    let size = parse_chunk_size(&line)?;
                    trace!(chunk_size = size, "read chunk size");
                    self.state = if size == 0 { ChunkedState::Trailer } else { ChunkedState::Data(size) };
                }

                ChunkedState::Data(remaining) => {
                    if src.is_empty() {
                        return Ok(None);
                    }

                    let len = cmp::min(remaining, src.len() as u64);
                    let bytes = src.split_to(len as usize).freeze();
                    let remaining = remaining - len;

                    self.state = if remaining == 0 { ChunkedState::DataEnd } else { ChunkedState::Data(remaining) };
                    return Ok(Some(PayloadItem::Chunk(bytes)));
                }

                ChunkedState::DataEnd => {
                    let Some(line) = take_line(src)? else {
                        return Ok(None);
                    };
                    ensure!(line.is_empty(), ParseError::invalid_body("chunk data longer than its declared size"));
                    self.state = ChunkedState::Size;
                }

                ChunkedState::Trailer => {
                    let Some(line) = take_line(src)? else {
                        return Ok(None);
                    };
                    if line.is_empty() {
                        self.state = ChunkedState::End;
                    }
                }

                ChunkedState::End => return Ok(Some(PayloadItem::Eof)),
            }
        }
    }
}

/// Splits one CRLF terminated line off `src`, without the terminator.
fn take_line(src: &mut BytesMut) -> Result<Option<BytesMut>, ParseError> {
    match src.windows(2).position(|w| w == b"\r\n") {
        Some(pos) => {
            ensure!(pos + 2 <= MAX_LINE_SIZE, ParseError::invalid_body("chunk line too long"));
            let line = src.split_to(pos);
            src.advance(2);
            Ok(Some(line))
        }
        None => {
            ensure!(src.len() < MAX_LINE_SIZE, ParseError::invalid_body("chunk line too long"));
            Ok(None)
        }
    }
}

fn parse_chunk_size(line: &[u8]) -> Result<u64, ParseError> {
    let size = match line.iter().position(|b| *b == b';') {
        Some(pos) => &line[..pos],
        None => line,
    };
    let size = size.trim_ascii();
    ensure!(!size.is_empty() && size.len() <= 16, ParseError::invalid_body("invalid chunk size"));

    let size = std::str::from_utf8(size).map_err(|_e| ParseError::invalid_body("invalid chunk size"))?;
    u64::from_str_radix(size, 16).map_err(|e| ParseError::invalid_body(format!("invalid chunk size: {e}")))
}
