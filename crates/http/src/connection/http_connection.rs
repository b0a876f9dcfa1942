use std::error::Error;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use http::{Response, StatusCode, Version};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, trace, warn};

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::handler::{status_response, Handler};
use crate::protocol::{HttpError, Message, ParseError, PayloadItem, RequestHeader, SendError};

/// Interim response written when the client sent `Expect: 100-continue`.
const CONTINUE_LINE: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";

/// Size of each read from the underlying stream.
const READ_CAPACITY: usize = 8 * 1024;

/// Drives a single request through read, handle, write and close.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(), READ_CAPACITY),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
        }
    }

    /// Serves one request and closes the writer.
    ///
    /// A peer that disconnects, or whose stream fails, before the request is complete ends
    /// the call with `Ok(())` and nothing is written. A malformed request is answered through
    /// [`Handler::on_parse_error`] and then reported as `Err`. A handler error becomes an
    /// empty `500` response.
    pub async fn process<H: Handler>(mut self, handler: Arc<H>) -> Result<(), HttpError> {
        let header = match self.framed_read.next().await {
            Some(Ok(Message::Header((header, _payload_size)))) => header,
            Some(Ok(Message::Payload(_))) => {
                let error = ParseError::invalid_body("received body before request header");
                return self.reject(handler.as_ref(), None, error).await;
            }
            Some(Err(ParseError::Io { source })) => {
                debug!(cause = %source, "connection lost before a request arrived");
                return Ok(());
            }
            Some(Err(e)) => return self.reject(handler.as_ref(), None, e).await,
            None => {
                trace!("connection closed before a request arrived");
                return Ok(());
            }
        };

        if self.framed_read.decoder().request_state().needs_write_continue() {
            self.write_continue().await?;
            self.framed_read.decoder_mut().reset_continue();
        }

        let Some(body) = self.read_body(handler.as_ref(), &header).await? else {
            debug!(method = %header.method(), path = header.uri().path(), "peer closed before the request was complete");
            return Ok(());
        };

        let version = header.version();
        let request = header.body(body);

        let response = match handler.call(request).await {
            Ok(response) => response,
            Err(e) => {
                let e: Box<dyn Error + Send + Sync> = e.into();
                error!(cause = %e, "handler failed");
                status_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        };

        self.send_response(response, version).await
    }

    /// Collects the body until the end of the message. `Ok(None)` means the peer went away.
    async fn read_body<H: Handler>(&mut self, handler: &H, header: &RequestHeader) -> Result<Option<Bytes>, HttpError> {
        let mut body = BytesMut::new();
        loop {
            match self.framed_read.next().await {
                Some(Ok(Message::Payload(PayloadItem::Chunk(bytes)))) => body.extend_from_slice(&bytes),
                Some(Ok(Message::Payload(PayloadItem::Eof))) => return Ok(Some(body.freeze())),
                Some(Ok(Message::Header(_))) => {
                    let error = ParseError::invalid_body("received a second request header");
                    return self.reject(handler, Some(header), error).await.map(|()| None);
                }
                Some(Err(ParseError::Io { source })) => {
                    debug!(cause = %source, "read failed in the middle of a request");
                    return Ok(None);
                }
                Some(Err(e)) => return self.reject(handler, Some(header), e).await.map(|()| None),
                None => return Ok(None),
            }
        }
    }

    async fn write_continue(&mut self) -> Result<(), HttpError> {
        let writer = self.framed_write.get_mut();
        writer.write_all(CONTINUE_LINE).await.map_err(SendError::io)?;
        writer.flush().await.map_err(SendError::io)?;
        trace!("sent 100 continue");
        Ok(())
    }

    async fn reject<H: Handler>(&mut self, handler: &H, header: Option<&RequestHeader>, error: ParseError) -> Result<(), HttpError> {
        warn!(cause = %error, "can't parse request");
        let version = header.map_or(Version::HTTP_11, RequestHeader::version);
        let response = handler.on_parse_error(header, &error);
        self.send_response(response, version).await?;
        Err(error.into())
    }

    async fn send_response(&mut self, mut response: Response<Bytes>, version: Version) -> Result<(), HttpError> {
        *response.version_mut() = version;
        self.framed_write.send(response).await?;
        self.framed_write.close().await?;
        Ok(())
    }
}
