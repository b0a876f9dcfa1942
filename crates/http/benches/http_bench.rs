use bytes::{Bytes, BytesMut};
use criterion::{criterion_group, criterion_main, Criterion};
use ember_http::codec::{RequestDecoder, ResponseEncoder};
use ember_http::connection::HttpConnection;
use ember_http::handler::{make_handler, Request};
use http::header::CONTENT_TYPE;
use http::{Response, StatusCode};
use std::{
    convert::Infallible,
    hint::black_box,
    io,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_util::codec::{Decoder, Encoder};

const SIMPLE_REQUEST: &[u8] = b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n";

const FORM_REQUEST: &[u8] = b"POST /product HTTP/1.1\r\n\
Host: localhost\r\n\
User-Agent: curl/8.5.0\r\n\
Accept: */*\r\n\
Content-Type: application/x-www-form-urlencoded\r\n\
Content-Length: 9\r\n\
\r\n\
a=22&b=33";

// Reads come from a fixed buffer, writes are discarded.
struct MockIO {
    read_data: &'static [u8],
    read_pos: usize,
}

impl MockIO {
    fn new(read_data: &'static [u8]) -> Self {
        Self { read_data, read_pos: 0 }
    }
}

impl AsyncRead for MockIO {
    fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let remaining = &self.read_data[self.read_pos..];
        let amt = std::cmp::min(remaining.len(), buf.remaining());
        buf.put_slice(&remaining[..amt]);
        self.read_pos += amt;
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockIO {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<Result<usize, io::Error>> {
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        Poll::Ready(Ok(()))
    }
}

async fn hello_world(_req: Request) -> Result<Response<Bytes>, Infallible> {
    Ok(Response::new(Bytes::from_static(b"Hello World")))
}

fn decode_all(raw: &[u8]) {
    let mut decoder = RequestDecoder::new();
    let mut bytes = BytesMut::from(raw);
    while let Some(message) = decoder.decode(&mut bytes).unwrap() {
        if matches!(message.into_payload_item(), Some(item) if item.is_eof()) {
            break;
        }
    }
}

fn bench_request_decoder(c: &mut Criterion) {
    c.bench_function("decode_simple_request", |b| {
        b.iter(|| decode_all(black_box(SIMPLE_REQUEST)));
    });

    c.bench_function("decode_form_request", |b| {
        b.iter(|| decode_all(black_box(FORM_REQUEST)));
    });
}

fn bench_response_encoder(c: &mut Criterion) {
    let response = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/html")
        .body(Bytes::from_static(b"Hello World"))
        .unwrap();

    c.bench_function("encode_simple_response", |b| {
        b.iter(|| {
            let mut encoder = ResponseEncoder::new();
            let mut bytes = BytesMut::new();
            encoder.encode(response.clone(), &mut bytes).unwrap();
            black_box(bytes);
        });
    });
}

fn bench_http_connection(c: &mut Criterion) {
    let handler = Arc::new(make_handler(hello_world));
    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();

    c.bench_function("process_simple_request", |b| {
        b.to_async(&runtime).iter(|| {
            let connection = HttpConnection::new(MockIO::new(SIMPLE_REQUEST), MockIO::new(b""));
            connection.process(handler.clone())
        });
    });
}

criterion_group!(benches, bench_request_decoder, bench_response_encoder, bench_http_connection);
criterion_main!(benches);
