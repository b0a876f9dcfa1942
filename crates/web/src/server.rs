//! TCP accept loop.
//!
//! Every accepted connection runs as its own task: one request is read, dispatched through
//! the [`Application`] and answered, then the connection is closed. A failing connection
//! never affects the accept loop or other connections.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use ember_http::connection::HttpConnection;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use crate::app::Application;

pub struct ServerBuilder {
    application: Option<Application>,
    address: Option<io::Result<Vec<SocketAddr>>>,
    log_level: Level,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { application: None, address: None, log_level: Level::INFO }
    }

    #[must_use]
    pub fn address<A: ToSocketAddrs>(mut self, address: A) -> Self {
        self.address = Some(address.to_socket_addrs().map(Iterator::collect));
        self
    }

    #[must_use]
    pub fn application(mut self, application: Application) -> Self {
        self.application = Some(application);
        self
    }

    /// Maximum level of the subscriber installed by [`Server::start`]. Defaults to `INFO`.
    #[must_use]
    pub fn log_level(mut self, level: Level) -> Self {
        self.log_level = level;
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        let application = self.application.ok_or(ServerBuildError::MissingApplication)?;
        let address = self.address.ok_or(ServerBuildError::MissingAddress)??;
        if address.is_empty() {
            return Err(ServerBuildError::MissingAddress);
        }
        Ok(Server { application: Arc::new(application), address, log_level: self.log_level })
    }
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("application must be set")]
    MissingApplication,

    #[error("address must be set")]
    MissingAddress,

    #[error("invalid address: {source}")]
    InvalidAddress {
        #[from]
        source: io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("can't bind {address:?}: {source}")]
    Bind { address: Vec<SocketAddr>, source: io::Error },
}

#[derive(Debug)]
pub struct Server {
    application: Arc<Application>,
    address: Vec<SocketAddr>,
    log_level: Level,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn application(&self) -> &Arc<Application> {
        &self.application
    }

    /// Installs the log subscriber, binds the configured address and serves forever.
    pub async fn start(self) -> Result<(), ServerError> {
        let subscriber = FmtSubscriber::builder().with_max_level(self.log_level).finish();
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            debug!("a global subscriber is already installed");
        }

        info!("start listening at {:?}", self.address);
        let tcp_listener = TcpListener::bind(self.address.as_slice()).await.map_err(|source| {
            error!(cause = %source, "bind server error");
            ServerError::Bind { address: self.address.clone(), source }
        })?;

        self.serve(tcp_listener).await
    }

    /// Serves connections accepted on `tcp_listener`. Never returns on its own.
    pub async fn serve(self, tcp_listener: TcpListener) -> Result<(), ServerError> {
        let application = self.application;
        loop {
            let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            let application = application.clone();

            tokio::spawn(async move {
                let (reader, writer) = tcp_stream.into_split();
                let connection = HttpConnection::new(reader, writer);
                match connection.process(application).await {
                    Ok(()) => {
                        debug!(%remote_addr, "finished process, connection shutdown");
                    }
                    Err(e) => {
                        info!(%remote_addr, cause = %e, "request rejected, connection shutdown");
                    }
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerResult;
    use crate::request::Request;
    use crate::response::Response;
    use crate::router::PathArgs;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn echo(request: &Request, response: &mut Response, args: &PathArgs) -> HandlerResult {
        let delay = request.query_argument("delay").and_then(|d| d.parse().ok()).unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        response.write(format!("echo {}", args.get("word").unwrap_or_default()));
        Ok(())
    }

    #[test]
    fn builder_needs_address_and_application() {
        let app = || Application::builder().build().unwrap();

        assert!(matches!(Server::builder().address("127.0.0.1:0").build(), Err(ServerBuildError::MissingApplication)));
        assert!(matches!(Server::builder().application(app()).build(), Err(ServerBuildError::MissingAddress)));
        assert!(matches!(
            Server::builder().application(app()).address("not an address").build(),
            Err(ServerBuildError::InvalidAddress { .. })
        ));
        assert!(Server::builder().application(app()).address("127.0.0.1:0").build().is_ok());
    }

    #[tokio::test]
    async fn concurrent_connections_do_not_mix() {
        let app = Application::builder().get("/echo/{word}", echo).build().unwrap();
        let server = Server::builder().application(app).address("127.0.0.1:0").build().unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(server.serve(listener));

        let clients = (0..16).map(|i| {
            tokio::spawn(async move {
                let mut stream = TcpStream::connect(address).await.unwrap();
                let request = format!("GET /echo/w{i}?delay={} HTTP/1.1\r\n\r\n", (16 - i) * 5);
                stream.write_all(request.as_bytes()).await.unwrap();

                let mut output = String::new();
                stream.read_to_string(&mut output).await.unwrap();
                (i, output)
            })
        });

        for client in clients.collect::<Vec<_>>() {
            let (i, output) = client.await.unwrap();
            assert!(output.starts_with("HTTP/1.1 200 OK\r\n"), "{output}");
            assert!(output.ends_with(&format!("\r\n\r\necho w{i}")), "{output}");
        }
    }
}
