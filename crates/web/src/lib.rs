//! A small async web framework on top of `ember-http`.
//!
//! Routes map regular expression patterns (with `{name}` placeholders) to handlers. A
//! handler is either a [`RequestHandler`] type, created fresh for every request, or a set
//! of plain async functions keyed by verb. Every accepted connection serves exactly one
//! request and is then closed.
//!
//! # Example
//!
//! ```no_run
//! use ember_web::router::{PathArgs, RouteSettings};
//! use ember_web::{Application, Context, HandlerResult, Request, RequestHandler, Response, Server};
//!
//! struct MainHandler;
//!
//! #[async_trait::async_trait]
//! impl RequestHandler for MainHandler {
//!     fn new(_settings: &RouteSettings) -> Self {
//!         MainHandler
//!     }
//!
//!     async fn get(&mut self, cx: &mut Context<'_>) -> HandlerResult {
//!         cx.write("Hello World");
//!         Ok(())
//!     }
//! }
//!
//! async fn show(_request: &Request, response: &mut Response, args: &PathArgs) -> HandlerResult {
//!     response.write(format!("id: {}", args.get("id").unwrap_or_default()));
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let application = Application::builder()
//!         .handler::<MainHandler>("/")
//!         .get("/{id}/", show)
//!         .build()
//!         .unwrap();
//!
//!     let server = Server::builder().application(application).address("127.0.0.1:8080").build().unwrap();
//!     server.start().await.unwrap();
//! }
//! ```

mod access_log;
mod app;
mod cookie;
mod error;
mod multimap;
mod request;
mod response;
mod server;

pub mod form;
pub mod handler;
pub mod router;
pub mod secure;

pub use access_log::{AccessLog, TracingAccessLog};
pub use app::{Application, ApplicationBuilder};
pub use cookie::{Cookie, parse_cookies};
pub use error::{HandlerError, HandlerResult, HeaderError, HttpError, WriteJsonError};
pub use handler::{Context, RequestHandler, Verb};
pub use multimap::MultiMap;
pub use request::Request;
pub use response::Response;
pub use router::{BuildError, Route};
pub use server::{Server, ServerBuildError, ServerBuilder, ServerError};
