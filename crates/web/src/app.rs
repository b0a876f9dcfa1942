//! The application: a route table plus the settings every handler shares.
//!
//! [`Application`] implements [`Handler`], so it plugs straight into an
//! [`HttpConnection`](ember_http::connection::HttpConnection). Every request it receives
//! gets exactly one response and one access log record, whatever the handler does:
//!
//! | outcome                           | response                                      |
//! |-----------------------------------|-----------------------------------------------|
//! | no route matches                  | `404`, empty body                             |
//! | method not implemented            | `405`, empty body                             |
//! | handler returns an [`HttpError`]  | its status, body replaced by its message      |
//! | handler fails otherwise or panics | `500`, body empty unless the app is in debug  |

use std::any::Any;
use std::convert::Infallible;
use std::error::Error;
use std::fmt::{self, Write};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use ember_http::handler::Handler;
use ember_http::protocol::{ParseError, RequestHeader};
use futures::FutureExt;
use http::StatusCode;
use tracing::{debug, error, warn};

use crate::access_log::{AccessLog, TracingAccessLog};
use crate::error::{HandlerError, HandlerResult, HttpError};
use crate::handler::{Context, HandlerKind, MethodTable, RequestHandler, RouteFn, Verb};
use crate::request::Request;
use crate::response::Response;
use crate::router::{BuildError, ReverseError, Route, RouteMatch, RouteSettings, RouteTable};

/// Settings handed to every handler through its [`Context`].
#[derive(Debug, Default, Clone)]
pub(crate) struct AppConfig {
    pub(crate) debug: bool,
    pub(crate) cookie_secret: Option<String>,
}

pub struct Application {
    routes: RouteTable,
    config: AppConfig,
    access_log: Arc<dyn AccessLog>,
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application").field("routes", &self.routes).field("debug", &self.config.debug).finish_non_exhaustive()
    }
}

pub struct ApplicationBuilder {
    routes: Vec<Route>,
    default: Option<HandlerKind>,
    config: AppConfig,
    access_log: Arc<dyn AccessLog>,
}

macro_rules! builder_verb {
    ($method:ident, $verb:expr) => {
        /// Serves the verb on `pattern` with `f`. Functions on the same pattern share one route.
        #[must_use]
        pub fn $method<F>(self, pattern: impl Into<String>, f: F) -> Self
        where
            F: for<'a> RouteFn<'a> + Send + Sync + 'static,
        {
            self.route(Route::function(pattern, $verb, f))
        }
    };
}

impl ApplicationBuilder {
    fn new() -> Self {
        Self { routes: Vec::new(), default: None, config: AppConfig::default(), access_log: Arc::new(TracingAccessLog) }
    }

    #[must_use]
    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// Serves `pattern` with a fresh `H` per request.
    #[must_use]
    pub fn handler<H: RequestHandler>(self, pattern: impl Into<String>) -> Self {
        self.route(Route::handler::<H>(pattern))
    }

    builder_verb!(get, Verb::Get);
    builder_verb!(post, Verb::Post);
    builder_verb!(put, Verb::Put);
    builder_verb!(patch, Verb::Patch);
    builder_verb!(delete, Verb::Delete);
    builder_verb!(head, Verb::Head);
    builder_verb!(options, Verb::Options);

    /// Serves paths no route matches with `H` instead of a `404`.
    #[must_use]
    pub fn default_handler<H: RequestHandler>(mut self) -> Self {
        self.default = Some(HandlerKind::class::<H>());
        self
    }

    #[must_use]
    pub fn default_functions(mut self, table: MethodTable) -> Self {
        self.default = Some(HandlerKind::Functions(table));
        self
    }

    /// In debug mode the description of an unhandled failure is sent as the `500` body.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// The key for signed cookies.
    #[must_use]
    pub fn cookie_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.cookie_secret = Some(secret.into());
        self
    }

    #[must_use]
    pub fn access_log(mut self, access_log: impl AccessLog + 'static) -> Self {
        self.access_log = Arc::new(access_log);
        self
    }

    /// Compiles every route pattern, in registration order.
    pub fn build(self) -> Result<Application, BuildError> {
        let routes = RouteTable::new();
        for route in self.routes {
            routes.add(route)?;
        }
        if let Some(default) = self.default {
            routes.set_default(default, RouteSettings::new())?;
        }
        Ok(Application { routes, config: self.config, access_log: self.access_log })
    }
}

impl Application {
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    /// Registers a route while the application may already be serving.
    pub fn add_route(&self, route: Route) -> Result<(), BuildError> {
        self.routes.add(route)
    }

    /// Registers a function for one verb, merged with functions already on `pattern`.
    pub fn add_function<F>(&self, pattern: impl Into<String>, verb: Verb, f: F) -> Result<(), BuildError>
    where
        F: for<'a> RouteFn<'a> + Send + Sync + 'static,
    {
        self.routes.add(Route::function(pattern, verb, f))
    }

    /// Builds the path of the route called `name`, percent-encoding `args`.
    pub fn reverse_url<S: AsRef<str>>(&self, name: &str, args: &[S]) -> Result<String, ReverseError> {
        self.routes.reverse(name, args)
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn is_debug(&self) -> bool {
        self.config.debug
    }

    async fn dispatch(&self, request: &Request, response: &mut Response) -> HandlerResult {
        let RouteMatch { entry, args } = self.routes.resolve(request.path()).ok_or_else(HttpError::not_found)?;
        let verb = Verb::from_method(request.method()).ok_or_else(HttpError::method_not_allowed)?;

        let mut cx = Context::new(&self.config, request, response, &args, entry.settings());
        match AssertUnwindSafe(entry.handler().invoke(verb, &mut cx)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(HandlerError::fault(format!("handler panicked: {}", panic_message(panic.as_ref())))),
        }
    }

    /// Replaces whatever the handler wrote with the error response.
    fn render_error(&self, response: &mut Response, error: HandlerError) {
        response.clear();
        match error {
            HandlerError::Http(e) => {
                debug!(status = e.status().as_u16(), "handler raised http error");
                response.set_status(e.status());
                if let Some(message) = e.message() {
                    response.write(message);
                }
            }
            HandlerError::Fault(e) => {
                error!(cause = %e, "uncaught failure in handler");
                response.set_status(StatusCode::INTERNAL_SERVER_ERROR);
                if self.config.debug {
                    response.write(describe(e.as_ref()));
                }
            }
        }
    }
}

#[async_trait]
impl Handler for Application {
    type Error = Infallible;

    async fn call(&self, req: ember_http::handler::Request) -> Result<http::Response<Bytes>, Self::Error> {
        let method = req.method().clone();
        let uri = req.uri().clone();
        let mut response = Response::new();

        match Request::from_http(req) {
            Ok(request) => {
                if let Err(e) = self.dispatch(&request, &mut response).await {
                    self.render_error(&mut response, e);
                }
                self.access_log.record(response.status(), method.as_str(), request.path(), request.query_string());
            }
            Err(e) => {
                warn!(cause = %e, "can't decode request body");
                self.render_error(&mut response, HttpError::bad_request(e.to_string()).into());
                self.access_log.record(response.status(), method.as_str(), uri.path(), uri.query().unwrap_or_default());
            }
        }

        Ok(response.into_http())
    }

    fn on_parse_error(&self, header: Option<&RequestHeader>, error: &ParseError) -> http::Response<Bytes> {
        let status = error.status_code();
        match header {
            Some(header) => {
                let uri = header.uri();
                self.access_log.record(status, header.method().as_str(), uri.path(), uri.query().unwrap_or_default());
            }
            None => self.access_log.record(status, "-", "-", ""),
        }
        let mut response = Response::new();
        response.set_status(status);
        response.into_http()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown cause")
}

/// The error and its chain of sources, one per line.
fn describe(error: &(dyn Error + 'static)) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let _ = write!(text, "\ncaused by: {cause}");
        source = cause.source();
    }
    text
}
