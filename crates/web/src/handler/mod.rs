//! The two shapes of request handling code.
//!
//! A route is served either by a [`RequestHandler`] type, instantiated for every request,
//! or by a [`MethodTable`] of plain async functions keyed by [`Verb`]. Both end up behind
//! [`HandlerKind`] and are invoked the same way by the application.
//!
//! ```
//! use ember_web::handler::{Context, MethodTable, RequestHandler};
//! use ember_web::router::{PathArgs, RouteSettings};
//! use ember_web::{HandlerResult, Request, Response};
//!
//! struct Hello;
//!
//! #[async_trait::async_trait]
//! impl RequestHandler for Hello {
//!     fn new(_settings: &RouteSettings) -> Self {
//!         Hello
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
//! let functions = MethodTable::new().get(show);
//! ```

mod context;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use http::Method;

use crate::error::{HandlerResult, HttpError};
use crate::request::Request;
use crate::response::Response;
use crate::router::{PathArgs, RouteSettings};

pub use context::Context;

/// The request methods a handler can implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl Verb {
    pub const ALL: [Verb; 7] = [Verb::Get, Verb::Post, Verb::Put, Verb::Patch, Verb::Delete, Verb::Head, Verb::Options];

    /// `None` for methods no handler can implement, such as `TRACE` or extension methods.
    pub fn from_method(method: &Method) -> Option<Self> {
        let verb = match *method {
            Method::GET => Verb::Get,
            Method::POST => Verb::Post,
            Method::PUT => Verb::Put,
            Method::PATCH => Verb::Patch,
            Method::DELETE => Verb::Delete,
            Method::HEAD => Verb::Head,
            Method::OPTIONS => Verb::Options,
            _ => return None,
        };
        Some(verb)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::Post => "post",
            Verb::Put => "put",
            Verb::Patch => "patch",
            Verb::Delete => "delete",
            Verb::Head => "head",
            Verb::Options => "options",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A handler type, created fresh for every request it serves.
///
/// Every verb method defaults to `405 Method Not Allowed`; implement the ones the route
/// should answer. [`prepare`](RequestHandler::prepare) runs before the verb method and an
/// error from it skips the verb method.
#[async_trait]
pub trait RequestHandler: Send + 'static {
    /// Builds the handler from the settings bound to its route.
    fn new(settings: &RouteSettings) -> Self
    where
        Self: Sized;

    async fn prepare(&mut self, _cx: &mut Context<'_>) -> HandlerResult {
        Ok(())
    }

    async fn get(&mut self, _cx: &mut Context<'_>) -> HandlerResult {
        Err(HttpError::method_not_allowed().into())
    }

    async fn post(&mut self, _cx: &mut Context<'_>) -> HandlerResult {
        Err(HttpError::method_not_allowed().into())
    }

    async fn put(&mut self, _cx: &mut Context<'_>) -> HandlerResult {
        Err(HttpError::method_not_allowed().into())
    }

    async fn patch(&mut self, _cx: &mut Context<'_>) -> HandlerResult {
        Err(HttpError::method_not_allowed().into())
    }

    async fn delete(&mut self, _cx: &mut Context<'_>) -> HandlerResult {
        Err(HttpError::method_not_allowed().into())
    }

    async fn head(&mut self, _cx: &mut Context<'_>) -> HandlerResult {
        Err(HttpError::method_not_allowed().into())
    }

    async fn options(&mut self, _cx: &mut Context<'_>) -> HandlerResult {
        Err(HttpError::method_not_allowed().into())
    }
}

/// An async function usable as a route: `async fn(&Request, &mut Response, &PathArgs)`.
///
/// Implemented for every such function; there is no need to implement it by hand.
pub trait RouteFn<'a>: Send + Sync + 'static {
    type Future: Future<Output = HandlerResult> + Send + 'a;

    fn invoke(&self, request: &'a Request, response: &'a mut Response, args: &'a PathArgs) -> Self::Future;
}

impl<'a, F, Fut> RouteFn<'a> for F
where
    F: Fn(&'a Request, &'a mut Response, &'a PathArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'a,
{
    type Future = Fut;

    fn invoke(&self, request: &'a Request, response: &'a mut Response, args: &'a PathArgs) -> Self::Future {
        (self)(request, response, args)
    }
}

/// [`RouteFn`] with the future boxed, so functions of different types fit one table.
trait ErasedFn: Send + Sync {
    fn invoke<'a>(&'a self, request: &'a Request, response: &'a mut Response, args: &'a PathArgs) -> BoxFuture<'a, HandlerResult>;
}

struct FnRoute<F>(F);

impl<F> ErasedFn for FnRoute<F>
where
    F: for<'a> RouteFn<'a> + Send + Sync + 'static,
{
    fn invoke<'a>(&'a self, request: &'a Request, response: &'a mut Response, args: &'a PathArgs) -> BoxFuture<'a, HandlerResult> {
        Box::pin(self.0.invoke(request, response, args))
    }
}

/// One optional function per verb. A missing verb answers `405`.
#[derive(Clone, Default)]
pub struct MethodTable {
    slots: [Option<Arc<dyn ErasedFn>>; 7],
}

macro_rules! method_table_verb {
    ($method:ident, $verb:expr) => {
        #[must_use]
        pub fn $method<F>(self, f: F) -> Self
        where
            F: for<'a> RouteFn<'a> + Send + Sync + 'static,
        {
            self.on($verb, f)
        }
    };
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on<F>(mut self, verb: Verb, f: F) -> Self
    where
        F: for<'a> RouteFn<'a> + Send + Sync + 'static,
    {
        self.slots[verb.index()] = Some(Arc::new(FnRoute(f)));
        self
    }

    method_table_verb!(get, Verb::Get);
    method_table_verb!(post, Verb::Post);
    method_table_verb!(put, Verb::Put);
    method_table_verb!(patch, Verb::Patch);
    method_table_verb!(delete, Verb::Delete);
    method_table_verb!(head, Verb::Head);
    method_table_verb!(options, Verb::Options);

    pub fn handles(&self, verb: Verb) -> bool {
        self.slots[verb.index()].is_some()
    }

    /// A copy of `self` with every verb `other` handles taken from `other`.
    pub(crate) fn merged(&self, other: &MethodTable) -> MethodTable {
        let mut merged = self.clone();
        for (slot, theirs) in merged.slots.iter_mut().zip(&other.slots) {
            if theirs.is_some() {
                slot.clone_from(theirs);
            }
        }
        merged
    }
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(Verb::ALL.into_iter().filter(|verb| self.handles(*verb))).finish()
    }
}

pub type HandlerFactory = Arc<dyn Fn(&RouteSettings) -> Box<dyn RequestHandler> + Send + Sync>;

/// What a route entry dispatches to.
#[derive(Clone)]
pub enum HandlerKind {
    Class(HandlerFactory),
    Functions(MethodTable),
}

impl HandlerKind {
    pub fn class<H: RequestHandler>() -> Self {
        HandlerKind::Class(Arc::new(|settings: &RouteSettings| -> Box<dyn RequestHandler> { Box::new(H::new(settings)) }))
    }

    /// Runs the handler for `verb`. Class handlers are built from the route settings and
    /// prepared first.
    pub(crate) async fn invoke(&self, verb: Verb, cx: &mut Context<'_>) -> HandlerResult {
        match self {
            HandlerKind::Class(factory) => {
                let mut handler = factory(cx.settings());
                handler.prepare(cx).await?;
                match verb {
                    Verb::Get => handler.get(cx).await,
                    Verb::Post => handler.post(cx).await,
                    Verb::Put => handler.put(cx).await,
                    Verb::Patch => handler.patch(cx).await,
                    Verb::Delete => handler.delete(cx).await,
                    Verb::Head => handler.head(cx).await,
                    Verb::Options => handler.options(cx).await,
                }
            }
            HandlerKind::Functions(table) => match &table.slots[verb.index()] {
                Some(f) => {
                    let (request, response, args) = cx.parts();
                    f.invoke(request, response, args).await
                }
                None => Err(HttpError::method_not_allowed().into()),
            },
        }
    }
}

impl fmt::Debug for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerKind::Class(_) => f.write_str("Class"),
            HandlerKind::Functions(table) => f.debug_tuple("Functions").field(table).finish(),
        }
    }
}
