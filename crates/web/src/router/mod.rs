//! The route table.
//!
//! Routes are tried in registration order and the first matching pattern wins. Catch-all
//! patterns (`.*` and friends) are always tried after every other route, and the default
//! handler, if any, after those.
//!
//! The table can grow while requests are being served. Lookups work on a snapshot and
//! registration swaps in a new one, so an in-flight request never sees a half-built table.

mod pattern;

use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::handler::{HandlerKind, MethodTable, RequestHandler, RouteFn, Verb};

pub use pattern::{PathArgs, PatternError, ReverseError, RoutePattern};

/// Keyword configuration bound to a route and handed to class handlers on creation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteSettings {
    values: Map<String, Value>,
}

impl RouteSettings {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Deserializes the setting `key` into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<Result<T, serde_json::Error>> {
        self.values.get(key).map(|value| T::deserialize(value))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("route name '{name}' is already registered")]
    DuplicateName { name: String },
}

/// A route waiting to be registered.
///
/// ```
/// use ember_web::router::{PathArgs, Route};
/// use ember_web::{HandlerResult, Request, Response};
///
/// async fn show(_request: &Request, response: &mut Response, args: &PathArgs) -> HandlerResult {
///     response.write(format!("post {}", args.nth(0).unwrap_or_default()));
///     Ok(())
/// }
///
/// let route = Route::get(r"/post/(\d+)", show).name("post").setting("per_page", 20);
/// ```
#[derive(Debug)]
pub struct Route {
    pattern: String,
    handler: HandlerKind,
    settings: RouteSettings,
    name: Option<String>,
}

macro_rules! route_verb {
    ($method:ident, $verb:expr) => {
        pub fn $method<F>(pattern: impl Into<String>, f: F) -> Self
        where
            F: for<'a> RouteFn<'a> + Send + Sync + 'static,
        {
            Self::function(pattern, $verb, f)
        }
    };
}

impl Route {
    pub fn new(pattern: impl Into<String>, handler: HandlerKind) -> Self {
        Self { pattern: pattern.into(), handler, settings: RouteSettings::new(), name: None }
    }

    /// A route served by a fresh `H` for every request.
    pub fn handler<H: RequestHandler>(pattern: impl Into<String>) -> Self {
        Self::new(pattern, HandlerKind::class::<H>())
    }

    pub fn functions(pattern: impl Into<String>, table: MethodTable) -> Self {
        Self::new(pattern, HandlerKind::Functions(table))
    }

    pub fn function<F>(pattern: impl Into<String>, verb: Verb, f: F) -> Self
    where
        F: for<'a> RouteFn<'a> + Send + Sync + 'static,
    {
        Self::functions(pattern, MethodTable::new().on(verb, f))
    }

    route_verb!(get, Verb::Get);
    route_verb!(post, Verb::Post);
    route_verb!(put, Verb::Put);
    route_verb!(patch, Verb::Patch);
    route_verb!(delete, Verb::Delete);
    route_verb!(head, Verb::Head);
    route_verb!(options, Verb::Options);

    /// Names the route so paths can be built for it with [`RouteTable::reverse`].
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(key, value);
        self
    }

    #[must_use]
    pub fn settings(mut self, settings: RouteSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// A registered route. Entries are never changed once registered, only replaced.
#[derive(Debug)]
pub struct RouteEntry {
    pattern: RoutePattern,
    handler: HandlerKind,
    settings: RouteSettings,
    name: Option<String>,
}

impl RouteEntry {
    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    pub fn handler(&self) -> &HandlerKind {
        &self.handler
    }

    pub fn settings(&self) -> &RouteSettings {
        &self.settings
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// The entry a path resolved to and what its pattern captured.
#[derive(Debug)]
pub struct RouteMatch {
    pub entry: Arc<RouteEntry>,
    pub args: PathArgs,
}

#[derive(Debug, Default, Clone)]
struct RouteSet {
    ordered: Vec<Arc<RouteEntry>>,
    catch_all: Vec<Arc<RouteEntry>>,
    default: Option<Arc<RouteEntry>>,
}

impl RouteSet {
    fn entries(&self) -> impl Iterator<Item = &Arc<RouteEntry>> {
        self.ordered.iter().chain(&self.catch_all)
    }

    fn resolve(&self, path: &str) -> Option<RouteMatch> {
        self.entries()
            .find_map(|entry| entry.pattern.captures(path).map(|args| RouteMatch { entry: entry.clone(), args }))
            .or_else(|| self.default.clone().map(|entry| RouteMatch { entry, args: PathArgs::None }))
    }

    fn slot_mut(&mut self, pattern: &str) -> Option<&mut Arc<RouteEntry>> {
        self.ordered.iter_mut().chain(&mut self.catch_all).find(|entry| entry.pattern.as_str() == pattern)
    }
}

#[derive(Debug, Default)]
pub struct RouteTable {
    current: ArcSwap<RouteSet>,
    writer: Mutex<()>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `route`.
    ///
    /// A function route on a pattern that already has function routes is merged into the
    /// existing entry, keeping its position; verbs given by `route` win.
    pub fn add(&self, route: Route) -> Result<(), BuildError> {
        let pattern = RoutePattern::new(&route.pattern)?;
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let mut next = RouteSet::clone(&self.current.load());
        if let Some(name) = &route.name
            && next.entries().any(|entry| entry.name.as_ref() == Some(name))
        {
            return Err(BuildError::DuplicateName { name: name.clone() });
        }

        if let HandlerKind::Functions(table) = &route.handler
            && let Some(slot) = next.slot_mut(pattern.as_str())
            && let HandlerKind::Functions(existing) = &slot.handler
        {
            debug!(pattern = pattern.as_str(), "merging function route");
            let mut settings = slot.settings.clone();
            for (key, value) in route.settings.values {
                settings.insert(key, value);
            }
            *slot = Arc::new(RouteEntry {
                handler: HandlerKind::Functions(existing.merged(table)),
                settings,
                name: route.name.or_else(|| slot.name.clone()),
                pattern,
            });
        } else {
            debug!(pattern = pattern.as_str(), catch_all = pattern.is_catch_all(), "adding route");
            let catch_all = pattern.is_catch_all();
            let entry = Arc::new(RouteEntry { pattern, handler: route.handler, settings: route.settings, name: route.name });
            if catch_all {
                next.catch_all.push(entry);
            } else {
                next.ordered.push(entry);
            }
        }

        self.current.store(Arc::new(next));
        Ok(())
    }

    /// Serves every path no route matches.
    pub fn set_default(&self, handler: HandlerKind, settings: RouteSettings) -> Result<(), BuildError> {
        let pattern = RoutePattern::new(".*")?;
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let mut next = RouteSet::clone(&self.current.load());
        next.default = Some(Arc::new(RouteEntry { pattern, handler, settings, name: None }));
        self.current.store(Arc::new(next));
        Ok(())
    }

    /// Finds the entry for `path`, `None` when nothing, not even a default, matches.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch> {
        self.current.load().resolve(path)
    }

    /// Builds the path of the route called `name` from positional `args`.
    pub fn reverse<S: AsRef<str>>(&self, name: &str, args: &[S]) -> Result<String, ReverseError> {
        let routes = self.current.load();
        let entry = routes
            .entries()
            .find(|entry| entry.name.as_deref() == Some(name))
            .ok_or_else(|| ReverseError::UnknownName { name: name.to_owned() })?;
        entry.pattern.reverse(args)
    }

    /// The number of registered routes, not counting the default handler.
    pub fn len(&self) -> usize {
        let routes = self.current.load();
        routes.ordered.len() + routes.catch_all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
