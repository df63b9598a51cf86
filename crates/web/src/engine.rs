//! The dispatcher.
//!
//! [`Engine`] owns the route table and turns each request into one run of a handler chain:
//! the chain of the matched route, or the chain of the not-found / method-not-allowed
//! handlers. Near misses are redirected first, in this order:
//!
//! 1. a trailing slash too many or too few, when `redirect_trailing_slash` is on
//! 2. a path that only matches after cleaning and case folding, when `redirect_fixed_path`
//!    is on
//!
//! Neither applies to `CONNECT` requests or to the root path.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{ALLOW, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use http::{HeaderValue, Method, Request, StatusCode};
use switchyard_http::writer::ResponseWriter;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::context::{Context, NOSNIFF, TEXT_PLAIN_UTF_8};
use crate::error::ConfigError;
use crate::group::{RouteGroup, group_base, method_shortcut};
use crate::handler::{Handler, HandlerChain};
use crate::path::clean_path;
use crate::pool::ContextPool;
use crate::route::{Route, RouteTable};
use crate::started::StartGuard;
use crate::validator::Validator;

const DEFAULT_404_BODY: &str = "404 page not found";
const DEFAULT_405_BODY: &str = "405 method not allowed";

/// Routes requests to handler chains.
///
/// Routes, middleware and settings are registered through `&mut self` before the engine
/// serves. The first call to [`serve`](Engine::serve) freezes the engine: every mutating
/// call made afterwards fails with [`ConfigError::AlreadyStarted`].
///
/// ```
/// use bytes::Bytes;
/// use http::{Request, StatusCode};
/// use switchyard_http::writer::Recorder;
/// use switchyard_web::{Engine, handler_fn};
///
/// let mut engine = Engine::new();
/// engine
///     .get("/users/:id", [handler_fn(|ctx| {
///         let body = format!("user {}", ctx.param("id"));
///         ctx.string(StatusCode::OK, &body).unwrap();
///     })])
///     .unwrap();
///
/// let request = Request::get("/users/42").body(Bytes::new()).unwrap();
/// let recorder = engine.serve(Recorder::new(), request).unwrap();
/// assert_eq!(recorder.body_str(), "user 42");
/// ```
pub struct Engine {
    config: EngineConfig,
    routes: RouteTable,
    middlewares: HandlerChain,
    no_route: Vec<Handler>,
    no_method: Vec<Handler>,
    all_no_route: HandlerChain,
    all_no_method: HandlerChain,
    validator: Option<Arc<dyn Validator>>,
    pool: ContextPool,
    started: StartGuard,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            routes: RouteTable::new(),
            middlewares: HandlerChain::empty(),
            no_route: Vec::new(),
            no_method: Vec::new(),
            all_no_route: HandlerChain::empty(),
            all_no_method: HandlerChain::empty(),
            validator: None,
            pool: ContextPool::new(),
            started: StartGuard::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EngineConfig) -> Result<&mut Self, ConfigError> {
        self.check_started("change the config")?;
        self.config = config;
        Ok(self)
    }

    pub fn set_redirect_trailing_slash(&mut self, enabled: bool) -> Result<&mut Self, ConfigError> {
        self.check_started("change the config")?;
        self.config.redirect_trailing_slash = enabled;
        Ok(self)
    }

    pub fn set_redirect_fixed_path(&mut self, enabled: bool) -> Result<&mut Self, ConfigError> {
        self.check_started("change the config")?;
        self.config.redirect_fixed_path = enabled;
        Ok(self)
    }

    pub fn set_handle_method_not_allowed(&mut self, enabled: bool) -> Result<&mut Self, ConfigError> {
        self.check_started("change the config")?;
        self.config.handle_method_not_allowed = enabled;
        Ok(self)
    }

    pub fn set_fetch_client_ip_from_header(&mut self, enabled: bool) -> Result<&mut Self, ConfigError> {
        self.check_started("change the config")?;
        self.config.fetch_client_ip_from_header = enabled;
        Ok(self)
    }

    /// The validator bound into every request context.
    pub fn set_validator(&mut self, validator: Arc<dyn Validator>) -> Result<&mut Self, ConfigError> {
        self.check_started("set the validator")?;
        self.validator = Some(validator);
        Ok(self)
    }

    /// Appends global middleware. It runs before every route registered afterwards, and
    /// before the custom not-found and method-not-allowed handlers, if any are set.
    pub fn middleware<I>(&mut self, handlers: I) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = Handler>,
    {
        self.check_started("add middleware")?;
        self.middlewares = self.middlewares.combine(handlers)?;
        self.rebuild_error_chains()?;
        Ok(self)
    }

    /// Handlers for requests no route matched.
    pub fn no_route<I>(&mut self, handlers: I) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = Handler>,
    {
        self.check_started("set the not-found handlers")?;
        self.no_route = handlers.into_iter().collect();
        self.rebuild_error_chains()?;
        Ok(self)
    }

    /// Handlers for requests whose path only matched under other methods. Only used when
    /// `handle_method_not_allowed` is on.
    pub fn no_method<I>(&mut self, handlers: I) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = Handler>,
    {
        self.check_started("set the method-not-allowed handlers")?;
        self.no_method = handlers.into_iter().collect();
        self.rebuild_error_chains()?;
        Ok(self)
    }

    // global middleware only wraps custom handlers, a bare 404/405 runs no chain
    fn rebuild_error_chains(&mut self) -> Result<(), ConfigError> {
        let all_no_route = self.error_chain(&self.no_route)?;
        let all_no_method = self.error_chain(&self.no_method)?;
        self.all_no_route = all_no_route;
        self.all_no_method = all_no_method;
        Ok(())
    }

    fn error_chain(&self, handlers: &[Handler]) -> Result<HandlerChain, ConfigError> {
        if handlers.is_empty() {
            return Ok(HandlerChain::empty());
        }
        self.middlewares.combine(handlers.iter().cloned())
    }

    /// A group of routes below `prefix`, running `middlewares` after the global middleware.
    pub fn group<I>(&mut self, prefix: &str, middlewares: I) -> Result<RouteGroup<'_>, ConfigError>
    where
        I: IntoIterator<Item = Handler>,
    {
        self.check_started("add group")?;
        let base_path = group_base("/", prefix)?;
        let middlewares = self.middlewares.combine(middlewares)?;
        Ok(RouteGroup::new(self, base_path, middlewares))
    }

    /// Registers `handlers` for a custom method. The method must be upper case ASCII.
    pub fn handle<I>(&mut self, method: &str, path: &str, handlers: I) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = Handler>,
    {
        let middlewares = self.middlewares.clone();
        RouteGroup::new(self, "/".to_owned(), middlewares).handle(method, path, handlers)?;
        Ok(self)
    }

    method_shortcut!(get, GET);
    method_shortcut!(head, HEAD);
    method_shortcut!(post, POST);
    method_shortcut!(put, PUT);
    method_shortcut!(patch, PATCH);
    method_shortcut!(delete, DELETE);
    method_shortcut!(connect, CONNECT);
    method_shortcut!(options, OPTIONS);
    method_shortcut!(trace, TRACE);

    /// Registers `handlers` for every method in [`ANY_METHODS`](crate::ANY_METHODS).
    pub fn any<I>(&mut self, path: &str, handlers: I) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = Handler>,
    {
        let middlewares = self.middlewares.clone();
        RouteGroup::new(self, "/".to_owned(), middlewares).any(path, handlers)?;
        Ok(self)
    }

    fn add<I>(&mut self, method: Method, path: &str, handlers: I) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = Handler>,
    {
        let middlewares = self.middlewares.clone();
        RouteGroup::new(self, "/".to_owned(), middlewares).add(method, path, handlers)?;
        Ok(self)
    }

    pub(crate) fn check_route(&self, method: &Method, path: &str) -> Result<(), ConfigError> {
        self.check_started("add route")?;
        self.routes.check(method, path)?;
        Ok(())
    }

    pub(crate) fn add_route(&mut self, method: Method, path: &str, handlers: HandlerChain) -> Result<(), ConfigError> {
        self.check_started("add route")?;
        let handler = handlers.last().map_or("", Handler::name);
        let len = handlers.len();

        self.routes.add(method.clone(), path, handlers)?;
        self.pool.set_params_capacity(self.routes.max_params());
        debug!(%method, path, handler, handlers = len, "route registered");
        Ok(())
    }

    pub(crate) fn check_started(&self, operation: &'static str) -> Result<(), ConfigError> {
        self.started.check(operation)
    }

    /// Every registered route, grouped by method.
    pub fn routes(&self) -> Vec<Route> {
        self.routes.routes()
    }

    /// Whether the engine served a request and no longer accepts changes.
    pub fn is_started(&self) -> bool {
        self.started.is_started()
    }

    /// Serves one request, and hands the writer back once the response is complete.
    ///
    /// Returns `None` only if a handler took the writer out of its context. A hijacked writer
    /// stays bound and is handed back like any other.
    pub fn serve<W: ResponseWriter>(&self, writer: W, request: Request<Bytes>) -> Option<W> {
        self.started.start();

        let mut ctx = self.pool.acquire();
        ctx.reset(writer, request, self.validator.clone(), self.config.fetch_client_ip_from_header);
        self.handle_request(&mut ctx);

        let writer = ctx.take_writer::<W>();
        self.pool.release(ctx);
        if writer.is_none() {
            warn!("response writer was unbound by a handler");
        }
        writer
    }

    fn handle_request(&self, ctx: &mut Context) {
        let request = ctx.shared_request();
        let method = request.method();
        let path = request.uri().path();

        let found = self.routes.lookup(method, path, &mut ctx.params);
        if let Some(endpoint) = found.value {
            ctx.bind(endpoint);
            ctx.next();
            return;
        }

        if method != Method::CONNECT && path != "/" {
            if found.tsr && self.config.redirect_trailing_slash {
                let location = toggle_trailing_slash(path);
                redirect(ctx, &request, &location);
                return;
            }
            if self.config.redirect_fixed_path
                && let Some(root) = self.routes.get(method)
                && let Some(location) = root.find_case_insensitive(&clean_path(path), self.config.redirect_trailing_slash)
            {
                redirect(ctx, &request, &location);
                return;
            }
        }

        if self.config.handle_method_not_allowed {
            let allowed = self.routes.allowed(method, path, &mut ctx.params);
            if !allowed.is_empty() {
                let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    ctx.writer().headers_mut().insert(ALLOW, value);
                }
                ctx.set_handlers(self.all_no_method.clone());
                serve_error(ctx, StatusCode::METHOD_NOT_ALLOWED, DEFAULT_405_BODY);
                return;
            }
        }

        ctx.set_handlers(self.all_no_route.clone());
        serve_error(ctx, StatusCode::NOT_FOUND, DEFAULT_404_BODY);
    }
}

fn toggle_trailing_slash(path: &str) -> String {
    match path.strip_suffix('/') {
        Some(trimmed) => trimmed.to_owned(),
        None => format!("{path}/"),
    }
}

fn redirect(ctx: &mut Context, request: &Request<Bytes>, path: &str) {
    let status = if request.method() == Method::GET { StatusCode::MOVED_PERMANENTLY } else { StatusCode::TEMPORARY_REDIRECT };
    let location = match request.uri().query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_owned(),
    };

    debug!(code = status.as_u16(), from = request.uri().path(), to = %location, "redirecting request");
    if let Err(e) = ctx.redirect(status, &location) {
        warn!(cause = %e, "failed to write redirect");
    }
}

fn serve_error(ctx: &mut Context, status: StatusCode, default_body: &str) {
    ctx.next();
    if ctx.writer().wrote_header() {
        return;
    }

    let headers = ctx.writer().headers_mut();
    headers.insert(CONTENT_TYPE, TEXT_PLAIN_UTF_8);
    headers.insert(X_CONTENT_TYPE_OPTIONS, NOSNIFF);
    ctx.writer().write_header(status);
    if let Err(e) = ctx.writer().write_str(default_body) {
        warn!(cause = %e, status = status.as_u16(), "failed to write default error body");
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("routes", &self.routes.routes())
            .field("middlewares", &self.middlewares)
            .field("has_validator", &self.validator.is_some())
            .field("started", &self.started.is_started())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::Engine;
    use crate::context::Context;
    use crate::error::ConfigError;
    use crate::handler::handler_fn;
    use bytes::Bytes;
    use http::{Method, Request, StatusCode};
    use switchyard_http::writer::Recorder;

    fn serve(engine: &Engine, method: Method, uri: &str) -> http::Response<Bytes> {
        let request = Request::builder().method(method).uri(uri).body(Bytes::new()).unwrap();
        engine.serve(Recorder::new(), request).unwrap().into_response()
    }

    fn ok(ctx: &mut Context) {
        let name = ctx.full_path().to_owned();
        ctx.string(StatusCode::OK, &name).unwrap();
    }

    #[test]
    fn test_match_runs_chain() {
        let mut engine = Engine::new();
        engine.get("/a/:b", [handler_fn(ok)]).unwrap();

        let response = serve(&engine, Method::GET, "/a/1");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(&response.body()[..], b"/a/:b");
    }

    #[test]
    fn test_trailing_slash_redirect_codes() {
        let mut engine = Engine::new();
        engine.get("/a", [handler_fn(ok)]).unwrap();
        engine.post("/b/", [handler_fn(ok)]).unwrap();

        let response = serve(&engine, Method::GET, "/a/?x=1");
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()["location"], "/a?x=1");

        let response = serve(&engine, Method::POST, "/b");
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()["location"], "/b/");
        assert!(response.body().is_empty());
    }

    #[test]
    fn test_default_not_found() {
        let engine = Engine::new();
        let response = serve(&engine, Method::GET, "/");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["content-type"], "text/plain; charset=utf-8");
        assert_eq!(&response.body()[..], b"404 page not found");
    }

    #[test]
    fn test_custom_no_route_keeps_its_response() {
        let mut engine = Engine::new();
        engine
            .no_route([handler_fn(|ctx| ctx.string(StatusCode::NOT_FOUND, "nothing here").unwrap())])
            .unwrap();

        let response = serve(&engine, Method::GET, "/missing");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(&response.body()[..], b"nothing here");
    }

    #[test]
    fn test_hijacked_writer_is_handed_back() {
        use std::io::{Cursor, Write};
        use switchyard_http::connection::ConnectionWriter;

        let mut engine = Engine::new();
        engine
            .get("/ws", [handler_fn(|ctx| {
                let mut raw = ctx.writer().hijack().unwrap();
                raw.write_all(b"upgraded").unwrap();
            })])
            .unwrap();

        let request = Request::get("/ws").body(Bytes::new()).unwrap();
        let writer = engine.serve(ConnectionWriter::new(Cursor::new(Vec::new())), request);
        assert!(writer.is_some_and(|writer| writer.finish().is_ok()));
    }

    #[test]
    fn test_frozen_after_serve() {
        let mut engine = Engine::new();
        assert!(!engine.is_started());
        serve(&engine, Method::GET, "/");
        assert!(engine.is_started());

        let err = engine.get("/late", [handler_fn(ok)]).unwrap_err();
        assert_eq!(err, ConfigError::AlreadyStarted { operation: "add route" });
        assert!(engine.set_redirect_fixed_path(true).is_err());
        assert!(engine.middleware([handler_fn(ok)]).is_err());
        assert!(engine.routes().is_empty());
    }
}
