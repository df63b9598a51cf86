//! Route groups: a path prefix plus the middleware shared by every route below it.

use http::Method;

use crate::engine::Engine;
use crate::error::{ConfigError, InsertError};
use crate::handler::{Handler, HandlerChain};
use crate::path::join_paths;

/// The methods [`RouteGroup::any`] registers.
pub const ANY_METHODS: [Method; 9] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::HEAD,
    Method::OPTIONS,
    Method::DELETE,
    Method::CONNECT,
    Method::TRACE,
];

macro_rules! method_shortcut {
    ($name:ident, $method:ident) => {
        #[doc = concat!("Registers `handlers` for `", stringify!($method), "` requests on `path`.")]
        #[inline]
        pub fn $name<I>(&mut self, path: &str, handlers: I) -> Result<&mut Self, ConfigError>
        where
            I: IntoIterator<Item = Handler>,
        {
            self.add(Method::$method, path, handlers)
        }
    };
}

pub(crate) use method_shortcut;

/// Registers routes below a common prefix, behind a common middleware chain.
///
/// ```
/// use switchyard_web::{Engine, handler_fn};
///
/// let mut engine = Engine::new();
/// let mut v1 = engine.group("/v1", [handler_fn(|ctx| ctx.next())]).unwrap();
/// v1.get("/users/:id", [handler_fn(|_ctx| {})]).unwrap();
///
/// let routes = engine.routes();
/// assert_eq!(routes[0].path, "/v1/users/:id");
/// assert_eq!(routes[0].handlers, 2);
/// ```
#[derive(Debug)]
pub struct RouteGroup<'e> {
    engine: &'e mut Engine,
    base_path: String,
    middlewares: HandlerChain,
}

impl<'e> RouteGroup<'e> {
    pub(crate) fn new(engine: &'e mut Engine, base_path: String, middlewares: HandlerChain) -> Self {
        Self { engine, base_path, middlewares }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Appends middleware for the routes registered through this group from now on.
    pub fn middleware<I>(&mut self, handlers: I) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = Handler>,
    {
        self.engine.check_started("add middleware")?;
        self.middlewares = self.middlewares.combine(handlers)?;
        Ok(self)
    }

    /// A nested group, inheriting the prefix and middleware of this one.
    pub fn group<I>(&mut self, prefix: &str, middlewares: I) -> Result<RouteGroup<'_>, ConfigError>
    where
        I: IntoIterator<Item = Handler>,
    {
        self.engine.check_started("add group")?;
        let base_path = group_base(&self.base_path, prefix)?;
        let middlewares = self.middlewares.combine(middlewares)?;
        Ok(RouteGroup::new(&mut *self.engine, base_path, middlewares))
    }

    /// Registers `handlers` for a custom method. The method must be upper case ASCII.
    pub fn handle<I>(&mut self, method: &str, path: &str, handlers: I) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = Handler>,
    {
        let valid = !method.is_empty() && method.bytes().all(|b| b.is_ascii_uppercase());
        let method = Method::from_bytes(method.as_bytes())
            .ok()
            .filter(|_| valid)
            .ok_or_else(|| ConfigError::InvalidMethod { method: method.to_owned() })?;
        self.add(method, path, handlers)
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

    /// Registers `handlers` for every method in [`ANY_METHODS`].
    ///
    /// Either all methods are registered or, on error, none of them.
    pub fn any<I>(&mut self, path: &str, handlers: I) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = Handler>,
    {
        let (full_path, chain) = self.prepare(path, handlers)?;
        for method in &ANY_METHODS {
            self.engine.check_route(method, &full_path)?;
        }
        for method in ANY_METHODS {
            self.engine.add_route(method, &full_path, chain.clone())?;
        }
        Ok(self)
    }

    pub(crate) fn add<I>(&mut self, method: Method, path: &str, handlers: I) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = Handler>,
    {
        let (full_path, chain) = self.prepare(path, handlers)?;
        self.engine.add_route(method, &full_path, chain)?;
        Ok(self)
    }

    fn prepare<I>(&self, path: &str, handlers: I) -> Result<(String, HandlerChain), ConfigError>
    where
        I: IntoIterator<Item = Handler>,
    {
        if !path.is_empty() && !path.starts_with('/') {
            return Err(InsertError::MissingLeadingSlash { path: path.to_owned() }.into());
        }
        let handlers: Vec<Handler> = handlers.into_iter().collect();
        if handlers.is_empty() {
            return Err(ConfigError::EmptyChain { path: path.to_owned() });
        }

        let full_path = join_paths(&self.base_path, path);
        let chain = self.middlewares.combine(handlers)?;
        Ok((full_path, chain))
    }
}

pub(crate) fn group_base(base_path: &str, prefix: &str) -> Result<String, ConfigError> {
    if prefix.contains([':', '*']) {
        return Err(ConfigError::ParamInGroupPrefix { prefix: prefix.to_owned() });
    }
    Ok(join_paths(base_path, prefix))
}
