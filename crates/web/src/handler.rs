use std::any::type_name;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::context::Context;
use crate::error::ConfigError;

/// Upper bound on the number of handlers in one chain, middlewares included.
pub const MAX_HANDLERS: usize = 64;

type HandlerFn = dyn Fn(&mut Context) + Send + Sync;

/// A request handler or middleware.
///
/// Handlers receive the request [`Context`] and drive the chain through
/// [`Context::next`] and [`Context::abort`].
#[derive(Clone)]
pub struct Handler {
    name: &'static str,
    f: Arc<HandlerFn>,
}

impl Handler {
    /// The type name of the function this handler was built from.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn call(&self, ctx: &mut Context) {
        (self.f)(ctx);
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler").field(&self.name).finish()
    }
}

/// Turns a function or closure into a [`Handler`].
pub fn handler_fn<F>(f: F) -> Handler
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    Handler { name: type_name::<F>(), f: Arc::new(f) }
}

/// An immutable, cheaply clonable sequence of handlers.
#[derive(Clone, Default)]
pub struct HandlerChain(Arc<[Handler]>);

impl HandlerChain {
    pub fn new<I>(handlers: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = Handler>,
    {
        Self::empty().combine(handlers)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Appends `handlers` to a copy of this chain.
    pub fn combine<I>(&self, handlers: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = Handler>,
    {
        let combined = self.0.iter().cloned().chain(handlers).collect::<Vec<_>>();
        if combined.len() > MAX_HANDLERS {
            return Err(ConfigError::ChainTooLong { len: combined.len(), max: MAX_HANDLERS });
        }
        Ok(Self(combined.into()))
    }

    /// The terminal handler, which names the chain in route listings.
    pub fn last(&self) -> Option<&Handler> {
        self.0.last()
    }
}

impl Deref for HandlerChain {
    type Target = [Handler];

    fn deref(&self) -> &[Handler] {
        &self.0
    }
}

impl fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter().map(Handler::name)).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{HandlerChain, MAX_HANDLERS, handler_fn};
    use crate::context::Context;
    use crate::error::ConfigError;

    fn logger(_ctx: &mut Context) {}

    #[test]
    fn test_handler_name() {
        let handler = handler_fn(logger);
        assert!(handler.name().ends_with("tests::logger"));
    }

    #[test]
    fn test_combine_keeps_order() {
        let middlewares = HandlerChain::new([handler_fn(logger)]).unwrap();
        let chain = middlewares.combine([handler_fn(|_ctx: &mut Context| {})]).unwrap();

        assert_eq!(middlewares.len(), 1);
        assert_eq!(chain.len(), 2);
        assert!(chain[0].name().ends_with("logger"));
        assert!(chain.last().unwrap().name().contains("{{closure}}"));
    }

    #[test]
    fn test_chain_too_long() {
        let ok = HandlerChain::new((0..MAX_HANDLERS).map(|_| handler_fn(logger))).unwrap();
        let err = ok.combine([handler_fn(logger)]).unwrap_err();
        assert_eq!(err, ConfigError::ChainTooLong { len: MAX_HANDLERS + 1, max: MAX_HANDLERS });
    }
}
