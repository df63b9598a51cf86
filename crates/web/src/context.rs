use std::any::Any;
use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use http::header::{CONTENT_TYPE, InvalidHeaderValue, LOCATION, X_CONTENT_TYPE_OPTIONS};
use http::{HeaderName, HeaderValue, Method, Request, StatusCode};
use mime::Mime;
use once_cell::sync::Lazy;
use once_cell::unsync::OnceCell;
use switchyard_http::protocol::WriteError;
use switchyard_http::writer::{MuxWriter, ResponseWriter};
use tracing::debug;

use crate::handler::{HandlerChain, MAX_HANDLERS};
use crate::params::Params;
use crate::route::Endpoint;
use crate::validator::{BoxError, Validator};

const INIT_INDEX: isize = -1;
#[allow(clippy::cast_possible_wrap, reason = "MAX_HANDLERS is tiny")]
const ABORT_INDEX: isize = MAX_HANDLERS as isize;

pub(crate) const TEXT_PLAIN_UTF_8: HeaderValue = HeaderValue::from_static("text/plain; charset=utf-8");
const TEXT_HTML_UTF_8: HeaderValue = HeaderValue::from_static("text/html; charset=utf-8");
pub(crate) const NOSNIFF: HeaderValue = HeaderValue::from_static("nosniff");

static IDLE_REQUEST: Lazy<Arc<Request<Bytes>>> = Lazy::new(|| Arc::new(Request::default()));

type Value = Arc<dyn Any + Send + Sync>;

/// Query string values of a request, in the order they appear.
#[derive(Debug, Clone, Default)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn parse(query: &str) -> Self {
        match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
            Ok(pairs) => Self(pairs),
            Err(e) => {
                debug!(cause = %e, query, "ignoring malformed query string");
                Self::default()
            }
        }
    }

    /// The first value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0.iter().filter(move |(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The state of one request as it runs through its handler chain.
///
/// Contexts are pooled by the [`Engine`](crate::Engine) and reset before every request, so
/// neither a `Context` nor anything borrowed from it may outlive the handler call. Use
/// [`copy`](Context::copy) to hand request data to another task.
pub struct Context {
    writer: MuxWriter,
    request: Arc<Request<Bytes>>,
    pub(crate) params: Params,
    query: OnceCell<Arc<QueryParams>>,
    validator: Option<Arc<dyn Validator>>,
    fetch_client_ip_from_header: bool,
    handlers: HandlerChain,
    full_path: Option<Arc<str>>,
    index: isize,
    keys: Option<Arc<DashMap<String, Value>>>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// An idle context with a detached writer and an empty request.
    pub fn new() -> Self {
        Self {
            writer: MuxWriter::detached(),
            request: Arc::clone(&IDLE_REQUEST),
            params: Params::new(),
            query: OnceCell::new(),
            validator: None,
            fetch_client_ip_from_header: false,
            handlers: HandlerChain::empty(),
            full_path: None,
            index: INIT_INDEX,
            keys: None,
        }
    }

    pub(crate) fn reset<W: ResponseWriter>(
        &mut self,
        writer: W,
        request: Request<Bytes>,
        validator: Option<Arc<dyn Validator>>,
        fetch_client_ip_from_header: bool,
    ) {
        self.writer.reset(writer);
        self.request = Arc::new(request);
        self.params.clear();
        self.query = OnceCell::new();
        self.validator = validator;
        self.fetch_client_ip_from_header = fetch_client_ip_from_header;
        self.handlers = HandlerChain::empty();
        self.full_path = None;
        self.index = INIT_INDEX;
        self.keys = None;
    }

    /// Drops everything the finished request owned, before the context goes back to the pool.
    pub(crate) fn release(&mut self) {
        self.writer.detach();
        self.request = Arc::clone(&IDLE_REQUEST);
        self.params.clear();
        self.query = OnceCell::new();
        self.validator = None;
        self.handlers = HandlerChain::empty();
        self.full_path = None;
        self.keys = None;
    }

    pub(crate) fn bind(&mut self, endpoint: &Endpoint) {
        self.handlers = endpoint.handlers.clone();
        self.full_path = Some(Arc::clone(&endpoint.full_path));
    }

    pub(crate) fn set_handlers(&mut self, handlers: HandlerChain) {
        self.handlers = handlers;
    }

    pub(crate) fn shared_request(&self) -> Arc<Request<Bytes>> {
        Arc::clone(&self.request)
    }

    pub(crate) fn take_writer<W: ResponseWriter>(&mut self) -> Option<W> {
        self.writer.take::<W>()
    }

    pub(crate) fn reserve_params(&mut self, capacity: usize) {
        self.params.reserve(capacity);
    }

    /// Returns a snapshot that can be moved to another task.
    ///
    /// Params are copied. The request, the validator and the key/value store are shared.
    /// The copy has no writer and cannot run handlers.
    #[must_use]
    pub fn copy(&self) -> Context {
        Context {
            writer: MuxWriter::detached(),
            request: Arc::clone(&self.request),
            params: self.params.clone(),
            query: self.query.clone(),
            validator: self.validator.clone(),
            fetch_client_ip_from_header: self.fetch_client_ip_from_header,
            handlers: HandlerChain::empty(),
            full_path: self.full_path.clone(),
            index: ABORT_INDEX,
            keys: self.keys.clone(),
        }
    }

    // ============================== flow control ===============================

    /// Runs the pending handlers of the chain.
    ///
    /// Meant to be called from middleware, which then continues after every later handler
    /// has returned. Each handler runs at most once per request, however often `next` is
    /// called.
    pub fn next(&mut self) {
        let handlers = self.handlers.clone();
        loop {
            self.index += 1;
            let Some(handler) = usize::try_from(self.index).ok().and_then(|i| handlers.get(i)) else {
                self.index -= 1;
                break;
            };
            handler.call(self);
        }
    }

    /// Prevents the pending handlers from running. The current handler is not interrupted.
    pub fn abort(&mut self) {
        self.index = ABORT_INDEX;
    }

    pub fn is_aborted(&self) -> bool {
        self.index >= ABORT_INDEX
    }

    /// Writes the status code and aborts.
    pub fn abort_with_status(&mut self, status: StatusCode) {
        self.writer.write_header(status);
        self.abort();
    }

    /// Writes `message` as a plain text response and aborts.
    pub fn abort_with_error(&mut self, status: StatusCode, message: &str) -> Result<(), WriteError> {
        self.abort();
        self.string(status, message)
    }

    /// Name of the last handler of the chain, the one the route was registered with.
    pub fn handler_name(&self) -> &'static str {
        self.handlers.last().map_or("", |h| h.name())
    }

    // ================================ key/value ================================

    /// Stores a value for the rest of this request. Copies of this context made afterwards
    /// see the same store.
    pub fn set<V>(&mut self, key: impl Into<String>, value: V)
    where
        V: Any + Send + Sync,
    {
        self.keys.get_or_insert_with(Arc::default).insert(key.into(), Arc::new(value));
    }

    /// The value stored under `key`, if there is one of type `V`.
    pub fn get<V>(&self, key: &str) -> Option<Arc<V>>
    where
        V: Any + Send + Sync,
    {
        let value = Arc::clone(self.keys.as_ref()?.get(key)?.value());
        value.downcast::<V>().ok()
    }

    /// Like [`get`](Context::get), for values the program relies on.
    ///
    /// # Panics
    ///
    /// Panics if nothing of type `V` is stored under `key`.
    pub fn must_get<V>(&self, key: &str) -> Arc<V>
    where
        V: Any + Send + Sync,
    {
        match self.get(key) {
            Some(value) => value,
            None => panic!("value with key \"{key}\" does not exist"),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.as_ref().is_some_and(|keys| keys.contains_key(key))
    }

    pub fn delete(&mut self, key: &str) {
        if let Some(keys) = &self.keys {
            keys.remove(key);
        }
    }

    // ================================= request =================================

    pub fn request(&self) -> &Request<Bytes> {
        &self.request
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn path(&self) -> &str {
        self.request.uri().path()
    }

    /// The registered path of the matched route, like `/users/:id`. Empty when no route
    /// matched.
    pub fn full_path(&self) -> &str {
        self.full_path.as_deref().unwrap_or_default()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The value of the first path param named `name`, or `""`.
    pub fn param(&self, name: &str) -> &str {
        self.params.by_name(name)
    }

    /// The value of the path param at `index`, or `""`.
    pub fn param_by_index(&self, index: usize) -> &str {
        self.params.by_index(index).map_or("", |p| p.value)
    }

    /// Query string values, parsed on first use.
    pub fn query_params(&self) -> &QueryParams {
        self.query.get_or_init(|| Arc::new(QueryParams::parse(self.request.uri().query().unwrap_or_default())))
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query_params().get(name)
    }

    pub fn default_query<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.query(name).unwrap_or(default)
    }

    pub fn content_type(&self) -> Option<Mime> {
        self.request.headers().get(CONTENT_TYPE)?.to_str().ok()?.parse().ok()
    }

    /// Address of the client. With header lookup enabled, `X-Real-Ip` and then the first
    /// entry of `X-Forwarded-For` win over the peer address of the connection.
    pub fn client_ip(&self) -> Option<IpAddr> {
        if self.fetch_client_ip_from_header {
            let headers = self.request.headers();
            let from_header = |name: &str, first_entry: bool| {
                let value = headers.get(name)?.to_str().ok()?;
                let value = if first_entry { value.split(',').next()? } else { value };
                value.trim().parse::<IpAddr>().ok()
            };
            if let Some(ip) = from_header("x-real-ip", false).or_else(|| from_header("x-forwarded-for", true)) {
                return Some(ip);
            }
        }
        self.request.extensions().get::<SocketAddr>().map(SocketAddr::ip)
    }

    pub fn set_validator(&mut self, validator: Option<Arc<dyn Validator>>) {
        self.validator = validator;
    }

    /// Runs the validator of this context over `value`. Passes when there is none.
    pub fn validate<V: Any>(&self, value: &V) -> Result<(), BoxError> {
        match &self.validator {
            Some(validator) => validator.validate(value),
            None => Ok(()),
        }
    }

    // ================================= response ================================

    pub fn writer(&mut self) -> &mut MuxWriter {
        &mut self.writer
    }

    /// Read-only view of the response: status, bytes written, headers.
    pub fn response(&self) -> &MuxWriter {
        &self.writer
    }

    /// Sets a response header; an empty value removes it.
    pub fn header(&mut self, name: HeaderName, value: &str) -> Result<(), InvalidHeaderValue> {
        let headers = self.writer.headers_mut();
        if value.is_empty() {
            headers.remove(name);
        } else {
            headers.insert(name, HeaderValue::from_str(value)?);
        }
        Ok(())
    }

    /// Writes the response status. Returns `false` if a status was already written.
    pub fn status(&mut self, status: StatusCode) -> bool {
        self.writer.write_header(status)
    }

    /// Writes `body` as `text/plain`.
    pub fn string(&mut self, status: StatusCode, body: &str) -> Result<(), WriteError> {
        let headers = self.writer.headers_mut();
        headers.insert(CONTENT_TYPE, TEXT_PLAIN_UTF_8);
        headers.insert(X_CONTENT_TYPE_OPTIONS, NOSNIFF);
        self.writer.write_header(status);
        self.writer.write_str(body)?;
        Ok(())
    }

    pub fn no_content(&mut self) {
        self.writer.write_header(StatusCode::NO_CONTENT);
    }

    /// Redirects to `location`. GET requests also get a short HTML body linking to it.
    pub fn redirect(&mut self, status: StatusCode, location: &str) -> Result<(), WriteError> {
        let value = HeaderValue::from_str(location)
            .map_err(|e| WriteError::io(io::Error::new(io::ErrorKind::InvalidInput, e)))?;
        self.writer.headers_mut().insert(LOCATION, value);

        if self.request.method() != Method::GET {
            self.writer.write_header(status);
            return Ok(());
        }

        self.writer.headers_mut().insert(CONTENT_TYPE, TEXT_HTML_UTF_8);
        self.writer.write_header(status);
        let body = format!(
            "<a href=\"{}\">{}</a>.\n\n",
            html_escape(location),
            status.canonical_reason().unwrap_or_default()
        );
        self.writer.write_str(&body)?;
        Ok(())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("method", self.request.method())
            .field("uri", self.request.uri())
            .field("full_path", &self.full_path())
            .field("params", &self.params)
            .field("handlers", &self.handlers)
            .field("index", &self.index)
            .field("writer", &self.writer)
            .finish_non_exhaustive()
    }
}

fn html_escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
