use std::io;
use thiserror::Error;

/// Structural errors raised while inserting a route into a [`Node`](crate::tree::Node).
///
/// A failed insert leaves the tree exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InsertError {
    #[error("path must begin with '/' in path '{path}'")]
    MissingLeadingSlash { path: String },

    #[error("handlers are already registered for path '{path}'")]
    Conflict { path: String },

    #[error("'{segment}' in new path '{path}' conflicts with existing wildcard '{existing}'")]
    WildcardConflict { path: String, segment: String, existing: String },

    #[error("wildcards must be named with a non-empty name in path '{path}'")]
    UnnamedWildcard { path: String },

    #[error("only one wildcard per path segment is allowed, has: '{segment}' in path '{path}'")]
    TooManyWildcards { path: String, segment: String },

    #[error("catch-all routes are only allowed at the end of the path in path '{path}'")]
    CatchAllNotLast { path: String },

    #[error("no / before catch-all in path '{path}'")]
    NoSlashBeforeCatchAll { path: String },

    #[error("path '{path}' has {count} params, exceed the limit {max}")]
    TooManyParams { path: String, count: usize, max: usize },
}

/// A misuse of the registration API.
///
/// Every registration call reports these synchronously; nothing is deferred to the time a
/// request is served.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error(transparent)]
    Insert(#[from] InsertError),

    #[error("http method must be non-empty upper case ascii, got '{method}'")]
    InvalidMethod { method: String },

    #[error("there must be at least one handler for path '{path}'")]
    EmptyChain { path: String },

    #[error("too many handlers: {len} exceed the limit {max}")]
    ChainTooLong { len: usize, max: usize },

    #[error("group prefix '{prefix}' must not contain path params")]
    ParamInGroupPrefix { prefix: String },

    #[error("{operation} is not allowed once the engine started serving requests")]
    AlreadyStarted { operation: &'static str },
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("engine must be set")]
    MissingEngine,

    #[error("address must be set")]
    MissingAddress,

    #[error("invalid address: {source}")]
    InvalidAddress { source: io::Error },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}
