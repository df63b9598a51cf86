//! Request dispatch for switchyard: a radix tree router per HTTP method, handler chains with
//! `next`/`abort` control flow and a pooled request [`Context`].
//!
//! # Architecture
//!
//! - [`tree`]: the radix tree matching paths with `:param` and `*catch_all` segments
//! - [`Engine`]: route registration, redirects for near misses, 404/405 handling
//! - [`RouteGroup`]: shared path prefixes and middleware
//! - [`Context`]: params, query, key/value store and the response writer of one request
//! - [`Server`]: a TCP front end feeding connections to an engine
//!
//! # Example
//!
//! ```no_run
//! use http::StatusCode;
//! use switchyard_web::{Engine, Server, handler_fn};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut engine = Engine::new();
//!     engine
//!         .get("/hello/:name", [handler_fn(|ctx| {
//!             let body = format!("hello {}", ctx.param("name"));
//!             ctx.string(StatusCode::OK, &body).unwrap();
//!         })])
//!         .unwrap();
//!
//!     Server::builder().engine(engine).address("127.0.0.1:3000").build().unwrap().start().await.unwrap();
//! }
//! ```

mod config;
mod context;
mod engine;
mod error;
mod group;
mod handler;
mod params;
mod path;
mod pool;
mod route;
mod server;
mod started;
mod validator;

pub mod tree;

pub use config::EngineConfig;
pub use context::Context;
pub use context::QueryParams;
pub use engine::Engine;
pub use error::ConfigError;
pub use error::InsertError;
pub use error::ServerError;
pub use group::ANY_METHODS;
pub use group::RouteGroup;
pub use handler::Handler;
pub use handler::HandlerChain;
pub use handler::MAX_HANDLERS;
pub use handler::handler_fn;
pub use params::Param;
pub use params::Params;
pub use path::clean_path;
pub use route::Route;
pub use server::Server;
pub use server::ServerBuilder;
pub use server::serve_connection;
pub use validator::BoxError;
pub use validator::Validator;
