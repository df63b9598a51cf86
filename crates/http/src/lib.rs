//! Transport side of switchyard: response writers and their optional capabilities.
//!
//! The dispatch core never talks to a socket directly. It receives a value implementing
//! [`writer::ResponseWriter`] and wraps it in a [`writer::MuxWriter`], which exposes exactly
//! the optional capabilities (read-from, raw string write, flush, hijack, close notify) that
//! the concrete writer type supports. Capabilities are probed once per writer type and cached
//! for the lifetime of the process.
//!
//! # Architecture
//!
//! - [`writer`]: the writer traits, the capability bitmask and the multiplexing wrapper
//! - [`connection`]: an async HTTP/1.x request reader and a [`writer::ResponseWriter`] over a
//!   stream
//! - [`protocol`]: error types
//!
//! # Example
//!
//! ```
//! use http::StatusCode;
//! use switchyard_http::writer::{Capability, MuxWriter, Recorder};
//!
//! let mut writer = MuxWriter::detached();
//! writer.reset(Recorder::new());
//! assert!(writer.capabilities().contains(Capability::Flush));
//!
//! writer.write(b"hello").unwrap();
//! assert_eq!(writer.status(), StatusCode::OK);
//!
//! let recorder = writer.take::<Recorder>().unwrap();
//! assert_eq!(recorder.body(), b"hello");
//! ```
//!
//! # Limitations
//!
//! - HTTP/1.x only, one request per connection
//! - No TLS support (use a reverse proxy for HTTPS)
//! - Maximum header size: 8KB
//! - Maximum number of headers: 64

pub mod connection;
pub mod protocol;
pub mod writer;

mod utils;
pub(crate) use utils::ensure;
