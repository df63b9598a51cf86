//! HTTP/1.x connection plumbing.
//!
//! - [`RequestDecoder`]: a `tokio_util` codec turning bytes into complete requests
//! - [`RequestReader`]: drives the decoder over an async stream with `FramedRead`
//! - [`ConnectionWriter`]: a [`ResponseWriter`](crate::writer::ResponseWriter) writing the
//!   response back to a blocking stream, supporting every optional capability
//!
//! Requests are read asynchronously; the response is written from the synchronous handler
//! chain. Connections serve a single request and are closed afterwards.

mod connection_writer;
mod request_decoder;
mod request_reader;

pub use connection_writer::ConnectionWriter;
pub use request_decoder::MAX_BODY_BYTES;
pub use request_decoder::MAX_HEADER_BYTES;
pub use request_decoder::MAX_HEADER_NUM;
pub use request_decoder::RequestDecoder;
pub use request_reader::RequestReader;
