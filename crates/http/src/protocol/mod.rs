//! Protocol level error types shared by the transport and the response writers.
//!
//! - [`ParseError`]: failures while reading a request head from a connection
//! - [`WriteError`]: failures while writing a response through a [`MuxWriter`](crate::writer::MuxWriter)

mod error;
pub use error::ParseError;
pub use error::WriteError;
