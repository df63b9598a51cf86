//! Transport level response writers and their optional capabilities.
//!
//! A transport hands the dispatch core a value implementing [`ResponseWriter`]. Beyond the
//! mandatory header/status/body operations a writer may expose up to five optional
//! capabilities, each through an `as_*` accessor returning `Some` when supported:
//!
//! | capability        | trait              | accessor                |
//! |-------------------|--------------------|-------------------------|
//! | read from reader  | [`ReaderFrom`]     | `as_reader_from`        |
//! | raw string write  | [`StringWriter`]   | `as_string_writer`      |
//! | partial flush     | [`Flusher`]        | `as_flusher`            |
//! | hijack            | [`Hijacker`]       | `as_hijacker`           |
//! | close notify      | [`CloseNotifier`]  | `as_close_notifier`     |
//!
//! The accessors must answer the same way for every instance of a type: the answer is
//! probed once per concrete type and cached process wide, see [`Capabilities::of`].
//!
//! [`MuxWriter`] wraps whatever writer the transport supplied and exposes exactly the
//! capability set that writer supports, plus status/size bookkeeping.

mod capability;
mod mux_writer;
mod recorder;

pub use capability::Capabilities;
pub use capability::Capability;
pub use mux_writer::MuxWriter;
pub use recorder::Recorder;

use http::{HeaderMap, StatusCode};
use std::any::Any;
use std::io;
use std::io::{Read, Write};
use tokio::sync::watch;

/// The response side of a single request, as supplied by the transport.
pub trait ResponseWriter: Any + Send {
    /// Headers that will be sent by [`write_header`](ResponseWriter::write_header).
    fn headers(&self) -> &HeaderMap;

    /// Mutable access to the headers, changes after the header was written have no effect.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Sends the response head with the given status code.
    fn write_header(&mut self, status: StatusCode);

    /// Writes body bytes, the transport decides how they reach the peer.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    fn as_reader_from(&mut self) -> Option<&mut dyn ReaderFrom> {
        None
    }

    fn as_string_writer(&mut self) -> Option<&mut dyn StringWriter> {
        None
    }

    fn as_flusher(&mut self) -> Option<&mut dyn Flusher> {
        None
    }

    fn as_hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        None
    }

    fn as_close_notifier(&mut self) -> Option<&mut dyn CloseNotifier> {
        None
    }
}

/// Copies a reader straight into the transport, bypassing intermediate buffers.
pub trait ReaderFrom {
    fn read_from(&mut self, reader: &mut dyn Read) -> io::Result<u64>;
}

/// Writes a string without converting it to a byte buffer first.
pub trait StringWriter {
    fn write_str(&mut self, s: &str) -> io::Result<usize>;
}

/// Sends any buffered data to the peer.
pub trait Flusher {
    fn flush(&mut self) -> io::Result<()>;
}

/// Takes over the underlying connection. After a successful hijack the transport no
/// longer owns the byte stream and every buffered write must fail.
pub trait Hijacker {
    fn hijack(&mut self) -> io::Result<Box<dyn Connection>>;
}

/// Reports when the peer goes away; the receiver flips to `true` once the connection closed.
pub trait CloseNotifier {
    fn close_notify(&mut self) -> watch::Receiver<bool>;
}

/// A raw bidirectional byte stream handed out by [`Hijacker::hijack`].
pub trait Connection: Read + Write + Send {}

impl<T: Read + Write + Send> Connection for T {}
