use std::any::Any;
use std::fmt;
use std::io;
use std::io::Read;

use http::{HeaderMap, StatusCode};
use tokio::sync::watch;
use tracing::warn;

use crate::protocol::WriteError;
use crate::writer::{Capabilities, Capability, Connection, ResponseWriter};

/// Wraps the transport writer of the current request.
///
/// Optional operations are guarded by the [`Capabilities`] of the wrapped writer type, so a
/// writer that only flushes is exposed as exactly that: [`hijack`](MuxWriter::hijack) and
/// friends report [`WriteError::Unsupported`] instead of reaching the transport.
///
/// A `MuxWriter` without a bound transport writer is *detached*: headers are kept in a
/// scratch map and every body write fails with [`WriteError::Detached`].
pub struct MuxWriter {
    inner: Option<Box<dyn ResponseWriter>>,
    capabilities: Capabilities,
    status: StatusCode,
    written: u64,
    wrote_header: bool,
    hijacked: bool,
    scratch_headers: HeaderMap,
}

impl MuxWriter {
    pub fn detached() -> Self {
        Self {
            inner: None,
            capabilities: Capabilities::NONE,
            status: StatusCode::OK,
            written: 0,
            wrote_header: false,
            hijacked: false,
            scratch_headers: HeaderMap::new(),
        }
    }

    /// Binds `writer` and clears the bookkeeping of the previous request.
    pub fn reset<W: ResponseWriter>(&mut self, mut writer: W) {
        self.capabilities = Capabilities::of(&mut writer);
        self.inner = Some(Box::new(writer));
        self.clear();
    }

    /// Drops the bound writer, if any, and clears the bookkeeping.
    pub fn detach(&mut self) {
        self.inner = None;
        self.capabilities = Capabilities::NONE;
        self.clear();
    }

    /// Hands the bound writer back to the caller if it is a `W`.
    ///
    /// Returns `None` and leaves the writer bound when it is of another type.
    pub fn take<W: ResponseWriter>(&mut self) -> Option<W> {
        let matches = self.inner.as_deref().is_some_and(|writer| (writer as &dyn Any).is::<W>());
        if !matches {
            return None;
        }

        let writer: Box<dyn Any> = self.inner.take()?;
        self.capabilities = Capabilities::NONE;
        writer.downcast::<W>().ok().map(|writer| *writer)
    }

    fn clear(&mut self) {
        self.status = StatusCode::OK;
        self.written = 0;
        self.wrote_header = false;
        self.hijacked = false;
        self.scratch_headers.clear();
    }

    #[inline]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Body bytes accepted by the transport so far.
    #[inline]
    pub fn written(&self) -> u64 {
        self.written
    }

    #[inline]
    pub fn wrote_header(&self) -> bool {
        self.wrote_header
    }

    #[inline]
    pub fn is_hijacked(&self) -> bool {
        self.hijacked
    }

    #[inline]
    pub fn is_detached(&self) -> bool {
        self.inner.is_none()
    }

    pub fn headers(&self) -> &HeaderMap {
        match self.inner.as_deref() {
            Some(writer) => writer.headers(),
            None => &self.scratch_headers,
        }
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        match self.inner.as_deref_mut() {
            Some(writer) => writer.headers_mut(),
            None => &mut self.scratch_headers,
        }
    }

    /// Writes the response head. Only the first call has an effect; later calls are logged
    /// and reported by returning `false`.
    pub fn write_header(&mut self, status: StatusCode) -> bool {
        if self.hijacked {
            warn!(status = %status, "response header ignored, the connection was hijacked");
            return false;
        }
        if self.wrote_header {
            warn!(current = %self.status, ignored = %status, "response header already written");
            return false;
        }

        self.status = status;
        self.wrote_header = true;
        if let Some(writer) = self.inner.as_deref_mut() {
            writer.write_header(status);
        }
        true
    }

    /// Writes body bytes, writing a `200 OK` head first if no header was written yet.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        self.writable()?;
        self.ensure_header();

        let size = self.writable()?.write(data)?;
        self.written += size as u64;
        Ok(size)
    }

    pub fn write_str(&mut self, s: &str) -> Result<usize, WriteError> {
        if !self.capabilities.contains(Capability::StringWriter) {
            return self.write(s.as_bytes());
        }

        self.writable()?;
        self.ensure_header();
        let writer = self.writable()?.as_string_writer().ok_or(WriteError::Unsupported(Capability::StringWriter))?;
        let size = writer.write_str(s)?;
        self.written += size as u64;
        Ok(size)
    }

    /// Copies `reader` to the response, through the transport when it can read directly.
    pub fn read_from(&mut self, reader: &mut dyn Read) -> Result<u64, WriteError> {
        if !self.capabilities.contains(Capability::ReadFrom) {
            self.writable()?;
            return io::copy(reader, self).map_err(WriteError::io);
        }

        self.writable()?;
        self.ensure_header();
        let writer = self.writable()?.as_reader_from().ok_or(WriteError::Unsupported(Capability::ReadFrom))?;
        let size = writer.read_from(reader)?;
        self.written += size;
        Ok(size)
    }

    pub fn flush(&mut self) -> Result<(), WriteError> {
        self.require(Capability::Flush)?;
        self.writable()?;
        self.ensure_header();

        let flusher = self.writable()?.as_flusher().ok_or(WriteError::Unsupported(Capability::Flush))?;
        flusher.flush()?;
        Ok(())
    }

    /// Hands the raw connection to the caller. Every later write through this writer fails
    /// with [`WriteError::Hijacked`].
    pub fn hijack(&mut self) -> Result<Box<dyn Connection>, WriteError> {
        self.require(Capability::Hijack)?;

        let hijacker = self.writable()?.as_hijacker().ok_or(WriteError::Unsupported(Capability::Hijack))?;
        let connection = hijacker.hijack()?;
        self.hijacked = true;
        self.wrote_header = true;
        Ok(connection)
    }

    pub fn close_notify(&mut self) -> Result<watch::Receiver<bool>, WriteError> {
        self.require(Capability::CloseNotify)?;

        let notifier =
            self.writable()?.as_close_notifier().ok_or(WriteError::Unsupported(Capability::CloseNotify))?;
        Ok(notifier.close_notify())
    }

    fn require(&self, capability: Capability) -> Result<(), WriteError> {
        if self.capabilities.contains(capability) {
            Ok(())
        } else if self.inner.is_none() {
            Err(WriteError::Detached)
        } else {
            Err(WriteError::Unsupported(capability))
        }
    }

    fn writable(&mut self) -> Result<&mut (dyn ResponseWriter + 'static), WriteError> {
        if self.hijacked {
            return Err(WriteError::Hijacked);
        }
        self.inner.as_deref_mut().ok_or(WriteError::Detached)
    }

    fn ensure_header(&mut self) {
        if !self.wrote_header {
            self.write_header(StatusCode::OK);
        }
    }
}

impl Default for MuxWriter {
    fn default() -> Self {
        Self::detached()
    }
}

impl io::Write for MuxWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        MuxWriter::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.capabilities.contains(Capability::Flush) {
            MuxWriter::flush(self).map_err(io::Error::from)
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for MuxWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MuxWriter")
            .field("detached", &self.inner.is_none())
            .field("capabilities", &self.capabilities)
            .field("status", &self.status)
            .field("written", &self.written)
            .field("wrote_header", &self.wrote_header)
            .field("hijacked", &self.hijacked)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::MuxWriter;
    use crate::protocol::WriteError;
    use crate::writer::{Capabilities, Capability, Connection, Hijacker, Recorder, ResponseWriter};
    use http::{HeaderMap, HeaderValue, StatusCode};
    use std::io;
    use std::io::{Cursor, Read, Write};

    #[derive(Default)]
    struct HijackWriter {
        headers: HeaderMap,
        status: Option<StatusCode>,
        body: Vec<u8>,
    }

    impl ResponseWriter for HijackWriter {
        fn headers(&self) -> &HeaderMap {
            &self.headers
        }

        fn headers_mut(&mut self) -> &mut HeaderMap {
            &mut self.headers
        }

        fn write_header(&mut self, status: StatusCode) {
            self.status = Some(status);
        }

        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.body.extend_from_slice(data);
            Ok(data.len())
        }

        fn as_hijacker(&mut self) -> Option<&mut dyn Hijacker> {
            Some(self)
        }
    }

    impl Hijacker for HijackWriter {
        fn hijack(&mut self) -> io::Result<Box<dyn Connection>> {
            Ok(Box::new(Cursor::new(b"raw bytes".to_vec())))
        }
    }

    #[test]
    fn test_flush_only_writer() {
        let mut writer = MuxWriter::detached();
        writer.reset(Recorder::new());

        assert_eq!(writer.capabilities(), Capabilities::NONE.with(Capability::Flush));
        assert!(writer.flush().is_ok());
        assert!(matches!(writer.hijack(), Err(WriteError::Unsupported(Capability::Hijack))));
        assert!(matches!(writer.close_notify(), Err(WriteError::Unsupported(Capability::CloseNotify))));

        let recorder = writer.take::<Recorder>().unwrap();
        assert_eq!(recorder.flushed(), 1);
    }

    #[test]
    fn test_write_implies_ok() {
        let mut writer = MuxWriter::detached();
        writer.reset(Recorder::new());

        assert!(!writer.wrote_header());
        assert_eq!(writer.write(b"hello").unwrap(), 5);
        assert!(writer.wrote_header());
        assert_eq!(writer.status(), StatusCode::OK);
        assert_eq!(writer.written(), 5);

        let recorder = writer.take::<Recorder>().unwrap();
        assert_eq!(recorder.status(), Some(StatusCode::OK));
        assert_eq!(recorder.body(), b"hello");
    }

    #[test]
    fn test_second_header_is_reported() {
        let mut writer = MuxWriter::detached();
        writer.reset(Recorder::new());

        assert!(writer.write_header(StatusCode::CREATED));
        assert!(!writer.write_header(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(writer.status(), StatusCode::CREATED);

        // the request goes on after the rejected header
        writer.write(b"ok").unwrap();
        let recorder = writer.take::<Recorder>().unwrap();
        assert_eq!(recorder.status(), Some(StatusCode::CREATED));
        assert_eq!(recorder.body(), b"ok");
    }

    #[test]
    fn test_write_after_hijack_fails() {
        let mut writer = MuxWriter::detached();
        writer.reset(HijackWriter::default());
        assert_eq!(writer.capabilities(), Capabilities::NONE.with(Capability::Hijack));

        let mut connection = writer.hijack().unwrap();
        let mut raw = String::new();
        connection.read_to_string(&mut raw).unwrap();
        assert_eq!(raw, "raw bytes");

        assert!(writer.is_hijacked());
        assert!(matches!(writer.write(b"late"), Err(WriteError::Hijacked)));
        assert!(matches!(writer.write_str("late"), Err(WriteError::Hijacked)));
        assert!(matches!(writer.hijack(), Err(WriteError::Hijacked)));
        assert!(!writer.write_header(StatusCode::OK));

        let inner = writer.take::<HijackWriter>().unwrap();
        assert!(inner.body.is_empty());
        assert_eq!(inner.status, None);
    }

    #[test]
    fn test_detached_writer() {
        let mut writer = MuxWriter::detached();
        writer.headers_mut().insert("x-trace", HeaderValue::from_static("1"));

        assert!(writer.is_detached());
        assert_eq!(writer.headers().get("x-trace").unwrap(), "1");
        assert!(matches!(writer.write(b"data"), Err(WriteError::Detached)));
        assert!(matches!(writer.flush(), Err(WriteError::Detached)));
        assert_eq!(writer.written(), 0);
    }

    #[test]
    fn test_take_other_type_keeps_writer() {
        let mut writer = MuxWriter::detached();
        writer.reset(Recorder::new());

        assert!(writer.take::<HijackWriter>().is_none());
        assert!(!writer.is_detached());
        assert!(writer.take::<Recorder>().is_some());
        assert!(writer.is_detached());
    }

    #[test]
    fn test_reset_clears_bookkeeping() {
        let mut writer = MuxWriter::detached();
        writer.reset(Recorder::new());
        writer.write_header(StatusCode::NOT_FOUND);
        writer.write(b"gone").unwrap();

        writer.reset(Recorder::new());
        assert_eq!(writer.status(), StatusCode::OK);
        assert_eq!(writer.written(), 0);
        assert!(!writer.wrote_header());
    }

    #[test]
    fn test_fallbacks_without_capability() {
        let mut writer = MuxWriter::detached();
        writer.reset(Recorder::new());

        assert_eq!(writer.write_str("abc").unwrap(), 3);
        assert_eq!(writer.read_from(&mut Cursor::new(b"defg".to_vec())).unwrap(), 4);
        write!(writer, "{}", 42).unwrap();
        assert_eq!(writer.written(), 9);

        let recorder = writer.take::<Recorder>().unwrap();
        assert_eq!(recorder.body(), b"abcdefg42");
    }
}
