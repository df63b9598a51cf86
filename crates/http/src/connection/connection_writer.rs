//! A [`ResponseWriter`] over a blocking byte stream.
//!
//! The head is written lazily: the body is buffered until the first flush or until
//! [`finish`](ConnectionWriter::finish), so a response that is never flushed carries an exact
//! `Content-Length`. Once flushed, the body is delimited by closing the connection.

use std::io;
use std::io::{Read, Write};

use bytes::{BufMut, BytesMut};
use http::{HeaderMap, HeaderValue, StatusCode, header};
use tokio::sync::watch;
use tracing::{error, trace};

use crate::writer::{CloseNotifier, Connection, Flusher, Hijacker, ReaderFrom, ResponseWriter, StringWriter};

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 1024;

const CLOSE_VALUE: HeaderValue = HeaderValue::from_static("close");

#[derive(Debug)]
pub struct ConnectionWriter<S> {
    stream: Option<S>,
    headers: HeaderMap,
    status: Option<StatusCode>,
    body: BytesMut,
    head_sent: bool,
    closed: watch::Sender<bool>,
}

impl<S> ConnectionWriter<S>
where
    S: Read + Write + Send + 'static,
{
    pub fn new(stream: S) -> Self {
        let (closed, _) = watch::channel(false);
        Self { stream: Some(stream), headers: HeaderMap::new(), status: None, body: BytesMut::new(), head_sent: false, closed }
    }

    /// Sends whatever the response has not sent yet and closes the write side.
    ///
    /// A response nobody wrote to becomes an empty `200 OK`. A hijacked writer has nothing
    /// left to send.
    pub fn finish(mut self) -> io::Result<()> {
        let result = self.complete();
        self.closed.send_replace(true);
        result
    }

    fn complete(&mut self) -> io::Result<()> {
        if self.stream.is_none() {
            return Ok(());
        }
        if !self.head_sent {
            let content_length = self.body.len();
            self.send_head(Some(content_length))?;
        }
        self.send_body()
    }

    fn stream(&mut self) -> io::Result<&mut S> {
        self.stream.as_mut().ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "connection hijacked"))
    }

    fn send_head(&mut self, content_length: Option<usize>) -> io::Result<()> {
        let status = self.status.unwrap_or(StatusCode::OK);

        let mut dst = BytesMut::with_capacity(INIT_HEADER_SIZE);
        write!(FastWrite(&mut dst), "HTTP/1.1 {} {}\r\n", status.as_str(), status.canonical_reason().unwrap_or(""))?;

        match content_length {
            Some(n) => {
                self.headers.insert(header::CONTENT_LENGTH, n.into());
            }
            None => {
                self.headers.remove(header::CONTENT_LENGTH);
            }
        }
        self.headers.insert(header::CONNECTION, CLOSE_VALUE);

        for (header_name, header_value) in &self.headers {
            dst.put_slice(header_name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(header_value.as_ref());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");

        trace!(status = %status, head_size = dst.len(), "sending response head");
        self.stream()?.write_all(&dst)?;
        self.head_sent = true;
        Ok(())
    }

    fn send_body(&mut self) -> io::Result<()> {
        if !self.body.is_empty() {
            let body = self.body.split();
            self.stream()?.write_all(&body)?;
        }
        self.stream()?.flush()
    }

    fn send_pending(&mut self) -> io::Result<()> {
        if !self.head_sent {
            self.send_head(None)?;
        }
        self.send_body()
    }
}

impl<S> ResponseWriter for ConnectionWriter<S>
where
    S: Read + Write + Send + 'static,
{
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_header(&mut self, status: StatusCode) {
        if self.head_sent || self.status.is_some() {
            error!(status = %status, "response head already written");
            return;
        }
        self.status = Some(status);
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.stream()?;
        self.body.extend_from_slice(data);
        Ok(data.len())
    }

    fn as_reader_from(&mut self) -> Option<&mut dyn ReaderFrom> {
        Some(self)
    }

    fn as_string_writer(&mut self) -> Option<&mut dyn StringWriter> {
        Some(self)
    }

    fn as_flusher(&mut self) -> Option<&mut dyn Flusher> {
        Some(self)
    }

    fn as_hijacker(&mut self) -> Option<&mut dyn Hijacker> {
        Some(self)
    }

    fn as_close_notifier(&mut self) -> Option<&mut dyn CloseNotifier> {
        Some(self)
    }
}

impl<S> ReaderFrom for ConnectionWriter<S>
where
    S: Read + Write + Send + 'static,
{
    fn read_from(&mut self, reader: &mut dyn Read) -> io::Result<u64> {
        self.send_pending()?;
        io::copy(reader, self.stream()?)
    }
}

impl<S> StringWriter for ConnectionWriter<S>
where
    S: Read + Write + Send + 'static,
{
    fn write_str(&mut self, s: &str) -> io::Result<usize> {
        ResponseWriter::write(self, s.as_bytes())
    }
}

impl<S> Flusher for ConnectionWriter<S>
where
    S: Read + Write + Send + 'static,
{
    fn flush(&mut self) -> io::Result<()> {
        self.send_pending()
    }
}

impl<S> Hijacker for ConnectionWriter<S>
where
    S: Read + Write + Send + 'static,
{
    fn hijack(&mut self) -> io::Result<Box<dyn Connection>> {
        if self.head_sent || !self.body.is_empty() {
            self.send_pending()?;
        }
        let stream = self.stream.take().ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "connection hijacked"))?;
        Ok(Box::new(stream))
    }
}

impl<S> CloseNotifier for ConnectionWriter<S>
where
    S: Read + Write + Send + 'static,
{
    fn close_notify(&mut self) -> watch::Receiver<bool> {
        self.closed.subscribe()
    }
}

/// Fast writer implementation for writing to BytesMut.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use std::io::Cursor;

    fn written(writer: ConnectionWriter<Cursor<Vec<u8>>>) -> String {
        let mut writer = writer;
        let stream = writer.stream.take().unwrap();
        String::from_utf8(stream.into_inner()).unwrap()
    }

    #[test]
    fn empty_response_is_ok() {
        let mut writer = ConnectionWriter::new(Cursor::new(Vec::new()));
        writer.send_head(Some(0)).unwrap();

        let expected = indoc! {"
        HTTP/1.1 200 OK
        content-length: 0
        connection: close

        "};
        assert_eq!(written(writer), expected.replace('\n', "\r\n"));
    }

    #[test]
    fn buffered_body_has_content_length() {
        let mut writer = ConnectionWriter::new(Cursor::new(Vec::new()));
        writer.headers_mut().insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        writer.write_header(StatusCode::NOT_FOUND);
        ResponseWriter::write(&mut writer, b"404 page not found").unwrap();
        writer.complete().unwrap();

        let expected = indoc! {"
        HTTP/1.1 404 Not Found
        content-type: text/plain
        content-length: 18
        connection: close

        404 page not found"};
        assert_eq!(written(writer), expected.replace('\n', "\r\n"));
    }

    #[test]
    fn flush_sends_head_without_length() {
        let mut writer = ConnectionWriter::new(Cursor::new(Vec::new()));
        writer.write_str("data: 1\n\n").unwrap();
        Flusher::flush(&mut writer).unwrap();
        writer.write_str("data: 2\n\n").unwrap();
        Flusher::flush(&mut writer).unwrap();

        let out = written(writer);
        assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(!out.contains("content-length"));
        assert!(out.ends_with("\r\n\r\ndata: 1\n\ndata: 2\n\n"));
    }

    #[test]
    fn hijack_takes_the_stream() {
        let mut writer = ConnectionWriter::new(Cursor::new(Vec::new()));
        let mut connection = writer.hijack().unwrap();
        connection.write_all(b"raw").unwrap();

        assert!(ResponseWriter::write(&mut writer, b"late").is_err());
        assert!(writer.hijack().is_err());
        assert!(writer.finish().is_ok());
    }

    #[test]
    fn close_notify_fires_on_finish() {
        let mut writer = ConnectionWriter::new(Cursor::new(Vec::new()));
        let receiver = writer.close_notify();
        assert!(!*receiver.borrow());

        writer.finish().unwrap();
        assert!(*receiver.borrow());
    }
}
