use std::io;

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, Response, StatusCode};

use crate::writer::{Flusher, ResponseWriter};

/// An in-memory [`ResponseWriter`] that records everything written to it.
///
/// Useful to drive the dispatch core without a network transport, mostly in tests and
/// benchmarks. It supports the flush capability and nothing else.
#[derive(Debug, Default)]
pub struct Recorder {
    headers: HeaderMap,
    status: Option<StatusCode>,
    body: BytesMut,
    flushed: usize,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The status passed to the first `write_header`, `None` if nothing was written.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap_or_default()
    }

    pub fn flushed(&self) -> usize {
        self.flushed
    }

    pub fn into_response(self) -> Response<Bytes> {
        let mut response = Response::new(self.body.freeze());
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseWriter for Recorder {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_header(&mut self, status: StatusCode) {
        self.status.get_or_insert(status);
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.body.extend_from_slice(data);
        Ok(data.len())
    }

    fn as_flusher(&mut self) -> Option<&mut dyn Flusher> {
        Some(self)
    }
}

impl Flusher for Recorder {
    fn flush(&mut self) -> io::Result<()> {
        self.flushed += 1;
        Ok(())
    }
}
