use bytes::Bytes;
use futures::StreamExt;
use http::Request;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;
use tracing::trace;

use super::request_decoder::RequestDecoder;
use crate::protocol::ParseError;

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Reads requests from an async byte stream with a [`RequestDecoder`].
#[derive(Debug)]
pub struct RequestReader<R> {
    framed_read: FramedRead<R, RequestDecoder>,
}

impl<R: AsyncRead + Unpin> RequestReader<R> {
    pub fn new(reader: R) -> Self {
        Self { framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(), READ_BUFFER_SIZE) }
    }

    /// Reads the next request.
    ///
    /// Returns `Ok(None)` when the peer closed the stream before sending anything.
    pub async fn read_request(&mut self) -> Result<Option<Request<Bytes>>, ParseError> {
        let request = self.framed_read.next().await.transpose()?;
        if let Some(request) = &request {
            trace!(method = %request.method(), uri = %request.uri(), body_size = request.body().len(), "read request");
        }
        Ok(request)
    }

    /// Gives the stream back. Bytes read past the last request are dropped.
    pub fn into_inner(self) -> R {
        self.framed_read.into_inner()
    }
}
