//! HTTP/1.x request decoder.
//!
//! [`RequestDecoder`] is a [`tokio_util::codec::Decoder`]: it parses one request head with
//! `httparse`, then waits for the `Content-Length` delimited body, and yields both as an
//! `http::Request<Bytes>`.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum header size: 8KB
//! - Maximum body size: 4MB
//! - Chunked request bodies are rejected

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Uri, Version, header};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::ParseError;

/// Maximum number of headers allowed in a request
pub const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire header section
pub const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Maximum size in bytes of a request body
pub const MAX_BODY_BYTES: u64 = 4 * 1024 * 1024;

/// Decodes complete requests, head and body.
///
/// The decoder is a small state machine: `pending` is `None` while the head is being
/// parsed, and holds the parsed head plus the expected body size while the body arrives.
#[derive(Debug, Default)]
pub struct RequestDecoder {
    pending: Option<(Request<()>, usize)>,
}

impl RequestDecoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for RequestDecoder {
    type Item = Request<Bytes>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let (head, body_size) = match self.pending.take() {
            Some(pending) => pending,
            None => match decode_head(src)? {
                Some((head, body_size)) => {
                    ensure!(
                        body_size <= MAX_BODY_BYTES,
                        ParseError::invalid_body(format!("body size {body_size} exceed the limit {MAX_BODY_BYTES}"))
                    );
                    #[allow(clippy::cast_possible_truncation, reason = "bounded by MAX_BODY_BYTES above")]
                    let body_size = body_size as usize;
                    src.reserve(body_size.saturating_sub(src.len()));
                    (head, body_size)
                }
                None => return Ok(None),
            },
        };

        if src.len() < body_size {
            self.pending = Some((head, body_size));
            return Ok(None);
        }

        let body = src.split_to(body_size).freeze();
        let (parts, ()) = head.into_parts();
        Ok(Some(Request::from_parts(parts, body)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(request) = self.decode(src)? {
            return Ok(Some(request));
        }
        if self.pending.is_some() {
            return Err(ParseError::invalid_body("connection closed in the middle of the body"));
        }
        if src.is_empty() { Ok(None) } else { Err(ParseError::UnexpectedEof) }
    }
}

/// Parses a request head from the front of `src`, consuming it on success.
///
/// Returns `Ok(None)` if more bytes are needed.
fn decode_head(src: &mut BytesMut) -> Result<Option<(Request<()>, u64)>, ParseError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
    let mut req = httparse::Request::new(&mut headers);

    let status = req.parse(src).map_err(|e| match e {
        Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
        e => ParseError::invalid_header(e.to_string()),
    })?;

    let body_offset = match status {
        Status::Complete(body_offset) => body_offset,
        Status::Partial => {
            ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
            return Ok(None);
        }
    };
    trace!(head_size = body_offset, "parsed request head");
    ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));

    let version = match req.version {
        Some(0) => Version::HTTP_10,
        Some(1) => Version::HTTP_11,
        v => return Err(ParseError::InvalidVersion(v)),
    };
    let method = Method::from_bytes(req.method.ok_or(ParseError::InvalidMethod)?.as_bytes())
        .map_err(|_| ParseError::InvalidMethod)?;
    let uri = req.path.ok_or(ParseError::InvalidUri)?.parse::<Uri>().map_err(|_| ParseError::InvalidUri)?;

    let mut header_map = HeaderMap::with_capacity(req.headers.len());
    for h in req.headers.iter() {
        let name = HeaderName::from_bytes(h.name.as_bytes()).map_err(ParseError::invalid_header)?;
        let value = HeaderValue::from_bytes(h.value).map_err(ParseError::invalid_header)?;
        header_map.append(name, value);
    }

    let body_size = parse_body_size(&header_map)?;

    let mut request = Request::new(());
    *request.method_mut() = method;
    *request.uri_mut() = uri;
    *request.version_mut() = version;
    *request.headers_mut() = header_map;

    let _ = src.split_to(body_offset);
    Ok(Some((request, body_size)))
}

// refer: https://www.rfc-editor.org/rfc/rfc9112.html#name-transfer-encoding
fn parse_body_size(headers: &HeaderMap) -> Result<u64, ParseError> {
    match (headers.get(header::TRANSFER_ENCODING), headers.get(header::CONTENT_LENGTH)) {
        (None, None) => Ok(0),
        (Some(_), None) => Err(ParseError::invalid_body("transfer-encoding request bodies are not supported")),
        (None, Some(cl_value)) => {
            let cl_str = cl_value.to_str().map_err(|_| ParseError::invalid_content_length("value can't to_str"))?;
            cl_str
                .trim()
                .parse::<u64>()
                .map_err(|_| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))
        }
        (Some(_), Some(_)) => {
            Err(ParseError::invalid_content_length("transfer_encoding and content_length both present in headers"))
        }
    }
}
