use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use switchyard_http::connection::{ConnectionWriter, RequestReader};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use crate::engine::Engine;
use crate::error::ServerError;

const BAD_REQUEST: &[u8] =
    b"HTTP/1.1 400 Bad Request\r\ncontent-type: text/plain; charset=utf-8\r\ncontent-length: 15\r\nconnection: close\r\n\r\n400 bad request";

#[derive(Debug)]
pub struct ServerBuilder {
    engine: Option<Engine>,
    address: Option<io::Result<Vec<SocketAddr>>>,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { engine: None, address: None }
    }

    pub fn address<A: ToSocketAddrs>(mut self, address: A) -> Self {
        self.address = Some(address.to_socket_addrs().map(Iterator::collect));
        self
    }

    pub fn engine(mut self, engine: Engine) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn build(self) -> Result<Server, ServerError> {
        let engine = self.engine.ok_or(ServerError::MissingEngine)?;
        let address = self.address.ok_or(ServerError::MissingAddress)?.map_err(|source| ServerError::InvalidAddress { source })?;
        Ok(Server { engine: Arc::new(engine), address })
    }
}

/// Accepts TCP connections and serves one request per connection with an [`Engine`].
///
/// Requests are read on the async connection. Handler chains are synchronous, so each chain
/// runs on tokio's blocking pool and a slow handler never stalls the accept loop.
#[derive(Debug)]
pub struct Server {
    engine: Arc<Engine>,
    address: Vec<SocketAddr>,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub async fn start(self) -> Result<(), ServerError> {
        let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            info!("a global tracing subscriber is already set");
        }

        info!("start listening at {:?}", self.address);
        let tcp_listener = match TcpListener::bind(self.address.as_slice()).await {
            Ok(tcp_listener) => tcp_listener,
            Err(e) => {
                error!(cause = %e, "bind server error");
                return Err(e.into());
            }
        };

        loop {
            let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            let engine = Arc::clone(&self.engine);
            tokio::spawn(async move {
                if let Err(e) = serve_connection(engine, tcp_stream, remote_addr).await {
                    error!(cause = %e, %remote_addr, "service has error, connection shutdown");
                }
            });
        }
    }
}

/// Reads one request from `stream`, serves it and closes the connection.
///
/// The peer address is available to handlers as a `SocketAddr` request extension.
pub async fn serve_connection(engine: Arc<Engine>, stream: TcpStream, peer: SocketAddr) -> io::Result<()> {
    let mut reader = RequestReader::new(stream);
    let read = reader.read_request().await;
    let mut stream = reader.into_inner();

    let mut request = match read {
        Ok(Some(request)) => request,
        Ok(None) => return Ok(()),
        Err(e) => {
            warn!(cause = %e, %peer, "failed to read request");
            stream.write_all(BAD_REQUEST).await?;
            return stream.shutdown().await;
        }
    };
    request.extensions_mut().insert(peer);

    // the chain writes through a blocking stream
    let stream = stream.into_std()?;
    stream.set_nonblocking(false)?;
    tokio::task::spawn_blocking(move || match engine.serve(ConnectionWriter::new(stream), request) {
        Some(writer) => writer.finish(),
        None => Ok(()),
    })
    .await
    .map_err(io::Error::other)?
}
