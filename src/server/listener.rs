use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tracing::info;

const BACKLOG: u32 = 1024;

#[derive(Debug, thiserror::Error)]
#[error("cannot listen on {addr}: {source}")]
pub struct BindError {
    pub addr: String,
    #[source]
    pub source: io::Error,
}

/// Outcome of one bounded accept wait.
#[derive(Debug)]
pub enum Accept {
    Connection(TcpStream, SocketAddr),
    Timeout,
}

/// The listening socket. Reuses its address so restarts don't hit "address in use".
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    pub async fn bind(host: &str, port: u16) -> Result<Self, BindError> {
        let addr = format!("{host}:{port}");
        let bind_error = |source: io::Error| BindError {
            addr: addr.clone(),
            source,
        };

        let resolved = tokio::net::lookup_host((host, port))
            .await
            .map_err(bind_error)?
            .next()
            .ok_or_else(|| {
                bind_error(io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    "host resolved to no addresses",
                ))
            })?;

        let socket = if resolved.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(bind_error)?;

        socket.set_reuseaddr(true).map_err(bind_error)?;
        socket.bind(resolved).map_err(bind_error)?;
        let inner = socket.listen(BACKLOG).map_err(bind_error)?;

        info!("Listening on {}", resolved);
        Ok(Self { inner })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// Waits up to `wait` for the next connection.
    ///
    /// Running out of time is not an error; it gives the caller a chance to
    /// look at the shutdown flag.
    pub async fn accept_next(&self, wait: Duration) -> io::Result<Accept> {
        match tokio::time::timeout(wait, self.inner.accept()).await {
            Ok(Ok((stream, peer))) => Ok(Accept::Connection(stream, peer)),
            Ok(Err(e)) => Err(e),
            Err(_elapsed) => Ok(Accept::Timeout),
        }
    }
}
