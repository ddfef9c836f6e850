//! The accept loop.
//!
//! Connections are served strictly one at a time: accept, read, parse,
//! answer, write, close, and only then accept again. The bounded accept wait
//! is the only place the loop idles, and the shutdown flag is looked at
//! before each wait.

pub mod dispatch;
pub mod listener;
pub mod shutdown;

use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{error, info};

use crate::config::Config;
use crate::handler::Handler;
use crate::http::connection::Connection;
use crate::http::request::ConnectionInfo;
use crate::http::static_files::StaticFiles;
use dispatch::Dispatcher;
use listener::{Accept, BindError, Listener};
use shutdown::Shutdown;

pub struct Server<H> {
    listener: Listener,
    dispatcher: Dispatcher<H>,
    accept_timeout: Duration,
}

impl<H: Handler> Server<H> {
    /// Binds the listening socket. Failing to bind is fatal for the caller.
    pub async fn bind(cfg: &Config, handler: H) -> Result<Self, BindError> {
        let listener = match Listener::bind(&cfg.host, cfg.port).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("{}", e);
                return Err(e);
            }
        };

        info!(
            "HTTP server started on {}:{} [PID:{}]",
            cfg.host,
            cfg.port,
            std::process::id()
        );

        let static_files = cfg.document_root.clone().map(StaticFiles::new);
        if let Some(files) = &static_files {
            info!("Serving static files from {}", files.root().display());
        }

        Ok(Self {
            listener,
            dispatcher: Dispatcher::new(handler, static_files, cfg.debug, cfg.read_timeout()),
            accept_timeout: cfg.accept_timeout(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves until SIGTERM (or Ctrl-C) arrives.
    pub async fn run(self) -> io::Result<()> {
        let shutdown = Shutdown::on_signal()?;
        self.run_until(shutdown).await;
        Ok(())
    }

    /// Serves until `shutdown` fires. The request in flight at that moment
    /// is finished first; no connection is accepted afterwards.
    pub async fn run_until(self, mut shutdown: Shutdown) {
        while !shutdown.is_terminated() {
            let accepted = tokio::select! {
                biased;
                () = shutdown.recv() => continue,
                accepted = self.listener.accept_next(self.accept_timeout) => accepted,
            };

            match accepted {
                Ok(Accept::Connection(stream, peer)) => self.serve(stream, peer).await,
                Ok(Accept::Timeout) => {}
                Err(e) => {
                    error!("[internal] accept failed: {}", e);
                    tokio::time::sleep(accept_backoff(self.accept_timeout)).await;
                }
            }
        }

        info!("HTTP server stopped");
    }

    async fn serve(&self, stream: TcpStream, peer: SocketAddr) {
        let local = match stream.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                error!("[internal] connection from {} has no local address: {}", peer, e);
                return;
            }
        };

        Connection::new(stream, ConnectionInfo::new(peer, local))
            .run(&self.dispatcher)
            .await;
    }
}

/// Pause after a failed accept so a persistent error (EMFILE, say) does not
/// spin the loop.
fn accept_backoff(accept_timeout: Duration) -> Duration {
    accept_timeout.min(Duration::from_millis(100))
}
