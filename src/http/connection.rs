use bytes::BytesMut;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::handler::Handler;
use crate::http::parser::{MAX_REQUEST_SIZE, ParseError, parse_http_request};
use crate::http::request::{ConnectionInfo, Request};
use crate::http::response::{Response, StatusCode};
use crate::http::writer::ResponseWriter;
use crate::server::dispatch::{Dispatcher, Origin, logged_size};

/// One accepted socket, good for exactly one request/response exchange.
pub struct Connection {
    stream: TcpStream,
    info: ConnectionInfo,
    buffer: BytesMut,
    state: ConnectionState,
}

/// A request paired with where its response came from.
pub struct Exchange {
    request: Request,
    origin: Origin,
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    /// `exchange` is `None` when no request could be read.
    Writing {
        response: Response,
        exchange: Option<Exchange>,
    },
    Closed,
}

enum ReadError {
    Timeout,
    Io(io::Error),
    Parse(ParseError),
}

impl Connection {
    pub fn new(stream: TcpStream, info: ConnectionInfo) -> Self {
        Self {
            stream,
            info,
            buffer: BytesMut::with_capacity(MAX_REQUEST_SIZE),
            state: ConnectionState::Reading,
        }
    }

    /// Drives the exchange to completion. Every path ends with the socket closed.
    pub async fn run<H: Handler>(mut self, dispatcher: &Dispatcher<H>) {
        loop {
            self.state = match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => match self.read_request(dispatcher.read_timeout()).await {
                    Ok(request) => ConnectionState::Processing(request),
                    Err(e) => ConnectionState::Writing {
                        response: self.reject(e),
                        exchange: None,
                    },
                },

                ConnectionState::Processing(request) => {
                    let (response, origin) = dispatcher.respond(&request).await;
                    ConnectionState::Writing {
                        response,
                        exchange: Some(Exchange { request, origin }),
                    }
                }

                ConnectionState::Writing { response, exchange } => {
                    let status = response.status;
                    let size = exchange
                        .as_ref()
                        .and_then(|exchange| logged_size(&response, exchange.origin));
                    let written = ResponseWriter::new(response)
                        .write_to_stream(&mut self.stream)
                        .await;

                    if let Err(e) = &written {
                        warn!(peer = %self.info.remote, error = %e, "failed to write response");
                    }

                    if let Some(Exchange { request, origin }) = exchange {
                        let sent = if written.is_ok() { size } else { None };
                        dispatcher.log_access(&request, status, sent);
                        dispatcher.finalize(&request, status, origin);
                    }

                    ConnectionState::Closed
                }

                ConnectionState::Closed => {
                    // The peer may already be gone; nothing left to report.
                    let _ = self.stream.shutdown().await;
                    break;
                }
            };
        }
    }

    /// Performs the single bounded read and parses whatever arrived.
    async fn read_request(&mut self, window: Duration) -> Result<Request, ReadError> {
        let n = match tokio::time::timeout(window, self.stream.read_buf(&mut self.buffer)).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(ReadError::Io(e)),
            Err(_elapsed) => return Err(ReadError::Timeout),
        };

        parse_http_request(&self.buffer[..n], self.info).map_err(ReadError::Parse)
    }

    fn reject(&self, error: ReadError) -> Response {
        let peer = self.info.remote;

        match error {
            ReadError::Timeout => {
                debug!(%peer, "no request within the read window");
                Response::empty(StatusCode::REQUEST_TIMEOUT)
            }
            ReadError::Parse(ParseError::Empty) => {
                debug!(%peer, "connection closed without a request");
                Response::empty(StatusCode::BAD_REQUEST)
            }
            ReadError::Parse(e @ ParseError::Malformed(_)) => {
                warn!(%peer, error = %e, "rejecting request");
                Response::empty(StatusCode::BAD_REQUEST)
            }
            ReadError::Io(e) => {
                warn!(%peer, error = %e, "failed to read request");
                Response::empty(StatusCode::BAD_REQUEST)
            }
        }
    }
}
