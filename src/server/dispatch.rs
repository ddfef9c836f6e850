use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;
use tracing::{error, info};

use crate::handler::Handler;
use crate::http::request::Request;
use crate::http::response::{Response, StatusCode};
use crate::http::static_files::StaticFiles;

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    StaticFile,
    Handler,
}

/// Decides who answers a parsed request: the document root or the handler.
pub struct Dispatcher<H> {
    handler: H,
    static_files: Option<StaticFiles>,
    debug: bool,
    read_timeout: Duration,
}

impl<H: Handler> Dispatcher<H> {
    pub fn new(
        handler: H,
        static_files: Option<StaticFiles>,
        debug: bool,
        read_timeout: Duration,
    ) -> Self {
        Self {
            handler,
            static_files,
            debug,
            read_timeout,
        }
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Produces the response for `request`.
    ///
    /// A failing static lookup or handler is turned into a 500; this never
    /// fails.
    pub async fn respond(&self, request: &Request) -> (Response, Origin) {
        if let Some(files) = &self.static_files {
            match files.try_serve(request).await {
                Ok(Some(response)) => return (response, Origin::StaticFile),
                Ok(None) => {}
                Err(e) => {
                    error!(path = %request.path, error = %e, "failed to open static file");
                    return (self.failure(&e.to_string()), Origin::StaticFile);
                }
            }
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.handler.handle(request)));
        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                let message = format!("{e:#}");
                error!(
                    method = %request.method,
                    path = %request.path,
                    error = %message,
                    "handler failed"
                );
                self.failure(&message)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(
                    method = %request.method,
                    path = %request.path,
                    panic = %message,
                    "handler panicked"
                );
                self.failure(&message)
            }
        };

        (response, Origin::Handler)
    }

    /// Lets the handler release per-request resources.
    pub fn finalize(&self, request: &Request, status: StatusCode, origin: Origin) {
        if origin == Origin::Handler {
            self.handler.terminate(request, status);
        }
    }

    /// Access log line, only when debugging.
    pub fn log_access(&self, request: &Request, status: StatusCode, sent: Option<u64>) {
        if !self.debug {
            return;
        }
        match sent {
            Some(bytes) => info!(
                "{} {} {} {}",
                request.method,
                request.path,
                status.as_u16(),
                bytes
            ),
            None => info!("{} {} {}", request.method, request.path, status.as_u16()),
        }
    }

    fn failure(&self, message: &str) -> Response {
        if self.debug {
            Response::internal_error(Some(message))
        } else {
            Response::internal_error(None)
        }
    }
}

/// Size reported in the access log.
///
/// Static responses report the advertised file size, so HEAD logs the same
/// figure as GET. Handler responses report nothing.
pub fn logged_size(response: &Response, origin: Origin) -> Option<u64> {
    match origin {
        Origin::StaticFile => response
            .headers
            .get("Content-Length")
            .and_then(|len| len.parse().ok()),
        Origin::Handler => None,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
