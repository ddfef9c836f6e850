//! The application side of the server.

use crate::http::request::Request;
use crate::http::response::{Response, StatusCode};

/// Answers every request that is not served from the document root.
///
/// A failed `handle` becomes a 500 response. Any closure of the right shape
/// is a handler:
///
/// ```
/// use stagehand::{Handler, http::{Request, Response}};
///
/// let hello = |_: &Request| -> anyhow::Result<Response> { Ok(Response::ok("hi")) };
/// # fn takes(_: impl Handler) {}
/// takes(hello);
/// ```
pub trait Handler: Send + Sync {
    fn handle(&self, request: &Request) -> anyhow::Result<Response>;

    /// Runs once the response has been written and before the connection
    /// closes, e.g. to release per-request resources.
    fn terminate(&self, _request: &Request, _status: StatusCode) {}
}

impl<F> Handler for F
where
    F: Fn(&Request) -> anyhow::Result<Response> + Send + Sync,
{
    fn handle(&self, request: &Request) -> anyhow::Result<Response> {
        self(request)
    }
}
