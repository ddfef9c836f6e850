//! HTTP protocol implementation.
//!
//! A deliberately small HTTP/1.x subset: one request per connection, no
//! keep-alive, no chunked encoding, and no body beyond the first read.
//!
//! # Architecture
//!
//! - **`connection`**: The per-connection state machine
//! - **`parser`**: Turns the raw bytes of one read into a [`Request`]
//! - **`request`**: Request representation, methods, versions and gateway metadata
//! - **`headers`**: Case-insensitive header map used by responses
//! - **`response`**: Response representation with builder pattern
//! - **`writer`**: Serializes and writes responses to the client
//! - **`static_files`**: Answers GET/HEAD requests from the document root
//! - **`mime`**: MIME type detection based on file extensions
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← One bounded read (timeout → 408, empty/malformed → 400)
//!        └──────┬──────┘
//!               │ Request parsed
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← Static file, or the handler (failure → 500)
//!        └──────┬───────────┘
//!               │ Response ready
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Send response, then finalize
//!        └──────┬───────────┘
//!               ▼
//!        ┌──────────────────┐
//!        │     Closed       │
//!        └──────────────────┘
//! ```

pub mod connection;
pub mod headers;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod static_files;
pub mod writer;

pub use headers::HeaderMap;
pub use parser::{ParseError, parse_http_request};
pub use request::{ConnectionInfo, Method, Request, RequestBuilder, Version};
pub use response::{Body, Response, ResponseBuilder, StatusCode};
