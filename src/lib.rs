//! Stagehand - a minimal HTTP/1.x development server
//!
//! Accepts connections on a raw TCP socket, serves files from an optional
//! document root and hands every other request to a single [`Handler`].

pub mod config;
pub mod handler;
pub mod http;
pub mod logging;
pub mod server;

pub use config::Config;
pub use handler::Handler;
pub use server::Server;
pub use server::shutdown::Shutdown;
