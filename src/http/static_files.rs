//! Serving files below a document root.
//!
//! Only GET and HEAD requests whose decoded path names an existing regular
//! file are answered here; everything else is left to the handler.
//! Content-Type comes from the extension, or from the file's leading bytes
//! when the extension is missing or unknown.
//! Conditional and range request headers are ignored.

use sha2::{Digest, Sha256};
use std::io::{self, SeekFrom};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::http::mime;
use crate::http::request::{Method, Request};
use crate::http::response::{Response, ResponseBuilder, StatusCode};

#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a request onto a file below the root, if it is eligible.
    pub async fn resolve(&self, request: &Request) -> Option<PathBuf> {
        if !request.method.is_safe() {
            return None;
        }

        let relative = Path::new(request.path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return None;
        }

        let path = self.root.join(relative);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }

    /// Builds the response for a request, or `None` if the request falls
    /// through to the handler.
    pub async fn try_serve(&self, request: &Request) -> io::Result<Option<Response>> {
        match self.resolve(request).await {
            Some(path) => file_response(&path, request.method == Method::HEAD)
                .await
                .map(Some),
            None => Ok(None),
        }
    }
}

/// A 200 response for `path` carrying validators and a file-backed body.
///
/// For HEAD the headers are identical but the body is empty.
pub async fn file_response(path: &Path, head_only: bool) -> io::Result<Response> {
    let mut file = File::open(path).await?;
    let meta = file.metadata().await?;
    let size = meta.len();
    let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);

    let content_type = match mime::from_extension(path) {
        Some(content_type) => content_type,
        None => mime::sniff(&read_prefix(&mut file).await?).to_string(),
    };

    let last_modified = httpdate::fmt_http_date(modified);
    let builder = ResponseBuilder::new(StatusCode::OK)
        .header("Last-Modified", last_modified.as_str())
        .header("Etag", weak_etag(&last_modified))
        .header("Content-Type", content_type)
        .header("Content-Length", size.to_string())
        .header("Connection", "Closed");

    let response = if head_only {
        builder.build()
    } else {
        builder.file(file, size).build()
    };

    Ok(response)
}

/// Reads the first bytes of `file` for sniffing and rewinds it.
async fn read_prefix(file: &mut File) -> io::Result<Vec<u8>> {
    let mut prefix = Vec::with_capacity(mime::SNIFF_LEN);
    (&mut *file)
        .take(mime::SNIFF_LEN as u64)
        .read_to_end(&mut prefix)
        .await?;
    file.seek(SeekFrom::Start(0)).await?;
    Ok(prefix)
}

/// Weak validator derived only from the formatted modification time.
pub fn weak_etag(last_modified: &str) -> String {
    format!("W/\"{:x}\"", Sha256::digest(last_modified.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn etag_depends_only_on_timestamp() {
        let a = weak_etag("Thu, 01 Jan 1970 00:00:00 GMT");
        let b = weak_etag("Thu, 01 Jan 1970 00:00:00 GMT");
        let c = weak_etag("Fri, 02 Jan 1970 00:00:00 GMT");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("W/\"") && a.ends_with('"'));
    }
}
