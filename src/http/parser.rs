use bytes::Bytes;
use percent_encoding::percent_decode_str;
use std::collections::HashMap;
use url::Url;

use crate::http::request::{ConnectionInfo, Method, Request, Version};

/// Size of the single receive performed per connection.
pub const MAX_REQUEST_SIZE: usize = 8192;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty request")]
    Empty,
    #[error("malformed request: {0}")]
    Malformed(String),
}

/// Path and query components of a request-target.
#[derive(Debug)]
pub(crate) struct Target {
    pub path: String,
    pub query_string: Option<String>,
    pub query: HashMap<String, String>,
}

/// Parses one buffer of raw bytes into a [`Request`].
///
/// Only the first blank line ends the header block; whatever follows it in
/// `buf` becomes the request body. Nothing beyond `buf` is ever read.
pub fn parse_http_request(buf: &[u8], connection: ConnectionInfo) -> Result<Request, ParseError> {
    if buf.is_empty() {
        return Err(ParseError::Empty);
    }

    let (head, body) = match find_headers_end(buf) {
        Some(end) => (&buf[..end], Bytes::copy_from_slice(&buf[end + 4..])),
        None => (buf, Bytes::new()),
    };

    let head = std::str::from_utf8(head)
        .map_err(|_| ParseError::Malformed("request head is not valid UTF-8".into()))?;

    let mut lines = head.split("\r\n");

    // Request line
    let request_line = lines.next().unwrap_or_default();
    let (method, target, version) = parse_request_line(request_line)?;

    // Headers
    let headers = parse_headers(lines);

    let Target {
        path,
        query_string,
        query,
    } = split_target(target)?;

    let cookies = headers
        .get("cookie")
        .map(|raw| parse_cookies(raw))
        .unwrap_or_default();

    Ok(Request {
        method,
        target: target.to_string(),
        path,
        query_string,
        query,
        version,
        headers,
        cookies,
        body,
        connection,
    })
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Splits `METHOD target HTTP/x.y` into exactly three validated fields.
fn parse_request_line(line: &str) -> Result<(Method, &str, Version), ParseError> {
    let parts: Vec<&str> = line.split_whitespace().collect();

    let &[method, target, version] = parts.as_slice() else {
        return Err(ParseError::Malformed(format!("bad request line {line:?}")));
    };

    let method = method.parse::<Method>()?;
    let version = Version::parse(version)
        .ok_or_else(|| ParseError::Malformed(format!("bad protocol version {version:?}")))?;

    Ok((method, target, version))
}

fn parse_headers<'a>(lines: impl Iterator<Item = &'a str>) -> HashMap<String, String> {
    let mut headers = HashMap::new();

    for line in lines.filter(|line| !line.is_empty()) {
        let Some((key, value)) = line.split_once(':') else {
            tracing::debug!(line, "ignoring header line without a colon");
            continue;
        };

        headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
    }

    headers
}

/// Decomposes a request-target into its decoded path and query.
pub(crate) fn split_target(target: &str) -> Result<Target, ParseError> {
    let base = Url::parse("http://localhost/")
        .map_err(|e| ParseError::Malformed(e.to_string()))?;
    let url = Url::options()
        .base_url(Some(&base))
        .parse(target)
        .map_err(|e| ParseError::Malformed(format!("bad request target {target:?}: {e}")))?;

    let path = percent_decode_str(url.path())
        .decode_utf8_lossy()
        .into_owned();
    let query = url.query_pairs().into_owned().collect();

    Ok(Target {
        path,
        query_string: url.query().map(str::to_string),
        query,
    })
}

/// Decodes a `Cookie` header value of the form `a=1; b=2`.
///
/// Pairs are split on the first `=`; values are URL-decoded with `+` read as
/// a space. Pairs without `=` are dropped.
pub fn parse_cookies(raw: &str) -> HashMap<String, String> {
    raw.split("; ")
        .filter_map(|pair| pair.trim().split_once('='))
        .map(|(name, value)| {
            let value = value.replace('+', " ");
            let value = percent_decode_str(&value).decode_utf8_lossy().into_owned();
            (name.trim().to_string(), value)
        })
        .collect()
}
