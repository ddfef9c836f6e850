use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::http::parser::{ParseError, parse_cookies, split_target};

/// Identity advertised to handlers as `SERVER_SOFTWARE`.
pub const SERVER_SOFTWARE: &str = concat!("stagehand/", env!("CARGO_PKG_VERSION"));

/// HTTP request methods.
///
/// The common methods get their own variant; any other syntactically valid
/// method token is kept verbatim in `Extension`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// PATCH - Partial modification of a resource
    PATCH,
    /// Any other method token, e.g. `PROPFIND`
    Extension(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
            Method::Extension(token) => token,
        }
    }

    /// GET and HEAD retrieve without side effects and may be answered from disk.
    pub fn is_safe(&self) -> bool {
        matches!(self, Method::GET | Method::HEAD)
    }
}

impl FromStr for Method {
    type Err = ParseError;

    /// Parses a method token. Methods are case-sensitive, so `get` is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let method = match s {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "HEAD" => Method::HEAD,
            "OPTIONS" => Method::OPTIONS,
            "PATCH" => Method::PATCH,
            other => {
                let valid = !other.is_empty()
                    && other
                        .bytes()
                        .all(|b| b.is_ascii_uppercase() || b == b'-' || b == b'_');
                if !valid {
                    return Err(ParseError::Malformed(format!("invalid method {other:?}")));
                }
                Method::Extension(other.to_string())
            }
        };
        Ok(method)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol version from the request line, e.g. `HTTP/1.1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl Version {
    pub const HTTP_10: Version = Version { major: 1, minor: 0 };
    pub const HTTP_11: Version = Version { major: 1, minor: 1 };

    /// Accepts `HTTP/<digits>` optionally followed by `.<digits>`.
    pub fn parse(field: &str) -> Option<Version> {
        let number = field.strip_prefix("HTTP/")?;
        let (major, minor) = match number.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (number, "0"),
        };
        let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !digits(major) || !digits(minor) {
            return None;
        }
        Some(Version {
            major: major.parse().ok()?,
            minor: minor.parse().ok()?,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}

/// Where a request came from and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub remote: SocketAddr,
    pub local: SocketAddr,
    pub arrived_at: SystemTime,
}

impl ConnectionInfo {
    pub fn new(remote: SocketAddr, local: SocketAddr) -> Self {
        Self {
            remote,
            local,
            arrived_at: SystemTime::now(),
        }
    }
}

impl Default for ConnectionInfo {
    fn default() -> Self {
        let unspecified = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0));
        Self::new(unspecified, unspecified)
    }
}

/// A parsed HTTP request.
///
/// Header names are always stored lower-cased. `path`, `query_string` and
/// `query` are derived from `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    /// The request-target exactly as sent, e.g. `/search?q=rust`
    pub target: String,
    /// Percent-decoded path portion of the target
    pub path: String,
    pub query_string: Option<String>,
    /// Decoded query parameters; a repeated key keeps its last value
    pub query: HashMap<String, String>,
    pub version: Version,
    pub headers: HashMap<String, String>,
    /// Decoded `Cookie` header; empty when there is none
    pub cookies: HashMap<String, String>,
    /// Bytes after the header block that arrived in the initial read, if any
    pub body: Bytes,
    pub connection: ConnectionInfo,
}

impl Request {
    /// Retrieves a header value by name, ignoring case.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .get(&key.to_ascii_lowercase())
            .map(|v| v.as_str())
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(|v| v.as_str())
    }

    /// Gateway-style metadata describing this request.
    ///
    /// Each header appears once as `HTTP_<NAME>` with the name uppercased and
    /// hyphens replaced by underscores.
    pub fn server_params(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        let info = &self.connection;

        params.insert("REMOTE_ADDR".into(), info.remote.ip().to_string());
        params.insert("REMOTE_PORT".into(), info.remote.port().to_string());
        params.insert("SERVER_ADDR".into(), info.local.ip().to_string());
        params.insert("SERVER_PORT".into(), info.local.port().to_string());
        params.insert("SERVER_SOFTWARE".into(), SERVER_SOFTWARE.to_string());
        params.insert("SERVER_PROTOCOL".into(), self.version.to_string());

        let since_epoch = info
            .arrived_at
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        params.insert("REQUEST_TIME".into(), since_epoch.as_secs().to_string());
        params.insert(
            "REQUEST_TIME_FLOAT".into(),
            format!("{}.{:06}", since_epoch.as_secs(), since_epoch.subsec_micros()),
        );

        params.insert("REQUEST_METHOD".into(), self.method.to_string());
        params.insert("REQUEST_URI".into(), self.target.clone());
        params.insert(
            "QUERY_STRING".into(),
            self.query_string.clone().unwrap_or_default(),
        );

        for (name, value) in &self.headers {
            let key = format!("HTTP_{}", name.to_ascii_uppercase().replace('-', "_"));
            params.insert(key, value.clone());
        }

        params
    }
}

/// Builder for constructing Request objects without going through the wire.
pub struct RequestBuilder {
    method: Method,
    target: String,
    version: Version,
    headers: HashMap<String, String>,
    body: Bytes,
    connection: ConnectionInfo,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: Method::GET,
            target: "/".to_string(),
            version: Version::HTTP_11,
            headers: HashMap::new(),
            body: Bytes::new(),
            connection: ConnectionInfo::default(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn header(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(key.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn connection(mut self, connection: ConnectionInfo) -> Self {
        self.connection = connection;
        self
    }

    pub fn build(self) -> Result<Request, ParseError> {
        let target = split_target(&self.target)?;
        let cookies = self
            .headers
            .get("cookie")
            .map(|raw| parse_cookies(raw))
            .unwrap_or_default();

        Ok(Request {
            method: self.method,
            target: self.target,
            path: target.path,
            query_string: target.query_string,
            query: target.query,
            version: self.version,
            headers: self.headers,
            cookies,
            body: self.body,
            connection: self.connection,
        })
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
