use std::time::SystemTime;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

use crate::http::response::{Body, Response};

const HTTP_VERSION: &str = "HTTP/1.1";

/// Stamps the headers every response must carry.
///
/// `Date` is always refreshed. `Connection: close` is added unless the
/// response already names a connection option. A byte body always carries
/// its real length; an empty body keeps an explicit Content-Length so HEAD
/// can advertise the size it would have sent.
fn prepare(resp: &mut Response, now: SystemTime) {
    resp.headers.insert("Date", httpdate::fmt_http_date(now));

    if !resp.headers.contains_key("Connection") {
        resp.headers.insert("Connection", "close");
    }

    match &resp.body {
        Body::Bytes(bytes) => {
            let actual = bytes.len().to_string();
            if let Some(declared) = resp.headers.get("Content-Length") {
                if declared != actual {
                    warn!(
                        declared,
                        actual = %actual,
                        "correcting Content-Length to match the body"
                    );
                }
            }
            resp.headers.insert("Content-Length", actual);
        }
        Body::Empty if !resp.headers.contains_key("Content-Length") => {
            resp.headers.insert("Content-Length", "0");
        }
        Body::Empty | Body::File { .. } => {}
    }
}

fn serialize_head(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128 + resp.headers.len() * 32);

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    // Headers
    for (k, v) in resp.headers.iter() {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf
}

/// Serializes a response onto a connection.
pub struct ResponseWriter {
    head: Vec<u8>,
    body: Body,
}

impl ResponseWriter {
    pub fn new(mut response: Response) -> Self {
        prepare(&mut response, SystemTime::now());

        Self {
            head: serialize_head(&response),
            body: response.body,
        }
    }

    /// Writes status line, headers and body. Returns the number of body bytes sent.
    ///
    /// There is no retry: the first failed write abandons the response.
    pub async fn write_to_stream<S>(self, stream: &mut S) -> anyhow::Result<u64>
    where
        S: AsyncWrite + Unpin,
    {
        stream.write_all(&self.head).await?;

        let sent = match self.body {
            Body::Empty => 0,
            Body::Bytes(bytes) => {
                stream.write_all(&bytes).await?;
                bytes.len() as u64
            }
            Body::File { file, len } => copy_exact(file, len, stream).await?,
        };

        stream.flush().await?;
        Ok(sent)
    }
}

async fn copy_exact<R, W>(reader: R, len: u64, writer: &mut W) -> anyhow::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut limited = reader.take(len);
    let copied = tokio::io::copy(&mut limited, writer).await?;

    if copied != len {
        anyhow::bail!("file shrank while sending: {copied} of {len} bytes written");
    }

    Ok(copied)
}
