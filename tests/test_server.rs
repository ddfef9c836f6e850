//! End-to-end tests over loopback sockets.

use stagehand::http::{Request, Response, StatusCode};
use stagehand::{Config, Handler, Server, Shutdown};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct Reply {
    status: u16,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

fn parse_reply(raw: &[u8]) -> Reply {
    let end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response has a header block");
    let head = std::str::from_utf8(&raw[..end]).unwrap();
    let mut lines = head.split("\r\n");

    let status_line = lines.next().unwrap();
    let status = status_line.split(' ').nth(1).unwrap().parse().unwrap();
    let headers = lines
        .map(|line| {
            let (k, v) = line.split_once(": ").unwrap();
            (k.to_ascii_lowercase(), v.to_string())
        })
        .collect();

    Reply {
        status,
        headers,
        body: raw[end + 4..].to_vec(),
    }
}

async fn roundtrip(addr: SocketAddr, raw: &[u8]) -> Reply {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw).await.unwrap();

    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    parse_reply(&out)
}

struct Running {
    addr: SocketAddr,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl Running {
    async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("server stops")
            .unwrap();
    }
}

fn test_config(document_root: Option<&std::path::Path>, debug: bool) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        debug,
        document_root: document_root.map(|p| p.to_path_buf()),
        read_timeout_ms: 300,
        accept_timeout_ms: 50,
    }
}

async fn start<H: Handler + 'static>(cfg: Config, handler: H) -> Running {
    let server = Server::bind(&cfg, handler).await.unwrap();
    let addr = server.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    let shutdown = Shutdown::new(async move {
        let _ = rx.await;
    });
    let task = tokio::spawn(server.run_until(shutdown));

    Running {
        addr,
        stop: Some(tx),
        task,
    }
}

fn hello(request: &Request) -> anyhow::Result<Response> {
    match request.path.as_str() {
        "/boom" => anyhow::bail!("boom"),
        "/panic" => panic!("handler blew up"),
        "/teapot" => Ok(Response::builder(StatusCode::from_u16(418).unwrap())
            .body("short and stout")
            .build()),
        _ => Ok(Response::ok("<h1>Hello World!</h1>")),
    }
}

fn docroot() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "hi").unwrap();
    dir
}

#[tokio::test]
async fn test_handler_response_is_sent() {
    let server = start(test_config(None, false), hello).await;

    let reply = roundtrip(server.addr, b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").await;

    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, b"<h1>Hello World!</h1>");
    assert_eq!(reply.headers["content-length"], "21");
    assert_eq!(reply.headers["connection"], "close");
    assert!(reply.headers.contains_key("date"));

    server.stop().await;
}

#[tokio::test]
async fn test_handler_may_pick_any_status() {
    let server = start(test_config(None, false), hello).await;

    let reply = roundtrip(server.addr, b"GET /teapot HTTP/1.1\r\n\r\n").await;

    assert_eq!(reply.status, 418);
    assert_eq!(reply.body, b"short and stout");

    server.stop().await;
}

#[tokio::test]
async fn test_static_file_get_and_head() {
    let dir = docroot();
    let server = start(test_config(Some(dir.path()), true), hello).await;

    let get = roundtrip(server.addr, b"GET /notes.txt HTTP/1.1\r\n\r\n").await;
    assert_eq!(get.status, 200);
    assert_eq!(get.headers["content-length"], "2");
    assert_eq!(get.headers["connection"], "Closed");
    assert!(get.headers.contains_key("etag"));
    assert!(get.headers.contains_key("last-modified"));
    assert_eq!(get.body, b"hi");

    let head = roundtrip(server.addr, b"HEAD /notes.txt HTTP/1.1\r\n\r\n").await;
    assert_eq!(head.status, 200);
    assert_eq!(head.headers["content-length"], "2");
    assert_eq!(head.headers["etag"], get.headers["etag"]);
    assert!(head.body.is_empty());

    server.stop().await;
}

#[tokio::test]
async fn test_non_safe_method_on_file_reaches_handler() {
    let dir = docroot();
    let server = start(test_config(Some(dir.path()), false), hello).await;

    let reply = roundtrip(server.addr, b"POST /notes.txt HTTP/1.1\r\n\r\n").await;

    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, b"<h1>Hello World!</h1>");

    server.stop().await;
}

#[tokio::test]
async fn test_handler_failure_with_debug_reveals_message() {
    let server = start(test_config(None, true), hello).await;

    let reply = roundtrip(server.addr, b"GET /boom HTTP/1.1\r\n\r\n").await;

    assert_eq!(reply.status, 500);
    assert!(String::from_utf8_lossy(&reply.body).contains("boom"));

    server.stop().await;
}

#[tokio::test]
async fn test_handler_failure_without_debug_hides_message() {
    let server = start(test_config(None, false), hello).await;

    let reply = roundtrip(server.addr, b"GET /boom HTTP/1.1\r\n\r\n").await;

    assert_eq!(reply.status, 500);
    assert!(!String::from_utf8_lossy(&reply.body).contains("boom"));

    server.stop().await;
}

#[tokio::test]
async fn test_handler_panic_gets_500_and_loop_survives() {
    let server = start(test_config(None, true), hello).await;

    let reply = roundtrip(server.addr, b"GET /panic HTTP/1.1\r\n\r\n").await;
    assert_eq!(reply.status, 500);
    assert!(String::from_utf8_lossy(&reply.body).contains("handler blew up"));

    let good = roundtrip(server.addr, b"GET / HTTP/1.1\r\n\r\n").await;
    assert_eq!(good.status, 200);
    assert_eq!(good.body, b"<h1>Hello World!</h1>");

    server.stop().await;
}

#[tokio::test]
async fn test_silent_client_gets_408() {
    let server = start(test_config(None, false), hello).await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    let reply = parse_reply(&out);

    assert_eq!(reply.status, 408);
    assert!(reply.body.is_empty());

    server.stop().await;
}

#[tokio::test]
async fn test_client_closing_without_bytes_gets_400() {
    let server = start(test_config(None, false), hello).await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream.shutdown().await.unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    let reply = parse_reply(&out);

    assert_eq!(reply.status, 400);
    assert!(reply.body.is_empty());

    server.stop().await;
}

#[tokio::test]
async fn test_malformed_request_gets_400_and_loop_survives() {
    let server = start(test_config(None, false), hello).await;

    let bad = roundtrip(server.addr, b"NONSENSE\r\n\r\n").await;
    assert_eq!(bad.status, 400);

    let good = roundtrip(server.addr, b"GET / HTTP/1.1\r\n\r\n").await;
    assert_eq!(good.status, 200);

    server.stop().await;
}

struct Recording {
    seen: Arc<Mutex<Vec<String>>>,
    finalized: Arc<Mutex<Vec<u16>>>,
}

impl Handler for Recording {
    fn handle(&self, request: &Request) -> anyhow::Result<Response> {
        let params = request.server_params();
        self.seen.lock().unwrap().push(format!(
            "{} {} {}",
            params["REQUEST_METHOD"], params["REQUEST_URI"], params["HTTP_X_TOKEN"]
        ));
        Ok(Response::ok(request.cookie("a").unwrap_or("-").to_string()))
    }

    fn terminate(&self, _request: &Request, status: StatusCode) {
        self.finalized.lock().unwrap().push(status.as_u16());
    }
}

#[tokio::test]
async fn test_handler_sees_metadata_and_is_finalized() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let finalized = Arc::new(Mutex::new(Vec::new()));
    let handler = Recording {
        seen: Arc::clone(&seen),
        finalized: Arc::clone(&finalized),
    };
    let server = start(test_config(None, false), handler).await;

    let reply = roundtrip(
        server.addr,
        b"GET /x?y=1 HTTP/1.1\r\nX-Token: t0k\r\nCookie: a=1; b=2\r\n\r\n",
    )
    .await;

    assert_eq!(reply.body, b"1");
    assert_eq!(*seen.lock().unwrap(), vec!["GET /x?y=1 t0k".to_string()]);
    assert_eq!(*finalized.lock().unwrap(), vec![200]);

    server.stop().await;
}

#[tokio::test]
async fn test_shutdown_stops_accepting() {
    let server = start(test_config(None, false), hello).await;
    let addr = server.addr;

    server.stop().await;

    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn test_request_in_flight_completes_after_shutdown() {
    let cfg = test_config(None, false);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let stop_tx = Mutex::new(Some(stop_tx));

    // The handler itself requests shutdown, so the flag is set while the
    // exchange is in flight.
    let handler = move |_: &Request| -> anyhow::Result<Response> {
        if let Some(tx) = stop_tx.lock().unwrap().take() {
            let _ = tx.send(());
        }
        Ok(Response::ok("finished"))
    };

    let server = Server::bind(&cfg, handler).await.unwrap();
    let addr = server.local_addr().unwrap();
    let task = tokio::spawn(server.run_until(Shutdown::new(async move {
        let _ = stop_rx.await;
    })));

    let reply = roundtrip(addr, b"GET / HTTP/1.1\r\n\r\n").await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, b"finished");

    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("server stops after the in-flight request")
        .unwrap();
    assert!(TcpStream::connect(addr).await.is_err());
}
