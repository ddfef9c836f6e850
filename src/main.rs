use stagehand::http::{Method, Request, Response};
use stagehand::{Config, Server, logging};

/// The demo application: a single page on `/`.
fn hello(request: &Request) -> anyhow::Result<Response> {
    match (&request.method, request.path.as_str()) {
        (Method::GET, "/") => Ok(Response::html(format!(
            "<h1>Hello World!</h1><p>Hello from stagehand v{}</p>",
            env!("CARGO_PKG_VERSION")
        ))),
        _ => Ok(Response::not_found()),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let mut cfg = Config::load()?;
    logging::init(cfg.debug);

    if cfg.document_root.is_none() {
        cfg = cfg.with_document_root(std::env::current_dir()?)?;
    }

    let server = Server::bind(&cfg, hello).await?;
    server.run().await?;

    Ok(())
}
