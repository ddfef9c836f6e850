use std::future::Future;
use std::io;
use std::pin::Pin;
use tracing::info;

type Trigger = Pin<Box<dyn Future<Output = ()> + Send>>;

/// The shutdown flag together with whatever sets it.
///
/// The accept loop checks [`is_terminated`](Shutdown::is_terminated) before
/// each wait and races [`recv`](Shutdown::recv) against the accept itself, so
/// a request that is already being served always runs to completion.
pub struct Shutdown {
    terminate: bool,
    trigger: Trigger,
}

impl Shutdown {
    /// Flips the flag once `trigger` completes.
    pub fn new(trigger: impl Future<Output = ()> + Send + 'static) -> Self {
        Self {
            terminate: false,
            trigger: Box::pin(trigger),
        }
    }

    /// Flips the flag on SIGTERM or Ctrl-C.
    #[cfg(unix)]
    pub fn on_signal() -> io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate())?;
        Ok(Self::new(async move {
            tokio::select! {
                _ = term.recv() => info!("HTTP server gracefully terminating by SIGTERM"),
                _ = tokio::signal::ctrl_c() => info!("HTTP server gracefully terminating by SIGINT"),
            }
        }))
    }

    #[cfg(not(unix))]
    pub fn on_signal() -> io::Result<Self> {
        Ok(Self::new(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("HTTP server gracefully terminating by Ctrl-C");
            }
        }))
    }

    /// A flag nothing will ever set.
    pub fn never() -> Self {
        Self::new(std::future::pending())
    }

    pub fn is_terminated(&self) -> bool {
        self.terminate
    }

    /// Resolves when the flag is set. Once set, never resolves again.
    pub async fn recv(&mut self) {
        if self.terminate {
            return std::future::pending().await;
        }

        (&mut self.trigger).await;
        self.terminate = true;
    }
}
