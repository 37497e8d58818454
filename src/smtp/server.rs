use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

use crate::delivery::DeliverySink;

use super::session::Session;

/// SMTP server
///
/// Accepts connections and runs one [`Session`] task per client. All
/// sessions share the delivery sink and nothing else.
pub struct Server {
    hostname: String,
    sink: Arc<dyn DeliverySink>,
}

impl Server {
    pub fn new<T: AsRef<str>>(hostname: T, sink: Arc<dyn DeliverySink>) -> Self {
        Self {
            hostname: hostname.as_ref().to_string(),
            sink,
        }
    }

    /// Accept connections until `shutdown` is cancelled, then wait for the
    /// sessions that are still open to finish on their own.
    pub async fn run(self, listener: TcpListener, shutdown: CancellationToken) -> Result<()> {
        tracing::info!("Accepting connections on {}", listener.local_addr()?);
        let sessions = TaskTracker::new();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            tracing::warn!("Failed to accept connection: {}", e);
                            continue;
                        }
                    };

                    let session = Session::new(&self.hostname, stream, self.sink.clone());
                    let span = tracing::info_span!("session", %peer);
                    sessions.spawn(
                        async move {
                            tracing::info!("Client connected");
                            match session.serve().await {
                                Ok(()) => tracing::info!("Client disconnected"),
                                Err(e) => tracing::warn!("Session ended with error: {:#}", e),
                            }
                        }
                        .instrument(span),
                    );
                }
            }
        }

        drop(listener);
        sessions.close();
        if !sessions.is_empty() {
            tracing::info!("Waiting for {} open sessions", sessions.len());
        }
        sessions.wait().await;
        tracing::info!("Server stopped");

        Ok(())
    }
}
