use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::delivery::DeliverySink;

use super::channel::LineChannel;
use super::response::Response;
use super::state_machine::{Reply, StateMachine};

/// SMTP session
///
/// Drives one client connection: reads lines, feeds them to the state
/// machine and hands finished messages to the delivery sink.
pub struct Session<S> {
    channel: LineChannel<S>,
    state_machine: StateMachine,
    sink: Arc<dyn DeliverySink>,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a new session from a connected stream
    pub fn new<T: AsRef<str>>(hostname: T, stream: S, sink: Arc<dyn DeliverySink>) -> Self {
        Self {
            channel: LineChannel::new(stream),
            state_machine: StateMachine::new(hostname),
            sink,
        }
    }

    /// Run the session loop until QUIT or until the peer goes away.
    ///
    /// Commands are handled strictly one at a time: the next line is only
    /// read once the previous reply, including any delivery, has been sent.
    pub async fn serve(mut self) -> Result<()> {
        let greeting = self.state_machine.greeting();
        self.channel
            .send(&greeting)
            .await
            .context("failed to send greeting")?;

        loop {
            let Some(line) = self
                .channel
                .read_line()
                .await
                .context("failed to read from client")?
            else {
                tracing::info!("Received EOF in state {:?}", self.state_machine.state());
                return Ok(());
            };

            let response = match self.state_machine.handle_line(&line) {
                Ok(Reply::Silent) => continue,
                Ok(Reply::Send(response)) => response,
                Ok(Reply::Deliver(mail)) => {
                    let outcome = self.sink.deliver(&mail).await;
                    if outcome.is_ok() {
                        tracing::info!(
                            from = %mail.from,
                            to = %mail.to.join(", "),
                            lines = mail.data.len(),
                            "Message delivered"
                        );
                    }
                    self.state_machine.delivered(outcome)
                }
                Ok(Reply::Close(response)) => {
                    self.channel
                        .send(&response)
                        .await
                        .context("failed to send reply")?;
                    break;
                }
                Err(e) => {
                    tracing::warn!("Error processing command: {}", e);
                    Response::internal_error()
                }
            };

            self.channel
                .send(&response)
                .await
                .context("failed to send reply")?;
        }

        self.channel.shutdown().await.ok();
        Ok(())
    }
}
