use async_trait::async_trait;
use thiserror::Error;

use crate::Mail;

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),

    #[error("storage worker is no longer running")]
    Unavailable,
}

/// Destination for completed messages.
///
/// A session calls `deliver` exactly once for every DATA phase that reaches
/// its terminator and never otherwise. Implementations shared between
/// sessions are responsible for their own synchronisation.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn deliver(&self, mail: &Mail) -> Result<(), DeliveryError>;
}
