use anyhow::{Context, Result};
use async_trait::async_trait;
use libsql_client::Statement;
use tokio::sync::{mpsc, oneshot};

use crate::delivery::{DeliveryError, DeliverySink};
use crate::Mail;

/// Database used when no URL is configured: `tmp-mail.db` in the system
/// temp directory.
pub fn default_url() -> String {
    let mut db_path = std::env::temp_dir();
    db_path.push("tmp-mail.db");
    format!("file://{}", db_path.display())
}

pub struct Client {
    db: libsql_client::client::Client,
}

impl Client {
    /// Connect to the libsql database at `url` (`file://` for a local
    /// database, `libsql://` or `https://` for a remote one) and make sure the
    /// `mail` table and its indexes exist.
    ///
    /// `LIBSQL_CLIENT_TOKEN`, when set, is used as the auth token.
    pub async fn new(url: &str) -> Result<Self> {
        let mut config = libsql_client::Config::new(url)
            .with_context(|| format!("invalid database URL {}", url))?;
        config.auth_token = std::env::var("LIBSQL_CLIENT_TOKEN").ok();

        let db = libsql_client::client::Client::from_config(config)
            .await
            .with_context(|| format!("failed to connect to {}", url))?;
        db.batch([
            "CREATE TABLE IF NOT EXISTS mail (date text, sender text, recipients text, data text)",
            "CREATE INDEX IF NOT EXISTS mail_date ON mail(date)",
            "CREATE INDEX IF NOT EXISTS mail_recipients ON mail(recipients)",
        ])
        .await
        .context("failed to prepare mail table")?;

        Ok(Self { db })
    }

    /// Insert one row for `mail`. Recipients are comma separated and the body
    /// lines are joined with CRLF.
    pub async fn replicate(&self, mail: &Mail) -> Result<()> {
        tracing::debug!("Replicating mail from {} to the database", mail.from);
        self.db
            .execute(Statement::with_args(
                "INSERT INTO mail (date, sender, recipients, data) VALUES (?, ?, ?, ?)",
                &[
                    mail.received.to_rfc3339(),
                    mail.from.clone(),
                    mail.to.join(", "),
                    mail.data.join("\r\n"),
                ],
            ))
            .await?;

        Ok(())
    }
}

struct Job {
    mail: Mail,
    done: oneshot::Sender<Result<()>>,
}

/// Delivery sink backed by the `mail` table.
///
/// The libsql client is owned by a dedicated thread with its own
/// single-threaded runtime; sessions hand it jobs over a channel and wait for
/// the result.
pub struct Database {
    jobs: mpsc::Sender<Job>,
}

impl Database {
    /// Start the worker and wait until the database is reachable.
    pub async fn open(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let (jobs, mut queue) = mpsc::channel::<Job>(64);
        let (ready_tx, ready_rx) = oneshot::channel::<Result<()>>();

        std::thread::Builder::new()
            .name("libsql".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        ready_tx.send(Err(e.into())).ok();
                        return;
                    }
                };

                runtime.block_on(async move {
                    let client = match Client::new(&url).await {
                        Ok(client) => {
                            tracing::info!("Storing mail in database {}", url);
                            ready_tx.send(Ok(())).ok();
                            client
                        }
                        Err(e) => {
                            ready_tx.send(Err(e)).ok();
                            return;
                        }
                    };

                    while let Some(Job { mail, done }) = queue.recv().await {
                        done.send(client.replicate(&mail).await).ok();
                    }
                    tracing::debug!("Database worker stopped");
                });
            })
            .context("failed to start database worker")?;

        ready_rx
            .await
            .context("database worker exited during startup")??;

        Ok(Self { jobs })
    }
}

#[async_trait]
impl DeliverySink for Database {
    async fn deliver(&self, mail: &Mail) -> Result<(), DeliveryError> {
        let (done, result) = oneshot::channel();
        self.jobs
            .send(Job {
                mail: mail.clone(),
                done,
            })
            .await
            .map_err(|_| DeliveryError::Unavailable)?;

        result.await.map_err(|_| DeliveryError::Unavailable)??;
        tracing::info!("Mail from {} stored in the database", mail.from);
        Ok(())
    }
}
