use std::sync::Arc;

use anyhow::{Context, Result};
use structopt::StructOpt;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use tmp_smtpd::config::{Config, Storage};
use tmp_smtpd::database::{self, Database};
use tmp_smtpd::delivery::DeliverySink;
use tmp_smtpd::logging;
use tmp_smtpd::smtp::server::Server;
use tmp_smtpd::store::FileStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_args();
    logging::init(config.log_level);

    let sink: Arc<dyn DeliverySink> = match config.storage {
        Storage::Files => Arc::new(FileStore::new(&config.mail_dir).await?),
        Storage::Database => {
            let url = match &config.database_url {
                Some(url) => url.clone(),
                None => {
                    let url = database::default_url();
                    tracing::warn!(
                        "LIBSQL_CLIENT_URL not set, using default local database {}",
                        url
                    );
                    url
                }
            };
            Arc::new(Database::open(url).await?)
        }
    };

    let listener = TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown requested, no longer accepting connections");
                    shutdown.cancel();
                }
                Err(e) => tracing::error!("Unable to listen for shutdown signal: {}", e),
            }
        }
    });

    Server::new(&config.hostname, sink).run(listener, shutdown).await
}
