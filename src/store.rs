use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::delivery::{DeliveryError, DeliverySink};
use crate::Mail;

/// Stores every delivered message as a text file in one directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open the store, creating the directory if needed.
    pub async fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("failed to create mail directory {}", dir.display()))?;

        tracing::info!("Storing mail in {}", dir.display());
        Ok(Self { dir })
    }

    #[cfg(test)]
    fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist `mail` and return the path of the new file.
    pub async fn save(&self, mail: &Mail) -> std::io::Result<PathBuf> {
        let stem = format!("email_{}", mail.received.format("%Y%m%d_%H%M%S_%3f"));

        // Two sessions finishing within the same millisecond get distinct
        // files; nothing is ever overwritten.
        let mut attempt = 0;
        let (path, mut file) = loop {
            let name = match attempt {
                0 => format!("{}.txt", stem),
                n => format!("{}_{}.txt", stem, n),
            };
            let path = self.dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e),
            }
        };

        file.write_all(render(mail).as_bytes()).await?;
        file.flush().await?;

        Ok(path)
    }
}

/// Headers, a blank line, then the body lines verbatim.
fn render(mail: &Mail) -> String {
    let mut content = String::new();
    content.push_str(&format!("From: {}\n", mail.from));
    content.push_str(&format!("To: {}\n", mail.to.join(", ")));
    content.push_str(&format!("Received: {}\n", mail.received.to_rfc2822()));
    content.push('\n');
    for line in &mail.data {
        content.push_str(line);
        content.push('\n');
    }
    content
}

#[async_trait]
impl DeliverySink for FileStore {
    async fn deliver(&self, mail: &Mail) -> Result<(), DeliveryError> {
        let path = self.save(mail).await?;
        tracing::info!("Email saved: {}", path.display());
        Ok(())
    }
}
