use std::path::PathBuf;
use std::str::FromStr;

use structopt::StructOpt;
use tracing::Level;

/// Where delivered messages end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Files,
    Database,
}

impl FromStr for Storage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "files" => Ok(Storage::Files),
            "database" => Ok(Storage::Database),
            other => Err(format!("unknown storage '{}', expected 'files' or 'database'", other)),
        }
    }
}

#[derive(Debug, Clone, StructOpt)]
#[structopt(
    name = "tmp-smtpd",
    about = "A minimal SMTP server that stores every message it receives"
)]
pub struct Config {
    /// Address to accept SMTP connections on
    #[structopt(long, env = "SMTP_LISTEN", default_value = "0.0.0.0:25")]
    pub listen: String,

    /// Server name announced in the greeting and closing replies
    #[structopt(long, env = "SMTP_HOSTNAME", default_value = "localhost")]
    pub hostname: String,

    /// Storage backend for received mail: files or database
    #[structopt(long, env = "SMTP_STORAGE", default_value = "files")]
    pub storage: Storage,

    /// Directory used by the files storage
    #[structopt(long, env = "SMTP_MAIL_DIR", default_value = "emails", parse(from_os_str))]
    pub mail_dir: PathBuf,

    /// libsql URL used by the database storage (defaults to a local file in
    /// the temp directory)
    #[structopt(long, env = "LIBSQL_CLIENT_URL")]
    pub database_url: Option<String>,

    /// Maximum log level (error, warn, info, debug, trace)
    #[structopt(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: Level,
}
