pub mod config;
pub mod database;
pub mod delivery;
pub mod logging;
pub mod smtp;
pub mod store;

use chrono::{DateTime, Utc};

/// A message whose body has been fully received and which is ready to be
/// handed to a [`delivery::DeliverySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub from: String,
    pub to: Vec<String>,
    /// Body lines after dot-unstuffing, without line terminators.
    pub data: Vec<String>,
    pub received: DateTime<Utc>,
}
