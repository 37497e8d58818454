use chrono::{DateTime, Utc};

use crate::Mail;

/// Transaction state accumulated between MAIL and the end of DATA.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Envelope {
    sender: Option<String>,
    recipients: Vec<String>,
    body: Vec<String>,
}

impl Envelope {
    /// Start a new transaction. Whatever the previous envelope held is gone.
    pub fn with_sender(sender: impl Into<String>) -> Self {
        Self {
            sender: Some(sender.into()),
            ..Default::default()
        }
    }

    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    #[cfg(test)]
    pub(crate) fn body(&self) -> &[String] {
        &self.body
    }

    /// Returns `false` and leaves the envelope untouched when no sender is set.
    pub fn add_recipient(&mut self, recipient: impl Into<String>) -> bool {
        if self.sender.is_none() {
            return false;
        }
        self.recipients.push(recipient.into());
        true
    }

    pub fn push_line(&mut self, line: String) {
        self.body.push(line);
    }

    pub fn discard_body(&mut self) {
        self.body.clear();
    }

    /// Snapshot the transaction for delivery. The body moves out; sender and
    /// recipients stay so that a failed delivery can be retried.
    pub fn take_mail(&mut self, received: DateTime<Utc>) -> Mail {
        Mail {
            from: self.sender.clone().unwrap_or_default(),
            to: self.recipients.clone(),
            data: std::mem::take(&mut self.body),
            received,
        }
    }
}
