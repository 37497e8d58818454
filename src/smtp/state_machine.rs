use chrono::Utc;
use thiserror::Error;

use crate::delivery::DeliveryError;
use crate::Mail;

use super::command::{parse_path, Command, Verb};
use super::data::{unstuff, BodyLine};
use super::envelope::Envelope;
use super::response::Response;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Connected,
    Greeted,
    MailFrom,
    RcptTo,
    InData,
    TransactionComplete,
    Closed,
}

impl Verb {
    /// Which states a verb may be issued in. Everything not listed here is
    /// accepted in any state that still reads commands.
    fn permitted_in(&self, state: State) -> bool {
        match self {
            Verb::Mail => matches!(state, State::Greeted | State::TransactionComplete),
            Verb::Rcpt => matches!(state, State::MailFrom | State::RcptTo),
            Verb::Data => state == State::RcptTo,
            Verb::Helo
            | Verb::Ehlo
            | Verb::Rset
            | Verb::Quit
            | Verb::Noop
            | Verb::Unknown(_) => true,
        }
    }
}

/// What the connection driver has to do after a line was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Nothing is sent back: blank command lines and body lines.
    Silent,
    Send(Response),
    /// The body is complete. Hand the mail to the sink and report the outcome
    /// through [`StateMachine::delivered`] before reading the next line.
    Deliver(Mail),
    /// Send the response, then close the connection.
    Close(Response),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("line received after the session was closed")]
    Closed,

    #[error("line received while the previous message awaits delivery")]
    DeliveryPending,
}

/// State machine which is capable of handling SMTP commands
/// for receiving mail.
///
/// # Usage
///
/// Feed every line read from the client to `handle_line` and act on the
/// returned [`Reply`]. The machine performs no I/O.
pub struct StateMachine {
    state: State,
    envelope: Envelope,
    hostname: String,
    pending_delivery: bool,
}

impl StateMachine {
    pub fn new(hostname: impl AsRef<str>) -> Self {
        Self {
            state: State::Connected,
            envelope: Envelope::default(),
            hostname: hostname.as_ref().to_string(),
            pending_delivery: false,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn greeting(&self) -> Response {
        Response::greeting(&self.hostname)
    }

    /// Handle a single line from the client.
    pub fn handle_line(&mut self, line: &str) -> Result<Reply, SessionError> {
        tracing::trace!("Received {:?} in state {:?}", line, self.state);

        if self.pending_delivery {
            return Err(SessionError::DeliveryPending);
        }

        match self.state {
            State::Closed => Err(SessionError::Closed),
            State::InData => Ok(self.receive_body(line)),
            _ => Ok(match Command::parse(line) {
                Some(command) => self.dispatch(command),
                None => Reply::Silent,
            }),
        }
    }

    fn dispatch(&mut self, command: Command<'_>) -> Reply {
        if !command.verb.permitted_in(self.state) {
            tracing::debug!("{} rejected in state {:?}", command.verb, self.state);
            return Reply::Send(Response::bad_sequence());
        }

        match command.verb {
            Verb::Helo | Verb::Ehlo => self.hello(command.argument),
            Verb::Mail => self.mail(command.argument),
            Verb::Rcpt => self.rcpt(command.argument),
            Verb::Data => {
                tracing::debug!("Receiving data");
                self.envelope.discard_body();
                self.state = State::InData;
                Reply::Send(Response::start_input())
            }
            Verb::Rset => {
                tracing::debug!("Resetting transaction");
                self.envelope = Envelope::default();
                self.state = State::Greeted;
                Reply::Send(Response::ok())
            }
            Verb::Quit => {
                if self.envelope.sender().is_some() {
                    tracing::warn!("Received QUIT with an unfinished transaction");
                }
                self.state = State::Closed;
                Reply::Close(Response::closing(&self.hostname))
            }
            Verb::Noop => Reply::Send(Response::ok()),
            Verb::Unknown(verb) => {
                tracing::debug!("Unrecognised command {}", verb);
                Reply::Send(Response::not_recognized(verb))
            }
        }
    }

    fn hello(&mut self, domain: &str) -> Reply {
        if domain.is_empty() {
            return Reply::Send(Response::syntax_error(
                "Syntax error in parameters or arguments",
            ));
        }

        tracing::debug!("Greeted by {}", domain);
        self.envelope = Envelope::default();
        self.state = State::Greeted;
        Reply::Send(Response::hello(domain))
    }

    fn mail(&mut self, argument: &str) -> Reply {
        let Some(from) = parse_path(argument, "FROM") else {
            return Reply::Send(Response::syntax_error("Syntax error in MAIL FROM command"));
        };

        tracing::debug!("FROM: {}", from);
        self.envelope = Envelope::with_sender(from);
        self.state = State::MailFrom;
        Reply::Send(Response::ok())
    }

    fn rcpt(&mut self, argument: &str) -> Reply {
        let Some(to) = parse_path(argument, "TO") else {
            return Reply::Send(Response::syntax_error("Syntax error in RCPT TO command"));
        };

        if !self.envelope.add_recipient(to) {
            return Reply::Send(Response::bad_sequence());
        }

        tracing::debug!("TO: {}", to);
        self.state = State::RcptTo;
        Reply::Send(Response::ok())
    }

    fn receive_body(&mut self, line: &str) -> Reply {
        match unstuff(line) {
            BodyLine::Text(text) => {
                self.envelope.push_line(text);
                Reply::Silent
            }
            BodyLine::End => {
                let mail = self.envelope.take_mail(Utc::now());
                tracing::trace!(
                    "Received data: FROM: {} TO: {} LINES: {}",
                    mail.from,
                    mail.to.join(", "),
                    mail.data.len()
                );
                self.pending_delivery = true;
                Reply::Deliver(mail)
            }
        }
    }

    /// Record the sink's verdict on the mail returned by [`Reply::Deliver`].
    ///
    /// On failure the transaction stays open at RCPT with its addresses so the
    /// client can retry DATA or RSET.
    pub fn delivered(&mut self, outcome: Result<(), DeliveryError>) -> Response {
        self.pending_delivery = false;

        match outcome {
            Ok(()) => {
                self.envelope = Envelope::default();
                self.state = State::TransactionComplete;
                Response::accepted()
            }
            Err(e) => {
                tracing::warn!("Delivery failed: {}", e);
                self.envelope.discard_body();
                self.state = State::RcptTo;
                Response::local_error()
            }
        }
    }
}
