pub mod channel;
pub mod command;
pub mod data;
pub mod envelope;
pub mod response;
pub mod server;
pub mod session;
pub mod state_machine;

#[cfg(test)]
mod tests {
    use super::state_machine::{Reply, SessionError, State, StateMachine};
    use crate::delivery::DeliveryError;

    const ALL_STATES: [State; 7] = [
        State::Connected,
        State::Greeted,
        State::MailFrom,
        State::RcptTo,
        State::InData,
        State::TransactionComplete,
        State::Closed,
    ];

    fn code(reply: Reply) -> u16 {
        match reply {
            Reply::Send(response) | Reply::Close(response) => response.code,
            other => panic!("expected a response, got {:?}", other),
        }
    }

    fn text(reply: Reply) -> String {
        match reply {
            Reply::Send(response) | Reply::Close(response) => response.to_string(),
            other => panic!("expected a response, got {:?}", other),
        }
    }

    /// Drive a fresh machine into `state` through legal commands.
    fn machine_in(state: State) -> StateMachine {
        let mut sm = StateMachine::new("mx.test");
        let script: &[&str] = match state {
            State::Connected => &[],
            State::Greeted => &["HELO a.com"],
            State::MailFrom => &["HELO a.com", "MAIL FROM:<x@a.com>"],
            State::RcptTo => &["HELO a.com", "MAIL FROM:<x@a.com>", "RCPT TO:<y@b.com>"],
            State::InData => &[
                "HELO a.com",
                "MAIL FROM:<x@a.com>",
                "RCPT TO:<y@b.com>",
                "DATA",
            ],
            State::TransactionComplete => &[
                "HELO a.com",
                "MAIL FROM:<x@a.com>",
                "RCPT TO:<y@b.com>",
                "DATA",
                ".",
            ],
            State::Closed => &["QUIT"],
        };

        for line in script {
            if let Reply::Deliver(_) = sm.handle_line(line).unwrap() {
                sm.delivered(Ok(()));
            }
        }
        assert_eq!(sm.state(), state);
        sm
    }

    #[test]
    fn test_regular_flow() {
        let mut sm = StateMachine::new("mx.test");
        assert_eq!(sm.state(), State::Connected);
        assert_eq!(sm.greeting().to_string(), "220 mx.test SMTP Server Ready");

        let reply = sm.handle_line("HELO a.com").unwrap();
        assert_eq!(text(reply), "250 Hello a.com, pleased to meet you");
        assert_eq!(sm.state(), State::Greeted);

        assert_eq!(text(sm.handle_line("MAIL FROM:<x@a.com>").unwrap()), "250 OK");
        assert_eq!(sm.state(), State::MailFrom);

        assert_eq!(text(sm.handle_line("RCPT TO:<y@b.com>").unwrap()), "250 OK");
        assert_eq!(sm.state(), State::RcptTo);

        assert_eq!(
            text(sm.handle_line("DATA").unwrap()),
            "354 Start mail input; end with <CRLF>.<CRLF>"
        );
        assert_eq!(sm.state(), State::InData);

        assert_eq!(sm.handle_line("Hi").unwrap(), Reply::Silent);
        let mail = match sm.handle_line(".").unwrap() {
            Reply::Deliver(mail) => mail,
            other => panic!("expected delivery, got {:?}", other),
        };
        assert_eq!(mail.from, "x@a.com");
        assert_eq!(mail.to, ["y@b.com"]);
        assert_eq!(mail.data, ["Hi"]);

        let response = sm.delivered(Ok(()));
        assert_eq!(response.to_string(), "250 OK: Message accepted for delivery");
        assert_eq!(sm.state(), State::TransactionComplete);

        assert_eq!(
            text(sm.handle_line("QUIT").unwrap()),
            "221 mx.test closing connection"
        );
        assert_eq!(sm.state(), State::Closed);
    }

    #[test]
    fn test_no_greeting() {
        let mut sm = StateMachine::new("mx.test");

        for command in ["MAIL FROM:<local@example.com>", "RCPT TO:<y@b.com>", "DATA"] {
            assert_eq!(code(sm.handle_line(command).unwrap()), 503, "{}", command);
            assert_eq!(sm.state(), State::Connected);
        }
    }

    #[test]
    fn test_mail_only_after_greeting_or_completion() {
        for state in ALL_STATES {
            if matches!(state, State::InData | State::Closed) {
                continue;
            }
            let mut sm = machine_in(state);
            let sender_before = sm.envelope().sender().map(str::to_string);
            let reply = sm.handle_line("MAIL FROM:<new@a.com>").unwrap();

            if matches!(state, State::Greeted | State::TransactionComplete) {
                assert_eq!(code(reply), 250);
                assert_eq!(sm.envelope().sender(), Some("new@a.com"));
            } else {
                assert_eq!(code(reply), 503, "{:?}", state);
                assert_eq!(sm.state(), state);
                assert_eq!(sm.envelope().sender().map(str::to_string), sender_before);
            }
        }
    }

    #[test]
    fn test_rcpt_only_after_mail() {
        for state in ALL_STATES {
            if matches!(state, State::InData | State::Closed) {
                continue;
            }
            let mut sm = machine_in(state);
            let before = sm.envelope().recipients().to_vec();
            let reply = sm.handle_line("RCPT TO:<z@c.com>").unwrap();

            if matches!(state, State::MailFrom | State::RcptTo) {
                assert_eq!(code(reply), 250);
                assert_eq!(sm.envelope().recipients().last().unwrap(), "z@c.com");
            } else {
                assert_eq!(code(reply), 503, "{:?}", state);
                assert_eq!(sm.state(), state);
                assert_eq!(sm.envelope().recipients(), before.as_slice());
            }
        }
    }

    #[test]
    fn test_data_only_after_rcpt() {
        for state in ALL_STATES {
            if matches!(state, State::InData | State::Closed) {
                continue;
            }
            let mut sm = machine_in(state);
            let reply = sm.handle_line("DATA").unwrap();

            if state == State::RcptTo {
                assert_eq!(code(reply), 354);
                assert_eq!(sm.state(), State::InData);
            } else {
                assert_eq!(code(reply), 503, "{:?}", state);
                assert_eq!(sm.state(), state);
            }
        }
    }

    #[test]
    fn test_rset_from_any_command_state() {
        for state in ALL_STATES {
            if matches!(state, State::InData | State::Closed) {
                continue;
            }
            let mut sm = machine_in(state);
            assert_eq!(text(sm.handle_line("RSET").unwrap()), "250 OK");
            assert_eq!(sm.state(), State::Greeted);
            assert_eq!(sm.envelope().sender(), None);
            assert!(sm.envelope().recipients().is_empty());
            assert!(sm.envelope().body().is_empty());
        }
    }

    #[test]
    fn test_unknown_command_keeps_state() {
        for state in ALL_STATES {
            if matches!(state, State::InData | State::Closed) {
                continue;
            }
            let mut sm = machine_in(state);
            assert_eq!(
                text(sm.handle_line("foo bar").unwrap()),
                "500 Command 'FOO' not recognized"
            );
            assert_eq!(sm.state(), state);
        }
    }

    #[test]
    fn test_noop_and_blank_lines() {
        let mut sm = machine_in(State::MailFrom);
        assert_eq!(text(sm.handle_line("noop").unwrap()), "250 OK");
        assert_eq!(sm.handle_line("   ").unwrap(), Reply::Silent);
        assert_eq!(sm.state(), State::MailFrom);
    }

    #[test]
    fn test_helo_requires_domain() {
        let mut sm = StateMachine::new("mx.test");
        assert_eq!(
            text(sm.handle_line("EHLO").unwrap()),
            "501 Syntax error in parameters or arguments"
        );
        assert_eq!(sm.state(), State::Connected);

        assert_eq!(
            text(sm.handle_line("ehlo Client.Example").unwrap()),
            "250 Hello Client.Example, pleased to meet you"
        );
        assert_eq!(sm.state(), State::Greeted);
    }

    #[test]
    fn test_helo_discards_transaction() {
        let mut sm = machine_in(State::RcptTo);
        assert_eq!(code(sm.handle_line("HELO again.com").unwrap()), 250);
        assert_eq!(sm.state(), State::Greeted);
        assert_eq!(sm.envelope().sender(), None);
        assert!(sm.envelope().recipients().is_empty());
    }

    #[test]
    fn test_malformed_addresses() {
        let mut sm = machine_in(State::Greeted);
        assert_eq!(
            text(sm.handle_line("MAIL FROM:bad").unwrap()),
            "501 Syntax error in MAIL FROM command"
        );
        assert_eq!(sm.state(), State::Greeted);
        assert_eq!(sm.envelope().sender(), None);

        let mut sm = machine_in(State::MailFrom);
        assert_eq!(
            text(sm.handle_line("RCPT TO:y@b.com").unwrap()),
            "501 Syntax error in RCPT TO command"
        );
        assert_eq!(sm.state(), State::MailFrom);
        assert!(sm.envelope().recipients().is_empty());
    }

    #[test]
    fn test_null_sender_is_accepted() {
        let mut sm = machine_in(State::Greeted);
        assert_eq!(text(sm.handle_line("MAIL FROM:<>").unwrap()), "250 OK");
        assert_eq!(sm.envelope().sender(), Some(""));
        assert_eq!(sm.state(), State::MailFrom);
    }

    #[test]
    fn test_address_case_is_preserved() {
        let mut sm = machine_in(State::Greeted);
        sm.handle_line("mail from: <Bob.Smith@Example.COM>").unwrap();
        sm.handle_line("Rcpt To:<Alice@Example.org>").unwrap();
        assert_eq!(sm.envelope().sender(), Some("Bob.Smith@Example.COM"));
        assert_eq!(sm.envelope().recipients(), ["Alice@Example.org"]);
    }

    #[test]
    fn test_dot_stuffing_in_body() {
        let mut sm = machine_in(State::InData);
        for line in ["..hello", "", "plain", "..", "DATA", "QUIT"] {
            assert_eq!(sm.handle_line(line).unwrap(), Reply::Silent);
        }
        assert_eq!(sm.state(), State::InData);

        match sm.handle_line(".").unwrap() {
            Reply::Deliver(mail) => {
                assert_eq!(mail.data, [".hello", "", "plain", ".", "DATA", "QUIT"])
            }
            other => panic!("expected delivery, got {:?}", other),
        }
    }

    #[test]
    fn test_mail_after_completion_starts_fresh_envelope() {
        let mut sm = machine_in(State::TransactionComplete);
        assert!(sm.envelope().recipients().is_empty());

        sm.handle_line("MAIL FROM:<second@a.com>").unwrap();
        assert_eq!(sm.state(), State::MailFrom);
        assert_eq!(sm.envelope().sender(), Some("second@a.com"));
        assert!(sm.envelope().recipients().is_empty());
        assert!(sm.envelope().body().is_empty());

        // The previous recipient must not leak into the new transaction.
        sm.handle_line("RCPT TO:<other@c.com>").unwrap();
        sm.handle_line("DATA").unwrap();
        match sm.handle_line(".").unwrap() {
            Reply::Deliver(mail) => {
                assert_eq!(mail.from, "second@a.com");
                assert_eq!(mail.to, ["other@c.com"]);
                assert!(mail.data.is_empty());
            }
            other => panic!("expected delivery, got {:?}", other),
        }
    }

    #[test]
    fn test_failed_delivery_keeps_transaction() {
        let mut sm = machine_in(State::InData);
        sm.handle_line("Hi").unwrap();
        assert!(matches!(sm.handle_line(".").unwrap(), Reply::Deliver(_)));

        let response = sm.delivered(Err(DeliveryError::Unavailable));
        assert_eq!(
            response.to_string(),
            "451 Requested action aborted: local error in processing"
        );
        assert_eq!(sm.state(), State::RcptTo);
        assert_eq!(sm.envelope().sender(), Some("x@a.com"));
        assert_eq!(sm.envelope().recipients(), ["y@b.com"]);
        assert!(sm.envelope().body().is_empty());
    }

    #[test]
    fn test_lines_while_delivery_pending() {
        let mut sm = machine_in(State::InData);
        assert!(matches!(sm.handle_line(".").unwrap(), Reply::Deliver(_)));
        assert_eq!(sm.handle_line("NOOP"), Err(SessionError::DeliveryPending));

        sm.delivered(Ok(()));
        assert_eq!(code(sm.handle_line("NOOP").unwrap()), 250);
    }

    #[test]
    fn test_closed_session_rejects_lines() {
        let mut sm = machine_in(State::Closed);
        assert_eq!(sm.handle_line("NOOP"), Err(SessionError::Closed));
    }

    #[test]
    fn test_quit_from_any_state() {
        for state in ALL_STATES {
            if matches!(state, State::InData | State::Closed) {
                continue;
            }
            let mut sm = machine_in(state);
            assert!(matches!(sm.handle_line("QUIT").unwrap(), Reply::Close(_)));
            assert_eq!(sm.state(), State::Closed);
        }
    }
}
