use std::fmt;

/// A single reply line, `<code> <text>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub code: u16,
    pub text: String,
}

impl Response {
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    pub fn greeting(hostname: &str) -> Self {
        Self::new(220, format!("{} SMTP Server Ready", hostname))
    }

    pub fn closing(hostname: &str) -> Self {
        Self::new(221, format!("{} closing connection", hostname))
    }

    pub fn ok() -> Self {
        Self::new(250, "OK")
    }

    pub fn hello(domain: &str) -> Self {
        Self::new(250, format!("Hello {}, pleased to meet you", domain))
    }

    pub fn accepted() -> Self {
        Self::new(250, "OK: Message accepted for delivery")
    }

    pub fn start_input() -> Self {
        Self::new(354, "Start mail input; end with <CRLF>.<CRLF>")
    }

    pub fn local_error() -> Self {
        Self::new(451, "Requested action aborted: local error in processing")
    }

    pub fn internal_error() -> Self {
        Self::new(500, "Internal server error")
    }

    pub fn not_recognized(verb: impl fmt::Display) -> Self {
        Self::new(500, format!("Command '{}' not recognized", verb))
    }

    pub fn syntax_error(text: &str) -> Self {
        Self::new(501, text)
    }

    pub fn bad_sequence() -> Self {
        Self::new(503, "Bad sequence of commands")
    }

    /// Wire form, CRLF terminated.
    pub fn to_line(&self) -> String {
        format!("{}\r\n", self)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        assert_eq!(Response::ok().to_line(), "250 OK\r\n");
        assert_eq!(
            Response::closing("mx.test").to_string(),
            "221 mx.test closing connection"
        );
        assert_eq!(
            Response::not_recognized("FOO").to_string(),
            "500 Command 'FOO' not recognized"
        );
    }
}
