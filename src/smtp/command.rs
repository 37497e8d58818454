use std::fmt;

/// Command verbs understood by the server. Anything else is kept, upper-cased,
/// in `Unknown` so that it can be echoed back in the 500 reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Helo,
    Ehlo,
    Mail,
    Rcpt,
    Data,
    Rset,
    Quit,
    Noop,
    Unknown(String),
}

impl Verb {
    fn from_token(token: &str) -> Self {
        let upper = token.to_ascii_uppercase();
        match upper.as_str() {
            "HELO" => Verb::Helo,
            "EHLO" => Verb::Ehlo,
            "MAIL" => Verb::Mail,
            "RCPT" => Verb::Rcpt,
            "DATA" => Verb::Data,
            "RSET" => Verb::Rset,
            "QUIT" => Verb::Quit,
            "NOOP" => Verb::Noop,
            _ => Verb::Unknown(upper),
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verb::Helo => "HELO",
            Verb::Ehlo => "EHLO",
            Verb::Mail => "MAIL",
            Verb::Rcpt => "RCPT",
            Verb::Data => "DATA",
            Verb::Rset => "RSET",
            Verb::Quit => "QUIT",
            Verb::Noop => "NOOP",
            Verb::Unknown(verb) => verb,
        })
    }
}

/// One command line split into its verb and the untouched remainder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command<'a> {
    pub verb: Verb,
    /// Everything after the first run of whitespace following the verb, with
    /// its original letter case.
    pub argument: &'a str,
    pub raw: &'a str,
}

impl<'a> Command<'a> {
    /// Split `line` on the first run of whitespace. Blank lines yield `None`
    /// and must be ignored without a reply.
    pub fn parse(line: &'a str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        let (token, argument) = match trimmed.find(char::is_whitespace) {
            Some(at) => (&trimmed[..at], trimmed[at..].trim_start()),
            None => (trimmed, ""),
        };

        Some(Self {
            verb: Verb::from_token(token),
            argument,
            raw: line,
        })
    }
}

/// Extract the address from a `FROM:<addr>` / `TO:<addr>` argument.
///
/// The keyword is matched case-insensitively, whitespace is allowed between
/// the colon and `<`, and the capture is everything up to the first `>`.
/// `<>` yields an empty address, which is the null reverse-path used by
/// bounces. Anything after the closing `>` is ignored.
pub fn parse_path<'a>(argument: &'a str, keyword: &str) -> Option<&'a str> {
    let head = argument.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }

    let rest = argument[keyword.len()..].strip_prefix(':')?;
    let rest = rest.trim_start().strip_prefix('<')?;
    let end = rest.find('>')?;

    Some(&rest[..end])
}
