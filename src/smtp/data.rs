/// Outcome of feeding one line received during DATA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyLine {
    /// A body line with transparency removed.
    Text(String),
    /// The lone `.` that closes the body. It is never part of the message.
    End,
}

/// Undo dot-stuffing for a single line: a line that is exactly `.` ends the
/// body, any other line starting with `.` loses exactly one leading dot.
pub fn unstuff(line: &str) -> BodyLine {
    if line == "." {
        return BodyLine::End;
    }

    match line.strip_prefix('.') {
        Some(rest) => BodyLine::Text(rest.to_string()),
        None => BodyLine::Text(line.to_string()),
    }
}

/// Apply dot-stuffing to an outgoing body line.
pub fn stuff(line: &str) -> String {
    if line.starts_with('.') {
        format!(".{}", line)
    } else {
        line.to_string()
    }
}
