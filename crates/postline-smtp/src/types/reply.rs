//! SMTP reply types.

use std::fmt;

/// A complete (possibly multi-line) SMTP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Reply code of the final line.
    pub code: ReplyCode,
    /// Text of each line, code and separator stripped.
    pub message: Vec<String>,
    /// Raw lines as received, without line terminators.
    pub lines: Vec<String>,
}

impl Reply {
    /// Creates a reply from its code, texts and raw lines.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(code: ReplyCode, message: Vec<String>, lines: Vec<String>) -> Self {
        Self {
            code,
            message,
            lines,
        }
    }

    /// Returns true if this is a success reply (2xx).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// Returns the text of the final line.
    #[must_use]
    pub fn text(&self) -> &str {
        self.message.last().map_or("", String::as_str)
    }

    /// Returns all texts joined with newlines.
    #[must_use]
    pub fn message_text(&self) -> String {
        self.message.join("\n")
    }

    /// Returns true if the code is one of `expected`.
    #[must_use]
    pub fn is_one_of(&self, expected: &[ReplyCode]) -> bool {
        expected.contains(&self.code)
    }
}

/// SMTP reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplyCode(u16);

impl ReplyCode {
    /// 220 Service ready
    pub const SERVICE_READY: Self = Self(220);
    /// 221 Service closing transmission channel
    pub const CLOSING: Self = Self(221);
    /// 235 Authentication succeeded
    pub const AUTH_SUCCESS: Self = Self(235);
    /// 250 Requested mail action okay, completed
    pub const OK: Self = Self(250);
    /// 251 User not local; will forward
    pub const FORWARD: Self = Self(251);
    /// 252 Cannot verify user, will attempt delivery
    pub const CANNOT_VERIFY: Self = Self(252);
    /// 334 Continue with authentication
    pub const AUTH_CONTINUE: Self = Self(334);
    /// 354 Start mail input
    pub const START_DATA: Self = Self(354);

    /// Creates a new reply code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns true if this is a success code (2xx).
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    /// Returns true if this is an intermediate reply (3xx).
    #[must_use]
    pub const fn is_intermediate(self) -> bool {
        self.0 >= 300 && self.0 < 400
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub const fn is_transient(self) -> bool {
        self.0 >= 400 && self.0 < 500
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        self.0 >= 500 && self.0 < 600
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn reply(code: u16, texts: &[&str]) -> Reply {
        let message: Vec<String> = texts.iter().map(ToString::to_string).collect();
        let lines = message.iter().map(|t| format!("{code} {t}")).collect();
        Reply::new(ReplyCode::new(code), message, lines)
    }

    #[test]
    fn code_classes() {
        assert!(ReplyCode::OK.is_success());
        assert!(ReplyCode::AUTH_CONTINUE.is_intermediate());
        assert!(ReplyCode::START_DATA.is_intermediate());
        assert!(ReplyCode::new(421).is_transient());
        assert!(ReplyCode::new(535).is_permanent());
        assert!(!ReplyCode::new(550).is_success());
    }

    #[test]
    fn display_is_numeric() {
        assert_eq!(ReplyCode::OK.to_string(), "250");
        assert_eq!(ReplyCode::new(554).to_string(), "554");
    }

    #[test]
    fn text_is_final_line() {
        let r = reply(250, &["first", "second"]);
        assert_eq!(r.text(), "second");
        assert_eq!(r.message_text(), "first\nsecond");
    }

    #[test]
    fn text_of_empty_reply() {
        let r = Reply::new(ReplyCode::OK, Vec::new(), Vec::new());
        assert_eq!(r.text(), "");
    }

    #[test]
    fn expected_code_membership() {
        let r = reply(251, &["forwarding"]);
        assert!(r.is_one_of(&[ReplyCode::OK, ReplyCode::FORWARD]));
        assert!(!r.is_one_of(&[ReplyCode::OK]));
    }
}
