//! SMTP reply parser.
//!
//! A reply is one or more lines shaped `<3-digit code><separator><text>`.
//! A `-` separator marks a continuation line; any other separator ends the
//! reply. A bare three-digit line is a final line with empty text.

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// One parsed reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyLine<'a> {
    /// Numeric code.
    pub code: ReplyCode,
    /// True when another line of the same reply follows.
    pub continues: bool,
    /// Text after the separator.
    pub text: &'a str,
}

/// Parses a single reply line.
///
/// Returns `None` if the line does not have the three-part shape.
#[must_use]
pub fn parse_line(line: &str) -> Option<ReplyLine<'_>> {
    let digits = line.get(..3)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let code = ReplyCode::new(digits.parse().ok()?);

    let rest = &line[3..];
    let mut chars = rest.chars();
    let Some(separator) = chars.next() else {
        return Some(ReplyLine {
            code,
            continues: false,
            text: "",
        });
    };

    Some(ReplyLine {
        code,
        continues: separator == '-',
        text: chars.as_str(),
    })
}

/// Collects lines until a complete reply has been seen.
#[derive(Debug, Default)]
pub struct ReplyAccumulator {
    lines: Vec<String>,
    texts: Vec<String>,
}

impl ReplyAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lines: Vec::new(),
            texts: Vec::new(),
        }
    }

    /// Feeds one line (without its terminator).
    ///
    /// Returns the finished reply once a final line arrives and resets the
    /// accumulator for the next reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolViolation`] when the line is malformed.
    pub fn push(&mut self, line: &str) -> Result<Option<Reply>> {
        self.lines.push(line.to_string());

        let Some(parsed) = parse_line(line) else {
            self.texts.clear();
            return Err(Error::ProtocolViolation {
                line: line.to_string(),
                lines: std::mem::take(&mut self.lines),
            });
        };

        self.texts.push(parsed.text.to_string());
        if parsed.continues {
            return Ok(None);
        }

        let lines = std::mem::take(&mut self.lines);
        let texts = std::mem::take(&mut self.texts);
        Ok(Some(Reply::new(parsed.code, texts, lines)))
    }

    /// Returns true if no line of the current reply has been seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Parses a complete list of lines into a reply.
///
/// # Errors
///
/// Returns [`Error::ProtocolViolation`] for a malformed line, or for a
/// list that ends on a continuation line.
pub fn parse_reply<S: AsRef<str>>(lines: &[S]) -> Result<Reply> {
    let mut acc = ReplyAccumulator::new();
    for line in lines {
        if let Some(reply) = acc.push(line.as_ref())? {
            return Ok(reply);
        }
    }
    let last = lines.last().map(|l| l.as_ref().to_string()).unwrap_or_default();
    Err(Error::ProtocolViolation {
        line: last,
        lines: lines.iter().map(|l| l.as_ref().to_string()).collect(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn two_line_reply_returns_final_text() {
        let reply = parse_reply(&["250-first", "250 second"]).unwrap();
        assert_eq!(reply.code, ReplyCode::OK);
        assert_eq!(reply.message, vec!["first", "second"]);
        assert_eq!(reply.lines, vec!["250-first", "250 second"]);
        assert_eq!(reply.text(), "second");
        assert!(reply.is_success());
    }

    #[test]
    fn accumulator_waits_for_final_line() {
        let mut acc = ReplyAccumulator::new();
        assert!(acc.push("250-smtp.example.com").unwrap().is_none());
        assert!(acc.push("250-PIPELINING").unwrap().is_none());
        let reply = acc.push("250 STARTTLS").unwrap().unwrap();
        assert_eq!(reply.message.len(), 3);
        assert!(acc.is_empty());
    }

    #[test]
    fn bare_code_is_final() {
        let reply = parse_reply(&["354"]).unwrap();
        assert_eq!(reply.code, ReplyCode::START_DATA);
        assert_eq!(reply.text(), "");
    }

    #[test]
    fn non_dash_separator_ends_reply() {
        let line = parse_line("220\tready").unwrap();
        assert!(!line.continues);
        assert_eq!(line.text, "ready");
    }

    #[test]
    fn malformed_line_is_protocol_violation() {
        let err = parse_reply(&["hello there"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
        assert_eq!(err.reply_lines(), ["hello there".to_string()]);
    }

    #[test]
    fn short_and_non_numeric_lines_are_rejected() {
        assert!(parse_line("25").is_none());
        assert!(parse_line("2x0 OK").is_none());
        assert!(parse_line("").is_none());
    }

    #[test]
    fn malformed_continuation_keeps_prior_lines() {
        let mut acc = ReplyAccumulator::new();
        acc.push("250-first").unwrap();
        let err = acc.push("garbage").unwrap_err();
        assert_eq!(err.reply_lines().len(), 2);
    }

    #[test]
    fn unterminated_reply_is_protocol_violation() {
        let err = parse_reply(&["250-first"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
    }

    #[test]
    fn multibyte_text_after_code() {
        let reply = parse_reply(&["250 Grüße"]).unwrap();
        assert_eq!(reply.text(), "Grüße");
    }

    proptest::proptest! {
        #[test]
        fn well_formed_lines_parse(code in 200u16..600, text in "[ -~]{0,40}", more: bool) {
            let sep = if more { '-' } else { ' ' };
            let line = format!("{code}{sep}{text}");
            let parsed = parse_line(&line).unwrap();
            proptest::prop_assert_eq!(parsed.code.as_u16(), code);
            proptest::prop_assert_eq!(parsed.continues, more);
            proptest::prop_assert_eq!(parsed.text, text.as_str());
        }
    }
}
