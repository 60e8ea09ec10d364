//! Search criteria and their wire form.

use std::fmt;

use chrono::NaiveDate;

/// Format for dates in search keys (`1-Feb-2024`).
const DATE_FORMAT: &str = "%-d-%b-%Y";

/// A search criteria tree.
///
/// [`Display`](fmt::Display) renders the canonical query text, which is
/// also used as a cache-key component. [`SearchCriteria::to_wire`] renders
/// the bytes sent to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    /// All messages.
    All,
    /// `From:` contains text.
    From(String),
    /// `To:` contains text.
    To(String),
    /// `Cc:` contains text.
    Cc(String),
    /// `Subject:` contains text.
    Subject(String),
    /// Body contains text.
    Body(String),
    /// Header or body contains text.
    Text(String),
    /// Named header field contains text.
    Header(String, String),
    /// Internal date on or after the day.
    Since(NaiveDate),
    /// Internal date before the day.
    Before(NaiveDate),
    /// Every criterion matches. Empty means all messages.
    And(Vec<Self>),
    /// Any criterion matches.
    Or(Vec<Self>),
}

impl SearchCriteria {
    /// Renders the criteria for the wire.
    ///
    /// With `literals` set, non-ASCII values go out as non-synchronizing
    /// literals (`{n+}` CRLF payload) instead of quoted strings.
    #[must_use]
    pub fn to_wire(&self, literals: bool) -> Vec<u8> {
        let mut buf = Vec::new();
        write_criteria(&mut buf, self, literals, false);
        buf
    }

    /// Returns true if any value in the tree contains non-ASCII text.
    #[must_use]
    pub fn has_non_ascii(&self) -> bool {
        match self {
            Self::From(s)
            | Self::To(s)
            | Self::Cc(s)
            | Self::Subject(s)
            | Self::Body(s)
            | Self::Text(s) => !s.is_ascii(),
            Self::Header(name, value) => !name.is_ascii() || !value.is_ascii(),
            Self::And(items) | Self::Or(items) => items.iter().any(Self::has_non_ascii),
            _ => false,
        }
    }
}

impl fmt::Display for SearchCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_wire(false)))
    }
}

fn write_criteria(buf: &mut Vec<u8>, criteria: &SearchCriteria, literals: bool, nested: bool) {
    match criteria {
        SearchCriteria::All => buf.extend_from_slice(b"ALL"),
        SearchCriteria::From(s) => write_keyed(buf, b"FROM ", s, literals),
        SearchCriteria::To(s) => write_keyed(buf, b"TO ", s, literals),
        SearchCriteria::Cc(s) => write_keyed(buf, b"CC ", s, literals),
        SearchCriteria::Subject(s) => write_keyed(buf, b"SUBJECT ", s, literals),
        SearchCriteria::Body(s) => write_keyed(buf, b"BODY ", s, literals),
        SearchCriteria::Text(s) => write_keyed(buf, b"TEXT ", s, literals),
        SearchCriteria::Header(name, value) => {
            buf.extend_from_slice(b"HEADER ");
            write_astring(buf, name);
            buf.push(b' ');
            write_value(buf, value, literals);
        }
        SearchCriteria::Since(date) => write_date(buf, b"SINCE ", *date),
        SearchCriteria::Before(date) => write_date(buf, b"BEFORE ", *date),
        SearchCriteria::And(items) => match items.as_slice() {
            [] => buf.extend_from_slice(b"ALL"),
            [single] => write_criteria(buf, single, literals, nested),
            _ => {
                if nested {
                    buf.push(b'(');
                }
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        buf.push(b' ');
                    }
                    write_criteria(buf, item, literals, false);
                }
                if nested {
                    buf.push(b')');
                }
            }
        },
        SearchCriteria::Or(items) => write_or(buf, items, literals),
    }
}

// OR is binary on the wire: `OR a OR b c`.
fn write_or(buf: &mut Vec<u8>, items: &[SearchCriteria], literals: bool) {
    match items {
        [] => buf.extend_from_slice(b"ALL"),
        [single] => write_criteria(buf, single, literals, false),
        [first, rest @ ..] => {
            buf.extend_from_slice(b"OR ");
            write_criteria(buf, first, literals, true);
            buf.push(b' ');
            if rest.len() == 1 {
                write_criteria(buf, &rest[0], literals, true);
            } else {
                write_or(buf, rest, literals);
            }
        }
    }
}

fn write_keyed(buf: &mut Vec<u8>, key: &[u8], value: &str, literals: bool) {
    buf.extend_from_slice(key);
    write_value(buf, value, literals);
}

fn write_date(buf: &mut Vec<u8>, key: &[u8], date: NaiveDate) {
    buf.extend_from_slice(key);
    buf.extend_from_slice(date.format(DATE_FORMAT).to_string().as_bytes());
}

fn write_value(buf: &mut Vec<u8>, value: &str, literals: bool) {
    if literals && !value.is_ascii() {
        buf.extend_from_slice(format!("{{{}+}}\r\n", value.len()).as_bytes());
        buf.extend_from_slice(value.as_bytes());
    } else {
        write_astring(buf, value);
    }
}

/// Writes an atom, or a quoted string when the text needs it.
fn write_astring(buf: &mut Vec<u8>, s: &str) {
    if s.is_empty() || s.bytes().any(needs_quoting) {
        buf.push(b'"');
        for b in s.bytes() {
            if b == b'"' || b == b'\\' {
                buf.push(b'\\');
            }
            buf.push(b);
        }
        buf.push(b'"');
    } else {
        buf.extend_from_slice(s.as_bytes());
    }
}

const fn needs_quoting(b: u8) -> bool {
    matches!(b, b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*')
        || b < 0x20
        || b >= 0x7F
}
