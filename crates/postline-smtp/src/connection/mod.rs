//! Connection plumbing: the transport seam and the server capability model.

mod stream;

pub use stream::{SmtpStream, connect, connect_tls};

use crate::error::Result;
use crate::types::{AuthMechanism, Extension};
use std::collections::HashSet;
use std::future::Future;

/// Byte-stream connection a [`SubmissionSession`](crate::SubmissionSession)
/// drives.
///
/// Implementations exchange CRLF-terminated lines and can switch to TLS in
/// place. Reads are expected to honour a timeout and report
/// [`Error::Timeout`](crate::Error::Timeout) when it expires.
pub trait Transport: Send {
    /// Reads one line, without its terminator.
    fn read_line(&mut self) -> impl Future<Output = Result<String>> + Send;

    /// Writes raw bytes and flushes them.
    fn write_all(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Performs a TLS handshake on the existing connection.
    fn upgrade_to_tls(&mut self, hostname: &str) -> impl Future<Output = Result<()>> + Send;

    /// Returns true if the connection is already encrypted.
    fn is_secure(&self) -> bool;
}

/// Server identity and capabilities learned during the session.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    /// Server hostname from the greeting.
    pub hostname: String,
    /// Extensions advertised by the last EHLO.
    pub extensions: HashSet<Extension>,
}

impl ServerInfo {
    /// Replaces the capability set with the lines of an EHLO reply.
    ///
    /// The first line is the server's greeting and is skipped.
    pub fn learn_extensions<'a>(&mut self, lines: impl IntoIterator<Item = &'a String>) {
        self.extensions = lines
            .into_iter()
            .skip(1)
            .map(|line| Extension::parse(line))
            .collect();
    }

    /// Checks if the server supports an extension.
    #[must_use]
    pub fn supports(&self, ext: &Extension) -> bool {
        self.extensions.contains(ext)
    }

    /// Checks if STARTTLS is supported.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.supports(&Extension::StartTls)
    }

    /// Returns the maximum message size, if advertised.
    #[must_use]
    pub fn max_message_size(&self) -> Option<usize> {
        self.extensions.iter().find_map(|ext| match ext {
            Extension::Size(size) => *size,
            _ => None,
        })
    }

    /// Returns the advertised authentication mechanisms.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Vec<AuthMechanism> {
        self.extensions
            .iter()
            .filter_map(|ext| match ext {
                Extension::Auth(mechanisms) => Some(mechanisms.iter().copied()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Checks if an authentication mechanism is advertised.
    #[must_use]
    pub fn supports_auth(&self, mechanism: AuthMechanism) -> bool {
        self.auth_mechanisms().contains(&mechanism)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ehlo_lines(lines: &[&str]) -> Vec<String> {
        lines.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn learns_capabilities_after_greeting_line() {
        let mut info = ServerInfo::default();
        info.learn_extensions(&ehlo_lines(&[
            "smtp.example.com Hello",
            "SIZE 1000",
            "STARTTLS",
            "AUTH PLAIN LOGIN",
        ]));
        assert!(info.supports_starttls());
        assert_eq!(info.max_message_size(), Some(1000));
        assert!(info.supports_auth(AuthMechanism::Plain));
        assert!(info.supports_auth(AuthMechanism::Login));
        assert!(!info.supports_auth(AuthMechanism::XOAuth2));
    }

    #[test]
    fn relearning_discards_previous_set() {
        let mut info = ServerInfo::default();
        info.learn_extensions(&ehlo_lines(&["host", "STARTTLS", "AUTH LOGIN"]));
        info.learn_extensions(&ehlo_lines(&["host", "AUTH PLAIN"]));
        assert!(!info.supports_starttls());
        assert_eq!(info.auth_mechanisms(), vec![AuthMechanism::Plain]);
    }

    #[test]
    fn greeting_only_reply_has_no_extensions() {
        let mut info = ServerInfo::default();
        info.learn_extensions(&ehlo_lines(&["host"]));
        assert!(info.extensions.is_empty());
        assert_eq!(info.max_message_size(), None);
    }
}
