//! Error types for SMTP operations.

use std::io;
use std::time::Duration;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an [`Error`].
///
/// Callers match on the kind to choose user-facing messaging, for example
/// to tell bad credentials apart from a mechanism the server refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A caller-supplied value violates a precondition.
    InvalidArgument,
    /// Transport-level failure (I/O, TLS, timeout, closed connection).
    Connection,
    /// A reply line did not have the `<code><sep><text>` shape.
    ProtocolViolation,
    /// A well-formed reply carried an unexpected status code.
    NegativeReply,
    /// The server refused the selected authentication mechanism, or none
    /// of the supported mechanisms is advertised.
    AuthMethodRejected,
    /// The server refused the supplied credentials.
    AuthCredentialsRejected,
    /// TLS is required but the server does not offer it.
    UnsupportedSecureChannel,
    /// An operation was attempted out of the required sequence.
    RuntimeOrdering,
}

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TLS error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// No reply arrived within the configured timeout.
    #[error("Read timed out after {0:?}")]
    Timeout(Duration),

    /// The server closed the connection.
    #[error("Connection closed by server")]
    ConnectionClosed,

    /// The message source failed while the body was being transmitted.
    #[error("Cannot read message source: {0}")]
    SourceRead(#[source] io::Error),

    /// Malformed reply framing.
    #[error("Malformed reply line: {line:?}")]
    ProtocolViolation {
        /// The offending line.
        line: String,
        /// All lines read for this reply, including the offending one.
        lines: Vec<String>,
    },

    /// Server returned a reply code the command does not accept.
    #[error("SMTP error {code}: {}", lines.join(" | "))]
    NegativeReply {
        /// Reply code (e.g., 550).
        code: u16,
        /// Raw reply lines.
        lines: Vec<String>,
    },

    /// The server rejected the authentication mechanism.
    #[error("Authentication mechanism rejected: {}", lines.join(" | "))]
    AuthMethodRejected {
        /// Raw reply lines.
        lines: Vec<String>,
    },

    /// None of the usable mechanisms is advertised by the server.
    #[error("No usable authentication method")]
    NoAuthMechanism,

    /// The server rejected the credentials.
    #[error("Authentication credentials rejected: {}", lines.join(" | "))]
    AuthCredentialsRejected {
        /// Raw reply lines.
        lines: Vec<String>,
    },

    /// STARTTLS is required but not advertised.
    #[error("Secure channel unavailable: server does not support STARTTLS")]
    UnsupportedSecureChannel,

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Command issued out of sequence.
    #[error("Invalid state for operation: {0}")]
    RuntimeOrdering(String),
}

impl Error {
    /// Returns the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_)
            | Self::Tls(_)
            | Self::Timeout(_)
            | Self::ConnectionClosed
            | Self::SourceRead(_) => ErrorKind::Connection,
            Self::ProtocolViolation { .. } => ErrorKind::ProtocolViolation,
            Self::NegativeReply { .. } => ErrorKind::NegativeReply,
            Self::AuthMethodRejected { .. } | Self::NoAuthMechanism => {
                ErrorKind::AuthMethodRejected
            }
            Self::AuthCredentialsRejected { .. } => ErrorKind::AuthCredentialsRejected,
            Self::UnsupportedSecureChannel => ErrorKind::UnsupportedSecureChannel,
            Self::InvalidAddress(_) | Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::RuntimeOrdering(_) => ErrorKind::RuntimeOrdering,
        }
    }

    /// Returns the raw reply lines that caused this error, if any.
    #[must_use]
    pub fn reply_lines(&self) -> &[String] {
        match self {
            Self::ProtocolViolation { lines, .. }
            | Self::NegativeReply { lines, .. }
            | Self::AuthMethodRejected { lines }
            | Self::AuthCredentialsRejected { lines } => lines,
            _ => &[],
        }
    }

    /// Returns true if this is a permanent error (5xx).
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::NegativeReply { code, .. } if *code >= 500 && *code < 600)
    }

    /// Returns true if this is a transient error (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::NegativeReply { code, .. } if *code >= 400 && *code < 500)
    }
}
