//! Error types for the core library.

use thiserror::Error;

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A caller-supplied value violates a precondition.
    InvalidArgument,
    /// Transport-level failure.
    Connection,
    /// The server's response could not be understood.
    ProtocolViolation,
    /// The server answered NO or BAD.
    NegativeReply,
    /// Delete attempted on a folder that still holds messages.
    NonEmptyFolder,
    /// The listing cache backend failed.
    Cache,
    /// A message submission failed; carries the submission error kind.
    Submission(postline_smtp::ErrorKind),
}

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Mailbox transport failed.
    #[error("Connection error: {0}")]
    Connection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Response did not match the expected shape.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Server rejected a command.
    #[error("{command} rejected: {}", lines.join(" | "))]
    NegativeReply {
        /// Command that was rejected.
        command: String,
        /// Raw response lines.
        lines: Vec<String>,
    },

    /// Folder still contains messages.
    #[error("Folder is not empty: {0}")]
    NonEmptyFolder(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Submission session error.
    #[error(transparent)]
    Submission(#[from] postline_smtp::Error),
}

impl Error {
    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) | Self::Config(_) => ErrorKind::InvalidArgument,
            Self::Connection(_) | Self::Io(_) => ErrorKind::Connection,
            Self::ProtocolViolation(_) => ErrorKind::ProtocolViolation,
            Self::NegativeReply { .. } => ErrorKind::NegativeReply,
            Self::NonEmptyFolder(_) => ErrorKind::NonEmptyFolder,
            Self::Database(_) | Self::Serde(_) => ErrorKind::Cache,
            Self::Submission(err) => ErrorKind::Submission(err.kind()),
        }
    }

    /// Returns true if the server rejected the command.
    #[must_use]
    pub fn is_negative_reply(&self) -> bool {
        self.kind() == ErrorKind::NegativeReply
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(
            Error::InvalidArgument("limit".into()).kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            Error::NonEmptyFolder("Archive".into()).kind(),
            ErrorKind::NonEmptyFolder
        );
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert_eq!(Error::from(io).kind(), ErrorKind::Connection);
    }

    #[test]
    fn submission_kind_is_preserved() {
        let err = Error::from(postline_smtp::Error::UnsupportedSecureChannel);
        assert_eq!(
            err.kind(),
            ErrorKind::Submission(postline_smtp::ErrorKind::UnsupportedSecureChannel)
        );
    }

    #[test]
    fn negative_reply_message_carries_lines() {
        let err = Error::NegativeReply {
            command: "SEARCH".into(),
            lines: vec!["A3 NO [BADCHARSET] unsupported charset".into()],
        };
        assert!(err.is_negative_reply());
        assert!(err.to_string().contains("BADCHARSET"));
    }
}
