//! SMTP command serialization.

use crate::types::{Address, AuthMechanism};

/// Placeholder written to logs in place of credential material.
pub const REDACTED: &str = "**********";

/// SMTP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// HELO - Simple greeting
    Helo {
        /// Client hostname
        hostname: String,
    },
    /// EHLO - Extended greeting
    Ehlo {
        /// Client hostname
        hostname: String,
    },
    /// STARTTLS - Upgrade to TLS
    StartTls,
    /// AUTH - Select a mechanism, optionally with an initial response
    Auth {
        /// Authentication mechanism
        mechanism: AuthMechanism,
        /// Base64 initial response
        initial_response: Option<String>,
    },
    /// A base64 line answering a 334 challenge
    AuthResponse(String),
    /// MAIL FROM - Start mail transaction
    MailFrom {
        /// Sender address
        from: Address,
    },
    /// RCPT TO - Add recipient
    RcptTo {
        /// Recipient address
        to: Address,
    },
    /// DATA - Begin message data
    Data,
    /// The lone dot that ends message data
    EndOfData,
    /// RSET - Reset transaction
    Rset,
    /// VRFY - Verify address
    Vrfy {
        /// Name or address to verify
        address: String,
    },
    /// NOOP - No operation
    Noop,
    /// QUIT - Close connection
    Quit,
}

impl Command {
    /// Serializes the command to bytes, CRLF terminated.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut line = self.render(false);
        line.push_str("\r\n");
        line.into_bytes()
    }

    /// Returns the command line as it may appear in logs.
    ///
    /// Credential payloads are replaced by [`REDACTED`].
    #[must_use]
    pub fn log_line(&self) -> String {
        self.render(true)
    }

    /// Returns true if the command carries credential material.
    #[must_use]
    pub const fn is_sensitive(&self) -> bool {
        matches!(
            self,
            Self::AuthResponse(_)
                | Self::Auth {
                    initial_response: Some(_),
                    ..
                }
        )
    }

    fn render(&self, redact: bool) -> String {
        match self {
            Self::Helo { hostname } => format!("HELO {hostname}"),
            Self::Ehlo { hostname } => format!("EHLO {hostname}"),
            Self::StartTls => "STARTTLS".to_string(),
            Self::Auth {
                mechanism,
                initial_response,
            } => match initial_response {
                Some(_) if redact => format!("AUTH {} {REDACTED}", mechanism.as_str()),
                Some(resp) => format!("AUTH {} {resp}", mechanism.as_str()),
                None => format!("AUTH {}", mechanism.as_str()),
            },
            Self::AuthResponse(_) if redact => REDACTED.to_string(),
            Self::AuthResponse(resp) => resp.clone(),
            Self::MailFrom { from } => format!("MAIL FROM:{from}"),
            Self::RcptTo { to } => format!("RCPT TO:{to}"),
            Self::Data => "DATA".to_string(),
            Self::EndOfData => ".".to_string(),
            Self::Rset => "RSET".to_string(),
            Self::Vrfy { address } => format!("VRFY {address}"),
            Self::Noop => "NOOP".to_string(),
            Self::Quit => "QUIT".to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn greeting_commands() {
        let ehlo = Command::Ehlo {
            hostname: "client.example.com".to_string(),
        };
        assert_eq!(ehlo.serialize(), b"EHLO client.example.com\r\n");
        let helo = Command::Helo {
            hostname: "127.0.0.1".to_string(),
        };
        assert_eq!(helo.serialize(), b"HELO 127.0.0.1\r\n");
    }

    #[test]
    fn envelope_commands() {
        let mail = Command::MailFrom {
            from: Address::new("sender@example.com").unwrap(),
        };
        assert_eq!(mail.serialize(), b"MAIL FROM:<sender@example.com>\r\n");

        let rcpt = Command::RcptTo {
            to: Address::new("rcpt@example.com").unwrap(),
        };
        assert_eq!(rcpt.serialize(), b"RCPT TO:<rcpt@example.com>\r\n");
    }

    #[test]
    fn null_sender() {
        let mail = Command::MailFrom {
            from: Address::null(),
        };
        assert_eq!(mail.serialize(), b"MAIL FROM:<>\r\n");
    }

    #[test]
    fn end_of_data_is_lone_dot() {
        assert_eq!(Command::EndOfData.serialize(), b".\r\n");
    }

    #[test]
    fn auth_with_initial_response() {
        let cmd = Command::Auth {
            mechanism: AuthMechanism::XOAuth2,
            initial_response: Some("dG9rZW4=".to_string()),
        };
        assert_eq!(cmd.serialize(), b"AUTH XOAUTH2 dG9rZW4=\r\n");
        assert_eq!(cmd.log_line(), "AUTH XOAUTH2 **********");
        assert!(cmd.is_sensitive());
    }

    #[test]
    fn auth_response_is_redacted_in_logs() {
        let cmd = Command::AuthResponse("c2VjcmV0".to_string());
        assert_eq!(cmd.serialize(), b"c2VjcmV0\r\n");
        assert_eq!(cmd.log_line(), REDACTED);
    }

    #[test]
    fn plain_commands_are_not_sensitive() {
        let select = Command::Auth {
            mechanism: AuthMechanism::Login,
            initial_response: None,
        };
        assert!(!select.is_sensitive());
        assert_eq!(select.log_line(), "AUTH LOGIN");
        assert_eq!(Command::Quit.log_line(), "QUIT");
    }
}
