//! Sending a message through a submission server.

use std::fmt::Write;

use postline_smtp::connection::{connect, connect_tls};
use postline_smtp::{Address, Credentials, SubmissionSession, Transport};

use crate::config::{Security, SmtpConfig};
use crate::{Error, Result};

/// An email message to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Sender address.
    pub from: String,
    /// Recipient addresses.
    pub to: Vec<String>,
    /// CC addresses.
    pub cc: Vec<String>,
    /// BCC addresses. Never written to the headers.
    pub bcc: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub body: String,
}

impl OutgoingMessage {
    /// Creates a message without recipients.
    #[must_use]
    pub fn new(from: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Adds a recipient.
    #[must_use]
    pub fn to(mut self, recipient: impl Into<String>) -> Self {
        self.to.push(recipient.into());
        self
    }

    /// Adds a CC recipient.
    #[must_use]
    pub fn cc(mut self, recipient: impl Into<String>) -> Self {
        self.cc.push(recipient.into());
        self
    }

    /// Adds a BCC recipient.
    #[must_use]
    pub fn bcc(mut self, recipient: impl Into<String>) -> Self {
        self.bcc.push(recipient.into());
        self
    }

    /// Every envelope recipient: to, then cc, then bcc.
    pub fn recipients(&self) -> impl Iterator<Item = &str> {
        self.to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .map(String::as_str)
    }

    /// Formats the message as RFC 5322 text with CRLF line endings.
    #[must_use]
    pub fn to_rfc5322(&self) -> String {
        let mut message = String::new();

        let _ = write!(message, "From: {}\r\n", self.from);
        if !self.to.is_empty() {
            let _ = write!(message, "To: {}\r\n", self.to.join(", "));
        }
        if !self.cc.is_empty() {
            let _ = write!(message, "Cc: {}\r\n", self.cc.join(", "));
        }
        let _ = write!(message, "Subject: {}\r\n", self.subject);
        message.push_str("MIME-Version: 1.0\r\n");
        message.push_str("Content-Type: text/plain; charset=utf-8\r\n");
        message.push_str("Content-Transfer-Encoding: 8bit\r\n");
        message.push_str("\r\n");

        for line in self.body.lines() {
            message.push_str(line);
            message.push_str("\r\n");
        }
        message
    }
}

/// Connects to the configured server and sends `message`.
///
/// [`Security::Tls`] connects with implicit TLS; the other modes connect in
/// plain text and let negotiation decide on STARTTLS.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] when the message has no recipient,
/// and [`Error::Submission`] for any failure of the submission itself.
pub async fn send_email(config: &SmtpConfig, message: &OutgoingMessage) -> Result<()> {
    if message.recipients().next().is_none() {
        return Err(Error::InvalidArgument("no recipients specified".into()));
    }

    let port = config.effective_port();
    let stream = match config.security {
        Security::Tls => connect_tls(&config.host, port, config.timeout()).await?,
        Security::StartTls | Security::None => connect(&config.host, port, config.timeout()).await?,
    };

    let span = tracing::info_span!("submit", host = %config.host, port);
    let mut session = SubmissionSession::new(stream, config.host.as_str()).with_span(span);
    let outcome = submit(&mut session, config, message).await;
    let closed = session.logout().await;
    outcome?;
    closed?;
    Ok(())
}

/// Runs one submission over an unopened session: greeting, negotiation,
/// authentication when a username is configured, envelope and data.
///
/// The session is left in the data-sent state; the caller ends it.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] when there is no recipient, and
/// [`Error::Submission`] for an unparsable address or a refused step.
pub async fn submit<T: Transport>(
    session: &mut SubmissionSession<T>,
    config: &SmtpConfig,
    message: &OutgoingMessage,
) -> Result<()> {
    let from = Address::new(&message.from)?;
    let recipients = message
        .recipients()
        .map(Address::new)
        .collect::<postline_smtp::Result<Vec<_>>>()?;
    if recipients.is_empty() {
        return Err(Error::InvalidArgument("no recipients specified".into()));
    }

    session.connect().await?;
    session
        .negotiate(&config.client_hostname, config.security.tls_policy())
        .await?;

    if !config.username.is_empty() {
        session
            .authenticate(&Credentials::Password {
                username: config.username.clone(),
                password: config.password.clone(),
            })
            .await?;
    }

    session.mail_from(&from).await?;
    for recipient in &recipients {
        session.rcpt_to(recipient).await?;
    }
    session.send_message(message.to_rfc5322().as_bytes()).await?;

    tracing::info!(recipients = recipients.len(), "message submitted");
    Ok(())
}
