//! The submission session state machine.
//!
//! ```text
//! Disconnected --connect--> Greeted --negotiate--> Greeted | TlsNegotiated
//!     --authenticate--> Authenticated --mail_from--> EnvelopeFrom
//!     --rcpt_to--> EnvelopeTo --send_data--> DataSent --reset--> (base)
//!                                        any --logout--> Closed
//! ```
//!
//! Every operation checks the current state before touching the wire and
//! fails with [`Error::RuntimeOrdering`] when called out of sequence. A
//! transport failure (I/O, timeout, closed connection) moves the session to
//! `Closed`.

use crate::command::Command;
use crate::connection::{ServerInfo, Transport};
use crate::error::{Error, ErrorKind, Result};
use crate::parser::ReplyAccumulator;
use crate::types::{Address, AuthMechanism, Reply, ReplyCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::time::Instant;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::Span;

/// Body bytes buffered before each write during DATA.
const DATA_CHUNK_SIZE: usize = 8 * 1024;

/// Position of a session in the submission protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmissionState {
    /// No greeting read yet.
    Disconnected,
    /// Greeting received; plain channel.
    Greeted,
    /// STARTTLS completed and capabilities re-learned.
    TlsNegotiated,
    /// Authentication succeeded.
    Authenticated,
    /// Sender accepted.
    EnvelopeFrom,
    /// At least one recipient accepted.
    EnvelopeTo,
    /// Message body accepted.
    DataSent,
    /// QUIT issued or the session failed fatally.
    Closed,
}

/// Whether and how to upgrade the channel during negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsPolicy {
    /// Never issue STARTTLS.
    Disabled,
    /// Upgrade when the server offers STARTTLS.
    #[default]
    Opportunistic,
    /// Upgrade or fail with [`Error::UnsupportedSecureChannel`].
    Required,
}

/// Credentials for [`SubmissionSession::authenticate`].
#[derive(Clone)]
pub enum Credentials {
    /// Username and password, sent with PLAIN or LOGIN.
    Password {
        /// Login name.
        username: String,
        /// Password.
        password: String,
    },
    /// `OAuth2` access token, sent with `XOAUTH2`.
    OAuth2 {
        /// Account address.
        user: String,
        /// Bearer token.
        token: String,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::OAuth2 { user, .. } => f
                .debug_struct("OAuth2")
                .field("user", user)
                .finish_non_exhaustive(),
        }
    }
}

/// A single SMTP submission conversation over one transport.
#[derive(Debug)]
pub struct SubmissionSession<T> {
    transport: T,
    server_name: String,
    state: SubmissionState,
    server_info: ServerInfo,
    negotiated: bool,
    tls_upgraded: bool,
    authenticated: bool,
    auth_attempted: bool,
    span: Span,
}

impl<T: Transport> SubmissionSession<T> {
    /// Wraps a connected transport. `server_name` is used for TLS
    /// verification and logging.
    pub fn new(transport: T, server_name: impl Into<String>) -> Self {
        let server_name = server_name.into();
        let span = tracing::info_span!("smtp", server = %server_name);
        Self {
            transport,
            server_name,
            state: SubmissionState::Disconnected,
            server_info: ServerInfo::default(),
            negotiated: false,
            tls_upgraded: false,
            authenticated: false,
            auth_attempted: false,
            span,
        }
    }

    /// Replaces the span events of this session are recorded under.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Current protocol state.
    #[must_use]
    pub const fn state(&self) -> SubmissionState {
        self.state
    }

    /// Greeting hostname and capabilities learned so far.
    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Consumes the session and returns the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Reads the server greeting.
    ///
    /// # Errors
    ///
    /// Fails if the session is not fresh, or the greeting is not 220.
    pub async fn connect(&mut self) -> Result<()> {
        self.require(&[SubmissionState::Disconnected], "connect")?;

        let greeting = self.read_reply().await?;
        let greeting = self.check(greeting, &[ReplyCode::SERVICE_READY])?;

        self.server_info.hostname = greeting
            .message
            .first()
            .and_then(|text| text.split_whitespace().next())
            .unwrap_or_default()
            .to_string();
        self.state = SubmissionState::Greeted;
        tracing::info!(parent: &self.span, host = %self.server_info.hostname, "greeted");
        Ok(())
    }

    /// Learns server capabilities and upgrades to TLS according to `policy`.
    ///
    /// After a STARTTLS upgrade the extended greeting is repeated and the
    /// capabilities seen on the plain channel are discarded.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::RuntimeOrdering`] if negotiation already ran or
    /// the session is authenticated, and with
    /// [`Error::UnsupportedSecureChannel`] if TLS is required but not
    /// offered.
    pub async fn negotiate(&mut self, client_host: &str, policy: TlsPolicy) -> Result<()> {
        if self.negotiated || self.authenticated {
            return Err(self.fail(Error::RuntimeOrdering(
                "cannot issue EHLO/HELO to an established session".into(),
            )));
        }
        self.require(&[SubmissionState::Greeted], "negotiate")?;

        self.ehlo_or_helo(client_host).await?;

        if policy != TlsPolicy::Disabled && !self.transport.is_secure() {
            if self.server_info.supports_starttls() {
                self.expect(Command::StartTls, &[ReplyCode::SERVICE_READY])
                    .await?;
                let server_name = self.server_name.clone();
                if let Err(err) = self.transport.upgrade_to_tls(&server_name).await {
                    self.state = SubmissionState::Closed;
                    return Err(self.fail(err));
                }
                self.server_info.extensions.clear();
                self.tls_upgraded = true;
                self.state = SubmissionState::TlsNegotiated;
                tracing::info!(parent: &self.span, "channel upgraded to TLS");

                self.ehlo_or_helo(client_host).await?;
            } else if policy == TlsPolicy::Required {
                return Err(self.fail(Error::UnsupportedSecureChannel));
            }
        }

        self.negotiated = true;
        Ok(())
    }

    /// Authenticates with the first usable mechanism.
    ///
    /// Passwords use PLAIN, then LOGIN. Tokens use `XOAUTH2`. There is no
    /// retry: once an exchange has started, later calls fail with
    /// [`Error::RuntimeOrdering`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoAuthMechanism`] when nothing usable is advertised,
    /// [`Error::AuthMethodRejected`] when the mechanism selection is refused
    /// and [`Error::AuthCredentialsRejected`] when the credentials are.
    pub async fn authenticate(&mut self, credentials: &Credentials) -> Result<()> {
        if self.auth_attempted {
            return Err(self.fail(Error::RuntimeOrdering(
                "authentication was already attempted in this session".into(),
            )));
        }
        if !self.negotiated || self.authenticated {
            return Err(self.fail(Error::RuntimeOrdering(
                "authentication requires a negotiated, unauthenticated session".into(),
            )));
        }
        self.require(
            &[SubmissionState::Greeted, SubmissionState::TlsNegotiated],
            "authenticate",
        )?;

        match credentials {
            Credentials::Password { username, password } => {
                if self.server_info.supports_auth(AuthMechanism::Plain) {
                    self.auth_attempted = true;
                    self.auth_plain(username, password).await?;
                } else if self.server_info.supports_auth(AuthMechanism::Login) {
                    self.auth_attempted = true;
                    self.auth_login(username, password).await?;
                } else {
                    return Err(self.fail(Error::NoAuthMechanism));
                }
            }
            Credentials::OAuth2 { user, token } => {
                if !self.server_info.supports_auth(AuthMechanism::XOAuth2) {
                    return Err(self.fail(Error::NoAuthMechanism));
                }
                self.auth_attempted = true;
                self.auth_xoauth2(user, token).await?;
            }
        }

        self.authenticated = true;
        self.state = SubmissionState::Authenticated;
        tracing::info!(parent: &self.span, "authenticated");
        Ok(())
    }

    /// Starts a transaction with `MAIL FROM`.
    ///
    /// Calling it again before any recipient is added restarts the
    /// transaction with the new sender.
    ///
    /// # Errors
    ///
    /// Fails if negotiation has not run, if recipients were already
    /// accepted, or if the server refuses the sender.
    pub async fn mail_from(&mut self, from: &Address) -> Result<()> {
        if !self.negotiated {
            return Err(self.fail(Error::RuntimeOrdering(
                "a valid session has not been started".into(),
            )));
        }
        self.require(
            &[
                SubmissionState::Greeted,
                SubmissionState::TlsNegotiated,
                SubmissionState::Authenticated,
                SubmissionState::EnvelopeFrom,
                SubmissionState::DataSent,
            ],
            "MAIL FROM",
        )?;

        self.expect(Command::MailFrom { from: from.clone() }, &[ReplyCode::OK])
            .await?;
        self.state = SubmissionState::EnvelopeFrom;
        Ok(())
    }

    /// Adds a recipient with `RCPT TO`.
    ///
    /// # Errors
    ///
    /// Fails if no sender has been set, or the server refuses the address.
    pub async fn rcpt_to(&mut self, to: &Address) -> Result<()> {
        if !matches!(
            self.state,
            SubmissionState::EnvelopeFrom | SubmissionState::EnvelopeTo
        ) {
            return Err(self.fail(Error::RuntimeOrdering(
                "no sender reverse path has been supplied".into(),
            )));
        }

        self.expect(
            Command::RcptTo { to: to.clone() },
            &[ReplyCode::OK, ReplyCode::FORWARD],
        )
        .await?;
        self.state = SubmissionState::EnvelopeTo;
        Ok(())
    }

    /// Transfers a message body read line by line from `source`.
    ///
    /// Lines are CRLF terminated and dot-stuffed; the lone-dot terminator
    /// is sent once after the last line. A read failure on `source` closes
    /// the session.
    ///
    /// # Errors
    ///
    /// Fails if no recipient was accepted, if the source cannot be read,
    /// or if the server refuses the message.
    pub async fn send_data<R>(&mut self, mut source: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin + Send,
    {
        if self.state != SubmissionState::EnvelopeTo {
            return Err(self.fail(Error::RuntimeOrdering(
                "no recipient forward path has been supplied".into(),
            )));
        }

        self.expect(Command::Data, &[ReplyCode::START_DATA]).await?;
        tracing::debug!(parent: &self.span, "message data");

        let mut line = Vec::new();
        let mut chunk = Vec::with_capacity(DATA_CHUNK_SIZE + 2);
        let mut sent = 0usize;
        loop {
            line.clear();
            let read = match source.read_until(b'\n', &mut line).await {
                Ok(read) => read,
                Err(err) => {
                    self.state = SubmissionState::Closed;
                    return Err(self.fail(Error::SourceRead(err)));
                }
            };
            if read == 0 {
                break;
            }

            if line.last() == Some(&b'\n') {
                line.pop();
            }
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.first() == Some(&b'.') {
                chunk.push(b'.');
            }
            chunk.extend_from_slice(&line);
            chunk.extend_from_slice(b"\r\n");

            if chunk.len() >= DATA_CHUNK_SIZE {
                self.write_data(&chunk).await?;
                sent += chunk.len();
                chunk.clear();
            }
        }
        if !chunk.is_empty() {
            self.write_data(&chunk).await?;
            sent += chunk.len();
        }

        self.expect(Command::EndOfData, &[ReplyCode::OK]).await?;
        self.state = SubmissionState::DataSent;
        tracing::info!(parent: &self.span, bytes = sent, "message accepted");
        Ok(())
    }

    /// Transfers an in-memory message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an empty message, otherwise as
    /// [`send_data`](Self::send_data).
    pub async fn send_message(&mut self, message: &[u8]) -> Result<()> {
        if message.is_empty() {
            return Err(self.fail(Error::InvalidArgument("message body is empty".into())));
        }
        self.send_data(message).await
    }

    /// Aborts the current transaction with `RSET`.
    ///
    /// The greeted, TLS and authenticated status is kept.
    ///
    /// # Errors
    ///
    /// Fails if the session is not greeted, or RSET is refused.
    pub async fn reset(&mut self) -> Result<()> {
        self.require_open("RSET")?;
        self.expect(
            Command::Rset,
            &[ReplyCode::OK, ReplyCode::SERVICE_READY],
        )
        .await?;
        self.state = self.base_state();
        Ok(())
    }

    /// Asks the server to verify a user or mailbox with `VRFY`.
    ///
    /// # Errors
    ///
    /// Fails if the session is not greeted, or the reply is not 250, 251 or
    /// 252.
    pub async fn verify(&mut self, user: &str) -> Result<Reply> {
        self.require_open("VRFY")?;
        if user.trim().is_empty() {
            return Err(self.fail(Error::InvalidArgument("VRFY needs a user".into())));
        }
        self.expect(
            Command::Vrfy {
                address: user.trim().to_string(),
            },
            &[ReplyCode::OK, ReplyCode::FORWARD, ReplyCode::CANNOT_VERIFY],
        )
        .await
    }

    /// Sends `NOOP`.
    ///
    /// # Errors
    ///
    /// Fails if the session is not greeted, or NOOP is refused.
    pub async fn noop(&mut self) -> Result<()> {
        self.require_open("NOOP")?;
        self.expect(Command::Noop, &[ReplyCode::OK]).await?;
        Ok(())
    }

    /// Ends the session. QUIT is sent only if a greeting was received; the
    /// session is `Closed` afterwards whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns the QUIT failure, if any.
    pub async fn logout(&mut self) -> Result<()> {
        let greeted = !matches!(
            self.state,
            SubmissionState::Disconnected | SubmissionState::Closed
        );
        let outcome = if greeted {
            self.expect(Command::Quit, &[ReplyCode::CLOSING])
                .await
                .map(|_| ())
        } else {
            Ok(())
        };

        self.state = SubmissionState::Closed;
        self.negotiated = false;
        self.authenticated = false;
        tracing::debug!(parent: &self.span, "session closed");
        outcome
    }

    const fn base_state(&self) -> SubmissionState {
        if self.authenticated {
            SubmissionState::Authenticated
        } else if self.tls_upgraded {
            SubmissionState::TlsNegotiated
        } else {
            SubmissionState::Greeted
        }
    }

    fn require(&self, allowed: &[SubmissionState], operation: &str) -> Result<()> {
        if allowed.contains(&self.state) {
            return Ok(());
        }
        Err(self.fail(Error::RuntimeOrdering(format!(
            "{operation} is not valid in state {:?}",
            self.state
        ))))
    }

    fn require_open(&self, operation: &str) -> Result<()> {
        if matches!(
            self.state,
            SubmissionState::Disconnected | SubmissionState::Closed
        ) {
            return Err(self.fail(Error::RuntimeOrdering(format!(
                "{operation} requires a greeted session"
            ))));
        }
        Ok(())
    }

    async fn ehlo_or_helo(&mut self, client_host: &str) -> Result<()> {
        let ehlo = Command::Ehlo {
            hostname: client_host.to_string(),
        };
        let reply = self.send(&ehlo).await?;
        if reply.code == ReplyCode::OK {
            self.server_info.learn_extensions(&reply.message);
            return Ok(());
        }

        tracing::debug!(parent: &self.span, code = reply.code.as_u16(), "EHLO refused, trying HELO");
        self.expect(
            Command::Helo {
                hostname: client_host.to_string(),
            },
            &[ReplyCode::OK],
        )
        .await?;
        self.server_info.extensions.clear();
        Ok(())
    }

    async fn auth_plain(&mut self, username: &str, password: &str) -> Result<()> {
        self.select_mechanism(AuthMechanism::Plain).await?;
        let payload = STANDARD.encode(format!("\0{username}\0{password}"));
        self.send_credential(payload, ReplyCode::AUTH_SUCCESS).await
    }

    async fn auth_login(&mut self, username: &str, password: &str) -> Result<()> {
        self.select_mechanism(AuthMechanism::Login).await?;
        self.send_credential(STANDARD.encode(username), ReplyCode::AUTH_CONTINUE)
            .await?;
        self.send_credential(STANDARD.encode(password), ReplyCode::AUTH_SUCCESS)
            .await
    }

    async fn auth_xoauth2(&mut self, user: &str, token: &str) -> Result<()> {
        let payload = STANDARD.encode(format!("user={user}\x01auth=Bearer {token}\x01\x01"));
        let reply = self
            .send(&Command::Auth {
                mechanism: AuthMechanism::XOAuth2,
                initial_response: Some(payload),
            })
            .await?;
        if reply.code == ReplyCode::AUTH_SUCCESS {
            return Ok(());
        }
        Err(self.fail(Error::AuthCredentialsRejected { lines: reply.lines }))
    }

    async fn select_mechanism(&mut self, mechanism: AuthMechanism) -> Result<()> {
        let reply = self
            .send(&Command::Auth {
                mechanism,
                initial_response: None,
            })
            .await?;
        if reply.code == ReplyCode::AUTH_CONTINUE {
            return Ok(());
        }
        Err(self.fail(Error::AuthMethodRejected { lines: reply.lines }))
    }

    async fn send_credential(&mut self, payload: String, expected: ReplyCode) -> Result<()> {
        let reply = self.send(&Command::AuthResponse(payload)).await?;
        if reply.code == expected {
            return Ok(());
        }
        Err(self.fail(Error::AuthCredentialsRejected { lines: reply.lines }))
    }

    async fn write_data(&mut self, chunk: &[u8]) -> Result<()> {
        let written = self.transport.write_all(chunk).await;
        written.map_err(|err| self.abort(err))
    }

    async fn expect(&mut self, command: Command, expected: &[ReplyCode]) -> Result<Reply> {
        let reply = self.send(&command).await?;
        self.check(reply, expected)
    }

    fn check(&self, reply: Reply, expected: &[ReplyCode]) -> Result<Reply> {
        if reply.is_one_of(expected) {
            return Ok(reply);
        }
        Err(self.fail(Error::NegativeReply {
            code: reply.code.as_u16(),
            lines: reply.lines,
        }))
    }

    async fn send(&mut self, command: &Command) -> Result<Reply> {
        let started = Instant::now();
        tracing::debug!(parent: &self.span, "C: {}", command.log_line());

        let written = self.transport.write_all(&command.serialize()).await;
        written.map_err(|err| self.abort(err))?;
        let reply = self.read_reply().await?;

        tracing::debug!(
            parent: &self.span,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "S: {}",
            reply.lines.join(" | ")
        );
        Ok(reply)
    }

    async fn read_reply(&mut self) -> Result<Reply> {
        let mut acc = ReplyAccumulator::new();
        loop {
            let line = self.transport.read_line().await;
            let line = line.map_err(|err| self.abort(err))?;
            match acc.push(&line) {
                Ok(Some(reply)) => return Ok(reply),
                Ok(None) => {}
                Err(err) => return Err(self.fail(err)),
            }
        }
    }

    /// Logs `err`; a transport failure also closes the session.
    fn abort(&mut self, err: Error) -> Error {
        if err.kind() == ErrorKind::Connection {
            self.state = SubmissionState::Closed;
        }
        self.fail(err)
    }

    /// Logs `err` with its reply text and hands it back.
    fn fail(&self, err: Error) -> Error {
        let reply = err.reply_lines().join(" | ");
        match &err {
            Error::RuntimeOrdering(_) | Error::InvalidArgument(_) | Error::InvalidAddress(_) => {
                tracing::error!(parent: &self.span, error = %err, "SMTP misuse");
            }
            _ => {
                tracing::warn!(parent: &self.span, error = %err, reply = %reply, "SMTP failure");
            }
        }
        err
    }
}
