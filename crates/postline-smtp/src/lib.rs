//! # postline-smtp
//!
//! Client side of SMTP message submission (RFC 5321) as an explicit state
//! machine.
//!
//! ## Features
//!
//! - **Runtime-checked session states**: operations issued out of order fail
//!   with [`Error::RuntimeOrdering`] instead of reaching the server
//! - **TLS**: implicit TLS and STARTTLS, with capabilities re-learned after
//!   the upgrade
//! - **Authentication**: PLAIN, LOGIN and `XOAUTH2`, with method and
//!   credential rejections reported as different error kinds
//! - **Streaming DATA**: any [`tokio::io::AsyncBufRead`] source, dot-stuffed
//!   on the fly
//!
//! ## Quick Start
//!
//! ```ignore
//! use postline_smtp::{Address, Credentials, SubmissionSession, TlsPolicy};
//! use postline_smtp::connection::connect;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> postline_smtp::Result<()> {
//!     let stream = connect("smtp.example.com", 587, Duration::from_secs(30)).await?;
//!     let mut session = SubmissionSession::new(stream, "smtp.example.com");
//!
//!     session.connect().await?;
//!     session.negotiate("client.example.com", TlsPolicy::Required).await?;
//!     session
//!         .authenticate(&Credentials::Password {
//!             username: "user@example.com".into(),
//!             password: "secret".into(),
//!         })
//!         .await?;
//!
//!     session.mail_from(&Address::new("sender@example.com")?).await?;
//!     session.rcpt_to(&Address::new("recipient@example.com")?).await?;
//!     session.send_message(b"Subject: Test\r\n\r\nHello, World!\r\n").await?;
//!
//!     session.logout().await
//! }
//! ```
//!
//! ## Modules
//!
//! - [`command`]: SMTP command serialization
//! - [`connection`]: The transport seam and the tokio/rustls stream
//! - [`parser`]: Reply parser
//! - [`types`]: Addresses, extensions, replies

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
mod session;
pub mod types;

pub use connection::{ServerInfo, SmtpStream, Transport};
pub use error::{Error, ErrorKind, Result};
pub use session::{Credentials, SubmissionSession, SubmissionState, TlsPolicy};
pub use types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
