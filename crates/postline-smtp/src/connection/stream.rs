//! tokio/rustls implementation of [`Transport`].

use super::Transport;
use crate::error::{Error, Result};
use rustls::pki_types::ServerName;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::{
    TlsConnector,
    client::TlsStream,
    rustls::{ClientConfig, RootCertStore},
};

#[derive(Debug)]
enum Inner {
    Tcp(BufReader<TcpStream>),
    Tls(Box<BufReader<TlsStream<TcpStream>>>),
    Disconnected,
}

/// SMTP stream over TCP or TLS with a per-read timeout.
#[derive(Debug)]
pub struct SmtpStream {
    inner: Inner,
    timeout: Duration,
}

impl SmtpStream {
    /// Returns the read timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn read_raw(&mut self, buf: &mut Vec<u8>) -> Result<usize> {
        let n = match &mut self.inner {
            Inner::Tcp(reader) => reader.read_until(b'\n', buf).await?,
            Inner::Tls(reader) => reader.read_until(b'\n', buf).await?,
            Inner::Disconnected => return Err(Error::ConnectionClosed),
        };
        Ok(n)
    }
}

impl Transport for SmtpStream {
    async fn read_line(&mut self) -> Result<String> {
        let mut buf = Vec::new();
        let timeout = self.timeout;
        let n = tokio::time::timeout(timeout, self.read_raw(&mut buf))
            .await
            .map_err(|_| Error::Timeout(timeout))??;
        if n == 0 {
            return Err(Error::ConnectionClosed);
        }
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        match &mut self.inner {
            Inner::Tcp(reader) => {
                reader.get_mut().write_all(data).await?;
                reader.get_mut().flush().await?;
            }
            Inner::Tls(reader) => {
                reader.get_mut().write_all(data).await?;
                reader.get_mut().flush().await?;
            }
            Inner::Disconnected => return Err(Error::ConnectionClosed),
        }
        Ok(())
    }

    async fn upgrade_to_tls(&mut self, hostname: &str) -> Result<()> {
        let tcp_stream = match std::mem::replace(&mut self.inner, Inner::Disconnected) {
            Inner::Tcp(reader) => reader.into_inner(),
            Inner::Tls(reader) => {
                self.inner = Inner::Tls(reader);
                return Err(Error::RuntimeOrdering(
                    "connection already uses TLS".into(),
                ));
            }
            Inner::Disconnected => return Err(Error::ConnectionClosed),
        };

        let tls_stream = handshake(hostname, tcp_stream, self.timeout).await?;
        self.inner = Inner::Tls(Box::new(BufReader::new(tls_stream)));
        Ok(())
    }

    fn is_secure(&self) -> bool {
        matches!(self.inner, Inner::Tls(_))
    }
}

/// Connects to an SMTP server over plain TCP.
///
/// # Errors
///
/// Returns an error if the connection fails or does not complete within
/// `timeout`.
pub async fn connect(hostname: &str, port: u16, timeout: Duration) -> Result<SmtpStream> {
    let stream = open_tcp(hostname, port, timeout).await?;
    Ok(SmtpStream {
        inner: Inner::Tcp(BufReader::new(stream)),
        timeout,
    })
}

/// Connects to an SMTP server over implicit TLS (port 465).
///
/// # Errors
///
/// Returns an error if the connection or TLS handshake fails.
pub async fn connect_tls(hostname: &str, port: u16, timeout: Duration) -> Result<SmtpStream> {
    let tcp_stream = open_tcp(hostname, port, timeout).await?;
    let tls_stream = handshake(hostname, tcp_stream, timeout).await?;
    Ok(SmtpStream {
        inner: Inner::Tls(Box::new(BufReader::new(tls_stream))),
        timeout,
    })
}

async fn open_tcp(hostname: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let stream = tokio::time::timeout(timeout, TcpStream::connect((hostname, port)))
        .await
        .map_err(|_| Error::Timeout(timeout))??;
    tracing::debug!(host = hostname, port, "TCP connection established");
    Ok(stream)
}

async fn handshake(
    hostname: &str,
    tcp_stream: TcpStream,
    timeout: Duration,
) -> Result<TlsStream<TcpStream>> {
    let server_name = ServerName::try_from(hostname.to_string())
        .map_err(|_| Error::InvalidArgument(format!("invalid TLS server name: {hostname}")))?;

    let connector = create_tls_connector();
    let tls_stream = tokio::time::timeout(timeout, connector.connect(server_name, tcp_stream))
        .await
        .map_err(|_| Error::Timeout(timeout))??;
    tracing::debug!(host = hostname, "TLS handshake complete");
    Ok(tls_stream)
}

/// Creates a TLS connector seeded with the webpki root certificates.
fn create_tls_connector() -> TlsConnector {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}
