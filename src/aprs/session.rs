//! # APRS-IS Session
//!
//! One [`AprsIsSession`] owns one TCP connection to an APRS-IS server for the length
//! of a single send operation:
//!
//! ```text
//! Idle ─connect()─▶ Connecting ─▶ AwaitingAuthResponse ─▶ Verified | Unverified ─▶ Closed
//!   │                   │                   │
//!   └──── error ────────┴──── error/timeout ┴──────────────────────────────────────▶ Closed
//! ```
//!
//! `connect()` resolves exactly once: verified, unverified, error, or timeout. A
//! session is never reconnected; the orchestrator builds a fresh one per send.
//!
//! The socket is obtained through a [`Connector`] so that tests can substitute
//! in-memory streams for the TCP transport.

use log::{debug, info, warn};
use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::logutil::{escape_log, redact_login};

/// Software name reported in the login line.
pub const SOFTWARE_NAME: &str = "NodeAPRS";
/// Software version reported in the login line.
pub const SOFTWARE_VERSION: &str = "1.0";
/// Time allowed from `connect()` until the server's verification response.
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(10);

const READ_CHUNK: usize = 1024;

/// Opens the byte stream a session talks over.
#[allow(async_fn_in_trait)] // Internal seam, Send bounds not needed
pub trait Connector {
    type Stream: AsyncRead + AsyncWrite + Unpin;

    async fn open(&self, host: &str, port: u16) -> io::Result<Self::Stream>;
}

/// Plain TCP transport used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn open(&self, host: &str, port: u16) -> io::Result<TcpStream> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true).ok();
        Ok(stream)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    AwaitingAuthResponse,
    Verified,
    Unverified,
    Closed,
}

impl SessionState {
    /// States in which the socket is open and writable.
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            SessionState::AwaitingAuthResponse | SessionState::Verified | SessionState::Unverified
        )
    }
}

/// Errors raised by a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// DNS, TCP connect or socket failure.
    #[error("connection to {endpoint} failed: {source}")]
    Connection {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    /// Server closed the connection before answering the login.
    #[error("server {endpoint} closed the connection before verification")]
    ClosedByServer { endpoint: String },

    /// No verification response within [`LOGIN_TIMEOUT`].
    #[error("connection timeout: no login response from {endpoint} within {}s", .after.as_secs())]
    Timeout { endpoint: String, after: Duration },

    /// `send_packet` called without an open connection.
    #[error("APRS-IS session is not connected")]
    NotConnected,

    /// `connect` called on a session that already left `Idle`.
    #[error("APRS-IS session already started (state {0:?})")]
    AlreadyStarted(SessionState),
}

/// Login credentials for the `user ... pass ...` line.
#[derive(Clone, PartialEq, Eq)]
pub struct Login {
    pub callsign: String,
    pub passcode: String,
}

impl Login {
    pub fn new(callsign: impl Into<String>, passcode: impl Into<String>) -> Self {
        Self {
            callsign: callsign.into(),
            passcode: passcode.into(),
        }
    }

    /// Wire form of the login line, CRLF terminated.
    pub fn line(&self) -> String {
        format!(
            "user {} pass {} vers {} {}\r\n",
            self.callsign, self.passcode, SOFTWARE_NAME, SOFTWARE_VERSION
        )
    }
}

impl fmt::Debug for Login {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Login")
            .field("callsign", &self.callsign)
            .field("passcode", &"<redacted>")
            .finish()
    }
}

/// Outcome of scanning server text for the login response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Verified,
    Unverified,
}

/// Look for the verification verdict in server text.
///
/// `unverified` is checked first so it is never mistaken for `verified`.
pub fn scan_verification(text: &str) -> Option<Verification> {
    if text.contains("unverified") {
        Some(Verification::Unverified)
    } else if text.contains("verified") {
        Some(Verification::Verified)
    } else {
        None
    }
}

pub struct AprsIsSession<S> {
    host: String,
    port: u16,
    login: Login,
    login_timeout: Duration,
    state: SessionState,
    stream: Option<S>,
}

impl<S> AprsIsSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(host: impl Into<String>, port: u16, login: Login) -> Self {
        Self {
            host: host.into(),
            port,
            login,
            login_timeout: LOGIN_TIMEOUT,
            state: SessionState::Idle,
            stream: None,
        }
    }

    pub fn with_login_timeout(mut self, login_timeout: Duration) -> Self {
        self.login_timeout = login_timeout;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connect, log in and wait for the server's verdict.
    ///
    /// Returns `Ok(true)` when verified, `Ok(false)` when unverified. Any error leaves
    /// the session `Closed` with the socket dropped.
    pub async fn connect<C>(&mut self, connector: &C) -> Result<bool, SessionError>
    where
        C: Connector<Stream = S>,
    {
        if self.state != SessionState::Idle {
            return Err(SessionError::AlreadyStarted(self.state));
        }
        self.state = SessionState::Connecting;
        info!("Connecting to APRS-IS server {}", self.endpoint());

        let limit = self.login_timeout;
        let waited = timeout(limit, self.handshake(connector)).await;
        let result = match waited {
            Ok(result) => result,
            Err(_) => Err(SessionError::Timeout {
                endpoint: self.endpoint(),
                after: limit,
            }),
        };

        match result {
            Ok(Verification::Verified) => {
                self.state = SessionState::Verified;
                info!("Login verified by {}, transmit allowed", self.endpoint());
                Ok(true)
            }
            Ok(Verification::Unverified) => {
                self.state = SessionState::Unverified;
                warn!("Login not verified by {}, receive-only", self.endpoint());
                Ok(false)
            }
            Err(e) => {
                self.stream = None;
                self.state = SessionState::Closed;
                Err(e)
            }
        }
    }

    async fn handshake<C>(&mut self, connector: &C) -> Result<Verification, SessionError>
    where
        C: Connector<Stream = S>,
    {
        let endpoint = self.endpoint();
        let mut stream = connector
            .open(&self.host, self.port)
            .await
            .map_err(|source| SessionError::Connection {
                endpoint: endpoint.clone(),
                source,
            })?;
        info!("Connected to APRS-IS server {}", endpoint);

        let line = self.login.line();
        let sent = async {
            stream.write_all(line.as_bytes()).await?;
            stream.flush().await
        }
        .await;
        sent.map_err(|source| SessionError::Connection {
            endpoint: endpoint.clone(),
            source,
        })?;
        info!("Login sent: {}", redact_login(&line));
        self.state = SessionState::AwaitingAuthResponse;
        let stream = self.stream.insert(stream);

        let mut buf = [0u8; READ_CHUNK];
        let mut pending = String::new();
        loop {
            let n = stream
                .read(&mut buf)
                .await
                .map_err(|source| SessionError::Connection {
                    endpoint: endpoint.clone(),
                    source,
                })?;
            if n == 0 {
                return Err(SessionError::ClosedByServer { endpoint });
            }
            let text = String::from_utf8_lossy(&buf[..n]);
            debug!("APRS-IS <- {}", escape_log(text.trim_end()));
            pending.push_str(&text);
            if let Some(verdict) = scan_verification(&pending) {
                return Ok(verdict);
            }
            // Keep only the unfinished line so a token split across reads still matches.
            if let Some(pos) = pending.rfind('\n') {
                pending.drain(..=pos);
            }
        }
    }

    /// Write one packet followed by CRLF.
    pub async fn send_packet(&mut self, packet: &str) -> Result<(), SessionError> {
        if !self.state.is_connected() {
            return Err(SessionError::NotConnected);
        }
        let endpoint = self.endpoint();
        let stream = self.stream.as_mut().ok_or(SessionError::NotConnected)?;
        let mut wire = String::with_capacity(packet.len() + 2);
        wire.push_str(packet);
        wire.push_str("\r\n");
        let written = async {
            stream.write_all(wire.as_bytes()).await?;
            stream.flush().await
        }
        .await;
        if let Err(source) = written {
            self.stream = None;
            self.state = SessionState::Closed;
            return Err(SessionError::Connection { endpoint, source });
        }
        info!("Packet sent: {}", escape_log(packet));
        Ok(())
    }

    /// Close the socket. Safe to call in any state, any number of times.
    pub async fn disconnect(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                debug!("APRS-IS shutdown error (ignored): {}", e);
            }
            info!("APRS-IS connection to {} closed", self.endpoint());
        }
        self.state = SessionState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_line_format() {
        let login = Login::new("N0CALL", "13023");
        assert_eq!(login.line(), "user N0CALL pass 13023 vers NodeAPRS 1.0\r\n");
    }

    #[test]
    fn login_debug_hides_passcode() {
        let login = Login::new("N0CALL", "13023");
        let dbg = format!("{:?}", login);
        assert!(dbg.contains("N0CALL"));
        assert!(!dbg.contains("13023"));
    }

    #[test]
    fn unverified_is_not_read_as_verified() {
        assert_eq!(
            scan_verification("# logresp N0CALL unverified, server T2TEST"),
            Some(Verification::Unverified)
        );
        assert_eq!(
            scan_verification("# logresp N0CALL verified, server T2TEST"),
            Some(Verification::Verified)
        );
        assert_eq!(scan_verification("# aprsc 2.1.14-g5e22b37"), None);
    }

    #[test]
    fn connected_states() {
        assert!(!SessionState::Idle.is_connected());
        assert!(!SessionState::Connecting.is_connected());
        assert!(SessionState::Verified.is_connected());
        assert!(SessionState::Unverified.is_connected());
        assert!(!SessionState::Closed.is_connected());
    }
}
