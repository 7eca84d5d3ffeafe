//! APRS-IS session login, verdict detection and socket lifecycle.
mod common;

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use aprsbeacon::aprs::session::{AprsIsSession, Login, SessionError, SessionState};
use common::*;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio_test::io::{Builder, Mock};

fn login() -> Login {
    Login::new("N0CALL", N0CALL_PASSCODE)
}

#[tokio::test]
async fn verified_after_banner() {
    let mock = Builder::new()
        .write(&login_line("N0CALL", N0CALL_PASSCODE))
        .read(BANNER)
        .read(VERIFIED)
        .write(b"N0CALL>APRS:>QRV\r\n")
        .build();
    let connector = ScriptedConnector::new([mock]);
    let mut session: AprsIsSession<Mock> = AprsIsSession::new("localhost", 14580, login());

    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.connect(&connector).await.unwrap());
    assert_eq!(session.state(), SessionState::Verified);

    session.send_packet("N0CALL>APRS:>QRV").await.unwrap();
    session.disconnect().await;
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn unverified_resolves_false() {
    let mock = Builder::new()
        .write(&login_line("N0CALL", N0CALL_PASSCODE))
        .read(UNVERIFIED)
        .build();
    let connector = ScriptedConnector::new([mock]);
    let mut session: AprsIsSession<Mock> = AprsIsSession::new("localhost", 14580, login());

    assert!(!session.connect(&connector).await.unwrap());
    assert_eq!(session.state(), SessionState::Unverified);
    session.disconnect().await;
}

#[tokio::test]
async fn verdict_split_across_reads() {
    let mock = Builder::new()
        .write(&login_line("N0CALL", N0CALL_PASSCODE))
        .read(b"# logresp N0CALL ver")
        .read(b"ified, server T2TEST\r\n")
        .build();
    let connector = ScriptedConnector::new([mock]);
    let mut session: AprsIsSession<Mock> = AprsIsSession::new("localhost", 14580, login());

    assert!(session.connect(&connector).await.unwrap());
    session.disconnect().await;
}

#[tokio::test]
async fn server_close_before_verdict_is_an_error() {
    let mock = Builder::new()
        .write(&login_line("N0CALL", N0CALL_PASSCODE))
        .read(BANNER)
        .build();
    let connector = ScriptedConnector::new([mock]);
    let mut session: AprsIsSession<Mock> = AprsIsSession::new("localhost", 14580, login());

    let err = session.connect(&connector).await.unwrap_err();
    assert!(matches!(err, SessionError::ClosedByServer { .. }), "{err}");
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn connect_failure_closes_session() {
    let connector = ScriptedConnector::<Mock>::refusing();
    let mut session: AprsIsSession<Mock> = AprsIsSession::new("localhost", 14580, login());

    let err = session.connect(&connector).await.unwrap_err();
    assert!(matches!(err, SessionError::Connection { .. }), "{err}");
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(connector.opens(), 1);
}

#[tokio::test(start_paused = true)]
async fn silent_server_times_out_after_ten_seconds() {
    let (client, _server) = tokio::io::duplex(1024);
    let connector = ScriptedConnector::new([client]);
    let mut session: AprsIsSession<DuplexStream> =
        AprsIsSession::new("localhost", 14580, login());

    let started = tokio::time::Instant::now();
    let err = session.connect(&connector).await.unwrap_err();
    assert!(matches!(err, SessionError::Timeout { .. }), "{err}");
    assert!(err.to_string().contains("timeout"));
    let waited = started.elapsed();
    assert!(
        waited >= Duration::from_secs(10) && waited < Duration::from_secs(11),
        "waited {waited:?}"
    );
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn send_without_connect_is_rejected() {
    let mut session: AprsIsSession<Mock> = AprsIsSession::new("localhost", 14580, login());
    let err = session.send_packet("N0CALL>APRS:>QRV").await.unwrap_err();
    assert!(matches!(err, SessionError::NotConnected));
    assert_eq!(err.to_string(), "APRS-IS session is not connected");
}

#[tokio::test]
async fn send_after_disconnect_is_rejected() {
    let mock = Builder::new()
        .write(&login_line("N0CALL", N0CALL_PASSCODE))
        .read(VERIFIED)
        .build();
    let connector = ScriptedConnector::new([mock]);
    let mut session: AprsIsSession<Mock> = AprsIsSession::new("localhost", 14580, login());
    assert!(session.connect(&connector).await.unwrap());
    session.disconnect().await;

    assert!(matches!(
        session.send_packet("N0CALL>APRS:>QRV").await,
        Err(SessionError::NotConnected)
    ));
}

#[tokio::test]
async fn disconnect_is_idempotent() {
    let mut session: AprsIsSession<Mock> = AprsIsSession::new("localhost", 14580, login());
    session.disconnect().await;
    session.disconnect().await;
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn session_is_single_use() {
    let mock = Builder::new()
        .write(&login_line("N0CALL", N0CALL_PASSCODE))
        .read(VERIFIED)
        .build();
    let connector = ScriptedConnector::new([mock]);
    let mut session: AprsIsSession<Mock> = AprsIsSession::new("localhost", 14580, login());
    assert!(session.connect(&connector).await.unwrap());
    session.disconnect().await;

    let err = session.connect(&connector).await.unwrap_err();
    assert!(matches!(err, SessionError::AlreadyStarted(SessionState::Closed)));
    assert_eq!(connector.opens(), 1);
}

/// Accepts writes but fails every flush; never yields data.
struct FlushFails;

impl AsyncRead for FlushFails {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Pending
    }
}

impl AsyncWrite for FlushFails {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "broken pipe",
        )))
    }

    fn poll_shutdown(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[tokio::test(start_paused = true)]
async fn login_flush_failure_is_a_connection_error() {
    let connector = ScriptedConnector::new([FlushFails]);
    let mut session: AprsIsSession<FlushFails> = AprsIsSession::new("localhost", 14580, login());

    let started = tokio::time::Instant::now();
    let err = session.connect(&connector).await.unwrap_err();
    assert!(matches!(err, SessionError::Connection { .. }), "{err}");
    assert!(err.to_string().contains("broken pipe"), "{err}");
    // Fails at once rather than waiting out the login timeout.
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(session.state(), SessionState::Closed);
}
