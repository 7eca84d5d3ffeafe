//! Test utilities & fixtures.
//! Scripted connectors and station configs shared by the integration tests.
#![allow(dead_code)] // Each test crate uses a different subset.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io;

use aprsbeacon::aprs::session::Connector;
use aprsbeacon::config::StationConfig;
use tokio::io::{AsyncRead, AsyncWrite};

pub const N0CALL_PASSCODE: &str = "13023";
pub const BANNER: &[u8] = b"# aprsc 2.1.14-g5e22b37\r\n";
pub const VERIFIED: &[u8] = b"# logresp N0CALL verified, server T2TEST\r\n";
pub const UNVERIFIED: &[u8] = b"# logresp N0CALL unverified, server T2TEST\r\n";

/// Connector that hands out pre-built streams in order and counts `open` calls.
/// Once the queue is empty every open fails with `ConnectionRefused`.
pub struct ScriptedConnector<S> {
    streams: RefCell<VecDeque<io::Result<S>>>,
    opens: Cell<usize>,
}

impl<S> ScriptedConnector<S> {
    pub fn new(streams: impl IntoIterator<Item = S>) -> Self {
        Self {
            streams: RefCell::new(streams.into_iter().map(Ok).collect()),
            opens: Cell::new(0),
        }
    }

    pub fn refusing() -> Self {
        Self {
            streams: RefCell::new(VecDeque::new()),
            opens: Cell::new(0),
        }
    }

    pub fn opens(&self) -> usize {
        self.opens.get()
    }
}

impl<S> Connector for ScriptedConnector<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    type Stream = S;

    async fn open(&self, _host: &str, _port: u16) -> io::Result<S> {
        self.opens.set(self.opens.get() + 1);
        self.streams.borrow_mut().pop_front().unwrap_or_else(|| {
            Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))
        })
    }
}

pub fn login_line(callsign: &str, passcode: &str) -> Vec<u8> {
    format!("user {callsign} pass {passcode} vers NodeAPRS 1.0\r\n").into_bytes()
}

/// N0CALL at 41.0115, 29.1255 with a valid passcode.
pub fn station() -> StationConfig {
    StationConfig {
        callsign: "N0CALL".into(),
        latitude: "41.0115".into(),
        longitude: "29.1255".into(),
        comment: "hi".into(),
        symbol: "/>".into(),
        path: "APRS".into(),
        server: "localhost".into(),
        port: 14580,
        passcode: N0CALL_PASSCODE.into(),
        status: Some("QRV".into()),
    }
}

pub const POSITION_PACKET: &str = "N0CALL>APRS:=4100.69N/02907.53E>hi";
