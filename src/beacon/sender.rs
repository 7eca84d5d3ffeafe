//! Send orchestration: one logical "send position" or "send status" operation.
//!
//! Policy, in order:
//! 1. validate the station (no network I/O on failure)
//! 2. build the packet
//! 3. open a fresh session and wait for the login verdict
//! 4. passcode `-1`: settle, disconnect, report read-only
//! 5. unverified: disconnect, report rejection
//! 6. verified: transmit, settle, disconnect, report delivered
//!
//! Every path ends with the session disconnected and a `SendOutcome`; nothing is
//! raised to the caller.

use log::{error, info, warn};
use std::time::Duration;
use tokio::time::sleep;

use crate::aprs::packet::{build_position_packet, build_status_packet};
use crate::aprs::passcode::{calculate_passcode, is_read_only};
use crate::aprs::session::{
    AprsIsSession, Connector, Login, SessionError, TcpConnector, LOGIN_TIMEOUT,
};
use crate::config::StationConfig;
use crate::metrics;
use crate::validation::{passcode_mismatch, validate_position, validate_status, ConfigError};

use super::scheduler::Beacon;

/// Pause after transmitting (or after a read-only login) before closing the socket.
pub const SETTLE_DELAY: Duration = Duration::from_secs(2);

/// How a single send attempt ended.
#[derive(Debug)]
pub enum SendOutcome {
    Delivered,
    /// Passcode `-1`: logged in receive-only, nothing transmitted.
    ReadOnly,
    /// Server answered `unverified`; nothing transmitted.
    Unverified,
    Invalid(ConfigError),
    Failed(SessionError),
}

impl SendOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, SendOutcome::Delivered)
    }
}

pub struct Sender<C = TcpConnector> {
    connector: C,
    login_timeout: Duration,
    settle_delay: Duration,
}

impl Sender<TcpConnector> {
    pub fn new() -> Self {
        Self::with_connector(TcpConnector)
    }
}

impl Default for Sender<TcpConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> Sender<C> {
    pub fn with_connector(connector: C) -> Self {
        Self {
            connector,
            login_timeout: LOGIN_TIMEOUT,
            settle_delay: SETTLE_DELAY,
        }
    }

    pub fn with_timing(mut self, login_timeout: Duration, settle_delay: Duration) -> Self {
        self.login_timeout = login_timeout;
        self.settle_delay = settle_delay;
        self
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Send a position report. True only when the packet was written to a verified session.
    pub async fn send_position(&self, station: &StationConfig) -> bool {
        self.position_outcome(station).await.is_delivered()
    }

    /// Send a status report. True only when the packet was written to a verified session.
    pub async fn send_status(&self, station: &StationConfig) -> bool {
        self.status_outcome(station).await.is_delivered()
    }

    pub async fn position_outcome(&self, station: &StationConfig) -> SendOutcome {
        let pos = match validate_position(station) {
            Ok(pos) => pos,
            Err(e) => {
                error!("Position not sent, invalid configuration: {}", e);
                return SendOutcome::Invalid(e);
            }
        };
        let packet = build_position_packet(
            &pos.callsign,
            pos.latitude,
            pos.longitude,
            &pos.comment,
            &pos.symbol,
            &pos.path,
        );
        info!(
            "Station {} at {}, {} symbol {} comment {:?}",
            pos.callsign, pos.latitude, pos.longitude, pos.symbol, pos.comment
        );
        self.transmit(station, &packet).await
    }

    pub async fn status_outcome(&self, station: &StationConfig) -> SendOutcome {
        let status = match validate_status(station) {
            Ok(status) => status,
            Err(e) => {
                error!("Status not sent, invalid configuration: {}", e);
                return SendOutcome::Invalid(e);
            }
        };
        let packet = build_status_packet(station.callsign.trim(), &status, &station.path);
        self.transmit(station, &packet).await
    }

    /// Deliver an already-built packet using the station's server and credentials.
    pub async fn transmit(&self, station: &StationConfig, packet: &str) -> SendOutcome {
        let read_only = is_read_only(&station.passcode);
        if let Some(expected) = passcode_mismatch(station) {
            warn!(
                "Configured passcode does not match {} (expected {}); server will likely refuse it",
                station.callsign.trim(),
                expected
            );
        }
        info!("Packet: {}", packet);

        let login = Login::new(station.callsign.trim(), station.passcode.trim());
        let mut session = AprsIsSession::new(station.server.trim(), station.port, login)
            .with_login_timeout(self.login_timeout);
        metrics::inc_sessions_opened();
        let outcome = self.drive(&mut session, packet, read_only, station).await;
        session.disconnect().await;
        outcome
    }

    async fn drive(
        &self,
        session: &mut AprsIsSession<C::Stream>,
        packet: &str,
        read_only: bool,
        station: &StationConfig,
    ) -> SendOutcome {
        let verified = match session.connect(&self.connector).await {
            Ok(verified) => verified,
            Err(e) => {
                error!("APRS-IS send failed: {}", e);
                metrics::inc_connection_failures();
                return SendOutcome::Failed(e);
            }
        };

        if read_only {
            let callsign = station.callsign.trim();
            info!("Passcode not set (-1): receive-only login, packet will not be sent");
            info!(
                "Computed passcode for {} is {}; set APRS_IS_PASSCODE to transmit",
                callsign,
                calculate_passcode(callsign)
            );
            sleep(self.settle_delay).await;
            metrics::inc_read_only_skips();
            return SendOutcome::ReadOnly;
        }

        if !verified {
            warn!("Login not verified, packet will not be sent");
            metrics::inc_verify_rejections();
            return SendOutcome::Unverified;
        }

        if let Err(e) = session.send_packet(packet).await {
            match &e {
                SessionError::NotConnected | SessionError::AlreadyStarted(_) => {
                    error!("Session misuse while sending (bug): {}", e)
                }
                _ => {
                    error!("APRS-IS send failed: {}", e);
                    metrics::inc_connection_failures();
                }
            }
            return SendOutcome::Failed(e);
        }
        sleep(self.settle_delay).await;
        metrics::inc_packets_sent();
        info!("Packet delivered to APRS-IS by {}", session.endpoint());
        SendOutcome::Delivered
    }
}

impl<C: Connector> Beacon for Sender<C> {
    async fn deliver(&self, station: &StationConfig, packet: &str) -> SendOutcome {
        self.transmit(station, packet).await
    }
}
