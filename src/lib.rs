//! # aprsbeacon - APRS position and status beacon for APRS-IS
//!
//! Formats APRS position and status reports and delivers them to the APRS-IS
//! network over its plaintext TCP login protocol, once or on a fixed schedule.
//!
//! ## Features
//!
//! - **Packet Encoding**: uncompressed `=DDMM.mmN/DDDMM.mmE>` position reports and `>` status reports.
//! - **Passcode**: the standard APRS-IS callsign hash, with SSID stripping.
//! - **APRS-IS Session**: login, verified/unverified detection, 10 second login timeout.
//! - **Send Policy**: read-only (`-1`) and unverified logins never transmit; every failure resolves to `false` plus a log line.
//! - **Periodic Beacon**: 60 second interval floor, duplicate suppression, graceful Ctrl-C stop with a run summary.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use aprsbeacon::beacon;
//! use aprsbeacon::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let delivered = beacon::send_position_once(&config.station).await;
//!     println!("delivered: {}", delivered);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`aprs`] - passcode, packet encoding, APRS-IS session
//! - [`beacon`] - send orchestration and the periodic scheduler
//! - [`config`] - TOML configuration and overrides
//! - [`validation`] - station checks run before any network I/O
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   Scheduler     │ ← ticks, dedup, cancellation
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │   Sender        │ ← validate, encode, send policy
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │ APRS-IS Session │ ← TCP login and transmit
//! └─────────────────┘
//! ```

pub mod aprs;
pub mod beacon;
pub mod config;
pub mod logutil;
pub mod metrics;
pub mod validation;
