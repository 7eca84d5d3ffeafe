//! Periodic position beacon.
//!
//! A [`Scheduler`] fires every `interval` (60 s floor) for `max_count` ticks. Each
//! tick re-reads the station through a [`StationSource`], builds the packet and hands
//! it to a [`Beacon`] unless it is byte-identical to the last delivered packet. The
//! send is awaited inside the tick, so ticks never overlap and at most one session
//! exists at a time.
//!
//! Cancellation (any future passed as `shutdown`, Ctrl-C in the binary) is observed
//! while waiting between ticks; a tick already in progress runs to completion,
//! including its disconnect.

use anyhow::Result;
use log::{error, info, warn};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};

use crate::aprs::packet::build_position_packet;
use crate::config::StationConfig;
use crate::validation::validate_position;

use super::sender::SendOutcome;

/// Hard lower bound on the tick interval.
pub const MIN_INTERVAL_SECS: u64 = 60;
/// Upper bound on the tick interval (one day).
pub const MAX_INTERVAL_SECS: u64 = 86_400;
/// Pause before a mobile/test-class run starts.
pub const CAUTION_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("send interval must be at least {minimum} seconds, got {requested}")]
    IntervalTooShort { requested: u64, minimum: u64 },

    #[error("send interval must be at most {maximum} seconds, got {requested}")]
    IntervalTooLong { requested: u64, maximum: u64 },

    #[error("send count must be at least 1")]
    ZeroCount,

    #[error("automatic sending is disabled (set auto_send.enabled = true)")]
    Disabled,
}

/// Supplies the station for each tick.
#[allow(async_fn_in_trait)] // Internal seam, Send bounds not needed
pub trait StationSource {
    async fn current(&mut self) -> Result<StationConfig>;
}

impl StationSource for StationConfig {
    async fn current(&mut self) -> Result<StationConfig> {
        Ok(self.clone())
    }
}

/// Delivers a built packet for a station.
#[allow(async_fn_in_trait)] // Internal seam, Send bounds not needed
pub trait Beacon {
    async fn deliver(&self, station: &StationConfig, packet: &str) -> SendOutcome;
}

/// Network-friendliness class derived from the interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationClass {
    /// 10 minutes or more.
    Fixed,
    /// 5 to 10 minutes.
    SemiFixed,
    /// Under 5 minutes.
    MobileOrTest,
}

impl StationClass {
    pub fn from_interval(interval: Duration) -> Self {
        match interval.as_secs() {
            s if s >= 600 => StationClass::Fixed,
            s if s >= 300 => StationClass::SemiFixed,
            _ => StationClass::MobileOrTest,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            StationClass::Fixed => "fixed station (optimal)",
            StationClass::SemiFixed => "semi-fixed station (good)",
            StationClass::MobileOrTest => "mobile/test (frequent)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Delivered,
    SkippedDuplicate,
    Failed,
}

/// State of one periodic run.
#[derive(Debug)]
pub struct ScheduleRun {
    pub ticks: u32,
    pub delivered: u32,
    pub skipped: u32,
    pub failed: u32,
    /// Last packet actually delivered; compared byte-for-byte for dedup.
    pub last_packet: Option<String>,
    pub started: Instant,
    pub max_count: u32,
    pub interval: Duration,
}

impl ScheduleRun {
    fn new(max_count: u32, interval: Duration) -> Self {
        Self {
            ticks: 0,
            delivered: 0,
            skipped: 0,
            failed: 0,
            last_packet: None,
            started: Instant::now(),
            max_count,
            interval,
        }
    }

    fn record(&mut self, outcome: TickOutcome) {
        self.ticks += 1;
        match outcome {
            TickOutcome::Delivered => self.delivered += 1,
            TickOutcome::SkippedDuplicate => self.skipped += 1,
            TickOutcome::Failed => self.failed += 1,
        }
    }

    fn finish(self, cancelled: bool) -> RunSummary {
        RunSummary {
            ticks: self.ticks,
            max_count: self.max_count,
            delivered: self.delivered,
            skipped: self.skipped,
            failed: self.failed,
            elapsed: self.started.elapsed(),
            cancelled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u32,
    pub max_count: u32,
    pub delivered: u32,
    pub skipped: u32,
    pub failed: u32,
    pub elapsed: Duration,
    pub cancelled: bool,
}

impl RunSummary {
    /// Wall time per completed tick.
    pub fn average_interval(&self) -> Option<Duration> {
        if self.ticks == 0 {
            None
        } else {
            Some(self.elapsed / self.ticks)
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{} ticks ({} delivered, {} skipped, {} failed) in {}",
            if self.cancelled { "stopped after" } else { "completed" },
            self.ticks,
            self.max_count,
            self.delivered,
            self.skipped,
            self.failed,
            format_duration(self.elapsed)
        )?;
        if let Some(avg) = self.average_interval() {
            write!(f, ", average interval {}", format_duration(avg))?;
        }
        Ok(())
    }
}

/// Whole minutes covered by `ticks` intervals.
fn minutes_for(interval: Duration, ticks: u32) -> u64 {
    interval.as_secs().saturating_mul(ticks as u64) / 60
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    interval: Duration,
    max_count: u32,
}

impl Scheduler {
    /// Reject intervals outside [`MIN_INTERVAL_SECS`]..=[`MAX_INTERVAL_SECS`] and a zero
    /// count before any timer exists.
    pub fn new(interval_seconds: u64, max_count: u32) -> Result<Self, SchedulerError> {
        if interval_seconds < MIN_INTERVAL_SECS {
            return Err(SchedulerError::IntervalTooShort {
                requested: interval_seconds,
                minimum: MIN_INTERVAL_SECS,
            });
        }
        if interval_seconds > MAX_INTERVAL_SECS {
            return Err(SchedulerError::IntervalTooLong {
                requested: interval_seconds,
                maximum: MAX_INTERVAL_SECS,
            });
        }
        if max_count == 0 {
            return Err(SchedulerError::ZeroCount);
        }
        Ok(Self {
            interval: Duration::from_secs(interval_seconds),
            max_count,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_count(&self) -> u32 {
        self.max_count
    }

    pub fn station_class(&self) -> StationClass {
        StationClass::from_interval(self.interval)
    }

    /// Run until `max_count` ticks complete or `shutdown` resolves.
    pub async fn run<S, B, F>(&self, source: &mut S, beacon: &B, shutdown: F) -> RunSummary
    where
        S: StationSource,
        B: Beacon,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut run = ScheduleRun::new(self.max_count, self.interval);
        let class = self.station_class();
        info!(
            "Automatic sending: every {}s, {} ticks (~{} min total), {}",
            self.interval.as_secs(),
            self.max_count,
            minutes_for(self.interval, self.max_count),
            class.description()
        );

        if class == StationClass::MobileOrTest {
            warn!("Intervals under 5 minutes load the APRS network; 10-30 minutes is recommended for fixed stations");
            warn!("Waiting {}s before starting", CAUTION_DELAY.as_secs());
            tokio::select! {
                _ = sleep(CAUTION_DELAY) => {}
                _ = &mut shutdown => {
                    info!("Stop requested before the first tick");
                    return self.conclude(run, true);
                }
            }
        }

        let mut timer = interval_at(Instant::now() + self.interval, self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while run.ticks < run.max_count {
            tokio::select! {
                _ = timer.tick() => {}
                _ = &mut shutdown => {
                    info!("Stop requested, ending automatic sending");
                    return self.conclude(run, true);
                }
            }
            let outcome = self.tick(&mut run, source, beacon).await;
            run.record(outcome);

            let remaining = run.max_count - run.ticks;
            if remaining > 0 {
                let next = chrono::Duration::from_std(self.interval)
                    .ok()
                    .and_then(|step| chrono::Local::now().checked_add_signed(step));
                match next {
                    Some(next) => info!(
                        "Next send at {}, {} remaining (~{} min)",
                        next.format("%H:%M:%S"),
                        remaining,
                        minutes_for(self.interval, remaining)
                    ),
                    None => info!(
                        "{} remaining (~{} min)",
                        remaining,
                        minutes_for(self.interval, remaining)
                    ),
                }
            }
        }
        self.conclude(run, false)
    }

    async fn tick<S, B>(&self, run: &mut ScheduleRun, source: &mut S, beacon: &B) -> TickOutcome
    where
        S: StationSource,
        B: Beacon,
    {
        let n = run.ticks + 1;
        let max = run.max_count;
        let station = match source.current().await {
            Ok(station) => station,
            Err(e) => {
                error!("[{}/{}] Could not load station configuration: {:#}", n, max, e);
                return TickOutcome::Failed;
            }
        };
        let pos = match validate_position(&station) {
            Ok(pos) => pos,
            Err(e) => {
                error!("[{}/{}] Invalid configuration, tick not sent: {}", n, max, e);
                return TickOutcome::Failed;
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

        if run.last_packet.as_deref() == Some(packet.as_str()) {
            info!("[{}/{}] Skipped, duplicate of the last packet", n, max);
            return TickOutcome::SkippedDuplicate;
        }

        info!("[{}/{}] Sending", n, max);
        let outcome = beacon.deliver(&station, &packet).await;
        if outcome.is_delivered() {
            info!("[{}/{}] Delivered", n, max);
            run.last_packet = Some(packet);
            TickOutcome::Delivered
        } else {
            warn!("[{}/{}] Not delivered ({:?}), will retry next tick", n, max, outcome);
            TickOutcome::Failed
        }
    }

    fn conclude(&self, run: ScheduleRun, cancelled: bool) -> RunSummary {
        let summary = run.finish(cancelled);
        info!("Automatic sending {}", summary);
        summary
    }
}
