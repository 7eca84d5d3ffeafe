//! Beacon operations: one-shot sends and the periodic run.
//!
//! These are the entry points a CLI or UI calls. Each returns a plain result and
//! reports progress through the `log` facade; none of them panics or returns an
//! error for network trouble.

pub mod scheduler;
pub mod sender;

use std::future::Future;

use crate::config::{Config, StationConfig};

pub use scheduler::{
    Beacon, RunSummary, Scheduler, SchedulerError, StationClass, StationSource, TickOutcome,
};
pub use sender::{SendOutcome, Sender};

/// Send one position report over TCP to the station's configured server.
pub async fn send_position_once(station: &StationConfig) -> bool {
    Sender::new().send_position(station).await
}

/// Send one status report over TCP to the station's configured server.
pub async fn send_status_once(station: &StationConfig) -> bool {
    Sender::new().send_status(station).await
}

/// Run the periodic beacon described by `config.auto_send`, delivering over TCP.
pub async fn run_periodic<S, F>(
    config: &Config,
    source: &mut S,
    shutdown: F,
) -> Result<RunSummary, SchedulerError>
where
    S: StationSource,
    F: Future<Output = ()>,
{
    run_periodic_with(config, source, &Sender::new(), shutdown).await
}

/// [`run_periodic`] with a caller-supplied delivery path.
pub async fn run_periodic_with<S, B, F>(
    config: &Config,
    source: &mut S,
    beacon: &B,
    shutdown: F,
) -> Result<RunSummary, SchedulerError>
where
    S: StationSource,
    B: Beacon,
    F: Future<Output = ()>,
{
    if !config.auto_send.enabled {
        return Err(SchedulerError::Disabled);
    }
    let scheduler = Scheduler::new(config.auto_send.interval_seconds, config.auto_send.count)?;
    Ok(scheduler.run(source, beacon, shutdown).await)
}
