//! Binary entrypoint for the aprsbeacon CLI.
//!
//! Commands:
//! - `preview [--status] [--json]` - build the packet and print it, no network I/O
//! - `send` - send one position report to APRS-IS
//! - `status` - send one status report to APRS-IS
//! - `auto [--interval <s>] [--count <n>]` - periodic position reports until done or Ctrl-C
//! - `passcode <CALLSIGN>` - print the APRS-IS passcode for a callsign
//! - `init` - create a starter `config.toml`
//!
//! Environment variables named like the config keys (`CALLSIGN`, `LATITUDE`, ...)
//! override the file. See the library crate docs for module details: `aprsbeacon::`.
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};

use aprsbeacon::aprs::packet::{build_position_packet, build_status_packet};
use aprsbeacon::aprs::passcode::{calculate_passcode, is_read_only};
use aprsbeacon::beacon::{self, Beacon, SchedulerError, SendOutcome};
use aprsbeacon::config::{Config, ConfigFile, StationConfig};
use aprsbeacon::metrics;
use aprsbeacon::validation::{validate_position, validate_status};

#[derive(Parser)]
#[command(name = "aprsbeacon")]
#[command(about = "Send APRS position and status reports to the APRS-IS network")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the packet and print it without connecting
    Preview {
        /// Preview the status packet instead of the position packet
        #[arg(long)]
        status: bool,
        /// Print a JSON object instead of the bare packet
        #[arg(long)]
        json: bool,
    },
    /// Send one position report
    Send,
    /// Send one status report
    Status,
    /// Send position reports on a fixed interval
    Auto {
        /// Seconds between sends (60 to 86400); overrides auto_send.interval_seconds
        #[arg(short, long)]
        interval: Option<u64>,
        /// Number of sends; overrides auto_send.count
        #[arg(short = 'n', long)]
        count: Option<u32>,
    },
    /// Print the APRS-IS passcode for a callsign
    Passcode {
        /// Callsign, with or without SSID
        callsign: String,
    },
    /// Create a starter configuration file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            init_logging(&None, cli.verbose);
            if tokio::fs::try_exists(&cli.config).await.unwrap_or(false) {
                return Err(anyhow!("{} already exists, not overwriting", cli.config));
            }
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Passcode { callsign } => {
            init_logging(&None, cli.verbose);
            println!("{}", calculate_passcode(&callsign));
        }
        Commands::Preview { status, json } => {
            let config = load_config(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            let packet = match preview_packet(&config.station, status) {
                Ok(packet) => packet,
                Err(e) => {
                    error!("Packet not built: {}", e);
                    std::process::exit(1);
                }
            };
            if json {
                let payload = serde_json::json!({
                    "kind": if status { "status" } else { "position" },
                    "packet": packet,
                    "callsign": config.station.callsign.trim(),
                    "server": format!("{}:{}", config.station.server, config.station.port),
                    "read_only": is_read_only(&config.station.passcode),
                });
                println!("{}", payload);
            } else {
                println!("{}", packet);
            }
        }
        Commands::Send => {
            let config = load_config(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            let ok = if config.demo_mode {
                demo_send(&config.station, false)
            } else {
                info!("Sending position report to APRS-IS");
                beacon::send_position_once(&config.station).await
            };
            finish(ok, &config.station);
        }
        Commands::Status => {
            let config = load_config(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            let ok = if config.demo_mode {
                demo_send(&config.station, true)
            } else {
                info!("Sending status report to APRS-IS");
                beacon::send_status_once(&config.station).await
            };
            finish(ok, &config.station);
        }
        Commands::Auto { interval, count } => {
            let mut config = load_config(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            if let Some(secs) = interval {
                config.auto_send.interval_seconds = secs;
            }
            if let Some(n) = count {
                config.auto_send.count = n;
            }
            let mut source = ConfigFile::new(cli.config.clone()).with_env_overrides();
            let shutdown = async {
                if tokio::signal::ctrl_c().await.is_err() {
                    // No signal handler available; run until the count is reached.
                    std::future::pending::<()>().await;
                }
            };
            let result = if config.demo_mode {
                warn!("Demo mode: packets are built but not sent");
                beacon::run_periodic_with(&config, &mut source, &DemoBeacon, shutdown).await
            } else {
                beacon::run_periodic(&config, &mut source, shutdown).await
            };
            match result {
                Ok(summary) => {
                    let m = metrics::snapshot();
                    info!(
                        "Sessions {} / packets sent {} / read-only {} / unverified {} / connection failures {}",
                        m.sessions_opened,
                        m.packets_sent,
                        m.read_only_skips,
                        m.verify_rejections,
                        m.connection_failures
                    );
                    info!(
                        "Check the station at https://aprs.fi/info/a/{}",
                        config.station.callsign.trim()
                    );
                    if summary.delivered == 0 && !summary.cancelled {
                        std::process::exit(1);
                    }
                }
                Err(SchedulerError::Disabled) => {
                    warn!("Automatic sending is disabled in {}", cli.config);
                    info!("Enable it with: [auto_send] enabled = true (or AUTO_SEND_ENABLED=true)");
                }
                Err(e) => {
                    error!("{}", e);
                    std::process::exit(2);
                }
            }
        }
    }

    Ok(())
}

async fn load_config(path: &str) -> Result<Config> {
    let mut config = Config::load(path).await?;
    if let Err(e) = config.apply_overrides(|key| std::env::var(key).ok()) {
        eprintln!("Warning: {}", e);
    }
    Ok(config)
}

fn preview_packet(station: &StationConfig, status: bool) -> Result<String> {
    if status {
        let text = validate_status(station)?;
        Ok(build_status_packet(station.callsign.trim(), &text, &station.path))
    } else {
        let pos = validate_position(station)?;
        Ok(build_position_packet(
            &pos.callsign,
            pos.latitude,
            pos.longitude,
            &pos.comment,
            &pos.symbol,
            &pos.path,
        ))
    }
}

fn demo_send(station: &StationConfig, status: bool) -> bool {
    warn!("Demo mode: packet is built but not sent");
    match preview_packet(station, status) {
        Ok(packet) => {
            info!("Demo packet: {}", packet);
            true
        }
        Err(e) => {
            error!("Packet not built: {}", e);
            false
        }
    }
}

/// Periodic-run delivery that only logs the packet.
struct DemoBeacon;

impl Beacon for DemoBeacon {
    async fn deliver(&self, _station: &StationConfig, packet: &str) -> SendOutcome {
        info!("Demo packet: {}", packet);
        SendOutcome::Delivered
    }
}

fn finish(ok: bool, station: &StationConfig) {
    if ok {
        info!(
            "Done. Check the station at https://aprs.fi/info/a/{}",
            station.callsign.trim()
        );
    } else {
        if is_read_only(&station.passcode) {
            info!(
                "Set APRS_IS_PASSCODE={} to enable transmission",
                calculate_passcode(station.callsign.trim())
            );
        }
        error!("Send failed, check the settings above");
        std::process::exit(1);
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|cfg| cfg.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    let log_file = config.as_ref().and_then(|cfg| cfg.logging.file.clone());
    match log_file.and_then(|file| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(file)
            .ok()
    }) {
        Some(f) => {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            // Foreground runs echo to the console; redirected output gets the file only
            let is_tty = atty::is(atty::Stream::Stdout);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    }
    let _ = builder.try_init();
}
