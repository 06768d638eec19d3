// src/main.rs
//! GPS Navigator - NMEA waypoint navigation for the terminal

use clap::Parser;
use gps_navigator::{
    config::NavConfig,
    display::TerminalDisplay,
    error::{NavError, Result},
    gps::source::{self, GpsSource},
    nav::geo::Haversine,
    nav::route::Route,
    navigator::Navigator,
    route_store,
    track::TrackLogger,
};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(
    name = "gps-navigator",
    about = "Navigate an ordered waypoint route from a live NMEA stream",
    version
)]
struct Cli {
    /// Serial port to read NMEA from (e.g. /dev/ttyUSB0)
    #[arg(long)]
    serial: Option<String>,

    /// Serial baud rate
    #[arg(long, default_value_t = 4800)]
    baud: u32,

    /// TCP NMEA source as host:port
    #[arg(long)]
    tcp: Option<String>,

    /// Route file to navigate (gpx, csv or json)
    #[arg(long)]
    route: Option<PathBuf>,

    /// Start at the waypoint closest to the first fix instead of the first
    /// waypoint
    #[arg(long)]
    closest: bool,

    /// Append a CSV track log to this file
    #[arg(long)]
    track_log: Option<PathBuf>,

    /// Seconds between track log entries
    #[arg(long)]
    log_interval: Option<u64>,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.list_ports {
        return source::list_serial_ports();
    }

    let mut config = NavConfig::load().unwrap_or_default();
    let mut overridden = false;
    if let Some(port) = cli.serial {
        config.update_serial(port, cli.baud);
        overridden = true;
    }
    if let Some(tcp) = cli.tcp {
        let (host, port) = tcp
            .split_once(':')
            .ok_or_else(|| NavError::Other(format!("Expected host:port, got {:?}", tcp)))?;
        let port: u16 = port
            .parse()
            .map_err(|_| NavError::Other(format!("Bad TCP port {:?}", port)))?;
        config.update_tcp(host.to_string(), port);
        overridden = true;
    }
    if cli.route.is_some() {
        config.route_file = cli.route;
    }
    if cli.track_log.is_some() {
        config.track_log = cli.track_log;
    }
    if let Some(interval) = cli.log_interval {
        config.nav.log_interval = interval;
    }

    if overridden {
        if let Err(e) = config.save() {
            eprintln!("Could not save configuration: {}", e);
        }
    }

    println!("Starting GPS Navigator...");

    let waypoints = match &config.route_file {
        Some(path) => {
            let waypoints = route_store::load_route(path)?;
            println!("Loaded {} waypoints from {}", waypoints.len(), path.display());
            waypoints
        }
        None => Vec::new(),
    };
    let mut route = Route::from_waypoints(waypoints);
    if !route.is_empty() && !cli.closest {
        route.set_current(0)?;
    }

    let navigator = Navigator::new(route, config.nav.clone());

    let track = match (&config.track_log, config.nav.log_interval) {
        (Some(path), interval) if interval > 0 => Some(TrackLogger::create(path, interval)?),
        _ => None,
    };

    let gps_source = GpsSource::from_config(&config)?;
    navigator.start(gps_source, track).await?;

    if cli.closest {
        // Wait for a usable position, then aim at the nearest waypoint.
        let state = navigator.state();
        let running = navigator.running();
        tokio::spawn(async move {
            while running.load(Ordering::Relaxed) {
                {
                    let mut guard = state.write().unwrap();
                    if guard.route.is_empty() {
                        break;
                    }
                    if let Ok(index) = guard.select_closest_waypoint(&Haversine) {
                        println!("Navigation starts at waypoint {}", index);
                        break;
                    }
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        });
    }

    let (tx, rx) = mpsc::unbounded_channel();
    navigator.start_alerts(tx);

    let display = TerminalDisplay::new();
    display.run(navigator.state(), navigator.running(), rx).await?;

    navigator.stop();
    Ok(())
}
