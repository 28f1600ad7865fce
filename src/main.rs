//! RakshakIO - Telemetry and command daemon for the Rakshak personal tracker
//!
//! Single cooperative control loop: transport events and inbound commands
//! are serviced, the navigation stream is drained, telemetry goes out on
//! its configured intervals, and position reports are relayed to the
//! backend. The wireless link runs the in-process simulation backend;
//! vendor radio stacks plug in out-of-tree behind the same trait.

use log::{debug, error, info, warn};
use rakshak_io::config::AppConfig;
use rakshak_io::error::{Error, Result};
use rakshak_io::gps;
use rakshak_io::link::{mock::MockLink, Channel, LinkEngine, SERVICE_UUID};
use rakshak_io::store::{DeviceSettings, FileStore};
use rakshak_io::types::MotionSample;
use rakshak_io::uplink::{BackendReporter, MockClient, TrackerReport};
use std::env;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Exit code telling the supervisor to restart the device process.
const RESTART_EXIT_CODE: i32 = 10;

/// Battery gauge placeholder for the simulation backend.
const SIM_BATTERY_LEVEL: u8 = 100;

/// Parse config path from command line arguments.
///
/// Supports:
/// - `rakshak-io <path>` (positional)
/// - `rakshak-io --config <path>` (flag-based)
/// - `rakshak-io -c <path>` (short flag)
///
/// Defaults to `/etc/rakshak.toml` if not specified.
fn parse_config_path() -> String {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return args[1].clone();
    }

    "/etc/rakshak.toml".to_string()
}

fn main() -> Result<()> {
    let config_path = parse_config_path();
    let config = if Path::new(&config_path).exists() {
        AppConfig::from_file(&config_path)?
    } else {
        AppConfig::tracker_defaults()
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&config.logging.level),
    )
    .init();

    info!("RakshakIO v{} starting...", env!("CARGO_PKG_VERSION"));
    if Path::new(&config_path).exists() {
        info!("Using config: {}", config_path);
    } else {
        info!("Config {} not found, using tracker defaults", config_path);
    }

    // Credential store and typed settings facade
    let store = FileStore::open(&config.storage.credentials_path)?;
    let mut settings = DeviceSettings::new(store);
    match settings.wifi_ssid()? {
        Some(ssid) => info!("Network provisioned for \"{}\"", ssid),
        None => warn!("Network credentials not provisioned"),
    }

    // Wireless link
    let link = match config.link.backend.as_str() {
        "sim" => MockLink::new(),
        other => {
            return Err(Error::NotSupported(format!(
                "link backend '{}' (vendor radio stacks are out-of-tree)",
                other
            )))
        }
    };
    let peer = link.clone();
    let mut engine = LinkEngine::new(link);
    info!(
        "Advertising link service {} as \"{}\"",
        SERVICE_UUID, config.device.name
    );
    for channel in [
        Channel::SensorData,
        Channel::GpsData,
        Channel::Config,
        Channel::DeviceStatus,
    ] {
        debug!("Characteristic {:?} at {}", channel, channel.uuid());
    }

    // Navigation receiver
    let mut gps = gps::create_monitor(&config)?;

    // Backend uplink; a stored endpoint credential overrides the config URL
    let mut reporter = BackendReporter::new(MockClient::connected(), &config.uplink.base_url);
    if let Some(endpoint) = settings.api_endpoint()? {
        reporter.set_base_url(&endpoint);
    }

    // The simulated bench peer connects immediately so telemetry flows
    // end-to-end without a radio.
    peer.connect_peer();

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    info!("RakshakIO running. Press Ctrl-C to stop.");

    let start = Instant::now();
    let mut next_motion = 0u64;
    let mut next_position = 0u64;
    let mut next_status = 0u64;
    let mut next_report = config.uplink.report_interval_ms;
    let mut restart = false;

    while running.load(Ordering::Relaxed) {
        let now_ms = start.elapsed().as_millis() as u64;

        if let Err(e) = engine.service(now_ms, &mut settings) {
            error!("Link service error: {}", e);
        }
        if engine.restart_due(now_ms) {
            restart = true;
            break;
        }

        if let Err(e) = gps.ingest(now_ms) {
            error!("GPS ingest error: {}", e);
        }

        // A GET_STATUS command gets its answer ahead of the usual cadence
        if engine.take_status_request() {
            if let Err(e) =
                engine.publish_status(now_ms, reporter.link_up(), gps.has_fix(), SIM_BATTERY_LEVEL)
            {
                error!("Status publish error: {}", e);
            }
        }

        if now_ms >= next_motion {
            let sample = MotionSample {
                az: 1.0,
                ..MotionSample::default()
            };
            if let Err(e) = engine.publish_motion(now_ms, &sample) {
                error!("Motion publish error: {}", e);
            }
            next_motion = now_ms + config.telemetry.motion_interval_ms;
        }

        if now_ms >= next_position {
            if let Err(e) = engine.publish_position(
                now_ms,
                gps.has_fix(),
                gps.satellites(),
                gps.latitude(now_ms),
                gps.longitude(now_ms),
                gps.altitude(now_ms),
            ) {
                error!("Position publish error: {}", e);
            }
            debug!("{}", gps.status_message(now_ms));
            next_position = now_ms + config.telemetry.position_interval_ms;
        }

        if now_ms >= next_status {
            if let Err(e) =
                engine.publish_status(now_ms, reporter.link_up(), gps.has_fix(), SIM_BATTERY_LEVEL)
            {
                error!("Status publish error: {}", e);
            }
            next_status = now_ms + config.telemetry.status_interval_ms;
        }

        if config.uplink.enabled && now_ms >= next_report {
            let report = TrackerReport {
                timestamp: now_ms,
                gps_status: gps.status(now_ms) as u8,
                fix: gps.has_fix(),
                satellites: gps.satellites(),
                latitude: gps.latitude(now_ms),
                longitude: gps.longitude(now_ms),
                altitude: gps.altitude(now_ms),
                battery_level: SIM_BATTERY_LEVEL,
            };
            match settings.api_key() {
                Ok(key) => {
                    if let Err(e) =
                        reporter.report_position(key.as_deref(), &config.uplink.report_path, &report)
                    {
                        warn!("Backend report failed: {}", e);
                    }
                }
                Err(e) => error!("Credential store read failed: {}", e),
            }
            next_report = now_ms + config.uplink.report_interval_ms;
        }

        // Drain what the simulated peer received
        for (channel, payload) in peer.take_notified() {
            debug!("Peer received {} bytes on {:?}", payload.len(), channel);
        }

        std::thread::sleep(Duration::from_millis(10));
    }

    if restart {
        warn!("Restart command executed, exiting for supervisor restart");
        std::process::exit(RESTART_EXIT_CODE);
    }

    info!("RakshakIO stopped");
    Ok(())
}
