//! # Ground Station
//!
//! Listens for droid telemetry, selects the first droid heard and keeps the
//! command link flushed every tick.
//!
//! ## Usage
//!
//! ```bash
//! ground_station --config droidlink.toml --duration 60 --broadcast
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `droidlink_networking=info`).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use droidlink_networking::{
    LinkConfig, LinkController, LinkEvent, LinkResult, TickLoop, TickReport,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Seconds between status lines.
const STATUS_INTERVAL_SECS: u64 = 5;

fn main() -> LinkResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("droidlink_networking=info,ground_station=info")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;
    let mut duration_secs: Option<u64> = None;
    let mut broadcast = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--duration" | "-d" => {
                if i + 1 < args.len() {
                    duration_secs = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--broadcast" | "-b" => broadcast = true,
            "--help" | "-h" => {
                println!("Usage: ground_station [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <FILE>     TOML link configuration");
                println!("  -d, --duration <SECS>   Run for N seconds then exit");
                println!("  -b, --broadcast         Send commands to the broadcast address");
                println!("  -h, --help              Show this help");
                return Ok(());
            }
            other => warn!(argument = other, "ignoring unknown argument"),
        }
        i += 1;
    }

    let mut config = match &config_path {
        Some(path) => {
            info!(path = %path, "loading configuration");
            LinkConfig::load(path)?
        }
        None => LinkConfig::default(),
    };
    config.broadcast |= broadcast;

    let mut tick_loop = TickLoop::new(config.tick_rate);
    let status_every = u64::from(config.tick_rate) * STATUS_INTERVAL_SECS;
    let mut link = LinkController::open(config)?;

    let discovered = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&discovered);
    link.set_discovery_callback(move || flag.store(true, Ordering::Relaxed));
    let events = link.events();

    info!(local = %link.local_addr(), "waiting for droids");

    let start = Instant::now();
    let mut last_status = 0u64;
    let mut window = TickReport::default();

    loop {
        if let Some(limit) = duration_secs {
            if start.elapsed() >= Duration::from_secs(limit) {
                break;
            }
        }

        tick_loop.wait_for_next_tick();

        while tick_loop.should_tick() {
            let tick_start = tick_loop.begin_tick();
            let report = link.tick();
            window.merge(&report);
            tick_loop.end_tick(tick_start);

            if discovered.swap(false, Ordering::Relaxed) {
                info!(droids = ?link.discovered(), "droid list changed");
            }

            for event in events.try_iter() {
                if let LinkEvent::SendFailed { target, sequence } = event {
                    warn!(%target, sequence, "command lost");
                }
            }

            let current_tick = tick_loop.tick_count();
            if current_tick - last_status >= status_every {
                last_status = current_tick;
                report_status(&link, &tick_loop, &window, start);
                window = TickReport::default();
            }
        }
    }

    report_status(&link, &tick_loop, &window, start);
    link.close();
    Ok(())
}

/// Logs the selected droid and link health; `window` covers the ticks since
/// the previous status line.
fn report_status(link: &LinkController, tick_loop: &TickLoop, window: &TickReport, start: Instant) {
    let view = link.telemetry();
    let tracker = link.sequence_tracker();
    let stats = link.stats();
    let transport = link.transport_stats();
    let ticks = tick_loop.stats();

    info!(
        uptime_s = start.elapsed().as_secs(),
        selected = ?link.selected(),
        stale = link.selected_is_stale(Instant::now()),
        rate_hz = link.message_rate_hz(),
        sequence = view.sequence(),
        imus_ok = view.imus_ok(),
        motors_ok = view.motors_ok(),
        servos_ok = view.servos_ok(),
        dome = ?view.dome_orientation().as_tuple(),
        body = ?view.body_orientation().as_tuple(),
        servos = ?view.servo_channels(),
        "status"
    );
    info!(
        good = tracker.good_frames(),
        dropped = tracker.dropped_frames(),
        drop_ratio = tracker.drop_ratio(),
        rejected = stats.datagrams_rejected,
        commands_sent = stats.commands_sent,
        send_failures = stats.send_failures,
        bytes_in = transport.bytes_received,
        bytes_out = transport.bytes_sent,
        avg_tick = ?ticks.avg_tick,
        late_ticks = ticks.late_ticks,
        "link"
    );
    info!(
        received = window.drain.received,
        accepted = window.drain.accepted,
        rejected = window.drain.rejected,
        discovered = window.drain.discovered,
        sent = window.sent,
        send_failures = window.send_failures,
        held = window.held,
        "window"
    );
}
