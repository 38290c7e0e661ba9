//! # Droid Simulator
//!
//! Stands in for a droid on the bench: emits telemetry at the firmware
//! cadence and applies the commands it receives.
//!
//! ## Usage
//!
//! ```bash
//! droid_sim --target 127.0.0.1:2001 --bind 0.0.0.0:2000 --skip-every 50
//! ```
//!
//! `--skip-every N` drops one sequence number every N frames so the ground
//! station's gap accounting has something to count.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use droidlink_networking::{
    DatagramTransport, LinkError, LinkResult, TickLoop, UdpTransport, DEFAULT_TICK_RATE,
};
use droidlink_shared::{
    decode_command, Command, FloatCommandId, Orientation, TelemetryFrame, COMMAND_PORT,
    MAX_DATAGRAM_SIZE, TELEMETRY_PORT,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> LinkResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("droid_sim=info")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let mut target = SocketAddr::from(([127, 0, 0, 1], TELEMETRY_PORT));
    let mut bind = SocketAddr::from(([0, 0, 0, 0], COMMAND_PORT));
    let mut tick_rate = DEFAULT_TICK_RATE;
    let mut skip_every: Option<u64> = None;
    let mut duration_secs: Option<u64> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--target" | "-t" => {
                if i + 1 < args.len() {
                    target = args[i + 1].parse().unwrap_or(target);
                    i += 1;
                }
            }
            "--bind" | "-b" => {
                if i + 1 < args.len() {
                    bind = args[i + 1].parse().unwrap_or(bind);
                    i += 1;
                }
            }
            "--tick-rate" | "-r" => {
                if i + 1 < args.len() {
                    tick_rate = args[i + 1].parse().unwrap_or(DEFAULT_TICK_RATE);
                    i += 1;
                }
            }
            "--skip-every" | "-s" => {
                if i + 1 < args.len() {
                    skip_every = args[i + 1].parse().ok().filter(|&n| n > 0);
                    i += 1;
                }
            }
            "--duration" | "-d" => {
                if i + 1 < args.len() {
                    duration_secs = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Usage: droid_sim [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -t, --target <ADDR>       Ground station telemetry address (default: 127.0.0.1:2001)");
                println!("  -b, --bind <ADDR>         Command listen address (default: 0.0.0.0:2000)");
                println!("  -r, --tick-rate <RATE>    Telemetry rate in Hz (default: 25)");
                println!("  -s, --skip-every <N>      Skip one sequence number every N frames");
                println!("  -d, --duration <SECS>     Run for N seconds then exit");
                println!("  -h, --help                Show this help");
                return Ok(());
            }
            other => warn!(argument = other, "ignoring unknown argument"),
        }
        i += 1;
    }

    let mut transport = UdpTransport::bind(bind).map_err(|source| LinkError::Bind { addr: bind, source })?;
    let mut droid = SimDroid::default();
    let mut tick_loop = TickLoop::new(tick_rate);
    let mut buf = [0u8; MAX_DATAGRAM_SIZE];

    info!(local = %transport.local_addr(), %target, tick_rate, "droid online");

    let start = Instant::now();
    loop {
        if let Some(limit) = duration_secs {
            if start.elapsed() >= Duration::from_secs(limit) {
                break;
            }
        }

        tick_loop.wait_for_next_tick();

        while tick_loop.should_tick() {
            let tick_start = tick_loop.begin_tick();

            loop {
                let (len, from) = match transport.try_recv(&mut buf) {
                    Ok(Some(received)) => received,
                    Ok(None) => break,
                    Err(error) => {
                        warn!(%error, "receive failed");
                        break;
                    }
                };
                match decode_command(&buf[..len]) {
                    Ok(decoded) => {
                        debug!(%from, sequence = decoded.sequence, command = ?decoded.command, "command");
                        droid.apply(decoded.command);
                    }
                    Err(error) => warn!(%from, %error, "bad command datagram"),
                }
            }

            let frame = droid.next_frame(tick_loop.tick_count(), skip_every);
            if let Err(error) = transport.send_to(&frame.encode(), target) {
                warn!(%target, %error, "telemetry send failed");
            }

            tick_loop.end_tick(tick_start);
        }
    }

    let stats = transport.stats();
    info!(
        sent = stats.packets_sent,
        received = stats.packets_received,
        commands = droid.commands,
        "droid offline"
    );
    Ok(())
}

/// Simulated droid state driven by received commands.
#[derive(Default)]
struct SimDroid {
    sequence: u8,
    servos: [f32; 4],
    drive_speed: f32,
    turn_speed: f32,
    heading: i16,
    commands: u64,
}

impl SimDroid {
    fn apply(&mut self, command: Command) {
        self.commands += 1;
        match command {
            Command::SetServo { index, value } => match self.servos.get_mut(usize::from(index)) {
                Some(slot) => *slot = value,
                None => warn!(index, "servo index out of range"),
            },
            Command::SetAllServos(values) => self.servos = values,
            Command::Float { command: FloatCommandId::SetDriveMotorSpeed, value } => {
                self.drive_speed = value;
            }
            Command::Float { command: FloatCommandId::SetTurnMotorSpeed, value } => {
                self.turn_speed = value;
            }
            Command::Fixed(command) => info!(?command, "special command"),
        }
    }

    fn next_frame(&mut self, tick: u64, skip_every: Option<u64>) -> TelemetryFrame {
        self.sequence = self.sequence.wrapping_add(1);
        if skip_every.is_some_and(|n| tick % n == 0) {
            self.sequence = self.sequence.wrapping_add(1);
        }

        // Turn speed in [-1, 1] swings the heading by up to 10 units per frame
        let delta = (self.turn_speed.clamp(-1.0, 1.0) * 10.0).round();
        self.heading = self.heading.wrapping_add(delta_units(delta));

        TelemetryFrame {
            sequence: self.sequence,
            imus_ok: true,
            motors_ok: true,
            servos_ok: true,
            dome: Orientation::new(0, 0, self.heading),
            body: Orientation::new(0, delta_units((self.drive_speed.clamp(-1.0, 1.0) * 100.0).round()), self.heading),
            servos: self.servos,
        }
    }
}

/// Converts an already clamped and rounded float into sensor units.
#[allow(clippy::cast_possible_truncation)]
fn delta_units(value: f32) -> i16 {
    value as i16
}
