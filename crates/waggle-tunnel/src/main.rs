//! Tunnel daemon binary.
//!
//! # Usage
//!
//! ```bash
//! waggle-tunnel --inet 10.10.123.123 --serial /dev/ttyUSB0 [--verbose]
//! ```
//!
//! The interface address determines the radio addressing: the /16 network
//! half becomes the PAN identifier and the host half the module's 16-bit
//! address. Needs root (or CAP_NET_ADMIN) for the TUN device.

use std::net::Ipv4Addr;

use clap::Parser;
use signal_hook::{
    consts::{SIGHUP, SIGINT, SIGQUIT, SIGTERM},
    iterator::Signals,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use waggle_tunnel::{Tunnel, TunnelConfig};

/// UDP/IP tunnel daemon over an 802.15.4 radio link
#[derive(Parser, Debug)]
#[command(name = "waggle-tunnel")]
#[command(about = "Bridges a TUN interface onto an 802.15.4 radio link")]
#[command(version)]
struct Args {
    /// IP address to assign to the tunnel interface (/16 netmask; the
    /// network half is the PAN id, the host half the radio address)
    #[arg(short, long)]
    inet: Ipv4Addr,

    /// Serial device the radio module is connected to, e.g. /dev/ttyUSB0
    #[arg(short, long)]
    serial: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let mut signals = match Signals::new([SIGHUP, SIGINT, SIGTERM, SIGQUIT]) {
        Ok(signals) => signals,
        Err(e) => {
            tracing::error!("failed to install signal handlers: {e}");
            std::process::exit(1);
        }
    };
    std::thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            tracing::info!("caught signal {signal} - shutting down");
            std::process::exit(0);
        }
    });

    let config = TunnelConfig { serial: args.serial, inet: args.inet };
    tracing::info!(serial = %config.serial, inet = %config.inet, "tunnel daemon starting");

    let tunnel = match Tunnel::open(&config) {
        Ok(tunnel) => tunnel,
        Err(e) => {
            tracing::error!("failed to initialize the tunnel: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!("tunnel up and running");
    tunnel.run();

    // Both tunnel threads ended without a shutdown signal: the session is
    // dead and the daemon cannot continue.
    tracing::error!("tunnel threads exited; shutting down");
    std::process::exit(1);
}
