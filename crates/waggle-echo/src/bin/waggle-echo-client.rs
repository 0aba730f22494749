//! Echo client: benchmarks the tunnel with the UDP echo protocol.
//!
//! Sends random payloads to UDP port 7 of the given host (a peer reachable
//! through a running tunnel daemon), waits for each echo, and reports
//! per-iteration round-trip times. `--fork` runs several workers
//! concurrently, each with its own socket.
//!
//! # Usage
//!
//! ```bash
//! waggle-echo-client --address 10.10.10.10 --length 32 --iterate 10
//! ```

use std::{
    io,
    net::{Ipv4Addr, UdpSocket},
    thread,
    time::{Duration, Instant},
};

use clap::Parser;
use rand::Rng;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use waggle_proto::MAX_DATAGRAM_PAYLOAD;

/// UDP port of the echo service.
const ECHO_PORT: u16 = 7;

/// How long to wait for each echo.
const RECEIVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Echo client for peers reachable through the radio tunnel
#[derive(Parser, Debug)]
#[command(name = "waggle-echo-client")]
#[command(about = "Sends echo requests through the radio tunnel and measures round trips")]
#[command(version)]
struct Args {
    /// IP address of the echo server, e.g. 10.10.10.10
    #[arg(short, long, required_unless_present = "terms")]
    address: Option<Ipv4Addr>,

    /// Length of the echo message in bytes (capped at 92)
    #[arg(short, long, default_value_t = 8)]
    length: usize,

    /// Number of iterations
    #[arg(short, long, default_value_t = 1)]
    iterate: u32,

    /// Number of concurrent workers (0 runs a single worker inline)
    #[arg(short, long, default_value_t = 0)]
    fork: u32,

    /// Show license terms and conditions
    #[arg(short, long)]
    terms: bool,
}

#[derive(Debug, Default)]
struct Stats {
    errors: u32,
    round_trips_ms: Vec<u128>,
}

impl Stats {
    fn merge(&mut self, other: Stats) {
        self.errors += other.errors;
        self.round_trips_ms.extend(other.round_trips_ms);
    }
}

fn main() {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    if args.terms {
        print_terms();
        return;
    }
    let Some(server) = args.address else {
        // clap enforces this; belt and braces for the --terms interaction.
        tracing::error!("no echo server address given");
        std::process::exit(1);
    };

    let length = args.length.min(MAX_DATAGRAM_PAYLOAD);
    if length != args.length {
        tracing::warn!("echo length capped at {MAX_DATAGRAM_PAYLOAD} bytes");
    }

    let stats = if args.fork == 0 {
        worker(0, server, length, args.iterate)
    } else {
        let mut merged = Stats::default();
        let workers: Vec<_> = (0..args.fork)
            .map(|id| thread::spawn(move || worker(id, server, length, args.iterate)))
            .collect();
        for handle in workers {
            match handle.join() {
                Ok(stats) => merged.merge(stats),
                Err(_) => merged.errors += 1,
            }
        }
        merged
    };

    report(&stats, length);
    if stats.round_trips_ms.is_empty() {
        std::process::exit(1);
    }
}

/// One echo worker: its own socket, `iterations` request/response rounds.
fn worker(id: u32, server: Ipv4Addr, length: usize, iterations: u32) -> Stats {
    let mut stats = Stats::default();

    let socket = match open_socket() {
        Ok(socket) => socket,
        Err(e) => {
            tracing::error!("[{id}] failed to open the echo socket: {e}");
            stats.errors += iterations.max(1);
            return stats;
        }
    };

    let mut rng = rand::thread_rng();
    let mut response = vec![0u8; length + 1];

    for iteration in 0..iterations {
        tracing::info!("[{id}] iteration {}/{}", iteration + 1, iterations);

        let request: Vec<u8> = (0..length).map(|_| rng.r#gen()).collect();
        let started = Instant::now();

        if let Err(e) = socket.send_to(&request, (server, ECHO_PORT)) {
            tracing::warn!("[{id}] failed to send the echo request: {e}");
            stats.errors += 1;
            continue;
        }

        match socket.recv_from(&mut response) {
            Ok((received, from)) => {
                let elapsed = started.elapsed().as_millis();
                if received != length {
                    tracing::warn!(
                        "[{id}] echo size mismatch: received {received} bytes, expected {length}"
                    );
                    stats.errors += 1;
                } else if from.ip() != server {
                    tracing::warn!("[{id}] unexpected echo from {from}, expected {server}");
                    stats.errors += 1;
                } else if response[..received] != request[..] {
                    tracing::warn!("[{id}] echo data mismatch");
                    stats.errors += 1;
                } else {
                    tracing::info!("[{id}] received echo after {elapsed} ms");
                    stats.round_trips_ms.push(elapsed);
                }
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                tracing::warn!("[{id}] timeout while waiting for the echo");
                stats.errors += 1;
            }
            Err(e) => {
                tracing::warn!("[{id}] echo receive error: {e}");
                stats.errors += 1;
            }
        }
    }

    stats
}

fn open_socket() -> io::Result<UdpSocket> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.set_read_timeout(Some(RECEIVE_TIMEOUT))?;
    Ok(socket)
}

fn report(stats: &Stats, length: usize) {
    tracing::info!("finished with {} errors", stats.errors);
    if stats.round_trips_ms.is_empty() {
        return;
    }

    let count = stats.round_trips_ms.len() as u128;
    let sum: u128 = stats.round_trips_ms.iter().sum();
    let min = stats.round_trips_ms.iter().min().copied().unwrap_or(0);
    let max = stats.round_trips_ms.iter().max().copied().unwrap_or(0);
    tracing::info!(
        "echo length = {length} bytes: avg = {} ms, min = {min} ms, max = {max} ms",
        sum / count
    );
}

fn print_terms() {
    println!("Licensed under the Apache License, Version 2.0 (the \"License\");");
    println!("you may not use this software except in compliance with the License.");
    println!("You may obtain a copy of the License at");
    println!();
    println!("    http://www.apache.org/licenses/LICENSE-2.0");
    println!();
    println!("Unless required by applicable law or agreed to in writing, software");
    println!("distributed under the License is distributed on an \"AS IS\" BASIS,");
    println!("WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.");
}
