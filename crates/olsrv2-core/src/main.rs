//! OLSRv2/NHDP mesh routing daemon.
//!
//! Wires a bootstrapped [`olsrv2_core::Core`] into a single cooperative
//! event loop. Inbound HELLO/TC ingestion normally arrives by an external
//! RFC 5444 codec calling `Core::on_hello`/`Core::on_tc` directly; this
//! binary owns only the timer-driven maintenance tick (link/TC-node
//! expiry, route recomputation, FIB retry) and graceful shutdown, since
//! the wire codec, OS interface monitor, and kernel FIB IPC are external
//! collaborators (spec §1 Out of scope).

use clap::Parser;
use olsrv2_core::addr::NetAddr;
use olsrv2_core::config::ConfigSet;
use olsrv2_core::fib::{FibAckResult, FibDriver, FibOp, FibRoute};
use olsrv2_core::Core;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, Level};

#[derive(Parser, Debug)]
#[command(name = "olsrv2d", about = "OLSRv2/NHDP mesh routing daemon")]
struct Args {
    /// Path to the `[olsrv2]`/`[domain=N]`/`[interface=X]` config file.
    #[arg(long, default_value = "/etc/olsrv2d/olsrv2d.conf")]
    config: PathBuf,

    /// Overrides the local originator address; primarily for tests that
    /// need a deterministic identity without an OS address monitor.
    #[arg(long)]
    originator: Option<String>,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    info!("olsrv2d: starting");
    match run(args).await {
        Ok(()) => {
            info!("olsrv2d: exiting normally");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "olsrv2d: exiting with error");
            Err(e)
        }
    }
}

fn init_logging(level: &str) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let level: Level = level.parse().unwrap_or(Level::INFO);
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

async fn run(args: Args) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(&args.config)
        .map_err(|e| format!("reading {}: {e}", args.config.display()))?;
    let config = ConfigSet::parse(&text)?;

    let originator = match &args.originator {
        Some(addr) => addr.parse().map(NetAddr::host)?,
        None => return Err("no originator address configured; pass --originator".into()),
    };

    let mut core = Core::bootstrap(config, originator)?;
    let shutdown = setup_signal_handler();
    let mut driver = LoggingFibDriver::default();

    let tc_interval = core.config.olsrv2.tc_interval;
    let mut ticker = tokio::time::interval(tc_interval);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("olsrv2d: shutdown requested");
            break;
        }
        tokio::select! {
            _ = ticker.tick() => {
                core.tick(std::time::Instant::now(), &mut driver);
            }
        }
    }

    core.shutdown(&mut driver, std::time::Duration::from_secs(2));
    Ok(())
}

fn setup_signal_handler() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let flag_clone = flag.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("olsrv2d: received shutdown signal");
            flag_clone.store(true, Ordering::Relaxed);
        }
    });
    flag
}

/// Stand-in for the real per-platform kernel FIB IPC (spec §1 Out of
/// scope): logs what would be installed instead of touching the kernel,
/// acking every op immediately so the reconciler's installed-set
/// bookkeeping still behaves as if routes landed.
#[derive(Default)]
struct LoggingFibDriver {
    next_seq: u64,
    pending_acks: Vec<(u64, FibAckResult)>,
}

impl FibDriver for LoggingFibDriver {
    fn submit(&mut self, op: FibOp, route: FibRoute) -> u64 {
        self.next_seq += 1;
        info!(seq = self.next_seq, op = ?op, dst = %route.key, table = route.table, "fib op (logging driver, not installed)");
        self.pending_acks.push((self.next_seq, Ok(())));
        self.next_seq
    }

    fn supports_source_specific(&self, _family: olsrv2_core::fib::Family) -> bool {
        false
    }

    fn drain_acks(&mut self) -> Vec<(u64, FibAckResult)> {
        std::mem::take(&mut self.pending_acks)
    }

    fn query(&self, _table: u8) -> Vec<FibRoute> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_driver_acks_every_submitted_op() {
        let mut driver = LoggingFibDriver::default();
        let route = FibRoute {
            family: olsrv2_core::fib::Family::V4,
            key: olsrv2_core::addr::RouteKey::destination_only("10.0.0.0/8".parse().unwrap()),
            gateway: "10.0.0.1".parse().unwrap(),
            src_ip: None,
            metric: 10,
            table: 254,
            protocol: 100,
            if_index: 2,
            route_type: olsrv2_core::fib::RouteType::Unicast,
        };
        let seq = driver.submit(FibOp::Add, route);
        assert_eq!(driver.drain_acks(), vec![(seq, Ok(()))]);
        assert!(driver.query(254).is_empty());
    }
}
