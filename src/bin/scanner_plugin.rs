// src/bin/scanner_plugin.rs

//! netdata plugin charting a mail-scanner verdict log.

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::warn;
use structopt::StructOpt;

use tailstats::collector::scanner::ScannerCollector;
use tailstats::tailer::watcher::watcher;
use tailstats::tailer::Engine;

const DEFAULT_PATH: &str = "/var/log/scanner/current";
const DEFAULT_INTERVAL: u64 = 1;

/// Command-line arguments, per the netdata plugin convention.
#[derive(Debug, StructOpt)]
#[structopt(name = "scanner-plugin")]
struct Args {
    /// Reporting interval in seconds.
    interval: Option<u64>,

    /// Path of the log file to tail.
    #[structopt(parse(from_os_str))]
    path: Option<PathBuf>,
}

fn main() -> io::Result<()> {
    env_logger::init();

    let args = Args::from_args();
    let interval = args.interval.unwrap_or_else(|| {
        warn!(
            "usage: scanner-plugin <interval> [path]; defaulting to {}s",
            DEFAULT_INTERVAL
        );
        DEFAULT_INTERVAL
    });
    let path = args.path.unwrap_or_else(|| PathBuf::from(DEFAULT_PATH));

    let running = Arc::new(AtomicBool::new(true));
    let stop = Arc::clone(&running);
    ctrlc::set_handler(move || stop.store(false, Ordering::Relaxed))
        .map_err(|error| io::Error::new(io::ErrorKind::Other, error))?;

    let mut engine = Engine::new(watcher()?, Box::new(io::stdout()));
    engine.add_source(&path, Box::new(ScannerCollector::new()))?;
    engine.run(Duration::from_secs(interval), &running)
}
