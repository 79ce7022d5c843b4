//! Dedicated worker binary for the subprocess execution harness.
//!
//! Registers the demo jobs and immediately hands control to
//! `run_worker_if_requested`, which reads one job request off stdin, runs
//! it, writes the response to stdout, and exits. Having a standalone binary
//! (rather than always re-exec'ing the caller's own executable) gives
//! integration tests a fixed worker path via
//! `env!("CARGO_BIN_EXE_autotrail-subprocess-worker")`.

use autotrail::demo::register_demo_jobs;
use autotrail::subprocess::run_worker_if_requested;

#[tokio::main]
async fn main() {
    register_demo_jobs();
    run_worker_if_requested().await;
    // Reached only if this binary was invoked without the worker
    // environment variable set; there is nothing else for it to do.
    eprintln!("autotrail-subprocess-worker: expected to be spawned as a subprocess job worker");
    std::process::exit(1);
}
