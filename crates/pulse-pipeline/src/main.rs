//! Pipeline executable: run the four-stage pipeline for a bounded
//! duration and print counters on shutdown.

use std::env;
use std::process;
use std::thread;
use std::time::Duration;

use pulse_pipeline::{Pipeline, PipelineConfig};

const DEFAULT_RUN_SECS: u64 = 10;

fn main() {
    let run_secs = env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(DEFAULT_RUN_SECS);

    let mut pipeline = Pipeline::new(PipelineConfig::default());

    println!("Starting trading pipeline...");
    if let Err(err) = pipeline.start() {
        eprintln!("failed to start pipeline: {}", err);
        process::exit(1);
    }
    println!("Pipeline started with 4 threads, running for {}s", run_secs);

    thread::sleep(Duration::from_secs(run_secs));

    println!("Stopping trading pipeline...");
    pipeline.stop();
}
