//! Pipeline runtime: worker threads, backpressure, counters, and
//! cooperative shutdown around the core matching components.

pub mod pipeline;

pub use pipeline::{CounterReport, Pipeline, PipelineConfig, PipelineCounters, QUEUE_SIZE};
