//! Four-stage trading pipeline.
//!
//! ```text
//! ingress -> [bytes] -> parse -> [requests] -> match -> [trades] -> log
//! ```
//!
//! Every arrow is an SPSC ring; every stage runs on its own thread
//! and exclusively owns its state (generator, parser, engine, log
//! sink). Queues are the only cross-stage channel. A full downstream
//! queue makes the producer yield and retry; it never drops.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use hdrhistogram::Histogram;
use pulse_core::{MatchingEngine, OrderBook, OrderRequest, SymbolId, TradeEvent};
use pulse_gen::OrderFlowGenerator;
use pulse_log::{LogLevel, Logger, OverflowPolicy};
use pulse_metrics::{LatencySummary, NanoClock};
use pulse_proto::{BinaryCodec, CancelOrderMessage, MessageParser, NewOrderMessage};
use pulse_ring::{Consumer, Producer, SpscRing};

/// Capacity of every inter-stage queue.
pub const QUEUE_SIZE: usize = 1024;

/// Pool capacity for the engine's book.
const BOOK_CAPACITY: usize = 1 << 18;

/// Consumer sleep when the request queues are empty.
const PARSE_IDLE: Duration = Duration::from_micros(1);
/// Consumer sleep when the trade queue is empty.
const LOG_IDLE: Duration = Duration::from_micros(10);

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub symbol_id: u32,
    /// Trade log destination, opened in append mode.
    pub log_path: PathBuf,
    /// Fixed generator seed; `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            symbol_id: 1,
            log_path: PathBuf::from("trades.log"),
            seed: None,
        }
    }
}

/// Shared stage counters, relaxed: observability only.
#[derive(Default)]
pub struct PipelineCounters {
    pub orders_generated: AtomicU64,
    pub orders_parsed: AtomicU64,
    pub parse_errors: AtomicU64,
    pub orders_matched: AtomicU64,
    pub trades_logged: AtomicU64,
}

impl PipelineCounters {
    pub fn snapshot(&self) -> CounterReport {
        CounterReport {
            orders_generated: self.orders_generated.load(Ordering::Relaxed),
            orders_parsed: self.orders_parsed.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            orders_matched: self.orders_matched.load(Ordering::Relaxed),
            trades_logged: self.trades_logged.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the counters.
#[derive(Clone, Copy, Debug)]
pub struct CounterReport {
    pub orders_generated: u64,
    pub orders_parsed: u64,
    pub parse_errors: u64,
    pub orders_matched: u64,
    pub trades_logged: u64,
}

impl fmt::Display for CounterReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Pipeline Statistics ===")?;
        writeln!(f, "Orders Generated: {}", self.orders_generated)?;
        writeln!(f, "Orders Parsed:    {}", self.orders_parsed)?;
        writeln!(f, "Parse Errors:     {}", self.parse_errors)?;
        writeln!(f, "Orders Matched:   {}", self.orders_matched)?;
        writeln!(f, "Trades Logged:    {}", self.trades_logged)?;
        write!(f, "===========================")
    }
}

/// The pipeline: four workers around three SPSC queues.
///
/// `stop()` (or drop) flips the running flag, joins every worker,
/// and lets the log sink drain, so all threads and file handles are
/// released on every exit path.
pub struct Pipeline {
    config: PipelineConfig,
    running: Arc<AtomicBool>,
    counters: Arc<PipelineCounters>,
    workers: Vec<JoinHandle<()>>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(PipelineCounters::default()),
            workers: Vec::new(),
        }
    }

    pub fn counters(&self) -> &PipelineCounters {
        &self.counters
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Open the log sink and launch the four stage threads.
    ///
    /// Fails fatally when the log file cannot be opened. Starting an
    /// already-running pipeline is a no-op.
    pub fn start(&mut self) -> io::Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        let mut logger = Logger::create(&self.config.log_path, OverflowPolicy::Drop)?;
        logger.log(LogLevel::Info, "# timestamp_ns,maker_id,taker_id,price,quantity");

        self.running.store(true, Ordering::SeqCst);

        let (frame_tx, frame_rx) = SpscRing::<Vec<u8>, QUEUE_SIZE>::new().split();
        let (request_tx, request_rx) = SpscRing::<OrderRequest, QUEUE_SIZE>::new().split();
        let (trade_tx, trade_rx) = SpscRing::<TradeEvent, QUEUE_SIZE>::new().split();

        let symbol = SymbolId(self.config.symbol_id);
        let generator = match self.config.seed {
            Some(seed) => OrderFlowGenerator::new(symbol, seed),
            None => OrderFlowGenerator::from_entropy(symbol),
        };

        let (running, counters) = (Arc::clone(&self.running), Arc::clone(&self.counters));
        self.workers.push(
            thread::Builder::new()
                .name("ingress".into())
                .spawn(move || ingress_stage(generator, frame_tx, running, counters))?,
        );

        let (running, counters) = (Arc::clone(&self.running), Arc::clone(&self.counters));
        self.workers.push(
            thread::Builder::new()
                .name("parse".into())
                .spawn(move || parse_stage(frame_rx, request_tx, running, counters))?,
        );

        let (running, counters) = (Arc::clone(&self.running), Arc::clone(&self.counters));
        self.workers.push(
            thread::Builder::new()
                .name("match".into())
                .spawn(move || match_stage(request_rx, trade_tx, running, counters))?,
        );

        let (running, counters) = (Arc::clone(&self.running), Arc::clone(&self.counters));
        self.workers.push(
            thread::Builder::new()
                .name("log".into())
                .spawn(move || log_stage(trade_rx, logger, running, counters))?,
        );

        Ok(())
    }

    /// Cooperative shutdown: flip the flag, join in flow order,
    /// report counters.
    pub fn stop(&mut self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }

        println!("{}", self.counters.snapshot());
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Push with backpressure: yield and retry while the queue is full,
/// bailing out when the pipeline stops. Returns whether the item was
/// delivered.
fn push_or_yield<T: Send, const N: usize>(
    tx: &mut Producer<T, N>,
    mut item: T,
    running: &AtomicBool,
) -> bool {
    loop {
        match tx.try_push(item) {
            Ok(()) => return true,
            Err(back) => {
                if !running.load(Ordering::Acquire) {
                    return false;
                }
                item = back;
                thread::yield_now();
            }
        }
    }
}

/// Stage 1: draw synthetic requests, encode to wire frames.
fn ingress_stage(
    mut generator: OrderFlowGenerator,
    mut tx: Producer<Vec<u8>, QUEUE_SIZE>,
    running: Arc<AtomicBool>,
    counters: Arc<PipelineCounters>,
) {
    while running.load(Ordering::Acquire) {
        let request = generator.next_request();

        let frame = match request {
            OrderRequest::New(order) => BinaryCodec::encode(&NewOrderMessage::from_order(&order)),
            OrderRequest::Cancel {
                order_id,
                symbol_id,
            } => BinaryCodec::encode(&CancelOrderMessage::from_ids(order_id, symbol_id)),
            // The generator never emits modify.
            OrderRequest::Modify { .. } => continue,
        };

        if !push_or_yield(&mut tx, frame, &running) {
            return;
        }
        counters.orders_generated.fetch_add(1, Ordering::Relaxed);

        let delay = generator.next_arrival_micros();
        if delay > 0 {
            thread::sleep(Duration::from_micros(delay));
        }
    }
}

/// Stage 2: decode frames into requests. Malformed frames are
/// counted and dropped; the stage keeps going.
fn parse_stage(
    mut rx: Consumer<Vec<u8>, QUEUE_SIZE>,
    mut tx: Producer<OrderRequest, QUEUE_SIZE>,
    running: Arc<AtomicBool>,
    counters: Arc<PipelineCounters>,
) {
    while running.load(Ordering::Acquire) {
        match rx.try_pop() {
            Some(frame) => match MessageParser::parse(&frame) {
                Ok(request) => {
                    if !push_or_yield(&mut tx, request, &running) {
                        return;
                    }
                    counters.orders_parsed.fetch_add(1, Ordering::Relaxed);
                }
                Err(_) => {
                    counters.parse_errors.fetch_add(1, Ordering::Relaxed);
                }
            },
            None => thread::sleep(PARSE_IDLE),
        }
    }
}

/// Stage 3: the matching engine. Owns the book; emits trades.
fn match_stage(
    mut rx: Consumer<OrderRequest, QUEUE_SIZE>,
    mut tx: Producer<TradeEvent, QUEUE_SIZE>,
    running: Arc<AtomicBool>,
    counters: Arc<PipelineCounters>,
) {
    let mut engine = MatchingEngine::with_book(OrderBook::with_capacity(BOOK_CAPACITY));
    let mut latency = Histogram::<u64>::new(3).expect("sigfig in 1..=5");
    let clock = NanoClock::new();

    while running.load(Ordering::Acquire) {
        match rx.try_pop() {
            Some(request) => {
                let start = clock.now_ns();
                engine.process(request);

                for trade in engine.drain_trades() {
                    if !push_or_yield(&mut tx, trade, &running) {
                        return;
                    }
                }

                let _ = latency.record(clock.delta_ns(start, clock.now_ns()));
                counters.orders_matched.fetch_add(1, Ordering::Relaxed);
            }
            None => thread::sleep(PARSE_IDLE),
        }
    }

    if latency.len() > 0 {
        let summary = LatencySummary {
            p50: latency.value_at_quantile(0.50),
            p90: latency.value_at_quantile(0.90),
            p99: latency.value_at_quantile(0.99),
            p999: latency.value_at_quantile(0.999),
            max: latency.max(),
            count: latency.len(),
        };
        println!("match stage latency: {}", summary);
    }
}

/// Stage 4: format trades and feed the log sink. On shutdown it
/// drains whatever is still queued, then flushes.
fn log_stage(
    mut rx: Consumer<TradeEvent, QUEUE_SIZE>,
    mut logger: Logger,
    running: Arc<AtomicBool>,
    counters: Arc<PipelineCounters>,
) {
    let mut line = String::with_capacity(128);

    let mut write_trade = |logger: &mut Logger, line: &mut String, trade: TradeEvent| {
        use std::fmt::Write as _;
        line.clear();
        let _ = write!(
            line,
            "{},{},{},{},{}",
            trade.timestamp_ns,
            trade.maker_order_id.0,
            trade.taker_order_id.0,
            trade.price.to_f64(),
            trade.quantity.raw(),
        );
        // Counted only when the sink accepts it, so the counter
        // mirrors what actually reaches the file.
        if logger.log(LogLevel::Info, line) {
            counters.trades_logged.fetch_add(1, Ordering::Relaxed);
        }
    };

    while running.load(Ordering::Acquire) {
        match rx.try_pop() {
            Some(trade) => write_trade(&mut logger, &mut line, trade),
            None => thread::sleep(LOG_IDLE),
        }
    }

    // Shutdown: drain, then flush.
    while let Some(trade) = rx.try_pop() {
        write_trade(&mut logger, &mut line, trade);
    }
    logger.flush();
}
