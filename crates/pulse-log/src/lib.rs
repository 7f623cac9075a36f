//! Asynchronous file log sink.
//!
//! `log()` formats a fixed-size record and hands it to a background
//! flusher thread over an SPSC ring, so the calling thread never
//! blocks on file I/O. `log` takes `&mut self`: exactly one producer
//! exists per logger, which is what the ring requires.
//!
//! Record line format: `<timestamp_ns> <thread_id> <LEVEL> <payload>`
//! with the payload truncated to 255 bytes.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use arrayvec::ArrayVec;
use pulse_metrics::NanoClock;
use pulse_ring::{Consumer, Producer, SpscRing};

/// Maximum payload bytes per record; longer messages are truncated.
pub const MAX_PAYLOAD: usize = 255;

const QUEUE_SIZE: usize = 1024;
const FLUSH_BATCH: usize = 256;
const IDLE_SLEEP: Duration = Duration::from_micros(50);

/// Record severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warning = 2,
    Error = 3,
}

impl LogLevel {
    const fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

/// What to do when the internal queue is full.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Refuse the record and count it.
    Drop,
    /// Busy-yield until the flusher makes room.
    Block,
}

/// Fixed-size record moved through the ring.
#[derive(Clone, Copy)]
struct LogRecord {
    timestamp_ns: u64,
    thread_id: u32,
    payload_len: u16,
    level: LogLevel,
    payload: [u8; 256],
}

/// Small dense id for the calling thread, assigned on first use.
fn current_thread_id() -> u32 {
    static NEXT: AtomicU32 = AtomicU32::new(1);
    thread_local! {
        static TID: u32 = NEXT.fetch_add(1, Ordering::Relaxed);
    }
    TID.with(|tid| *tid)
}

/// Asynchronous line-oriented file logger.
pub struct Logger {
    tx: Producer<LogRecord, QUEUE_SIZE>,
    policy: OverflowPolicy,
    running: Arc<AtomicBool>,
    /// Records written and flushed by the background thread.
    flushed: Arc<AtomicU64>,
    enqueued: u64,
    dropped: u64,
    clock: NanoClock,
    flusher: Option<JoinHandle<()>>,
}

impl Logger {
    /// Open `path` for appending and start the flusher thread.
    ///
    /// Failing to open the file is fatal to the caller's startup.
    pub fn create<P: AsRef<Path>>(path: P, policy: OverflowPolicy) -> io::Result<Self> {
        let file = File::options().create(true).append(true).open(path)?;
        let writer = BufWriter::new(file);

        let ring: SpscRing<LogRecord, QUEUE_SIZE> = SpscRing::new();
        let (tx, rx) = ring.split();

        let running = Arc::new(AtomicBool::new(true));
        let flushed = Arc::new(AtomicU64::new(0));

        let flusher = thread::Builder::new().name("log-flusher".into()).spawn({
            let running = Arc::clone(&running);
            let flushed = Arc::clone(&flushed);
            move || flusher_loop(rx, writer, running, flushed)
        })?;

        Ok(Self {
            tx,
            policy,
            running,
            flushed,
            enqueued: 0,
            dropped: 0,
            clock: NanoClock::new(),
            flusher: Some(flusher),
        })
    }

    /// Enqueue one record. Returns whether it was accepted.
    ///
    /// Under the `Drop` policy a full queue refuses the record and
    /// bumps the dropped count; under `Block` this yields until the
    /// flusher makes room.
    pub fn log(&mut self, level: LogLevel, message: &str) -> bool {
        let mut record = LogRecord {
            timestamp_ns: self.clock.now_ns(),
            thread_id: current_thread_id(),
            payload_len: 0,
            level,
            payload: [0; 256],
        };

        let len = message.len().min(MAX_PAYLOAD);
        record.payload[..len].copy_from_slice(&message.as_bytes()[..len]);
        record.payload_len = len as u16;

        match self.policy {
            OverflowPolicy::Drop => match self.tx.try_push(record) {
                Ok(()) => {
                    self.enqueued += 1;
                    true
                }
                Err(_) => {
                    self.dropped += 1;
                    false
                }
            },
            OverflowPolicy::Block => {
                let mut record = record;
                loop {
                    match self.tx.try_push(record) {
                        Ok(()) => {
                            self.enqueued += 1;
                            return true;
                        }
                        Err(back) => {
                            record = back;
                            thread::yield_now();
                        }
                    }
                }
            }
        }
    }

    /// Wait until everything accepted so far has hit the file.
    pub fn flush(&self) {
        let target = self.enqueued;
        while self.flushed.load(Ordering::Acquire) < target {
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Records refused under the `Drop` policy.
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    /// Records accepted into the queue.
    pub fn enqueued_count(&self) -> u64 {
        self.enqueued
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        // The flusher drains the queue after the flag flips.
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.flusher.take() {
            let _ = handle.join();
        }
    }
}

fn flusher_loop(
    mut rx: Consumer<LogRecord, QUEUE_SIZE>,
    mut out: BufWriter<File>,
    running: Arc<AtomicBool>,
    flushed: Arc<AtomicU64>,
) {
    loop {
        let mut batch: ArrayVec<LogRecord, FLUSH_BATCH> = ArrayVec::new();
        while !batch.is_full() {
            match rx.try_pop() {
                Some(record) => batch.push(record),
                None => break,
            }
        }

        if batch.is_empty() {
            if !running.load(Ordering::Acquire) {
                break;
            }
            thread::sleep(IDLE_SLEEP);
            continue;
        }

        for record in &batch {
            let _ = write!(
                out,
                "{} {} {} ",
                record.timestamp_ns,
                record.thread_id,
                record.level.as_str()
            );
            let _ = out.write_all(&record.payload[..record.payload_len as usize]);
            let _ = out.write_all(b"\n");
        }
        let _ = out.flush();
        flushed.fetch_add(batch.len() as u64, Ordering::Release);
    }

    let _ = out.flush();
}
