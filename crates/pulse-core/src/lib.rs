//! # Pulse Core
//!
//! Limit order book and price-time priority matching engine.
//!
//! ## Design
//! - Fixed-point prices (integer ticks), exact comparisons
//! - Pre-allocated order slab, zero allocation while matching
//! - Flat tick-indexed price levels with intrusive FIFO queues
//! - Single-threaded engine owning the book outright

pub mod book;
pub mod engine;
pub mod fixed;
pub mod level;
pub mod order;
pub mod pool;

pub use book::{BookSnapshot, LevelInfo, OrderBook};
pub use engine::MatchingEngine;
pub use fixed::{Price, Quantity};
pub use level::PriceLevel;
pub use order::{
    Order, OrderId, OrderRequest, OrderStatus, OrderType, Side, SymbolId, TimeInForce, TradeEvent,
};
pub use pool::{OrderHandle, OrderPool};
