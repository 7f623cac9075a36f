//! Matching engine core.
//!
//! Consumes one request at a time in strict sequence and applies
//! price-time priority: best price on the opposite side first, FIFO
//! within a level. Trades always print at the resting maker's price.

use pulse_metrics::NanoClock;

use crate::book::OrderBook;
use crate::fixed::{Price, Quantity};
use crate::order::{
    Order, OrderId, OrderRequest, OrderStatus, OrderType, Side, TimeInForce, TradeEvent,
};

/// The matching engine.
///
/// Owns the book outright; no other thread may touch it. Produced
/// trades accumulate internally until drained.
pub struct MatchingEngine {
    book: OrderBook,
    trades: Vec<TradeEvent>,
    /// Id source for orders submitted without one.
    next_order_id: u64,
    /// Authoritative event ordering across all requests.
    global_seq: u64,
    clock: NanoClock,
}

impl MatchingEngine {
    pub fn new() -> Self {
        Self::with_book(OrderBook::new())
    }

    pub fn with_book(book: OrderBook) -> Self {
        Self {
            book,
            trades: Vec::new(),
            next_order_id: 1,
            global_seq: 0,
            clock: NanoClock::new(),
        }
    }

    /// Apply one request, mutating the book and buffering any trades.
    pub fn process(&mut self, request: OrderRequest) {
        match request {
            OrderRequest::New(order) => {
                self.submit_order(order);
            }
            OrderRequest::Cancel { order_id, .. } => self.cancel_order(order_id),
            // Reserved on the wire; the parser rejects it upstream.
            OrderRequest::Modify { .. } => {}
        }
    }

    /// All trades produced since the last drain, oldest first.
    pub fn drain_trades(&mut self) -> Vec<TradeEvent> {
        std::mem::take(&mut self.trades)
    }

    /// Submit a new order and return it in its final state.
    pub fn submit_order(&mut self, mut order: Order) -> Order {
        if !order.order_id.is_set() {
            order.order_id = OrderId(self.next_order_id);
            self.next_order_id += 1;
        }
        self.global_seq += 1;
        order.sequence_id = self.global_seq;
        order.timestamp_ns = self.clock.now_ns();
        order.status = OrderStatus::Active;

        let is_market = order.order_type == OrderType::Market;

        if order.tif == TimeInForce::Fok {
            let limit = (!is_market).then_some(order.price);
            let available = self.available_quantity(order.side, limit, order.remaining());
            if available < order.remaining() {
                order.status = OrderStatus::Rejected;
                return order;
            }
        }

        self.match_incoming(&mut order, is_market);

        if order.remaining().is_zero() {
            order.status = OrderStatus::Filled;
        } else if order.order_type == OrderType::Limit && order.tif == TimeInForce::Gtc {
            order.status = if order.filled_qty.is_zero() {
                OrderStatus::Active
            } else {
                OrderStatus::PartiallyFilled
            };
            if !self.book.add_order(order) {
                order.status = OrderStatus::Rejected;
            }
        } else if order.tif == TimeInForce::Fok {
            // Unreachable given the pre-check; kept as a guard.
            order.status = OrderStatus::Rejected;
        } else {
            // IOC, or a market order with residual.
            order.status = if order.filled_qty.is_zero() {
                OrderStatus::Cancelled
            } else {
                OrderStatus::PartiallyFilled
            };
        }

        order
    }

    /// Cancel a resting order. Unknown ids are silently ignored.
    pub fn cancel_order(&mut self, order_id: OrderId) {
        let Some(resting) = self.book.get_order_mut(order_id) else {
            return;
        };
        resting.status = OrderStatus::Cancelled;
        self.book.remove_order(order_id);
    }

    /// Walk the opposite side from the best level downward.
    fn match_incoming(&mut self, order: &mut Order, is_market: bool) {
        let opposite = order.side.opposite();

        while !order.remaining().is_zero() {
            let Some(execution_price) = self.book.best_price(opposite) else {
                break;
            };

            if !is_market {
                let crosses = match order.side {
                    Side::Buy => order.price >= execution_price,
                    Side::Sell => order.price <= execution_price,
                };
                if !crosses {
                    break;
                }
            }

            let Some(maker) = self.book.best_order(opposite) else {
                break;
            };
            let trade_qty = order.remaining().min(maker.remaining());
            if trade_qty.is_zero() {
                break;
            }

            let Some((maker_id, _removed)) = self.book.fill_best_order(opposite, trade_qty)
            else {
                break;
            };
            order.filled_qty = order.filled_qty.saturating_add(trade_qty);

            self.trades.push(TradeEvent {
                maker_order_id: maker_id,
                taker_order_id: order.order_id,
                price: execution_price,
                quantity: trade_qty,
                timestamp_ns: self.clock.now_ns(),
            });
        }
    }

    /// Liquidity available to a taker, walking the full ladder.
    ///
    /// Accumulates level quantity at every price that satisfies the
    /// limit (all prices for market orders), stopping early once
    /// `needed` is covered or the ladder stops crossing.
    fn available_quantity(
        &self,
        taker_side: Side,
        limit: Option<Price>,
        needed: Quantity,
    ) -> Quantity {
        let mut sum = Quantity::ZERO;

        for (price, level_qty, _) in self.book.levels(taker_side.opposite()) {
            if let Some(limit) = limit {
                let satisfies = match taker_side {
                    Side::Buy => price <= limit,
                    Side::Sell => price >= limit,
                };
                // Prices only get worse from here.
                if !satisfies {
                    break;
                }
            }

            sum = sum.saturating_add(level_qty);
            if sum >= needed {
                break;
            }
        }

        sum
    }

    /// The book, for snapshots and inspection from the owning thread.
    pub fn book(&self) -> &OrderBook {
        &self.book
    }
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}
