//! Order book data structures.
//!
//! Each side holds its price levels in a flat tick-indexed array
//! with a cached best index, so best-price access is O(1) and the
//! tick domain bounds every rescan. An `FxHashMap` keyed by order id
//! points at the pool slot for O(1) cancel lookup.

use rustc_hash::FxHashMap;

use crate::fixed::{Price, Quantity};
use crate::level::PriceLevel;
use crate::order::{Order, OrderId, OrderStatus, Side};
use crate::pool::{OrderHandle, OrderPool};

/// Number of representable price ticks per side.
///
/// At a $0.01 tick this covers prices up to $655.35.
pub const MAX_TICKS: usize = 65_536;

/// Default pool capacity when none is given.
pub const DEFAULT_POOL_CAPACITY: usize = 1 << 16;

/// One side of the order book (bids or asks).
pub struct BookSide {
    /// Price levels indexed by tick. `Some` only while non-empty.
    levels: Box<[Option<PriceLevel>]>,

    /// Best occupied tick (highest for bids, lowest for asks).
    best_idx: Option<u32>,

    side: Side,

    /// Resting order count on this side.
    order_count: u64,

    /// Sum of remaining quantity across this side.
    total_qty: u64,
}

impl BookSide {
    fn new(side: Side) -> Self {
        let mut levels = Vec::with_capacity(MAX_TICKS);
        levels.resize_with(MAX_TICKS, || None);

        Self {
            levels: levels.into_boxed_slice(),
            best_idx: None,
            side,
            order_count: 0,
            total_qty: 0,
        }
    }

    #[inline(always)]
    fn price_to_idx(price: Price) -> Option<usize> {
        let idx = price.ticks() as usize;
        (idx < MAX_TICKS).then_some(idx)
    }

    #[inline(always)]
    fn idx_to_price(idx: usize) -> Price {
        Price::from_ticks(idx as u64)
    }

    /// Link an already-pooled order into its price level.
    fn push_order(&mut self, pool: &mut OrderPool, handle: OrderHandle) -> bool {
        let (price, qty) = {
            let order = pool.order(handle);
            (order.price, order.remaining())
        };
        let Some(idx) = Self::price_to_idx(price) else {
            return false;
        };

        let level = self.levels[idx].get_or_insert_with(PriceLevel::new);
        level.push_back(pool, handle);

        self.order_count += 1;
        self.total_qty += qty.raw() as u64;
        self.update_best_after_add(idx);

        true
    }

    #[inline]
    fn update_best_after_add(&mut self, new_idx: usize) {
        match self.best_idx {
            None => self.best_idx = Some(new_idx as u32),
            Some(current) => {
                let is_better = match self.side {
                    // Bids: higher price is better.
                    Side::Buy => new_idx > current as usize,
                    // Asks: lower price is better.
                    Side::Sell => new_idx < current as usize,
                };
                if is_better {
                    self.best_idx = Some(new_idx as u32);
                }
            }
        }
    }

    /// Unlink an order and drop its level if that empties it.
    fn remove_order(&mut self, pool: &mut OrderPool, handle: OrderHandle) {
        let (price, qty) = {
            let order = pool.order(handle);
            (order.price, order.remaining())
        };
        let Some(idx) = Self::price_to_idx(price) else {
            return;
        };

        let emptied = match self.levels[idx].as_mut() {
            Some(level) => {
                level.unlink(pool, handle);
                level.is_empty()
            }
            None => return,
        };

        if emptied {
            self.levels[idx] = None;
            if self.best_idx == Some(idx as u32) {
                self.rescan_best(idx);
            }
        }

        self.order_count -= 1;
        self.total_qty -= qty.raw() as u64;
    }

    /// Find the next best level after the one at `from` went away.
    fn rescan_best(&mut self, from: usize) {
        self.best_idx = None;
        match self.side {
            // Bids: next best is the first occupied tick below.
            Side::Buy => {
                for idx in (0..from).rev() {
                    if self.levels[idx].is_some() {
                        self.best_idx = Some(idx as u32);
                        break;
                    }
                }
            }
            // Asks: next best is the first occupied tick above.
            Side::Sell => {
                for idx in (from + 1)..MAX_TICKS {
                    if self.levels[idx].is_some() {
                        self.best_idx = Some(idx as u32);
                        break;
                    }
                }
            }
        }
    }

    /// Fill the FIFO head of the best level by `qty`.
    ///
    /// Keeps the level and side totals exact, and unlinks the maker
    /// when it is exhausted. Returns the maker's id and whether it
    /// left the book; the pool slot is still owned by the caller.
    fn fill_best(&mut self, pool: &mut OrderPool, qty: Quantity) -> Option<(OrderHandle, OrderId, bool)> {
        let best = self.best_idx? as usize;

        let (handle, maker_id, exhausted, emptied) = {
            let level = self.levels[best].as_mut()?;
            let handle = level.front()?;

            let (maker_id, exhausted) = {
                let order = pool.order_mut(handle);
                debug_assert!(qty <= order.remaining(), "fill exceeds remaining");
                order.filled_qty = order.filled_qty.saturating_add(qty);
                let exhausted = order.remaining().is_zero();
                if exhausted {
                    order.status = OrderStatus::Filled;
                }
                (order.order_id, exhausted)
            };

            level.reduce_qty(qty);
            if exhausted {
                level.unlink(pool, handle);
            }
            (handle, maker_id, exhausted, level.is_empty())
        };

        self.total_qty -= qty.raw() as u64;
        if exhausted {
            self.order_count -= 1;
            if emptied {
                self.levels[best] = None;
                self.rescan_best(best);
            }
        }

        Some((handle, maker_id, exhausted))
    }

    #[inline(always)]
    pub fn best_price(&self) -> Option<Price> {
        self.best_idx.map(|idx| Self::idx_to_price(idx as usize))
    }

    #[inline(always)]
    fn best_handle(&self) -> Option<OrderHandle> {
        let idx = self.best_idx? as usize;
        self.levels[idx].as_ref()?.front()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.best_idx.is_none()
    }

    #[inline(always)]
    pub fn order_count(&self) -> u64 {
        self.order_count
    }

    /// Sum of remaining quantity across every level on this side.
    #[inline(always)]
    pub fn total_qty(&self) -> u64 {
        self.total_qty
    }
}

/// Per-level depth entry in a snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelInfo {
    pub price: Price,
    pub quantity: Quantity,
    pub orders: u32,
}

/// Read-only projection of the top of the book.
#[derive(Clone, Debug)]
pub struct BookSnapshot {
    pub bids: Vec<LevelInfo>,
    pub asks: Vec<LevelInfo>,
    pub seq: u64,
}

/// The complete order book for a single symbol.
pub struct OrderBook {
    bids: BookSide,
    asks: BookSide,
    pool: OrderPool,
    index: FxHashMap<OrderId, OrderHandle>,
    sequence: u64,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_POOL_CAPACITY)
    }

    /// Create a book whose pool holds up to `capacity` resting orders.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bids: BookSide::new(Side::Buy),
            asks: BookSide::new(Side::Sell),
            pool: OrderPool::with_capacity(capacity),
            index: FxHashMap::default(),
            sequence: 0,
        }
    }

    /// Rest an order at the tail of its price level.
    ///
    /// Returns `false` (leaving the book untouched) on a duplicate
    /// id, zero remaining quantity, an out-of-range price, or pool
    /// exhaustion.
    pub fn add_order(&mut self, order: Order) -> bool {
        if order.remaining().is_zero() {
            return false;
        }
        if self.index.contains_key(&order.order_id) {
            return false;
        }

        let Some(handle) = self.pool.insert(order) else {
            return false;
        };

        let linked = match order.side {
            Side::Buy => self.bids.push_order(&mut self.pool, handle),
            Side::Sell => self.asks.push_order(&mut self.pool, handle),
        };
        if !linked {
            self.pool.release(handle);
            return false;
        }

        self.index.insert(order.order_id, handle);
        self.sequence += 1;
        true
    }

    /// Remove a resting order. Unknown ids are silently ignored.
    pub fn remove_order(&mut self, order_id: OrderId) {
        let Some(handle) = self.index.remove(&order_id) else {
            return;
        };

        match self.pool.order(handle).side {
            Side::Buy => self.bids.remove_order(&mut self.pool, handle),
            Side::Sell => self.asks.remove_order(&mut self.pool, handle),
        }
        self.pool.release(handle);
        self.sequence += 1;
    }

    /// Look up a resting order.
    pub fn get_order(&self, order_id: OrderId) -> Option<&Order> {
        let handle = *self.index.get(&order_id)?;
        Some(self.pool.order(handle))
    }

    /// Look up a resting order for in-place mutation.
    pub fn get_order_mut(&mut self, order_id: OrderId) -> Option<&mut Order> {
        let handle = *self.index.get(&order_id)?;
        Some(self.pool.order_mut(handle))
    }

    #[inline(always)]
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.best_price()
    }

    #[inline(always)]
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.best_price()
    }

    #[inline(always)]
    pub fn best_price(&self, side: Side) -> Option<Price> {
        self.side(side).best_price()
    }

    #[inline(always)]
    pub fn has_bids(&self) -> bool {
        !self.bids.is_empty()
    }

    #[inline(always)]
    pub fn has_asks(&self) -> bool {
        !self.asks.is_empty()
    }

    /// FIFO head of the best level on `side`.
    pub fn best_order(&self, side: Side) -> Option<&Order> {
        let handle = self.side(side).best_handle()?;
        Some(self.pool.order(handle))
    }

    /// Fill the best resting order on `side` by `qty`.
    ///
    /// Returns the maker's id and whether it was fully filled and
    /// removed from the book.
    pub fn fill_best_order(&mut self, side: Side, qty: Quantity) -> Option<(OrderId, bool)> {
        let (handle, maker_id, removed) = match side {
            Side::Buy => self.bids.fill_best(&mut self.pool, qty),
            Side::Sell => self.asks.fill_best(&mut self.pool, qty),
        }?;

        if removed {
            self.index.remove(&maker_id);
            self.pool.release(handle);
        }
        self.sequence += 1;
        Some((maker_id, removed))
    }

    /// Best-to-worst iterator over `(price, level_qty, order_count)`.
    pub fn levels(&self, side: Side) -> LevelIter<'_> {
        let book_side = self.side(side);
        LevelIter {
            levels: &book_side.levels,
            side,
            cursor: book_side.best_idx.map(|idx| idx as usize),
        }
    }

    /// Resting orders on `side`, best price first, FIFO within a level.
    pub fn orders(&self, side: Side) -> OrderIter<'_> {
        let book_side = self.side(side);
        OrderIter {
            book: self,
            side,
            cursor: book_side.best_idx.map(|idx| idx as usize),
            handle: book_side.best_handle().unwrap_or(OrderHandle::INVALID),
        }
    }

    /// Read-only projection of the top `depth` levels per side.
    pub fn snapshot_top(&self, depth: usize) -> BookSnapshot {
        let project = |side: Side| {
            self.levels(side)
                .take(depth)
                .map(|(price, quantity, orders)| LevelInfo {
                    price,
                    quantity,
                    orders,
                })
                .collect::<Vec<LevelInfo>>()
        };

        BookSnapshot {
            bids: project(Side::Buy),
            asks: project(Side::Sell),
            seq: self.sequence,
        }
    }

    /// Number of resting orders across both sides.
    #[inline(always)]
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Structural mutation counter (add / remove / fill).
    #[inline(always)]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    #[inline(always)]
    pub fn side(&self, side: Side) -> &BookSide {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over occupied price levels, best first.
pub struct LevelIter<'a> {
    levels: &'a [Option<PriceLevel>],
    side: Side,
    cursor: Option<usize>,
}

impl<'a> Iterator for LevelIter<'a> {
    type Item = (Price, Quantity, u32);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(idx) = self.cursor {
            self.cursor = match self.side {
                Side::Buy => idx.checked_sub(1),
                Side::Sell => {
                    let next = idx + 1;
                    (next < self.levels.len()).then_some(next)
                }
            };

            if let Some(level) = &self.levels[idx] {
                return Some((
                    BookSide::idx_to_price(idx),
                    level.total_qty(),
                    level.len() as u32,
                ));
            }
        }
        None
    }
}

/// Iterator over resting orders in priority-then-FIFO order.
pub struct OrderIter<'a> {
    book: &'a OrderBook,
    side: Side,
    /// Tick of the level currently being walked.
    cursor: Option<usize>,
    /// Next order within the current level.
    handle: OrderHandle,
}

impl<'a> Iterator for OrderIter<'a> {
    type Item = &'a Order;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.handle.is_valid() {
                let node = self.book.pool.node(self.handle);
                self.handle = node.next;
                return Some(&node.order);
            }

            // Current level exhausted: advance to the next occupied one.
            let book_side = self.book.side(self.side);
            let idx = self.cursor?;
            let mut next = match self.side {
                Side::Buy => idx.checked_sub(1),
                Side::Sell => {
                    let n = idx + 1;
                    (n < MAX_TICKS).then_some(n)
                }
            };

            while let Some(i) = next {
                if let Some(level) = &book_side.levels[i] {
                    self.cursor = Some(i);
                    self.handle = level.front().unwrap_or(OrderHandle::INVALID);
                    break;
                }
                next = match self.side {
                    Side::Buy => i.checked_sub(1),
                    Side::Sell => {
                        let n = i + 1;
                        (n < MAX_TICKS).then_some(n)
                    }
                };
            }

            if next.is_none() {
                self.cursor = None;
                return None;
            }
        }
    }
}
